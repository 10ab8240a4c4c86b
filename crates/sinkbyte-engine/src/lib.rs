//! Destination execution for sinkbyte pipelines.
//!
//! A [`Dispatcher`] owns every registered destination definition and
//! routes a definition uid to the variant that implements it:
//!
//! - container-backed destinations ([`container`]) receive pipeline
//!   outputs as newline-delimited protocol records over stdin;
//! - content-commit destinations ([`commit`]) pin generated images and
//!   commit notarized asset records over HTTP.
//!
//! Build the dispatcher once per process with [`Initializer`].

pub mod commit;
pub mod config;
pub mod container;
pub mod definitions;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod init;
pub mod registry;
pub mod resolve;
pub mod result;

pub use dispatcher::{Connection, Dispatcher, Variant};
pub use error::DestinationError;
pub use execution::ExecutionOptions;
pub use init::{build_dispatcher, Initializer};
pub use registry::Registry;
pub use result::{AssetReference, CheckReport, DeliverySummary, ExecuteOutput};
