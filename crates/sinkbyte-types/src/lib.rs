//! Shared sinkbyte model types.
//!
//! Connector definitions, pipeline payloads, the line-oriented record
//! protocol, catalogs, and commit records. This crate has no I/O and is
//! safe to depend on from every other sinkbyte crate.

pub mod catalog;
pub mod commit;
pub mod definition;
pub mod payload;
pub mod protocol;
pub mod state;
pub mod wire;
