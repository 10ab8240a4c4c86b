//! One-time construction of the process-wide [`Dispatcher`].

use std::sync::Arc;

use once_cell::sync::OnceCell;
use sinkbyte_state::IdempotencyGuard;

use crate::commit::CommitDestination;
use crate::config::Settings;
use crate::container::catalog::load_protocol_stream;
use crate::container::docker::DockerRuntime;
use crate::container::lifecycle::ContainerRuntime;
use crate::container::ContainerDestination;
use crate::definitions::{commit_definitions, container_definitions};
use crate::dispatcher::{Dispatcher, Variant};
use crate::error::{DestinationError, Result};

/// Build a dispatcher: container variant first, then commit.
///
/// # Errors
///
/// Returns [`DestinationError::Definitions`] for unreadable seeds or
/// protocol, or [`DestinationError::DuplicateUid`] when variants collide.
pub fn build_dispatcher(
    settings: &Settings,
    runtime: Arc<dyn ContainerRuntime>,
) -> Result<Dispatcher> {
    let container = ContainerDestination::new(
        container_definitions(settings.container.definitions_path.as_deref())?,
        load_protocol_stream(settings.container.protocol_path.as_deref())?,
        &settings.container,
        runtime,
        IdempotencyGuard::new(settings.guard.completed_ttl()),
    )?;
    let commit = CommitDestination::new(
        commit_definitions(&settings.commit.shared_token)?,
        &settings.commit,
    )?;

    Dispatcher::new(vec![
        Variant::Container(Arc::new(container)),
        Variant::Commit(Arc::new(commit)),
    ])
}

/// Builds the dispatcher at most once.
///
/// The first caller builds; concurrent first callers block and observe the
/// same handle. A failed build is not cached, so a later call retries.
#[derive(Default)]
pub struct Initializer {
    cell: OnceCell<Arc<Dispatcher>>,
}

impl Initializer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Initialize against the local Docker engine.
    ///
    /// # Errors
    ///
    /// See [`build_dispatcher`]; also fails if the Docker client cannot be
    /// configured.
    pub fn initialize(&self, settings: &Settings) -> Result<Arc<Dispatcher>> {
        self.initialize_with(settings, || {
            let runtime: Arc<dyn ContainerRuntime> = Arc::new(
                DockerRuntime::connect().map_err(|e| DestinationError::lifecycle("connect", e))?,
            );
            Ok(runtime)
        })
    }

    /// Initialize with a caller-supplied runtime. `runtime` only runs if
    /// this call performs the build.
    ///
    /// # Errors
    ///
    /// See [`build_dispatcher`].
    pub fn initialize_with<F>(&self, settings: &Settings, runtime: F) -> Result<Arc<Dispatcher>>
    where
        F: FnOnce() -> Result<Arc<dyn ContainerRuntime>>,
    {
        self.cell
            .get_or_try_init(|| {
                tracing::info!("Initializing destination dispatcher");
                build_dispatcher(settings, runtime()?).map(Arc::new)
            })
            .cloned()
    }

    /// The dispatcher, if initialized.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Dispatcher>> {
        self.cell.get().cloned()
    }
}
