//! Staging files shared with destination containers.
//!
//! Files live under `{root}/connector-data/{config,catalog}/{run_id}.json`
//! where `root` is the pipeline workspace as seen by both this process and
//! the container.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Path layout for staged files.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn config_path(&self, run_id: &str) -> PathBuf {
        self.root
            .join("connector-data")
            .join("config")
            .join(format!("{run_id}.json"))
    }

    #[must_use]
    pub fn catalog_path(&self, run_id: &str) -> PathBuf {
        self.root
            .join("connector-data")
            .join("catalog")
            .join(format!("{run_id}.json"))
    }
}

/// A file removed when dropped. Removal failures are logged.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Write `contents` to `path` (owner read/write only), creating parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; nothing is left behind on failure.
    pub fn write(path: PathBuf, contents: &[u8]) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        let staged = Self { path };
        file.write_all(contents)?;
        file.sync_all()?;
        Ok(staged)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as passed on a container command line.
    #[must_use]
    pub fn path_arg(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Removed staged file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}
