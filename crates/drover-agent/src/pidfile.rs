use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::error::AgentError;

/// Marker file holding the agent's pid for the lifetime of the process.
///
/// Creation fails if the file already exists: another agent owns the host.
/// The file is removed by [`PidFile::release`], or on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    released: bool,
}

impl PidFile {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, AgentError> {
        Self::create_with(path.into(), |file| writeln!(file, "{}", std::process::id()))
    }

    fn create_with(
        path: PathBuf,
        write: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> Result<Self, AgentError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| AgentError::PidFile {
                path: path.clone(),
                source,
            })?;
        if let Err(source) = write(&mut file) {
            drop(file);
            // Only our own half-written marker is removed here.
            let _ = std::fs::remove_file(&path);
            return Err(AgentError::PidFile { path, source });
        }
        debug!(path = %path.display(), "pid file created");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not remove pid file");
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.remove();
    }
}
