/// Model sources, the fetch seam and load generations
use std::future::Future;
use std::path::PathBuf;

use crate::error::{Result, ViewerError};
use crate::format::ModelFormat;

/// Where a model's bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum MeshSource {
    /// A file on the local filesystem
    Path(PathBuf),
    /// Bytes already in memory, e.g. from a file picker or drag-drop
    Bytes { name: String, data: Vec<u8> },
    /// A URL the host knows how to fetch
    Url(String),
}

impl MeshSource {
    /// Name used for format detection and status messages
    pub fn name(&self) -> String {
        match self {
            MeshSource::Path(path) => path.display().to_string(),
            MeshSource::Bytes { name, .. } => name.clone(),
            MeshSource::Url(url) => url.clone(),
        }
    }
}

/// Fetches raw model bytes; completion is asynchronous
pub trait MeshLoader {
    fn fetch(&self, source: &MeshSource) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Loader for local files and in-memory buffers
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn read(source: &MeshSource) -> Result<Vec<u8>> {
        match source {
            MeshSource::Path(path) => std::fs::read(path).map_err(|e| {
                ViewerError::LoadFailure(format!("cannot read {}: {e}", path.display()))
            }),
            MeshSource::Bytes { data, .. } => Ok(data.clone()),
            MeshSource::Url(url) => Err(ViewerError::LoadFailure(format!(
                "{url}: fetching URLs is up to the host"
            ))),
        }
    }
}

impl MeshLoader for FileLoader {
    fn fetch(&self, source: &MeshSource) -> impl Future<Output = Result<Vec<u8>>> {
        let result = Self::read(source);
        async move { result }
    }
}

/// Token identifying one load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub name: String,
    pub format: ModelFormat,
}

/// Hands out load generations; only the newest one may touch the scene
#[derive(Debug, Default)]
pub struct LoadTracker {
    latest: u64,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding every earlier one
    pub fn begin(&mut self, name: &str, format: ModelFormat) -> LoadTicket {
        self.latest += 1;
        LoadTicket {
            generation: self.latest,
            name: name.to_string(),
            format,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }
}
