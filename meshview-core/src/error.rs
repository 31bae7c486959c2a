/// Error types shared by the viewer core and its hosts
use thiserror::Error;

/// Result type for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Everything that can go wrong while loading or framing a model.
///
/// None of these are fatal: the viewer records the error in its status line
/// and keeps the previously displayed model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// Bounding box is degenerate or the mesh failed to parse
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// File extension not recognized; no load was attempted
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Network or I/O failure while fetching the model bytes
    #[error("load failed: {0}")]
    LoadFailure(String),

    /// Field of view, aspect ratio or margin out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be read or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ViewerError {
    fn from(error: std::io::Error) -> Self {
        ViewerError::LoadFailure(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = ViewerError::UnsupportedFormat("model.obj".to_string());
        assert_eq!(err.to_string(), "unsupported format: model.obj");
    }

    #[test]
    fn test_io_error_is_load_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.stl");
        let err: ViewerError = io.into();
        assert!(matches!(err, ViewerError::LoadFailure(msg) if msg.contains("missing.stl")));
    }
}
