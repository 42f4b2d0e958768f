use std::path::PathBuf;

/// Failures surfaced by engine operations and the collaborators it drives.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("unsupported data format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("rotation axis {0} is out of range (expected 0, 1 or 2)")]
    InvalidAxis(usize),

    #[error("graphics device error: {0}")]
    Device(String),

    #[error("captured frame is {len} bytes, expected {width}x{height} RGBA")]
    InvalidCapture { width: u32, height: u32, len: usize },

    #[error("failed to write screenshot: {0}")]
    Screenshot(#[from] image::ImageError),
}

pub type EngineResult<T> = Result<T, EngineError>;
