// error.rs

#[cfg(feature = "cli")]
use indicatif::style::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GzLinesError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("stream closed")]
    StreamClosed,

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Stream not marked, or mark invalidated by reading past its limit")]
    InvalidMark,

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Background line reader terminated without an end-of-stream marker")]
    ProducerPanicked,

    #[error("{0}")]
    StringError(String),

    #[cfg(feature = "cli")]
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
}

// Add a convenience implementation for &str errors
impl From<&str> for GzLinesError {
    fn from(error: &str) -> Self {
        GzLinesError::StringError(error.to_string())
    }
}

impl From<String> for GzLinesError {
    fn from(error: String) -> Self {
        GzLinesError::StringError(error)
    }
}

#[cfg(feature = "cli")]
impl From<glob::GlobError> for GzLinesError {
    fn from(error: glob::GlobError) -> Self {
        GzLinesError::StringError(format!("Glob error: {}", error))
    }
}

#[cfg(feature = "cli")]
impl From<glob::PatternError> for GzLinesError {
    fn from(error: glob::PatternError) -> Self {
        GzLinesError::StringError(format!("Invalid glob pattern: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, GzLinesError>;

impl GzLinesError {
    /// The underlying I/O error kind, if this error came from the byte stream.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            GzLinesError::IOError(e) => Some(e.kind()),
            _ => None,
        }
    }
}
