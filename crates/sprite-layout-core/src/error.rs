use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the layout engine. Each variant maps onto one of
/// the CLI's exit codes (1 usage, 2 input, 3 no feasible packing; every
/// remaining variant returns a non-zero "other" code).
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("usage error: {0}")]
    UsageError(String),

    #[error("input error: {0}")]
    InputError(String),

    #[error("input error: path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("input error: unreadable file: {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input error: unsupported image format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("no feasible packing for {count} input(s) under the given limits")]
    NoFeasiblePacking { count: usize },

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

impl LayoutError {
    /// Exit code per the external-interface contract: 1 usage, 2 input
    /// (including config), 3 no-feasible-packing, 70 everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            LayoutError::UsageError(_) => 1,
            LayoutError::InputError(_)
            | LayoutError::NotFound(_)
            | LayoutError::Unreadable { .. }
            | LayoutError::UnsupportedFormat(_)
            | LayoutError::Image(_)
            | LayoutError::ConfigError(_) => 2,
            LayoutError::NoFeasiblePacking { .. } => 3,
            LayoutError::InternalError(_) | LayoutError::Io(_) => 70,
        }
    }
}
