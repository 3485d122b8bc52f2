use std::path::PathBuf;
use thiserror::Error;

/// A path that could not be read as an image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

/// A filesystem mutation that failed for one path.
#[derive(Debug, Error)]
pub enum FsOpError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {} → {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {} → {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FsOpError {
    /// The underlying I/O failure, without the paths already carried by the action.
    pub fn io_error(&self) -> &std::io::Error {
        match self {
            Self::CreateDir { source, .. }
            | Self::Copy { source, .. }
            | Self::Move { source, .. }
            | Self::Delete { source, .. } => source,
        }
    }
}
