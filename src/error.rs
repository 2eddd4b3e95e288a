use std::path::PathBuf;

use thiserror::Error;

use crate::resample::Interpolation;

/// A specialized [`Result`] type for retiling operations.
pub type RetileResult<T> = Result<T, RetileError>;

/// Errors that can occur while reading, resampling or writing tiles.
#[derive(Debug, Error)]
pub enum RetileError {
    #[error("Invalid tile coordinate {x}/{y} at zoom {z}")]
    InvalidTileCoord { z: u8, x: u32, y: u32 },
    #[error("Zoom level {0} is out of range")]
    InvalidZoom(u8),
    #[error("Invalid pixel buffer: {width}x{height} with stride {stride} does not fit {len} bytes")]
    InvalidBuffer {
        width: u32,
        height: u32,
        stride: usize,
        len: usize,
    },
    #[error("Tile size mismatch: expected {expected:?}, found {found:?}")]
    SizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Interpolation {0} cannot be used to downsample")]
    DownsampleUnsupported(Interpolation),
    #[error("Interpolation {0} cannot be used to enlarge")]
    EnlargeUnsupported(Interpolation),
    #[error("Tile not found: {0}")]
    TileNotFound(PathBuf),
    #[error("Gave up writing {path} after {attempts} attempts")]
    WriteTimeout { path: PathBuf, attempts: u32 },
    #[error("Dispatcher has no workers left to accept jobs")]
    DispatcherClosed,
    #[error("No tiles found under {0}")]
    NoTiles(PathBuf),
    #[error("IO Error {0}")]
    Reading(#[from] std::io::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[cfg(feature = "png")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
