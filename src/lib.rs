#![forbid(unsafe_code)]
//! NODATA-aware raster tile pyramids.
//!
//! Tiles are RGBA8 images where an alpha of 0 marks a pixel as NODATA. Every resampling path in
//! this crate keeps that marker intact across generations: averaging never blends valid pixels
//! with NODATA, and kernel output is masked by the validity of its source footprint.

mod tile;
pub use tile::{MAX_ZOOM, TileCoord};

mod pixel;
pub use pixel::{CHANNELS, Pixel, PixelBuffer};

pub mod geometry;
pub use geometry::Roi;

pub mod fill;

pub mod resample;
pub use resample::{EnlargeOptions, Interpolation, ZoomDirection};

mod template;
pub use template::{EXTENSION, NamingTemplate, TILE_PREFIX};

mod index;
pub use index::{TileIndex, TileRef};

mod store;
#[cfg(feature = "png")]
pub use store::PngStore;
pub use store::{MemoryStore, TileStore, WriteRetry};

pub mod dispatch;
pub use dispatch::Dispatcher;

pub mod pyramid;
pub use pyramid::{ProgressCallback, RetileStats, Retiler};

mod error;
pub use error::{RetileError, RetileResult};
