//! Tile persistence.
//!
//! The resampling core only ever sees [`PixelBuffer`]s; a [`TileStore`] turns paths into
//! buffers and back. [`PngStore`] is the on-disk implementation, [`MemoryStore`] keeps tiles in
//! a map and is handy for embedding and tests.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::pixel::PixelBuffer;
use crate::{RetileError, RetileResult};

/// Reads and writes tiles by path. Shared by all dispatcher workers.
pub trait TileStore: Send + Sync {
    /// Decodes the tile at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile is missing or cannot be decoded.
    fn read(&self, path: &Path) -> RetileResult<PixelBuffer>;

    /// Stores `tile` at `path`, replacing any existing tile.
    ///
    /// Must be lossless with respect to the RGBA content of `tile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile cannot be written.
    fn write(&self, path: &Path, tile: &PixelBuffer) -> RetileResult<()>;

    /// Deletes the tile at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile exists but cannot be removed.
    fn remove(&self, path: &Path) -> RetileResult<()>;
}

/// Retry policy for writes that fail with a transient IO error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRetry {
    /// Pause between attempts.
    pub interval: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub timeout: Duration,
}

impl Default for WriteRetry {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WriteRetry {
    /// Runs `op` until it succeeds, fails permanently, or the timeout passes.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or [`RetileError::WriteTimeout`].
    pub fn run(&self, path: &Path, mut op: impl FnMut() -> std::io::Result<()>) -> RetileResult<()> {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op() {
                Ok(()) => return Ok(()),
                Err(e) if is_transient(&e) => {
                    if start.elapsed() + self.interval > self.timeout {
                        return Err(RetileError::WriteTimeout {
                            path: path.to_path_buf(),
                            attempts,
                        });
                    }
                    log::debug!("Retrying write of {} after: {e}", path.display());
                    std::thread::sleep(self.interval);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::ResourceBusy
    )
}

#[cfg(feature = "png")]
pub use png::PngStore;

#[cfg(feature = "png")]
mod png {
    use std::fs;
    use std::path::Path;

    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::{ExtendedColorType, ImageEncoder, ImageFormat};

    use super::{TileStore, WriteRetry};
    use crate::RetileResult;
    use crate::pixel::{CHANNELS, PixelBuffer};

    /// PNG files on the local filesystem.
    ///
    /// Any PNG color type is accepted on read and expanded to RGBA8. Writes use maximum
    /// compression and drop the alpha channel when every pixel is opaque.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PngStore {
        retry: WriteRetry,
    }

    impl PngStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets how long transient write failures are retried.
        #[must_use]
        pub fn retry(mut self, retry: WriteRetry) -> Self {
            self.retry = retry;
            self
        }

        /// Encodes `tile` as PNG bytes.
        ///
        /// # Errors
        ///
        /// Returns an error if encoding fails.
        pub fn encode(tile: &PixelBuffer) -> RetileResult<Vec<u8>> {
            let (w, h) = tile.dimensions();
            let opaque = tile.is_opaque();
            let rgba = tile.clone().into_packed();
            let (data, color) = if opaque {
                let rgb: Vec<u8> = rgba
                    .chunks_exact(CHANNELS)
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect();
                (rgb, ExtendedColorType::Rgb8)
            } else {
                (rgba, ExtendedColorType::Rgba8)
            };

            let mut out = Vec::new();
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::NoFilter)
                .write_image(&data, w, h, color)?;
            Ok(out)
        }

        /// Decodes PNG bytes into an RGBA buffer.
        ///
        /// # Errors
        ///
        /// Returns an error if the bytes are not a valid PNG.
        pub fn decode(bytes: &[u8]) -> RetileResult<PixelBuffer> {
            let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgba8();
            let (w, h) = img.dimensions();
            PixelBuffer::from_raw(w, h, w as usize * CHANNELS, img.into_raw())
        }
    }

    impl TileStore for PngStore {
        fn read(&self, path: &Path) -> RetileResult<PixelBuffer> {
            Self::decode(&fs::read(path)?)
        }

        fn write(&self, path: &Path, tile: &PixelBuffer) -> RetileResult<()> {
            let bytes = Self::encode(tile)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            self.retry.run(path, || fs::write(path, &bytes))
        }

        fn remove(&self, path: &Path) -> RetileResult<()> {
            match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        }
    }
}

/// Tiles held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tiles: Mutex<HashMap<PathBuf, PixelBuffer>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, PixelBuffer>> {
        self.tiles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a tile without counting it as a write.
    pub fn insert(&self, path: impl Into<PathBuf>, tile: PixelBuffer) {
        self.lock().insert(path.into(), tile);
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<PixelBuffer> {
        self.lock().get(path).cloned()
    }

    /// Stored paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of successful [`TileStore::write`] calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl TileStore for MemoryStore {
    fn read(&self, path: &Path) -> RetileResult<PixelBuffer> {
        self.get(path)
            .ok_or_else(|| RetileError::TileNotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, tile: &PixelBuffer) -> RetileResult<()> {
        self.lock().insert(path.to_path_buf(), tile.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove(&self, path: &Path) -> RetileResult<()> {
        self.lock().remove(path);
        Ok(())
    }
}
