mod downsample_tests;
#[cfg(feature = "png")]
mod level_tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    MemoryStore, NamingTemplate, Pixel, PixelBuffer, RetileError, RetileResult, TileCoord,
    TileIndex, TileRef, TileStore,
};

pub const RED: Pixel = Pixel::new(255, 0, 0, 255);
pub const GREEN: Pixel = Pixel::new(0, 255, 0, 255);
pub const BLUE: Pixel = Pixel::new(0, 0, 255, 255);
pub const WHITE: Pixel = Pixel::new(255, 255, 255, 255);

pub fn solid(size: u32, p: Pixel) -> PixelBuffer {
    let mut buf = PixelBuffer::new(size, size);
    buf.fill(p);
    buf
}

pub fn coord(z: u8, x: u32, y: u32) -> TileCoord {
    TileCoord::new(z, x, y).unwrap()
}

pub fn osm(root: &str, c: TileCoord) -> PathBuf {
    NamingTemplate::Osm.path_for(Path::new(root), c)
}

/// Stores each tile under `root` with OSM names and returns the matching index.
pub fn seed(store: &MemoryStore, root: &str, tiles: Vec<(TileCoord, PixelBuffer)>) -> TileIndex {
    let refs = tiles
        .into_iter()
        .map(|(c, tile)| {
            let path = osm(root, c);
            store.insert(path.clone(), tile);
            TileRef { coord: c, path }
        })
        .collect();
    TileIndex::from_refs(root, refs)
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Reads like a [`MemoryStore`] but refuses every write.
#[derive(Default)]
pub struct ReadOnlyStore(pub MemoryStore);

impl TileStore for ReadOnlyStore {
    fn read(&self, path: &Path) -> RetileResult<PixelBuffer> {
        self.0.read(path)
    }

    fn write(&self, _path: &Path, _tile: &PixelBuffer) -> RetileResult<()> {
        Err(RetileError::Reading(std::io::Error::other("read-only store")))
    }

    fn remove(&self, _path: &Path) -> RetileResult<()> {
        Err(RetileError::Reading(std::io::Error::other("read-only store")))
    }
}
