//! Build tile pyramids one zoom level at a time.
//!
//! A [`Retiler`] walks a [`TileIndex`](crate::TileIndex) and writes the next coarser or finer
//! zoom level through a [`TileStore`](crate::TileStore):
//!
//! - **Downsampling** visits tiles in cluster order, so the (up to) four siblings of a
//!   destination tile arrive back to back. Siblings are read and combined into one accumulation
//!   buffer on the calling thread; a change of destination flushes the finished tile to the
//!   worker pool for encoding and writing. A sibling that cannot be read leaves its quadrant
//!   empty without aborting the group.
//! - **Enlarging** expands every source tile into the `4^d` tiles that cover it `d` levels
//!   down. Regions without valid pixels are skipped, so no empty tile is ever written.
//!
//! Each level ends by draining the worker pool with a timeout. A drain that times out is
//! reported in [`RetileStats`] but does not fail the run.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use retile::{NamingTemplate, PngStore, Retiler, TileIndex};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = TileIndex::scan(Path::new("tiles"), NamingTemplate::Osm)?;
//! let stats = Retiler::new(Arc::new(PngStore::new()))
//!     .workers(8)
//!     .downsample(&index, Path::new("tiles"))?;
//!
//! println!("Wrote {} tiles from {} sources", stats.completed(), stats.source_tiles());
//! # Ok(())
//! # }
//! ```

mod retiler;
#[cfg(test)]
mod tests;

pub use retiler::{ProgressCallback, Retiler};

/// Counters for one retiling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetileStats {
    source_tiles: usize,
    unreadable_tiles: usize,
    groups: usize,
    submitted: usize,
    empty_skipped: usize,
    completed: usize,
    failed: usize,
    drain_timed_out: bool,
}

impl RetileStats {
    /// Source tiles visited.
    #[must_use]
    pub fn source_tiles(&self) -> usize {
        self.source_tiles
    }

    /// Source tiles that could not be decoded and were treated as NODATA.
    #[must_use]
    pub fn unreadable_tiles(&self) -> usize {
        self.unreadable_tiles
    }

    /// Destination tiles considered while downsampling.
    #[must_use]
    pub fn groups(&self) -> usize {
        self.groups
    }

    /// Jobs handed to the worker pool.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Destination tiles skipped because they would hold no data.
    #[must_use]
    pub fn empty_skipped(&self) -> usize {
        self.empty_skipped
    }

    /// Jobs that finished successfully before the drain ended.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Jobs that returned an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// `true` if jobs were still running when the drain timeout passed.
    #[must_use]
    pub fn drain_timed_out(&self) -> bool {
        self.drain_timed_out
    }
}
