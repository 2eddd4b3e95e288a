use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::{DEFAULT_DRAIN_TIMEOUT, DEFAULT_WORKERS, Dispatcher};
use crate::geometry::{placement, roi_for_zoom};
use crate::index::{TileIndex, TileRef};
use crate::pixel::PixelBuffer;
use crate::pyramid::RetileStats;
use crate::resample::{self, EnlargeOptions, Interpolation, ZoomDirection};
use crate::store::TileStore;
use crate::template::NamingTemplate;
use crate::tile::TileCoord;
use crate::{RetileError, RetileResult};

/// Progress callback receiving a value between 0.0 and 1.0.
pub type ProgressCallback = dyn Fn(f64) + Send + Sync;

/// Builder for retiling runs over a tile store.
pub struct Retiler<'p, S> {
    store: Arc<S>,

    /// Algorithm; `None` picks the default for the zoom direction.
    interpolation: Option<Interpolation>,

    workers: usize,
    drain_timeout: Duration,

    output_template: NamingTemplate,

    /// Also rewrite every decoded source tile with the output template.
    reprocess: bool,

    zoom_delta: u8,
    enlarge_options: EnlargeOptions,

    progress: Option<&'p ProgressCallback>,
}

/// Sibling tiles that share one destination tile.
struct Group {
    dest: TileCoord,
    decoded: usize,
}

impl<S: TileStore + 'static> Retiler<'_, S> {
    /// Creates a retiler with 32 workers, a 60 second drain timeout and OSM output names.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            interpolation: None,
            workers: DEFAULT_WORKERS,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            output_template: NamingTemplate::Osm,
            reprocess: false,
            zoom_delta: 1,
            enlarge_options: EnlargeOptions::default(),
            progress: None,
        }
    }

    /// Sets the resampling algorithm.
    ///
    /// If not set, enlarging uses [`Interpolation::Epx`] and downsampling uses
    /// [`Interpolation::Lanczos3`].
    #[must_use]
    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    /// Sets the number of worker threads that encode and write tiles.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets how long the end of each level waits for outstanding writes.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Sets the file layout of written tiles.
    #[must_use]
    pub fn output_template(mut self, template: NamingTemplate) -> Self {
        self.output_template = template;
        self
    }

    /// Also re-encodes every source tile in place, renaming it to the output template.
    #[must_use]
    pub fn reprocess(mut self, reprocess: bool) -> Self {
        self.reprocess = reprocess;
        self
    }

    /// Sets how many levels [`Self::enlarge`] descends (default 1).
    #[must_use]
    pub fn zoom_delta(mut self, zoom_delta: u8) -> Self {
        self.zoom_delta = zoom_delta.max(1);
        self
    }

    /// Sets the kernel enlargement options.
    #[must_use]
    pub fn enlarge_options(mut self, options: EnlargeOptions) -> Self {
        self.enlarge_options = options;
        self
    }

    /// Sets a progress callback invoked after every source tile.
    pub fn progress<'c>(self, progress: &'c ProgressCallback) -> Retiler<'c, S> {
        Retiler {
            store: self.store,
            interpolation: self.interpolation,
            workers: self.workers,
            drain_timeout: self.drain_timeout,
            output_template: self.output_template,
            reprocess: self.reprocess,
            zoom_delta: self.zoom_delta,
            enlarge_options: self.enlarge_options,
            progress: Some(progress),
        }
    }

    fn resolve(&self, direction: ZoomDirection) -> RetileResult<Interpolation> {
        self.interpolation
            .unwrap_or_else(|| Interpolation::default_for(direction))
            .check(direction)
    }

    /// Retiles `source` one step in `direction`, writing below `output_root`.
    ///
    /// # Errors
    ///
    /// See [`Self::downsample`] and [`Self::enlarge`].
    pub fn run(
        &self,
        direction: ZoomDirection,
        source: &TileIndex,
        output_root: &Path,
    ) -> RetileResult<RetileStats> {
        match direction {
            ZoomDirection::In => self.enlarge(source, output_root),
            ZoomDirection::Out => self.downsample(source, output_root),
        }
    }

    /// Writes the parent level of every tile in `source` below `output_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpolation cannot downsample or the worker pool fails.
    /// Unreadable source tiles and failed writes are only counted.
    pub fn downsample(&self, source: &TileIndex, output_root: &Path) -> RetileResult<RetileStats> {
        let interpolation = self.resolve(ZoomDirection::Out)?;
        log::info!(
            "Downsampling {} tiles from {} with {interpolation}",
            source.len(),
            source.root().display()
        );
        let dispatcher = Dispatcher::new(self.workers)?;
        let mut stats = RetileStats::default();
        let mut progress = Progress::new(self.progress, source.len());

        let mut group: Option<Group> = None;
        let mut acc: Option<PixelBuffer> = None;

        for tile_ref in source {
            stats.source_tiles += 1;
            progress.tick();
            let Some(dest) = tile_ref.coord.parent() else {
                log::warn!("Tile {} has no parent level, skipping", tile_ref.coord);
                continue;
            };
            if let Some(done) = group.take_if(|g| g.dest != dest) {
                self.flush(&dispatcher, output_root, &done, &mut acc, &mut stats)?;
            }
            let current = group.get_or_insert(Group { dest, decoded: 0 });

            let Some(tile) = self.read(tile_ref, &mut stats) else {
                continue;
            };
            let tile = Arc::new(tile);
            if self.reprocess {
                self.submit_reprocess(&dispatcher, source.root(), tile_ref, Arc::clone(&tile), &mut stats)?;
            }
            let (w, h) = tile.dimensions();
            if acc.as_ref().map(PixelBuffer::dimensions) != Some((w, h)) {
                if current.decoded > 0 {
                    log::warn!(
                        "{}",
                        RetileError::SizeMismatch {
                            expected: acc.as_ref().map_or((0, 0), PixelBuffer::dimensions),
                            found: (w, h),
                        }
                    );
                    stats.unreadable_tiles += 1;
                    continue;
                }
                acc = Some(PixelBuffer::new(w, h));
            }
            if let Some(acc) = acc.as_mut() {
                let place = placement(tile_ref.coord, dest, w, h);
                resample::downsample_into(acc, &tile, place, interpolation)?;
                current.decoded += 1;
            }
        }
        if let Some(done) = group.take() {
            self.flush(&dispatcher, output_root, &done, &mut acc, &mut stats)?;
        }

        self.finish(dispatcher, &mut stats);
        Ok(stats)
    }

    /// Hands a finished destination tile to the worker pool and resets the accumulator.
    fn flush(
        &self,
        dispatcher: &Dispatcher,
        output_root: &Path,
        group: &Group,
        acc: &mut Option<PixelBuffer>,
        stats: &mut RetileStats,
    ) -> RetileResult<()> {
        stats.groups += 1;
        let Some(buf) = acc.as_mut().filter(|_| group.decoded > 0) else {
            log::debug!("No readable siblings for {}, nothing written", group.dest);
            stats.empty_skipped += 1;
            return Ok(());
        };
        let tile = buf.clone();
        buf.clear();
        let path = self.output_template.path_for(output_root, group.dest);
        log::trace!("Writing {} from {} siblings", group.dest, group.decoded);
        let store = Arc::clone(&self.store);
        dispatcher.submit(move || store.write(&path, &tile))?;
        stats.submitted += 1;
        Ok(())
    }

    /// Writes the `4^d` children of every tile in `source` below `output_root`.
    ///
    /// Children whose region holds no valid pixel are skipped. Every child is resampled from
    /// its one enclosing source tile only.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpolation cannot enlarge or the worker pool fails.
    /// Unreadable source tiles and failed writes are only counted.
    pub fn enlarge(&self, source: &TileIndex, output_root: &Path) -> RetileResult<RetileStats> {
        let interpolation = self.resolve(ZoomDirection::In)?;
        let d = self.zoom_delta;
        log::info!(
            "Enlarging {} tiles from {} by {d} levels with {interpolation}",
            source.len(),
            source.root().display()
        );
        let dispatcher = Dispatcher::new(self.workers)?;
        let mut stats = RetileStats::default();
        let mut progress = Progress::new(self.progress, source.len());

        for tile_ref in source {
            stats.source_tiles += 1;
            progress.tick();
            let Some(tile) = self.read(tile_ref, &mut stats) else {
                continue;
            };
            let (w, h) = tile.dimensions();
            let tile = Arc::new(tile);
            let children = tile_ref.coord.descendants(d);
            if children.is_empty() {
                log::warn!("Tile {} cannot be enlarged by {d} levels", tile_ref.coord);
            }
            for dest in children {
                let roi = roi_for_zoom(tile_ref.coord.z(), dest.x(), dest.y(), dest.z(), w, h);
                if roi.is_empty() || !tile.has_any_data_in(roi) {
                    stats.empty_skipped += 1;
                    continue;
                }
                let path = self.output_template.path_for(output_root, dest);
                let store = Arc::clone(&self.store);
                let src = Arc::clone(&tile);
                let options = self.enlarge_options;
                dispatcher.submit(move || {
                    match resample::enlarge(&src, roi, w, h, interpolation, options)? {
                        Some(out) => store.write(&path, &out),
                        None => Ok(()),
                    }
                })?;
                stats.submitted += 1;
            }
            if self.reprocess {
                self.submit_reprocess(&dispatcher, source.root(), tile_ref, tile, &mut stats)?;
            }
        }

        self.finish(dispatcher, &mut stats);
        Ok(stats)
    }

    /// Re-encodes every tile of `index` in place, renaming it to the output template.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool fails.
    pub fn reprocess_all(&self, index: &TileIndex) -> RetileResult<RetileStats> {
        log::info!("Reprocessing {} tiles in {}", index.len(), index.root().display());
        let dispatcher = Dispatcher::new(self.workers)?;
        let mut stats = RetileStats::default();
        let mut progress = Progress::new(self.progress, index.len());
        for tile_ref in index {
            stats.source_tiles += 1;
            progress.tick();
            if let Some(tile) = self.read(tile_ref, &mut stats) {
                self.submit_reprocess(&dispatcher, index.root(), tile_ref, Arc::new(tile), &mut stats)?;
            }
        }
        self.finish(dispatcher, &mut stats);
        Ok(stats)
    }

    /// Downsamples `root/{max_zoom}` level by level until `root/{min_zoom}` exists.
    ///
    /// The top level is read with `source_template`; every level produced here is written and
    /// re-read with the output template. Stops early when a level ends up empty.
    ///
    /// # Errors
    ///
    /// Returns [`RetileError::NoTiles`] if `root/{max_zoom}` holds no tiles, or any error of
    /// [`Self::downsample`].
    pub fn build_pyramid(
        &self,
        root: &Path,
        source_template: NamingTemplate,
        max_zoom: u8,
        min_zoom: u8,
    ) -> RetileResult<Vec<RetileStats>> {
        let mut levels = Vec::new();
        for z in (min_zoom..max_zoom).rev() {
            let from = z + 1;
            let template = if from == max_zoom {
                source_template
            } else {
                self.output_template
            };
            let index = TileIndex::scan_zoom(root, template, from)?;
            if index.is_empty() {
                if from == max_zoom {
                    return Err(RetileError::NoTiles(root.join(from.to_string())));
                }
                log::info!("Zoom {from} is empty, stopping");
                break;
            }
            log::info!("Building zoom {z} from {} tiles", index.len());
            levels.push(self.downsample(&index, root)?);
        }
        Ok(levels)
    }

    fn read(&self, tile_ref: &TileRef, stats: &mut RetileStats) -> Option<PixelBuffer> {
        match self.store.read(&tile_ref.path) {
            Ok(tile) => Some(tile),
            Err(e) => {
                log::warn!("Treating {} as NODATA: {e}", tile_ref.path.display());
                stats.unreadable_tiles += 1;
                None
            }
        }
    }

    fn submit_reprocess(
        &self,
        dispatcher: &Dispatcher,
        root: &Path,
        tile_ref: &TileRef,
        tile: Arc<PixelBuffer>,
        stats: &mut RetileStats,
    ) -> RetileResult<()> {
        let target = self.output_template.path_for(root, tile_ref.coord);
        let original: PathBuf = tile_ref.path.clone();
        let store = Arc::clone(&self.store);
        dispatcher.submit(move || {
            store.write(&target, &tile)?;
            if target != original {
                store.remove(&original)?;
            }
            Ok(())
        })?;
        stats.submitted += 1;
        Ok(())
    }

    /// Drains the pool and records its outcome. A timed-out pool is detached, not joined.
    fn finish(&self, dispatcher: Dispatcher, stats: &mut RetileStats) {
        let drained = dispatcher.drain(self.drain_timeout);
        stats.completed = dispatcher.completed();
        stats.failed = dispatcher.failed();
        stats.drain_timed_out = !drained;
        if drained {
            dispatcher.join();
        }
        log::info!(
            "Done: {} written, {} failed, {} skipped as empty, {} unreadable",
            stats.completed,
            stats.failed,
            stats.empty_skipped,
            stats.unreadable_tiles
        );
    }
}

/// Reports progress to the callback and logs every tenth of the way.
struct Progress<'a> {
    callback: Option<&'a ProgressCallback>,
    total: usize,
    done: usize,
    logged_tenths: usize,
}

impl<'a> Progress<'a> {
    fn new(callback: Option<&'a ProgressCallback>, total: usize) -> Self {
        if let Some(cb) = callback {
            cb(0.0);
        }
        Self {
            callback,
            total,
            done: 0,
            logged_tenths: 0,
        }
    }

    fn tick(&mut self) {
        self.done += 1;
        if self.total == 0 {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.done as f64 / self.total as f64;
        if let Some(cb) = self.callback {
            cb(fraction);
        }
        let tenths = self.done * 10 / self.total;
        if tenths > self.logged_tenths {
            self.logged_tenths = tenths;
            log::info!("{}% ({}/{})", tenths * 10, self.done, self.total);
        }
    }
}
