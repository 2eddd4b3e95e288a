//! In-place NODATA repair of padded crops, run before an interpolation kernel reads them.

use crate::geometry::Roi;
use crate::pixel::{CHANNELS, Pixel, PixelBuffer};

/// Replicates the last copied column rightward and the last copied row downward.
///
/// `data_w x data_h` is the part of `buf` that holds real pixels; everything up to
/// `padded_w x padded_h` (clipped to the buffer) is overwritten. Nothing happens when no data
/// was copied at all.
pub fn edge_extend(buf: &mut PixelBuffer, padded_w: u32, padded_h: u32, data_w: u32, data_h: u32) {
    let padded_w = padded_w.min(buf.width());
    let padded_h = padded_h.min(buf.height());
    let data_w = data_w.min(padded_w);
    let data_h = data_h.min(padded_h);
    if data_w == 0 || data_h == 0 {
        return;
    }

    if data_w < padded_w {
        let start = data_w as usize * CHANNELS;
        let end = padded_w as usize * CHANNELS;
        for y in 0..data_h {
            let row = buf.row_mut(y);
            let mut last = [0u8; CHANNELS];
            last.copy_from_slice(&row[start - CHANNELS..start]);
            for px in row[start..end].chunks_exact_mut(CHANNELS) {
                px.copy_from_slice(&last);
            }
        }
    }
    for y in data_h..padded_h {
        buf.copy_row(y - 1, y);
    }
}

/// Window bounds `(back, forward)` around a center pixel for a square cell.
fn cell_reach(cell_size: u32) -> (u32, u32) {
    if cell_size % 2 == 0 {
        (cell_size / 2 - 1, cell_size / 2)
    } else {
        ((cell_size - 1) / 2, (cell_size - 1) / 2)
    }
}

/// Spreads the mean of each valid pixel's neighborhood into the NODATA pixels of that
/// neighborhood.
///
/// Only pixels that were valid before the call seed a window, so the cost scales with the
/// number of valid pixels. Means are taken over pixels that were valid before the call. With
/// `smoothing`, pixels filled earlier in the same pass also count toward later means. It is
/// only honored when `region` covers the whole buffer; a windowed pass would leave seams at
/// the window border.
pub fn neighborhood_mean_fill(buf: &mut PixelBuffer, cell_size: u32, region: Roi, smoothing: bool) {
    let region = region.clip(buf.width(), buf.height());
    if cell_size == 0 || region.is_empty() {
        return;
    }
    let smoothing = smoothing && region == buf.bounds();
    let (back, fwd) = cell_reach(cell_size);
    let snapshot = buf.clone();

    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            if snapshot.pixel(x, y).is_nodata() {
                continue;
            }
            let x0 = x.saturating_sub(back).max(region.x);
            let y0 = y.saturating_sub(back).max(region.y);
            let x1 = x.saturating_add(fwd).min(region.right() - 1);
            let y1 = y.saturating_add(fwd).min(region.bottom() - 1);

            let source = if smoothing { &*buf } else { &snapshot };
            let mut sum = [0u32; CHANNELS];
            let mut n = 0u32;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let p = source.pixel(nx, ny);
                    if p.is_valid() {
                        for (s, c) in sum.iter_mut().zip(p.to_bytes()) {
                            *s += u32::from(c);
                        }
                        n += 1;
                    }
                }
            }
            if n == 0 {
                continue;
            }
            let mean = sum.map(|s| ((s + n / 2) / n) as u8);
            let mean = Pixel::from_bytes(mean);

            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    if snapshot.pixel(nx, ny).is_nodata() {
                        buf.set_pixel(nx, ny, mean);
                    }
                }
            }
        }
    }
}

/// Repairs a padded crop where only `data_w x data_h` was copied from the source.
///
/// Always edge-extends into the padding; with `neighborhood` it then fills NODATA holes from
/// smoothed neighborhood means, using a cell wide enough to bridge the padding.
pub fn fill_nodata(buf: &mut PixelBuffer, data_w: u32, data_h: u32, neighborhood: bool) {
    let (w, h) = buf.dimensions();
    edge_extend(buf, w, h, data_w, data_h);
    if neighborhood {
        let max_gap = w.saturating_sub(data_w).max(h.saturating_sub(data_h));
        let cell = max_gap.saturating_mul(2).saturating_add(2).min(w).max(3);
        let bounds = buf.bounds();
        neighborhood_mean_fill(buf, cell, bounds, true);
    }
}
