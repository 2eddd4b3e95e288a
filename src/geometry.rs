//! Pixel placement across zoom levels.
//!
//! All functions here are total: degenerate input yields an empty [`Roi`] or a zero offset
//! instead of an error, and callers treat an empty region as "nothing to do".

use crate::tile::TileCoord;

/// A pixel rectangle inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Roi {
    #[must_use]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// A region with no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// One past the last column.
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// One past the last row.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Intersects the region with a `width` x `height` buffer anchored at the origin.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            w: self.right().min(width) - x,
            h: self.bottom().min(height) - y,
        }
    }
}

/// Pixel offset of one tile inside another across a zoom delta.
///
/// When `src_z > dest_z` this is where the downsampled source lands in the destination
/// buffer; otherwise it is where the destination's footprint starts inside the source.
#[must_use]
pub fn pixel_offset(src_coord: u32, src_z: u8, dest_coord: u32, dest_z: u8, tile_size: u32) -> u32 {
    let ts = u64::from(tile_size);
    let (fine, coarse, d) = if src_z > dest_z {
        (src_coord, dest_coord, src_z - dest_z)
    } else {
        (dest_coord, src_coord, dest_z - src_z)
    };
    let Some(scaled) = u64::from(fine).checked_mul(ts).and_then(|v| v.checked_shr(u32::from(d)))
    else {
        return 0;
    };
    let origin = u64::from(coarse) * ts;
    u32::try_from(scaled.saturating_sub(origin)).unwrap_or(u32::MAX)
}

/// The region of a source tile at `src_z` that enlarges into destination tile
/// `(dest_x, dest_y)` at `dest_z`.
///
/// Only exact for nearest-neighbor; other kernels need [`kernel_padding`] on top. A zoom delta
/// that shrinks the tile below one pixel gives an empty region.
#[must_use]
pub fn roi_for_zoom(src_z: u8, dest_x: u32, dest_y: u32, dest_z: u8, w: u32, h: u32) -> Roi {
    let d = u32::from(dest_z.saturating_sub(src_z));
    let (Some(src_x), Some(src_y)) = (dest_x.checked_shr(d), dest_y.checked_shr(d)) else {
        return Roi::default();
    };
    Roi {
        x: pixel_offset(src_x, src_z, dest_x, dest_z, w),
        y: pixel_offset(src_y, src_z, dest_y, dest_z, h),
        w: w.checked_shr(d).unwrap_or(0),
        h: h.checked_shr(d).unwrap_or(0),
    }
}

/// Region of `dest` covered by `src` once `src` has been downsampled into it.
#[must_use]
pub fn placement(src: TileCoord, dest: TileCoord, w: u32, h: u32) -> Roi {
    let d = u32::from(src.z().saturating_sub(dest.z()));
    Roi {
        x: pixel_offset(src.x(), src.z(), dest.x(), dest.z(), w),
        y: pixel_offset(src.y(), src.z(), dest.y(), dest.z(), h),
        w: w.checked_shr(d).unwrap_or(0),
        h: h.checked_shr(d).unwrap_or(0),
    }
}

/// Padded crop and output sizes for one kernel enlargement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelPadding {
    /// Extra source pixels read past the right and bottom ROI edges.
    pub reach: u32,
    /// Padded ROI width in source pixels.
    pub roi_w: u32,
    /// Padded ROI height in source pixels.
    pub roi_h: u32,
    /// Padded output width; the first `w` columns form the tile.
    pub dest_w: u32,
    /// Padded output height; the first `h` rows form the tile.
    pub dest_h: u32,
}

/// Pads an enlargement ROI so a kernel of one-sided `kernel_extent` never reads past the edge.
///
/// Padding extends right and down only. The padded destination grows by the same zoom
/// factor that maps `roi_w x roi_h` onto `w x h`.
#[must_use]
pub fn kernel_padding(kernel_extent: u32, w: u32, h: u32, roi_w: u32, roi_h: u32) -> KernelPadding {
    let reach = if kernel_extent % 2 == 1 {
        kernel_extent / 2 + 1
    } else {
        kernel_extent / 2
    };
    let scale_x = w.checked_div(roi_w).unwrap_or(0);
    let scale_y = h.checked_div(roi_h).unwrap_or(0);
    if scale_x == 0 || scale_y == 0 {
        return KernelPadding {
            reach: 0,
            roi_w,
            roi_h,
            dest_w: w,
            dest_h: h,
        };
    }
    KernelPadding {
        reach,
        roi_w: roi_w.saturating_add(reach),
        roi_h: roi_h.saturating_add(reach),
        dest_w: w.saturating_add(reach.saturating_mul(scale_x)),
        dest_h: h.saturating_add(reach.saturating_mul(scale_y)),
    }
}

/// How much of a padded crop starting at `(roi_x, roi_y)` can actually be copied from a
/// `width` x `height` source. The remainder must be repaired with [`crate::fill::edge_extend`].
#[must_use]
pub fn clamp_to_source(
    width: u32,
    height: u32,
    roi_x: u32,
    roi_y: u32,
    padded_w: u32,
    padded_h: u32,
) -> (u32, u32) {
    (
        padded_w.min(width.saturating_sub(roi_x)),
        padded_h.min(height.saturating_sub(roi_y)),
    )
}
