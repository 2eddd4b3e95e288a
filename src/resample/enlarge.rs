//! Scaling a region of one source tile up to a full destination tile.

use crate::fill::fill_nodata;
use crate::geometry::{Roi, clamp_to_source, kernel_padding};
use crate::pixel::{CHANNELS, Pixel, PixelBuffer};
use crate::resample::mask::{apply_mask, enlarge_bitmask};
use crate::resample::{EnlargeOptions, Interpolation, kernel};

/// Replicates every pixel of `roi` into a `scale_x x scale_y` block.
#[must_use]
pub fn nearest(src: &PixelBuffer, roi: Roi, scale_x: u32, scale_y: u32) -> PixelBuffer {
    let roi = roi.clip(src.width(), src.height());
    let mut out = PixelBuffer::new(roi.w * scale_x, roi.h * scale_y);
    if scale_x == 0 || scale_y == 0 {
        return out;
    }
    let block = scale_x as usize * CHANNELS;
    for sy in 0..roi.h {
        let first = sy * scale_y;
        {
            let row = out.row_mut(first);
            for (sx, chunk) in (roi.x..roi.right()).zip(row.chunks_exact_mut(block)) {
                let p = src.pixel(sx, roi.y + sy).to_bytes();
                for px in chunk.chunks_exact_mut(CHANNELS) {
                    px.copy_from_slice(&p);
                }
            }
        }
        for dy in 1..scale_y {
            out.copy_row(first, first + dy);
        }
    }
    out
}

/// Reads a neighbor of `(x, y)`, clamping the position to the buffer edge.
fn neighbor(src: &PixelBuffer, x: u32, y: u32, dx: i8, dy: i8) -> Pixel {
    let nx = x.saturating_add_signed(i32::from(dx)).min(src.width() - 1);
    let ny = y.saturating_add_signed(i32::from(dy)).min(src.height() - 1);
    src.pixel(nx, ny)
}

/// Applies a 2x rule that maps each source pixel to four output pixels
/// `[top-left, top-right, bottom-left, bottom-right]`.
fn scale2x_with(src: &PixelBuffer, rule: impl Fn(&PixelBuffer, u32, u32) -> [Pixel; 4]) -> PixelBuffer {
    let mut out = PixelBuffer::new(src.width() * 2, src.height() * 2);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let [tl, tr, bl, br] = rule(src, x, y);
            out.set_pixel(2 * x, 2 * y, tl);
            out.set_pixel(2 * x + 1, 2 * y, tr);
            out.set_pixel(2 * x, 2 * y + 1, bl);
            out.set_pixel(2 * x + 1, 2 * y + 1, br);
        }
    }
    out
}

/// EPX: splits each pixel using its four edge neighbors.
#[must_use]
pub fn epx2x(src: &PixelBuffer) -> PixelBuffer {
    scale2x_with(src, |src, x, y| {
        let p = src.pixel(x, y);
        let a = neighbor(src, x, y, 0, -1);
        let c = neighbor(src, x, y, -1, 0);
        let b = neighbor(src, x, y, 1, 0);
        let d = neighbor(src, x, y, 0, 1);
        if c != b && a != d {
            [
                if c == a { c } else { p },
                if a == b { b } else { p },
                if d == c { c } else { p },
                if b == d { b } else { p },
            ]
        } else {
            [p; 4]
        }
    })
}

/// Eagle: each output corner takes the diagonal neighbor when it matches both adjacent edges.
#[must_use]
pub fn eagle2x(src: &PixelBuffer) -> PixelBuffer {
    scale2x_with(src, |src, x, y| {
        let p = src.pixel(x, y);
        let n = |dx, dy| neighbor(src, x, y, dx, dy);
        let (north, south, west, east) = (n(0, -1), n(0, 1), n(-1, 0), n(1, 0));
        let corner = |diag: Pixel, e1: Pixel, e2: Pixel| if diag == e1 && diag == e2 { diag } else { p };
        [
            corner(n(-1, -1), west, north),
            corner(n(1, -1), north, east),
            corner(n(-1, 1), west, south),
            corner(n(1, 1), east, south),
        ]
    })
}

/// Applies a 2x rule `times` times to the crop of `roi`.
#[must_use]
pub fn repeat2x(src: &PixelBuffer, roi: Roi, times: u32, rule: fn(&PixelBuffer) -> PixelBuffer) -> PixelBuffer {
    let mut buf = src.crop(roi);
    for _ in 0..times {
        buf = rule(&buf);
    }
    buf
}

/// Enlarges `roi` to `w x h` with an interpolation kernel.
///
/// The ROI is padded right and down by the kernel reach, the part past the source edge is
/// repaired, and the padded result is cropped back to `w x h`.
#[must_use]
pub fn with_kernel(
    src: &PixelBuffer,
    roi: Roi,
    w: u32,
    h: u32,
    interpolation: Interpolation,
    options: EnlargeOptions,
) -> PixelBuffer {
    let pad = kernel_padding(interpolation.kernel_extent(), w, h, roi.w, roi.h);
    let (copy_w, copy_h) = clamp_to_source(src.width(), src.height(), roi.x, roi.y, pad.roi_w, pad.roi_h);

    let mut crop = PixelBuffer::new(pad.roi_w, pad.roi_h);
    crop.blit(src, Roi::new(roi.x, roi.y, copy_w, copy_h), 0, 0);
    fill_nodata(&mut crop, copy_w, copy_h, options.fill_neighborhood);

    let resized = match interpolation {
        Interpolation::Lanczos3 => kernel::lanczos(&crop, pad.dest_w, pad.dest_h, 3),
        Interpolation::Lanczos5 => kernel::lanczos(&crop, pad.dest_w, pad.dest_h, 5),
        _ => kernel::bilinear(&crop, pad.dest_w, pad.dest_h),
    };
    let mut out = resized.crop(Roi::new(0, 0, w, h));
    if options.mask_output {
        apply_mask(&mut out, &enlarge_bitmask(src, roi, w, h));
    }
    out
}
