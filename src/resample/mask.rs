//! Validity bitmasks that keep kernel output from ringing into NODATA.

use crate::geometry::Roi;
use crate::pixel::{Pixel, PixelBuffer};

/// Written where the mask marks data the kernel faded out entirely.
const REVIVED: Pixel = Pixel::new(0, 0, 0, 1);

/// One byte per output pixel of a 2x downsample: 1 when any pixel of the 2x2 source footprint
/// has data, 0 otherwise.
#[must_use]
pub fn alpha_bitmask(src: &PixelBuffer) -> Vec<u8> {
    let (w, h) = (src.width() / 2, src.height() / 2);
    let mut mask = Vec::with_capacity(w as usize * h as usize);
    let row_or = |y: u32, x: u32| src.pixel(2 * x, y).is_valid() | src.pixel(2 * x + 1, y).is_valid();
    for y in 0..h {
        mask.extend((0..w).map(|x| u8::from(row_or(2 * y, x) | row_or(2 * y + 1, x))));
    }
    mask
}

/// Nearest-neighbor zoom of the validity of `roi` in `src` onto a `w x h` grid.
#[must_use]
pub fn enlarge_bitmask(src: &PixelBuffer, roi: Roi, w: u32, h: u32) -> Vec<u8> {
    let mut mask = vec![0u8; w as usize * h as usize];
    if roi.is_empty() || w == 0 || h == 0 {
        return mask;
    }
    for y in 0..h {
        let sy = roi.y + (u64::from(y) * u64::from(roi.h) / u64::from(h)) as u32;
        for x in 0..w {
            let sx = roi.x + (u64::from(x) * u64::from(roi.w) / u64::from(w)) as u32;
            let valid = src.get(sx, sy).is_some_and(Pixel::is_valid);
            mask[(y * w + x) as usize] = u8::from(valid);
        }
    }
    mask
}

/// Forces pixels to NODATA where `mask` is 0. Where it is set and the kernel produced alpha 0,
/// the pixel becomes black with alpha 1 so that no ringing color survives.
pub fn apply_mask(buf: &mut PixelBuffer, mask: &[u8]) {
    let w = buf.width();
    for y in 0..buf.height() {
        for x in 0..w {
            let set = mask.get((y * w + x) as usize).is_some_and(|m| *m != 0);
            let p = buf.pixel(x, y);
            if !set {
                if p != Pixel::NODATA {
                    buf.set_pixel(x, y, Pixel::NODATA);
                }
            } else if p.is_nodata() {
                buf.set_pixel(x, y, REVIVED);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_bitmask_footprints() {
        let mut src = PixelBuffer::new(4, 2);
        src.set_pixel(3, 1, Pixel::new(0, 0, 0, 1));
        assert_eq!(alpha_bitmask(&src), vec![0, 1]);
    }

    #[test]
    fn test_apply_mask() {
        let mut buf = PixelBuffer::new(3, 1);
        buf.set_pixel(0, 0, Pixel::new(9, 9, 9, 3));
        buf.set_pixel(1, 0, Pixel::new(8, 8, 8, 0));
        buf.set_pixel(2, 0, Pixel::new(7, 7, 7, 7));
        apply_mask(&mut buf, &[0, 1, 1]);
        assert_eq!(buf.pixel(0, 0), Pixel::NODATA);
        assert_eq!(buf.pixel(1, 0), Pixel::new(0, 0, 0, 1));
        assert_eq!(buf.pixel(2, 0), Pixel::new(7, 7, 7, 7));
    }

    #[test]
    fn test_enlarge_bitmask() {
        let mut src = PixelBuffer::new(4, 4);
        src.set_pixel(2, 0, Pixel::new(1, 1, 1, 255));
        let mask = enlarge_bitmask(&src, Roi::new(2, 0, 2, 2), 4, 4);
        assert_eq!(&mask[0..4], &[1, 1, 0, 0]);
        assert_eq!(&mask[4..8], &[1, 1, 0, 0]);
        assert!(mask[8..].iter().all(|m| *m == 0));
    }
}
