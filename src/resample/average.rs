//! Bit-exact NODATA-aware 2x2 box filter.

use crate::pixel::{Pixel, PixelBuffer};

/// Combines two pixels without letting NODATA bleed into valid data.
///
/// Two valid pixels average per channel with round-half-up; a single valid pixel is copied
/// verbatim; two NODATA pixels stay NODATA.
#[must_use]
pub fn average_pair(a: Pixel, b: Pixel) -> Pixel {
    match (a.is_valid(), b.is_valid()) {
        (true, true) => {
            let (a, b) = (a.to_bytes(), b.to_bytes());
            let mut out = [0u8; 4];
            for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
                // Widened so 255 + 255 rounds back to 255.
                *o = ((u16::from(x) + u16::from(y) + 1) >> 1) as u8;
            }
            Pixel::from_bytes(out)
        }
        (true, false) => a,
        (false, true) => b,
        (false, false) => Pixel::NODATA,
    }
}

/// Halves a buffer with a NODATA-aware 2x2 box filter.
///
/// Each output pixel is produced by two 2x1 passes: the horizontal pairs of both source rows
/// are combined first, then the two row results are combined with the same rule. A trailing
/// odd row or column is ignored.
#[must_use]
pub fn downsample_half(src: &PixelBuffer) -> PixelBuffer {
    let (w, h) = (src.width() / 2, src.height() / 2);
    let mut out = PixelBuffer::new(w, h);
    let mut top = Vec::with_capacity(w as usize);
    let mut bottom = Vec::with_capacity(w as usize);
    for y in 0..h {
        row_pass(src, 2 * y, w, &mut top);
        row_pass(src, 2 * y + 1, w, &mut bottom);
        for (x, (t, b)) in top.iter().zip(&bottom).enumerate() {
            out.set_pixel(x as u32, y, average_pair(*t, *b));
        }
    }
    out
}

fn row_pass(src: &PixelBuffer, y: u32, w: u32, out: &mut Vec<Pixel>) {
    out.clear();
    out.extend((0..w).map(|x| average_pair(src.pixel(2 * x, y), src.pixel(2 * x + 1, y))));
}
