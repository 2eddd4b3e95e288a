//! Interpolation kernels operating on raw channel values.
//!
//! Kernels treat all four channels alike and know nothing about NODATA; callers prepare the
//! input with [`crate::fill`] and clean the output with [`super::mask`].

use std::f32::consts::PI;

use crate::pixel::{CHANNELS, Pixel, PixelBuffer};

/// Fixed-point bilinear resize with corner-aligned sampling.
///
/// Source positions are 16.16 fixed point; the blend weights keep 7 fractional bits, so the
/// weighted sum of four pixels fits 14 bits of scale.
#[must_use]
pub fn bilinear(src: &PixelBuffer, dst_w: u32, dst_h: u32) -> PixelBuffer {
    let mut out = PixelBuffer::new(dst_w, dst_h);
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return out;
    }
    let xs = axis_steps(src_w, dst_w);
    let ys = axis_steps(src_h, dst_h);

    for (y, &(y0, y1, wy2)) in ys.iter().enumerate() {
        let wy1 = 128 - wy2;
        for (x, &(x0, x1, wx2)) in xs.iter().enumerate() {
            let wx1 = 128 - wx2;
            let p00 = src.pixel(x0, y0).to_bytes();
            let p01 = src.pixel(x1, y0).to_bytes();
            let p10 = src.pixel(x0, y1).to_bytes();
            let p11 = src.pixel(x1, y1).to_bytes();
            let mut px = [0u8; CHANNELS];
            for c in 0..CHANNELS {
                let v = u32::from(p00[c]) * wx1 * wy1
                    + u32::from(p01[c]) * wx2 * wy1
                    + u32::from(p10[c]) * wx1 * wy2
                    + u32::from(p11[c]) * wx2 * wy2;
                px[c] = (v >> 14) as u8;
            }
            out.set_pixel(x as u32, y as u32, Pixel::from_bytes(px));
        }
    }
    out
}

/// `(index, next index, 7-bit weight of next)` for every output position along one axis.
fn axis_steps(src: u32, dst: u32) -> Vec<(u32, u32, u32)> {
    let step = if dst > 1 {
        (u64::from(src - 1) << 16) / u64::from(dst - 1)
    } else {
        0
    };
    (0..u64::from(dst))
        .map(|i| {
            let coef = i * step;
            let i0 = ((coef >> 16) as u32).min(src - 1);
            let i1 = (i0 + 1).min(src - 1);
            let w = ((coef >> 9) & 127) as u32;
            (i0, i1, w)
        })
        .collect()
}

/// Windowed sinc with `a` lobes.
fn lanczos_kernel(x: f32, a: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        1.0
    } else if x.abs() >= a {
        0.0
    } else {
        let pi_x = PI * x;
        let pi_x_a = pi_x / a;
        (a * pi_x.sin() * pi_x_a.sin()) / (pi_x * pi_x_a)
    }
}

/// Normalized source weights feeding one output sample.
struct Contribution {
    start: usize,
    weights: Vec<f32>,
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn contributions(src_size: usize, dst_size: usize, lobes: f32) -> Vec<Contribution> {
    let scale = src_size as f32 / dst_size as f32;
    let filter_scale = scale.max(1.0);
    let support = lobes * filter_scale;

    (0..dst_size)
        .map(|i| {
            let center = (i as f32 + 0.5) * scale - 0.5;
            let start = (center - support).floor().max(0.0) as usize;
            let end = (((center + support).ceil().max(0.0) as usize) + 1).min(src_size);
            let start = start.min(end.saturating_sub(1));
            let mut weights: Vec<f32> = (start..end)
                .map(|s| lanczos_kernel((s as f32 - center) / filter_scale, lobes))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum.abs() > f32::EPSILON {
                for w in &mut weights {
                    *w /= sum;
                }
            }
            Contribution { start, weights }
        })
        .collect()
}

#[allow(clippy::cast_sign_loss)]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Separable Lanczos resize with `lobes` lobes (3 or 5 in practice).
///
/// The horizontal pass keeps full precision; rounding happens once, after the vertical pass.
#[must_use]
pub fn lanczos(src: &PixelBuffer, dst_w: u32, dst_h: u32, lobes: u32) -> PixelBuffer {
    let mut out = PixelBuffer::new(dst_w, dst_h);
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return out;
    }
    #[allow(clippy::cast_precision_loss)]
    let lobes = lobes as f32;
    let h = contributions(src_w as usize, dst_w as usize, lobes);
    let v = contributions(src_h as usize, dst_h as usize, lobes);

    let mut temp = vec![[0f32; CHANNELS]; src_h as usize * dst_w as usize];
    for y in 0..src_h {
        let row: Vec<[u8; CHANNELS]> = src.row_pixels(y).map(Pixel::to_bytes).collect();
        let dst = &mut temp[y as usize * dst_w as usize..][..dst_w as usize];
        for (sample, contrib) in dst.iter_mut().zip(&h) {
            for (i, w) in contrib.weights.iter().enumerate() {
                let p = row[contrib.start + i];
                for c in 0..CHANNELS {
                    sample[c] += f32::from(p[c]) * w;
                }
            }
        }
    }

    for (y, contrib) in v.iter().enumerate() {
        for x in 0..dst_w as usize {
            let mut sum = [0f32; CHANNELS];
            for (i, w) in contrib.weights.iter().enumerate() {
                let sample = temp[(contrib.start + i) * dst_w as usize + x];
                for c in 0..CHANNELS {
                    sum[c] += sample[c] * w;
                }
            }
            out.set_pixel(x as u32, y as u32, Pixel::from_bytes(sum.map(to_channel)));
        }
    }
    out
}
