//! Owned RGBA8 pixel storage.
//!
//! Pixels are stored as `[r, g, b, a]`, so a little-endian 32-bit read of one pixel puts the
//! alpha byte in the most significant position. Alpha doubles as the validity marker: a pixel
//! whose alpha is 0 is NODATA, regardless of its color channels.

use crate::geometry::Roi;
use crate::{RetileError, RetileResult};

/// Bytes per pixel.
pub const CHANNELS: usize = 4;

/// A single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// The all-zero NODATA pixel.
    pub const NODATA: Self = Self::new(0, 0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Packs the pixel the way a little-endian 32-bit load of its bytes would see it.
    #[must_use]
    pub const fn to_le_u32(self) -> u32 {
        u32::from_le_bytes(self.to_bytes())
    }

    #[must_use]
    pub const fn from_le_u32(v: u32) -> Self {
        Self::from_bytes(v.to_le_bytes())
    }

    /// `true` when the alpha byte is 0.
    #[must_use]
    pub const fn is_nodata(self) -> bool {
        self.a == 0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.a != 0
    }
}

/// A rectangular RGBA8 image with an explicit row stride in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates a buffer filled with NODATA.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * CHANNELS;
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// Wraps existing pixel bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RetileError::InvalidBuffer`] when the stride is shorter than a row or `data`
    /// cannot hold `height` rows of `stride` bytes.
    pub fn from_raw(width: u32, height: u32, stride: usize, data: Vec<u8>) -> RetileResult<Self> {
        let row = width as usize * CHANNELS;
        let needed = stride.checked_mul(height as usize);
        match needed {
            Some(needed) if stride >= row && data.len() >= needed => Ok(Self {
                width,
                height,
                stride,
                data,
            }),
            _ => Err(RetileError::InvalidBuffer {
                width,
                height,
                stride,
                len: data.len(),
            }),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The full extent of the buffer as a region.
    #[must_use]
    pub fn bounds(&self) -> Roi {
        Roi::new(0, 0, self.width, self.height)
    }

    /// Returns the pixel bytes as tightly packed rows, dropping any stride padding.
    #[must_use]
    pub fn into_packed(self) -> Vec<u8> {
        let row = self.width as usize * CHANNELS;
        if self.stride == row {
            let mut data = self.data;
            data.truncate(row * self.height as usize);
            return data;
        }
        let mut out = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * CHANNELS
    }

    /// Reads one pixel, or `None` outside the buffer.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        let b = self.data.get(o..o + CHANNELS)?;
        Some(Pixel::new(b[0], b[1], b[2], b[3]))
    }

    /// Reads one pixel.
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` lies outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let o = self.offset(x, y);
        let b = &self.data[o..o + CHANNELS];
        Pixel::new(b[0], b[1], b[2], b[3])
    }

    /// Writes one pixel.
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` lies outside the buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, p: Pixel) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let o = self.offset(x, y);
        self.data[o..o + CHANNELS].copy_from_slice(&p.to_bytes());
    }

    /// The `width * 4` bytes of row `y`.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let o = y as usize * self.stride;
        &self.data[o..o + self.width as usize * CHANNELS]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let o = y as usize * self.stride;
        let len = self.width as usize * CHANNELS;
        &mut self.data[o..o + len]
    }

    /// Iterates the pixels of row `y`.
    pub fn row_pixels(&self, y: u32) -> impl Iterator<Item = Pixel> + '_ {
        self.row(y)
            .chunks_exact(CHANNELS)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
    }

    /// Copies row `src_y` over row `dst_y`.
    pub fn copy_row(&mut self, src_y: u32, dst_y: u32) {
        if src_y == dst_y {
            return;
        }
        let len = self.width as usize * CHANNELS;
        let src = src_y as usize * self.stride;
        let dst = dst_y as usize * self.stride;
        self.data.copy_within(src..src + len, dst);
    }

    /// Sets every pixel to `p`.
    pub fn fill(&mut self, p: Pixel) {
        let bytes = p.to_bytes();
        for y in 0..self.height {
            for px in self.row_mut(y).chunks_exact_mut(CHANNELS) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    /// Resets every pixel to NODATA.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// `true` if any pixel inside `roi` (clipped to the buffer) has data.
    #[must_use]
    pub fn has_any_data_in(&self, roi: Roi) -> bool {
        let roi = roi.clip(self.width, self.height);
        (roi.y..roi.bottom()).any(|y| {
            let row = self.row(y);
            let start = roi.x as usize * CHANNELS;
            let end = roi.right() as usize * CHANNELS;
            row[start..end].chunks_exact(CHANNELS).any(|c| c[3] != 0)
        })
    }

    /// `true` if any pixel of the buffer has data.
    #[must_use]
    pub fn has_any_data(&self) -> bool {
        self.has_any_data_in(self.bounds())
    }

    /// Number of valid pixels inside `roi` (clipped to the buffer).
    #[must_use]
    pub fn data_count_in(&self, roi: Roi) -> usize {
        let roi = roi.clip(self.width, self.height);
        (roi.y..roi.bottom())
            .map(|y| {
                let start = roi.x as usize * CHANNELS;
                let end = roi.right() as usize * CHANNELS;
                self.row(y)[start..end]
                    .chunks_exact(CHANNELS)
                    .filter(|c| c[3] != 0)
                    .count()
            })
            .sum()
    }

    /// `true` when every pixel has alpha 255.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        (0..self.height).all(|y| self.row(y).chunks_exact(CHANNELS).all(|c| c[3] == u8::MAX))
    }

    /// Copies `src_roi` of `src` into this buffer with its top-left corner at `(dst_x, dst_y)`.
    ///
    /// Both rectangles are clipped; pixels that would land outside either buffer are skipped.
    pub fn blit(&mut self, src: &PixelBuffer, src_roi: Roi, dst_x: u32, dst_y: u32) {
        let src_roi = src_roi.clip(src.width, src.height);
        let w = src_roi.w.min(self.width.saturating_sub(dst_x));
        let h = src_roi.h.min(self.height.saturating_sub(dst_y));
        let len = w as usize * CHANNELS;
        for row in 0..h {
            let s = src.offset(src_roi.x, src_roi.y + row);
            let d = self.offset(dst_x, dst_y + row);
            self.data[d..d + len].copy_from_slice(&src.data[s..s + len]);
        }
    }

    /// Returns a copy of `roi` (clipped to the buffer) as a new tightly packed buffer.
    #[must_use]
    pub fn crop(&self, roi: Roi) -> PixelBuffer {
        let roi = roi.clip(self.width, self.height);
        let mut out = PixelBuffer::new(roi.w, roi.h);
        out.blit(self, roi, 0, 0);
        out
    }
}
