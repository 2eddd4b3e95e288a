//! NODATA-aware resampling of tiles by powers of two.
//!
//! Downsampling halves a tile with either the bit-exact [`Interpolation::Average`] filter or an
//! interpolation kernel whose output is masked by the 2x2 validity of its source footprint.
//! Enlarging reads a region of one source tile and scales it up to a full tile, either by
//! pixel replication (nearest, EPX, Eagle) or through a padded and repaired kernel crop.
//!
//! Every enlargement first probes its region; a region without any valid pixel yields `None`
//! so that no empty tile is ever written.
//!
//! ```
//! use retile::resample::{Interpolation, downsample};
//! use retile::{Pixel, PixelBuffer};
//!
//! let mut tile = PixelBuffer::new(2, 2);
//! tile.set_pixel(0, 0, Pixel::new(10, 10, 10, 255));
//!
//! let half = downsample(&tile, Interpolation::Average).unwrap();
//! assert_eq!(half.pixel(0, 0), Pixel::new(10, 10, 10, 255));
//! ```

pub mod average;
pub mod enlarge;
pub mod kernel;
pub mod mask;

use std::fmt;
use std::str::FromStr;

use crate::geometry::Roi;
use crate::pixel::PixelBuffer;
use crate::{RetileError, RetileResult};

/// Direction of a one-level retile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Enlarge tiles into the next finer zoom level.
    In,
    /// Downsample tiles into the next coarser zoom level.
    Out,
}

/// Resampling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Pixel replication. Enlarge only.
    Nearest,
    /// Fixed-point bilinear kernel.
    Bilinear,
    /// Lanczos kernel with 3 lobes.
    Lanczos3,
    /// Lanczos kernel with 5 lobes.
    Lanczos5,
    /// NODATA-aware 2x2 box filter. Downsample only.
    Average,
    /// EPX edge-preserving 2x split. Enlarge only.
    Epx,
    /// Eagle diagonal-aware 2x split. Enlarge only.
    Eagle,
}

impl Interpolation {
    /// All algorithms, in the order they are listed to users.
    pub const ALL: [Self; 7] = [
        Self::Nearest,
        Self::Bilinear,
        Self::Lanczos3,
        Self::Lanczos5,
        Self::Average,
        Self::Epx,
        Self::Eagle,
    ];

    /// The algorithm used when none is requested.
    #[must_use]
    pub fn default_for(direction: ZoomDirection) -> Self {
        match direction {
            ZoomDirection::In => Self::Epx,
            ZoomDirection::Out => Self::Lanczos3,
        }
    }

    /// Width of the filter in source pixels, which drives crop padding.
    #[must_use]
    pub fn kernel_extent(self) -> u32 {
        match self {
            Self::Nearest | Self::Average | Self::Epx | Self::Eagle => 1,
            Self::Bilinear => 2,
            Self::Lanczos3 => 3,
            Self::Lanczos5 => 5,
        }
    }

    #[must_use]
    pub fn supports_downsample(self) -> bool {
        matches!(
            self,
            Self::Average | Self::Bilinear | Self::Lanczos3 | Self::Lanczos5
        )
    }

    #[must_use]
    pub fn supports_enlarge(self) -> bool {
        !matches!(self, Self::Average)
    }

    /// Checks that this algorithm can retile in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`RetileError::DownsampleUnsupported`] or [`RetileError::EnlargeUnsupported`].
    pub fn check(self, direction: ZoomDirection) -> RetileResult<Self> {
        match direction {
            ZoomDirection::Out if !self.supports_downsample() => {
                Err(RetileError::DownsampleUnsupported(self))
            }
            ZoomDirection::In if !self.supports_enlarge() => Err(RetileError::EnlargeUnsupported(self)),
            _ => Ok(self),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Lanczos3 => "lanczos3",
            Self::Lanczos5 => "lanczos5",
            Self::Average => "average",
            Self::Epx => "epx",
            Self::Eagle => "eagle",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        match s.as_str() {
            "nn" => Ok(Self::Nearest),
            _ => Self::ALL
                .into_iter()
                .find(|i| i.name() == s)
                .ok_or_else(|| format!("unknown interpolation '{s}'")),
        }
    }
}

/// Options for the kernel enlargement path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnlargeOptions {
    /// Fill NODATA holes from neighborhood means before the kernel runs.
    pub fill_neighborhood: bool,
    /// Restore the NODATA footprint of the source on the kernel output.
    pub mask_output: bool,
}

/// Halves `src`, keeping NODATA regions empty.
///
/// # Errors
///
/// Returns [`RetileError::DownsampleUnsupported`] for enlarge-only algorithms.
pub fn downsample(src: &PixelBuffer, interpolation: Interpolation) -> RetileResult<PixelBuffer> {
    interpolation.check(ZoomDirection::Out)?;
    if interpolation == Interpolation::Average {
        return Ok(average::downsample_half(src));
    }
    let (w, h) = (src.width() / 2, src.height() / 2);
    let mut out = match interpolation {
        Interpolation::Bilinear => kernel::bilinear(src, w, h),
        Interpolation::Lanczos5 => kernel::lanczos(src, w, h, 5),
        _ => kernel::lanczos(src, w, h, 3),
    };
    mask::apply_mask(&mut out, &mask::alpha_bitmask(src));
    Ok(out)
}

/// Downsamples `src` into the quadrant `placement` of an accumulation buffer.
///
/// # Errors
///
/// Returns [`RetileError::DownsampleUnsupported`] for enlarge-only algorithms.
pub fn downsample_into(
    acc: &mut PixelBuffer,
    src: &PixelBuffer,
    placement: Roi,
    interpolation: Interpolation,
) -> RetileResult<()> {
    let half = downsample(src, interpolation)?;
    acc.blit(&half, Roi::new(0, 0, placement.w, placement.h), placement.x, placement.y);
    Ok(())
}

/// Enlarges `roi` of `src` to a `w x h` tile, or returns `None` when the region holds no data.
///
/// `w / roi.w` must be a power of two for the EPX and Eagle rules; other algorithms accept
/// any integer ratio.
///
/// # Errors
///
/// Returns [`RetileError::EnlargeUnsupported`] for downsample-only algorithms.
pub fn enlarge(
    src: &PixelBuffer,
    roi: Roi,
    w: u32,
    h: u32,
    interpolation: Interpolation,
    options: EnlargeOptions,
) -> RetileResult<Option<PixelBuffer>> {
    interpolation.check(ZoomDirection::In)?;
    let roi = roi.clip(src.width(), src.height());
    if roi.is_empty() || !src.has_any_data_in(roi) {
        return Ok(None);
    }
    let (scale_x, scale_y) = (w / roi.w, h / roi.h);
    let out = match interpolation {
        Interpolation::Nearest => enlarge::nearest(src, roi, scale_x, scale_y),
        Interpolation::Epx | Interpolation::Eagle => {
            let rule = if interpolation == Interpolation::Epx {
                enlarge::epx2x
            } else {
                enlarge::eagle2x
            };
            let times = scale_x.min(scale_y).max(1).ilog2();
            let scaled = enlarge::repeat2x(src, roi, times, rule);
            if scaled.dimensions() == (w, h) {
                scaled
            } else {
                // Non power-of-two ratio: finish with block replication.
                let (sw, sh) = scaled.dimensions();
                enlarge::nearest(&scaled, scaled.bounds(), w / sw.max(1), h / sh.max(1))
            }
        }
        _ => enlarge::with_kernel(src, roi, w, h, interpolation, options),
    };
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::Pixel;

    #[rstest]
    #[case("nearest", Interpolation::Nearest)]
    #[case("NN", Interpolation::Nearest)]
    #[case("Lanczos3", Interpolation::Lanczos3)]
    #[case("eagle", Interpolation::Eagle)]
    fn test_parse(#[case] s: &str, #[case] expected: Interpolation) {
        assert_eq!(s.parse::<Interpolation>().unwrap(), expected);
    }

    #[test]
    fn test_display_round_trips() {
        for i in Interpolation::ALL {
            assert_eq!(i.to_string().parse::<Interpolation>().unwrap(), i);
        }
        assert!("cubic".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_direction_support() {
        assert!(Interpolation::Epx.check(ZoomDirection::Out).is_err());
        assert!(Interpolation::Nearest.check(ZoomDirection::Out).is_err());
        assert!(Interpolation::Average.check(ZoomDirection::In).is_err());
        for d in [ZoomDirection::In, ZoomDirection::Out] {
            assert!(Interpolation::default_for(d).check(d).is_ok());
        }
    }

    /// For every 2x2 footprint, output alpha is 0 exactly when all four source alphas are 0.
    #[rstest]
    #[case(Interpolation::Bilinear)]
    #[case(Interpolation::Lanczos3)]
    #[case(Interpolation::Lanczos5)]
    #[case(Interpolation::Average)]
    fn test_masked_downsample_law(#[case] interpolation: Interpolation) {
        let mut src = PixelBuffer::new(16, 16);
        for y in 0..16u32 {
            for x in 0..16u32 {
                // Sparse pattern with faint alphas that kernels would blur to 0.
                if (x * 7 + y * 3) % 11 == 0 {
                    src.set_pixel(x, y, Pixel::new(250, 10, 10, 1));
                }
            }
        }
        let out = downsample(&src, interpolation).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let footprint = Roi::new(2 * x, 2 * y, 2, 2);
                assert_eq!(
                    out.pixel(x, y).is_valid(),
                    src.has_any_data_in(footprint),
                    "{interpolation} at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_downsample_into_quadrant() {
        let mut src = PixelBuffer::new(4, 4);
        src.fill(Pixel::new(1, 2, 3, 255));
        let mut acc = PixelBuffer::new(4, 4);
        downsample_into(&mut acc, &src, Roi::new(2, 0, 2, 2), Interpolation::Average).unwrap();
        assert_eq!(acc.data_count_in(acc.bounds()), 4);
        assert_eq!(acc.pixel(3, 1), Pixel::new(1, 2, 3, 255));
        assert_eq!(acc.pixel(1, 1), Pixel::NODATA);
    }

    #[rstest]
    #[case(Interpolation::Nearest)]
    #[case(Interpolation::Bilinear)]
    #[case(Interpolation::Lanczos3)]
    #[case(Interpolation::Epx)]
    #[case(Interpolation::Eagle)]
    fn test_enlarge_empty_roi_is_skipped(#[case] interpolation: Interpolation) {
        let mut src = PixelBuffer::new(8, 8);
        src.set_pixel(7, 7, Pixel::new(1, 1, 1, 255));
        let out = enlarge(&src, Roi::new(0, 0, 4, 4), 8, 8, interpolation, EnlargeOptions::default());
        assert!(out.unwrap().is_none());
        let out = enlarge(&src, Roi::new(4, 4, 4, 4), 8, 8, interpolation, EnlargeOptions::default());
        assert_eq!(out.unwrap().unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_enlarge_nearest_1x1() {
        let mut src = PixelBuffer::new(1, 1);
        src.set_pixel(0, 0, Pixel::new(4, 5, 6, 7));
        let out = enlarge(&src, src.bounds(), 2, 2, Interpolation::Nearest, EnlargeOptions::default())
            .unwrap()
            .unwrap();
        assert!((0..2).all(|y| out.row_pixels(y).all(|p| p == Pixel::new(4, 5, 6, 7))));
    }

    #[rstest]
    #[case(Interpolation::Epx)]
    #[case(Interpolation::Eagle)]
    fn test_enlarge_multi_level(#[case] interpolation: Interpolation) {
        let mut src = PixelBuffer::new(8, 8);
        src.fill(Pixel::new(9, 9, 9, 255));
        let out = enlarge(&src, Roi::new(2, 2, 2, 2), 8, 8, interpolation, EnlargeOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.dimensions(), (8, 8));
    }
}
