use std::fmt;

use crate::{RetileError, RetileResult};

/// Highest zoom level a [`TileCoord`] may carry; keeps `2^z` and the cluster keys inside `u64`.
pub const MAX_ZOOM: u8 = 31;

/// A slippy-map tile address. Always satisfies `x, y < 2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    z: u8,
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate, validating it against its zoom level.
    ///
    /// # Errors
    ///
    /// Returns an error if `z` exceeds [`MAX_ZOOM`] or `x`/`y` are outside `0..2^z`.
    pub fn new(z: u8, x: u32, y: u32) -> RetileResult<Self> {
        if z > MAX_ZOOM {
            return Err(RetileError::InvalidZoom(z));
        }
        let side = 1u64 << z;
        if u64::from(x) >= side || u64::from(y) >= side {
            return Err(RetileError::InvalidTileCoord { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    #[must_use]
    pub fn z(&self) -> u8 {
        self.z
    }

    #[must_use]
    pub fn x(&self) -> u32 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// The tile `d` levels up that covers this one, or `None` when `d > z`.
    #[must_use]
    pub fn ancestor(&self, d: u8) -> Option<Self> {
        if d > self.z {
            return None;
        }
        Some(Self {
            z: self.z - d,
            x: self.x >> d,
            y: self.y >> d,
        })
    }

    /// The covering tile one zoom level up.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.ancestor(1)
    }

    /// All `4^d` tiles at `z + d` that this tile covers, row by row.
    ///
    /// Returns an empty list when `z + d` exceeds [`MAX_ZOOM`].
    #[must_use]
    pub fn descendants(&self, d: u8) -> Vec<Self> {
        let Some(z) = self.z.checked_add(d).filter(|z| *z <= MAX_ZOOM) else {
            return Vec::new();
        };
        let n = 1u32 << d;
        let (x0, y0) = (self.x << d, self.y << d);
        (0..n)
            .flat_map(|dy| {
                (0..n).map(move |dx| Self {
                    z,
                    x: x0 + dx,
                    y: y0 + dy,
                })
            })
            .collect()
    }

    /// Row-major position of this tile within its zoom level.
    #[must_use]
    pub fn row_major_key(&self) -> u64 {
        (u64::from(self.y) << self.z) + u64::from(self.x)
    }

    /// Sort key that places the (up to) four siblings sharing a parent next to each other.
    ///
    /// This is the row-major position of the parent tile. It is only used for ordering.
    #[must_use]
    pub fn cluster_key(&self) -> u64 {
        match self.parent() {
            Some(p) => p.row_major_key(),
            None => 0,
        }
    }

    /// Index of this tile inside its parent: 0 top-left, 1 top-right, 2 bottom-left, 3 bottom-right.
    #[must_use]
    pub fn quadrant(&self) -> usize {
        (((self.y & 1) << 1) | (self.x & 1)) as usize
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
