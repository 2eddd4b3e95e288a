use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::tile::TileCoord;

/// File extension of tiles on disk.
pub const EXTENSION: &str = "png";

/// File name prefix used when writing [`NamingTemplate::Zxy`] and [`NamingTemplate::Xyz`] tiles.
pub const TILE_PREFIX: &str = "tile";

/// Layout of tile files below a root directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingTemplate {
    /// `{z}/{x}/{y}.png`
    #[default]
    Osm,
    /// `{z}/*_{z}_{x}_{y}.png`
    Zxy,
    /// `{z}/*_{x}_{y}_{z}.png`
    Xyz,
}

impl NamingTemplate {
    /// Extracts the tile coordinate from a path relative to the tile root.
    ///
    /// Returns `None` for anything that does not follow the template, including coordinates
    /// outside their zoom level and a file-name zoom that disagrees with its directory.
    #[must_use]
    pub fn parse(self, relative: &Path) -> Option<TileCoord> {
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        match (self, parts.as_slice()) {
            (Self::Osm, [z, x, file]) => {
                let y = strip_extension(file)?;
                TileCoord::new(z.parse().ok()?, x.parse().ok()?, y.parse().ok()?).ok()
            }
            (Self::Zxy | Self::Xyz, [z, file]) => {
                let z: u8 = z.parse().ok()?;
                let stem = strip_extension(file)?;
                let mut fields = stem.rsplitn(4, '_');
                let (c, b, a) = (fields.next()?, fields.next()?, fields.next()?);
                // Something must precede the coordinates.
                fields.next()?;
                let (fz, x, y) = if self == Self::Zxy { (a, b, c) } else { (c, a, b) };
                if fz.parse::<u8>().ok()? != z {
                    return None;
                }
                TileCoord::new(z, x.parse().ok()?, y.parse().ok()?).ok()
            }
            _ => None,
        }
    }

    /// Path of `coord` below `root`.
    #[must_use]
    pub fn path_for(self, root: &Path, coord: TileCoord) -> PathBuf {
        let (z, x, y) = (coord.z(), coord.x(), coord.y());
        let dir = root.join(z.to_string());
        match self {
            Self::Osm => dir.join(x.to_string()).join(format!("{y}.{EXTENSION}")),
            Self::Zxy => dir.join(format!("{TILE_PREFIX}_{z}_{x}_{y}.{EXTENSION}")),
            Self::Xyz => dir.join(format!("{TILE_PREFIX}_{x}_{y}_{z}.{EXTENSION}")),
        }
    }
}

fn strip_extension(file: &str) -> Option<&str> {
    let (stem, ext) = file.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(EXTENSION).then_some(stem)
}

impl fmt::Display for NamingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Osm => "osm",
            Self::Zxy => "zxy",
            Self::Xyz => "xyz",
        })
    }
}

impl FromStr for NamingTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "osm" => Ok(Self::Osm),
            "zxy" => Ok(Self::Zxy),
            "xyz" => Ok(Self::Xyz),
            _ => Err(format!("unknown naming template '{s}', expected osm, zxy or xyz")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use super::NamingTemplate::{self, Osm, Xyz, Zxy};
    use crate::tile::TileCoord;

    #[rstest]
    #[case(Osm, "3/5/6.png", Some((3, 5, 6)))]
    #[case(Osm, "3/5/6.PNG", Some((3, 5, 6)))]
    #[case(Osm, "3/5/6.jpg", None)]
    #[case(Osm, "3/9/6.png", None)]
    #[case(Osm, "3/5.png", None)]
    #[case(Osm, "z/5/6.png", None)]
    #[case(Zxy, "3/TileExport_3_5_6.png", Some((3, 5, 6)))]
    #[case(Zxy, "3/a_b_3_5_6.png", Some((3, 5, 6)))]
    #[case(Zxy, "3/TileExport_4_5_6.png", None)]
    #[case(Zxy, "3/3_5_6.png", None)]
    #[case(Xyz, "3/griddata_5_6_3.png", Some((3, 5, 6)))]
    #[case(Xyz, "2/griddata_5_6_3.png", None)]
    #[case(Xyz, "3/griddata_5_6.png", None)]
    fn test_parse(#[case] t: NamingTemplate, #[case] path: &str, #[case] expected: Option<(u8, u32, u32)>) {
        let expected = expected.map(|(z, x, y)| TileCoord::new(z, x, y).unwrap());
        assert_eq!(t.parse(Path::new(path)), expected);
    }

    #[rstest]
    #[case(Osm)]
    #[case(Zxy)]
    #[case(Xyz)]
    fn test_path_for_parses_back(#[case] t: NamingTemplate) {
        let root = Path::new("/tiles");
        let coord = TileCoord::new(7, 100, 27).unwrap();
        let path = t.path_for(root, coord);
        let relative = path.strip_prefix(root).unwrap();
        assert_eq!(t.parse(relative), Some(coord));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("XYZ".parse::<NamingTemplate>().unwrap(), Xyz);
        assert!("tms".parse::<NamingTemplate>().is_err());
    }
}
