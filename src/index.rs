//! In-memory index of the tiles below a root directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::RetileResult;
use crate::template::NamingTemplate;
use crate::tile::TileCoord;

/// A tile on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRef {
    pub coord: TileCoord,
    pub path: PathBuf,
}

/// Tiles found by a directory scan, kept sorted so that siblings are adjacent.
#[derive(Debug, Clone, Default)]
pub struct TileIndex {
    root: PathBuf,
    tiles: Vec<TileRef>,
}

impl TileIndex {
    /// Builds an index of tiles stored below `root`, dropping duplicate coordinates.
    #[must_use]
    pub fn from_refs(root: impl Into<PathBuf>, mut tiles: Vec<TileRef>) -> Self {
        tiles.sort_by_key(|t| cluster_order(t.coord));
        tiles.dedup_by(|b, a| {
            let dup = a.coord == b.coord;
            if dup {
                log::warn!("Ignoring {} which duplicates tile {}", b.path.display(), a.coord);
            }
            dup
        });
        Self {
            root: root.into(),
            tiles,
        }
    }

    /// Recursively scans `root`, keeping every file whose relative path follows `template`.
    ///
    /// Files that do not follow the template are skipped silently.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` or one of its subdirectories cannot be read.
    pub fn scan(root: &Path, template: NamingTemplate) -> RetileResult<Self> {
        Self::scan_dir(root, root, template)
    }

    /// Scans only the `root/{z}` directory.
    ///
    /// A missing zoom directory yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if the zoom directory exists but cannot be read.
    pub fn scan_zoom(root: &Path, template: NamingTemplate, z: u8) -> RetileResult<Self> {
        let dir = root.join(z.to_string());
        if !dir.is_dir() {
            return Ok(Self::from_refs(root, Vec::new()));
        }
        Self::scan_dir(root, &dir, template)
    }

    fn scan_dir(root: &Path, dir: &Path, template: NamingTemplate) -> RetileResult<Self> {
        let mut tiles = Vec::new();
        let mut skipped = 0usize;
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let coord = path
                .strip_prefix(root)
                .ok()
                .and_then(|relative| template.parse(relative));
            match coord {
                Some(coord) => tiles.push(TileRef { coord, path }),
                None => skipped += 1,
            }
        }
        log::debug!(
            "Scanned {}: {} tiles, {skipped} other files",
            dir.display(),
            tiles.len()
        );
        Ok(Self::from_refs(root, tiles))
    }

    /// Directory the tiles were found in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tiles ordered by zoom, then parent tile, then row-major position.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TileRef> {
        self.tiles.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Distinct zoom levels, ascending.
    #[must_use]
    pub fn zoom_levels(&self) -> Vec<u8> {
        self.tiles
            .iter()
            .map(|t| t.coord.z())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The tiles of one zoom level.
    #[must_use]
    pub fn at_zoom(&self, z: u8) -> Self {
        Self {
            root: self.root.clone(),
            tiles: self.tiles.iter().filter(|t| t.coord.z() == z).cloned().collect(),
        }
    }

    /// Looks up a tile by coordinate.
    #[must_use]
    pub fn get(&self, coord: TileCoord) -> Option<&TileRef> {
        self.tiles
            .binary_search_by_key(&cluster_order(coord), |t| cluster_order(t.coord))
            .ok()
            .map(|i| &self.tiles[i])
    }
}

impl<'a> IntoIterator for &'a TileIndex {
    type Item = &'a TileRef;
    type IntoIter = std::slice::Iter<'a, TileRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

/// Sort key grouping the siblings of each parent tile.
fn cluster_order(coord: TileCoord) -> (u8, u64, u64) {
    (coord.z(), coord.cluster_key(), coord.row_major_key())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn tref(z: u8, x: u32, y: u32) -> TileRef {
        TileRef {
            coord: TileCoord::new(z, x, y).unwrap(),
            path: PathBuf::from(format!("{z}/{x}/{y}.png")),
        }
    }

    #[test]
    fn test_siblings_are_contiguous() {
        let refs = vec![
            tref(2, 2, 0),
            tref(2, 0, 1),
            tref(2, 3, 1),
            tref(1, 0, 0),
            tref(2, 1, 0),
            tref(2, 0, 0),
            tref(2, 2, 1),
            tref(2, 1, 1),
            tref(2, 3, 0),
        ];
        let index = TileIndex::from_refs("", refs);
        let order: Vec<(u8, u32, u32)> = index
            .iter()
            .map(|t| (t.coord.z(), t.coord.x(), t.coord.y()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 0, 0),
                (2, 0, 0),
                (2, 1, 0),
                (2, 0, 1),
                (2, 1, 1),
                (2, 2, 0),
                (2, 3, 0),
                (2, 2, 1),
                (2, 3, 1),
            ]
        );
        assert_eq!(index.zoom_levels(), vec![1, 2]);
        assert_eq!(index.at_zoom(2).len(), 8);
        assert!(index.get(TileCoord::new(2, 3, 1).unwrap()).is_some());
        assert!(index.get(TileCoord::new(2, 3, 3).unwrap()).is_none());
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let index = TileIndex::from_refs("", vec![tref(1, 1, 1), tref(1, 1, 1)]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_scan_skips_malformed_names() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in ["1/0/1.png", "1/1/1.png", "1/1/notes.txt", "1/7/0.png", "2/0/x.png", "readme.md"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }
        let index = TileIndex::scan(root, NamingTemplate::Osm).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.zoom_levels(), vec![1]);

        let zoom = TileIndex::scan_zoom(root, NamingTemplate::Osm, 1).unwrap();
        assert_eq!(zoom.len(), 2);
        assert!(TileIndex::scan_zoom(root, NamingTemplate::Osm, 5).unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        assert!(TileIndex::scan(&dir.path().join("missing"), NamingTemplate::Osm).is_err());
    }
}
