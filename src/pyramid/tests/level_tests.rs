use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use super::*;
use crate::{Interpolation, PngStore, Retiler, Roi, ZoomDirection};

fn write_png(root: &Path, template: NamingTemplate, c: TileCoord, tile: &PixelBuffer) {
    PngStore::new()
        .write(&template.path_for(root, c), tile)
        .unwrap();
}

fn read_png(root: &Path, template: NamingTemplate, c: TileCoord) -> PixelBuffer {
    PngStore::new()
        .read(&template.path_for(root, c))
        .unwrap()
}

#[test]
fn test_build_pyramid_down_to_zoom_zero() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        write_png(root, NamingTemplate::Osm, coord(2, x, y), &solid(8, RED));
    }
    write_png(root, NamingTemplate::Osm, coord(2, 3, 3), &solid(8, BLUE));

    let levels = Retiler::new(Arc::new(PngStore::new()))
        .interpolation(Interpolation::Average)
        .workers(4)
        .build_pyramid(root, NamingTemplate::Osm, 2, 0)
        .unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].completed(), 2);
    assert_eq!(levels[1].completed(), 1);

    let z1 = read_png(root, NamingTemplate::Osm, coord(1, 1, 1));
    assert_eq!(z1.pixel(0, 0), Pixel::NODATA);
    assert_eq!(z1.pixel(7, 7), BLUE);
    assert_eq!(read_png(root, NamingTemplate::Osm, coord(1, 0, 0)), solid(8, RED));

    let z0 = read_png(root, NamingTemplate::Osm, coord(0, 0, 0));
    assert_eq!(z0.pixel(0, 0), RED);
    assert_eq!(z0.pixel(3, 3), RED);
    assert_eq!(z0.pixel(7, 0), Pixel::NODATA);
    assert_eq!(z0.pixel(4, 4), Pixel::NODATA);
    assert_eq!(z0.pixel(7, 7), BLUE);
}

#[test]
fn test_build_pyramid_switches_to_output_template() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_png(root, NamingTemplate::Xyz, coord(2, 3, 1), &solid(4, GREEN));

    let levels = Retiler::new(Arc::new(PngStore::new()))
        .output_template(NamingTemplate::Zxy)
        .build_pyramid(root, NamingTemplate::Xyz, 2, 0)
        .unwrap();
    assert_eq!(levels.len(), 2);
    assert!(NamingTemplate::Zxy.path_for(root, coord(1, 1, 0)).is_file());
    assert!(NamingTemplate::Zxy.path_for(root, coord(0, 0, 0)).is_file());
}

#[test]
fn test_build_pyramid_without_tiles_fails() {
    let dir = tempdir().unwrap();
    let result = Retiler::new(Arc::new(PngStore::new())).build_pyramid(
        dir.path(),
        NamingTemplate::Osm,
        4,
        0,
    );
    assert!(matches!(result, Err(RetileError::NoTiles(path)) if path.ends_with("4")));
}

#[test]
fn test_build_pyramid_with_equal_zooms_does_nothing() {
    let dir = tempdir().unwrap();
    let levels = Retiler::new(Arc::new(PngStore::new()))
        .build_pyramid(dir.path(), NamingTemplate::Osm, 3, 3)
        .unwrap();
    assert!(levels.is_empty());
}

#[test]
fn test_enlarge_scanned_tiles() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    let mut tile = PixelBuffer::new(4, 4);
    tile.blit(&solid(2, WHITE), Roi::new(0, 0, 2, 2), 2, 2);
    write_png(&src, NamingTemplate::Osm, coord(4, 2, 9), &tile);
    fs::write(src.join("4").join("notes.txt"), b"not a tile").unwrap();

    let index = TileIndex::scan(&src, NamingTemplate::Osm).unwrap();
    assert_eq!(index.len(), 1);
    let stats = Retiler::new(Arc::new(PngStore::new()))
        .run(ZoomDirection::In, &index, &out)
        .unwrap();
    assert_eq!(stats.completed(), 1);
    assert_eq!(stats.empty_skipped(), 3);
    assert_eq!(read_png(&out, NamingTemplate::Osm, coord(5, 5, 19)), solid(4, WHITE));
    assert!(!NamingTemplate::Osm.path_for(&out, coord(5, 4, 18)).exists());
}

#[test]
fn test_reprocess_all_renames_in_place() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let mut tile = solid(4, RED);
    tile.set_pixel(1, 2, Pixel::NODATA);
    for c in [coord(3, 0, 0), coord(3, 7, 5)] {
        write_png(root, NamingTemplate::Zxy, c, &tile);
    }

    let index = TileIndex::scan(root, NamingTemplate::Zxy).unwrap();
    let stats = Retiler::new(Arc::new(PngStore::new()))
        .output_template(NamingTemplate::Osm)
        .reprocess_all(&index)
        .unwrap();
    assert_eq!(stats.completed(), 2);

    for c in [coord(3, 0, 0), coord(3, 7, 5)] {
        assert!(!NamingTemplate::Zxy.path_for(root, c).exists());
        assert_eq!(read_png(root, NamingTemplate::Osm, c), tile);
    }
}
