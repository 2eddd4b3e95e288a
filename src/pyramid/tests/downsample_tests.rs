use std::path::Path;
use std::sync::{Arc, Mutex};

use rstest::rstest;

use super::*;
use crate::{Interpolation, Retiler, RetileError};

fn quad_index(store: &MemoryStore) -> TileIndex {
    seed(
        store,
        "in",
        vec![
            (coord(1, 1, 1), solid(4, WHITE)),
            (coord(1, 0, 0), solid(4, RED)),
            (coord(1, 0, 1), solid(4, BLUE)),
            (coord(1, 1, 0), solid(4, GREEN)),
        ],
    )
}

#[test]
fn test_four_siblings_fill_their_quadrants() {
    let store = memory_store();
    let index = quad_index(&store);
    let stats = Retiler::new(Arc::clone(&store))
        .interpolation(Interpolation::Average)
        .workers(2)
        .downsample(&index, Path::new("out"))
        .unwrap();

    assert_eq!(stats.source_tiles(), 4);
    assert_eq!(stats.groups(), 1);
    assert_eq!(stats.completed(), 1);
    assert!(!stats.drain_timed_out());

    let out = store.get(&osm("out", coord(0, 0, 0))).unwrap();
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.pixel(0, 0), RED);
    assert_eq!(out.pixel(3, 0), GREEN);
    assert_eq!(out.pixel(0, 3), BLUE);
    assert_eq!(out.pixel(3, 3), WHITE);
}

#[test]
fn test_single_valid_pixel_is_copied_not_blended() {
    let store = memory_store();
    let mut tile = PixelBuffer::new(2, 2);
    tile.set_pixel(0, 0, Pixel::new(10, 10, 10, 255));
    let index = seed(&store, "in", vec![(coord(1, 0, 0), tile)]);
    Retiler::new(Arc::clone(&store))
        .interpolation(Interpolation::Average)
        .downsample(&index, Path::new("out"))
        .unwrap();

    let out = store.get(&osm("out", coord(0, 0, 0))).unwrap();
    assert_eq!(out.pixel(0, 0), Pixel::new(10, 10, 10, 255));
    assert_eq!(out.data_count_in(out.bounds()), 1);
}

#[test]
fn test_unreadable_sibling_counts_as_nodata() {
    let store = memory_store();
    let mut index_refs: Vec<TileRef> = quad_index(&store).iter().cloned().collect();
    index_refs.push(TileRef {
        coord: coord(1, 1, 1),
        path: "in/missing.png".into(),
    });
    // Replace the white tile with an unreadable reference.
    index_refs.retain(|t| t.path != osm("in", coord(1, 1, 1)));
    let index = TileIndex::from_refs("in", index_refs);

    let stats = Retiler::new(Arc::clone(&store))
        .interpolation(Interpolation::Average)
        .downsample(&index, Path::new("out"))
        .unwrap();
    assert_eq!(stats.unreadable_tiles(), 1);
    assert_eq!(stats.completed(), 1);

    let out = store.get(&osm("out", coord(0, 0, 0))).unwrap();
    assert_eq!(out.pixel(0, 0), RED);
    assert_eq!(out.pixel(3, 3), Pixel::NODATA);
}

#[test]
fn test_group_without_readable_tiles_is_not_written() {
    let store = memory_store();
    let index = TileIndex::from_refs(
        "in",
        vec![TileRef {
            coord: coord(3, 2, 2),
            path: "in/3/2/2.png".into(),
        }],
    );
    let stats = Retiler::new(Arc::clone(&store))
        .downsample(&index, Path::new("out"))
        .unwrap();
    assert_eq!(stats.unreadable_tiles(), 1);
    assert_eq!(stats.empty_skipped(), 1);
    assert_eq!(stats.submitted(), 0);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_groups_flush_on_destination_change() {
    let store = memory_store();
    let tiles = (0..4u32)
        .flat_map(|x| (0..2u32).map(move |y| (coord(2, x, y), solid(4, RED))))
        .collect();
    let index = seed(&store, "in", tiles);
    let stats = Retiler::new(Arc::clone(&store))
        .interpolation(Interpolation::Bilinear)
        .downsample(&index, Path::new("out"))
        .unwrap();

    assert_eq!(stats.groups(), 2);
    assert_eq!(stats.completed(), 2);
    for x in 0..2 {
        let out = store.get(&osm("out", coord(1, x, 0))).unwrap();
        assert_eq!(out.pixel(0, 0), RED);
        assert_eq!(out.pixel(3, 3), RED);
    }
}

#[rstest]
#[case(Interpolation::Nearest)]
#[case(Interpolation::Epx)]
#[case(Interpolation::Eagle)]
fn test_enlarge_only_algorithms_are_rejected(#[case] interpolation: Interpolation) {
    let store = memory_store();
    let index = quad_index(&store);
    let result = Retiler::new(Arc::clone(&store))
        .interpolation(interpolation)
        .downsample(&index, Path::new("out"));
    assert!(matches!(result, Err(RetileError::DownsampleUnsupported(i)) if i == interpolation));
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_write_failures_are_counted() {
    let store = Arc::new(ReadOnlyStore::default());
    let index = quad_index(&store.0);
    let stats = Retiler::new(Arc::clone(&store))
        .downsample(&index, Path::new("out"))
        .unwrap();
    assert_eq!(stats.submitted(), 1);
    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.completed(), 0);
}

#[test]
fn test_progress_reaches_one() {
    let store = memory_store();
    let index = quad_index(&store);
    let seen = Mutex::new(Vec::new());
    let callback = |p: f64| seen.lock().unwrap().push(p);
    Retiler::new(Arc::clone(&store))
        .progress(&callback)
        .downsample(&index, Path::new("out"))
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.first().copied(), Some(0.0));
    assert_eq!(seen.last().copied(), Some(1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_reprocess_rewrites_sources() {
    let store = memory_store();
    let index = quad_index(&store);
    let stats = Retiler::new(Arc::clone(&store))
        .output_template(NamingTemplate::Zxy)
        .reprocess(true)
        .downsample(&index, Path::new("out"))
        .unwrap();
    // One destination plus four rewritten sources.
    assert_eq!(stats.completed(), 5);
    let renamed = NamingTemplate::Zxy.path_for(Path::new("in"), coord(1, 0, 0));
    assert_eq!(store.get(&renamed), Some(solid(4, RED)));
    assert_eq!(store.get(&osm("in", coord(1, 0, 0))), None);
    assert!(store.get(&NamingTemplate::Zxy.path_for(Path::new("out"), coord(0, 0, 0))).is_some());
}

#[test]
fn test_mismatched_sibling_is_still_reprocessed() {
    let store = memory_store();
    let index = seed(
        &store,
        "in",
        vec![(coord(1, 0, 0), solid(4, RED)), (coord(1, 1, 0), solid(2, GREEN))],
    );
    let stats = Retiler::new(Arc::clone(&store))
        .interpolation(Interpolation::Average)
        .output_template(NamingTemplate::Zxy)
        .reprocess(true)
        .downsample(&index, Path::new("out"))
        .unwrap();

    assert_eq!(stats.unreadable_tiles(), 1);
    // One destination plus both rewritten sources.
    assert_eq!(stats.completed(), 3);
    let renamed = NamingTemplate::Zxy.path_for(Path::new("in"), coord(1, 1, 0));
    assert_eq!(store.get(&renamed), Some(solid(2, GREEN)));

    let out = store.get(&NamingTemplate::Zxy.path_for(Path::new("out"), coord(0, 0, 0))).unwrap();
    assert_eq!(out.pixel(0, 0), RED);
    assert_eq!(out.pixel(3, 0), Pixel::NODATA);
}
