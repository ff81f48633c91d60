//! spec.md §8's cache/trim-toggle regression: "after running with
//! `--trim-transparent --padding P`, then `--padding P`, then back, the
//! third run produces the same atlas dimensions as the first (no stale
//! cache)." Exercises the real `LayoutCache`, not a mock.

use image::{Rgba, RgbaImage};
use sprite_layout_core::cache::LayoutCache;
use sprite_layout_core::{pipeline, PackingOptions};
use tempfile::tempdir;

fn write_partial_opaque(path: &std::path::Path) {
    let mut img = RgbaImage::new(4, 4);
    for y in 1..3 {
        for x in 1..3 {
            img.put_pixel(x, y, Rgba([1, 2, 3, 255]));
        }
    }
    img.save(path).unwrap();
}

fn atlas_line(text: &str) -> &str {
    text.lines().next().unwrap()
}

#[test]
fn trim_toggle_does_not_leave_a_stale_cache_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.png");
    write_partial_opaque(&path);
    let cache_dir = tempdir().unwrap();
    let cache = LayoutCache::new(cache_dir.path());

    let trimmed = PackingOptions {
        trim_transparent: true,
        padding: 2,
        ..PackingOptions::default()
    };
    let untrimmed = PackingOptions {
        trim_transparent: false,
        padding: 2,
        ..PackingOptions::default()
    };

    let first = pipeline::run(&[path.clone()], &trimmed, Some(&cache)).unwrap();
    let middle = pipeline::run(&[path.clone()], &untrimmed, Some(&cache)).unwrap();
    let third = pipeline::run(&[path.clone()], &trimmed, Some(&cache)).unwrap();
    let fourth = pipeline::run(&[path], &trimmed, Some(&cache)).unwrap();

    assert_eq!(atlas_line(&first), atlas_line(&third));
    assert_eq!(third, fourth, "repeating the same options must hit an identical cache entry");
    assert_ne!(
        atlas_line(&first),
        atlas_line(&middle),
        "trimming a partially-transparent image must change the atlas size"
    );
}

#[test]
fn padding_change_is_never_masked_by_a_cache_hit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.png");
    write_partial_opaque(&path);
    let cache_dir = tempdir().unwrap();
    let cache = LayoutCache::new(cache_dir.path());

    let small_padding = PackingOptions {
        padding: 2,
        ..PackingOptions::default()
    };
    let large_padding = PackingOptions {
        padding: 6,
        ..PackingOptions::default()
    };

    let a = pipeline::run(&[path.clone()], &small_padding, Some(&cache)).unwrap();
    let b = pipeline::run(&[path], &large_padding, Some(&cache)).unwrap();
    assert_ne!(atlas_line(&a), atlas_line(&b));
}
