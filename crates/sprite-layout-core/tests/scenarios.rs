//! The six concrete scenarios named verbatim in spec.md §8, run end to
//! end through `pipeline::run` against real (tiny) PNG files.

use image::{Rgba, RgbaImage};
use sprite_layout_core::config::{Mode, Resolution};
use sprite_layout_core::{pipeline, PackingOptions};
use tempfile::tempdir;

fn write_opaque(path: &std::path::Path, w: u32, h: u32) {
    RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]))
        .save(path)
        .unwrap();
}

/// A 4x4 canvas, transparent everywhere except a single opaque pixel at
/// (1,1), yielding a tight opaque bounding rect of exactly (1,1,1,1).
fn write_inner_opaque_pixel(path: &std::path::Path) {
    let mut img = RgbaImage::new(4, 4);
    img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
    img.save(path).unwrap();
}

#[test]
fn scenario_1_two_unit_squares_with_padding() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_opaque(&a, 1, 1);
    write_opaque(&b, 1, 1);

    let opts = PackingOptions {
        mode: Mode::Fast,
        padding: 1,
        ..PackingOptions::default()
    };
    let text = pipeline::run(&[a, b], &opts, None).unwrap();

    assert!(text.starts_with("atlas 3,1\n"));
    assert!(text.contains("scale 1\n"));
    let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("sprite")).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" 0,0 "));
    assert!(lines[1].contains(" 2,0 "));
}

#[test]
fn scenario_2_seventeen_unit_squares_pot() {
    let dir = tempdir().unwrap();
    let mut paths = Vec::new();
    for i in 0..17 {
        let p = dir.path().join(format!("s{i}.png"));
        write_opaque(&p, 1, 1);
        paths.push(p);
    }

    let opts = PackingOptions {
        mode: Mode::Pot,
        ..PackingOptions::default()
    };
    let text = pipeline::run(&paths, &opts, None).unwrap();

    let atlas_line = text.lines().next().unwrap();
    let rest = atlas_line.strip_prefix("atlas ").unwrap();
    let (w, h) = rest.split_once(',').unwrap();
    let w: u32 = w.parse().unwrap();
    let h: u32 = h.parse().unwrap();

    assert!(w.is_power_of_two());
    assert!(h.is_power_of_two());
    assert!(w as u64 * h as u64 <= 32);
}

#[test]
fn scenario_3_trims_to_opaque_inner_pixel() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.png");
    write_inner_opaque_pixel(&path);

    let opts = PackingOptions {
        trim_transparent: true,
        ..PackingOptions::default()
    };
    let text = pipeline::run(&[path], &opts, None).unwrap();

    assert!(text.starts_with("atlas 1,1\n"));
    let sprite_line = text.lines().find(|l| l.starts_with("sprite")).unwrap();
    assert!(sprite_line.contains("1,1 2,2"));
}

#[test]
fn scenario_4_no_trim_with_scale() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.png");
    write_opaque(&path, 4, 4);

    let opts = PackingOptions {
        trim_transparent: false,
        scale: 0.5,
        ..PackingOptions::default()
    };
    let text = pipeline::run(&[path], &opts, None).unwrap();

    assert!(text.contains("scale 0.5\n"));
    assert!(text.starts_with("atlas 2,2\n"));
}

#[test]
fn scenario_5_resolution_pair_composes_scale() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.png");
    write_opaque(&path, 4, 4);

    let opts = PackingOptions {
        source_resolution: Some(Resolution { width: 4, height: 4 }),
        target_resolution: Some(Resolution { width: 2, height: 2 }),
        scale: 0.5,
        ..PackingOptions::default()
    };
    let text = pipeline::run(&[path], &opts, None).unwrap();

    assert!(text.contains("scale 0.25\n"));
    assert!(text.starts_with("atlas 1,1\n"));
}

#[test]
fn scenario_6_padding_change_always_changes_atlas_size() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_opaque(&a, 2, 2);
    write_opaque(&b, 3, 3);
    let paths = vec![a, b];

    let run_with = |padding: u32, trim: bool| {
        let opts = PackingOptions {
            padding,
            trim_transparent: trim,
            ..PackingOptions::default()
        };
        pipeline::run(&paths, &opts, None).unwrap()
    };

    // Exercise a trim-toggle history before the comparison run, per
    // spec.md §8's "regardless of prior trim-toggle history" clause.
    let _ = run_with(2, true);
    let _ = run_with(2, false);
    let first = run_with(2, false);
    let second = run_with(6, false);

    let atlas_of = |text: &str| text.lines().next().unwrap().to_string();
    assert_ne!(atlas_of(&first), atlas_of(&second));
}
