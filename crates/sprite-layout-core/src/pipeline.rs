//! Ties the image metadata provider, packing driver, layout emitter, and
//! persistent layout cache into the single entry point the CLI calls:
//! given a list of input image paths and `PackingOptions`, produce the
//! canonical layout text (§4.5), or nothing at all on any fatal error —
//! partial results are never emitted, per spec.md §7.
//!
//! The fingerprint is computed from raw paths before any image is
//! decoded, so a cache hit short-circuits every stage between inputs and
//! the emitter, exactly as spec.md §2 describes the cache wrapping the
//! whole pipeline.

use std::path::PathBuf;

use tracing::instrument;

use crate::cache::{default_metadata_cache_dir, fingerprint, LayoutCache};
use crate::config::PackingOptions;
use crate::driver;
use crate::error::Result;
use crate::layout;
use crate::metadata::{ImageMetadataProvider, MetadataProvider};
use crate::model::SourceImage;
use crate::pool::WorkerPool;

/// Runs the full inputs -> layout-text pipeline. `cache`, when given, is
/// consulted before any work starts and populated after a successful run;
/// cache I/O failures degrade to a miss rather than aborting, per the
/// error-handling contract.
#[instrument(skip_all, fields(inputs = paths.len(), mode = ?opts.mode))]
pub fn run(paths: &[PathBuf], opts: &PackingOptions, cache: Option<&LayoutCache>) -> Result<String> {
    opts.validate()?;

    let fp = cache.map(|_| fingerprint(paths, opts));
    if let (Some(cache), Some(fp)) = (cache, &fp) {
        if let Some(hit) = cache.lookup(fp) {
            return Ok(hit);
        }
    }

    let pool = WorkerPool::new(opts.threads);
    let images = resolve_images(paths, opts, &pool)?;
    let layout = driver::pack(&images, opts, &pool)?;
    let text = layout::emit(&layout, &images);

    if let (Some(cache), Some(fp)) = (cache, &fp) {
        cache.store(fp, &text);
    }

    Ok(text)
}

/// Resolves every input path to its decoded `SourceImage`, in input
/// order, using the metadata provider's batch operation so decoding runs
/// on the worker pool. Backed by the on-disk metadata cache so repeat
/// runs over the same images skip re-decoding even across process
/// invocations, not just within one (the provider's own in-memory cache
/// only covers calls within a single `resolve_images`).
fn resolve_images(
    paths: &[PathBuf],
    opts: &PackingOptions,
    pool: &WorkerPool,
) -> Result<Vec<SourceImage>> {
    let need_bounds = opts.trim_transparent;
    let provider = ImageMetadataProvider::with_persistent_cache(default_metadata_cache_dir());
    let items: Vec<(PathBuf, bool)> = paths.iter().map(|p| (p.clone(), need_bounds)).collect();
    let results = provider.resolve_batch(&items, pool);

    let mut images = Vec::with_capacity(paths.len());
    for (path, result) in paths.iter().zip(results) {
        let meta = result?;
        images.push(SourceImage {
            path: path.clone(),
            width: meta.width,
            height: meta.height,
            opaque_bounds: meta.opaque_bounds,
        });
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_opaque_png(path: &std::path::Path, w: u32, h: u32) {
        let img = RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn single_1x1_image_packs_to_1x1_atlas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_opaque_png(&path, 1, 1);

        let opts = PackingOptions::default();
        let text = run(&[path], &opts, None).unwrap();
        assert!(text.starts_with("atlas 1,1\n"));
        assert!(text.contains("scale 1\n"));
    }

    #[test]
    fn two_images_with_padding_are_offset() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_opaque_png(&a, 1, 1);
        write_opaque_png(&b, 1, 1);

        let mut opts = PackingOptions::default();
        opts.mode = Mode::Fast;
        opts.padding = 1;
        let text = run(&[a, b], &opts, None).unwrap();
        assert!(text.contains("atlas 3,1"));
    }

    #[test]
    fn cache_hit_returns_identical_text_without_recomputation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_opaque_png(&path, 2, 2);

        let cache_dir = tempdir().unwrap();
        let cache = LayoutCache::new(cache_dir.path());
        let opts = PackingOptions::default();
        let paths = vec![path];

        let first = run(&paths, &opts, Some(&cache)).unwrap();
        let second = run(&paths, &opts, Some(&cache)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_input_is_an_error_not_a_panic() {
        let opts = PackingOptions::default();
        let missing = PathBuf::from("/no/such/path/ever.png");
        assert!(run(&[missing], &opts, None).is_err());
    }

    #[test]
    fn resolve_images_populates_the_on_disk_metadata_cache() {
        use crate::cache::default_metadata_cache_dir;
        use crate::metadata::PersistentMetadataCache;

        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_opaque_png(&path, 1, 1);

        let opts = PackingOptions::default();
        let pool = WorkerPool::new(opts.threads);
        resolve_images(&[path.clone()], &opts, &pool).unwrap();

        // resolve_images must reach the real, process-shared cache
        // directory (not only its own in-process HashMap), since that's
        // what lets a later run skip re-decoding entirely.
        let persistent = PersistentMetadataCache::new(default_metadata_cache_dir());
        assert!(
            persistent.lookup(&path).is_some(),
            "resolve_images did not populate the persistent metadata cache"
        );
    }
}
