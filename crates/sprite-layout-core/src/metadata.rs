//! Resolves each input path to its decoded size and, when trimming is
//! requested, its tight opaque bounding rectangle. Grounded in the
//! decode path and trim-bounds scan the packer's pipeline stage uses,
//! generalized into a standalone provider with its own memoization.

use std::collections::HashMap;
use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use twox_hash::XxHash64;

use crate::error::{LayoutError, Result};
use crate::model::Rect;
use crate::pool::WorkerPool;

/// The width/height/opaque-bounds triple the provider resolves per path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub opaque_bounds: Option<Rect>,
}

fn file_stat(path: &Path) -> Option<(u64, u64)> {
    let meta = fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some((meta.len(), mtime))
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    size: u64,
    mtime: u64,
    meta: ImageMetadata,
}

/// A disk-backed cache of decoded image metadata, keyed by canonicalized
/// path. An entry is accepted iff the current file's size and mtime match
/// what was recorded; otherwise it is recomputed and rewritten, per
/// spec.md §4.1.
pub struct PersistentMetadataCache {
    dir: PathBuf,
}

impl PersistentMetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, path: &Path) -> PathBuf {
        let canon = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(canon.to_string_lossy().as_bytes());
        self.dir.join(format!("{:016x}", hasher.finish()))
    }

    /// Returns the cached metadata for `path` if a disk entry exists and
    /// its recorded `(size, mtime)` still matches the file on disk.
    pub fn lookup(&self, path: &Path) -> Option<ImageMetadata> {
        let (size, mtime) = file_stat(path)?;
        let text = fs::read_to_string(self.entry_path(path)).ok()?;
        let entry: PersistedEntry = serde_json::from_str(&text).ok()?;
        if entry.size == size && entry.mtime == mtime {
            Some(entry.meta)
        } else {
            None
        }
    }

    /// Best-effort write; failures are logged and ignored, matching the
    /// cache I/O contract in spec.md §7.
    pub fn store(&self, path: &Path, meta: &ImageMetadata) {
        let Some((size, mtime)) = file_stat(path) else {
            return;
        };
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(error = %e, "failed to create metadata cache directory");
            return;
        }
        let entry = PersistedEntry {
            size,
            mtime,
            meta: meta.clone(),
        };
        match serde_json::to_string(&entry) {
            Ok(text) => {
                if let Err(e) = fs::write(self.entry_path(path), text) {
                    warn!(error = %e, path = %path.display(), "failed to write metadata cache entry");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize metadata cache entry"),
        }
    }
}

/// A decode/scan provider over the filesystem, with in-process
/// memoization keyed by canonicalized path.
pub trait MetadataProvider {
    fn resolve(&self, path: &Path, need_bounds: bool) -> Result<ImageMetadata>;

    /// Resolves a batch of `(path, need_bounds)` pairs, returning results
    /// in the same order as `items`. May parallelize internally using
    /// `pool`.
    fn resolve_batch(
        &self,
        items: &[(PathBuf, bool)],
        pool: &WorkerPool,
    ) -> Vec<Result<ImageMetadata>>;
}

/// Scans the alpha channel of a decoded RGBA image for the tight bounding
/// rectangle covering every pixel with `alpha > 0`. Fully-transparent
/// images fall back to a 1x1 rectangle at the origin, per the data-model
/// invariant on `opaque_bounds`.
pub fn compute_opaque_bounds(rgba: &image::RgbaImage) -> Rect {
    let (w, h) = rgba.dimensions();
    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0i64;
    let mut max_y = 0i64;
    let mut found = false;

    for y in 0..h {
        for x in 0..w {
            if rgba.get_pixel(x, y).0[3] > 0 {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x as i64);
                max_y = max_y.max(y as i64);
            }
        }
    }

    if !found {
        return Rect::new(0, 0, 1, 1);
    }

    let max_x = max_x as u32;
    let max_y = max_y as u32;
    Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Decodes a single image and, when requested, computes its opaque
/// bounds. Images without an alpha channel yield bounds equal to the
/// full image.
#[instrument(skip_all, fields(path = %path.display()))]
fn decode_one(path: &Path, need_bounds: bool) -> Result<ImageMetadata> {
    if !path.exists() {
        return Err(LayoutError::NotFound(path.to_path_buf()));
    }
    let reader = image::ImageReader::open(path)
        .map_err(|source| LayoutError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|_| LayoutError::UnsupportedFormat(path.to_path_buf()))?;
    if reader.format().is_none() {
        return Err(LayoutError::UnsupportedFormat(path.to_path_buf()));
    }
    let dyn_img = reader.decode()?;
    let (width, height) = dyn_img.dimensions();
    let has_alpha = dyn_img.color().has_alpha();

    let opaque_bounds = if need_bounds {
        if has_alpha {
            Some(compute_opaque_bounds(&dyn_img.to_rgba8()))
        } else {
            Some(Rect::new(0, 0, width, height))
        }
    } else {
        None
    };

    Ok(ImageMetadata {
        width,
        height,
        opaque_bounds,
    })
}

/// The default provider: decodes via the `image` crate and memoizes
/// results in-process behind a single mutex around a hash table, per
/// the concurrency substrate's shared-state contract. Optionally backed
/// by a `PersistentMetadataCache` for cross-run reuse.
pub struct ImageMetadataProvider {
    cache: Mutex<HashMap<(PathBuf, bool), ImageMetadata>>,
    persistent: Option<PersistentMetadataCache>,
}

impl Default for ImageMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageMetadataProvider {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            persistent: None,
        }
    }

    pub fn with_persistent_cache(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            persistent: Some(PersistentMetadataCache::new(dir)),
        }
    }

    fn cache_key(path: &Path, need_bounds: bool) -> (PathBuf, bool) {
        let canon = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        (canon, need_bounds)
    }

    /// Decodes `path`, consulting and then refreshing the persistent
    /// cache when one is configured. A persisted entry computed without
    /// bounds is not reused for a request that now needs them.
    fn decode_with_persistent_cache(&self, path: &Path, need_bounds: bool) -> Result<ImageMetadata> {
        if let Some(pc) = &self.persistent {
            if let Some(hit) = pc.lookup(path) {
                if !need_bounds || hit.opaque_bounds.is_some() {
                    return Ok(hit);
                }
            }
        }
        let meta = decode_one(path, need_bounds)?;
        if let Some(pc) = &self.persistent {
            pc.store(path, &meta);
        }
        Ok(meta)
    }
}

impl MetadataProvider for ImageMetadataProvider {
    fn resolve(&self, path: &Path, need_bounds: bool) -> Result<ImageMetadata> {
        let key = Self::cache_key(path, need_bounds);
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }
        let meta = self.decode_with_persistent_cache(path, need_bounds)?;
        self.cache.lock().unwrap().insert(key, meta.clone());
        Ok(meta)
    }

    fn resolve_batch(
        &self,
        items: &[(PathBuf, bool)],
        pool: &WorkerPool,
    ) -> Vec<Result<ImageMetadata>> {
        let uncached: Vec<(PathBuf, bool)> = items
            .iter()
            .filter(|(p, nb)| {
                let key = Self::cache_key(p, *nb);
                !self.cache.lock().unwrap().contains_key(&key)
            })
            .cloned()
            .collect();

        let decoded = pool.map(uncached, |(p, nb)| {
            (p.clone(), nb, self.decode_with_persistent_cache(&p, nb))
        });
        {
            let mut cache = self.cache.lock().unwrap();
            for (p, nb, result) in &decoded {
                if let Ok(meta) = result {
                    cache.insert(Self::cache_key(p, *nb), meta.clone());
                }
            }
        }

        items
            .iter()
            .map(|(p, nb)| self.resolve(p, *nb))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_transparent_image_yields_1x1_origin_bounds() {
        let img = image::RgbaImage::new(4, 4);
        let bounds = compute_opaque_bounds(&img);
        assert_eq!(bounds, Rect::new(0, 0, 1, 1));
    }

    #[test]
    fn tight_bounds_cover_opaque_pixels_only() {
        let mut img = image::RgbaImage::new(4, 4);
        img.put_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        let bounds = compute_opaque_bounds(&img);
        assert_eq!(bounds, Rect::new(1, 1, 1, 1));
    }

    #[test]
    fn full_rectangle_when_fully_opaque() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let bounds = compute_opaque_bounds(&img);
        assert_eq!(bounds, Rect::new(0, 0, 3, 2));
    }

    #[test]
    fn persistent_cache_rejects_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("img.bin");
        std::fs::write(&file, b"v1").unwrap();
        let cache = PersistentMetadataCache::new(dir.path().join("cache"));

        let meta = ImageMetadata {
            width: 4,
            height: 4,
            opaque_bounds: None,
        };
        cache.store(&file, &meta);
        assert!(cache.lookup(&file).is_some());

        // Touch the file so its mtime changes; the stale entry must miss.
        std::fs::write(&file, b"v2-longer-content").unwrap();
        assert!(cache.lookup(&file).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_an_input_error_not_an_internal_one() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("locked.png");
        std::fs::write(&file, b"not actually decoded").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o000)).unwrap();

        let result = decode_one(&file, false);

        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();

        // Root bypasses the DAC permission bits this relies on, so there
        // is nothing to observe when the suite runs as root: only assert
        // once the permission bits actually blocked the read.
        if let Err(err) = result {
            assert!(matches!(err, LayoutError::Unreadable { .. }));
            assert_eq!(err.exit_code(), 2);
        }
    }
}
