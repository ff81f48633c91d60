//! A fingerprint-keyed directory of previously emitted layout text.
//! Entries are written atomically (temp file + rename), matching the
//! "never leave partial output visible" convention this engine applies
//! elsewhere, and pruned once older than one hour. Cache I/O failures
//! downgrade to a miss and a `warn` log rather than aborting a run, per
//! the error-handling contract.

use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::warn;
use twox_hash::XxHash64;

use crate::config::PackingOptions;

/// Entries older than this are pruned on every `prune()` call.
const MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Bumped whenever the engine's packing semantics change in a way that
/// would make an old cache entry's layout text unreliable.
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct FingerprintInput<'a> {
    schema_version: u32,
    inputs: Vec<(String, u64, Option<u64>)>,
    options: &'a PackingOptions,
}

/// Computes a stable fingerprint over the normalized input list (path,
/// size, mtime), the effective `PackingOptions` (not raw profile file
/// bytes — the resolved design decision, avoiding spurious misses on
/// profile whitespace changes), and a fixed schema version.
///
/// Takes raw paths rather than decoded `SourceImage`s so a cache hit can
/// short-circuit before any image is decoded, per the pipeline contract
/// in spec.md §2 ("a cache hit short-circuits everything between inputs
/// and emitter").
pub fn fingerprint(paths: &[PathBuf], opts: &PackingOptions) -> String {
    let inputs = paths
        .iter()
        .map(|path| {
            let meta = fs::metadata(path).ok();
            let size = meta.as_ref().map(|m| m.len()).unwrap_or(0);
            let mtime = meta
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs());
            (path.to_string_lossy().into_owned(), size, mtime)
        })
        .collect();

    let payload = FingerprintInput {
        schema_version: SCHEMA_VERSION,
        inputs,
        options: opts,
    };
    let json = serde_json::to_vec(&payload).unwrap_or_default();

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&json);
    format!("{:016x}", hasher.finish())
}

/// A persistent, filesystem-backed cache directory.
pub struct LayoutCache {
    dir: PathBuf,
}

impl LayoutCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(fingerprint)
    }

    /// Returns the cached layout text for `fingerprint`, or `None` on a
    /// miss or any I/O failure (logged, never propagated).
    pub fn lookup(&self, fingerprint: &str) -> Option<String> {
        match fs::read_to_string(self.entry_path(fingerprint)) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, "cache lookup failed, treating as a miss");
                None
            }
        }
    }

    /// Best-effort write: creates the cache directory if needed and
    /// writes the entry via a temp-file-then-rename, so concurrent
    /// readers never observe a partial file.
    pub fn store(&self, fingerprint: &str, layout_text: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(error = %e, "failed to create cache directory");
            return;
        }
        let final_path = self.entry_path(fingerprint);
        let tmp_path = self.dir.join(format!("{fingerprint}.tmp-{}", std::process::id()));
        if let Err(e) = fs::write(&tmp_path, layout_text) {
            warn!(error = %e, "failed to write cache entry");
            return;
        }
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            warn!(error = %e, "failed to finalize cache entry");
            let _ = fs::remove_file(&tmp_path);
        }
    }

    /// Deletes every entry whose file modification time is older than
    /// one hour. Deletion failures are logged and ignored.
    pub fn prune(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return,
        };
        let now = SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };
            if age > MAX_AGE {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to prune cache entry");
                }
            }
        }
    }
}

/// The default persisted-state directory: one directory under the OS
/// temp location, per the external-interface contract.
pub fn default_cache_dir() -> PathBuf {
    Path::new(&std::env::temp_dir()).join("sprite-layout-cache")
}

/// The default directory for the per-image metadata cache, kept
/// alongside the layout-text cache rather than inside it so pruning one
/// never touches the other's entries.
pub fn default_metadata_cache_dir() -> PathBuf {
    Path::new(&std::env::temp_dir()).join("sprite-layout-cache-metadata")
}
