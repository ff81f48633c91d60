//! Resolves the CLI's single positional input argument into the ordered
//! list of image paths the pipeline processes, per spec.md §6: either a
//! directory (recursive walk, case-insensitive image suffixes, sorted
//! lexicographically) or a plain-text path list (blank lines and `#`
//! comments ignored, relative paths resolved against the list file's
//! directory). Grounded in the teacher CLI's `gather_paths`, generalized
//! to the two input shapes spec.md names instead of glob include/exclude.

use std::fs;
use std::path::{Path, PathBuf};

use sprite_layout_core::{LayoutError, Result};
use walkdir::WalkDir;

const IMAGE_SUFFIXES: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tga"];

fn has_image_suffix(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_SUFFIXES.contains(&e.as_str()))
}

fn gather_directory(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_image_suffix(p))
        .collect();
    paths.sort();
    paths
}

fn gather_list_file(path: &Path) -> Result<Vec<PathBuf>> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let text =
        fs::read_to_string(path).map_err(|_| LayoutError::NotFound(path.to_path_buf()))?;

    let mut paths = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let candidate = PathBuf::from(line);
        let resolved = if candidate.is_relative() {
            base.join(candidate)
        } else {
            candidate
        };
        if !resolved.is_file() {
            return Err(LayoutError::NotFound(resolved));
        }
        paths.push(resolved);
    }
    Ok(paths)
}

/// Resolves `input` into the ordered list of image paths to pack.
pub fn resolve(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        Ok(gather_directory(input))
    } else if input.is_file() {
        gather_list_file(input)
    } else {
        Err(LayoutError::NotFound(input.to_path_buf()))
    }
}
