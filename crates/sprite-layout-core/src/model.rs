use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if `self` and `other` share any interior area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
    /// Grows the rectangle by `pad` trailing (right/bottom) only: this is
    /// the footprint a placement reserves so its packed neighbor keeps a
    /// `pad`-pixel gap, without reserving padding nobody asked for on its
    /// own leading edge.
    pub fn expand(&self, pad: u32) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            w: self.w + pad,
            h: self.h + pad,
        }
    }
}

/// One resolved input image: its decoded size and, when trimming was
/// requested, the tight opaque bounding rectangle.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub opaque_bounds: Option<Rect>,
}

/// Where one source image ended up in the atlas, in the emitted
/// (post-rotation, post-trim) coordinate space.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub source_index: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub trim_left: u32,
    pub trim_top: u32,
    pub trim_right: u32,
    pub trim_bottom: u32,
    pub rotated: bool,
}

impl Placement {
    /// The rectangle this placement occupies in the atlas, before padding.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// The complete result of a packing run, in input order.
#[derive(Debug, Clone)]
pub struct Layout {
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub scale: f64,
    pub placements: Vec<Placement>,
}

impl Layout {
    /// Checks the disjointness invariant: every pair of placements, each
    /// expanded by `padding`, must not overlap, and must stay within the
    /// atlas bounds.
    pub fn is_valid(&self, padding: u32) -> bool {
        for p in &self.placements {
            if p.x + p.w > self.atlas_width || p.y + p.h > self.atlas_height {
                return false;
            }
        }
        for i in 0..self.placements.len() {
            for j in (i + 1)..self.placements.len() {
                let a = self.placements[i].rect().expand(padding);
                let b = self.placements[j].rect().expand(padding);
                if a.overlaps(&b) {
                    return false;
                }
            }
        }
        true
    }
}

/// One cache-directory entry: a fingerprint keying a previously emitted
/// layout text, pruned once `created_at` is more than an hour old.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub layout_text: String,
    pub created_at: SystemTime,
}
