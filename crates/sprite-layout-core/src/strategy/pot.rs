//! Power-of-two ("pot") packing: enumerate power-of-two `(w, h)`
//! candidates ascending width-then-height, running Shelf inside each
//! candidate, and keep the first feasible result that minimizes area
//! (tie-break: aspect ratio closest to square, then smaller width).
//!
//! `rotate_allowed` is honored inside the inner Shelf pass the same as
//! any standalone Shelf run — POT does not special-case rotation away,
//! resolving the open question spec left unexercised.

use crate::geometry::PackableRect;

use super::shelf::ShelfPacker;
use super::{Pack, PackResult, PlacedRect, StrategyInput};

pub struct PotPacker;

fn next_pow2(v: u32) -> u32 {
    if v <= 1 {
        return 1;
    }
    let mut p = 1u32;
    while p < v {
        p = p.saturating_mul(2);
    }
    p
}

struct Candidate {
    w: u32,
    h: u32,
    result: PackResult,
}

impl Pack for PotPacker {
    fn pack(&self, input: &StrategyInput, container: (u32, u32)) -> Option<PackResult> {
        if input.rects.is_empty() {
            return Some(PackResult {
                width: 1,
                height: 1,
                placed: Vec::new(),
            });
        }

        // Rotation, when allowed, is applied once up front: any rect taller
        // than it is wide is rotated to landscape before the inner Shelf
        // sweep runs, since Shelf itself never rotates.
        let rotated_flags: Vec<bool> = input
            .rects
            .iter()
            .map(|r| input.opts.rotate_allowed && r.h > r.w)
            .collect();
        let oriented: Vec<PackableRect> = input
            .rects
            .iter()
            .zip(&rotated_flags)
            .map(|(r, &rot)| {
                if rot {
                    PackableRect { w: r.h, h: r.w }
                } else {
                    *r
                }
            })
            .collect();
        let oriented_opts = input.opts.clone();
        let oriented_input = StrategyInput {
            rects: &oriented,
            opts: &oriented_opts,
        };

        let max_rect_w = oriented.iter().map(|r| r.w).max().unwrap_or(1);
        let max_rect_h = oriented.iter().map(|r| r.h).max().unwrap_or(1);
        let min_w = next_pow2(max_rect_w);
        let min_h = next_pow2(max_rect_h);
        let max_w = next_pow2(container.0).min(container.0.max(min_w));
        let max_h = next_pow2(container.1).min(container.1.max(min_h));

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut w = min_w;
        while w <= max_w {
            let mut h = min_h;
            while h <= max_h {
                if let Some(result) = ShelfPacker.pack(&oriented_input, (w, h)) {
                    candidates.push(Candidate { w, h, result });
                    break;
                }
                h = h.saturating_mul(2);
            }
            w = w.saturating_mul(2);
        }

        candidates.into_iter().min_by(|a, b| {
            let area_a = a.w as u64 * a.h as u64;
            let area_b = b.w as u64 * b.h as u64;
            area_a
                .cmp(&area_b)
                .then_with(|| {
                    let aspect_a = a.w.max(a.h) as f64 / a.w.min(a.h) as f64;
                    let aspect_b = b.w.max(b.h) as f64 / b.w.min(b.h) as f64;
                    aspect_a.partial_cmp(&aspect_b).unwrap()
                })
                .then(a.w.cmp(&b.w))
        })
        .map(|c| {
            let placed = c
                .result
                .placed
                .into_iter()
                .map(|p| PlacedRect {
                    rotated: rotated_flags[p.index],
                    ..p
                })
                .collect();
            PackResult {
                width: c.w,
                height: c.h,
                placed,
            }
        })
    }
}
