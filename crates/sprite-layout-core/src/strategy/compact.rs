//! MaxRects-family ("compact") packing: maintain a free-rectangle list,
//! place each rectangle (area descending, ties by longer side then input
//! order) at the best-scoring free rectangle under one heuristic, split
//! the consumed free space into its maximal remainders, and prune any
//! free rectangle wholly contained in another.
//!
//! Grounded directly in the free-rect bookkeeping and heuristic scoring
//! of the teacher's MaxRects packer (free/used rect lists, a `score`
//! function covering best-area/best-short-side/best-long-side/bottom-left,
//! and contact-point scoring against placed neighbors and the container
//! border), generalized to the fixed five-heuristic set this engine races
//! as separate driver trials.

use crate::model::Rect;

use super::{Pack, PackResult, PlacedRect, StrategyInput};

/// The heuristic set the driver races per candidate container. Order
/// here is the fixed tie-break order documented as a resolved open
/// question: earlier entries win ties in overall driver scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
    BottomLeftRule,
    ContactPointRule,
}

pub const HEURISTIC_ORDER: [Heuristic; 5] = [
    Heuristic::BestShortSideFit,
    Heuristic::BestLongSideFit,
    Heuristic::BestAreaFit,
    Heuristic::BottomLeftRule,
    Heuristic::ContactPointRule,
];

fn overlap_len(a0: u32, a1: u32, b0: u32, b1: u32) -> u32 {
    a1.min(b1).saturating_sub(a0.max(b0))
}

/// Sum of shared-edge length against the container border and every
/// already-placed rectangle; higher is a better fit under ContactPointRule.
fn contact_score(x: u32, y: u32, w: u32, h: u32, used: &[Rect], container: (u32, u32)) -> u32 {
    let mut score = 0u32;
    if x == 0 {
        score += h;
    }
    if y == 0 {
        score += w;
    }
    if x + w == container.0 {
        score += h;
    }
    if y + h == container.1 {
        score += w;
    }
    for u in used {
        if x == u.x + u.w || u.x == x + w {
            score += overlap_len(y, y + h, u.y, u.y + u.h);
        }
        if y == u.y + u.h || u.y == y + h {
            score += overlap_len(x, x + w, u.x, u.x + u.w);
        }
    }
    score
}

/// Lower-is-better (primary, secondary) score for placing a `w x h`
/// rectangle at `free`, under `heuristic`.
fn score_fit(
    free: &Rect,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    heuristic: Heuristic,
    used: &[Rect],
    container: (u32, u32),
) -> (i64, i64) {
    let leftover_w = (free.w - w) as i64;
    let leftover_h = (free.h - h) as i64;
    let short = leftover_w.min(leftover_h);
    let long = leftover_w.max(leftover_h);
    match heuristic {
        Heuristic::BestShortSideFit => (short, long),
        Heuristic::BestLongSideFit => (long, short),
        Heuristic::BestAreaFit => {
            let leftover_area = (free.w as i64 * free.h as i64) - (w as i64 * h as i64);
            (leftover_area, short)
        }
        Heuristic::BottomLeftRule => (y as i64 + h as i64, x as i64),
        Heuristic::ContactPointRule => {
            let c = contact_score(x, y, w, h, used, container);
            (-(c as i64), short)
        }
    }
}

struct Placement {
    free_index: usize,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    rotated: bool,
}

fn find_best(
    free_list: &[Rect],
    w: u32,
    h: u32,
    rotate_allowed: bool,
    heuristic: Heuristic,
    used: &[Rect],
    container: (u32, u32),
) -> Option<Placement> {
    let mut best: Option<(Placement, (i64, i64))> = None;
    let orientations: &[bool] = if rotate_allowed && w != h {
        &[false, true]
    } else {
        &[false]
    };

    for (fi, free) in free_list.iter().enumerate() {
        for &rotated in orientations {
            let (ow, oh) = if rotated { (h, w) } else { (w, h) };
            if ow > free.w || oh > free.h {
                continue;
            }
            let score = score_fit(free, free.x, free.y, ow, oh, heuristic, used, container);
            let better = match &best {
                None => true,
                Some((_, best_score)) => score < *best_score,
            };
            if better {
                best = Some((
                    Placement {
                        free_index: fi,
                        x: free.x,
                        y: free.y,
                        w: ow,
                        h: oh,
                        rotated,
                    },
                    score,
                ));
            }
        }
    }
    best.map(|(p, _)| p)
}

/// Splits `free` against the newly used `used` rectangle into its
/// maximal non-overlapping-with-`used` remainders (0 to 4 pieces).
fn split_free_node(free: &Rect, used: &Rect) -> Vec<Rect> {
    if !free.overlaps(used) {
        return vec![*free];
    }
    let mut out = Vec::with_capacity(4);
    let push = |out: &mut Vec<Rect>, x: u32, y: u32, w: u32, h: u32| {
        if w > 0 && h > 0 {
            out.push(Rect::new(x, y, w, h));
        }
    };
    if used.x > free.x {
        push(&mut out, free.x, free.y, used.x - free.x, free.h);
    }
    if used.x + used.w < free.x + free.w {
        push(
            &mut out,
            used.x + used.w,
            free.y,
            (free.x + free.w) - (used.x + used.w),
            free.h,
        );
    }
    if used.y > free.y {
        push(&mut out, free.x, free.y, free.w, used.y - free.y);
    }
    if used.y + used.h < free.y + free.h {
        push(
            &mut out,
            free.x,
            used.y + used.h,
            free.w,
            (free.y + free.h) - (used.y + used.h),
        );
    }
    out
}

fn prune_contained(free_list: &mut Vec<Rect>) {
    let mut i = 0;
    while i < free_list.len() {
        let mut removed_i = false;
        let mut j = i + 1;
        while j < free_list.len() {
            if free_list[j].contains(&free_list[i]) {
                free_list.remove(i);
                removed_i = true;
                break;
            }
            if free_list[i].contains(&free_list[j]) {
                free_list.remove(j);
            } else {
                j += 1;
            }
        }
        if !removed_i {
            i += 1;
        }
    }
}

fn place_and_split(free_list: &mut Vec<Rect>, used: Rect) {
    let mut new_free = Vec::new();
    let mut i = 0;
    while i < free_list.len() {
        if free_list[i].overlaps(&used) {
            let fr = free_list.remove(i);
            new_free.extend(split_free_node(&fr, &used));
        } else {
            i += 1;
        }
    }
    free_list.extend(new_free);
    prune_contained(free_list);
}

/// Runs one MaxRects trial under a single fixed heuristic against one
/// candidate container, returning the packed bounding box and every
/// rectangle's placement, or `None` if some rectangle found no free spot.
pub fn pack_with_heuristic(
    input: &StrategyInput,
    container: (u32, u32),
    heuristic: Heuristic,
) -> Option<PackResult> {
    if input.rects.is_empty() {
        return Some(PackResult {
            width: 0,
            height: 0,
            placed: Vec::new(),
        });
    }
    if input.rects.iter().any(|r| r.w > container.0 || r.h > container.1) {
        return None;
    }

    let mut order: Vec<usize> = (0..input.rects.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = input.rects[a];
        let rb = input.rects[b];
        let area_a = ra.w as u64 * ra.h as u64;
        let area_b = rb.w as u64 * rb.h as u64;
        let long_a = ra.w.max(ra.h);
        let long_b = rb.w.max(rb.h);
        area_b.cmp(&area_a).then(long_b.cmp(&long_a)).then(a.cmp(&b))
    });

    let mut free_list = vec![Rect::new(0, 0, container.0, container.1)];
    let mut used_rects: Vec<Rect> = Vec::with_capacity(input.rects.len());
    let mut placed = Vec::with_capacity(input.rects.len());

    for index in order {
        let rect = input.rects[index];
        let best = find_best(
            &free_list,
            rect.w,
            rect.h,
            input.opts.rotate_allowed,
            heuristic,
            &used_rects,
            container,
        )?;
        let used_rect = Rect::new(best.x, best.y, best.w, best.h);
        place_and_split(&mut free_list, used_rect);
        used_rects.push(used_rect);
        placed.push(PlacedRect {
            index,
            x: best.x,
            y: best.y,
            w: best.w,
            h: best.h,
            rotated: best.rotated,
        });
    }

    let width = placed.iter().map(|p| p.x + p.w).max().unwrap_or(0);
    let height = placed.iter().map(|p| p.y + p.h).max().unwrap_or(0);
    placed.sort_by_key(|p| p.index);

    Some(PackResult {
        width: width.max(1),
        height: height.max(1),
        placed,
    })
}

pub struct CompactPacker;

impl Pack for CompactPacker {
    /// Races the fixed heuristic order against one container and keeps
    /// the smallest-area result, the first strictly-better heuristic
    /// winning any tie (per the documented tie-break resolution).
    fn pack(&self, input: &StrategyInput, container: (u32, u32)) -> Option<PackResult> {
        let mut best: Option<PackResult> = None;
        for heuristic in HEURISTIC_ORDER {
            if let Some(candidate) = pack_with_heuristic(input, container, heuristic) {
                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        let candidate_area = candidate.width as u64 * candidate.height as u64;
                        let current_area = current.width as u64 * current.height as u64;
                        if candidate_area < current_area {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackingOptions;
    use crate::geometry::PackableRect;

    fn input<'a>(rects: &'a [PackableRect], opts: &'a PackingOptions) -> StrategyInput<'a> {
        StrategyInput { rects, opts }
    }

    #[test]
    fn packs_non_overlapping_rects() {
        let opts = PackingOptions::default();
        let rects = vec![
            PackableRect { w: 4, h: 4 },
            PackableRect { w: 2, h: 2 },
            PackableRect { w: 3, h: 1 },
        ];
        let result = CompactPacker.pack(&input(&rects, &opts), (8, 8)).unwrap();
        for i in 0..result.placed.len() {
            for j in (i + 1)..result.placed.len() {
                let a = &result.placed[i];
                let b = &result.placed[j];
                let ra = Rect::new(a.x, a.y, a.w, a.h);
                let rb = Rect::new(b.x, b.y, b.w, b.h);
                assert!(!ra.overlaps(&rb));
            }
        }
    }

    #[test]
    fn refuses_when_total_area_cannot_fit() {
        let opts = PackingOptions::default();
        let rects = vec![PackableRect { w: 5, h: 5 }, PackableRect { w: 5, h: 5 }];
        assert!(CompactPacker.pack(&input(&rects, &opts), (6, 6)).is_none());
    }

    #[test]
    fn rotation_used_when_allowed() {
        let mut opts = PackingOptions::default();
        opts.rotate_allowed = true;
        let rects = vec![PackableRect { w: 1, h: 5 }];
        let result =
            pack_with_heuristic(&input(&rects, &opts), (5, 1), Heuristic::BestAreaFit).unwrap();
        assert!(result.placed[0].rotated);
    }
}
