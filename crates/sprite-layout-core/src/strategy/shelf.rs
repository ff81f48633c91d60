//! Shelf ("fast") packing: sort by height descending (ties by width
//! descending, then input order — the tie-break fixed here since spec
//! left it an open question), then sweep left to right filling
//! horizontal shelves, starting a new shelf whenever the current one
//! cannot hold the next rectangle. Deterministic, O(n log n).
//!
//! Grounded in the skyline packer's shelf/bookkeeping shape (a list of
//! bands with a running `x` cursor), simplified to a pure left-to-right
//! sweep with no waste-map recovery pass.

use super::{Pack, PackResult, PlacedRect, StrategyInput};

pub struct ShelfPacker;

struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

impl Pack for ShelfPacker {
    fn pack(&self, input: &StrategyInput, container: (u32, u32)) -> Option<PackResult> {
        let (max_w, max_h) = container;
        if input.rects.is_empty() {
            return Some(PackResult {
                width: 0,
                height: 0,
                placed: Vec::new(),
            });
        }

        // Any single rectangle wider or taller than the container can
        // never be placed regardless of rotation handling (rotation is a
        // Compact-only concern per the strategy set).
        if input.rects.iter().any(|r| r.w > max_w || r.h > max_h) {
            return None;
        }

        let mut order: Vec<usize> = (0..input.rects.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = input.rects[a];
            let rb = input.rects[b];
            rb.h.cmp(&ra.h)
                .then(rb.w.cmp(&ra.w))
                .then(a.cmp(&b))
        });

        let mut shelves: Vec<Shelf> = Vec::new();
        let mut placed = Vec::with_capacity(input.rects.len());
        let mut used_width = 0u32;

        for index in order {
            let rect = input.rects[index];
            let shelf = match shelves.last_mut() {
                Some(s) if s.cursor_x + rect.w <= max_w => s,
                _ => {
                    let y = shelves
                        .last()
                        .map(|s| s.y + s.height)
                        .unwrap_or(0);
                    if y + rect.h > max_h {
                        return None;
                    }
                    shelves.push(Shelf {
                        y,
                        height: rect.h,
                        cursor_x: 0,
                    });
                    shelves.last_mut().unwrap()
                }
            };

            let x = shelf.cursor_x;
            let y = shelf.y;
            shelf.cursor_x += rect.w;
            used_width = used_width.max(shelf.cursor_x);

            placed.push(PlacedRect {
                index,
                x,
                y,
                w: rect.w,
                h: rect.h,
                rotated: false,
            });
        }

        let used_height = shelves.iter().map(|s| s.y + s.height).max().unwrap_or(0);
        placed.sort_by_key(|p| p.index);

        Some(PackResult {
            width: used_width.max(1),
            height: used_height.max(1),
            placed,
        })
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
    fn places_rects_left_to_right_on_one_shelf() {
        let opts = PackingOptions::default();
        let rects = vec![
            PackableRect { w: 1, h: 1 },
            PackableRect { w: 1, h: 1 },
        ];
        let result = ShelfPacker.pack(&input(&rects, &opts), (10, 10)).unwrap();
        assert_eq!(result.placed[0].x, 0);
        assert_eq!(result.placed[1].x, 1);
        assert_eq!(result.height, 1);
    }

    #[test]
    fn ties_break_by_input_order() {
        let opts = PackingOptions::default();
        let rects = vec![
            PackableRect { w: 3, h: 3 },
            PackableRect { w: 3, h: 3 },
        ];
        let result = ShelfPacker.pack(&input(&rects, &opts), (3, 10)).unwrap();
        // identical size -> both go on the same shelf in a new row each,
        // since width 3 fills the shelf; order preserved by index.
        assert_eq!(result.placed[0].index, 0);
        assert_eq!(result.placed[1].index, 1);
        assert_eq!(result.placed[0].y, 0);
        assert_eq!(result.placed[1].y, 3);
    }

    #[test]
    fn refuses_when_a_rect_exceeds_container() {
        let opts = PackingOptions::default();
        let rects = vec![PackableRect { w: 20, h: 1 }];
        assert!(ShelfPacker.pack(&input(&rects, &opts), (10, 10)).is_none());
    }
}
