//! Scale composition, trim cropping, and the rectangle list the packing
//! strategies consume. Padding is deliberately NOT applied here: it stays
//! an expansion the driver applies at placement time and strips again at
//! emit time (see `driver`), so the rectangles this module produces are
//! the bare packable sizes.

use crate::config::{PackingOptions, ResolutionReference};
use crate::error::{LayoutError, Result};
use crate::model::SourceImage;

/// A bare packable rectangle, already scaled and trimmed.
#[derive(Debug, Clone, Copy)]
pub struct PackableRect {
    pub w: u32,
    pub h: u32,
}

/// Per-input trim and scale bookkeeping the driver reattaches to the
/// final placement once a container has been chosen.
#[derive(Debug, Clone, Copy)]
pub struct TrimInfo {
    pub trim_left: u32,
    pub trim_top: u32,
    pub trim_right: u32,
    pub trim_bottom: u32,
    pub scaled_source_w: u32,
    pub scaled_source_h: u32,
}

/// Computes the effective scale factor from `options`, composing the
/// user scale with a source/target resolution ratio when both are given.
fn effective_scale(opts: &PackingOptions) -> Result<f64> {
    let s = match (opts.source_resolution, opts.target_resolution) {
        (Some(src), Some(tgt)) => {
            let rx = tgt.width as f64 / src.width as f64;
            let ry = tgt.height as f64 / src.height as f64;
            let r = match opts.resolution_reference {
                ResolutionReference::Largest => rx.max(ry),
                ResolutionReference::Smallest => rx.min(ry),
            };
            opts.scale * r
        }
        _ => opts.scale,
    };
    if !(s > 0.0 && s <= 1.0) {
        return Err(LayoutError::UsageError(format!(
            "effective scale {s} is out of range (0, 1]"
        )));
    }
    Ok(s)
}

fn scaled_round(v: u32, s: f64) -> u32 {
    ((v as f64 * s).round() as u32).max(1)
}

/// Clamps `lead`/`trail` so the span between them never drops below 1px,
/// then returns `(lead, middle, trail)` with `lead + middle + trail ==
/// total` exactly. `middle` is derived as the remainder rather than
/// rounded independently, which is what keeps the identity exact once
/// `lead`/`trail` have each already been through their own rounding.
fn split_scaled(total: u32, lead: u32, trail: u32) -> (u32, u32, u32) {
    let lead = lead.min(total.saturating_sub(1));
    let remaining = total - lead;
    let trail = trail.min(remaining.saturating_sub(1));
    let middle = remaining - trail;
    (lead, middle, trail)
}

/// Applies scale and trim to every source image, producing the rectangle
/// list strategies pack and the per-entry trim metadata the driver
/// reattaches to placements. Returns the effective scale alongside.
pub fn preprocess(
    images: &[SourceImage],
    opts: &PackingOptions,
) -> Result<(Vec<PackableRect>, Vec<TrimInfo>, f64)> {
    let s = effective_scale(opts)?;
    let mut rects = Vec::with_capacity(images.len());
    let mut trims = Vec::with_capacity(images.len());

    for img in images {
        let (trim_left, trim_top, trim_right, trim_bottom) = if opts.trim_transparent {
            if let Some(b) = img.opaque_bounds {
                let right = img.width - (b.x + b.w);
                let bottom = img.height - (b.y + b.h);
                (b.x, b.y, right, bottom)
            } else {
                (0, 0, 0, 0)
            }
        } else {
            (0, 0, 0, 0)
        };

        let scaled_source_w = scaled_round(img.width, s);
        let scaled_source_h = scaled_round(img.height, s);
        let scale_trim = |v: u32| if v == 0 { 0 } else { scaled_round(v, s) };

        // Scale each trim edge independently, but derive the packable
        // width/height as the remainder against the scaled full source
        // size instead of rounding it separately: rounding all three of
        // trim_left/w/trim_right on their own does not reliably sum back
        // to scaled_source_w once `s != 1.0` (data-model invariant (d)).
        let (trim_left, w, trim_right) =
            split_scaled(scaled_source_w, scale_trim(trim_left), scale_trim(trim_right));
        let (trim_top, h, trim_bottom) =
            split_scaled(scaled_source_h, scale_trim(trim_top), scale_trim(trim_bottom));

        rects.push(PackableRect { w, h });
        trims.push(TrimInfo {
            trim_left,
            trim_top,
            trim_right,
            trim_bottom,
            scaled_source_w,
            scaled_source_h,
        });
    }

    Ok((rects, trims, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn opts() -> PackingOptions {
        PackingOptions::default()
    }

    #[test]
    fn no_trim_no_scale_passes_through_full_size() {
        let images = vec![SourceImage {
            path: "a.png".into(),
            width: 10,
            height: 20,
            opaque_bounds: None,
        }];
        let (rects, trims, s) = preprocess(&images, &opts()).unwrap();
        assert_eq!(s, 1.0);
        assert_eq!(rects[0].w, 10);
        assert_eq!(rects[0].h, 20);
        assert_eq!(trims[0].trim_left, 0);
    }

    #[test]
    fn trim_uses_opaque_bounds() {
        let mut o = opts();
        o.trim_transparent = true;
        let images = vec![SourceImage {
            path: "a.png".into(),
            width: 4,
            height: 4,
            opaque_bounds: Some(Rect::new(1, 1, 2, 2)),
        }];
        let (rects, trims, _) = preprocess(&images, &o).unwrap();
        assert_eq!(rects[0].w, 2);
        assert_eq!(rects[0].h, 2);
        assert_eq!(trims[0].trim_left, 1);
        assert_eq!(trims[0].trim_top, 1);
        assert_eq!(trims[0].trim_right, 1);
        assert_eq!(trims[0].trim_bottom, 1);
    }

    #[test]
    fn scale_composition_from_resolutions() {
        let mut o = opts();
        o.scale = 0.5;
        o.source_resolution = Some("4x4".parse().unwrap());
        o.target_resolution = Some("2x2".parse().unwrap());
        let images = vec![SourceImage {
            path: "a.png".into(),
            width: 4,
            height: 4,
            opaque_bounds: None,
        }];
        let (rects, _, s) = preprocess(&images, &o).unwrap();
        assert!((s - 0.25).abs() < 1e-9);
        assert_eq!(rects[0].w, 1);
        assert_eq!(rects[0].h, 1);
    }

    #[test]
    fn trim_and_scale_together_satisfy_the_exact_width_identity() {
        // source width 4, unscaled trim (1, bounds 2, 1), scale 0.5: each
        // edge rounds independently, so the invariant only holds if `w`
        // is derived as the remainder rather than rounded on its own.
        let mut o = opts();
        o.trim_transparent = true;
        o.scale = 0.5;
        let images = vec![SourceImage {
            path: "a.png".into(),
            width: 4,
            height: 4,
            opaque_bounds: Some(Rect::new(1, 0, 2, 4)),
        }];
        let (rects, trims, _) = preprocess(&images, &o).unwrap();
        assert_eq!(
            trims[0].trim_left + rects[0].w + trims[0].trim_right,
            trims[0].scaled_source_w
        );
        assert_eq!(
            trims[0].trim_top + rects[0].h + trims[0].trim_bottom,
            trims[0].scaled_source_h
        );
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        let mut o = opts();
        o.scale = 0.5;
        o.source_resolution = Some("1x1".parse().unwrap());
        o.target_resolution = Some("10x10".parse().unwrap());
        let images = vec![SourceImage {
            path: "a.png".into(),
            width: 4,
            height: 4,
            opaque_bounds: None,
        }];
        assert!(preprocess(&images, &o).is_err());
    }
}
