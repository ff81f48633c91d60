//! The plaintext layout grammar: three line-oriented record kinds,
//! UTF-8, LF-terminated. This supersedes the teacher's JSON/Plist
//! exporters — downstream tools (the pixel packer, the template
//! renderer) consume this text by parsing it, not by sharing in-memory
//! structures, per the external-interface contract.
//!
//! ```text
//! atlas <W>,<H>
//! scale <F>
//! sprite "<path>" <x>,<y> <w>,<h> [<trim_l>,<trim_t> <trim_r>,<trim_b>] [rotated]
//! ```

use crate::error::{LayoutError, Result};
use crate::model::{Layout, Placement, SourceImage};

fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Formats a scale factor as a decimal with up to 8 significant digits,
/// printing exactly `1` when the value is exactly 1.0.
fn format_scale(scale: f64) -> String {
    if scale == 1.0 {
        return "1".to_string();
    }
    let mut s = format!("{scale:.8}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Serializes a `Layout` to the canonical text grammar, in input order.
pub fn emit(layout: &Layout, images: &[SourceImage]) -> String {
    let mut out = String::new();
    out.push_str(&format!("atlas {},{}\n", layout.atlas_width, layout.atlas_height));
    out.push_str(&format!("scale {}\n", format_scale(layout.scale)));

    for placement in &layout.placements {
        let path = images[placement.source_index].path.to_string_lossy();
        let escaped = escape_path(&path);
        let mut line = format!(
            "sprite \"{}\" {},{} {},{}",
            escaped, placement.x, placement.y, placement.w, placement.h
        );
        let has_trim = placement.trim_left != 0
            || placement.trim_top != 0
            || placement.trim_right != 0
            || placement.trim_bottom != 0;
        if has_trim {
            line.push_str(&format!(
                " {},{} {},{}",
                placement.trim_left, placement.trim_top, placement.trim_right, placement.trim_bottom
            ));
        }
        if placement.rotated {
            line.push_str(" rotated");
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn next_quoted(&mut self) -> Option<String> {
        let s = self.rest.trim_start();
        if !s.starts_with('"') {
            return None;
        }
        let mut chars = s.char_indices().skip(1);
        let mut out = String::new();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                if let Some((_, next)) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                end = Some(i + 1);
                break;
            } else {
                out.push(c);
            }
        }
        let end = end?;
        self.rest = &s[end..];
        Some(unescape_path(&out))
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let s = self.rest.trim_start();
        if s.is_empty() {
            self.rest = s;
            return None;
        }
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        self.rest = &s[end..];
        Some(&s[..end])
    }

    fn remaining_is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }
}

fn parse_pair(token: &str) -> Result<(u32, u32)> {
    let (a, b) = token
        .split_once(',')
        .ok_or_else(|| LayoutError::InputError(format!("malformed pair: {token}")))?;
    let a: u32 = a
        .parse()
        .map_err(|_| LayoutError::InputError(format!("malformed pair: {token}")))?;
    let b: u32 = b
        .parse()
        .map_err(|_| LayoutError::InputError(format!("malformed pair: {token}")))?;
    Ok((a, b))
}

/// Parses the canonical text grammar back into a `Layout`. `parse(emit(L))
/// == L` modulo whitespace, for any `Layout` this crate can produce.
pub fn parse(text: &str) -> Result<Layout> {
    let mut atlas_width = None;
    let mut atlas_height = None;
    let mut scale = None;
    let mut placements = Vec::new();
    let mut sprite_index = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("atlas ") {
            let (w, h) = parse_pair(rest.trim())?;
            atlas_width = Some(w);
            atlas_height = Some(h);
        } else if let Some(rest) = line.strip_prefix("scale ") {
            let s: f64 = rest
                .trim()
                .parse()
                .map_err(|_| LayoutError::InputError(format!("malformed scale: {rest}")))?;
            scale = Some(s);
        } else if let Some(rest) = line.strip_prefix("sprite ") {
            let mut tok = Tokenizer::new(rest);
            let _path = tok
                .next_quoted()
                .ok_or_else(|| LayoutError::InputError("sprite line missing path".into()))?;
            let pos = tok
                .next_token()
                .ok_or_else(|| LayoutError::InputError("sprite line missing position".into()))?;
            let (x, y) = parse_pair(pos)?;
            let size = tok
                .next_token()
                .ok_or_else(|| LayoutError::InputError("sprite line missing size".into()))?;
            let (w, h) = parse_pair(size)?;

            let mut trim = (0, 0, 0, 0);
            let mut rotated = false;

            if let Some(first) = tok.next_token() {
                if first == "rotated" {
                    rotated = true;
                } else {
                    let (tl, tt) = parse_pair(first)?;
                    let second = tok.next_token().ok_or_else(|| {
                        LayoutError::InputError("sprite line missing second trim pair".into())
                    })?;
                    let (tr, tb) = parse_pair(second)?;
                    trim = (tl, tt, tr, tb);
                    if let Some(last) = tok.next_token() {
                        rotated = last == "rotated";
                    }
                }
            }
            if !tok.remaining_is_empty() {
                return Err(LayoutError::InputError(format!(
                    "unexpected trailing tokens on sprite line: {rest}"
                )));
            }

            placements.push(Placement {
                source_index: sprite_index,
                x,
                y,
                w,
                h,
                trim_left: trim.0,
                trim_top: trim.1,
                trim_right: trim.2,
                trim_bottom: trim.3,
                rotated,
            });
            sprite_index += 1;
        } else {
            return Err(LayoutError::InputError(format!(
                "unrecognized layout record: {line}"
            )));
        }
    }

    let atlas_width =
        atlas_width.ok_or_else(|| LayoutError::InputError("missing atlas record".into()))?;
    let atlas_height = atlas_height.unwrap();
    let scale = scale.ok_or_else(|| LayoutError::InputError("missing scale record".into()))?;

    Ok(Layout {
        atlas_width,
        atlas_height,
        scale,
        placements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Placement;

    fn sample_layout() -> (Layout, Vec<SourceImage>) {
        let images = vec![SourceImage {
            path: "a \"weird\".png".into(),
            width: 4,
            height: 4,
            opaque_bounds: None,
        }];
        let layout = Layout {
            atlas_width: 4,
            atlas_height: 4,
            scale: 1.0,
            placements: vec![Placement {
                source_index: 0,
                x: 0,
                y: 0,
                w: 2,
                h: 2,
                trim_left: 1,
                trim_top: 1,
                trim_right: 1,
                trim_bottom: 1,
                rotated: true,
            }],
        };
        (layout, images)
    }

    #[test]
    fn round_trips_through_grammar() {
        let (layout, images) = sample_layout();
        let text = emit(&layout, &images);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.atlas_width, layout.atlas_width);
        assert_eq!(parsed.atlas_height, layout.atlas_height);
        assert_eq!(parsed.scale, layout.scale);
        assert_eq!(parsed.placements.len(), 1);
        let p = &parsed.placements[0];
        assert_eq!((p.x, p.y, p.w, p.h), (0, 0, 2, 2));
        assert_eq!(
            (p.trim_left, p.trim_top, p.trim_right, p.trim_bottom),
            (1, 1, 1, 1)
        );
        assert!(p.rotated);
    }

    #[test]
    fn quotes_and_escapes_path() {
        let (layout, images) = sample_layout();
        let text = emit(&layout, &images);
        assert!(text.contains("\\\"weird\\\""));
    }

    #[test]
    fn scale_one_prints_bare_one() {
        assert_eq!(format_scale(1.0), "1");
    }

    #[test]
    fn scale_fraction_trims_trailing_zeros() {
        assert_eq!(format_scale(0.5), "0.5");
        assert_eq!(format_scale(0.25), "0.25");
    }

    #[test]
    fn rejects_unrecognized_record() {
        assert!(parse("bogus line\n").is_err());
    }
}
