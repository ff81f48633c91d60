use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Packing strategy selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Compact,
    Pot,
    Fast,
}

impl FromStr for Mode {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pot" => Ok(Self::Pot),
            "fast" => Ok(Self::Fast),
            _ => Err(()),
        }
    }
}

/// Driver scoring objective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Optimize {
    Gpu,
    Space,
}

impl FromStr for Optimize {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "space" => Ok(Self::Space),
            _ => Err(()),
        }
    }
}

/// Which side of a `WxH` ratio to use when composing the effective scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionReference {
    Largest,
    Smallest,
}

impl FromStr for ResolutionReference {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "largest" => Ok(Self::Largest),
            "smallest" => Ok(Self::Smallest),
            _ => Err(()),
        }
    }
}

/// A `WxH` pair, used for `--source-resolution`/`--target-resolution`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s.split_once('x').or_else(|| s.split_once('X')).ok_or(())?;
        let width: u32 = w.parse().map_err(|_| ())?;
        let height: u32 = h.parse().map_err(|_| ())?;
        Ok(Self { width, height })
    }
}

/// The complete set of knobs the packing driver and strategies consume.
/// Mirrors every CLI flag in the external interface; defaults match the
/// long-form flag defaults documented there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingOptions {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_optimize")]
    pub optimize: Optimize,
    #[serde(default)]
    pub padding: u32,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    #[serde(default)]
    pub max_combinations: u32,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_trim_transparent")]
    pub trim_transparent: bool,
    #[serde(default)]
    pub rotate_allowed: bool,
    pub source_resolution: Option<Resolution>,
    pub target_resolution: Option<Resolution>,
    #[serde(default = "default_resolution_reference")]
    pub resolution_reference: ResolutionReference,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for PackingOptions {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            optimize: default_optimize(),
            padding: 0,
            max_width: None,
            max_height: None,
            max_combinations: 0,
            scale: default_scale(),
            trim_transparent: default_trim_transparent(),
            rotate_allowed: false,
            source_resolution: None,
            target_resolution: None,
            resolution_reference: default_resolution_reference(),
            threads: default_threads(),
        }
    }
}

fn default_mode() -> Mode {
    Mode::Fast
}
fn default_optimize() -> Optimize {
    Optimize::Space
}
fn default_scale() -> f64 {
    1.0
}
fn default_trim_transparent() -> bool {
    false
}
fn default_resolution_reference() -> ResolutionReference {
    ResolutionReference::Largest
}
fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl PackingOptions {
    /// Validates the option set, rejecting combinations the usage-error
    /// taxonomy names: zero threads, scale outside `(0, 1]`, and hard
    /// limits too small to hold even a single padded pixel.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(LayoutError::UsageError(
                "threads must be at least 1".into(),
            ));
        }
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(LayoutError::UsageError(format!(
                "scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        if let Some(w) = self.max_width {
            if w == 0 || w <= 2 * self.padding {
                return Err(LayoutError::UsageError(format!(
                    "max_width ({w}) leaves no usable space after padding ({})",
                    self.padding
                )));
            }
        }
        if let Some(h) = self.max_height {
            if h == 0 || h <= 2 * self.padding {
                return Err(LayoutError::UsageError(format!(
                    "max_height ({h}) leaves no usable space after padding ({})",
                    self.padding
                )));
            }
        }
        if let (Some(src), Some(_)) = (self.source_resolution, self.target_resolution) {
            if src.width == 0 || src.height == 0 {
                return Err(LayoutError::UsageError(
                    "source_resolution must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Fluent builder for `PackingOptions`, mirroring the style of the rest
/// of the options surface.
#[derive(Debug, Default, Clone)]
pub struct PackingOptionsBuilder {
    opts: PackingOptions,
}

impl PackingOptionsBuilder {
    pub fn new() -> Self {
        Self {
            opts: PackingOptions::default(),
        }
    }
    pub fn mode(mut self, v: Mode) -> Self {
        self.opts.mode = v;
        self
    }
    pub fn optimize(mut self, v: Optimize) -> Self {
        self.opts.optimize = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.opts.padding = v;
        self
    }
    pub fn max_width(mut self, v: Option<u32>) -> Self {
        self.opts.max_width = v;
        self
    }
    pub fn max_height(mut self, v: Option<u32>) -> Self {
        self.opts.max_height = v;
        self
    }
    pub fn max_combinations(mut self, v: u32) -> Self {
        self.opts.max_combinations = v;
        self
    }
    pub fn scale(mut self, v: f64) -> Self {
        self.opts.scale = v;
        self
    }
    pub fn trim_transparent(mut self, v: bool) -> Self {
        self.opts.trim_transparent = v;
        self
    }
    pub fn rotate_allowed(mut self, v: bool) -> Self {
        self.opts.rotate_allowed = v;
        self
    }
    pub fn source_resolution(mut self, v: Option<Resolution>) -> Self {
        self.opts.source_resolution = v;
        self
    }
    pub fn target_resolution(mut self, v: Option<Resolution>) -> Self {
        self.opts.target_resolution = v;
        self
    }
    pub fn resolution_reference(mut self, v: ResolutionReference) -> Self {
        self.opts.resolution_reference = v;
        self
    }
    pub fn threads(mut self, v: usize) -> Self {
        self.opts.threads = v;
        self
    }
    pub fn build(self) -> PackingOptions {
        self.opts
    }
}

impl PackingOptions {
    pub fn builder() -> PackingOptionsBuilder {
        PackingOptionsBuilder::new()
    }
}
