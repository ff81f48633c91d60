//! Layout engine for sprite-sheet atlas generation.
//!
//! Given a set of source images and packing options, chooses an atlas size
//! and a non-overlapping placement for every image, honoring trimming,
//! padding, rotation, rescaling, and hard size limits. The pixel packer and
//! template renderer that consume this engine's output are external
//! collaborators reached only through the plaintext layout grammar in
//! [`layout`] — this crate never encodes pixels.
//!
//! Pipeline: inputs -> [`metadata`] -> [`geometry`] -> [`driver`] (one of
//! [`strategy::shelf`], [`strategy::compact`], [`strategy::pot`]) ->
//! [`layout`], wrapped end-to-end by [`cache`]. [`pipeline::run`] is the
//! single entry point tying every stage together.
//!
//! ```no_run
//! use sprite_layout_core::{pipeline, PackingOptions};
//! use std::path::PathBuf;
//!
//! # fn main() -> sprite_layout_core::Result<()> {
//! let paths = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
//! let opts = PackingOptions::default();
//! let layout_text = pipeline::run(&paths, &opts, None)?;
//! print!("{layout_text}");
//! # Ok(()) }
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod strategy;

pub use config::*;
pub use error::*;
pub use model::*;

/// Convenience prelude for the primary types and functions.
pub mod prelude {
    pub use crate::cache::LayoutCache;
    pub use crate::config::{Mode, Optimize, PackingOptions, Resolution, ResolutionReference};
    pub use crate::error::{LayoutError, Result};
    pub use crate::metadata::{ImageMetadataProvider, MetadataProvider};
    pub use crate::model::{Layout, Placement, Rect, SourceImage};
    pub use crate::pipeline;
    pub use crate::pool::WorkerPool;
}
