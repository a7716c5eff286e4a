//! Seam merging for tile pyramids that were rasterized per base image.
//!
//! Base images are laid out row-major in a grid of fixed width and each one
//! carries its own `zoom/column/row.png` pyramid. Tiles on the boundary of two
//! (or, at corners, four) neighbouring base images are incomplete on each
//! side. This crate finds those tiles and drives an external image editor to
//! produce one seamless replacement per boundary position:
//!
//! - [`grid`] resolves eastern, southern and south-eastern neighbours.
//! - [`matcher`] finds the tile coordinates present on every side of a seam.
//! - [`pipeline`] turns a [`MergeTask`] into an ordered list of edits.
//! - [`scheduler`] runs merges on a bounded pool and drains it.
//! - [`orchestrator`] sequences the pairwise pass, the barrier and the
//!   four-way pass.

pub mod editor;
pub mod error;
pub mod grid;
pub mod layout;
pub mod matcher;
pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;

pub use editor::{Edge, ImageEditor, MagickEditor};
pub use error::{EditError, MergeError};
pub use grid::{Grid, Neighbors, Quad};
pub use layout::{BaseImageId, Piece, TileCoord, TileLayout};
pub use matcher::{MergeKind, MergeTask};
pub use orchestrator::{MergeConfig, Orchestrator, Phase, RunSummary, Target};
pub use pipeline::MergePipeline;
pub use scheduler::Scheduler;
