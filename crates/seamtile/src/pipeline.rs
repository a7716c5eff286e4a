//! Merge recipes.
//!
//! Each [`MergeTask`] expands into a fixed, ordered list of [`EditStep`]s
//! that stage pieces in the scratch tree, compose the final tile and then
//! delete the pieces again.

use std::{fs, path::PathBuf, sync::Arc};

use log::{debug, warn};

use crate::{
    editor::{Edge, ImageEditor},
    error::{EditError, MergeError},
    layout::{Piece, TileLayout},
    matcher::MergeTask,
};

/// Width in pixels of the overlap band the upstream tiler leaves on every
/// seam. Fixed by the capture setup.
pub const OVERLAP_PX: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    SpliceTrim {
        src: PathBuf,
        dst: PathBuf,
        edge: Edge,
    },
    Trim {
        src: PathBuf,
        dst: PathBuf,
    },
    Chop {
        image: PathBuf,
        edge: Edge,
    },
    AppendHorizontal {
        left: PathBuf,
        right: PathBuf,
        dst: PathBuf,
    },
    AppendVertical {
        top: PathBuf,
        bottom: PathBuf,
        dst: PathBuf,
    },
}

impl EditStep {
    pub fn apply(&self, editor: &dyn ImageEditor) -> Result<(), EditError> {
        match self {
            EditStep::SpliceTrim { src, dst, edge } => editor.splice_trim(src, dst, *edge, OVERLAP_PX),
            EditStep::Trim { src, dst } => editor.trim(src, dst),
            EditStep::Chop { image, edge } => editor.chop(image, *edge, OVERLAP_PX),
            EditStep::AppendHorizontal { left, right, dst } => {
                editor.append_horizontal(left, right, dst)
            }
            EditStep::AppendVertical { top, bottom, dst } => editor.append_vertical(top, bottom, dst),
        }
    }
}

/// Planned edits for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub steps: Vec<EditStep>,
    /// Intermediate artifacts, removed once the steps have run.
    pub scratch: Vec<PathBuf>,
    pub output: PathBuf,
}

pub fn recipe(layout: &TileLayout, task: &MergeTask) -> Recipe {
    let tile = task.tile();
    let anchor = task.anchor();
    let piece = |p: Piece| layout.scratch_path(tile, anchor, p);
    let output = layout.output_path(tile);

    match *task {
        MergeTask::Horizontal { west, east, .. } => {
            let (w, e) = (piece(Piece::West), piece(Piece::East));
            Recipe {
                steps: vec![
                    EditStep::SpliceTrim {
                        src: layout.tile_path(west, tile),
                        dst: w.clone(),
                        edge: Edge::West,
                    },
                    EditStep::SpliceTrim {
                        src: layout.tile_path(east, tile),
                        dst: e.clone(),
                        edge: Edge::East,
                    },
                    EditStep::Chop {
                        image: e.clone(),
                        edge: Edge::West,
                    },
                    EditStep::Chop {
                        image: w.clone(),
                        edge: Edge::East,
                    },
                    EditStep::AppendHorizontal {
                        left: w.clone(),
                        right: e.clone(),
                        dst: output.clone(),
                    },
                ],
                scratch: vec![w, e],
                output,
            }
        }
        MergeTask::Vertical { north, south, .. } => {
            let (n, s) = (piece(Piece::North), piece(Piece::South));
            Recipe {
                steps: vec![
                    EditStep::SpliceTrim {
                        src: layout.tile_path(north, tile),
                        dst: n.clone(),
                        edge: Edge::North,
                    },
                    EditStep::SpliceTrim {
                        src: layout.tile_path(south, tile),
                        dst: s.clone(),
                        edge: Edge::South,
                    },
                    EditStep::Chop {
                        image: n.clone(),
                        edge: Edge::South,
                    },
                    EditStep::Chop {
                        image: s.clone(),
                        edge: Edge::North,
                    },
                    EditStep::AppendVertical {
                        top: n.clone(),
                        bottom: s.clone(),
                        dst: output.clone(),
                    },
                ],
                scratch: vec![n, s],
                output,
            }
        }
        MergeTask::FourWay { quad, .. } => {
            let nw = piece(Piece::NorthWest);
            let ne = piece(Piece::NorthEast);
            let sw = piece(Piece::SouthWest);
            let se = piece(Piece::SouthEast);
            let north = piece(Piece::NorthStrip);
            let south = piece(Piece::SouthStrip);

            let mut steps: Vec<EditStep> = [
                (quad.north_west, &nw),
                (quad.north_east, &ne),
                (quad.south_west, &sw),
                (quad.south_east, &se),
            ]
            .into_iter()
            .map(|(id, dst)| EditStep::Trim {
                src: layout.tile_path(id, tile),
                dst: dst.clone(),
            })
            .collect();

            // Corners lose the band on their inward vertical seam.
            for (image, edge) in [
                (&nw, Edge::East),
                (&ne, Edge::West),
                (&sw, Edge::East),
                (&se, Edge::West),
            ] {
                steps.push(EditStep::Chop {
                    image: image.clone(),
                    edge,
                });
            }

            steps.extend([
                EditStep::AppendHorizontal {
                    left: nw.clone(),
                    right: ne.clone(),
                    dst: north.clone(),
                },
                EditStep::AppendHorizontal {
                    left: sw.clone(),
                    right: se.clone(),
                    dst: south.clone(),
                },
                EditStep::Chop {
                    image: north.clone(),
                    edge: Edge::South,
                },
                EditStep::Chop {
                    image: south.clone(),
                    edge: Edge::North,
                },
                EditStep::AppendVertical {
                    top: north.clone(),
                    bottom: south.clone(),
                    dst: output.clone(),
                },
            ]);

            Recipe {
                steps,
                scratch: vec![nw, ne, sw, se, north, south],
                output,
            }
        }
    }
}

/// Runs recipes against an [`ImageEditor`].
pub struct MergePipeline {
    layout: TileLayout,
    editor: Arc<dyn ImageEditor>,
}

impl MergePipeline {
    pub fn new(layout: TileLayout, editor: Arc<dyn ImageEditor>) -> Self {
        Self { layout, editor }
    }

    /// Executes `task` to completion. The first failing step stops the
    /// recipe; scratch pieces are removed either way.
    pub fn run(&self, task: &MergeTask) -> Result<(), MergeError> {
        let tile = task.tile();
        let recipe = recipe(&self.layout, task);
        debug!("Merging {task}");

        // Several tasks may create the same scratch column concurrently;
        // create_dir_all tolerates that.
        fs::create_dir_all(self.layout.scratch_dir(tile.zoom, tile.column)).map_err(|e| {
            MergeError::Edit {
                task: task.to_string(),
                source: e.into(),
            }
        })?;

        let result = recipe
            .steps
            .iter()
            .try_for_each(|step| step.apply(self.editor.as_ref()));

        for path in &recipe.scratch {
            if let Err(e) = self.editor.delete(path) {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }

        result.map_err(|source| MergeError::Edit {
            task: task.to_string(),
            source,
        })
    }
}
