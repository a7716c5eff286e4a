//! Boundary tile matching.
//!
//! Turns "these base images are adjacent" into the concrete tile coordinates
//! that exist on every side of the seam. A missing base image or tile just
//! means there is nothing to merge there.

use std::fmt;

use log::{debug, info};

use crate::{
    error::MergeError,
    grid::Quad,
    layout::{list_numeric, BaseImageId, EntryKind, TileCoord, TileLayout},
};

/// Highest-numbered columns of the western image that are checked per zoom
/// level. Adjacent base images are slightly rotated against each other, so
/// the seam spans two columns rather than one.
pub const HORIZONTAL_BAND_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeKind {
    Horizontal,
    Vertical,
    FourWay,
}

/// One boundary tile position to be merged. The same `tile` coordinate is
/// looked up in every participating base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeTask {
    Horizontal {
        west: BaseImageId,
        east: BaseImageId,
        tile: TileCoord,
    },
    Vertical {
        north: BaseImageId,
        south: BaseImageId,
        tile: TileCoord,
    },
    FourWay {
        quad: Quad,
        tile: TileCoord,
    },
}

impl MergeTask {
    pub fn kind(&self) -> MergeKind {
        match self {
            MergeTask::Horizontal { .. } => MergeKind::Horizontal,
            MergeTask::Vertical { .. } => MergeKind::Vertical,
            MergeTask::FourWay { .. } => MergeKind::FourWay,
        }
    }

    /// The western, northern or north-western member.
    pub fn anchor(&self) -> BaseImageId {
        match *self {
            MergeTask::Horizontal { west, .. } => west,
            MergeTask::Vertical { north, .. } => north,
            MergeTask::FourWay { quad, .. } => quad.north_west,
        }
    }

    pub fn tile(&self) -> TileCoord {
        match *self {
            MergeTask::Horizontal { tile, .. }
            | MergeTask::Vertical { tile, .. }
            | MergeTask::FourWay { tile, .. } => tile,
        }
    }
}

impl fmt::Display for MergeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeTask::Horizontal { west, east, tile } => {
                write!(f, "horizontal merge {west},{east} at {tile}")
            }
            MergeTask::Vertical { north, south, tile } => {
                write!(f, "vertical merge {north},{south} at {tile}")
            }
            MergeTask::FourWay { quad, tile } => write!(
                f,
                "four-way merge {},{},{},{} at {tile}",
                quad.north_west, quad.north_east, quad.south_west, quad.south_east
            ),
        }
    }
}

/// Tiles on the seam between `west` and `east`.
///
/// For every zoom level of the western image, the two highest-numbered
/// columns are walked and each tile that also exists in the eastern image is
/// matched.
pub fn horizontal(
    layout: &TileLayout,
    west: BaseImageId,
    east: BaseImageId,
) -> Result<Vec<MergeTask>, MergeError> {
    if !layout.has_base_image(west) || !layout.has_base_image(east) {
        return Ok(Vec::new());
    }
    info!("Horizontal merge {west},{east}");

    let mut tasks = Vec::new();
    for (zoom, zoom_dir) in list_numeric(&layout.base_image_dir(west), EntryKind::Dir)? {
        let columns = list_numeric(&zoom_dir, EntryKind::Dir)?;
        let band = &columns[columns.len().saturating_sub(HORIZONTAL_BAND_COLUMNS)..];

        for (column, column_dir) in band {
            debug!("Checking {}", column_dir.display());
            for (row, _) in list_numeric(column_dir, EntryKind::Tile)? {
                let tile = TileCoord::new(zoom, *column, row);
                if layout.tile_path(east, tile).is_file() {
                    tasks.push(MergeTask::Horizontal { west, east, tile });
                }
            }
        }
    }

    Ok(tasks)
}

/// Tiles on the seam between `north` and `south`: the southernmost tile of
/// every column of the northern image, if the southern image has it too.
pub fn vertical(
    layout: &TileLayout,
    north: BaseImageId,
    south: BaseImageId,
) -> Result<Vec<MergeTask>, MergeError> {
    if !layout.has_base_image(north) || !layout.has_base_image(south) {
        return Ok(Vec::new());
    }
    info!("Vertical merge {north},{south}");

    let mut tasks = Vec::new();
    for (zoom, zoom_dir) in list_numeric(&layout.base_image_dir(north), EntryKind::Dir)? {
        for (column, column_dir) in list_numeric(&zoom_dir, EntryKind::Dir)? {
            debug!("Checking {}", column_dir.display());
            let Some((row, _)) = list_numeric(&column_dir, EntryKind::Tile)?.pop() else {
                continue;
            };

            let tile = TileCoord::new(zoom, column, row);
            if layout.tile_path(south, tile).is_file() {
                tasks.push(MergeTask::Vertical { north, south, tile });
            }
        }
    }

    Ok(tasks)
}

/// Corner tiles where the four images of `quad` meet.
///
/// Per zoom level the north-western image's highest column and, within it,
/// the highest row give the corner coordinate. A zoom level where any of the
/// four corner tiles is missing is skipped on its own.
pub fn four_way(layout: &TileLayout, quad: Quad) -> Result<Vec<MergeTask>, MergeError> {
    if !quad.members().iter().all(|&id| layout.has_base_image(id)) {
        return Ok(Vec::new());
    }
    info!(
        "Four-way merge {},{},{},{}",
        quad.north_west, quad.north_east, quad.south_west, quad.south_east
    );

    let mut tasks = Vec::new();
    for (zoom, zoom_dir) in list_numeric(&layout.base_image_dir(quad.north_west), EntryKind::Dir)? {
        let Some((column, column_dir)) = list_numeric(&zoom_dir, EntryKind::Dir)?.pop() else {
            continue;
        };
        let Some((row, _)) = list_numeric(&column_dir, EntryKind::Tile)?.pop() else {
            continue;
        };

        let tile = TileCoord::new(zoom, column, row);
        let missing: Vec<BaseImageId> = quad
            .members()
            .into_iter()
            .filter(|&id| !layout.tile_path(id, tile).is_file())
            .collect();

        if !missing.is_empty() {
            info!("Corner tile {tile} missing in {missing:?}, skipping zoom level {zoom}");
            continue;
        }
        tasks.push(MergeTask::FourWay { quad, tile });
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use std::fs;
    use tempfile::TempDir;

    fn touch(layout: &TileLayout, id: BaseImageId, zoom: u32, column: u32, row: u32) {
        let path = layout.tile_path(id, TileCoord::new(zoom, column, row));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"tile").unwrap();
    }

    fn fixture() -> (TempDir, TileLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = TileLayout::new(dir.path());
        (dir, layout)
    }

    fn tiles(tasks: &[MergeTask]) -> Vec<TileCoord> {
        tasks.iter().map(MergeTask::tile).collect()
    }

    #[test]
    fn horizontal_scans_two_highest_columns_numerically() {
        let (_dir, layout) = fixture();
        for column in [3, 4, 10] {
            touch(&layout, 1, 12, column, 7);
            touch(&layout, 2, 12, column, 7);
        }

        let tasks = horizontal(&layout, 1, 2).unwrap();
        assert_eq!(
            tiles(&tasks),
            vec![TileCoord::new(12, 4, 7), TileCoord::new(12, 10, 7)]
        );
        assert!(tasks.iter().all(|t| t.kind() == MergeKind::Horizontal));
    }

    #[test]
    fn horizontal_single_column_and_one_sided_tiles() {
        let (_dir, layout) = fixture();
        touch(&layout, 1, 3, 0, 1);
        touch(&layout, 1, 3, 0, 2);
        touch(&layout, 2, 3, 0, 2);
        touch(&layout, 2, 3, 0, 9);

        let tasks = horizontal(&layout, 1, 2).unwrap();
        assert_eq!(
            tasks,
            vec![MergeTask::Horizontal {
                west: 1,
                east: 2,
                tile: TileCoord::new(3, 0, 2),
            }]
        );
    }

    #[test]
    fn missing_neighbor_is_not_an_error() {
        let (_dir, layout) = fixture();
        touch(&layout, 1, 0, 0, 0);

        assert!(horizontal(&layout, 1, 2).unwrap().is_empty());
        assert!(vertical(&layout, 1, 7).unwrap().is_empty());
        assert!(four_way(&layout, Grid::default().quad(1).unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn vertical_takes_highest_row_of_each_column() {
        let (_dir, layout) = fixture();
        for row in [2, 9, 10] {
            touch(&layout, 1, 5, 20, row);
        }
        touch(&layout, 1, 5, 21, 4);
        touch(&layout, 7, 5, 20, 10);
        // Only a lower row in the south: no match for column 21.
        touch(&layout, 7, 5, 21, 3);

        let tasks = vertical(&layout, 1, 7).unwrap();
        assert_eq!(
            tasks,
            vec![MergeTask::Vertical {
                north: 1,
                south: 7,
                tile: TileCoord::new(5, 20, 10),
            }]
        );
    }

    #[test]
    fn four_way_skips_only_incomplete_zoom_levels() {
        let (_dir, layout) = fixture();
        let quad = Grid::default().quad(1).unwrap();

        for id in quad.members() {
            touch(&layout, id, 1, 4, 6);
        }
        // Zoom 2 corner is missing in the south-east image.
        touch(&layout, 1, 2, 8, 1);
        touch(&layout, 1, 2, 9, 12);
        for id in [2, 7] {
            touch(&layout, id, 2, 9, 12);
        }
        touch(&layout, 8, 2, 9, 11);

        let tasks = four_way(&layout, quad).unwrap();
        assert_eq!(
            tasks,
            vec![MergeTask::FourWay {
                quad,
                tile: TileCoord::new(1, 4, 6),
            }]
        );
    }

    #[test]
    fn display_names_the_seam() {
        let task = MergeTask::Vertical {
            north: 3,
            south: 9,
            tile: TileCoord::new(0, 1, 2),
        };
        assert_eq!(task.to_string(), "vertical merge 3,9 at 0/1/2");
        assert_eq!(task.anchor(), 3);
    }
}
