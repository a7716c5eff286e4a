//! Tile path addressing.
//!
//! Source tiles live at `<root>/<base image>/<zoom>/<column>/<row>.png`.
//! Merge output and intermediate artifacts live in a scratch mirror at
//! `<root>/tmp/<zoom>/<column>/`. Every segment except the extension is a
//! decimal integer, and ordering is always numeric.

use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::MergeError;

/// Positive, 1-based index of a base image directory.
pub type BaseImageId = u32;

pub const TILE_EXTENSION: &str = "png";
pub const SCRATCH_DIR: &str = "tmp";

/// `(zoom, column, row)` of a tile. The same triple addresses corresponding
/// content in adjacent base images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub zoom: u32,
    pub column: u32,
    pub row: u32,
}

impl TileCoord {
    pub fn new(zoom: u32, column: u32, row: u32) -> Self {
        Self { zoom, column, row }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Intermediate image staged in the scratch tree while a merge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    West,
    East,
    North,
    South,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    /// NW + NE composed side by side.
    NorthStrip,
    /// SW + SE composed side by side.
    SouthStrip,
}

impl Piece {
    pub fn suffix(self) -> &'static str {
        match self {
            Piece::West => "West",
            Piece::East => "East",
            Piece::North => "North",
            Piece::South => "South",
            Piece::NorthWest => "NW",
            Piece::NorthEast => "NE",
            Piece::SouthWest => "SW",
            Piece::SouthEast => "SE",
            Piece::NorthStrip => "N",
            Piece::SouthStrip => "S",
        }
    }
}

/// Root of the on-disk tile trees.
#[derive(Debug, Clone)]
pub struct TileLayout {
    root: PathBuf,
}

impl TileLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn base_image_dir(&self, id: BaseImageId) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn has_base_image(&self, id: BaseImageId) -> bool {
        self.base_image_dir(id).is_dir()
    }

    pub fn zoom_dir(&self, id: BaseImageId, zoom: u32) -> PathBuf {
        self.base_image_dir(id).join(zoom.to_string())
    }

    pub fn column_dir(&self, id: BaseImageId, zoom: u32, column: u32) -> PathBuf {
        self.zoom_dir(id, zoom).join(column.to_string())
    }

    pub fn tile_path(&self, id: BaseImageId, coord: TileCoord) -> PathBuf {
        self.column_dir(id, coord.zoom, coord.column)
            .join(tile_file_name(coord.row, None))
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    pub fn scratch_dir(&self, zoom: u32, column: u32) -> PathBuf {
        self.scratch_root()
            .join(zoom.to_string())
            .join(column.to_string())
    }

    /// Final merged tile for `coord`.
    pub fn output_path(&self, coord: TileCoord) -> PathBuf {
        self.scratch_dir(coord.zoom, coord.column)
            .join(tile_file_name(coord.row, None))
    }

    /// Intermediate artifact owned by the merge anchored at `anchor`.
    pub fn scratch_path(&self, coord: TileCoord, anchor: BaseImageId, piece: Piece) -> PathBuf {
        let suffix = format!("{anchor}_{}", piece.suffix());
        self.scratch_dir(coord.zoom, coord.column)
            .join(tile_file_name(coord.row, Some(&suffix)))
    }

    /// Every base image directory under the root, ascending.
    pub fn base_images(&self) -> Result<Vec<BaseImageId>, MergeError> {
        Ok(list_numeric(&self.root, EntryKind::Dir)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}

fn tile_file_name(row: u32, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) => format!("{row}_{s}.{TILE_EXTENSION}"),
        None => format!("{row}.{TILE_EXTENSION}"),
    }
}

/// Parses a directory name made only of decimal digits.
pub fn parse_index(name: &OsStr) -> Option<u32> {
    let s = name.to_str()?;
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses `<row>.png`.
pub fn parse_tile_name(name: &OsStr) -> Option<u32> {
    let path = Path::new(name);
    if path.extension()? != TILE_EXTENSION {
        return None;
    }
    parse_index(path.file_stem()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Dir,
    Tile,
}

/// Lists the numerically named children of `dir`, sorted ascending by number.
/// Entries that don't parse are ignored.
pub(crate) fn list_numeric(dir: &Path, kind: EntryKind) -> Result<Vec<(u32, PathBuf)>, MergeError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            MergeError::scan(path, e.into())
        })?;

        let number = match kind {
            EntryKind::Dir if entry.file_type().is_dir() => parse_index(entry.file_name()),
            EntryKind::Tile if entry.file_type().is_file() => parse_tile_name(entry.file_name()),
            _ => None,
        };

        if let Some(n) = number {
            found.push((n, entry.into_path()));
        }
    }

    found.sort_unstable_by_key(|(n, _)| *n);
    Ok(found)
}
