use crate::layout::BaseImageId;

/// Base images per grid row in the deployments this tool was built for.
pub const DEFAULT_GRID_WIDTH: u32 = 6;

/// Row-major placement of base images, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    width: u32,
}

/// `(row, col)` of a base image; `index = row * width + col + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

/// Merge partners of an anchor image. `south` is offered whenever the index
/// is representable; whether it exists is decided on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub east: Option<BaseImageId>,
    pub south: Option<BaseImageId>,
    pub south_east: Option<BaseImageId>,
}

/// The four images meeting at the south-east corner of `north_west`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub north_west: BaseImageId,
    pub north_east: BaseImageId,
    pub south_west: BaseImageId,
    pub south_east: BaseImageId,
}

impl Quad {
    pub fn members(&self) -> [BaseImageId; 4] {
        [
            self.north_west,
            self.north_east,
            self.south_west,
            self.south_east,
        ]
    }
}

impl Grid {
    /// `width` must be non-zero.
    pub fn new(width: u32) -> Option<Self> {
        (width > 0).then_some(Self { width })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn position(&self, index: BaseImageId) -> GridPosition {
        let zero_based = index.saturating_sub(1);
        GridPosition {
            row: zero_based / self.width,
            col: zero_based % self.width,
        }
    }

    /// Images on the eastern edge of the grid have no eastern partner.
    pub fn is_east_edge(&self, index: BaseImageId) -> bool {
        index % self.width == 0
    }

    /// Partners past `BaseImageId::MAX` are absent.
    pub fn neighbors(&self, index: BaseImageId) -> Neighbors {
        let east = if self.is_east_edge(index) {
            None
        } else {
            index.checked_add(1)
        };
        let south = index.checked_add(self.width);
        Neighbors {
            east,
            south,
            south_east: east.and(south).and_then(|s| s.checked_add(1)),
        }
    }

    /// Four-way partner set anchored at `index`, if it has an eastern partner.
    pub fn quad(&self, index: BaseImageId) -> Option<Quad> {
        let n = self.neighbors(index);
        Some(Quad {
            north_west: index,
            north_east: n.east?,
            south_west: n.south?,
            south_east: n.south_east?,
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
        }
    }
}
