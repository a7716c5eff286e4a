use std::{
    ops::RangeInclusive,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    editor::ImageEditor,
    error::MergeError,
    grid::{Grid, Quad, DEFAULT_GRID_WIDTH},
    layout::{BaseImageId, TileLayout},
    matcher::{self, MergeKind, MergeTask},
    pipeline::MergePipeline,
    scheduler::{Scheduler, DEFAULT_WORKERS, PROGRESS_INTERVAL},
};

/// Settings for one merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub base_dir: PathBuf,
    pub grid_width: u32,
    pub workers: usize,
    /// Exclusive upper bound of the sweep. `None` means one past the largest
    /// base image found on disk.
    pub max_index: Option<BaseImageId>,
    pub progress_interval: Duration,
}

impl MergeConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            grid_width: DEFAULT_GRID_WIDTH,
            workers: DEFAULT_WORKERS,
            max_index: None,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// Which anchors a run visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Single(BaseImageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    PairwiseQueued,
    DrainingPairwise,
    FourWayQueued,
    DrainingFourWay,
    Done,
}

/// Tasks handed to the scheduler, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub horizontal: usize,
    pub vertical: usize,
    pub four_way: usize,
    pub elapsed: Duration,
}

pub struct Orchestrator {
    grid: Grid,
    layout: TileLayout,
    max_index: Option<BaseImageId>,
    pipeline: Arc<MergePipeline>,
    scheduler: Scheduler,
    phase: Phase,
    summary: RunSummary,
}

impl Orchestrator {
    pub fn new(config: MergeConfig, editor: Arc<dyn ImageEditor>) -> Result<Self, MergeError> {
        let grid = Grid::new(config.grid_width)
            .ok_or_else(|| MergeError::InvalidConfig("grid width must be positive".into()))?;
        let scheduler =
            Scheduler::new(config.workers)?.with_progress_interval(config.progress_interval);
        let layout = TileLayout::new(config.base_dir);

        Ok(Self {
            grid,
            pipeline: Arc::new(MergePipeline::new(layout.clone(), editor)),
            layout,
            max_index: config.max_index,
            scheduler,
            phase: Phase::Idle,
            summary: RunSummary::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Merges every seam reachable from `target`.
    ///
    /// All horizontal and vertical merges are drained before any four-way
    /// merge is queued, since corner tiles build on the pairwise seams.
    pub fn run(&mut self, target: Target) -> Result<RunSummary, MergeError> {
        let started = Instant::now();
        self.summary = RunSummary::default();

        let anchors = self.anchors(target)?;
        self.enter(Phase::Scanning);
        let quads = match self.queue_pairwise(anchors) {
            Ok(quads) => quads,
            Err(e) => {
                // Let in-flight merges settle before surfacing the scan error.
                if let Err(drained) = self.scheduler.drain() {
                    debug!("Merge failure superseded by {e}: {drained}");
                }
                return Err(e);
            }
        };
        self.enter(Phase::PairwiseQueued);

        self.enter(Phase::DrainingPairwise);
        self.scheduler.drain()?;

        self.enter(Phase::FourWayQueued);
        let queued = self.queue_four_way(&quads);
        self.enter(Phase::DrainingFourWay);
        let drained = self.scheduler.drain();
        queued?;
        drained?;

        self.enter(Phase::Done);
        self.summary.elapsed = started.elapsed();
        Ok(self.summary.clone())
    }

    fn anchors(&self, target: Target) -> Result<RangeInclusive<BaseImageId>, MergeError> {
        match target {
            Target::Single(0) => Err(MergeError::InvalidConfig(
                "base image indices start at 1".into(),
            )),
            Target::Single(index) => Ok(index..=index),
            Target::All => {
                let last = match self.max_index {
                    Some(max) => max.saturating_sub(1),
                    None => self.layout.base_images()?.last().copied().unwrap_or(0),
                };
                Ok(1..=last)
            }
        }
    }

    /// Queues the horizontal and vertical merges of every anchor and returns
    /// the four-way sets whose members all exist.
    fn queue_pairwise(
        &mut self,
        anchors: RangeInclusive<BaseImageId>,
    ) -> Result<Vec<Quad>, MergeError> {
        let mut quads = Vec::new();

        for anchor in anchors {
            if self.scheduler.has_failed() {
                break;
            }

            let neighbors = self.grid.neighbors(anchor);
            if let Some(east) = neighbors.east {
                for task in matcher::horizontal(&self.layout, anchor, east)? {
                    self.submit(task);
                }
            }
            if let Some(south) = neighbors.south {
                for task in matcher::vertical(&self.layout, anchor, south)? {
                    self.submit(task);
                }
            }
            debug!("Done with scanning base image {anchor}");

            if let Some(quad) = self.grid.quad(anchor) {
                if quad.members().iter().all(|&id| self.layout.has_base_image(id)) {
                    quads.push(quad);
                }
            }
        }

        Ok(quads)
    }

    fn queue_four_way(&mut self, quads: &[Quad]) -> Result<(), MergeError> {
        for &quad in quads {
            if self.scheduler.has_failed() {
                break;
            }
            for task in matcher::four_way(&self.layout, quad)? {
                self.submit(task);
            }
        }
        Ok(())
    }

    fn submit(&mut self, task: MergeTask) {
        match task.kind() {
            MergeKind::Horizontal => self.summary.horizontal += 1,
            MergeKind::Vertical => self.summary.vertical += 1,
            MergeKind::FourWay => self.summary.four_way += 1,
        }

        let pipeline = Arc::clone(&self.pipeline);
        self.scheduler
            .submit(task.to_string(), move || pipeline.run(&task));
    }

    fn enter(&mut self, next: Phase) {
        debug!("Phase {:?} -> {:?}", self.phase, next);
        if next == Phase::Done {
            info!(
                "Queued {} horizontal, {} vertical, {} four-way merges",
                self.summary.horizontal, self.summary.vertical, self.summary.four_way
            );
        }
        self.phase = next;
    }
}
