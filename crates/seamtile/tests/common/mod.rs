//! Shared fixtures: on-disk tile trees and a recording fake editor.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs, io,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use seamtile::{BaseImageId, Edge, EditError, ImageEditor, TileCoord, TileLayout};
use walkdir::WalkDir;

/// Writes a source tile whose content names its own address.
pub fn write_tile(root: &Path, id: BaseImageId, zoom: u32, column: u32, row: u32) {
    let layout = TileLayout::new(root);
    let path = layout.tile_path(id, TileCoord::new(zoom, column, row));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("{id}/{zoom}/{column}/{row}")).unwrap();
}

/// Fills `zooms × columns × rows` tiles for every listed base image.
pub fn write_block(root: &Path, ids: &[BaseImageId], zooms: u32, columns: u32, rows: u32) {
    for &id in ids {
        for zoom in 0..zooms {
            for column in 0..columns {
                for row in 0..rows {
                    write_tile(root, id, zoom, column, row);
                }
            }
        }
    }
}

/// Fills the given column and row span of one base image at every zoom
/// level, so that neighbours overlap only along their shared edge.
pub fn write_region(
    root: &Path,
    id: BaseImageId,
    zooms: u32,
    columns: RangeInclusive<u32>,
    rows: RangeInclusive<u32>,
) {
    for zoom in 0..zooms {
        for column in columns.clone() {
            for row in rows.clone() {
                write_tile(root, id, zoom, column, row);
            }
        }
    }
}

/// Every file under `dir`, keyed by path relative to it.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Call {
    pub seq: usize,
    pub op: &'static str,
    pub paths: Vec<PathBuf>,
}

impl Call {
    /// Piece suffix of the first scratch path involved, e.g. `West` or `NW`.
    pub fn piece(&self) -> Option<String> {
        self.paths.iter().find_map(|p| {
            let stem = p.file_stem()?.to_str()?;
            stem.rsplit_once('_').map(|(_, piece)| piece.to_string())
        })
    }

    pub fn is_four_way(&self) -> bool {
        matches!(
            self.piece().as_deref(),
            Some("NW" | "NE" | "SW" | "SE" | "N" | "S")
        )
    }
}

/// Deterministic stand-in for ImageMagick. Each operation writes a textual
/// description of what it did, so outputs can be compared byte for byte.
#[derive(Default)]
pub struct RecordingEditor {
    seq: AtomicUsize,
    calls: Mutex<Vec<Call>>,
    fail_on: Option<usize>,
    delay: Option<Duration>,
}

impl RecordingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `n`-th edit (1-based). Deletes are not counted.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        let mut calls = self.calls.lock().clone();
        calls.sort_by_key(|c| c.seq);
        calls
    }

    pub fn edits(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.op != "delete")
            .collect()
    }

    fn record(&self, op: &'static str, paths: &[&Path]) -> Result<(), EditError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(Call {
            seq,
            op,
            paths: paths.iter().map(|p| p.to_path_buf()).collect(),
        });

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if self.fail_on == Some(seq) {
            return Err(EditError::Failed {
                command: format!("fake {op}"),
                code: Some(1),
                stderr: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<String, EditError> {
        Ok(fs::read_to_string(path)?)
    }
}

impl ImageEditor for RecordingEditor {
    fn splice_trim(&self, src: &Path, dst: &Path, edge: Edge, band: u32) -> Result<(), EditError> {
        self.record("splice_trim", &[src, dst])?;
        let body = Self::read(src)?;
        fs::write(dst, format!("st[{edge:?},{band}]({body})"))?;
        Ok(())
    }

    fn trim(&self, src: &Path, dst: &Path) -> Result<(), EditError> {
        self.record("trim", &[src, dst])?;
        let body = Self::read(src)?;
        fs::write(dst, format!("t({body})"))?;
        Ok(())
    }

    fn chop(&self, image: &Path, edge: Edge, px: u32) -> Result<(), EditError> {
        self.record("chop", &[image])?;
        let body = Self::read(image)?;
        fs::write(image, format!("c[{edge:?},{px}]({body})"))?;
        Ok(())
    }

    fn append_horizontal(&self, left: &Path, right: &Path, dst: &Path) -> Result<(), EditError> {
        self.record("append_h", &[left, right, dst])?;
        let (l, r) = (Self::read(left)?, Self::read(right)?);
        fs::write(dst, format!("h({l}|{r})"))?;
        Ok(())
    }

    fn append_vertical(&self, top: &Path, bottom: &Path, dst: &Path) -> Result<(), EditError> {
        self.record("append_v", &[top, bottom, dst])?;
        let (t, b) = (Self::read(top)?, Self::read(bottom)?);
        fs::write(dst, format!("v({t}/{b})"))?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), EditError> {
        let seq = self.seq.load(Ordering::SeqCst);
        self.calls.lock().push(Call {
            seq,
            op: "delete",
            paths: vec![path.to_path_buf()],
        });
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
