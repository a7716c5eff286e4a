//! Pixel editing capability.
//!
//! The merge core never touches pixels itself. Every edit goes through
//! [`ImageEditor`]; [`MagickEditor`] implements it by running ImageMagick's
//! `convert` once per operation.

use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, error, log_enabled, Level};

use crate::error::EditError;

/// Side of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    North,
    South,
    East,
    West,
}

impl Edge {
    /// ImageMagick `-gravity` value.
    pub fn gravity(self) -> &'static str {
        match self {
            Edge::North => "North",
            Edge::South => "South",
            Edge::East => "East",
            Edge::West => "West",
        }
    }

    /// Geometry of a band `px` wide lying along this edge.
    pub fn band_geometry(self, px: u32) -> String {
        match self {
            Edge::East | Edge::West => format!("{px}x0"),
            Edge::North | Edge::South => format!("0x{px}"),
        }
    }
}

/// Synchronous image operations. Each call either completes or fails with
/// the editor's exit status.
pub trait ImageEditor: Send + Sync {
    /// Writes `src` to `dst` with its uniform margins trimmed, except along
    /// `edge`: a `band`-wide guard is spliced onto that edge before trimming
    /// and removed afterwards, so that side keeps its extent.
    fn splice_trim(&self, src: &Path, dst: &Path, edge: Edge, band: u32) -> Result<(), EditError>;

    /// Writes `src` to `dst` with all uniform margins trimmed.
    fn trim(&self, src: &Path, dst: &Path) -> Result<(), EditError>;

    /// Removes `px` pixels along `edge`, in place.
    fn chop(&self, image: &Path, edge: Edge, px: u32) -> Result<(), EditError>;

    /// Composes `left` and `right` side by side into `dst`.
    fn append_horizontal(&self, left: &Path, right: &Path, dst: &Path) -> Result<(), EditError>;

    /// Composes `top` above `bottom` into `dst`.
    fn append_vertical(&self, top: &Path, bottom: &Path, dst: &Path) -> Result<(), EditError>;

    /// Removes `path`. Removing a file that does not exist succeeds.
    fn delete(&self, path: &Path) -> Result<(), EditError>;
}

pub const DEFAULT_CONVERT: &str = "convert";

/// [`ImageEditor`] backed by the ImageMagick `convert` command.
#[derive(Debug, Clone)]
pub struct MagickEditor {
    program: PathBuf,
}

impl MagickEditor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), EditError> {
        let command = render_command(&self.program, &args);
        debug!("Running {command}");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| EditError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if log_enabled!(Level::Debug) {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                debug!("{line}");
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("Process failed: {command}\n{stderr}");
            return Err(EditError::Failed {
                command,
                code: output.status.code(),
                stderr,
            });
        }

        debug!("Process completed");
        Ok(())
    }
}

impl Default for MagickEditor {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERT)
    }
}

impl ImageEditor for MagickEditor {
    fn splice_trim(&self, src: &Path, dst: &Path, edge: Edge, band: u32) -> Result<(), EditError> {
        self.run(splice_trim_args(src, dst, edge, band))
    }

    fn trim(&self, src: &Path, dst: &Path) -> Result<(), EditError> {
        self.run(trim_args(src, dst))
    }

    fn chop(&self, image: &Path, edge: Edge, px: u32) -> Result<(), EditError> {
        self.run(chop_args(image, edge, px))
    }

    fn append_horizontal(&self, left: &Path, right: &Path, dst: &Path) -> Result<(), EditError> {
        self.run(append_args("+append", left, right, dst))
    }

    fn append_vertical(&self, top: &Path, bottom: &Path, dst: &Path) -> Result<(), EditError> {
        self.run(append_args("-append", top, bottom, dst))
    }

    fn delete(&self, path: &Path) -> Result<(), EditError> {
        debug!("Removing {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn args<I, S>(parts: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    parts.into_iter().map(|p| p.as_ref().to_os_string()).collect()
}

fn splice_trim_args(src: &Path, dst: &Path, edge: Edge, band: u32) -> Vec<OsString> {
    let geometry = edge.band_geometry(band);
    let mut out = args([src.as_os_str()]);
    out.extend(args([
        "-gravity",
        edge.gravity(),
        "-background",
        "white",
        "-splice",
        geometry.as_str(),
        "-background",
        "black",
        "-splice",
        geometry.as_str(),
        "-trim",
        "+repage",
        "-chop",
        geometry.as_str(),
    ]));
    out.push(dst.as_os_str().to_os_string());
    out
}

fn trim_args(src: &Path, dst: &Path) -> Vec<OsString> {
    args([src.as_os_str(), OsStr::new("-trim"), dst.as_os_str()])
}

fn chop_args(image: &Path, edge: Edge, px: u32) -> Vec<OsString> {
    let geometry = edge.band_geometry(px);
    let mut out = args([image.as_os_str()]);
    out.extend(args(["-gravity", edge.gravity(), "+repage", "-chop", geometry.as_str()]));
    out.push(image.as_os_str().to_os_string());
    out
}

fn append_args(mode: &str, first: &Path, second: &Path, dst: &Path) -> Vec<OsString> {
    args([
        OsStr::new(mode),
        first.as_os_str(),
        second.as_os_str(),
        dst.as_os_str(),
    ])
}

fn render_command(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
