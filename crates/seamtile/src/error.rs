use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure of a single invocation of the image-editing capability.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The editor ran but exited non-zero.
    #[error("'{command}' exited with {}: {stderr}", exit_label(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// Anything that stops a merge run.
///
/// A missing neighbor or tile is not represented here: the matcher simply
/// yields nothing for that boundary.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to scan {}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{task} failed")]
    Edit {
        task: String,
        #[source]
        source: EditError,
    },

    #[error("worker panicked while running {task}: {message}")]
    TaskPanicked { task: String, message: String },

    #[error("run aborted after an earlier failure")]
    Aborted,

    #[error("failed to build worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MergeError {
    pub(crate) fn scan(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MergeError::Scan {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_edit_renders_status_and_stderr() {
        let err = EditError::Failed {
            command: "convert a.png -trim b.png".into(),
            code: Some(1),
            stderr: "no such file".into(),
        };
        assert_eq!(
            err.to_string(),
            "'convert a.png -trim b.png' exited with status 1: no such file"
        );

        let killed = EditError::Failed {
            command: "convert".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("a signal"));
    }
}
