use std::{io, path::PathBuf};

use content::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Command { command: String, status: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Input(String),

    #[error("Rendering YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StepError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StepError::Io { path, source }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Step `{step}` failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: StepError,
    },

    #[error("Deploy state {path}: {reason}")]
    Marker { path: PathBuf, reason: String },
}
