use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Progress of the last pipeline run, persisted after every completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub pipeline: String,
    pub last_step: String,
    pub revision: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub finished: bool,
}

fn marker_error(path: &Path, reason: impl ToString) -> PipelineError {
    PipelineError::Marker {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl Marker {
    pub fn load(path: &Path) -> Result<Option<Self>, PipelineError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(marker_error(path, e)),
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| marker_error(path, e))
    }

    /// Written to a sibling file first, then renamed over the old marker.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| marker_error(path, e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| marker_error(path, e))?;
        }

        let mut temp = PathBuf::from(path);
        temp.as_mut_os_string().push(".tmp");

        fs::write(&temp, json).map_err(|e| marker_error(path, e))?;
        fs::rename(&temp, path).map_err(|e| marker_error(path, e))
    }

    /// Index of the first step to run when resuming `pipeline` at `revision`.
    /// Anything but an unfinished run of the same pipeline and revision starts over.
    pub fn resume_from(&self, pipeline: &str, revision: Option<&str>, steps: &[&str]) -> usize {
        if self.finished || self.pipeline != pipeline || self.revision.as_deref() != revision {
            return 0;
        }

        steps
            .iter()
            .position(|step| *step == self.last_step)
            .map(|index| index + 1)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const STEPS: [&str; 4] = ["install", "migrate", "collect-static", "restart"];

    fn marker(last_step: &str, revision: Option<&str>, finished: bool) -> Marker {
        Marker {
            pipeline: "deploy".to_string(),
            last_step: last_step.to_string(),
            revision: revision.map(str::to_string),
            updated_at: Utc::now(),
            finished,
        }
    }

    #[test]
    fn test_resume_from() {
        let rev = Some("abc123");

        assert_eq!(marker("migrate", rev, false).resume_from("deploy", rev, &STEPS), 2);
        assert_eq!(marker("migrate", rev, true).resume_from("deploy", rev, &STEPS), 0);
        assert_eq!(marker("migrate", rev, false).resume_from("setup", rev, &STEPS), 0);
        assert_eq!(marker("migrate", rev, false).resume_from("deploy", Some("def456"), &STEPS), 0);
        assert_eq!(marker("unknown", rev, false).resume_from("deploy", rev, &STEPS), 0);
        assert_eq!(marker("restart", None, false).resume_from("deploy", None, &STEPS), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/.deploy-state.json");

        assert_eq!(Marker::load(&path).unwrap(), None);

        let saved = marker("collect-static", Some("abc123"), false);
        saved.save(&path).unwrap();

        assert_eq!(Marker::load(&path).unwrap(), Some(saved));
        assert!(!dir.path().join("state/.deploy-state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".deploy-state.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(Marker::load(&path), Err(PipelineError::Marker { .. })));
    }
}
