use std::{
    collections::HashSet,
    fs::{self, Metadata},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::StepError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectReport {
    pub copied: usize,
    pub unmodified: usize,
}

/// Same size and at least as new as the source.
fn is_current(source: &Metadata, destination: &Path) -> bool {
    let Ok(existing) = fs::metadata(destination) else {
        return false;
    };

    match (source.modified(), existing.modified()) {
        (Ok(src), Ok(dst)) => existing.len() == source.len() && dst >= src,
        _ => false,
    }
}

/// Copies every file of `sources` into `root`, keeping relative paths. When two
/// sources hold the same relative path the earlier source wins.
pub fn collect_static(sources: &[PathBuf], root: &Path) -> Result<CollectReport, StepError> {
    fs::create_dir_all(root).map_err(StepError::io(root))?;

    let mut report = CollectReport::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for source in sources {
        if !source.is_dir() {
            warn!("Static directory {} does not exist, skipping", source.display());
            continue;
        }

        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| StepError::Io {
                path: source.clone(),
                source: e.into(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };

            if !seen.insert(relative.to_path_buf()) {
                debug!("{} shadowed by an earlier static directory", entry.path().display());
                continue;
            }

            let metadata = entry.metadata().map_err(|e| StepError::Io {
                path: entry.path().to_path_buf(),
                source: e.into(),
            })?;
            let destination = root.join(relative);

            if is_current(&metadata, &destination) {
                report.unmodified += 1;
                continue;
            }

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(StepError::io(parent))?;
            }
            fs::copy(entry.path(), &destination).map_err(StepError::io(&destination))?;

            debug!("Copied {}", relative.display());
            report.copied += 1;
        }
    }

    info!(
        "{} static file(s) copied, {} unmodified, into {}",
        report.copied,
        report.unmodified,
        root.display()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_collect_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("static");
        let root = dir.path().join("staticfiles");
        write(&source.join("css/styles.css"), "body {}");
        write(&source.join("js/theme.js"), "// theme");

        let first = collect_static(&[source.clone()], &root).unwrap();
        assert_eq!(first, CollectReport { copied: 2, unmodified: 0 });
        assert_eq!(fs::read_to_string(root.join("css/styles.css")).unwrap(), "body {}");

        let second = collect_static(&[source], &root).unwrap();
        assert_eq!(second, CollectReport { copied: 0, unmodified: 2 });
    }

    #[test]
    fn test_first_source_wins() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("static");
        let secondary = dir.path().join("vendor");
        let root = dir.path().join("out");
        write(&primary.join("css/styles.css"), "primary");
        write(&secondary.join("css/styles.css"), "secondary");
        write(&secondary.join("css/extra.css"), "extra");

        let report = collect_static(&[primary, secondary, dir.path().join("missing")], &root).unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(fs::read_to_string(root.join("css/styles.css")).unwrap(), "primary");
        assert_eq!(fs::read_to_string(root.join("css/extra.css")).unwrap(), "extra");
    }

    #[test]
    fn test_changed_file_is_recopied() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("static");
        let root = dir.path().join("out");
        write(&source.join("app.js"), "v1");

        collect_static(&[source.clone()], &root).unwrap();
        write(&source.join("app.js"), "version 2");

        let report = collect_static(&[source], &root).unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(fs::read_to_string(root.join("app.js")).unwrap(), "version 2");
    }
}
