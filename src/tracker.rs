//! Artifact tracking: which files did processing leave behind?
//!
//! A baseline snapshot of the working directory is taken before processing;
//! anything new afterwards is a candidate artifact to attach to the item's
//! report-back. Cleanup restores the directory to baseline between items so
//! one item's artifacts never leak into the next.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Observes a single directory for files created during processing.
pub struct ArtifactTracker {
    dir: PathBuf,
}

impl ArtifactTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List regular files directly in the tracked directory (non-recursive).
    ///
    /// Enumeration failure yields the empty set — a missing or unreadable
    /// directory means "no files", never an error.
    pub fn snapshot(&self) -> HashSet<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return HashSet::new();
        };
        entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }

    /// Files present now that were not in `baseline`.
    pub fn diff(&self, baseline: &HashSet<String>) -> Vec<String> {
        let mut new_files: Vec<String> = self
            .snapshot()
            .into_iter()
            .filter(|f| !baseline.contains(f))
            .collect();
        new_files.sort();
        new_files
    }

    /// Delete every file not in `baseline`. Best-effort: a single undeletable
    /// file never aborts cleanup of the rest.
    pub fn cleanup(&self, baseline: &HashSet<String>) {
        for file in self.diff(baseline) {
            let path = self.dir.join(&file);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(file = %file, "artifact cleaned up"),
                Err(e) => debug!(file = %file, "artifact cleanup skipped: {e}"),
            }
        }
    }
}
