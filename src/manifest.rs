//! Manifest bookkeeping for a Drive-folder acquisition: per-file entries
//! persisted alongside the downloaded tree, plus the dedupe/conflict
//! tracking used while walking.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MANIFEST_FILENAME: &str = ".manifest.json";

/// One file as recorded in a folder's manifest: path is relative to the
/// folder's target root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub path: String,
    pub md5: Option<String>,
    pub size: Option<u64>,
}

/// Write `entries` to `<target_root>/.manifest.json`. A no-op when empty,
/// matching the source behavior of never creating an empty manifest.
pub async fn write(target_root: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let manifest_path = target_root.join(MANIFEST_FILENAME);
    let data = serde_json::to_string_pretty(entries)?;
    tokio::fs::write(&manifest_path, data).await?;
    info!("Wrote manifest with {} entries to {}", entries.len(), manifest_path.display());
    Ok(())
}

/// Read a previously written manifest, if present.
pub async fn read(target_root: &Path) -> Result<Vec<ManifestEntry>> {
    let manifest_path = target_root.join(MANIFEST_FILENAME);
    let data = tokio::fs::read_to_string(&manifest_path).await?;
    Ok(serde_json::from_str(&data)?)
}

/// Verify every entry in `entries` against files on disk under
/// `target_root`. Returns the list of entry paths that are missing or
/// corrupt; an empty list means full verification success.
pub async fn verify_entries(target_root: &Path, entries: &[ManifestEntry]) -> Vec<String> {
    let mut failed = Vec::new();
    for entry in entries {
        let path = target_root.join(&entry.path);
        if crate::verify::verify(&path, entry.size, entry.md5.as_deref()).await.is_err() {
            failed.push(entry.path.clone());
        }
    }
    failed
}

/// Tracks, per relative path, the set of MD5 values seen so far while
/// walking a Drive folder: lets the walker skip scheduling an identical
/// `(path, md5)` twice and flag paths whose entries disagree on MD5.
#[derive(Default)]
pub struct DedupeTracker {
    seen_by_path: HashMap<String, HashSet<String>>,
    conflicts_by_path: HashMap<String, HashSet<String>>,
    duplicate_count: usize,
}

pub enum DedupeOutcome {
    /// First time this (path, md5) pair is seen; schedule it.
    New,
    /// Identical (path, md5) already seen; skip scheduling.
    Duplicate,
    /// Same path, different md5 than previously seen; schedule it, but
    /// the path is now flagged as conflicted.
    Conflict,
}

impl DedupeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of `path` with `md5` (when known). Paths with
    /// no md5 are always treated as new (there is nothing to dedupe on).
    pub fn observe(&mut self, path: &str, md5: Option<&str>) -> DedupeOutcome {
        let Some(md5) = md5 else {
            return DedupeOutcome::New;
        };

        let existing = self.seen_by_path.entry(path.to_string()).or_default();
        if existing.contains(md5) {
            self.duplicate_count += 1;
            return DedupeOutcome::Duplicate;
        }

        let is_conflict = !existing.is_empty();
        existing.insert(md5.to_string());
        if is_conflict {
            self.conflicts_by_path
                .entry(path.to_string())
                .or_default()
                .extend(existing.iter().cloned());
            DedupeOutcome::Conflict
        } else {
            DedupeOutcome::New
        }
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }

    pub fn conflicted_paths(&self) -> Vec<&str> {
        self.conflicts_by_path.keys().map(String::as_str).collect()
    }

    /// Log a summary the way the source does: dedupe count at info level,
    /// conflicts (first 10, with an ellipsis) at warn level.
    pub fn log_summary(&self) {
        if self.duplicate_count > 0 {
            info!("Deduped {} download(s) by identical path+md5", self.duplicate_count);
        }
        if !self.conflicts_by_path.is_empty() {
            let mut sample: Vec<&str> = self.conflicted_paths();
            sample.sort_unstable();
            let truncated = sample.len() > 10;
            sample.truncate(10);
            warn!(
                "Detected {} path(s) with multiple different md5 values (possible naming conflicts). Example(s): {}{}",
                self.conflicts_by_path.len(),
                sample.join(", "),
                if truncated { "..." } else { "" }
            );
        }
    }
}

#[allow(dead_code)]
pub fn manifest_path(target_root: &Path) -> PathBuf {
    target_root.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![ManifestEntry {
            id: "f1".to_string(),
            path: "a/b.txt".to_string(),
            md5: Some("abc".to_string()),
            size: Some(5),
        }];
        write(dir.path(), &entries).await.unwrap();
        let read_back = read(dir.path()).await.unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].path, "a/b.txt");
    }

    #[tokio::test]
    async fn skips_writing_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &[]).await.unwrap();
        assert!(!dir.path().join(MANIFEST_FILENAME).exists());
    }

    #[test]
    fn dedupe_tracker_flags_duplicate_then_conflict() {
        let mut tracker = DedupeTracker::new();
        assert!(matches!(tracker.observe("a.txt", Some("md5a")), DedupeOutcome::New));
        assert!(matches!(tracker.observe("a.txt", Some("md5a")), DedupeOutcome::Duplicate));
        assert!(matches!(tracker.observe("a.txt", Some("md5b")), DedupeOutcome::Conflict));
        assert_eq!(tracker.duplicate_count(), 1);
        assert_eq!(tracker.conflicted_paths(), vec!["a.txt"]);
    }

    #[test]
    fn dedupe_tracker_treats_no_md5_as_always_new() {
        let mut tracker = DedupeTracker::new();
        assert!(matches!(tracker.observe("a.txt", None), DedupeOutcome::New));
        assert!(matches!(tracker.observe("a.txt", None), DedupeOutcome::New));
        assert_eq!(tracker.duplicate_count(), 0);
    }
}
