//! Glue file synchronization.
//!
//! Copies the interface-compiler-generated Python glue (and any
//! hand-written glue living beside it) from the bindings directory into
//! the package tree. Files are keyed by filename, so re-running the
//! synchronizer is idempotent: the same destination set, simple overwrite
//! on re-copy, no duplicates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::GlueFile;
use crate::util::fs::{copy_file, ensure_dir};

/// Copies glue files matching a fixed extension filter.
#[derive(Debug, Clone)]
pub struct GlueFileSynchronizer {
    source_dir: PathBuf,
    dest_dir: PathBuf,
    extension: String,
}

impl GlueFileSynchronizer {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        GlueFileSynchronizer {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            extension: extension.into(),
        }
    }

    /// Copy every matching file, returning the synchronized set in
    /// filename order.
    pub fn sync(&self) -> Result<Vec<GlueFile>> {
        ensure_dir(&self.dest_dir)?;

        // BTreeMap keys the copy set by filename: duplicates collapse and
        // the result order is stable.
        let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();

        for entry in WalkDir::new(&self.source_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !self.matches(path) {
                continue;
            }

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                by_name.insert(name.to_string(), path.to_path_buf());
            }
        }

        let mut synced = Vec::with_capacity(by_name.len());
        for (name, source) in by_name {
            let destination = self.dest_dir.join(&name);
            copy_file(&source, &destination)
                .with_context(|| format!("failed to synchronize glue file `{}`", name))?;

            tracing::debug!("synced {} -> {}", source.display(), destination.display());

            synced.push(GlueFile {
                source,
                destination,
                key: name,
            });
        }

        tracing::info!(
            "Synchronized {} glue file(s) into {}",
            synced.len(),
            self.dest_dir.display()
        );

        Ok(synced)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_sync_copies_matching_files_only() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("bindings");
        let dst = tmp.path().join("pkg");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("netstack.py"), "glue").unwrap();
        fs::write(src.join("sockets.py"), "more glue").unwrap();
        fs::write(src.join("netstack.i"), "%module netstack").unwrap();
        fs::write(src.join("app.cxx"), "// app").unwrap();

        let sync = GlueFileSynchronizer::new(&src, &dst, "py");
        let glue = sync.sync().unwrap();

        assert_eq!(glue.len(), 2);
        assert_eq!(dir_entries(&dst), vec!["netstack.py", "sockets.py"]);
        assert_eq!(glue[0].key, "netstack.py");
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("bindings");
        let dst = tmp.path().join("pkg");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("netstack.py"), "v1").unwrap();

        let sync = GlueFileSynchronizer::new(&src, &dst, "py");
        let first = sync.sync().unwrap();

        // Regenerated content between runs gets overwritten, not duplicated.
        fs::write(src.join("netstack.py"), "v2").unwrap();
        let second = sync.sync().unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(dir_entries(&dst), vec!["netstack.py"]);
        assert_eq!(fs::read_to_string(dst.join("netstack.py")).unwrap(), "v2");
    }

    #[test]
    fn test_sync_ignores_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("bindings");
        let dst = tmp.path().join("pkg");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested").join("deep.py"), "").unwrap();
        fs::write(src.join("top.py"), "").unwrap();

        let sync = GlueFileSynchronizer::new(&src, &dst, "py");
        let glue = sync.sync().unwrap();

        assert_eq!(glue.len(), 1);
        assert_eq!(dir_entries(&dst), vec!["top.py"]);
    }

    #[test]
    fn test_sync_empty_source_yields_empty_set() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("bindings");
        let dst = tmp.path().join("pkg");
        fs::create_dir_all(&src).unwrap();

        let sync = GlueFileSynchronizer::new(&src, &dst, "py");
        assert!(sync.sync().unwrap().is_empty());
        assert!(dst.is_dir());
    }
}
