//! Source set resolution.
//!
//! A `SourceSet` is the unit handed to the build steps: a named, ordered
//! list of files plus the include directories and flags they are compiled
//! with. Expansion is deterministic (sorted, deduplicated) so successive
//! builds over an unchanged tree produce byte-identical compiler
//! invocations.

use std::path::{Path, PathBuf};

use crate::error::PreconditionFailure;
use crate::util::fs::glob_files;

/// A resolved, non-empty set of source files for one library or extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    name: String,
    files: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    cflags: Vec<String>,
}

impl SourceSet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sorted, deduplicated absolute source paths.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn cflags(&self) -> &[String] {
        &self.cflags
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Expands glob patterns into [`SourceSet`]s.
#[derive(Debug, Clone)]
pub struct SourceSetResolver {
    base: PathBuf,
    include_dirs: Vec<PathBuf>,
}

impl SourceSetResolver {
    /// Create a resolver expanding patterns relative to `base`, attaching
    /// the shared include-directory list to every resolved set.
    pub fn new(base: impl Into<PathBuf>, include_dirs: Vec<PathBuf>) -> Self {
        SourceSetResolver {
            base: base.into(),
            include_dirs,
        }
    }

    /// Resolve `patterns` into a named source set.
    ///
    /// An empty expansion fails here rather than surfacing later as an
    /// "undefined symbol" link error.
    pub fn resolve(
        &self,
        name: &str,
        patterns: &[String],
        cflags: &[String],
    ) -> Result<SourceSet, PreconditionFailure> {
        let files = glob_files(&self.base, patterns).map_err(|e| {
            tracing::debug!("pattern expansion failed for `{}`: {}", name, e);
            PreconditionFailure::EmptySourceSet {
                library: name.to_string(),
                patterns: patterns.join(", "),
            }
        })?;

        if files.is_empty() {
            return Err(PreconditionFailure::EmptySourceSet {
                library: name.to_string(),
                patterns: patterns.join(", "),
            });
        }

        tracing::debug!("resolved {} source file(s) for `{}`", files.len(), name);

        Ok(SourceSet {
            name: name.to_string(),
            files,
            include_dirs: self.include_dirs.clone(),
            cflags: cflags.to_vec(),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}
