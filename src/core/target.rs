//! Target definitions - what gets built.

use std::path::PathBuf;

use crate::core::source_set::SourceSet;

/// The kind of target being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Static library (.a / .lib), linked into the extension at build time.
    StaticLibrary,

    /// The loadable extension module, importable by the Python runtime.
    Extension,
}

impl TargetKind {
    /// Get the file extension for this target kind.
    pub fn extension(&self, os: &str) -> &'static str {
        match self {
            TargetKind::StaticLibrary => {
                if os == "windows" {
                    "lib"
                } else {
                    "a"
                }
            }
            // Python loads `.pyd` on Windows and `.so` everywhere else,
            // including macOS.
            TargetKind::Extension => {
                if os == "windows" {
                    "pyd"
                } else {
                    "so"
                }
            }
        }
    }

    /// Get the file prefix for this target kind.
    pub fn prefix(&self, os: &str) -> &'static str {
        match self {
            TargetKind::StaticLibrary => {
                if os == "windows" {
                    ""
                } else {
                    "lib"
                }
            }
            // Extension modules follow the `_name` convention so the pure
            // Python glue module `name.py` can import them.
            TargetKind::Extension => "_",
        }
    }

    /// Get the output filename for a target.
    pub fn output_filename(&self, name: &str, os: &str) -> String {
        format!("{}{}.{}", self.prefix(os), name, self.extension(os))
    }
}

/// A buildable artifact owned by the pipeline.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Target name (also the artifact stem)
    pub name: String,

    /// What kind of artifact this produces
    pub kind: TargetKind,

    /// Source sets compiled into this target
    pub sources: Vec<SourceSet>,

    /// Names of targets that must complete before this one starts
    pub depends_on: Vec<String>,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, kind: TargetKind, sources: Vec<SourceSet>) -> Self {
        BuildTarget {
            name: name.into(),
            kind,
            sources,
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.depends_on = deps;
        self
    }
}

/// A built artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Artifact path
    pub path: PathBuf,

    /// Target name
    pub target: String,

    /// Target kind
    pub kind: TargetKind,
}

/// A glue file staged from the bindings directory into the package tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueFile {
    /// Where the interface compiler (or a binding author) put the file
    pub source: PathBuf,

    /// Where the synchronizer placed it in the package tree
    pub destination: PathBuf,

    /// Filename key used for deduplication
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_library_filenames() {
        let kind = TargetKind::StaticLibrary;
        assert_eq!(kind.output_filename("cstuff", "linux"), "libcstuff.a");
        assert_eq!(kind.output_filename("cstuff", "macos"), "libcstuff.a");
        assert_eq!(kind.output_filename("cstuff", "windows"), "cstuff.lib");
    }

    #[test]
    fn test_extension_filenames() {
        let kind = TargetKind::Extension;
        assert_eq!(kind.output_filename("netstack", "linux"), "_netstack.so");
        assert_eq!(kind.output_filename("netstack", "macos"), "_netstack.so");
        assert_eq!(kind.output_filename("netstack", "windows"), "_netstack.pyd");
    }

    #[test]
    fn test_target_dependencies() {
        let target = BuildTarget::new("ext", TargetKind::Extension, vec![])
            .with_dependencies(vec!["cstuff".to_string()]);

        assert_eq!(target.depends_on, vec!["cstuff".to_string()]);
    }
}
