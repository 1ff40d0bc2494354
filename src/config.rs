//! Pipeline configuration.
//!
//! All paths the pipeline touches arrive through a [`PipelineConfig`]
//! passed to the constructor - there are no process-wide path constants, so
//! multiple pipelines (and tests) can run against different roots in one
//! process.
//!
//! The configuration is normally loaded from a `slipway.toml` manifest in
//! the packaging directory:
//!
//! ```toml
//! root_dir = "../.."
//! package_dir = "."
//! bindings_dir = "src/bindings/python"
//! include_dirs = ["include", "src", "ext/ipstack/src/include"]
//! license = "LICENSE.txt"
//!
//! [[libraries]]
//! name = "cstuff"
//! sources = ["ext/natpmp/*.c", "ext/ipstack/src/core/*.c"]
//!
//! [extension]
//! name = "netstack"
//! sources = ["src/bindings/python/*.cxx", "src/*.cpp"]
//! interface = "src/bindings/python/netstack.i"
//! defines = ["NS_ENABLE_PYTHON=1"]
//! ```
//!
//! `root_dir`, `package_dir`, and `build_dir` are resolved against the
//! manifest's directory; `bindings_dir`, `include_dirs`, `license`, and
//! the interface file are resolved against `root_dir`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::PreconditionFailure;

/// Name of the pipeline manifest file.
pub const MANIFEST_NAME: &str = "slipway.toml";

/// One static library built from pure-C source sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    /// Library name (artifact stem)
    pub name: String,

    /// Glob patterns relative to the root directory
    pub sources: Vec<String>,

    /// Extra compiler flags for this library
    #[serde(default)]
    pub cflags: Vec<String>,
}

/// The loadable extension module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionConfig {
    /// Module name; the artifact is `_<name>.so` (`.pyd` on Windows)
    pub name: String,

    /// Glob patterns relative to the root directory
    pub sources: Vec<String>,

    /// Interface-description file consumed by the interface compiler
    pub interface: PathBuf,

    /// C++ language standard, identical across platforms
    #[serde(default = "default_std")]
    pub std: String,

    /// Feature macros (NAME or NAME=VALUE)
    #[serde(default)]
    pub defines: Vec<String>,

    /// Warnings suppressed in vendored code
    #[serde(default = "default_suppressed_warnings")]
    pub suppressed_warnings: Vec<String>,

    /// Extra arguments for the interface compiler
    #[serde(default)]
    pub swig_args: Vec<String>,

    /// Extra linker flags
    #[serde(default)]
    pub ldflags: Vec<String>,
}

impl ExtensionConfig {
    /// The fixed per-build compile flag set: language standard, feature
    /// macros, suppressed warnings.
    pub fn cflags(&self) -> Vec<String> {
        let mut flags = vec![format!("-std={}", self.std)];
        flags.extend(self.defines.iter().map(|d| format!("-D{}", d)));
        flags.extend(self.suppressed_warnings.iter().cloned());
        flags
    }
}

fn default_std() -> String {
    "c++11".to_string()
}

fn default_suppressed_warnings() -> Vec<String> {
    [
        "-Wno-parentheses-equality",
        "-Wno-macro-redefined",
        "-Wno-tautological-overlap-compare",
        "-Wno-tautological-constant-out-of-range-compare",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// External tool overrides. Unset entries fall back to the environment
/// (`CC`, `CXX`, `AR`) and then to a PATH search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    pub swig: Option<PathBuf>,
    pub git: Option<PathBuf>,
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Repository root containing the vendored trees
    pub root_dir: PathBuf,

    /// Package output directory
    pub package_dir: PathBuf,

    /// Bindings source directory (application sources, interface file,
    /// hand-written glue); also where generated glue is emitted
    pub bindings_dir: PathBuf,

    /// Include directories applied uniformly to every compile
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    /// Intermediate build tree (objects, static libraries, the extension)
    #[serde(default)]
    pub build_dir: Option<PathBuf>,

    /// Static libraries to build before the extension
    #[serde(default)]
    pub libraries: Vec<LibraryConfig>,

    /// The extension module
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// License file copied into the package directory
    #[serde(default)]
    pub license: Option<PathBuf>,

    /// Extension filter for glue-file synchronization
    #[serde(default = "default_glue_extension")]
    pub glue_extension: String,

    /// External tool overrides
    #[serde(default)]
    pub tools: ToolConfig,

    /// Timeout applied to every external process invocation
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,

    /// Emit compile_commands.json into the build directory
    #[serde(default)]
    pub emit_compile_commands: bool,

    /// Directory the pipeline must be invoked from (set by the CLI, never
    /// from the manifest)
    #[serde(skip)]
    pub expected_cwd: Option<PathBuf>,
}

fn default_glue_extension() -> String {
    "py".to_string()
}

impl PipelineConfig {
    /// Load a manifest and resolve its paths.
    pub fn from_manifest(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let mut config: PipelineConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_paths(&base);
        Ok(config)
    }

    /// Make every configured path absolute.
    ///
    /// Manifest-relative: `root_dir`, `package_dir`, `build_dir`.
    /// Root-relative: `bindings_dir`, `include_dirs`, `extension.interface`,
    /// `license`.
    pub fn resolve_paths(&mut self, manifest_dir: &Path) {
        self.root_dir = absolutize(manifest_dir, &self.root_dir);
        self.package_dir = absolutize(manifest_dir, &self.package_dir);
        if let Some(build) = self.build_dir.take() {
            self.build_dir = Some(absolutize(manifest_dir, &build));
        }

        let root = self.root_dir.clone();
        self.bindings_dir = absolutize(&root, &self.bindings_dir);
        self.include_dirs = self
            .include_dirs
            .iter()
            .map(|dir| absolutize(&root, dir))
            .collect();
        self.extension.interface = absolutize(&root, &self.extension.interface);
        if let Some(license) = self.license.take() {
            self.license = Some(absolutize(&root, &license));
        }
    }

    /// Check everything that must hold before any external process runs.
    pub fn validate(&self) -> Result<(), PreconditionFailure> {
        if let Some(ref expected) = self.expected_cwd {
            let actual = std::env::current_dir().unwrap_or_default();
            if &actual != expected {
                return Err(PreconditionFailure::WrongWorkingDirectory {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if !self.root_dir.is_dir() {
            return Err(PreconditionFailure::MissingRootDir {
                path: self.root_dir.clone(),
            });
        }

        if !self.extension.interface.is_file() {
            return Err(PreconditionFailure::MissingInterfaceFile {
                path: self.extension.interface.clone(),
            });
        }

        Ok(())
    }

    /// Intermediate build tree.
    pub fn build_dir(&self) -> PathBuf {
        self.build_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("build"))
    }

    /// Where compiled objects go; the build steps add a per-target
    /// subdirectory.
    pub fn obj_root(&self) -> PathBuf {
        self.build_dir().join("obj")
    }

    /// Where static libraries go.
    pub fn lib_dir(&self) -> PathBuf {
        self.build_dir().join("lib")
    }

    /// Where the interface compiler emits glue source files.
    pub fn glue_dir(&self) -> &Path {
        &self.bindings_dir
    }

    /// Per-process timeout, if configured.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
root_dir = "../.."
package_dir = "."
bindings_dir = "src/bindings/python"
include_dirs = ["include", "src"]
license = "LICENSE.txt"

[[libraries]]
name = "cstuff"
sources = ["ext/natpmp/*.c"]

[extension]
name = "netstack"
sources = ["src/*.cpp"]
interface = "src/bindings/python/netstack.i"
defines = ["NS_ENABLE_PYTHON=1"]

[tools]
swig = "/opt/swig/bin/swig"
"#;

    #[test]
    fn test_manifest_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg").join("pypi");
        fs::create_dir_all(&pkg).unwrap();
        let manifest = pkg.join(MANIFEST_NAME);
        fs::write(&manifest, MANIFEST).unwrap();

        let config = PipelineConfig::from_manifest(&manifest).unwrap();

        assert_eq!(config.root_dir, pkg.join("../.."));
        assert_eq!(config.package_dir, pkg);
        assert_eq!(config.libraries.len(), 1);
        assert_eq!(config.libraries[0].name, "cstuff");
        assert_eq!(config.extension.name, "netstack");
        assert!(config.bindings_dir.is_absolute());
        assert!(config.extension.interface.is_absolute());
        assert_eq!(config.tools.swig, Some(PathBuf::from("/opt/swig/bin/swig")));
        assert_eq!(config.glue_extension, "py");
    }

    #[test]
    fn test_extension_cflags_are_fixed_set() {
        let ext = ExtensionConfig {
            name: "netstack".to_string(),
            defines: vec!["NS_ENABLE_PYTHON=1".to_string()],
            std: default_std(),
            suppressed_warnings: default_suppressed_warnings(),
            ..Default::default()
        };

        let flags = ext.cflags();
        assert_eq!(flags[0], "-std=c++11");
        assert!(flags.contains(&"-DNS_ENABLE_PYTHON=1".to_string()));
        assert!(flags.contains(&"-Wno-macro-redefined".to_string()));
    }

    #[test]
    fn test_validate_missing_root() {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig {
            root_dir: tmp.path().join("nope"),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PreconditionFailure::MissingRootDir { .. }));
    }

    #[test]
    fn test_validate_wrong_cwd() {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig {
            root_dir: tmp.path().to_path_buf(),
            expected_cwd: Some(tmp.path().join("elsewhere")),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            PreconditionFailure::WrongWorkingDirectory { .. }
        ));
    }

    #[test]
    fn test_default_build_dir_under_root() {
        let config = PipelineConfig {
            root_dir: PathBuf::from("/repo"),
            ..Default::default()
        };

        assert_eq!(config.build_dir(), PathBuf::from("/repo/build"));
        assert_eq!(config.lib_dir(), PathBuf::from("/repo/build/lib"));
        assert_eq!(config.obj_root(), PathBuf::from("/repo/build/obj"));
    }
}
