//! Static library build step.
//!
//! Compiles each named source set with the C compiler and archives the
//! objects into one static library per set. No interface-compiler step is
//! involved here; the archives exist solely as link inputs for the
//! extension step.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::classify::{io_failure, run_tool, BuildPhase};
use crate::builder::toolchain::{ArchiveInput, CompileInput, Language, Toolchain};
use crate::builder::CompileCommand;
use crate::core::{Artifact, SourceSet, TargetKind};
use crate::error::BuildFailure;
use crate::util::process::ProcessBuilder;

/// Output of building the static libraries.
#[derive(Debug)]
pub struct LibraryOutput {
    pub artifacts: Vec<Artifact>,
    pub compile_commands: Vec<CompileCommand>,
}

/// Builds static libraries from pure-C source sets.
pub struct LibraryBuildStep<'a> {
    toolchain: &'a Toolchain,
    obj_root: PathBuf,
    lib_dir: PathBuf,
    timeout: Option<Duration>,
    progress: bool,
}

impl<'a> LibraryBuildStep<'a> {
    pub fn new(toolchain: &'a Toolchain, obj_root: PathBuf, lib_dir: PathBuf) -> Self {
        LibraryBuildStep {
            toolchain,
            obj_root,
            lib_dir,
            timeout: None,
            progress: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build every source set into a static library, in order.
    pub fn build(&self, sets: &[SourceSet]) -> Result<LibraryOutput, BuildFailure> {
        let mut artifacts = Vec::new();
        let mut compile_commands = Vec::new();

        for set in sets {
            let artifact = self.build_one(set, &mut compile_commands)?;
            artifacts.push(artifact);
        }

        Ok(LibraryOutput {
            artifacts,
            compile_commands,
        })
    }

    fn build_one(
        &self,
        set: &SourceSet,
        compile_commands: &mut Vec<CompileCommand>,
    ) -> Result<Artifact, BuildFailure> {
        let obj_dir = self.obj_root.join(set.name());
        std::fs::create_dir_all(&obj_dir)
            .map_err(|e| io_failure(BuildPhase::Compile, set.name(), e))?;
        std::fs::create_dir_all(&self.lib_dir)
            .map_err(|e| io_failure(BuildPhase::Archive, set.name(), e))?;

        tracing::info!(
            "Compiling {} file(s) for library `{}`",
            set.len(),
            set.name()
        );

        let bar = progress_bar(self.progress, set.len());
        let mut seen = HashSet::new();
        let mut objects = Vec::new();

        for source in set.files() {
            let object = object_path(&mut seen, &obj_dir, source, self.toolchain.object_extension());

            let input = CompileInput {
                source: source.clone(),
                output: object.clone(),
                include_dirs: set.include_dirs().to_vec(),
                cflags: set.cflags().to_vec(),
                lang: Language::C,
            };

            let spec = self.toolchain.compile_command(&input);
            compile_commands.push(CompileCommand::from_spec(&spec, source));

            let cmd = ProcessBuilder::new(&spec.program)
                .args(spec.args.iter())
                .timeout(self.timeout);

            run_tool(
                BuildPhase::Compile,
                &cmd,
                &source.display().to_string(),
            )?;

            objects.push(object);
            if let Some(ref bar) = bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        let output = self
            .lib_dir
            .join(TargetKind::StaticLibrary.output_filename(set.name(), self.toolchain.os()));

        let spec = self.toolchain.archive_command(&ArchiveInput {
            objects,
            output: output.clone(),
        });

        tracing::debug!("Creating static library {}", output.display());

        let cmd = ProcessBuilder::new(&spec.program)
            .args(spec.args.iter())
            .timeout(self.timeout);

        run_tool(BuildPhase::Archive, &cmd, &output.display().to_string())?;

        Ok(Artifact {
            path: output,
            target: set.name().to_string(),
            kind: TargetKind::StaticLibrary,
        })
    }
}

/// Pick a unique object path for `source` under `obj_dir`.
///
/// Source lists are sorted, so the suffixes handed out on stem collisions
/// (vendored trees reuse names like `init.c`) are stable across runs.
pub(crate) fn object_path(
    seen: &mut HashSet<String>,
    obj_dir: &Path,
    source: &Path,
    ext: &str,
) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("object");

    let mut name = stem.to_string();
    let mut counter = 1;
    while !seen.insert(name.clone()) {
        name = format!("{}_{}", stem, counter);
        counter += 1;
    }

    obj_dir.join(format!("{}.{}", name, ext))
}

pub(crate) fn progress_bar(enabled: bool, len: usize) -> Option<ProgressBar> {
    if !enabled || len < 2 {
        return None;
    }

    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    Some(bar)
}
