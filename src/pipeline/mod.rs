//! The build pipeline.
//!
//! One fixed sequence: synchronize vendored trees, build static libraries,
//! build the extension module, synchronize glue files, assemble the
//! package. Stage ordering comes from the declared stage graph; the
//! pipeline never attempts a later stage once an earlier one has failed,
//! and never retries.

pub mod stage;

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::builder::swig::InterfaceCompiler;
use crate::builder::toolchain::Toolchain;
use crate::builder::{CompileCommand, ExtensionBuildStep, ExtensionInput, LibraryBuildStep};
use crate::config::PipelineConfig;
use crate::core::{Artifact, BuildTarget, GlueFile, SourceSetResolver, TargetKind};
use crate::error::BuildFailure;
use crate::sources::SubmoduleInitializer;
use crate::sync::GlueFileSynchronizer;
use crate::util::fs::{copy_file, ensure_dir};

pub use stage::{PipelineState, Stage, StageGraph};

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct BuildReport {
    /// Artifacts in the build tree (static libraries, then the extension)
    pub artifacts: Vec<Artifact>,

    /// Glue files synchronized into the package directory
    pub glue_files: Vec<GlueFile>,

    /// Files staged into the package directory (artifacts, license)
    pub packaged_files: Vec<PathBuf>,

    /// Path of the emitted compile_commands.json, if requested
    pub compile_commands: Option<PathBuf>,
}

/// Everything accumulated while the stages run.
#[derive(Default)]
struct RunState {
    toolchain: Option<Toolchain>,
    targets: Vec<BuildTarget>,
    built: HashSet<String>,
    artifacts: Vec<Artifact>,
    glue_files: Vec<GlueFile>,
    compile_commands: Vec<CompileCommand>,
}

/// The fixed build pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    graph: StageGraph,
    state: PipelineState,
    submodules: SubmoduleInitializer,
    progress: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let submodules = SubmoduleInitializer::new(&config.tools, &config.root_dir)
            .with_timeout(config.tool_timeout());

        Pipeline {
            submodules,
            graph: StageGraph::new(),
            state: PipelineState::Init,
            progress: false,
            config,
        }
    }

    /// Show progress bars while compiling.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Describe what a run would do, without invoking any external tool.
    pub fn plan(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();

        for stage in self.graph.execution_order()? {
            let detail = match stage {
                Stage::Submodules => format!(
                    "synchronize vendored trees under {}",
                    self.config.root_dir.display()
                ),
                Stage::Libraries => {
                    let names: Vec<&str> = self
                        .config
                        .libraries
                        .iter()
                        .map(|l| l.name.as_str())
                        .collect();
                    format!("build static libraries: {}", names.join(", "))
                }
                Stage::Extension => format!(
                    "generate glue from {} and build extension `{}`",
                    self.config.extension.interface.display(),
                    self.config.extension.name
                ),
                Stage::GlueSync => format!(
                    "copy *.{} from {} into {}",
                    self.config.glue_extension,
                    self.config.glue_dir().display(),
                    self.config.package_dir.display()
                ),
                Stage::Package => format!(
                    "stage artifacts into {}",
                    self.config.package_dir.display()
                ),
            };
            lines.push(format!("{}: {}", stage, detail));
        }

        Ok(lines)
    }

    /// Run the pipeline to completion.
    ///
    /// On a build failure the pipeline enters `Failed` and the failure is
    /// returned; no later stage is attempted.
    pub fn run(&mut self) -> Result<BuildReport> {
        // States are never revisited; a fresh run needs a fresh pipeline.
        if self.state != PipelineState::Init {
            bail!("pipeline already ran (state: {})", self.state);
        }

        self.config.validate()?;

        let order = self.graph.execution_order()?;
        let mut cx = RunState::default();

        for stage in order {
            tracing::debug!("entering stage `{}`", stage);

            if let Err(err) = self.run_stage(stage, &mut cx) {
                if let Some(failure) = err.downcast_ref::<BuildFailure>() {
                    self.state = PipelineState::Failed(failure.clone());
                    tracing::error!("stage `{}` failed: {}", stage, failure.message());
                }
                return Err(err);
            }
        }

        let compile_commands = self.emit_compile_commands(&cx)?;
        let packaged_files = self.packaged_files(&cx);

        Ok(BuildReport {
            artifacts: cx.artifacts,
            glue_files: cx.glue_files,
            packaged_files,
            compile_commands,
        })
    }

    fn run_stage(&mut self, stage: Stage, cx: &mut RunState) -> Result<()> {
        match stage {
            Stage::Submodules => {
                self.submodules.ensure_synced()?;
                self.advance(PipelineState::SubmodulesReady);
            }
            Stage::Libraries => self.run_libraries(cx)?,
            Stage::Extension => self.run_extension(cx)?,
            Stage::GlueSync => {
                let sync = GlueFileSynchronizer::new(
                    self.config.glue_dir(),
                    &self.config.package_dir,
                    &self.config.glue_extension,
                );
                cx.glue_files = sync.sync()?;
                self.advance(PipelineState::GlueSynced);
            }
            Stage::Package => {
                self.run_package(cx)?;
                self.advance(PipelineState::PackagesBuilt);
            }
        }

        Ok(())
    }

    fn run_libraries(&mut self, cx: &mut RunState) -> Result<()> {
        let resolver = SourceSetResolver::new(
            self.config.root_dir.clone(),
            self.config.include_dirs.clone(),
        );

        // Resolution failures are precondition failures and must surface
        // before any compiler is even looked up.
        let mut sets = Vec::new();
        for lib in &self.config.libraries {
            let set = resolver.resolve(&lib.name, &lib.sources, &lib.cflags)?;
            cx.targets.push(BuildTarget::new(
                &lib.name,
                TargetKind::StaticLibrary,
                vec![set.clone()],
            ));
            sets.push(set);
        }

        let toolchain = Toolchain::detect(&self.config.tools)?;

        let step = LibraryBuildStep::new(&toolchain, self.config.obj_root(), self.config.lib_dir())
        .with_timeout(self.config.tool_timeout())
        .with_progress(self.progress);

        let output = step.build(&sets)?;

        for artifact in &output.artifacts {
            cx.built.insert(artifact.target.clone());
        }
        cx.artifacts.extend(output.artifacts);
        cx.compile_commands.extend(output.compile_commands);
        cx.toolchain = Some(toolchain);

        self.advance(PipelineState::LibrariesBuilt);
        Ok(())
    }

    fn run_extension(&mut self, cx: &mut RunState) -> Result<()> {
        let ext = self.config.extension.clone();

        let resolver = SourceSetResolver::new(
            self.config.root_dir.clone(),
            self.config.include_dirs.clone(),
        );
        let sources = resolver.resolve(&ext.name, &ext.sources, &ext.cflags())?;

        let deps: Vec<String> = self
            .config
            .libraries
            .iter()
            .map(|l| l.name.clone())
            .collect();
        let target = BuildTarget::new(&ext.name, TargetKind::Extension, vec![sources.clone()])
            .with_dependencies(deps);

        for dep in &target.depends_on {
            if !cx.built.contains(dep) {
                bail!(
                    "internal error: extension scheduled before library `{}` completed",
                    dep
                );
            }
        }

        let toolchain = cx
            .toolchain
            .clone()
            .context("internal error: extension scheduled before toolchain detection")?;

        let interface_compiler = InterfaceCompiler::locate(&self.config.tools)?
            .with_timeout(self.config.tool_timeout());

        let step =
            ExtensionBuildStep::new(&toolchain, &interface_compiler, self.config.obj_root())
        .with_timeout(self.config.tool_timeout())
        .with_progress(self.progress);

        let output = step.build(&ExtensionInput {
            name: ext.name.clone(),
            sources,
            interface: ext.interface.clone(),
            swig_args: ext.swig_args.clone(),
            glue_dir: self.config.glue_dir().to_path_buf(),
            link_libs: target.depends_on.clone(),
            lib_dir: self.config.lib_dir(),
            ldflags: ext.ldflags.clone(),
            output_dir: self.config.build_dir(),
        })?;

        cx.built.insert(ext.name.clone());
        cx.targets.push(target);
        cx.artifacts.push(output.artifact);
        cx.compile_commands.extend(output.compile_commands);

        self.advance(PipelineState::ExtensionBuilt);
        Ok(())
    }

    /// Stage the built artifacts and the license file into the package
    /// directory.
    fn run_package(&mut self, cx: &mut RunState) -> Result<()> {
        ensure_dir(&self.config.package_dir)?;

        for artifact in &cx.artifacts {
            let name = artifact
                .path
                .file_name()
                .context("artifact has no filename")?;
            copy_file(&artifact.path, &self.config.package_dir.join(name))?;
        }

        if let Some(ref license) = self.config.license {
            copy_file(license, &self.config.package_dir.join("LICENSE"))?;
        }

        tracing::info!(
            "Package assembled in {}",
            self.config.package_dir.display()
        );

        Ok(())
    }

    fn packaged_files(&self, cx: &RunState) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = cx
            .artifacts
            .iter()
            .filter_map(|a| a.path.file_name().map(|n| self.config.package_dir.join(n)))
            .collect();

        if self.config.license.is_some() {
            files.push(self.config.package_dir.join("LICENSE"));
        }

        files
    }

    fn emit_compile_commands(&self, cx: &RunState) -> Result<Option<PathBuf>> {
        if !self.config.emit_compile_commands {
            return Ok(None);
        }

        let path = self.config.build_dir().join("compile_commands.json");
        let json = serde_json::to_string_pretty(&cx.compile_commands)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(Some(path))
    }

    /// Move to the next state. States only ever advance forward.
    fn advance(&mut self, next: PipelineState) {
        debug_assert_eq!(
            next.ordinal(),
            self.state.ordinal().map(|o| o + 1),
            "pipeline state must advance strictly forward ({} -> {})",
            self.state,
            next
        );
        tracing::debug!("pipeline state: {} -> {}", self.state, next);
        self.state = next;
    }
}
