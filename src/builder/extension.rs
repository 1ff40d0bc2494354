//! Extension module build step.
//!
//! Runs the interface compiler, compiles the application sources together
//! with the generated C++ wrapper, and links everything against the static
//! libraries into one loadable extension module. Generating the Python
//! glue file is a declared output of this step: the glue synchronizer runs
//! strictly after it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::builder::classify::{io_failure, run_tool, BuildPhase};
use crate::builder::library::{object_path, progress_bar};
use crate::builder::swig::{GlueRequest, InterfaceCompiler};
use crate::builder::toolchain::{CompileInput, Language, LinkInput, Toolchain};
use crate::builder::CompileCommand;
use crate::core::{Artifact, SourceSet, TargetKind};
use crate::error::BuildFailure;
use crate::util::process::ProcessBuilder;

/// Everything the extension step needs, resolved by the pipeline.
#[derive(Debug, Clone)]
pub struct ExtensionInput {
    /// Module name; the artifact is `_<name>.so` (`.pyd` on Windows)
    pub name: String,

    /// C/C++ application sources
    pub sources: SourceSet,

    /// Interface-description file
    pub interface: PathBuf,

    /// Extra interface-compiler arguments
    pub swig_args: Vec<String>,

    /// Where the generated Python glue goes
    pub glue_dir: PathBuf,

    /// Names of static libraries to link against
    pub link_libs: Vec<String>,

    /// Directory holding those static libraries
    pub lib_dir: PathBuf,

    /// Extra linker flags
    pub ldflags: Vec<String>,

    /// Where the linked extension goes
    pub output_dir: PathBuf,
}

/// Output of the extension step.
#[derive(Debug)]
pub struct ExtensionOutput {
    pub artifact: Artifact,

    /// The generated C++ wrapper that was compiled in
    pub wrapper: PathBuf,

    pub compile_commands: Vec<CompileCommand>,
}

/// Builds the loadable extension module.
pub struct ExtensionBuildStep<'a> {
    toolchain: &'a Toolchain,
    interface_compiler: &'a InterfaceCompiler,
    obj_root: PathBuf,
    timeout: Option<Duration>,
    progress: bool,
}

impl<'a> ExtensionBuildStep<'a> {
    pub fn new(
        toolchain: &'a Toolchain,
        interface_compiler: &'a InterfaceCompiler,
        obj_root: PathBuf,
    ) -> Self {
        ExtensionBuildStep {
            toolchain,
            interface_compiler,
            obj_root,
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

    pub fn build(&self, input: &ExtensionInput) -> Result<ExtensionOutput, BuildFailure> {
        let obj_dir = self.obj_root.join(&input.name);
        for dir in [&obj_dir, &input.glue_dir, &input.output_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| io_failure(BuildPhase::Compile, &input.name, e))?;
        }

        // 1. Interface compiler: glue module + C++ wrapper.
        let stem = input
            .interface
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&input.name);
        let wrapper = obj_dir.join(format!("{}_wrap.cxx", stem));

        self.interface_compiler.generate(&GlueRequest {
            interface: input.interface.clone(),
            include_dirs: input.sources.include_dirs().to_vec(),
            extra_args: input.swig_args.clone(),
            glue_dir: input.glue_dir.clone(),
            wrapper: wrapper.clone(),
        })?;

        // 2. Compile application sources plus the wrapper.
        let sources: Vec<PathBuf> = input
            .sources
            .files()
            .iter()
            // A broad pattern may have matched the interface file itself;
            // it is consumed by the interface compiler, not the C++ one.
            .filter(|p| p.extension().and_then(|e| e.to_str()) != Some("i"))
            .cloned()
            .chain(std::iter::once(wrapper.clone()))
            .collect();

        tracing::info!(
            "Compiling {} file(s) for extension `{}`",
            sources.len(),
            input.name
        );

        let bar = progress_bar(self.progress, sources.len());
        let mut seen = HashSet::new();
        let mut objects = Vec::new();
        let mut compile_commands = Vec::new();

        for source in &sources {
            let object =
                object_path(&mut seen, &obj_dir, source, self.toolchain.object_extension());

            let compile = CompileInput {
                source: source.clone(),
                output: object.clone(),
                include_dirs: input.sources.include_dirs().to_vec(),
                cflags: input.sources.cflags().to_vec(),
                lang: Language::from_path(source),
            };

            let spec = self.toolchain.compile_command(&compile);
            compile_commands.push(CompileCommand::from_spec(&spec, source));

            let cmd = ProcessBuilder::new(&spec.program)
                .args(spec.args.iter())
                .timeout(self.timeout);

            run_tool(BuildPhase::Compile, &cmd, &source.display().to_string())?;

            objects.push(object);
            if let Some(ref bar) = bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        // 3. Link against the static libraries.
        let output = input
            .output_dir
            .join(TargetKind::Extension.output_filename(&input.name, self.toolchain.os()));

        let spec = self.toolchain.link_extension_command(&LinkInput {
            objects,
            output: output.clone(),
            lib_dir: input.lib_dir.clone(),
            libs: input.link_libs.clone(),
            ldflags: input.ldflags.clone(),
        });

        tracing::info!("Linking extension module {}", output.display());

        let cmd = ProcessBuilder::new(&spec.program)
            .args(spec.args.iter())
            .timeout(self.timeout);

        run_tool(BuildPhase::Link, &cmd, &output.display().to_string())?;

        Ok(ExtensionOutput {
            artifact: Artifact {
                path: output,
                target: input.name.clone(),
                kind: TargetKind::Extension,
            },
            wrapper,
            compile_commands,
        })
    }
}
