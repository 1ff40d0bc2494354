//! Build machinery: toolchain commands, the failure classifier, and the
//! library/extension build steps.

pub mod classify;
pub mod extension;
pub mod library;
pub mod swig;
pub mod toolchain;

use std::path::Path;

use serde::Serialize;

use toolchain::CommandSpec;

pub use classify::{run_tool, BuildPhase};
pub use extension::{ExtensionBuildStep, ExtensionInput, ExtensionOutput};
pub use library::{LibraryBuildStep, LibraryOutput};
pub use swig::{GlueRequest, InterfaceCompiler};
pub use toolchain::{Language, Toolchain, ToolchainFamily};

/// One entry of `compile_commands.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CompileCommand {
    /// Directory the command runs in
    pub directory: String,

    /// Full argument vector, program first
    pub arguments: Vec<String>,

    /// The source file being compiled
    pub file: String,
}

impl CompileCommand {
    /// Record a compile invocation. Commands run from the pipeline's
    /// working directory with absolute paths throughout, so that is the
    /// directory recorded here.
    pub fn from_spec(spec: &CommandSpec, file: &Path) -> Self {
        let mut arguments = vec![spec.program.display().to_string()];
        arguments.extend(spec.args.iter().cloned());

        CompileCommand {
            directory: std::env::current_dir()
                .unwrap_or_default()
                .display()
                .to_string(),
            arguments,
            file: file.display().to_string(),
        }
    }
}
