//! Interface compiler invocation.
//!
//! The interface compiler consumes an `.i` interface-description file and
//! emits two things: a Python glue module into the glue directory, and a
//! C++ wrapper source that gets compiled into the extension.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::builder::classify::{run_tool, BuildPhase};
use crate::config::ToolConfig;
use crate::error::BuildFailure;
use crate::util::process::{find_executable, ProcessBuilder};

/// A located interface compiler.
#[derive(Debug, Clone)]
pub struct InterfaceCompiler {
    program: PathBuf,
    timeout: Option<Duration>,
}

/// One glue-generation request.
#[derive(Debug, Clone)]
pub struct GlueRequest {
    /// The `.i` interface-description file
    pub interface: PathBuf,

    /// Include directories passed with `-I`
    pub include_dirs: Vec<PathBuf>,

    /// Extra arguments from the manifest
    pub extra_args: Vec<String>,

    /// Where the generated Python glue goes (`-outdir`)
    pub glue_dir: PathBuf,

    /// Where the generated C++ wrapper goes (`-o`)
    pub wrapper: PathBuf,
}

impl InterfaceCompiler {
    /// Locate the interface compiler: manifest override first, then PATH.
    pub fn locate(tools: &ToolConfig) -> Result<Self, BuildFailure> {
        let program = match &tools.swig {
            Some(path) => path.clone(),
            None => find_executable("swig").ok_or_else(|| {
                BuildFailure::toolchain_missing(
                    "interface compiler (swig) not found in PATH",
                )
            })?,
        };

        Ok(InterfaceCompiler {
            program,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the interface compiler, returning the wrapper path.
    pub fn generate(&self, req: &GlueRequest) -> Result<PathBuf, BuildFailure> {
        let mut cmd = ProcessBuilder::new(&self.program)
            .arg("-python")
            .arg("-c++");

        for dir in &req.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        cmd = cmd.args(req.extra_args.iter());
        cmd = cmd.arg("-outdir").arg(&req.glue_dir);
        cmd = cmd.arg("-o").arg(&req.wrapper);
        cmd = cmd.arg(&req.interface);
        cmd = cmd.timeout(self.timeout);

        tracing::info!(
            "Generating binding glue from {}",
            req.interface.display()
        );

        run_tool(
            BuildPhase::InterfaceGen,
            &cmd,
            &req.interface.display().to_string(),
        )?;

        Ok(req.wrapper.clone())
    }
}
