//! The build failure classifier.
//!
//! Every external tool invocation made by the build steps funnels through
//! [`run_tool`], which translates the heterogeneous failure modes (missing
//! program, compiler diagnostics, linker errors, timeouts) into a single
//! [`BuildFailure`] with the original tool message preserved. Callers of
//! the build steps never observe a toolchain-specific error type.

use std::process::Output;

use crate::error::{BuildFailure, FailureKind};
use crate::util::process::{ExecError, ProcessBuilder};

/// Which part of the pipeline a tool invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Vendored-tree synchronization
    Sync,
    /// Interface compiler generating glue + wrapper
    InterfaceGen,
    /// Compiling a source file
    Compile,
    /// Archiving objects into a static library
    Archive,
    /// Linking the extension
    Link,
}

impl BuildPhase {
    /// The failure kind a non-zero exit in this phase maps to.
    ///
    /// Archiving failures count as link errors: the archive is a link
    /// input, and `ar` failures surface the same way linker failures do.
    /// Interface-compiler diagnostics are compile errors.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            BuildPhase::Sync => FailureKind::SubmoduleSync,
            BuildPhase::InterfaceGen | BuildPhase::Compile => FailureKind::CompileError,
            BuildPhase::Archive | BuildPhase::Link => FailureKind::LinkError,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            BuildPhase::Sync => "submodule synchronization failed",
            BuildPhase::InterfaceGen => "interface compilation failed",
            BuildPhase::Compile => "compilation failed",
            BuildPhase::Archive => "archiving failed",
            BuildPhase::Link => "linking failed",
        }
    }
}

/// Run a tool, classifying any failure.
///
/// `context` names the thing being processed (a source file, an archive,
/// the repository root) and ends up in the failure message.
pub fn run_tool(
    phase: BuildPhase,
    cmd: &ProcessBuilder,
    context: &str,
) -> Result<Output, BuildFailure> {
    tracing::debug!("running: {}", cmd.display_command());

    let output = cmd.exec().map_err(|e| classify_exec_error(phase, context, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };
        return Err(failure_from_exit(phase, context, &detail));
    }

    Ok(output)
}

/// Map a spawn/wait/timeout error onto a `BuildFailure`.
fn classify_exec_error(phase: BuildPhase, context: &str, err: ExecError) -> BuildFailure {
    if err.is_not_found() {
        return BuildFailure::toolchain_missing(err.to_string());
    }

    match err {
        ExecError::Timeout { .. } => {
            BuildFailure::new(phase.failure_kind(), format!("{} for {}", phase.describe(), context))
                .with_cause(err.to_string())
        }
        other => BuildFailure::toolchain_missing(other.to_string()),
    }
}

/// Map a filesystem error hit while preparing a build step (creating
/// object directories, missing inputs) onto the phase's failure kind.
pub fn io_failure(phase: BuildPhase, context: &str, err: std::io::Error) -> BuildFailure {
    BuildFailure::new(
        phase.failure_kind(),
        format!("{} for {}", phase.describe(), context),
    )
    .with_cause(err.to_string())
}

/// Map a non-zero exit onto a `BuildFailure`, preserving the tool output.
fn failure_from_exit(phase: BuildPhase, context: &str, detail: &str) -> BuildFailure {
    let message = if detail.trim().is_empty() {
        format!("{} for {}", phase.describe(), context)
    } else {
        format!("{} for {}\n{}", phase.describe(), context, detail.trim_end())
    };
    BuildFailure::new(phase.failure_kind(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_kinds() {
        assert_eq!(BuildPhase::Sync.failure_kind(), FailureKind::SubmoduleSync);
        assert_eq!(
            BuildPhase::InterfaceGen.failure_kind(),
            FailureKind::CompileError
        );
        assert_eq!(BuildPhase::Compile.failure_kind(), FailureKind::CompileError);
        assert_eq!(BuildPhase::Archive.failure_kind(), FailureKind::LinkError);
        assert_eq!(BuildPhase::Link.failure_kind(), FailureKind::LinkError);
    }

    #[test]
    fn test_exit_failure_preserves_tool_output() {
        let failure = failure_from_exit(
            BuildPhase::Compile,
            "src/app.cxx",
            "app.cxx:3:1: error: expected expression\n",
        );

        assert_eq!(failure.kind(), FailureKind::CompileError);
        assert!(failure.message().contains("src/app.cxx"));
        assert!(failure.message().contains("expected expression"));
    }

    #[test]
    fn test_exit_failure_without_output() {
        let failure = failure_from_exit(BuildPhase::Link, "_netstack.so", "");

        assert_eq!(failure.kind(), FailureKind::LinkError);
        assert_eq!(failure.message(), "linking failed for _netstack.so");
    }

    #[test]
    fn test_missing_tool_classified() {
        let cmd = ProcessBuilder::new("definitely-not-a-real-compiler-xyz");
        let failure = run_tool(BuildPhase::Compile, &cmd, "a.c").unwrap_err();

        assert_eq!(failure.kind(), FailureKind::ToolchainMissing);
        assert!(failure
            .message()
            .contains("definitely-not-a-real-compiler-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_classified_by_phase() {
        let cmd = ProcessBuilder::new("sh").args([
            "-c",
            "echo 'undefined symbol: zts_init' >&2; exit 1",
        ]);
        let failure = run_tool(BuildPhase::Link, &cmd, "_netstack.so").unwrap_err();

        assert_eq!(failure.kind(), FailureKind::LinkError);
        assert!(failure.message().contains("undefined symbol: zts_init"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_classified_by_phase() {
        use std::time::Duration;

        let cmd = ProcessBuilder::new("sh")
            .args(["-c", "sleep 5"])
            .timeout(Some(Duration::from_millis(100)));
        let failure = run_tool(BuildPhase::Sync, &cmd, "repo root").unwrap_err();

        assert_eq!(failure.kind(), FailureKind::SubmoduleSync);
        assert!(failure.full_message().contains("timed out"));
    }
}
