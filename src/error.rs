//! Error types crossing the pipeline boundary.
//!
//! - [`PreconditionFailure`] is raised before any external process runs
//!   (empty source set, wrong working directory).
//! - [`BuildFailure`] is the single error type produced once external tools
//!   are involved. The classifier in `builder::classify` guarantees no
//!   toolchain-specific error escapes in any other shape.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A violated precondition, detected before any external process runs.
#[derive(Debug, Error, Diagnostic)]
pub enum PreconditionFailure {
    /// A source pattern set expanded to zero files.
    #[error("no sources found for `{library}` (patterns: {patterns})")]
    #[diagnostic(
        code(slipway::empty_source_set),
        help("check that vendored submodules are initialized and the source patterns in slipway.toml match files on disk")
    )]
    EmptySourceSet { library: String, patterns: String },

    /// The pipeline was invoked from the wrong directory.
    #[error("slipway must be invoked from `{}`, not `{}`", expected.display(), actual.display())]
    #[diagnostic(
        code(slipway::wrong_working_directory),
        help("cd into the packaging directory and re-run")
    )]
    WrongWorkingDirectory { expected: PathBuf, actual: PathBuf },

    /// The interface-description file does not exist.
    #[error("interface description file not found: {}", path.display())]
    #[diagnostic(code(slipway::missing_interface))]
    MissingInterfaceFile { path: PathBuf },

    /// The configured root directory does not exist.
    #[error("root directory not found: {}", path.display())]
    #[diagnostic(code(slipway::missing_root))]
    MissingRootDir { path: PathBuf },
}

/// What went wrong, at the granularity callers can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A required external tool could not be found or spawned.
    ToolchainMissing,
    /// The compiler (or interface compiler) reported a diagnostic failure.
    CompileError,
    /// The archiver or linker failed.
    LinkError,
    /// The host platform cannot run this pipeline.
    PlatformUnsupported,
    /// The vendored-tree synchronization command failed.
    SubmoduleSync,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ToolchainMissing => "toolchain missing",
            FailureKind::CompileError => "compile error",
            FailureKind::LinkError => "link error",
            FailureKind::PlatformUnsupported => "platform unsupported",
            FailureKind::SubmoduleSync => "submodule sync failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build failure, as produced by the failure classifier.
///
/// Immutable once constructed. The underlying toolchain message is carried
/// in `message`/`cause` as text, which keeps the value cheap to clone into
/// the pipeline's terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(slipway::build_failure))]
pub struct BuildFailure {
    kind: FailureKind,
    message: String,
    cause: Option<String>,
    #[help]
    help: Option<String>,
}

impl BuildFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        BuildFailure {
            kind,
            message: message.into(),
            cause: None,
            help: None,
        }
    }

    /// Attach the underlying tool output or error text.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        if !cause.is_empty() {
            self.cause = Some(cause);
        }
        self
    }

    /// Attach a suggestion for fixing the failure.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Message plus cause, for log output.
    pub fn full_message(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}\n{}", self.message, cause),
            None => self.message.clone(),
        }
    }

    pub fn toolchain_missing(message: impl Into<String>) -> Self {
        BuildFailure::new(FailureKind::ToolchainMissing, message).with_help(
            "install the tool or point slipway at it via [tools] in slipway.toml \
             or the CC/CXX/AR environment variables",
        )
    }

    pub fn platform_unsupported(message: impl Into<String>) -> Self {
        BuildFailure::new(FailureKind::PlatformUnsupported, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_names_library() {
        let err = PreconditionFailure::EmptySourceSet {
            library: "netcore".to_string(),
            patterns: "ext/netcore/*.c".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("netcore"));
        assert!(text.contains("ext/netcore/*.c"));
    }

    #[test]
    fn test_build_failure_preserves_cause() {
        let failure = BuildFailure::new(FailureKind::CompileError, "compilation failed for a.c")
            .with_cause("a.c:3:1: error: expected expression");

        assert_eq!(failure.kind(), FailureKind::CompileError);
        assert!(failure.full_message().contains("expected expression"));
    }

    #[test]
    fn test_build_failure_empty_cause_dropped() {
        let failure = BuildFailure::new(FailureKind::LinkError, "linking failed").with_cause("");
        assert!(failure.cause().is_none());
        assert_eq!(failure.full_message(), "linking failed");
    }

    #[test]
    fn test_platform_unsupported_preserves_message() {
        let failure =
            BuildFailure::platform_unsupported("only GCC/Clang-style toolchains are supported");

        assert_eq!(failure.kind(), FailureKind::PlatformUnsupported);
        assert!(failure.message().contains("GCC/Clang"));
    }

    #[test]
    fn test_toolchain_missing_carries_help() {
        let failure = BuildFailure::toolchain_missing("no C compiler found");

        assert_eq!(failure.kind(), FailureKind::ToolchainMissing);
        let rendered = format!("{:?}", failure);
        assert!(rendered.contains("slipway.toml"));
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::SubmoduleSync.to_string(), "submodule sync failed");
        assert_eq!(FailureKind::ToolchainMissing.to_string(), "toolchain missing");
    }
}
