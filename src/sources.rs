//! Vendored source tree synchronization.
//!
//! The vendored trees (TCP/IP stack, NAT-traversal libraries, the engine)
//! are nested, independently-versioned repositories. Before any source
//! pattern is expanded they must exist on disk, so the initializer runs the
//! version-control client's "synchronize nested repositories" operation -
//! and checks its exit status: proceeding against a partially-populated
//! tree would silently build stale or incomplete artifacts.

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::classify::{run_tool, BuildPhase};
use crate::config::ToolConfig;
use crate::error::BuildFailure;
use crate::util::process::ProcessBuilder;

/// Ensures vendored source trees are present, exactly once per pipeline
/// invocation.
#[derive(Debug)]
pub struct SubmoduleInitializer {
    git: PathBuf,
    root: PathBuf,
    timeout: Option<Duration>,
    synced: bool,
}

impl SubmoduleInitializer {
    pub fn new(tools: &ToolConfig, root: impl Into<PathBuf>) -> Self {
        SubmoduleInitializer {
            git: tools.git.clone().unwrap_or_else(|| PathBuf::from("git")),
            root: root.into(),
            timeout: None,
            synced: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Synchronize the vendored trees. Subsequent calls within the same
    /// pipeline invocation are no-ops.
    pub fn ensure_synced(&mut self) -> Result<(), BuildFailure> {
        if self.synced {
            return Ok(());
        }

        tracing::info!("Synchronizing vendored source trees");

        let cmd = ProcessBuilder::new(&self.git)
            .args(["submodule", "update", "--init", "--recursive"])
            .cwd(&self.root)
            .timeout(self.timeout);

        run_tool(BuildPhase::Sync, &cmd, &self.root.display().to_string())?;

        self.synced = true;
        Ok(())
    }

    /// Whether synchronization has already run.
    pub fn is_synced(&self) -> bool {
        self.synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn stub_git(dir: &Path, script_body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("git");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("git.log");
        let git = stub_git(
            tmp.path(),
            &format!("echo \"$@\" >> {}\nexit 0", log.display()),
        );

        let tools = ToolConfig {
            git: Some(git),
            ..Default::default()
        };
        let mut init = SubmoduleInitializer::new(&tools, tmp.path());

        init.ensure_synced().unwrap();
        init.ensure_synced().unwrap();

        let recorded = fs::read_to_string(&log).unwrap();
        assert_eq!(recorded.lines().count(), 1);
        assert!(recorded.contains("submodule update --init --recursive"));
        assert!(init.is_synced());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_aborts() {
        let tmp = TempDir::new().unwrap();
        let git = stub_git(
            tmp.path(),
            "echo 'fatal: could not fetch submodule' >&2\nexit 1",
        );

        let tools = ToolConfig {
            git: Some(git),
            ..Default::default()
        };
        let mut init = SubmoduleInitializer::new(&tools, tmp.path());

        let failure = init.ensure_synced().unwrap_err();
        assert_eq!(failure.kind(), FailureKind::SubmoduleSync);
        assert!(failure.message().contains("could not fetch submodule"));
        assert!(!init.is_synced());
    }

    #[test]
    fn test_missing_client_aborts() {
        let tmp = TempDir::new().unwrap();
        let tools = ToolConfig {
            git: Some(tmp.path().join("no-such-git")),
            ..Default::default()
        };
        let mut init = SubmoduleInitializer::new(&tools, tmp.path());

        let failure = init.ensure_synced().unwrap_err();
        assert_eq!(failure.kind(), FailureKind::ToolchainMissing);
    }
}
