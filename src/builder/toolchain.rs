//! Toolchain discovery and command construction.
//!
//! Discovery priority, per tool: `[tools]` override in the manifest, then
//! the `CC`/`CXX`/`AR` environment variables, then a PATH search. Only
//! GCC/Clang-style drivers are supported; a host that offers nothing but
//! MSVC is reported as an unsupported platform rather than a missing
//! toolchain.

use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::error::BuildFailure;
use crate::util::process::find_executable;

/// Source language, selecting the compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cxx,
}

impl Language {
    /// Classify a source file by extension. Anything that is not a known C
    /// extension is compiled as C++, which matches how the wrapper and
    /// application sources (`.cxx`, `.cpp`, `.cc`) arrive.
    pub fn from_path(path: &Path) -> Language {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") => Language::C,
            _ => Language::Cxx,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
        }
    }
}

/// A command to execute: program plus arguments.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }
}

/// Input for a compile step.
#[derive(Debug, Clone)]
pub struct CompileInput {
    pub source: PathBuf,
    pub output: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub cflags: Vec<String>,
    pub lang: Language,
}

/// Input for an archive step (creating a static library).
#[derive(Debug, Clone)]
pub struct ArchiveInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Input for linking the loadable extension.
#[derive(Debug, Clone)]
pub struct LinkInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub lib_dir: PathBuf,
    /// Libraries to link, without prefix/suffix
    pub libs: Vec<String>,
    pub ldflags: Vec<String>,
}

/// Compiler family, for family-specific link behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFamily {
    Gcc,
    Clang,
}

/// A GCC/Clang-style toolchain.
#[derive(Debug, Clone)]
pub struct Toolchain {
    cc: PathBuf,
    cxx: PathBuf,
    ar: PathBuf,
    family: ToolchainFamily,
    os: String,
}

impl Toolchain {
    pub fn new(cc: PathBuf, cxx: PathBuf, ar: PathBuf, family: ToolchainFamily) -> Self {
        Toolchain {
            cc,
            cxx,
            ar,
            family,
            os: std::env::consts::OS.to_string(),
        }
    }

    /// Override the target OS (used by tests; defaults to the host).
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Discover the toolchain.
    pub fn detect(tools: &ToolConfig) -> Result<Toolchain, BuildFailure> {
        let cc = match resolve_tool(&tools.cc, "CC", &["cc", "gcc", "clang"]) {
            Some(cc) => cc,
            None => {
                if find_executable("cl").is_some() {
                    return Err(BuildFailure::platform_unsupported(
                        "only GCC/Clang-style toolchains are supported; found MSVC cl.exe",
                    ));
                }
                return Err(BuildFailure::toolchain_missing(
                    "no C compiler found (tried cc, gcc, clang)",
                ));
            }
        };

        let cxx = resolve_tool(&tools.cxx, "CXX", &["c++", "g++", "clang++"])
            .unwrap_or_else(|| infer_cxx(&cc));

        let ar = resolve_tool(&tools.ar, "AR", &["ar", "llvm-ar"])
            .ok_or_else(|| BuildFailure::toolchain_missing("archiver (ar) not found"))?;

        let family = family_of(&cc);

        tracing::debug!(
            "toolchain: cc={}, cxx={}, ar={} ({:?})",
            cc.display(),
            cxx.display(),
            ar.display(),
            family
        );

        Ok(Toolchain::new(cc, cxx, ar, family))
    }

    pub fn cc(&self) -> &Path {
        &self.cc
    }

    pub fn cxx(&self) -> &Path {
        &self.cxx
    }

    pub fn family(&self) -> ToolchainFamily {
        self.family
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    /// Generate a compile command.
    pub fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let compiler = match input.lang {
            Language::C => &self.cc,
            Language::Cxx => &self.cxx,
        };

        let mut cmd = CommandSpec::new(compiler);
        cmd = cmd.arg("-c");
        // Objects end up in a shared extension, so all code is
        // position-independent.
        cmd = cmd.arg("-fPIC");

        for dir in &input.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        cmd = cmd.args(input.cflags.iter().cloned());

        cmd = cmd.arg(input.source.display().to_string());
        cmd = cmd.arg("-o");
        cmd = cmd.arg(input.output.display().to_string());

        cmd
    }

    /// Generate an archive command (create static library).
    pub fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.ar);
        cmd = cmd.arg("rcs");
        cmd = cmd.arg(input.output.display().to_string());

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        cmd
    }

    /// Generate the link command for the loadable extension module.
    ///
    /// Always linked with the C++ driver: the wrapper is C++.
    pub fn link_extension_command(&self, input: &LinkInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cxx);
        cmd = cmd.arg("-shared");

        // Python resolves interpreter symbols at import time on macOS.
        if self.os == "macos" {
            cmd = cmd.arg("-undefined").arg("dynamic_lookup");
        }

        cmd = cmd.arg("-o");
        cmd = cmd.arg(input.output.display().to_string());

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        cmd = cmd.arg(format!("-L{}", input.lib_dir.display()));
        for lib in &input.libs {
            cmd = cmd.arg(format!("-l{}", lib));
        }

        cmd = cmd.args(input.ldflags.iter().cloned());

        cmd
    }

    /// Get the object file extension.
    pub fn object_extension(&self) -> &'static str {
        "o"
    }
}

fn resolve_tool(configured: &Option<PathBuf>, env_var: &str, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.clone());
    }

    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Some(PathBuf::from(value));
        }
    }

    candidates.iter().find_map(|name| find_executable(name))
}

/// Infer the C++ compiler path from the C compiler path.
///
/// gcc -> g++, clang -> clang++, cc -> c++.
fn infer_cxx(cc: &Path) -> PathBuf {
    let cc_str = cc.to_string_lossy();

    if cc_str.ends_with("gcc") {
        return PathBuf::from(format!("{}++", &cc_str[..cc_str.len() - 2]));
    }

    if cc_str.ends_with("clang") {
        return PathBuf::from(format!("{}++", cc_str));
    }

    let is_standalone_cc = cc_str == "cc"
        || cc_str.ends_with("/cc")
        || cc_str.ends_with("\\cc")
        || cc_str.ends_with("-cc");

    if is_standalone_cc {
        return PathBuf::from(format!("{}++", &cc_str[..cc_str.len() - 1]));
    }

    PathBuf::from(format!("{}++", cc_str))
}

fn family_of(cc: &Path) -> ToolchainFamily {
    let name = cc
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name.contains("clang") {
        ToolchainFamily::Clang
    } else {
        ToolchainFamily::Gcc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_toolchain() -> Toolchain {
        Toolchain::new(
            PathBuf::from("gcc"),
            PathBuf::from("g++"),
            PathBuf::from("ar"),
            ToolchainFamily::Gcc,
        )
        .with_os("linux")
    }

    #[test]
    fn test_compile_command_c() {
        let input = CompileInput {
            source: PathBuf::from("ext/natpmp/natpmp.c"),
            output: PathBuf::from("build/obj/cstuff/natpmp.o"),
            include_dirs: vec![PathBuf::from("/repo/include")],
            cflags: vec!["-Wall".to_string()],
            lang: Language::C,
        };

        let cmd = test_toolchain().compile_command(&input);
        assert_eq!(cmd.program, PathBuf::from("gcc"));
        assert!(cmd.args.contains(&"-c".to_string()));
        assert!(cmd.args.contains(&"-fPIC".to_string()));
        assert!(cmd.args.contains(&"-I/repo/include".to_string()));
        assert!(cmd.args.contains(&"-Wall".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "build/obj/cstuff/natpmp.o");
    }

    #[test]
    fn test_compile_command_cxx_driver() {
        let input = CompileInput {
            source: PathBuf::from("src/netstack_wrap.cxx"),
            output: PathBuf::from("build/obj/netstack/netstack_wrap.o"),
            include_dirs: vec![],
            cflags: vec!["-std=c++11".to_string()],
            lang: Language::Cxx,
        };

        let cmd = test_toolchain().compile_command(&input);
        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert!(cmd.args.contains(&"-std=c++11".to_string()));
    }

    #[test]
    fn test_archive_command() {
        let input = ArchiveInput {
            objects: vec![PathBuf::from("a.o"), PathBuf::from("b.o")],
            output: PathBuf::from("build/lib/libcstuff.a"),
        };

        let cmd = test_toolchain().archive_command(&input);
        assert_eq!(cmd.program, PathBuf::from("ar"));
        assert_eq!(cmd.args[0], "rcs");
        assert_eq!(cmd.args[1], "build/lib/libcstuff.a");
        assert_eq!(cmd.args.len(), 4);
    }

    #[test]
    fn test_link_command_links_static_libs() {
        let input = LinkInput {
            objects: vec![PathBuf::from("app.o"), PathBuf::from("wrap.o")],
            output: PathBuf::from("build/_netstack.so"),
            lib_dir: PathBuf::from("build/lib"),
            libs: vec!["cstuff".to_string()],
            ldflags: vec![],
        };

        let cmd = test_toolchain().link_extension_command(&input);
        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert!(cmd.args.contains(&"-shared".to_string()));
        assert!(cmd.args.contains(&"-Lbuild/lib".to_string()));
        assert!(cmd.args.contains(&"-lcstuff".to_string()));
        assert!(!cmd.args.contains(&"-undefined".to_string()));
    }

    #[test]
    fn test_link_command_macos_dynamic_lookup() {
        let input = LinkInput {
            objects: vec![PathBuf::from("wrap.o")],
            output: PathBuf::from("build/_netstack.so"),
            lib_dir: PathBuf::from("build/lib"),
            libs: vec![],
            ldflags: vec![],
        };

        let cmd = test_toolchain()
            .with_os("macos")
            .link_extension_command(&input);
        assert!(cmd.args.contains(&"-undefined".to_string()));
        assert!(cmd.args.contains(&"dynamic_lookup".to_string()));
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("a.c")), Language::C);
        assert_eq!(Language::from_path(Path::new("a.cxx")), Language::Cxx);
        assert_eq!(Language::from_path(Path::new("a.cpp")), Language::Cxx);
        assert_eq!(Language::from_path(Path::new("a.cc")), Language::Cxx);
    }

    #[test]
    fn test_infer_cxx() {
        assert_eq!(infer_cxx(Path::new("gcc")), PathBuf::from("g++"));
        assert_eq!(infer_cxx(Path::new("clang")), PathBuf::from("clang++"));
        assert_eq!(infer_cxx(Path::new("/usr/bin/cc")), PathBuf::from("/usr/bin/c++"));
        assert_eq!(
            infer_cxx(Path::new("x86_64-linux-gnu-gcc")),
            PathBuf::from("x86_64-linux-gnu-g++")
        );
    }
}
