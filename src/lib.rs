//! Slipway - build orchestration for a native extension module.
//!
//! Assembles vendored native source trees (a TCP/IP stack, NAT-traversal
//! libraries, a network-virtualization engine) and SWIG-generated binding
//! glue into a single loadable Python extension, staging the results into
//! a package directory. One fixed pipeline, reproducible across platforms
//! and idempotent across repeated invocations.

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod sources;
pub mod sync;
pub mod util;

pub use crate::config::PipelineConfig;
pub use crate::core::{Artifact, BuildTarget, GlueFile, SourceSet, SourceSetResolver, TargetKind};
pub use crate::error::{BuildFailure, FailureKind, PreconditionFailure};
pub use crate::pipeline::{BuildReport, Pipeline, PipelineState, Stage};
pub use crate::sources::SubmoduleInitializer;
pub use crate::sync::GlueFileSynchronizer;
