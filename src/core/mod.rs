//! Core data model: source sets, targets, artifacts.

pub mod source_set;
pub mod target;

pub use source_set::{SourceSet, SourceSetResolver};
pub use target::{Artifact, BuildTarget, GlueFile, TargetKind};
