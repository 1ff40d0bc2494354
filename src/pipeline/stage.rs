//! Pipeline stages and their dependency graph.
//!
//! The ordering between stages is explicit: each stage declares the stages
//! that must complete before it, and execution order falls out of a
//! topological sort. The extension build emitting glue source consumed by
//! the synchronizer is a declared edge here, not an accident of call order.

use std::fmt;

use anyhow::{bail, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::BuildFailure;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Synchronize vendored source trees
    Submodules,
    /// Build static libraries
    Libraries,
    /// Generate glue and build the extension module
    Extension,
    /// Synchronize glue files into the package tree
    GlueSync,
    /// Assemble the package directory
    Package,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Submodules => "submodules",
            Stage::Libraries => "libraries",
            Stage::Extension => "extension",
            Stage::GlueSync => "glue-sync",
            Stage::Package => "package",
        }
    }

    /// The stages that must complete before this one starts.
    pub fn requires(&self) -> &'static [Stage] {
        match self {
            Stage::Submodules => &[],
            // Source resolution happens inside the library stage, so it
            // must see fully-populated vendored trees.
            Stage::Libraries => &[Stage::Submodules],
            // The extension links against the static libraries.
            Stage::Extension => &[Stage::Libraries],
            // The interface compiler emits the glue file this stage copies.
            Stage::GlueSync => &[Stage::Extension],
            Stage::Package => &[Stage::GlueSync],
        }
    }

    pub fn all() -> [Stage; 5] {
        [
            Stage::Submodules,
            Stage::Libraries,
            Stage::Extension,
            Stage::GlueSync,
            Stage::Package,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The stage dependency graph.
pub struct StageGraph {
    graph: DiGraph<Stage, ()>,
}

impl StageGraph {
    /// Build the graph from each stage's declared predecessors.
    pub fn new() -> Self {
        Self::from_stages(&Stage::all())
    }

    fn from_stages(stages: &[Stage]) -> Self {
        let mut graph = DiGraph::new();
        let indices: Vec<(Stage, NodeIndex)> = stages
            .iter()
            .map(|&stage| (stage, graph.add_node(stage)))
            .collect();

        let index_of = |stage: Stage| -> Option<NodeIndex> {
            indices.iter().find(|(s, _)| *s == stage).map(|(_, i)| *i)
        };

        for &(stage, node) in &indices {
            for &dep in stage.requires() {
                if let Some(dep_node) = index_of(dep) {
                    graph.add_edge(dep_node, node, ());
                }
            }
        }

        StageGraph { graph }
    }

    /// The stages in execution order (every predecessor first).
    pub fn execution_order(&self) -> Result<Vec<Stage>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|i| self.graph[i]).collect()),
            Err(cycle) => bail!(
                "stage graph has a cycle involving `{}`",
                self.graph[cycle.node_id()]
            ),
        }
    }
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the pipeline currently stands.
///
/// States progress strictly forward and are never revisited; `Failed`
/// carries the build failure that aborted the run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Init,
    SubmodulesReady,
    LibrariesBuilt,
    ExtensionBuilt,
    GlueSynced,
    PackagesBuilt,
    Failed(BuildFailure),
}

impl PipelineState {
    /// Position in the forward progression; `None` for `Failed`.
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            PipelineState::Init => Some(0),
            PipelineState::SubmodulesReady => Some(1),
            PipelineState::LibrariesBuilt => Some(2),
            PipelineState::ExtensionBuilt => Some(3),
            PipelineState::GlueSynced => Some(4),
            PipelineState::PackagesBuilt => Some(5),
            PipelineState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::PackagesBuilt | PipelineState::Failed(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::SubmodulesReady => "submodules-ready",
            PipelineState::LibrariesBuilt => "libraries-built",
            PipelineState::ExtensionBuilt => "extension-built",
            PipelineState::GlueSynced => "glue-synced",
            PipelineState::PackagesBuilt => "packages-built",
            PipelineState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Failed(failure) => write!(f, "failed ({})", failure.kind()),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_execution_order_is_the_declared_chain() {
        let order = StageGraph::new().execution_order().unwrap();

        assert_eq!(
            order,
            vec![
                Stage::Submodules,
                Stage::Libraries,
                Stage::Extension,
                Stage::GlueSync,
                Stage::Package,
            ]
        );
    }

    #[test]
    fn test_every_stage_runs_after_its_predecessors() {
        let order = StageGraph::new().execution_order().unwrap();

        for (pos, stage) in order.iter().enumerate() {
            for dep in stage.requires() {
                let dep_pos = order.iter().position(|s| s == dep).unwrap();
                assert!(dep_pos < pos, "{} must run before {}", dep, stage);
            }
        }
    }

    #[test]
    fn test_state_progression_is_total() {
        let states = [
            PipelineState::Init,
            PipelineState::SubmodulesReady,
            PipelineState::LibrariesBuilt,
            PipelineState::ExtensionBuilt,
            PipelineState::GlueSynced,
            PipelineState::PackagesBuilt,
        ];

        for (i, state) in states.iter().enumerate() {
            assert_eq!(state.ordinal(), Some(i as u8));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::PackagesBuilt.is_terminal());
        assert!(PipelineState::Failed(BuildFailure::new(
            FailureKind::CompileError,
            "compilation failed"
        ))
        .is_terminal());
        assert!(!PipelineState::GlueSynced.is_terminal());
    }

    #[test]
    fn test_failed_state_display_names_kind() {
        let state = PipelineState::Failed(BuildFailure::new(
            FailureKind::LinkError,
            "linking failed",
        ));
        assert_eq!(state.to_string(), "failed (link error)");
    }
}
