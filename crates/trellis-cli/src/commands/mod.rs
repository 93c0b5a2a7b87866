//! Command implementations

pub mod apply;
pub mod destroy;
pub mod plan;

use crate::error::CliResult;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_engine::{Executor, FileShadowStore};
use trellis_graph::ResourceGraph;
use trellis_provider::InMemoryControlPlane;
use trellis_types::StackSpec;

/// Flags shared by every subcommand
#[derive(Args, Debug)]
pub struct StackArgs {
    /// Stack specification file (YAML)
    #[arg(short = 'f', long = "file", env = "TRELLIS_STACK_FILE")]
    pub file: PathBuf,

    /// State file path (JSON)
    #[arg(long, env = "TRELLIS_STATE_FILE", default_value = "trellis-state.json")]
    pub state: PathBuf,
}

pub(crate) fn load_graph(path: &std::path::Path) -> CliResult<ResourceGraph> {
    let text = std::fs::read_to_string(path)?;
    let spec: StackSpec = serde_yaml::from_str(&text)?;
    let graph = ResourceGraph::build(spec)?;
    tracing::debug!(stack = graph.name(), nodes = graph.len(), "stack loaded");
    Ok(graph)
}

/// Build an executor over the state file and the simulated control plane
///
/// Bindings to a real platform implement the same `ProviderAdapter` trait and
/// would be wired here in their place.
pub(crate) async fn open_executor(stack: &StackArgs) -> CliResult<Executor> {
    let graph = Arc::new(load_graph(&stack.file)?);
    let shadow = Arc::new(FileShadowStore::open(&stack.state).await?);
    let plane = InMemoryControlPlane::new();
    Ok(Executor::new(graph, Arc::new(plane.registry()), shadow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_a_stack_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
name: demo
nodes:
  - id: store
    kind: knowledge_store
  - id: primary
    kind: primary_agent
    params:
      store_id:
        ref: {{ node: store, output: store_id }}
"#
        )
        .unwrap();

        let graph = load_graph(file.path()).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.apply_order()[0].as_str(), "store");
    }

    #[test]
    fn cyclic_stack_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
name: demo
nodes:
  - id: a
    kind: tool_group
    depends_on: [b]
  - id: b
    kind: tool_group
    depends_on: [a]
"#
        )
        .unwrap();

        assert!(matches!(
            load_graph(file.path()),
            Err(crate::error::CliError::Validation(_))
        ));
    }
}
