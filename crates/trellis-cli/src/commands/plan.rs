//! Plan command: print the deterministic order and per-node decision

use super::StackArgs;
use crate::error::CliResult;
use trellis_engine::{FileShadowStore, ShadowStateStore};

/// Decide Create vs Update-or-unchanged from state-file presence
///
/// Fingerprint comparison needs resolved references, which exist only during
/// an apply, so the plan cannot distinguish Update from no-op.
pub async fn execute(stack: &StackArgs) -> CliResult<i32> {
    let graph = super::load_graph(&stack.file)?;
    let shadow = FileShadowStore::open(&stack.state).await?;
    let records = shadow.list().await?;

    println!("Stack: {} ({} nodes)", graph.name(), graph.len());
    for (position, id) in graph.apply_order().iter().enumerate() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let decision = if records.contains_key(id) {
            "update-or-unchanged"
        } else {
            "create"
        };
        println!(
            "{:>3}. {:<24} {:<26} {}",
            position + 1,
            id.to_string(),
            node.kind.to_string(),
            decision
        );
    }
    Ok(0)
}
