//! Apply command: converge the stack against the control plane

use super::StackArgs;
use crate::error::CliResult;
use crate::output;
use tokio_util::sync::CancellationToken;
use trellis_engine::{ApplyOptions, RetryPolicy};
use trellis_types::GroupId;

pub async fn execute(stack: &StackArgs, skip_groups: &[String]) -> CliResult<i32> {
    let executor = super::open_executor(stack).await?;
    let printer = output::spawn_event_printer(executor.subscribe());

    // Ctrl-C stops new dispatches; in-flight nodes finish and are recorded.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let options = ApplyOptions {
        disabled_groups: skip_groups
            .iter()
            .map(|g| GroupId::from(g.as_str()))
            .collect(),
        retry: RetryPolicy::default(),
        cancel,
    };
    let report = executor.apply(options).await?;

    drop(executor);
    let _ = printer.await;

    if report.cancelled {
        output::print_error("apply cancelled; converged nodes were kept");
        return Ok(1);
    }
    if report.success() {
        output::print_success("stack converged");
        Ok(0)
    } else {
        for node in report.failed_nodes() {
            output::print_error(&format!("failed: {}", node));
        }
        for node in report.skipped_nodes() {
            output::print_info(&format!("skipped: {}", node));
        }
        Ok(1)
    }
}
