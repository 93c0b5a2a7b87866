//! Destroy command: tear the stack down in reverse order

use super::StackArgs;
use crate::error::CliResult;
use crate::output;
use trellis_engine::{DestroyOptions, RetryPolicy};

pub async fn execute(stack: &StackArgs, force_teardown: bool) -> CliResult<i32> {
    let executor = super::open_executor(stack).await?;
    let printer = output::spawn_event_printer(executor.subscribe());

    let report = executor
        .destroy(DestroyOptions {
            force_teardown,
            retry: RetryPolicy::default(),
        })
        .await?;

    drop(executor);
    let _ = printer.await;

    if report.success() {
        output::print_success("stack destroyed");
        Ok(0)
    } else {
        for node in report.failed_nodes() {
            output::print_error(&format!("delete failed: {}", node));
        }
        output::print_info("blocked dependencies were kept; re-run to retry");
        Ok(1)
    }
}
