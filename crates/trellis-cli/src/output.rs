//! Terminal output helpers and the engine event printer

use colored::Colorize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use trellis_types::{EngineEvent, EngineEventEnvelope};

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "•".blue(), message);
}

/// Print one progress line per engine event until the channel closes
///
/// The channel closes when the executor is dropped, so callers drop it
/// before awaiting the handle.
pub fn spawn_event_printer(
    mut rx: broadcast::Receiver<EngineEventEnvelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => print_event(&envelope.event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::NodeStarted { node, kind } => {
            print_info(&format!("{} ({}) ...", node, kind));
        }
        EngineEvent::NodeCreated { node, physical_id } => {
            print_success(&format!("{} created as {}", node, physical_id));
        }
        EngineEvent::NodeUpdated { node, physical_id } => {
            print_success(&format!("{} updated ({})", node, physical_id));
        }
        EngineEvent::NodeUnchanged { node } => {
            print_info(&format!("{} unchanged", node));
        }
        EngineEvent::NodeFailed { node, error } => {
            print_error(&format!("{} failed: {}", node, error));
        }
        EngineEvent::NodeSkipped { node, state } => {
            print_info(&format!("{} skipped ({})", node, state));
        }
        EngineEvent::NodeDeleted { node } => {
            print_success(&format!("{} deleted", node));
        }
        EngineEvent::RunCompleted {
            succeeded,
            failed,
            skipped,
        } => {
            if *succeeded {
                print_success("run completed");
            } else {
                print_error(&format!(
                    "run completed with {} failed, {} skipped",
                    failed, skipped
                ));
            }
        }
    }
}
