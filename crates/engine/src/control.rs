//! Control channel.
//!
//! Three commands reach the engine from the outside: promote the new
//! generation now, clear all stores, and report the current generation
//! identifier. Replies ride oneshot channels; a dropped reply receiver is
//! not an error.

use tokio::sync::{mpsc, oneshot};

use sevacache_core::StoreRegistry;

use crate::lifecycle::LifecycleManager;

/// Commands accepted on the control channel.
#[derive(Debug)]
pub enum ControlCommand {
    /// Promote the installed generation immediately (skip-wait).
    SkipWaiting,
    /// Drop every record in every store; replies with the number removed.
    ClearStores { reply: oneshot::Sender<u64> },
    /// Report the current generation identifier.
    CurrentGeneration { reply: oneshot::Sender<String> },
}

/// Service control commands until the channel closes.
pub async fn run_control_loop(
    mut rx: mpsc::Receiver<ControlCommand>, lifecycle: LifecycleManager, registry: StoreRegistry,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            ControlCommand::SkipWaiting => {
                if let Err(e) = lifecycle.skip_waiting().await {
                    tracing::warn!(error = %e, "skip-waiting failed");
                }
            }
            ControlCommand::ClearStores { reply } => {
                let removed = match registry.clear_all().await {
                    Ok(count) => count,
                    Err(e) => {
                        tracing::warn!(error = %e, "clear stores failed");
                        0
                    }
                };
                let _ = reply.send(removed);
            }
            ControlCommand::CurrentGeneration { reply } => {
                let _ = reply.send(registry.generation().as_str().to_string());
            }
        }
    }
    tracing::debug!("control channel closed");
}
