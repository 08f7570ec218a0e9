//! Notification phase: one-sided, no response, no error-recovery channel.
//!
//! A notification handler that fails aborts the phase outright: there is no
//! downstream hook, and no target, that ever sees it (`spec.md` §8, S6).

use tracing::{debug, trace};

use crate::chain::{HookChain, NodeId};
use crate::error::HookChainError;
use crate::message::McpNotification;
use crate::taxonomy::{Channel, Direction};

use super::invoke;

/// Terminal state of a notification phase run.
pub enum NotificationPhaseOutcome {
    /// Every visited node passed the notification through (possibly
    /// modified); it is ready to forward.
    Continue {
        /// The final notification, after every hop's modifications.
        notification: McpNotification,
        /// The last node whose notification handler was actually invoked.
        last_processed_node: Option<NodeId>,
    },
    /// A node's notification handler failed; the notification is dropped.
    Abort {
        /// The normalized error.
        error: HookChainError,
        /// The node whose handler raised the error.
        last_processed_node: Option<NodeId>,
    },
}

/// Run the notification phase: walk `chain` from its `direction`-determined
/// start, invoking each node's notification handler for `channel`.
pub async fn process_notification_phase(
    chain: &HookChain,
    direction: Direction,
    channel: Channel,
    mut notification: McpNotification,
) -> NotificationPhaseOutcome {
    let mut current = chain.start(direction);
    let mut last_processed_node = None;

    while let Some(node_id) = current {
        let node = chain.node(node_id);
        if node.handles_notification(channel) {
            last_processed_node = Some(node_id);
            let hook = node.hook().clone();
            trace!(hook = hook.name(), ?channel, "notification phase hop");
            match invoke(hook.on_notification(channel, notification)).await {
                Ok(next) => notification = next,
                Err(error) => {
                    debug!(hook = hook.name(), ?channel, code = error.code, "notification phase aborted");
                    return NotificationPhaseOutcome::Abort {
                        error,
                        last_processed_node,
                    };
                }
            }
        }
        current = chain.step(node_id, direction);
    }

    NotificationPhaseOutcome::Continue {
        notification,
        last_processed_node,
    }
}
