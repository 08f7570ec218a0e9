//! Request phase: §4.C.1 of the design.
//!
//! Walks the chain in `direction` starting at `start`, invoking each node's
//! request handler in turn. A node may leave the request untouched (pass
//! through), replace it, short-circuit with a synthetic response, or
//! short-circuit with an immediate response while committing to a detached
//! continuation ([`RequestPhaseOutcome::ContinueAsync`]).

use tracing::{debug, trace};

use crate::chain::{HookChain, NodeId};
use crate::context::RequestExtra;
use crate::error::HookChainError;
use crate::hook::{AsyncCallback, RequestOutcome};
use crate::message::{McpRequest, McpResponse};
use crate::taxonomy::{Channel, Direction};

use super::invoke;

/// Terminal state of a request phase run.
pub enum RequestPhaseOutcome {
    /// Every visited node passed the request through (possibly modified);
    /// traversal reached the end of the chain.
    Continue {
        /// The final request, after every hop's modifications.
        request: McpRequest,
        /// The last node whose request handler was actually invoked.
        last_processed_node: Option<NodeId>,
    },
    /// A node short-circuited with a synthetic response.
    Respond {
        /// The synthetic response.
        response: McpResponse,
        /// The node that short-circuited — no node strictly after it (in
        /// the request direction) is ever invoked for this message.
        last_processed_node: Option<NodeId>,
    },
    /// A node short-circuited with an immediate response, and committed to
    /// a detached continuation.
    ContinueAsync {
        /// The response to emit on the source side at once.
        immediate: McpResponse,
        /// The (possibly modified) request the continuation resumes with.
        modified_request: McpRequest,
        /// The node that requested the async continuation — the boundary
        /// the continuation's response phase must stop *before* reaching.
        async_node: NodeId,
        /// Invoked exactly once when the continuation completes.
        callback: AsyncCallback,
    },
    /// A node's request handler failed; traversal stopped.
    Abort {
        /// The normalized error.
        error: HookChainError,
        /// The node whose handler raised the error.
        last_processed_node: Option<NodeId>,
    },
}

/// Run the request phase: walk `chain` from `start` toward the end of
/// `direction`, invoking each node's request handler for `channel`.
pub async fn process_request_phase(
    chain: &HookChain,
    start: Option<NodeId>,
    direction: Direction,
    channel: Channel,
    mut request: McpRequest,
    extra: &RequestExtra,
) -> RequestPhaseOutcome {
    let mut current = start;
    let mut last_processed_node = None;

    while let Some(node_id) = current {
        if extra.is_cancelled() {
            return RequestPhaseOutcome::Abort {
                error: HookChainError::cancelled("request cancelled"),
                last_processed_node,
            };
        }
        let node = chain.node(node_id);
        if node.handles_request(channel) {
            last_processed_node = Some(node_id);
            let hook = node.hook().clone();
            trace!(hook = hook.name(), ?channel, "request phase hop");
            let outcome = invoke(hook.on_request(channel, request, extra)).await;
            match outcome {
                Ok(RequestOutcome::Continue(next_request)) => {
                    request = next_request;
                }
                Ok(RequestOutcome::Respond(response)) => {
                    debug!(hook = hook.name(), ?channel, "request phase short-circuited");
                    return RequestPhaseOutcome::Respond {
                        response,
                        last_processed_node,
                    };
                }
                Ok(RequestOutcome::ContinueAsync {
                    immediate,
                    request: modified_request,
                    callback,
                }) => {
                    debug!(hook = hook.name(), ?channel, "request phase committed to continueAsync");
                    return RequestPhaseOutcome::ContinueAsync {
                        immediate,
                        modified_request,
                        async_node: node_id,
                        callback,
                    };
                }
                Err(error) => {
                    debug!(hook = hook.name(), ?channel, code = error.code, "request phase aborted");
                    return RequestPhaseOutcome::Abort {
                        error,
                        last_processed_node,
                    };
                }
            }
        }
        current = chain.step(node_id, direction);
    }

    RequestPhaseOutcome::Continue {
        request,
        last_processed_node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::HookChain;
    use crate::hook::Hook;
    use crate::taxonomy::ChannelSet;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct NoopHook;

    #[async_trait]
    impl Hook for NoopHook {
        fn name(&self) -> &str {
            "noop"
        }

        fn request_channels(&self) -> ChannelSet {
            ChannelSet::of(&[Channel::ToolsCall])
        }
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_next_hook() {
        let chain = HookChain::build(vec![Arc::new(NoopHook), Arc::new(NoopHook)]);
        let token = Arc::new(CancellationToken::new());
        token.cancel();
        let extra = RequestExtra::new(crate::message::RequestId::Number(1))
            .with_cancellation_token(token);

        let outcome = process_request_phase(
            &chain,
            chain.head(),
            Direction::Forward,
            Channel::ToolsCall,
            McpRequest::new("tools/call", 1_i64),
            &extra,
        )
        .await;

        match outcome {
            RequestPhaseOutcome::Abort { error, .. } => {
                assert_eq!(error.code, crate::error::REQUEST_CANCELLED);
            }
            _ => panic!("expected abort on cancellation"),
        }
    }
}
