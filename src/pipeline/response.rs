//! Response/error phase: §4.C.2 of the design.
//!
//! Unlike the request phase, this phase admits either a success payload or
//! an error as input and may convert between them mid-traversal: a hook's
//! error handler may recover into a response, and a hook's result handler
//! throwing reverts the state back to an error.

use tracing::{debug, trace};

use crate::chain::{HookChain, NodeId};
use crate::context::RequestExtra;
use crate::error::HookChainError;
use crate::hook::ErrorOutcome;
use crate::message::{McpRequest, McpResponse};
use crate::taxonomy::{Channel, Direction};

use super::invoke;

/// The phase's input: exactly one of a response or an error. Modeling this
/// as an enum (rather than two `Option`s) makes "exactly one must be
/// supplied" a compile-time guarantee instead of a runtime fault to detect.
pub enum ResponseOrError {
    /// A successful result is being unwound back toward the source.
    Response(McpResponse),
    /// An error is being unwound back toward the source, and may yet be
    /// recovered by an error handler.
    Error(HookChainError),
}

/// Terminal state of a response/error phase run.
pub enum ResponsePhaseOutcome {
    /// Traversal ended with a response — either because it started as one
    /// and was never reverted, or because a hook recovered it.
    Continue {
        /// The final response.
        response: McpResponse,
        /// The last node whose result or error handler was actually invoked.
        last_processed_node: Option<NodeId>,
    },
    /// Traversal ended with an error that survived the entire chain.
    Abort {
        /// The final (possibly hook-transformed) error.
        error: HookChainError,
        /// The last node whose result or error handler was actually invoked.
        last_processed_node: Option<NodeId>,
    },
}

enum State {
    Response(McpResponse),
    Error(HookChainError),
}

/// Run the response/error phase.
///
/// `start` is `None` to traverse the full chain (no request phase preceded
/// this — e.g. a server-initiated response path through the chain with no
/// prior request phase in this process), or `Some(node)` to resume from the
/// request phase's `last_processed_node`.
///
/// `exclude` is the async hook's node when this call is the continuation of
/// a `continueAsync`: traversal stops *before* reaching it, so the async
/// hook only learns the real outcome via its callback, never by re-entering
/// this phase.
pub async fn process_response_phase(
    chain: &HookChain,
    start: Option<NodeId>,
    direction: Direction,
    exclude: Option<NodeId>,
    channel: Channel,
    initial: ResponseOrError,
    original_request: &McpRequest,
    extra: &RequestExtra,
) -> ResponsePhaseOutcome {
    let mut state = match initial {
        ResponseOrError::Response(r) => State::Response(r),
        ResponseOrError::Error(e) => State::Error(e),
    };

    let mut current = start.or_else(|| chain.start(direction));
    let mut last_processed_node = None;

    while let Some(node_id) = current {
        if Some(node_id) == exclude {
            break;
        }
        if extra.is_cancelled() {
            state = State::Error(HookChainError::cancelled("request cancelled"));
            break;
        }
        let node = chain.node(node_id);

        state = match state {
            State::Response(response) => {
                if node.handles_result(channel) {
                    last_processed_node = Some(node_id);
                    let hook = node.hook().clone();
                    trace!(hook = hook.name(), ?channel, "response phase hop");
                    match invoke(hook.on_result(channel, response, original_request, extra)).await
                    {
                        Ok(outcome) => State::Response(outcome.into_response()),
                        Err(error) => {
                            debug!(hook = hook.name(), ?channel, code = error.code, "result handler reverted to error");
                            State::Error(error)
                        }
                    }
                } else {
                    State::Response(response)
                }
            }
            State::Error(error) => {
                if node.handles_error(channel) {
                    last_processed_node = Some(node_id);
                    let hook = node.hook().clone();
                    trace!(hook = hook.name(), ?channel, "error phase hop");
                    match invoke(hook.on_error(channel, &error, original_request, extra)).await {
                        Ok(ErrorOutcome::Continue) => State::Error(error),
                        Ok(ErrorOutcome::Respond(response)) => {
                            debug!(hook = hook.name(), ?channel, "error handler recovered to response");
                            State::Response(response)
                        }
                        Err(new_error) => State::Error(new_error),
                    }
                } else {
                    State::Error(error)
                }
            }
        };

        current = chain.step(node_id, direction);
    }

    match state {
        State::Response(response) => ResponsePhaseOutcome::Continue {
            response,
            last_processed_node,
        },
        State::Error(error) => ResponsePhaseOutcome::Abort {
            error,
            last_processed_node,
        },
    }
}
