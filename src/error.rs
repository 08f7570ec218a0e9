//! Canonical error shapes for the hook chain.
//!
//! Two error types exist side by side, deliberately:
//!
//! - [`HookChainError`] is the *wire* error — the shape that flows through
//!   the response/error phase and is ultimately delivered to the source
//!   endpoint inside a JSON-RPC `error` object.
//! - [`PassthroughError`] is the crate's own operational error — thrown by
//!   misuse of [`crate::passthrough::PassthroughContext`] (missing
//!   transport, internal invariant violations) rather than by a hook.
//!
//! The [`adapt_error`] and [`adapt_panic`] functions are the Error Adapter
//! from the design: they normalize an arbitrary caught value into a
//! [`HookChainError`] without losing information.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Standard "internal error" code used throughout the pipeline.
pub const INTERNAL_ERROR: i32 = -32603;

/// "Request rejected" — an operation was attempted without the required
/// transport, or other caller misuse of the passthrough context.
pub const REQUEST_REJECTED: i32 = -32001;

/// Request timeout — an outbound call to the target exceeded its deadline.
/// Taken from the JSON-RPC "server error" reserved range (-32000..-32099),
/// since the MCP spec itself does not assign this one a fixed code.
pub const REQUEST_TIMEOUT: i32 = -32008;

/// Request cancelled — the transport's cancellation token fired while the
/// request was still in flight. Outside the JSON-RPC server-error range on
/// purpose, mirroring how LSP-family protocols carve out a distinct
/// "cancelled" code rather than overloading the generic server-error band.
pub const REQUEST_CANCELLED: i32 = -32800;

/// Prefix the Error Adapter uses to recognize (and reformat) an upstream MCP
/// protocol error, matching the convention the TypeScript MCP SDK uses.
pub const MCP_ERROR_PREFIX: &str = "MCP error";

/// The canonical error shape that flows through the response/error phase.
///
/// Anything a hook returns as an `Err` is normalized into this shape before
/// downstream hooks (or the source endpoint) ever see it; a `HookChainError`
/// that is already in this shape passes through the adapter unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookChainError {
    /// Numeric error code (JSON-RPC / MCP error code space).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl HookChainError {
    /// Build an internal error (`-32603`) from a message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }

    /// Build a request-rejected error (`-32001`), used by the passthrough
    /// context when an operation is attempted without the required transport.
    pub fn request_rejected(message: impl Into<String>) -> Self {
        Self {
            code: REQUEST_REJECTED,
            message: message.into(),
            data: None,
        }
    }

    /// Build a cancellation error (`-32800`), delivered when a transport's
    /// cancellation token fires mid-pipeline.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            code: REQUEST_CANCELLED,
            message: message.into(),
            data: None,
        }
    }

    /// Attach (or replace) structured error data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for HookChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for HookChainError {}

/// An upstream MCP protocol error, carrying the prefix the Error Adapter
/// recognizes so the code and data survive reformatting unchanged.
#[derive(Debug, Clone)]
pub struct McpProtocolError {
    /// Protocol-level error code, preserved verbatim by the adapter.
    pub code: i32,
    /// Protocol-level error message (without the `MCP error` prefix).
    pub message: String,
    /// Optional structured error data, preserved verbatim.
    pub data: Option<Value>,
}

impl fmt::Display for McpProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MCP_ERROR_PREFIX} {}: {}", self.code, self.message)
    }
}

impl std::error::Error for McpProtocolError {}

/// The boxed error type a [`crate::hook::Hook`] handler returns on failure.
///
/// Any `std::error::Error` implementor works; the adapter downcasts the most
/// specific shapes it recognizes ([`HookChainError`], [`McpProtocolError`])
/// and falls back to a generic internal error otherwise.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Normalize an arbitrary caught hook error into a [`HookChainError`].
///
/// This is the Error Adapter from the design. Rules, in order:
/// 1. Already a [`HookChainError`] → returned unchanged.
/// 2. An [`McpProtocolError`] → code and data preserved, message reformatted
///    with the `MCP error` prefix.
/// 3. Anything else → a generic internal error whose message is the error's
///    `Display` output and whose data carries the error's `Debug` rendering
///    (our stand-in for a stack trace) plus the source chain, if any.
pub fn adapt_error(err: HookError) -> HookChainError {
    let err = match err.downcast::<HookChainError>() {
        Ok(chain_err) => return *chain_err,
        Err(err) => err,
    };
    let err = match err.downcast::<McpProtocolError>() {
        Ok(proto_err) => {
            return HookChainError {
                code: proto_err.code,
                message: proto_err.to_string(),
                data: proto_err.data.clone(),
            };
        }
        Err(err) => err,
    };

    generic_internal_error(err.as_ref())
}

fn generic_internal_error(err: &(dyn std::error::Error + 'static)) -> HookChainError {
    let mut source_chain = Vec::new();
    let mut cursor = err.source();
    while let Some(src) = cursor {
        source_chain.push(src.to_string());
        cursor = src.source();
    }

    HookChainError {
        code: INTERNAL_ERROR,
        message: err.to_string(),
        data: Some(serde_json::json!({
            "debug": format!("{err:?}"),
            "sourceChain": source_chain,
        })),
    }
}

/// Normalize a caught panic payload (from `catch_unwind`) into a
/// [`HookChainError`].
///
/// Rust panics are the closest analogue to the source system's "thrown
/// string" and "thrown null/undefined" cases: a `&'static str` or `String`
/// payload becomes the message verbatim; anything else (unit payloads,
/// custom panic payloads) becomes a generic internal error naming the
/// payload's type.
pub fn adapt_panic(payload: Box<dyn Any + Send>) -> HookChainError {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return HookChainError::internal(*msg);
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return HookChainError::internal(msg.clone());
    }
    HookChainError::internal("hook panicked with a non-string payload")
}

/// The crate's own operational error, distinct from [`HookChainError`].
///
/// Thrown by [`crate::passthrough::PassthroughContext`] itself (as opposed
/// to a hook) — missing transports, internal invariant violations. Converts
/// into a [`HookChainError`] at the boundary where it must re-enter the wire.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PassthroughError {
    /// An operation required a transport that was never connected.
    ///
    /// `side` names the transport's *role*, not which half of the proxy it
    /// sits on: the source side is served by a "server" transport (it plays
    /// the MCP server role toward the client); the target side is served by
    /// a "client" transport (the proxy plays the MCP client role toward the
    /// real server).
    #[error("No {side} transport connected")]
    NoTransport {
        /// The missing transport's role: `"server"` (source side) or
        /// `"client"` (target side).
        side: &'static str,
    },

    /// An outbound request to the target exceeded its timeout.
    #[error("request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller violated an internal pipeline invariant (e.g. supplying
    /// neither a response nor an error to the response phase).
    #[error("internal pipeline fault: {0}")]
    InvariantViolation(String),

    /// The underlying transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<PassthroughError> for HookChainError {
    fn from(err: PassthroughError) -> Self {
        match err {
            PassthroughError::NoTransport { side } => {
                HookChainError::request_rejected(format!(
                    "No {side} transport connected"
                ))
            }
            PassthroughError::Timeout(_) => HookChainError {
                code: INTERNAL_ERROR,
                message: err.to_string(),
                data: None,
            },
            PassthroughError::InvariantViolation(_) | PassthroughError::Transport(_) => {
                HookChainError::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_error_chain_unchanged() {
        let original = HookChainError {
            code: 7,
            message: "already canonical".into(),
            data: Some(serde_json::json!({"x": 1})),
        };
        let boxed: HookError = Box::new(original.clone());
        assert_eq!(adapt_error(boxed), original);
    }

    #[test]
    fn mcp_protocol_error_preserves_code_and_data() {
        let proto = McpProtocolError {
            code: -32001,
            message: "rejected".into(),
            data: Some(serde_json::json!({"reason": "denied"})),
        };
        let boxed: HookError = Box::new(proto);
        let adapted = adapt_error(boxed);
        assert_eq!(adapted.code, -32001);
        assert!(adapted.message.starts_with(MCP_ERROR_PREFIX));
        assert_eq!(adapted.data, Some(serde_json::json!({"reason": "denied"})));
    }

    #[test]
    fn string_conversion_preserves_message_verbatim() {
        let boxed: HookError = "blocked".into();
        let adapted = adapt_error(boxed);
        assert_eq!(adapted.code, INTERNAL_ERROR);
        assert_eq!(adapted.message, "blocked");
    }

    #[test]
    fn panic_with_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("blocked");
        let adapted = adapt_panic(payload);
        assert_eq!(adapted.message, "blocked");
    }

    #[test]
    fn panic_with_non_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42_i32);
        let adapted = adapt_panic(payload);
        assert_eq!(adapted.code, INTERNAL_ERROR);
        assert!(adapted.message.contains("non-string"));
    }

    #[test]
    fn cancelled_uses_dedicated_code() {
        let err = HookChainError::cancelled("request cancelled");
        assert_eq!(err.code, REQUEST_CANCELLED);
        assert_eq!(err.message, "request cancelled");
    }

    #[test]
    fn no_transport_maps_to_request_rejected() {
        let err: HookChainError = PassthroughError::NoTransport { side: "client" }.into();
        assert_eq!(err.code, REQUEST_REJECTED);
        assert!(err.message.contains("No client transport connected"));
    }
}
