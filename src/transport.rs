//! Transport contracts.
//!
//! `spec.md` §1 marks JSON-RPC framing, connection management, and the
//! concrete SSE/stdio/HTTP-stream transports as external collaborators,
//! "assumed available as a library" and referenced only by their contracts.
//! [`Endpoint`] is that contract: the capability [`crate::passthrough::PassthroughContext`]
//! needs from whatever sits on the source side (facing the client) or the
//! target side (facing the real MCP server) — send a request and await its
//! response, send a fire-and-forget notification, or ping.
//!
//! Inbound delivery is *not* part of this contract: per `spec.md` §4.E, the
//! context "registers fallback handlers" that something outside this crate
//! (the transport library) feeds inbound messages into — modeled here as
//! the `on_source_*` / `on_target_*` methods on
//! [`crate::passthrough::PassthroughContext`] that a driver calls directly.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HookChainError;
use crate::message::{McpNotification, McpRequest, McpResponse, RequestContextPayload};

/// One side of the passthrough: a request/notification/ping sink.
///
/// Implemented once per concrete wire transport (stdio, HTTP+SSE, streamable
/// HTTP, ...) by the surrounding transport library; this crate only depends
/// on the contract.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Send a request and await its response or error.
    ///
    /// `context`, when present, is the `requestContext` side-channel the
    /// passthrough context stripped off the request before calling this
    /// method (`spec.md` §6): an HTTP-shaped transport merges `headers` into
    /// the outgoing request and may honor `host`/`path` overrides; a
    /// transport with no notion of HTTP headers (stdio) is free to ignore it.
    async fn send_request(
        &self,
        request: McpRequest,
        timeout: Duration,
        context: Option<RequestContextPayload>,
    ) -> Result<McpResponse, HookChainError>;

    /// Send a fire-and-forget notification.
    async fn send_notification(&self, notification: McpNotification) -> Result<(), HookChainError>;

    /// Ping the other side. Bypasses hooks by convention — hooks never see
    /// pings unless they implement the generic `other`/`target` handlers.
    async fn ping(&self, timeout: Duration) -> Result<(), HookChainError>;
}

/// Marker alias for the endpoint facing the MCP client (the proxy's server
/// role).
pub type SourceTransport = dyn Endpoint;

/// Marker alias for the endpoint facing the real MCP server (the proxy's
/// client role).
pub type TargetTransport = dyn Endpoint;

/// An in-memory [`Endpoint`] double for exercising the passthrough context
/// without a real wire transport.
///
/// Following the pattern from `turbomcp-protocol`'s `test_helpers` module,
/// this is public so downstream crates can use it in their own tests too.
pub mod test_support {

    use super::{Duration, Endpoint};
    use crate::error::HookChainError;
    use crate::message::{McpNotification, McpRequest, McpResponse, RequestContextPayload};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A function the in-memory endpoint calls to produce a response for a
    /// given request — stands in for "the real server" or "the real
    /// client" in tests.
    pub type Responder = Arc<dyn Fn(McpRequest) -> Result<McpResponse, HookChainError> + Send + Sync>;

    /// An [`Endpoint`] whose behavior is entirely defined by a [`Responder`]
    /// closure, with every sent notification recorded for assertions.
    pub struct InMemoryEndpoint {
        responder: Responder,
        notifications: Mutex<Vec<McpNotification>>,
        last_context: Mutex<Option<RequestContextPayload>>,
    }

    impl InMemoryEndpoint {
        /// Build an endpoint that answers every request with `responder`.
        #[must_use]
        pub fn new(responder: Responder) -> Self {
            Self {
                responder,
                notifications: Mutex::new(Vec::new()),
                last_context: Mutex::new(None),
            }
        }

        /// Build an endpoint that echoes the request's params back as the
        /// result — useful for asserting what a chain of request hooks did
        /// to the payload before it reached "the server".
        #[must_use]
        pub fn echo() -> Self {
            Self::new(Arc::new(|req: McpRequest| {
                Ok(McpResponse::new(req.params))
            }))
        }

        /// Notifications sent through this endpoint, in order.
        #[must_use]
        pub fn notifications(&self) -> Vec<McpNotification> {
            self.notifications.lock().clone()
        }

        /// The `requestContext` delivered with the most recent request, if
        /// any — lets tests assert headers actually reach the transport.
        #[must_use]
        pub fn last_context(&self) -> Option<RequestContextPayload> {
            self.last_context.lock().clone()
        }
    }

    #[async_trait]
    impl Endpoint for InMemoryEndpoint {
        async fn send_request(
            &self,
            request: McpRequest,
            _timeout: Duration,
            context: Option<RequestContextPayload>,
        ) -> Result<McpResponse, HookChainError> {
            *self.last_context.lock() = context;
            (self.responder)(request)
        }

        async fn send_notification(
            &self,
            notification: McpNotification,
        ) -> Result<(), HookChainError> {
            self.notifications.lock().push(notification);
            Ok(())
        }

        async fn ping(&self, _timeout: Duration) -> Result<(), HookChainError> {
            Ok(())
        }
    }
}
