//! Request Extra: per-request metadata carried alongside the MCP payload.
//!
//! `RequestExtra` is created by the source endpoint when a request arrives,
//! is immutable from the pipeline's perspective (hooks that need to pass
//! data downstream do so by mutating the MCP payload's `_meta` or
//! `requestContext` instead — see the design notes on cyclic/shared mutable
//! context), and is destroyed once the response is emitted.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::message::RequestId;

/// Headers, method, and path of the originating HTTP request, when the
/// source transport is HTTP-shaped.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestInfo {
    /// Request URL as seen by the source transport.
    pub url: String,
    /// HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

/// Per-request metadata threaded alongside the MCP payload through the
/// pipeline so hooks can inspect (but not mutate) transport-layer details.
#[derive(Debug, Clone)]
pub struct RequestExtra {
    /// The JSON-RPC request id this extra belongs to.
    pub request_id: RequestId,
    /// The transport session id, if the transport is session-oriented.
    pub session_id: Option<String>,
    /// Validated auth token details, if the transport performed auth.
    pub auth_info: Option<Value>,
    /// Opaque application metadata.
    pub meta: Option<Value>,
    /// HTTP-layer details of the originating request, if applicable.
    pub request_info: Option<HttpRequestInfo>,
    /// Cancellation signal inherited from the transport.
    pub cancellation_token: Option<Arc<CancellationToken>>,
}

impl RequestExtra {
    /// Build a minimal extra carrying only the request id.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            session_id: None,
            auth_info: None,
            meta: None,
            request_info: None,
            cancellation_token: None,
        }
    }

    /// Attach a session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Whether cancellation has been signaled for this request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(|t| t.is_cancelled())
    }
}
