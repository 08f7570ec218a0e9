//! mcp-passthrough-hooks: a programmable hook-chain engine for a
//! bidirectional MCP passthrough proxy.
//!
//! A passthrough proxy sits between an MCP client (the *source*) and a real
//! MCP server (the *target*), relaying JSON-RPC traffic in both directions.
//! What makes it more than a dumb pipe is the hook chain: an ordered,
//! immutable list of [`hook::Hook`] implementations, each able to inspect,
//! transform, short-circuit, or asynchronously continue any message passing
//! through, on any of the eleven channels in the closed [`taxonomy`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   on_source_request    ┌──────────────────┐   send_request   ┌──────────┐
//! │  source  │ ──────────────────────▶│  PassthroughContext│─────────────────▶│  target  │
//! │ endpoint │◀────────────────────── │  + HookChain       │◀─────────────────│ endpoint │
//! └──────────┘      response          └──────────────────┘      response     └──────────┘
//! ```
//!
//! [`pipeline`] implements the three phases (request, response/error,
//! notification) as pure functions over a [`chain::HookChain`], with no
//! transport dependency; [`passthrough::PassthroughContext`] is the glue
//! that composes those phases with a pair of [`transport::Endpoint`]s.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp_passthrough_hooks::prelude::*;
//!
//! # async fn run() {
//! let ctx = PassthroughContext::new(vec![], PassthroughOptions::default());
//! let target: Arc<dyn Endpoint> = Arc::new(InMemoryEndpoint::echo());
//! ctx.connect(None, Some(target));
//!
//! let request = McpRequest::new("tools/list", 1_i64);
//! let extra = RequestExtra::new(RequestId::Number(1));
//! let _response = ctx.on_source_request(request, extra).await;
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod chain;
pub mod context;
pub mod error;
pub mod hook;
pub mod message;
pub mod metadata;
pub mod metrics;
pub mod passthrough;
pub mod pipeline;
pub mod taxonomy;
pub mod transport;

pub use error::{HookChainError, PassthroughError};
pub use passthrough::PassthroughContext;

/// Common imports for building and wiring a [`passthrough::PassthroughContext`].
pub mod prelude {
    pub use crate::chain::{HookChain, NodeId};
    pub use crate::context::RequestExtra;
    pub use crate::error::{HookChainError, HookError, PassthroughError};
    pub use crate::hook::{AsyncCallback, ErrorOutcome, Hook, RequestOutcome, ResultOutcome};
    pub use crate::message::{McpNotification, McpRequest, McpResponse, RequestContextPayload, RequestId};
    pub use crate::metrics::{AtomicMetrics, MetricsSnapshot};
    pub use crate::passthrough::{EndpointFacade, ErrorHandler, PassthroughContext, PassthroughOptions};
    pub use crate::taxonomy::{Channel, ChannelSet, Direction, MessageDirection};
    pub use crate::transport::test_support::InMemoryEndpoint;
    pub use crate::transport::Endpoint;
}

/// Version of this crate, exposed for diagnostics and `_meta` stamping.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol version this pipeline's closed taxonomy was written against.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
