//! The [`Hook`] trait: a capability-carrying entity that observes and
//! transforms any channel of the pipeline.
//!
//! A hook exposes any subset of the four handler kinds (request, result,
//! error, notification); absent methods are transparent pass-through. In
//! the source system this is discovered by duck-typing a method name at
//! runtime; here a hook self-reports its capabilities once (see
//! [`Hook::request_channels`] and friends), and the chain caches the result
//! per node (see [`crate::chain::ChainNode`]) so the pipeline never pays for
//! reflection on the hot path.

use async_trait::async_trait;

use crate::context::RequestExtra;
use crate::error::{HookChainError, HookError};
use crate::message::{McpNotification, McpRequest, McpResponse};
use crate::taxonomy::{Channel, ChannelSet};

/// The one-shot completion callback a [`RequestOutcome::ContinueAsync`]
/// registers.
///
/// Invoked exactly once, with either `Ok(response)` or `Err(error)`, after
/// the detached continuation (request remainder → target → response phase)
/// finishes. See `spec.md` §4.C.4.
pub type AsyncCallback = Box<dyn FnOnce(Result<McpResponse, HookChainError>) + Send + 'static>;

/// What a hook's request handler decided to do with an inbound request.
pub enum RequestOutcome {
    /// Proceed with the (possibly modified) request.
    Continue(McpRequest),
    /// Short-circuit: terminate the request phase with a synthetic response.
    /// Only legal during the request phase.
    Respond(McpResponse),
    /// Short-circuit with an immediate response, but keep processing the
    /// (possibly modified) request in the background and deliver the real
    /// outcome to `callback` later. Only legal on request-bearing channels.
    ContinueAsync {
        /// The response returned to the caller synchronously.
        immediate: McpResponse,
        /// The request the detached continuation resumes with.
        request: McpRequest,
        /// Invoked exactly once when the detached continuation completes.
        callback: AsyncCallback,
    },
}

/// What a hook's result handler decided to do with a success response.
pub enum ResultOutcome {
    /// Proceed with the (possibly modified) response.
    Continue(McpResponse),
    /// `respond` is only meaningful for error recovery; on the success path
    /// the pipeline treats this identically to [`ResultOutcome::Continue`]
    /// (see `SPEC_FULL.md` §9, open question 2).
    Respond(McpResponse),
}

impl ResultOutcome {
    /// Unwrap into the response regardless of variant, per the success-path
    /// equivalence documented on [`ResultOutcome::Respond`].
    #[must_use]
    pub fn into_response(self) -> McpResponse {
        match self {
            ResultOutcome::Continue(r) | ResultOutcome::Respond(r) => r,
        }
    }
}

/// What a hook's error handler decided to do with an in-flight error.
pub enum ErrorOutcome {
    /// Leave the error in place, unchanged.
    Continue,
    /// Recover: replace the error with a synthetic successful response.
    /// Subsequent (closer-to-source) hooks see this as a `Response` state
    /// and may further transform it.
    Respond(McpResponse),
}

/// A capability-carrying entity that observes and transforms MCP messages
/// flowing through the pipeline.
///
/// All four handler methods default to transparent pass-through; override
/// only the ones relevant to your hook and report them via the
/// `*_channels` methods so the chain can skip invoking the rest.
#[async_trait]
pub trait Hook: Send + Sync {
    /// A stable, human-readable name for this hook (used in logs and
    /// diagnostics).
    fn name(&self) -> &str;

    /// Channels this hook implements a request handler for.
    fn request_channels(&self) -> ChannelSet {
        ChannelSet::NONE
    }

    /// Channels this hook implements a result (success response) handler for.
    fn result_channels(&self) -> ChannelSet {
        ChannelSet::NONE
    }

    /// Channels this hook implements an error handler for.
    fn error_channels(&self) -> ChannelSet {
        ChannelSet::NONE
    }

    /// Channels this hook implements a notification handler for.
    fn notification_channels(&self) -> ChannelSet {
        ChannelSet::NONE
    }

    /// Handle an inbound request on `channel`. Only invoked when `channel`
    /// is in [`Hook::request_channels`].
    ///
    /// # Errors
    ///
    /// Returning `Err` aborts the in-flight phase; the Error Adapter
    /// (see [`crate::error::adapt_error`]) normalizes the error before it is
    /// delivered downstream.
    async fn on_request(
        &self,
        _channel: Channel,
        request: McpRequest,
        _extra: &RequestExtra,
    ) -> Result<RequestOutcome, HookError> {
        Ok(RequestOutcome::Continue(request))
    }

    /// Handle a successful response on `channel`. Only invoked when
    /// `channel` is in [`Hook::result_channels`].
    ///
    /// # Errors
    ///
    /// Returning `Err` transitions the response/error phase's state to
    /// `Error` for the remaining (closer-to-source) hooks.
    async fn on_result(
        &self,
        _channel: Channel,
        response: McpResponse,
        _original_request: &McpRequest,
        _extra: &RequestExtra,
    ) -> Result<ResultOutcome, HookError> {
        Ok(ResultOutcome::Continue(response))
    }

    /// Handle an in-flight error on `channel`. Only invoked when `channel`
    /// is in [`Hook::error_channels`].
    ///
    /// # Errors
    ///
    /// Returning `Err` replaces the error for the remaining hooks (a
    /// hook's error handler may always further transform the error it was
    /// handed).
    async fn on_error(
        &self,
        _channel: Channel,
        _error: &HookChainError,
        _original_request: &McpRequest,
        _extra: &RequestExtra,
    ) -> Result<ErrorOutcome, HookError> {
        Ok(ErrorOutcome::Continue)
    }

    /// Handle a notification on `channel`. Only invoked when `channel` is in
    /// [`Hook::notification_channels`].
    ///
    /// # Errors
    ///
    /// Returning `Err` aborts the notification phase outright: there is no
    /// response or error-recovery channel for notifications, so no hook
    /// downstream of this one — and not the target — ever sees it.
    async fn on_notification(
        &self,
        _channel: Channel,
        notification: McpNotification,
    ) -> Result<McpNotification, HookError> {
        Ok(notification)
    }
}
