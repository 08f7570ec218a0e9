//! The Passthrough Context: the glue between the transport layer and the
//! hook chain pipeline.
//!
//! Everything in [`crate::pipeline`] is transport-agnostic; this module is
//! where the three phase-processing functions get composed with actual
//! `source`/`target` [`Endpoint`]s into the end-to-end request/response and
//! notification flows described in `spec.md` §4.E, including the detached
//! `continueAsync` continuation.
//!
//! Grounded on `turbomcp-proxy`'s `proxy::context` module: a single
//! long-lived struct wired up once via `connect`, shared behind an `Arc`
//! across every inbound task, with its own error sink rather than
//! propagating hook-side faults back through the transport.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::chain::{HookChain, NodeId};
use crate::context::RequestExtra;
use crate::error::{HookChainError, PassthroughError, REQUEST_TIMEOUT};
use crate::hook::{AsyncCallback, Hook};
use crate::message::{McpNotification, McpRequest, McpResponse, RequestContextPayload, RequestId};
use crate::metadata;
use crate::metrics::{AtomicMetrics, MetricsSnapshot};
use crate::pipeline::request::RequestPhaseOutcome;
use crate::pipeline::response::{ResponseOrError, ResponsePhaseOutcome};
use crate::pipeline::{notification, request, response};
use crate::taxonomy::{Channel, Direction, MessageDirection};
use crate::transport::Endpoint;

/// Which side an outbound call targets. Distinct from [`MessageDirection`],
/// which describes where an *inbound* message originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutboundSide {
    Source,
    Target,
}

/// A closure invoked with every error the context could not hand back to a
/// caller directly — chiefly, faults from a `continueAsync` callback.
pub type ErrorHandler = Arc<dyn Fn(HookChainError) + Send + Sync>;

/// Feature toggles and timeouts for a [`PassthroughContext`].
#[derive(Debug, Clone)]
pub struct PassthroughOptions {
    /// Stamp `_meta` onto the request forwarded to the target.
    pub append_metadata_to_request: bool,
    /// Stamp `_meta` onto the response forwarded back to the source.
    pub append_metadata_to_response: bool,
    /// Stamp `_meta` onto forwarded notifications.
    pub append_metadata_to_notification: bool,
    /// Deadline for a single outbound request to the other side.
    pub request_timeout: Duration,
}

impl Default for PassthroughOptions {
    fn default() -> Self {
        Self {
            append_metadata_to_request: true,
            append_metadata_to_response: true,
            append_metadata_to_notification: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct ErrorSink {
    tx: SyncMutex<Option<tokio::sync::mpsc::UnboundedSender<HookChainError>>>,
    task: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ErrorSink {
    fn new(handler: ErrorHandler) -> Self {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<HookChainError>();
        let task = tokio::spawn(async move {
            while let Some(err) = rx.recv().await {
                handler(err);
            }
        });
        Self {
            tx: SyncMutex::new(Some(tx)),
            task: AsyncMutex::new(Some(task)),
        }
    }

    async fn close(&self) {
        self.tx.lock().take();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }
}

/// Removes a continuation's registry entry when the detached task ends, by
/// any path — success, error, or panic.
struct ContinuationGuard {
    registry: Arc<DashMap<Uuid, RequestId>>,
    id: Uuid,
}

impl Drop for ContinuationGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

fn default_error_handler() -> ErrorHandler {
    Arc::new(|err| {
        tracing::error!(code = err.code, message = %err.message, "unhandled passthrough error");
    })
}

/// The bidirectional passthrough: a hook chain plus the two transports it
/// sits between.
///
/// Built once, shared behind an `Arc` across every inbound task. `source`
/// and `target` start disconnected; [`PassthroughContext::connect`] attaches
/// either or both — a context may run with only one side wired up, in which
/// case an inbound message needing the missing side is rejected rather than
/// blocking forever (`spec.md` §8, S5).
pub struct PassthroughContext {
    chain: Arc<HookChain>,
    options: PassthroughOptions,
    source: RwLock<Option<Arc<dyn Endpoint>>>,
    target: RwLock<Option<Arc<dyn Endpoint>>>,
    target_session_id: SyncMutex<Option<String>>,
    metrics: Arc<AtomicMetrics>,
    error_sink: ErrorSink,
    pending: AsyncMutex<JoinSet<()>>,
    /// Every in-flight `continueAsync` continuation, keyed by an internally
    /// generated id rather than the client-visible JSON-RPC id — JSON-RPC
    /// ids are only unique within one session, so two concurrently connected
    /// sources could otherwise collide. Mirrors the correlation role
    /// `turbomcp-proxy`'s `IdTranslator` plays for frontend/backend id
    /// translation, scoped down to this crate's one registry instead of a
    /// bidirectional map.
    continuations: Arc<DashMap<Uuid, RequestId>>,
}

impl PassthroughContext {
    /// Build a context from an ordered list of hooks. Must be called from
    /// within a Tokio runtime: the error sink's drain task is spawned
    /// immediately.
    #[must_use]
    pub fn new(hooks: Vec<Arc<dyn Hook>>, options: PassthroughOptions) -> Self {
        Self::with_error_handler(hooks, options, default_error_handler())
    }

    /// Build a context with a custom error handler for faults that cannot be
    /// returned to a caller directly (principally, `continueAsync` callback
    /// failures).
    #[must_use]
    pub fn with_error_handler(
        hooks: Vec<Arc<dyn Hook>>,
        options: PassthroughOptions,
        on_error: ErrorHandler,
    ) -> Self {
        Self {
            chain: Arc::new(HookChain::build(hooks)),
            options,
            source: RwLock::new(None),
            target: RwLock::new(None),
            target_session_id: SyncMutex::new(None),
            metrics: Arc::new(AtomicMetrics::new()),
            error_sink: ErrorSink::new(on_error),
            pending: AsyncMutex::new(JoinSet::new()),
            continuations: Arc::new(DashMap::new()),
        }
    }

    /// Original request ids of every `continueAsync` continuation currently
    /// running, paired with the internal id tracking it.
    #[must_use]
    pub fn pending_continuations(&self) -> Vec<(Uuid, RequestId)> {
        self.continuations
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Attach transports. Either argument may be `None` to leave that side
    /// as-is (already connected, or still disconnected).
    pub fn connect(&self, source: Option<Arc<dyn Endpoint>>, target: Option<Arc<dyn Endpoint>>) {
        if let Some(source) = source {
            *self.source.write() = Some(source);
            tracing::info!("source transport connected");
        }
        if let Some(target) = target {
            *self.target.write() = Some(target);
            tracing::info!("target transport connected");
        }
    }

    /// Record the target's session id, used to populate
    /// `_meta.targetSessionId` on stamped responses.
    pub fn set_target_session_id(&self, session_id: impl Into<String>) {
        *self.target_session_id.lock() = Some(session_id.into());
    }

    /// A live snapshot of this context's activity counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// A facade onto the source endpoint (the MCP client side).
    #[must_use]
    pub fn source(&self) -> EndpointFacade<'_> {
        EndpointFacade {
            ctx: self,
            side: OutboundSide::Source,
        }
    }

    /// A facade onto the target endpoint (the real MCP server side).
    #[must_use]
    pub fn target(&self) -> EndpointFacade<'_> {
        EndpointFacade {
            ctx: self,
            side: OutboundSide::Target,
        }
    }

    /// Drain every in-flight `continueAsync` continuation, then disconnect
    /// both transports and stop the error sink's drain task.
    pub async fn close(&self) {
        tracing::info!("closing passthrough context, draining pending continuations");
        let mut pending = self.pending.lock().await;
        while pending.join_next().await.is_some() {}
        drop(pending);
        self.source.write().take();
        self.target.write().take();
        self.error_sink.close().await;
    }

    fn endpoint(&self, side: OutboundSide) -> Result<Arc<dyn Endpoint>, PassthroughError> {
        let (guard, role) = match side {
            OutboundSide::Source => (&self.source, "server"),
            OutboundSide::Target => (&self.target, "client"),
        };
        guard
            .read()
            .clone()
            .ok_or(PassthroughError::NoTransport { side: role })
    }

    async fn call(
        &self,
        side: OutboundSide,
        request: McpRequest,
        context: Option<RequestContextPayload>,
        cancellation: Option<&tokio_util::sync::CancellationToken>,
    ) -> Result<McpResponse, HookChainError> {
        let endpoint = self.endpoint(side)?;
        let timeout = self.options.request_timeout;
        call_endpoint(endpoint.as_ref(), request, context, timeout, cancellation).await
    }

    /// Handle a request arriving from the source (client) side.
    ///
    /// # Errors
    ///
    /// Returns the JSON-RPC error that should be sent back to the source: a
    /// hook- or target-raised error that survived the full response/error
    /// phase, or a [`PassthroughError`] if the target is not connected.
    pub async fn on_source_request(
        &self,
        request: McpRequest,
        extra: RequestExtra,
    ) -> Result<McpResponse, HookChainError> {
        self.handle_inbound_request(request, extra, MessageDirection::SourceToTarget)
            .await
    }

    /// Handle a request arriving from the target (server) side — e.g. a
    /// sampling request the real server initiates.
    ///
    /// # Errors
    ///
    /// Same as [`PassthroughContext::on_source_request`], mirrored.
    pub async fn on_target_request(
        &self,
        request: McpRequest,
        extra: RequestExtra,
    ) -> Result<McpResponse, HookChainError> {
        self.handle_inbound_request(request, extra, MessageDirection::TargetToSource)
            .await
    }

    async fn handle_inbound_request(
        &self,
        request: McpRequest,
        extra: RequestExtra,
        message_direction: MessageDirection,
    ) -> Result<McpResponse, HookChainError> {
        let entry = crate::taxonomy::lookup_request(&request.method, message_direction);
        let direction = Direction::for_request(message_direction);
        let original_request = request.clone();
        let start = self.chain.start(direction);
        let outbound_side = outbound_side_for(message_direction);

        let phase =
            request::process_request_phase(&self.chain, start, direction, entry.channel, request, &extra)
                .await;

        match phase {
            RequestPhaseOutcome::Continue {
                request: forwarded,
                last_processed_node,
            } => {
                let (forwarded, context) =
                    prepare_outbound(forwarded, self.options.append_metadata_to_request);
                let result = self
                    .call(
                        outbound_side,
                        forwarded,
                        context,
                        extra.cancellation_token.as_deref(),
                    )
                    .await;
                self.finish_request(
                    entry.channel,
                    direction,
                    last_processed_node,
                    result.into(),
                    &original_request,
                    &extra,
                )
                .await
            }
            RequestPhaseOutcome::Respond {
                response,
                last_processed_node,
            } => {
                self.metrics
                    .requests_short_circuited
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.finish_request(
                    entry.channel,
                    direction,
                    last_processed_node,
                    ResponseOrError::Response(response),
                    &original_request,
                    &extra,
                )
                .await
            }
            RequestPhaseOutcome::ContinueAsync {
                immediate,
                modified_request,
                async_node,
                callback,
            } => {
                self.metrics
                    .async_continuations_started
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.spawn_continuation(
                    entry.channel,
                    direction,
                    outbound_side,
                    async_node,
                    modified_request,
                    original_request.clone(),
                    extra.clone(),
                    callback,
                )
                .await;
                // The immediate response terminates the pipeline "as if
                // respond had been called" at the node that returned
                // `continueAsync`: it still runs the response phase from
                // there back to the source, so closer-to-source result
                // hooks and `_meta` stamping apply to it exactly as they
                // would to any other short-circuited response.
                self.finish_request(
                    entry.channel,
                    direction,
                    Some(async_node),
                    ResponseOrError::Response(immediate),
                    &original_request,
                    &extra,
                )
                .await
            }
            RequestPhaseOutcome::Abort {
                error,
                last_processed_node,
            } => {
                self.finish_request(
                    entry.channel,
                    direction,
                    last_processed_node,
                    ResponseOrError::Error(error),
                    &original_request,
                    &extra,
                )
                .await
            }
        }
    }

    async fn finish_request(
        &self,
        channel: Channel,
        request_direction: Direction,
        start: Option<NodeId>,
        initial: ResponseOrError,
        original_request: &McpRequest,
        extra: &RequestExtra,
    ) -> Result<McpResponse, HookChainError> {
        let response_direction = request_direction.reversed();
        let outcome = response::process_response_phase(
            &self.chain,
            start,
            response_direction,
            None,
            channel,
            initial,
            original_request,
            extra,
        )
        .await;

        match outcome {
            ResponsePhaseOutcome::Continue {
                mut response,
                last_processed_node: _,
            } => {
                self.metrics
                    .requests_forwarded
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if self.options.append_metadata_to_response {
                    let target_session_id = self.target_session_id.lock().clone();
                    response.stamp_meta(metadata::response_stamp(
                        extra.session_id.as_deref(),
                        target_session_id.as_deref(),
                        chrono::Utc::now(),
                    ));
                }
                Ok(response)
            }
            ResponsePhaseOutcome::Abort {
                error,
                last_processed_node: _,
            } => {
                // Open question: abort outcomes are not stamped — there is
                // no response payload at that point to stamp.
                self.metrics
                    .requests_aborted
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(error)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn spawn_continuation(
        &self,
        channel: Channel,
        direction: Direction,
        outbound_side: OutboundSide,
        async_node: NodeId,
        modified_request: McpRequest,
        original_request: McpRequest,
        extra: RequestExtra,
        callback: AsyncCallback,
    ) {
        let chain = Arc::clone(&self.chain);
        let metrics = Arc::clone(&self.metrics);
        let source = self.source.read().clone();
        let target = self.target.read().clone();
        let target_session_id = self.target_session_id.lock().clone();
        let options = self.options.clone();
        let error_sink_tx = self.error_sink.tx.lock().clone();
        let continuations = Arc::clone(&self.continuations);
        let continuation_id = Uuid::new_v4();
        continuations.insert(continuation_id, extra.request_id.clone());

        let mut pending = self.pending.lock().await;
        pending.spawn(async move {
            let _guard = ContinuationGuard {
                registry: Arc::clone(&continuations),
                id: continuation_id,
            };
            let endpoint = match outbound_side {
                OutboundSide::Source => source,
                OutboundSide::Target => target,
            };

            let resume_from = chain.step(async_node, direction);
            let remainder = request::process_request_phase(
                &chain,
                resume_from,
                direction,
                channel,
                modified_request,
                &extra,
            )
            .await;

            let (initial, last_processed_node) = match remainder {
                RequestPhaseOutcome::Continue {
                    request: forwarded,
                    last_processed_node,
                } => {
                    let (forwarded, context) =
                        prepare_outbound(forwarded, options.append_metadata_to_request);
                    let result = match &endpoint {
                        Some(endpoint) => {
                            call_endpoint(
                                endpoint.as_ref(),
                                forwarded,
                                context,
                                options.request_timeout,
                                extra.cancellation_token.as_deref(),
                            )
                            .await
                        }
                        None => Err(PassthroughError::NoTransport {
                            side: match outbound_side {
                                OutboundSide::Source => "server",
                                OutboundSide::Target => "client",
                            },
                        }
                        .into()),
                    };
                    (ResponseOrError::from(result), last_processed_node)
                }
                RequestPhaseOutcome::Respond {
                    response,
                    last_processed_node,
                } => (ResponseOrError::Response(response), last_processed_node),
                RequestPhaseOutcome::Abort {
                    error,
                    last_processed_node,
                } => (ResponseOrError::Error(error), last_processed_node),
                RequestPhaseOutcome::ContinueAsync { immediate, .. } => {
                    // A second `continueAsync` chained off the first is not
                    // exercised by any scenario this crate implements; treat
                    // it as an immediate (non-continued) response so the
                    // outer callback still fires exactly once.
                    (ResponseOrError::Response(immediate), None)
                }
            };

            let response_direction = direction.reversed();
            let outcome = response::process_response_phase(
                &chain,
                last_processed_node,
                response_direction,
                Some(async_node),
                channel,
                initial,
                &original_request,
                &extra,
            )
            .await;

            let final_result = match outcome {
                ResponsePhaseOutcome::Continue {
                    mut response,
                    last_processed_node: _,
                } => {
                    metrics
                        .async_continuations_succeeded
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    if options.append_metadata_to_response {
                        response.stamp_meta(metadata::response_stamp(
                            extra.session_id.as_deref(),
                            target_session_id.as_deref(),
                            chrono::Utc::now(),
                        ));
                    }
                    Ok(response)
                }
                ResponsePhaseOutcome::Abort {
                    error,
                    last_processed_node: _,
                } => {
                    metrics
                        .async_continuations_failed
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    Err(error)
                }
            };

            let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(final_result);
            }));
            if let Err(payload) = panicked {
                let err = crate::error::adapt_panic(payload);
                tracing::warn!(code = err.code, message = %err.message, "continueAsync callback panicked");
                if let Some(tx) = error_sink_tx {
                    let _ = tx.send(err);
                }
            }
        });
    }

    /// Handle a notification arriving from the source (client) side.
    ///
    /// # Errors
    ///
    /// Returns the normalized error if a hook's handler fails, or if the
    /// target is not connected.
    pub async fn on_source_notification(
        &self,
        notification: McpNotification,
    ) -> Result<(), HookChainError> {
        self.handle_inbound_notification(notification, MessageDirection::SourceToTarget)
            .await
    }

    /// Handle a notification arriving from the target (server) side.
    ///
    /// # Errors
    ///
    /// Same as [`PassthroughContext::on_source_notification`], mirrored.
    pub async fn on_target_notification(
        &self,
        notification: McpNotification,
    ) -> Result<(), HookChainError> {
        self.handle_inbound_notification(notification, MessageDirection::TargetToSource)
            .await
    }

    async fn handle_inbound_notification(
        &self,
        notification: McpNotification,
        message_direction: MessageDirection,
    ) -> Result<(), HookChainError> {
        let entry = crate::taxonomy::lookup_notification(message_direction);
        let direction = Direction::for_request(message_direction);
        let outbound_side = outbound_side_for(message_direction);

        let outcome =
            notification::process_notification_phase(&self.chain, direction, entry.channel, notification)
                .await;

        match outcome {
            notification::NotificationPhaseOutcome::Continue {
                mut notification,
                last_processed_node: _,
            } => {
                if self.options.append_metadata_to_notification {
                    if !notification.params.is_object() {
                        notification.params = serde_json::Value::Object(serde_json::Map::new());
                    }
                    if let Some(obj) = notification.params.as_object_mut() {
                        let stamp = metadata::notification_stamp(None, chrono::Utc::now());
                        let meta = obj
                            .entry("_meta")
                            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                        if let serde_json::Value::Object(meta_obj) = meta {
                            for (k, v) in stamp {
                                meta_obj.entry(k).or_insert(v);
                            }
                        }
                    }
                }
                let endpoint = self.endpoint(outbound_side)?;
                endpoint.send_notification(notification).await
            }
            notification::NotificationPhaseOutcome::Abort {
                error,
                last_processed_node: _,
            } => {
                self.metrics
                    .notifications_dropped
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(error)
            }
        }
    }
}

impl From<Result<McpResponse, HookChainError>> for ResponseOrError {
    fn from(result: Result<McpResponse, HookChainError>) -> Self {
        match result {
            Ok(response) => ResponseOrError::Response(response),
            Err(error) => ResponseOrError::Error(error),
        }
    }
}

/// Send `request` to `endpoint`, racing the timeout against an optional
/// cancellation signal inherited from the originating transport. Dropping
/// the `send_request` future on cancellation is what actually cancels the
/// pending target I/O — `spec.md` §5's "cancels pending target I/O".
async fn call_endpoint(
    endpoint: &dyn Endpoint,
    request: McpRequest,
    context: Option<RequestContextPayload>,
    timeout: Duration,
    cancellation: Option<&tokio_util::sync::CancellationToken>,
) -> Result<McpResponse, HookChainError> {
    let send = tokio::time::timeout(timeout, endpoint.send_request(request, timeout, context));
    let timed_out = || HookChainError {
        code: REQUEST_TIMEOUT,
        message: format!("request timeout after {timeout:?}"),
        data: None,
    };

    match cancellation {
        Some(token) => {
            tokio::select! {
                result = send => result.unwrap_or_else(|_| Err(timed_out())),
                () = token.cancelled() => Err(HookChainError::cancelled("request cancelled")),
            }
        }
        None => send.await.unwrap_or_else(|_| Err(timed_out())),
    }
}

/// Strips the transport-only `requestContext` side-channel off a request
/// bound for the wire and, if `append_metadata` is set, stamps outbound
/// `_meta`. Returns the prepared request alongside the extracted context
/// (if any) so the caller can hand it to [`Endpoint::send_request`] — the
/// context never travels on the wire itself.
///
/// A free function rather than a `&self` method: the `continueAsync`
/// continuation applies this from inside a detached `'static` task that only
/// has a cloned [`PassthroughOptions`], not a context reference.
fn prepare_outbound(
    mut request: McpRequest,
    append_metadata: bool,
) -> (McpRequest, Option<RequestContextPayload>) {
    let context = request.take_request_context();
    if append_metadata {
        // Requests don't carry a `stamp_meta` helper (that lives on
        // McpResponse); fold the stamp into `params._meta` directly so
        // the target sees the same provenance fields a response would.
        if !request.params.is_object() {
            request.params = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(obj) = request.params.as_object_mut() {
            let stamp = metadata::notification_stamp(None, chrono::Utc::now());
            let meta = obj
                .entry("_meta")
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(meta_obj) = meta {
                for (k, v) in stamp {
                    meta_obj.entry(k).or_insert(v);
                }
            }
        }
    }
    (request, context)
}

fn outbound_side_for(message_direction: MessageDirection) -> OutboundSide {
    match message_direction {
        MessageDirection::SourceToTarget => OutboundSide::Target,
        MessageDirection::TargetToSource => OutboundSide::Source,
    }
}

/// A thin, side-specific view onto a [`PassthroughContext`]'s transport,
/// for callers that need to speak to one side directly (pings, server-
/// initiated calls) without going through the inbound handler methods.
pub struct EndpointFacade<'a> {
    ctx: &'a PassthroughContext,
    side: OutboundSide,
}

impl EndpointFacade<'_> {
    /// Send a request directly to this side's transport, bypassing the hook
    /// chain entirely.
    ///
    /// # Errors
    ///
    /// Returns [`PassthroughError::NoTransport`] if this side isn't
    /// connected, or whatever error the transport itself reports.
    pub async fn request(&self, request: McpRequest) -> Result<McpResponse, HookChainError> {
        let (request, context) =
            prepare_outbound(request, self.ctx.options.append_metadata_to_request);
        self.ctx.call(self.side, request, context, None).await
    }

    /// Send a fire-and-forget notification directly to this side's
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns [`PassthroughError::NoTransport`] if this side isn't
    /// connected.
    pub async fn notification(&self, notification: McpNotification) -> Result<(), HookChainError> {
        let endpoint = self.ctx.endpoint(self.side)?;
        endpoint.send_notification(notification).await
    }

    /// Ping this side's transport.
    ///
    /// # Errors
    ///
    /// Returns [`PassthroughError::NoTransport`] if this side isn't
    /// connected.
    pub async fn ping(&self) -> Result<(), HookChainError> {
        let endpoint = self.ctx.endpoint(self.side)?;
        endpoint.ping(self.ctx.options.request_timeout).await
    }

    /// The underlying transport, if connected.
    #[must_use]
    pub fn transport(&self) -> Option<Arc<dyn Endpoint>> {
        self.ctx.endpoint(self.side).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{Hook, RequestOutcome};
    use crate::message::McpRequest;
    use crate::taxonomy::ChannelSet;
    use crate::transport::test_support::InMemoryEndpoint;
    use async_trait::async_trait;

    struct UppercaseHook;

    #[async_trait]
    impl Hook for UppercaseHook {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn request_channels(&self) -> ChannelSet {
            ChannelSet::of(&[Channel::ToolsCall])
        }

        async fn on_request(
            &self,
            _channel: Channel,
            mut request: McpRequest,
            _extra: &RequestExtra,
        ) -> Result<RequestOutcome, crate::error::HookError> {
            if let Some(text) = request.params.get("text").and_then(|v| v.as_str()) {
                let upper = text.to_uppercase();
                request.params["text"] = serde_json::Value::String(upper);
            }
            Ok(RequestOutcome::Continue(request))
        }
    }

    #[tokio::test]
    async fn linear_transform_reaches_target_and_response() {
        let ctx = PassthroughContext::new(
            vec![Arc::new(UppercaseHook)],
            PassthroughOptions::default(),
        );
        let target: Arc<dyn Endpoint> = Arc::new(InMemoryEndpoint::echo());
        ctx.connect(None, Some(target));

        let request = McpRequest::with_params("tools/call", 1_i64, serde_json::json!({"text": "hi"}));
        let extra = RequestExtra::new(crate::message::RequestId::Number(1));
        let response = ctx.on_source_request(request, extra).await.unwrap();

        assert_eq!(response.result.get("text").unwrap(), "HI");
        assert!(response.result.get("_meta").is_some());
        assert_eq!(ctx.metrics().requests_forwarded, 1);
    }

    #[tokio::test]
    async fn missing_target_is_rejected() {
        let ctx = PassthroughContext::new(vec![], PassthroughOptions::default());
        let request = McpRequest::new("tools/list", 1_i64);
        let extra = RequestExtra::new(crate::message::RequestId::Number(1));
        let err = ctx.on_source_request(request, extra).await.unwrap_err();
        assert_eq!(err.code, crate::error::REQUEST_REJECTED);
        assert!(err.message.contains("No client transport connected"));
    }

    #[tokio::test]
    async fn async_continuation_fires_callback_exactly_once() {
        use crate::hook::ResultOutcome;

        struct TagResult;

        #[async_trait]
        impl Hook for TagResult {
            fn name(&self) -> &str {
                "tag-result"
            }

            fn request_channels(&self) -> ChannelSet {
                ChannelSet::of(&[Channel::ToolsCall])
            }

            fn result_channels(&self) -> ChannelSet {
                ChannelSet::of(&[Channel::ToolsCall])
            }

            async fn on_request(
                &self,
                _channel: Channel,
                request: McpRequest,
                _extra: &RequestExtra,
            ) -> Result<RequestOutcome, crate::error::HookError> {
                Ok(RequestOutcome::Continue(request))
            }

            async fn on_result(
                &self,
                _channel: Channel,
                mut response: McpResponse,
                _original_request: &McpRequest,
                _extra: &RequestExtra,
            ) -> Result<ResultOutcome, crate::error::HookError> {
                if let Some(obj) = response.result.as_object_mut() {
                    obj.insert("tagged".into(), serde_json::Value::Bool(true));
                }
                Ok(ResultOutcome::Continue(response))
            }
        }

        struct AsyncHook;

        #[async_trait]
        impl Hook for AsyncHook {
            fn name(&self) -> &str {
                "async"
            }

            fn request_channels(&self) -> ChannelSet {
                ChannelSet::of(&[Channel::ToolsCall])
            }

            async fn on_request(
                &self,
                _channel: Channel,
                request: McpRequest,
                _extra: &RequestExtra,
            ) -> Result<RequestOutcome, crate::error::HookError> {
                let immediate = McpResponse::new(serde_json::json!({"status": "accepted"}));
                Ok(RequestOutcome::ContinueAsync {
                    immediate,
                    request,
                    callback: Box::new(|_result| {}),
                })
            }
        }

        // TagResult sits closer to the source than AsyncHook, so its result
        // handler must still run on the immediate response — the immediate
        // response is not exempt from the ordinary response phase.
        let ctx = PassthroughContext::new(
            vec![Arc::new(TagResult), Arc::new(AsyncHook)],
            PassthroughOptions::default(),
        );
        let target: Arc<dyn Endpoint> = Arc::new(InMemoryEndpoint::echo());
        ctx.connect(None, Some(target));

        let request = McpRequest::with_params("tools/call", 1_i64, serde_json::json!({"text": "hi"}));
        let extra = RequestExtra::new(crate::message::RequestId::Number(1));
        let response = ctx.on_source_request(request, extra).await.unwrap();
        assert_eq!(response.result.get("status").unwrap(), "accepted");
        assert_eq!(response.result.get("tagged").unwrap(), true);
        assert!(response.result.get("_meta").is_some());

        let pending = ctx.pending_continuations();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1, crate::message::RequestId::Number(1));

        ctx.close().await;
        assert!(ctx.pending_continuations().is_empty());
        assert_eq!(ctx.metrics().async_continuations_started, 1);
        assert_eq!(ctx.metrics().async_continuations_succeeded, 1);
    }
}
