//! Property-based tests for the chain-traversal symmetry invariant.
//!
//! Mirrors the `proptest!`-per-concern style of `turbomcp-transport`'s
//! `tests/property_tests.rs`: a strategy generates arbitrary inputs (here, an
//! arbitrary chain shape rather than an arbitrary config), and each property
//! asserts an invariant that must hold for every generated case rather than
//! for the handful of literal scenarios in `tests/scenarios.rs`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mcp_passthrough_hooks::pipeline::{process_request_phase, process_response_phase, RequestPhaseOutcome, ResponseOrError, ResponsePhaseOutcome};
use mcp_passthrough_hooks::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Records its own id into a shared log whenever invoked, so a test can
/// assert the exact visitation order a traversal produced.
struct RecordingHook {
    id: usize,
    implements_result: bool,
    requests: Arc<Mutex<Vec<usize>>>,
    results: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl Hook for RecordingHook {
    fn name(&self) -> &str {
        "recording"
    }

    fn request_channels(&self) -> ChannelSet {
        ChannelSet::of(&[Channel::ToolsCall])
    }

    fn result_channels(&self) -> ChannelSet {
        if self.implements_result {
            ChannelSet::of(&[Channel::ToolsCall])
        } else {
            ChannelSet::NONE
        }
    }

    async fn on_request(
        &self,
        _channel: Channel,
        request: McpRequest,
        _extra: &RequestExtra,
    ) -> Result<RequestOutcome, HookError> {
        self.requests.lock().unwrap().push(self.id);
        Ok(RequestOutcome::Continue(request))
    }

    async fn on_result(
        &self,
        _channel: Channel,
        response: McpResponse,
        _original_request: &McpRequest,
        _extra: &RequestExtra,
    ) -> Result<ResultOutcome, HookError> {
        self.results.lock().unwrap().push(self.id);
        Ok(ResultOutcome::Continue(response))
    }
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build current-thread runtime")
        .block_on(fut)
}

/// Property tests run with `tracing` enabled so a failing case's hop-by-hop
/// logging (the `trace!`/`debug!` instrumentation the pipeline phases emit
/// per hop) shows up with `--nocapture`, rather than only the bare
/// `proptest` shrink output.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}

/// `spec.md` §8 invariant 1 ("Symmetric pairing"): for every forward request
/// phase that runs to completion, the subsequent response phase visits the
/// same nodes in exactly the reverse order, skipping only nodes whose hook
/// does not implement the corresponding handler.
fn chain_traversal_is_symmetric(implements_result: Vec<bool>) {
    init_tracing();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let results = Arc::new(Mutex::new(Vec::new()));

    let hooks: Vec<Arc<dyn Hook>> = implements_result
        .iter()
        .enumerate()
        .map(|(id, &has_result)| {
            Arc::new(RecordingHook {
                id,
                implements_result: has_result,
                requests: Arc::clone(&requests),
                results: Arc::clone(&results),
            }) as Arc<dyn Hook>
        })
        .collect();
    let chain = HookChain::build(hooks);
    let extra = RequestExtra::new(RequestId::Number(1));

    let request_outcome = block_on(process_request_phase(
        &chain,
        chain.start(Direction::Forward),
        Direction::Forward,
        Channel::ToolsCall,
        McpRequest::new("tools/call", 1_i64),
        &extra,
    ));

    let (response, last_processed_node) = match request_outcome {
        RequestPhaseOutcome::Continue {
            request,
            last_processed_node,
        } => (
            McpResponse::new(serde_json::json!({ "echo": request.method })),
            last_processed_node,
        ),
        _ => panic!("RecordingHook's on_request always Continues"),
    };

    let response_outcome = block_on(process_response_phase(
        &chain,
        last_processed_node,
        Direction::Reverse,
        None,
        Channel::ToolsCall,
        ResponseOrError::Response(response),
        &McpRequest::new("tools/call", 1_i64),
        &extra,
    ));
    assert!(matches!(response_outcome, ResponsePhaseOutcome::Continue { .. }));

    let request_order = requests.lock().unwrap().clone();
    let result_order = results.lock().unwrap().clone();

    // Every hook implements a request handler, so the forward order is just 0..N.
    let expected_request_order: Vec<usize> = (0..implements_result.len()).collect();
    assert_eq!(request_order, expected_request_order);

    // The response phase walks the same chain in reverse, but only the
    // subset of nodes that actually implement a result handler are recorded.
    let expected_result_order: Vec<usize> = (0..implements_result.len())
        .rev()
        .filter(|&id| implements_result[id])
        .collect();
    assert_eq!(result_order, expected_result_order);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a fully pass-through chain of any length visits request
    /// handlers head-to-tail and result handlers tail-to-head, in exactly
    /// reverse order.
    #[test]
    fn prop_symmetric_pairing_holds_for_arbitrary_chain_shapes(
        implements_result in prop::collection::vec(any::<bool>(), 0..24)
    ) {
        chain_traversal_is_symmetric(implements_result);
    }

    /// Property: a chain where every hook implements both handlers always
    /// produces an exact mirror-image traversal (the common case S1-S3
    /// exercise literally; this checks it holds at every length, not just
    /// two or three hooks).
    #[test]
    fn prop_full_chain_is_exact_mirror(len in 0usize..24) {
        chain_traversal_is_symmetric(vec![true; len]);
    }
}
