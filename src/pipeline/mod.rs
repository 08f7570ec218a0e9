//! The Pipeline Processor — the heart of the system.
//!
//! Three independent entry points, one per phase, all parameterized by a
//! [`crate::taxonomy::Channel`], a [`crate::chain::HookChain`], and a
//! [`crate::taxonomy::Direction`]:
//!
//! - [`request::process_request_phase`]
//! - [`response::process_response_phase`]
//! - [`notification::process_notification_phase`]
//!
//! Orchestrating these three (calling the target transport between the
//! request and response phases, and spawning the detached continuation a
//! `continueAsync` outcome requires) is [`crate::passthrough::PassthroughContext`]'s
//! job, not this module's — the Pipeline Processor itself never talks to a
//! transport. That separation is what table row C in `spec.md` §2 means by
//! "Generic engine ... returns a terminal outcome" versus row E's "glue".

pub mod notification;
pub mod request;
pub mod response;

use futures_util::FutureExt;

use crate::chain::NodeId;
use crate::error::{adapt_error, adapt_panic, HookChainError, HookError};

pub use notification::{process_notification_phase, NotificationPhaseOutcome};
pub use request::{process_request_phase, RequestPhaseOutcome};
pub use response::{process_response_phase, ResponseOrError, ResponsePhaseOutcome};

/// Run a hook handler, catching both an `Err` return and a panic, and
/// normalize either into a [`HookChainError`] via the Error Adapter.
///
/// This is what makes "no error is fatal to the process" (`spec.md` §7)
/// true even for a hook that panics mid-handler: the panic is caught at the
/// hop boundary and converted exactly like a thrown error would be.
pub(crate) async fn invoke<F, T>(fut: F) -> Result<T, HookChainError>
where
    F: std::future::Future<Output = Result<T, HookError>>,
{
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(adapt_error(err)),
        Err(panic) => Err(adapt_panic(panic)),
    }
}

/// Marker carried by every phase outcome: the node at which processing
/// stopped. The pairing key between request and response phases.
pub type LastProcessedNode = Option<NodeId>;
