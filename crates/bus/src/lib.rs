//! Push-notification bus for the quoting workflow.
//!
//! The real-time layer itself (websocket fan-in/fan-out to browsers) is an
//! external collaborator; this crate owns the contract with it: typed topics
//! rendering the exact wire channel names, typed events rendering the exact
//! event names and payload fields, and a `PushBus` seam with best-effort,
//! fire-and-forget semantics.

pub mod event;
pub mod publish;
pub mod topic;

pub use event::{
    NewQuoteReceived, NewServiceRequest, PushEvent, QuoteCancelled, QuoteSelected,
    RequestAssignedToOther, RequestCancelled,
};
pub use publish::{publish_best_effort, BroadcastHub, Envelope, NoopBus, PublishError, PushBus, RecordingBus};
pub use topic::Topic;
