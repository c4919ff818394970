//! Command transport
//!
//! Correlated request/reply on top of a fire-and-forget [`Transport`]. A
//! call never fails at this layer: deadlines, undecodable replies and host
//! errors all come back as a [`ReplyPayload`].

pub mod channel;
pub mod envelope;
pub mod simulated;

pub use channel::{CommandChannel, Inbox, Transport};
pub use envelope::{CommandEnvelope, CorrelationId, Reply, ReplyPayload};
pub use simulated::{Fault, SimulatedEqualizer};
