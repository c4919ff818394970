//! Aqua - Equalizer Command/Response Core
//!
//! Aqua drives a parametric equalizer that lives in another process and keeps
//! a local view of its state usable while that process is slow, busy or gone.
//!
//! # Architecture
//!
//! The crate is layered bottom-up:
//! - `ipc`: correlated request/reply over a fire-and-forget transport, with a deadline
//! - `api`: typed equalizer operations and the fixed-point value codecs
//! - `state`: band model, pure reducer and the optimistic snapshot store
//! - `coordinator`: per-parameter write throttling and the session facade
//! - `response`: composed frequency response and auto-preamp

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ipc;
pub mod response;
pub mod state;

pub use config::AquaConfig;
pub use coordinator::EqualizerSession;
pub use error::{AquaError, ErrorCode, ErrorDescription, Result};
