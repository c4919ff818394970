//! Request/reply framing
//!
//! A request is a [`CommandEnvelope`]; the reply is a raw JSON body tagged with
//! the same correlation id. Reply bodies decode into [`ReplyPayload`] and any
//! body that does not match one of the three shapes becomes
//! `ReplyPayload::Error(ErrorCode::Unknown)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::state::EqualizerState;

/// Ties a reply to the request that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One outgoing command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub correlation: CorrelationId,
    /// Logical target, e.g. `setFilterGain:3`
    pub channel: String,
    /// Positional arguments; meaning depends on the channel
    pub args: Vec<i64>,
}

impl CommandEnvelope {
    pub fn new(channel: impl Into<String>, args: Vec<i64>) -> Self {
        Self {
            correlation: CorrelationId::new(),
            channel: channel.into(),
            args,
        }
    }

    /// Command part of the channel name (before any `:index` suffix)
    pub fn command(&self) -> &str {
        self.channel.split(':').next().unwrap_or_default()
    }

    /// Build the reply to this envelope
    pub fn reply(&self, body: Value) -> Reply {
        Reply {
            correlation: self.correlation,
            channel: self.channel.clone(),
            body,
        }
    }
}

/// One incoming reply, as delivered by a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub correlation: CorrelationId,
    pub channel: String,
    pub body: Value,
}

/// Decoded reply content
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// `{"result": n}`
    Value(u64),
    /// `{"state": {...}}`, health check only
    State(Box<EqualizerState>),
    /// `{"errorCode": "..."}`
    Error(ErrorCode),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireReply {
    Value {
        result: u64,
    },
    State {
        state: Box<EqualizerState>,
    },
    Error {
        #[serde(rename = "errorCode")]
        error_code: ErrorCode,
    },
}

impl ReplyPayload {
    /// Decode a reply body; never fails
    pub fn decode(body: &Value) -> Self {
        match WireReply::deserialize(body) {
            Ok(WireReply::Value { result }) => ReplyPayload::Value(result),
            Ok(WireReply::State { state }) => ReplyPayload::State(state),
            Ok(WireReply::Error { error_code }) => ReplyPayload::Error(error_code),
            Err(_) => ReplyPayload::Error(ErrorCode::Unknown),
        }
    }

    pub fn value(result: u64) -> Value {
        serde_json::json!({ "result": result })
    }

    pub fn error(code: ErrorCode) -> Value {
        serde_json::json!({ "errorCode": code })
    }

    pub fn state(state: &EqualizerState) -> Value {
        serde_json::json!({ "state": state })
    }

    /// The numeric result, or the error this reply stands for
    pub fn into_value(self) -> std::result::Result<u64, ErrorCode> {
        match self {
            ReplyPayload::Value(v) => Ok(v),
            ReplyPayload::State(_) => Err(ErrorCode::Unknown),
            ReplyPayload::Error(code) => Err(code),
        }
    }

    /// The full state, or the error this reply stands for
    pub fn into_state(self) -> std::result::Result<EqualizerState, ErrorCode> {
        match self {
            ReplyPayload::State(state) => Ok(*state),
            ReplyPayload::Value(_) => Err(ErrorCode::Unknown),
            ReplyPayload::Error(code) => Err(code),
        }
    }
}
