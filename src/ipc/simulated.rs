//! In-process equalizer host
//!
//! Speaks the same command protocol as the real host and keeps its state in
//! fixed-point form, the way the host does. Faults and reply latency can be
//! injected to exercise the error paths of the layers above.

use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use super::channel::{Inbox, Transport};
use super::envelope::{CommandEnvelope, ReplyPayload};
use crate::api::codec;
use crate::api::Command;
use crate::error::ErrorCode;
use crate::state::{
    EqualizerState, Filter, FilterId, FilterType, Filters, MAX_NUM_FILTERS, MIN_NUM_FILTERS,
};

/// Injected failure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    NotInstalled,
    NotRunning,
    NotReady,
    /// Never reply
    Silent,
    /// Reply with a body that matches no known shape
    Malformed,
}

impl FromStr for Fault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "notinstalled" => Ok(Fault::NotInstalled),
            "notrunning" => Ok(Fault::NotRunning),
            "notready" => Ok(Fault::NotReady),
            "silent" => Ok(Fault::Silent),
            "malformed" => Ok(Fault::Malformed),
            _ => Err(format!("Unknown fault: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
struct HostBand {
    id: FilterId,
    frequency: i64,
    gain: i64,
    quality: i64,
    filter_type: u32,
}

#[derive(Debug, Clone)]
struct HostState {
    enabled: bool,
    auto_preamp: bool,
    graph_view: bool,
    preamp: i64,
    bands: Vec<HostBand>,
}

impl From<&EqualizerState> for HostState {
    fn from(state: &EqualizerState) -> Self {
        Self {
            enabled: state.is_enabled,
            auto_preamp: state.is_auto_pre_amp_on,
            graph_view: state.is_graph_view_on,
            preamp: codec::encode_gain(state.pre_amp),
            bands: state
                .filters
                .iter()
                .map(|f| HostBand {
                    id: f.id,
                    frequency: codec::encode_frequency(f.frequency),
                    gain: codec::encode_gain(f.gain),
                    quality: codec::encode_quality(f.quality),
                    filter_type: f.filter_type.ordinal(),
                })
                .collect(),
        }
    }
}

impl HostState {
    fn to_state(&self) -> EqualizerState {
        let filters: Filters = self
            .bands
            .iter()
            .map(|b| {
                Filter::new(
                    b.id,
                    b.frequency as f64,
                    b.gain as f64 / 1000.0,
                    b.quality as f64 / 1000.0,
                    FilterType::from_ordinal(u64::from(b.filter_type)).unwrap_or_default(),
                )
            })
            .collect();
        EqualizerState {
            is_enabled: self.enabled,
            is_auto_pre_amp_on: self.auto_preamp,
            is_graph_view_on: self.graph_view,
            pre_amp: self.preamp as f64 / 1000.0,
            filters,
        }
    }
}

#[derive(Debug)]
struct Inner {
    host: HostState,
    fault: Option<Fault>,
    latency: Duration,
    received: Vec<CommandEnvelope>,
}

/// A [`Transport`] that answers locally
#[derive(Debug)]
pub struct SimulatedEqualizer {
    inbox: Inbox,
    inner: Mutex<Inner>,
}

impl SimulatedEqualizer {
    pub fn new(inbox: Inbox, initial: &EqualizerState) -> Self {
        Self {
            inbox,
            inner: Mutex::new(Inner {
                host: HostState::from(initial),
                fault: None,
                latency: Duration::ZERO,
                received: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        self.lock().fault = fault;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Everything sent so far, in order
    pub fn received(&self) -> Vec<CommandEnvelope> {
        self.lock().received.clone()
    }

    pub fn received_count(&self) -> usize {
        self.lock().received.len()
    }

    /// Host-side state as a health check would report it
    pub fn host_state(&self) -> EqualizerState {
        self.lock().host.to_state()
    }

    fn respond(inner: &mut Inner, envelope: &CommandEnvelope) -> Option<Value> {
        match inner.fault {
            Some(Fault::NotInstalled) => return Some(ReplyPayload::error(ErrorCode::NotInstalled)),
            Some(Fault::NotRunning) => return Some(ReplyPayload::error(ErrorCode::NotRunning)),
            Some(Fault::NotReady) => return Some(ReplyPayload::error(ErrorCode::NotReady)),
            Some(Fault::Silent) => return None,
            Some(Fault::Malformed) => return Some(serde_json::json!({ "result": "garbage" })),
            None => {}
        }

        let Ok(command) = envelope.channel.parse::<Command>() else {
            return Some(ReplyPayload::error(ErrorCode::Unknown));
        };
        let reply = Self::execute(&mut inner.host, command, &envelope.args);
        Some(match reply {
            Ok(Reply::Value(v)) => ReplyPayload::value(v),
            Ok(Reply::State(state)) => ReplyPayload::state(&state),
            Err(code) => ReplyPayload::error(code),
        })
    }

    fn execute(host: &mut HostState, command: Command, args: &[i64]) -> Result<Reply, ErrorCode> {
        const ACK: Result<Reply, ErrorCode> = Ok(Reply::Value(1));

        let arg = |i: usize| args.get(i).copied().ok_or(ErrorCode::Unknown);
        let band_index = |host: &HostState| -> Result<usize, ErrorCode> {
            let index = usize::try_from(arg(0)?).map_err(|_| ErrorCode::Unknown)?;
            if index < host.bands.len() {
                Ok(index)
            } else {
                Err(ErrorCode::Unknown)
            }
        };

        match command {
            Command::HealthCheck => Ok(Reply::State(Box::new(host.to_state()))),
            Command::GetEnable => Ok(Reply::Value(u64::from(host.enabled))),
            Command::SetEnable => {
                host.enabled = arg(0)? != 0;
                ACK
            }
            Command::SetAutoPreAmp => {
                host.auto_preamp = arg(0)? != 0;
                ACK
            }
            Command::GetPreAmp => Ok(Reply::Value(codec::wrap_unsigned(host.preamp))),
            Command::SetPreAmp => {
                host.preamp = arg(0)?;
                ACK
            }
            Command::GetFilterGain => {
                let i = band_index(host)?;
                Ok(Reply::Value(codec::wrap_unsigned(host.bands[i].gain)))
            }
            Command::SetFilterGain => {
                let i = band_index(host)?;
                host.bands[i].gain = arg(1)?;
                ACK
            }
            Command::GetFilterFrequency => {
                let i = band_index(host)?;
                Ok(Reply::Value(codec::wrap_unsigned(host.bands[i].frequency)))
            }
            Command::SetFilterFrequency => {
                let i = band_index(host)?;
                host.bands[i].frequency = arg(1)?;
                ACK
            }
            Command::GetFilterQuality => {
                let i = band_index(host)?;
                Ok(Reply::Value(codec::wrap_unsigned(host.bands[i].quality)))
            }
            Command::SetFilterQuality => {
                let i = band_index(host)?;
                host.bands[i].quality = arg(1)?;
                ACK
            }
            Command::GetFilterType => {
                let i = band_index(host)?;
                Ok(Reply::Value(u64::from(host.bands[i].filter_type)))
            }
            Command::SetFilterType => {
                let i = band_index(host)?;
                let ordinal = u64::try_from(arg(1)?).map_err(|_| ErrorCode::Unknown)?;
                let filter_type = FilterType::from_ordinal(ordinal).ok_or(ErrorCode::Unknown)?;
                host.bands[i].filter_type = filter_type.ordinal();
                ACK
            }
            Command::GetFilterCount => Ok(Reply::Value(host.bands.len() as u64)),
            Command::AddFilter => {
                if host.bands.len() >= MAX_NUM_FILTERS {
                    return Err(ErrorCode::Unknown);
                }
                host.bands.push(HostBand {
                    id: FilterId::new(),
                    frequency: arg(0)?,
                    gain: 0,
                    quality: codec::encode_quality(1.0),
                    filter_type: FilterType::Peak.ordinal(),
                });
                ACK
            }
            Command::RemoveFilter => {
                let i = band_index(host)?;
                if host.bands.len() <= MIN_NUM_FILTERS {
                    return Err(ErrorCode::Unknown);
                }
                host.bands.remove(i);
                ACK
            }
        }
    }
}

enum Reply {
    Value(u64),
    State(Box<EqualizerState>),
}

impl Transport for SimulatedEqualizer {
    fn send(&self, envelope: CommandEnvelope) {
        let (body, latency) = {
            let mut inner = self.lock();
            inner.received.push(envelope.clone());
            let body = Self::respond(&mut inner, &envelope);
            (body, inner.latency)
        };

        let Some(body) = body else {
            debug!(channel = %envelope.channel, "silent fault, no reply");
            return;
        };
        let reply = envelope.reply(body);

        if latency.is_zero() {
            self.inbox.deliver(reply);
            return;
        }

        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if !inbox.deliver(reply) {
                trace!("late reply discarded");
            }
        });
    }
}
