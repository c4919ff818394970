//! Snapshot store
//!
//! Holds the local view of the equalizer. Each mutation publishes a complete
//! new `Arc<EqualizerState>`; observers never see a half-applied edit.
//! Mutations are applied immediately, ahead of any confirmation from the
//! equalizer host, and are never rolled back here.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::action::FilterAction;
use super::reducer::reduce;
use super::snapshot::EqualizerState;
use crate::error::ErrorDescription;

/// Session flags that sit next to the equalizer state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStatus {
    /// A health check is running
    pub is_loading: bool,
    /// The last runtime failure; writes should be disabled while set
    pub global_error: Option<ErrorDescription>,
}

/// Local, optimistic equalizer state
#[derive(Debug)]
pub struct EqualizerStore {
    state: watch::Sender<Arc<EqualizerState>>,
    status: watch::Sender<SessionStatus>,
}

impl Default for EqualizerStore {
    fn default() -> Self {
        Self::new(EqualizerState::default())
    }
}

impl EqualizerStore {
    pub fn new(initial: EqualizerState) -> Self {
        let (state, _) = watch::channel(Arc::new(initial));
        let (status, _) = watch::channel(SessionStatus {
            is_loading: true,
            global_error: None,
        });
        Self { state, status }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<EqualizerState> {
        self.state.borrow().clone()
    }

    /// Observe every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<EqualizerState>> {
        self.state.subscribe()
    }

    /// Apply a band action
    pub fn dispatch(&self, action: FilterAction) {
        debug!(action = action.name(), target = ?action.target(), "dispatch");
        self.state.send_modify(|current| {
            let filters = reduce(&current.filters, &action);
            let mut next = EqualizerState::clone(&**current);
            next.filters = filters;
            *current = Arc::new(next);
        });
    }

    /// Replace the whole state with a confirmed one
    pub fn init(&self, state: EqualizerState) {
        info!(bands = state.filters.len(), "state initialised");
        self.state.send_modify(|current| {
            let filters = reduce(&current.filters, &FilterAction::Init(state.filters));
            *current = Arc::new(EqualizerState {
                is_enabled: state.is_enabled,
                is_auto_pre_amp_on: state.is_auto_pre_amp_on,
                is_graph_view_on: state.is_graph_view_on,
                pre_amp: state.pre_amp,
                filters,
            });
        });
    }

    pub fn set_enabled(&self, value: bool) {
        self.update(|s| s.is_enabled = value);
    }

    pub fn set_auto_preamp(&self, value: bool) {
        self.update(|s| s.is_auto_pre_amp_on = value);
    }

    pub fn set_graph_view(&self, value: bool) {
        self.update(|s| s.is_graph_view_on = value);
    }

    pub fn set_preamp(&self, value: f64) {
        self.update(|s| s.pre_amp = value);
    }

    fn update(&self, edit: impl FnOnce(&mut EqualizerState)) {
        self.state.send_modify(|current| {
            let mut next = EqualizerState::clone(&**current);
            edit(&mut next);
            *current = Arc::new(next);
        });
    }

    // ========================================================================
    // Session status
    // ========================================================================

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.status.borrow().is_loading
    }

    pub fn set_loading(&self, value: bool) {
        self.status.send_modify(|s| s.is_loading = value);
    }

    pub fn global_error(&self) -> Option<ErrorDescription> {
        self.status.borrow().global_error
    }

    pub fn set_global_error(&self, error: Option<ErrorDescription>) {
        match &error {
            Some(desc) => warn!(code = ?desc.code, "global error: {}", desc.short_error),
            None => debug!("global error cleared"),
        }
        self.status.send_modify(|s| s.global_error = error);
    }
}
