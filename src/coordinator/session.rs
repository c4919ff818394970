//! Equalizer session
//!
//! The entry point for a control surface. Every write follows the same path:
//! validate, apply to the store, pass the throttle, send. A failed send
//! raises the store's global error and leaves the optimistic value in place;
//! the caller recovers with [`EqualizerSession::health_check`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use super::throttle::{Throttle, ThrottledWrite};
use crate::api::EqualizerApi;
use crate::config::AquaConfig;
use crate::error::{AquaError, Result};
use crate::ipc::{CommandChannel, Inbox, Transport};
use crate::response::{FrequencyResponse, ResponseEngine};
use crate::state::{
    check_frequency, check_gain, check_quality, suggest_band_frequency, EqualizerState,
    EqualizerStore, FilterAction, FilterId, FilterType, MAX_NUM_FILTERS, MIN_NUM_FILTERS,
};

/// A parameter with its own write throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteTarget {
    Preamp,
    Gain(FilterId),
    Frequency(FilterId),
    Quality(FilterId),
}

impl WriteTarget {
    fn band(self) -> Option<FilterId> {
        match self {
            WriteTarget::Preamp => None,
            WriteTarget::Gain(id) | WriteTarget::Frequency(id) | WriteTarget::Quality(id) => {
                Some(id)
            }
        }
    }
}

/// What happened to a throttled write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Sent and acknowledged
    Sent,
    /// Applied locally only; superseded by a later write
    Throttled,
}

pub struct EqualizerSession {
    api: EqualizerApi,
    store: EqualizerStore,
    config: AquaConfig,
    throttles: Mutex<HashMap<WriteTarget, Arc<Throttle>>>,
    response: ResponseEngine,
}

impl EqualizerSession {
    pub fn new(api: EqualizerApi, config: AquaConfig) -> Self {
        Self {
            api,
            store: EqualizerStore::default(),
            config,
            throttles: Mutex::new(HashMap::new()),
            response: ResponseEngine::new(),
        }
    }

    /// Wire a session to a transport whose replies arrive through `inbox`
    pub fn connect(transport: Arc<dyn Transport>, inbox: Inbox, config: AquaConfig) -> Self {
        let channel = CommandChannel::new(transport, inbox, config.ipc_timeout);
        Self::new(EqualizerApi::new(channel), config)
    }

    pub fn store(&self) -> &EqualizerStore {
        &self.store
    }

    pub fn api(&self) -> &EqualizerApi {
        &self.api
    }

    pub fn config(&self) -> &AquaConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<EqualizerState> {
        self.store.snapshot()
    }

    /// Fetch the full state and replace the local one
    ///
    /// Clears the global error on success, sets it on failure.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        self.store.set_loading(true);
        let result = self.api.health_check().await;
        let outcome = match result {
            Ok(state) => {
                self.store.init(state);
                self.prune_throttles();
                self.store.set_global_error(None);
                Ok(())
            }
            Err(e) => Err(self.raise(e)),
        };
        self.store.set_loading(false);
        outcome
    }

    pub async fn set_enabled(&self, value: bool) -> Result<()> {
        self.store.set_enabled(value);
        self.confirm(self.api.set_enable(value).await)
    }

    /// Toggle auto-preamp; switching it on applies the correction right away
    pub async fn set_auto_preamp(&self, value: bool) -> Result<()> {
        self.store.set_auto_preamp(value);
        self.confirm(self.api.set_auto_preamp(value).await)?;
        if value {
            self.refresh_auto_preamp().await?;
        }
        Ok(())
    }

    /// Local display preference, never sent
    pub fn set_graph_view(&self, value: bool) {
        self.store.set_graph_view(value);
    }

    pub async fn set_preamp(&self, value: f64) -> Result<WriteOutcome> {
        check_gain(value)?;
        self.throttled(
            WriteTarget::Preamp,
            value,
            |&value| self.store.set_preamp(value),
            |value| self.api.set_preamp(value),
        )
        .await
    }

    pub async fn set_gain(&self, id: FilterId, value: f64) -> Result<WriteOutcome> {
        check_gain(value)?;
        let index = self.index_of(id)?;
        self.throttled(
            WriteTarget::Gain(id),
            value,
            |&value| self.store.dispatch(FilterAction::Gain { id, value }),
            |value| self.api.set_gain(index, value),
        )
        .await
    }

    /// The host keeps whole Hz, so the stored value is rounded the same way
    pub async fn set_frequency(&self, id: FilterId, value: f64) -> Result<WriteOutcome> {
        check_frequency(value)?;
        let value = value.round();
        let index = self.index_of(id)?;
        self.throttled(
            WriteTarget::Frequency(id),
            value,
            |&value| self.store.dispatch(FilterAction::Frequency { id, value }),
            |value| self.api.set_frequency(index, value),
        )
        .await
    }

    pub async fn set_quality(&self, id: FilterId, value: f64) -> Result<WriteOutcome> {
        check_quality(value)?;
        let index = self.index_of(id)?;
        self.throttled(
            WriteTarget::Quality(id),
            value,
            |&value| self.store.dispatch(FilterAction::Quality { id, value }),
            |value| self.api.set_quality(index, value),
        )
        .await
    }

    /// Type changes are discrete and go out unthrottled
    pub async fn set_type(&self, id: FilterId, value: FilterType) -> Result<()> {
        let index = self.index_of(id)?;
        self.store.dispatch(FilterAction::Type { id, value });
        self.confirm(self.api.set_type(index, value).await)
    }

    /// Append a band; without a frequency one is suggested above the highest band
    pub async fn add_band(&self, frequency: Option<f64>) -> Result<FilterId> {
        let snapshot = self.store.snapshot();
        let count = snapshot.filters.len();
        if count >= MAX_NUM_FILTERS {
            return Err(AquaError::BandLimit {
                count: count + 1,
                min: MIN_NUM_FILTERS,
                max: MAX_NUM_FILTERS,
            });
        }

        let frequency = match frequency {
            Some(f) => f,
            None => {
                let sorted = snapshot.filters.sorted_by_frequency();
                suggest_band_frequency(&sorted, sorted.len())
            }
        };
        check_frequency(frequency)?;
        let frequency = frequency.round();

        let id = FilterId::new();
        self.store.dispatch(FilterAction::Add { id, frequency });
        info!(%id, frequency, "band added");
        self.confirm(self.api.add_band(frequency).await)?;
        Ok(id)
    }

    pub async fn remove_band(&self, id: FilterId) -> Result<()> {
        let index = self.index_of(id)?;
        let count = self.store.snapshot().filters.len();
        if count <= MIN_NUM_FILTERS {
            return Err(AquaError::BandLimit {
                count: count - 1,
                min: MIN_NUM_FILTERS,
                max: MAX_NUM_FILTERS,
            });
        }

        self.store.dispatch(FilterAction::Remove { id });
        self.prune_throttles();
        info!(%id, index, "band removed");
        self.confirm(self.api.remove_band(index).await)
    }

    /// Response of the current snapshot
    pub fn response(&self) -> FrequencyResponse {
        let snapshot = self.store.snapshot();
        self.response.compute(&snapshot.filters, snapshot.pre_amp)
    }

    pub fn response_engine(&self) -> &ResponseEngine {
        &self.response
    }

    /// Recompute the response; with auto-preamp on, push the correction
    pub async fn refresh_auto_preamp(&self) -> Result<FrequencyResponse> {
        let snapshot = self.store.snapshot();
        let response = self.response.compute(&snapshot.filters, snapshot.pre_amp);

        if snapshot.is_auto_pre_amp_on && response.auto_preamp != snapshot.pre_amp {
            debug!(from = snapshot.pre_amp, to = response.auto_preamp, "auto-preamp");
            self.set_preamp(response.auto_preamp).await?;
        }
        Ok(response)
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn index_of(&self, id: FilterId) -> Result<usize> {
        self.store
            .snapshot()
            .filters
            .index_of(id)
            .ok_or(AquaError::UnknownFilter { id })
    }

    async fn throttled<A, W, Fut>(
        &self,
        target: WriteTarget,
        value: f64,
        apply: A,
        write: W,
    ) -> Result<WriteOutcome>
    where
        A: Fn(&f64),
        W: Fn(f64) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let writer = ThrottledWrite::with_throttle(self.throttle_for(target), apply, write);
        match writer.call(value).await {
            Some(result) => self.confirm(result).map(|()| WriteOutcome::Sent),
            None => {
                debug!(?target, "write throttled");
                Ok(WriteOutcome::Throttled)
            }
        }
    }

    fn throttle_for(&self, target: WriteTarget) -> Arc<Throttle> {
        let mut throttles = self.throttles.lock().unwrap_or_else(PoisonError::into_inner);
        throttles
            .entry(target)
            .or_insert_with(|| Throttle::new(self.config.throttle_interval))
            .clone()
    }

    fn prune_throttles(&self) {
        let filters = self.store.snapshot().filters.clone();
        let mut throttles = self.throttles.lock().unwrap_or_else(PoisonError::into_inner);
        throttles.retain(|target, _| target.band().map_or(true, |id| filters.contains(id)));
    }

    /// Record a runtime failure as the global error
    fn confirm<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.raise(e))
    }

    fn raise(&self, error: AquaError) -> AquaError {
        if let Some(description) = error.description() {
            self.store.set_global_error(Some(*description));
        }
        error
    }
}
