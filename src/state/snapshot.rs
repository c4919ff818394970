//! Full equalizer state as returned by a health check

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::filter::{
    check_range, Filters, MAX_GAIN, MAX_NUM_FILTERS, MIN_GAIN, MIN_NUM_FILTERS,
};
use crate::error::{AquaError, Result};

/// Snapshot of everything the control surface shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerState {
    pub is_enabled: bool,
    pub is_auto_pre_amp_on: bool,
    pub is_graph_view_on: bool,
    pub pre_amp: f64,
    pub filters: Filters,
}

impl Default for EqualizerState {
    fn default() -> Self {
        Self {
            is_enabled: true,
            is_auto_pre_amp_on: true,
            is_graph_view_on: true,
            pre_amp: 0.0,
            filters: Filters::defaults(),
        }
    }
}

impl EqualizerState {
    /// Check every range invariant
    pub fn validate(&self) -> Result<()> {
        check_range("preamp", self.pre_amp, MIN_GAIN, MAX_GAIN)?;

        let count = self.filters.len();
        if !(MIN_NUM_FILTERS..=MAX_NUM_FILTERS).contains(&count) {
            return Err(AquaError::BandLimit {
                count,
                min: MIN_NUM_FILTERS,
                max: MAX_NUM_FILTERS,
            });
        }

        let mut seen = HashSet::with_capacity(count);
        for filter in self.filters.iter() {
            filter.validate()?;
            if !seen.insert(filter.id) {
                return Err(AquaError::DuplicateFilter { id: filter.id });
            }
        }
        Ok(())
    }
}
