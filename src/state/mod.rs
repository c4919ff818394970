//! Equalizer State Module
//!
//! Band model, reducer actions, the pure reducer and the snapshot store.

pub mod action;
pub mod filter;
pub mod reducer;
pub mod snapshot;
pub mod store;

pub use action::FilterAction;
pub use filter::{
    check_frequency, check_gain, check_quality, suggest_band_frequency, Filter, FilterId,
    FilterType, Filters, MAX_FREQUENCY, MAX_GAIN, MAX_NUM_FILTERS, MAX_QUALITY, MIN_FREQUENCY,
    MIN_GAIN, MIN_NUM_FILTERS, MIN_QUALITY,
};
pub use reducer::reduce;
pub use snapshot::EqualizerState;
pub use store::{EqualizerStore, SessionStatus};
