//! Frequency response and auto-preamp
//!
//! [`ResponseEngine`] composes the per-band biquad magnitude curves on a
//! logarithmic grid and derives the preamp correction that keeps the peak of
//! the composed curve at 0 dB.

pub mod biquad;
pub mod curve;

pub use biquad::{magnitude_db, BandResponse, BiquadCoeffs, SAMPLE_RATE};
pub use curve::{
    auto_preamp_for, band_curve, effective_range, frequency_grid, CacheStats, FrequencyResponse,
    ResponseEngine, ResponsePoint, POINTS_PER_DECADE,
};
