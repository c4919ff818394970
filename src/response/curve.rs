//! Composed frequency response and auto-preamp
//!
//! Band curves are sampled on a fixed logarithmic grid and summed in dB. A
//! band is evaluated only inside its effective range; outside it the curve is
//! held at the boundary value.

use std::collections::HashMap;
use std::f64::consts::LN_2;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::trace;

use super::biquad::BandResponse;
use crate::state::{
    Filter, FilterId, FilterType, Filters, MAX_FREQUENCY, MAX_GAIN, MIN_FREQUENCY, MIN_GAIN,
};

/// Grid density
pub const POINTS_PER_DECADE: usize = 100;

/// Widest effective range either side of the centre, in octaves
const MAX_HALF_SPAN_OCTAVES: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponsePoint {
    pub frequency: f64,
    pub gain: f64,
}

/// Composed curve plus the correction that keeps it at or below 0 dB
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyResponse {
    pub points: Vec<ResponsePoint>,
    pub auto_preamp: f64,
}

impl FrequencyResponse {
    /// Highest point of the composed curve
    pub fn peak(&self) -> Option<ResponsePoint> {
        self.points
            .iter()
            .copied()
            .max_by(|a, b| a.gain.total_cmp(&b.gain))
    }
}

/// Log-spaced sample points from `MIN_FREQUENCY` to `MAX_FREQUENCY`
pub fn frequency_grid() -> Vec<f64> {
    let per_decade = POINTS_PER_DECADE as f64;
    let steps = ((MAX_FREQUENCY / MIN_FREQUENCY).log10() * per_decade).ceil() as usize;
    (0..=steps)
        .map(|k| (MIN_FREQUENCY * 10f64.powf(k as f64 / per_decade)).min(MAX_FREQUENCY))
        .collect()
}

/// Frequencies between which a band's shape is evaluated
pub fn effective_range(filter: &Filter) -> (f64, f64) {
    let q = if filter.filter_type.has_quality() {
        filter.quality
    } else {
        std::f64::consts::FRAC_1_SQRT_2
    };
    let bandwidth = 2.0 / LN_2 * (1.0 / (2.0 * q)).asinh();

    let min_half_span = match filter.filter_type {
        FilterType::Peak | FilterType::BandPass | FilterType::Notch | FilterType::AllPass => 3.0,
        _ => 6.0,
    };
    let half_span = (5.0 * bandwidth).clamp(min_half_span, MAX_HALF_SPAN_OCTAVES);
    let ratio = 2f64.powf(half_span);

    (
        (filter.frequency / ratio).max(MIN_FREQUENCY),
        (filter.frequency * ratio).min(MAX_FREQUENCY),
    )
}

/// One band sampled on `grid`, in dB
pub fn band_curve(filter: &Filter, grid: &[f64]) -> Vec<f64> {
    let response = BandResponse::new(
        filter.filter_type,
        filter.frequency,
        filter.gain,
        filter.quality,
    );
    let (lo, hi) = effective_range(filter);
    let lo_db = response.at(lo);
    let hi_db = response.at(hi);

    grid.iter()
        .map(|&f| {
            if f < lo {
                lo_db
            } else if f > hi {
                hi_db
            } else {
                response.at(f)
            }
        })
        .collect()
}

/// Correction that brings the composed peak to 0 dB
pub fn auto_preamp_for(composed_peak: f64, preamp: f64) -> f64 {
    let correction = (-(composed_peak - preamp)).clamp(MIN_GAIN, MAX_GAIN);
    // + 0.0 turns -0.0 into 0.0
    (correction * 100.0).round() / 100.0 + 0.0
}

/// Counters for the band curve memo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct CachedCurve {
    shape: Filter,
    curve: Arc<[f64]>,
}

#[derive(Debug, Default)]
struct Memo {
    curves: HashMap<FilterId, CachedCurve>,
    hits: u64,
    misses: u64,
}

/// Response calculator with per-band memoisation
#[derive(Debug)]
pub struct ResponseEngine {
    grid: Vec<f64>,
    memo: Mutex<Memo>,
}

impl Default for ResponseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEngine {
    pub fn new() -> Self {
        Self {
            grid: frequency_grid(),
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Composed curve of `filters` shifted by `preamp`
    pub fn compute(&self, filters: &Filters, preamp: f64) -> FrequencyResponse {
        let mut composed = vec![preamp; self.grid.len()];

        if filters.is_empty() {
            return FrequencyResponse {
                points: self.points(composed),
                auto_preamp: 0.0,
            };
        }

        for curve in self.band_curves(filters) {
            for (total, band) in composed.iter_mut().zip(curve.iter()) {
                *total += band;
            }
        }

        let peak = composed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        FrequencyResponse {
            auto_preamp: auto_preamp_for(peak, preamp),
            points: self.points(composed),
        }
    }

    /// Auto-preamp value only
    pub fn auto_preamp(&self, filters: &Filters, preamp: f64) -> f64 {
        self.compute(filters, preamp).auto_preamp
    }

    pub fn cache_stats(&self) -> CacheStats {
        let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: memo.hits,
            misses: memo.misses,
            entries: memo.curves.len(),
        }
    }

    fn band_curves(&self, filters: &Filters) -> Vec<Arc<[f64]>> {
        let mut guard = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        let memo = &mut *guard;
        let mut curves = Vec::with_capacity(filters.len());

        for filter in filters.iter() {
            match memo.curves.get(&filter.id) {
                Some(cached) if cached.shape.same_shape(filter) => {
                    memo.hits += 1;
                    curves.push(cached.curve.clone());
                }
                _ => {
                    memo.misses += 1;
                    trace!(id = %filter.id, "band curve computed");
                    let curve: Arc<[f64]> = band_curve(filter, &self.grid).into();
                    memo.curves.insert(
                        filter.id,
                        CachedCurve {
                            shape: filter.clone(),
                            curve: curve.clone(),
                        },
                    );
                    curves.push(curve);
                }
            }
        }

        memo.curves.retain(|id, _| filters.contains(*id));
        curves
    }

    fn points(&self, gains: Vec<f64>) -> Vec<ResponsePoint> {
        self.grid
            .iter()
            .zip(gains)
            .map(|(&frequency, gain)| ResponsePoint { frequency, gain })
            .collect()
    }
}
