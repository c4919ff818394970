//! Bands and their value ranges
//!
//! A band is addressed by its [`FilterId`]. The collection keeps the bands in
//! slot order (the order the equalizer host knows them by), while numeric and
//! visual consumers use [`Filters::sorted_by_frequency`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AquaError, Result};

pub const MAX_GAIN: f64 = 30.0;
pub const MIN_GAIN: f64 = -30.0;

/// The host accepts up to 22050 Hz, the graph stops at 20 kHz
pub const MAX_FREQUENCY: f64 = 20000.0;
pub const MIN_FREQUENCY: f64 = 10.0;

pub const MAX_QUALITY: f64 = 999.999;
pub const MIN_QUALITY: f64 = 0.001;

pub const MAX_NUM_FILTERS: usize = 20;
pub const MIN_NUM_FILTERS: usize = 1;

/// Frequencies of the bands in a fresh state
pub const DEFAULT_FREQUENCIES: [f64; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

pub const DEFAULT_GAIN: f64 = 0.0;
pub const DEFAULT_QUALITY: f64 = 1.0;

/// Stable identity of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(Uuid);

impl FilterId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Filter shapes understood by the equalizer host
///
/// Declaration order is the wire ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Peaking bell
    #[default]
    #[serde(rename = "PK")]
    Peak,
    /// Low-pass with Q
    #[serde(rename = "LPQ")]
    LowPassQ,
    /// High-pass with Q
    #[serde(rename = "HPQ")]
    HighPassQ,
    /// Band-pass (0 dB peak)
    #[serde(rename = "BP")]
    BandPass,
    /// Low shelf, fixed slope
    #[serde(rename = "LS")]
    LowShelf,
    /// High shelf, fixed slope
    #[serde(rename = "HS")]
    HighShelf,
    /// Notch
    #[serde(rename = "NO")]
    Notch,
    /// All-pass
    #[serde(rename = "AP")]
    AllPass,
    /// Low shelf, corner frequency
    #[serde(rename = "LSC")]
    LowShelfCorner,
    /// High shelf, corner frequency
    #[serde(rename = "HSC")]
    HighShelfCorner,
    /// Butterworth low-pass
    #[serde(rename = "BWLP")]
    ButterworthLowPass,
    /// Butterworth high-pass
    #[serde(rename = "BWHP")]
    ButterworthHighPass,
    /// Linkwitz-Riley low-pass
    #[serde(rename = "LRLP")]
    LinkwitzRileyLowPass,
    /// Linkwitz-Riley high-pass
    #[serde(rename = "LRHP")]
    LinkwitzRileyHighPass,
    /// Low shelf, corner frequency with Q
    #[serde(rename = "LSCQ")]
    LowShelfCornerQ,
    /// High shelf, corner frequency with Q
    #[serde(rename = "HSCQ")]
    HighShelfCornerQ,
}

impl FilterType {
    pub const ALL: [FilterType; 16] = [
        FilterType::Peak,
        FilterType::LowPassQ,
        FilterType::HighPassQ,
        FilterType::BandPass,
        FilterType::LowShelf,
        FilterType::HighShelf,
        FilterType::Notch,
        FilterType::AllPass,
        FilterType::LowShelfCorner,
        FilterType::HighShelfCorner,
        FilterType::ButterworthLowPass,
        FilterType::ButterworthHighPass,
        FilterType::LinkwitzRileyLowPass,
        FilterType::LinkwitzRileyHighPass,
        FilterType::LowShelfCornerQ,
        FilterType::HighShelfCornerQ,
    ];

    /// Wire ordinal
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_ordinal(ordinal: u64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Short code used by the host's config format
    pub fn code(self) -> &'static str {
        match self {
            FilterType::Peak => "PK",
            FilterType::LowPassQ => "LPQ",
            FilterType::HighPassQ => "HPQ",
            FilterType::BandPass => "BP",
            FilterType::LowShelf => "LS",
            FilterType::HighShelf => "HS",
            FilterType::Notch => "NO",
            FilterType::AllPass => "AP",
            FilterType::LowShelfCorner => "LSC",
            FilterType::HighShelfCorner => "HSC",
            FilterType::ButterworthLowPass => "BWLP",
            FilterType::ButterworthHighPass => "BWHP",
            FilterType::LinkwitzRileyLowPass => "LRLP",
            FilterType::LinkwitzRileyHighPass => "LRHP",
            FilterType::LowShelfCornerQ => "LSCQ",
            FilterType::HighShelfCornerQ => "HSCQ",
        }
    }

    /// Whether the gain field shapes the response
    pub fn has_gain(self) -> bool {
        matches!(
            self,
            FilterType::Peak
                | FilterType::LowShelf
                | FilterType::HighShelf
                | FilterType::LowShelfCorner
                | FilterType::HighShelfCorner
                | FilterType::LowShelfCornerQ
                | FilterType::HighShelfCornerQ
        )
    }

    /// Whether the quality field shapes the response
    pub fn has_quality(self) -> bool {
        !matches!(self, FilterType::LowShelf | FilterType::HighShelf)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == upper)
            .ok_or_else(|| format!("unknown filter type '{}'", s))
    }
}

/// One parametric EQ stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    /// Center/corner frequency in Hz
    pub frequency: f64,
    /// Gain in dB
    pub gain: f64,
    /// Q factor
    pub quality: f64,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl Filter {
    pub fn new(id: FilterId, frequency: f64, gain: f64, quality: f64, filter_type: FilterType) -> Self {
        Self {
            id,
            frequency,
            gain,
            quality,
            filter_type,
        }
    }

    /// A flat peaking band at `frequency`
    pub fn with_frequency(id: FilterId, frequency: f64) -> Self {
        Self::new(id, frequency, DEFAULT_GAIN, DEFAULT_QUALITY, FilterType::Peak)
    }

    /// Validate band parameters
    pub fn validate(&self) -> Result<()> {
        check_frequency(self.frequency)?;
        check_gain(self.gain)?;
        check_quality(self.quality)
    }

    /// Value equality of the four fields that shape the response
    pub fn same_shape(&self, other: &Filter) -> bool {
        self.frequency == other.frequency
            && self.gain == other.gain
            && self.quality == other.quality
            && self.filter_type == other.filter_type
    }
}

pub(crate) fn check_range(param: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(AquaError::out_of_range(param, value, min, max));
    }
    Ok(())
}

pub fn check_gain(value: f64) -> Result<()> {
    check_range("gain", value, MIN_GAIN, MAX_GAIN)
}

pub fn check_frequency(value: f64) -> Result<()> {
    check_range("frequency", value, MIN_FREQUENCY, MAX_FREQUENCY)
}

pub fn check_quality(value: f64) -> Result<()> {
    check_range("quality", value, MIN_QUALITY, MAX_QUALITY)
}

/// Ordered band collection
///
/// Entries are shared; producing a new collection never touches the entries
/// of the old one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Filter>", into = "Vec<Filter>")]
pub struct Filters {
    slots: Vec<Arc<Filter>>,
}

impl From<Vec<Filter>> for Filters {
    fn from(filters: Vec<Filter>) -> Self {
        Self {
            slots: filters.into_iter().map(Arc::new).collect(),
        }
    }
}

impl From<Filters> for Vec<Filter> {
    fn from(filters: Filters) -> Self {
        filters.slots.iter().map(|f| Filter::clone(f)).collect()
    }
}

impl FromIterator<Filter> for Filters {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bands of a fresh state
    pub fn defaults() -> Self {
        DEFAULT_FREQUENCIES
            .iter()
            .map(|&f| Filter::with_frequency(FilterId::new(), f))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: FilterId) -> Option<&Filter> {
        self.slots.iter().find(|f| f.id == id).map(|f| f.as_ref())
    }

    /// Slot index the host addresses this band by
    pub fn index_of(&self, id: FilterId) -> Option<usize> {
        self.slots.iter().position(|f| f.id == id)
    }

    pub fn contains(&self, id: FilterId) -> bool {
        self.index_of(id).is_some()
    }

    /// Bands in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.slots.iter().map(|f| f.as_ref())
    }

    /// Shared entries in slot order
    pub fn entries(&self) -> &[Arc<Filter>] {
        &self.slots
    }

    pub fn ids(&self) -> Vec<FilterId> {
        self.slots.iter().map(|f| f.id).collect()
    }

    /// Bands in ascending frequency
    pub fn sorted_by_frequency(&self) -> Vec<&Filter> {
        let mut sorted: Vec<&Filter> = self.iter().collect();
        sorted.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        sorted
    }

    pub(crate) fn with_replaced(&self, index: usize, filter: Filter) -> Self {
        let mut slots = self.slots.clone();
        slots[index] = Arc::new(filter);
        Self { slots }
    }

    pub(crate) fn with_pushed(&self, filter: Filter) -> Self {
        let mut slots = self.slots.clone();
        slots.push(Arc::new(filter));
        Self { slots }
    }

    pub(crate) fn with_removed(&self, index: usize) -> Self {
        let mut slots = self.slots.clone();
        slots.remove(index);
        Self { slots }
    }
}

/// Suggested frequency for a band inserted at `position` in frequency order
///
/// Geometric mean of the neighbours, with the graph limits standing in at
/// either end.
pub fn suggest_band_frequency(sorted: &[&Filter], position: usize) -> f64 {
    let position = position.min(sorted.len());
    let lo = if position == 0 {
        MIN_FREQUENCY
    } else {
        sorted[position - 1].frequency
    };
    let hi = if position == sorted.len() {
        MAX_FREQUENCY
    } else {
        sorted[position].frequency
    };

    let exponent = (lo.log10() + hi.log10()) / 2.0;
    10f64.powf(exponent).round()
}
