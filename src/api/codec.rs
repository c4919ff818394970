//! Fixed-point value codecs
//!
//! Gain, preamp and quality travel as thousandths in a signed integer
//! argument. The host answers reads with the same integer reinterpreted as an
//! unsigned 32-bit word, so negative gains come back offset by 2^32.

use crate::state::{
    FilterType, MAX_FREQUENCY, MAX_GAIN, MAX_QUALITY, MIN_FREQUENCY, MIN_GAIN, MIN_QUALITY,
};

/// 2^32, the offset a negative fixed-point value gains on the way back
pub const OVERFLOW_OFFSET: f64 = 4_294_967_296.0;

const MILLI: f64 = 1000.0;

/// Reinterpret a signed fixed-point value as the unsigned word the host replies with
pub fn wrap_unsigned(raw: i64) -> u64 {
    raw.rem_euclid(1 << 32) as u64
}

/// Gain in dB to a thousandths argument
pub fn encode_gain(value: f64) -> i64 {
    (value * MILLI).round() as i64
}

/// Unsigned reply word to gain in dB, always within [-30, 30]
pub fn decode_gain(raw: u64) -> f64 {
    let raw = raw as f64;
    let direct = raw / MILLI;
    let wrapped = (raw - OVERFLOW_OFFSET) / MILLI;

    if direct > MAX_GAIN && wrapped > 0.0 {
        return MIN_GAIN;
    }
    let gain = if direct > MAX_GAIN { wrapped } else { direct };
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

/// Frequency travels as whole hertz
pub fn encode_frequency(value: f64) -> i64 {
    value.round() as i64
}

pub fn decode_frequency(raw: u64) -> f64 {
    (raw as f64).clamp(MIN_FREQUENCY, MAX_FREQUENCY)
}

pub fn encode_quality(value: f64) -> i64 {
    (value * MILLI).round() as i64
}

pub fn decode_quality(raw: u64) -> f64 {
    (raw as f64 / MILLI).clamp(MIN_QUALITY, MAX_QUALITY)
}

pub fn encode_type(value: FilterType) -> i64 {
    value.ordinal() as i64
}

/// None for ordinals outside the catalogue
pub fn decode_type(raw: u64) -> Option<FilterType> {
    FilterType::from_ordinal(raw)
}

pub fn encode_bool(value: bool) -> i64 {
    i64::from(value)
}

pub fn decode_bool(raw: u64) -> bool {
    raw != 0
}
