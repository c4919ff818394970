//! Biquad magnitude response
//!
//! Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2),
//! normalized so a0 = 1.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::state::{FilterType, MAX_QUALITY, MIN_FREQUENCY, MIN_QUALITY};

/// Sample rate the response is evaluated at
pub const SAMPLE_RATE: f64 = 48_000.0;

/// Lowest magnitude reported, in dB
const FLOOR_DB: f64 = -120.0;

/// Biquad filter coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Calculate coefficients using the Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    ///
    /// Linkwitz-Riley types yield one of their two Butterworth sections;
    /// use [`BandResponse`] for the cascaded response.
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        let freq = frequency.clamp(MIN_FREQUENCY, sample_rate / 2.0 - 1.0);
        // fixed-slope shelves
        let q = if filter_type.has_quality() {
            q.clamp(MIN_QUALITY, MAX_QUALITY)
        } else {
            FRAC_1_SQRT_2
        };
        let gain_db = if filter_type.has_gain() { gain_db } else { 0.0 };

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = 10f64.powf(gain_db / 40.0);

        let low_pass = || {
            (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            )
        };
        let high_pass = || {
            (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            )
        };
        let low_shelf = || {
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            )
        };
        let high_shelf = || {
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            )
        };

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowPassQ
            | FilterType::ButterworthLowPass
            | FilterType::LinkwitzRileyLowPass => low_pass(),
            FilterType::HighPassQ
            | FilterType::ButterworthHighPass
            | FilterType::LinkwitzRileyHighPass => high_pass(),
            // constant 0 dB peak gain
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::AllPass => (
                1.0 - alpha,
                -2.0 * cos_w0,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::LowShelf | FilterType::LowShelfCorner | FilterType::LowShelfCornerQ => {
                low_shelf()
            }
            FilterType::HighShelf | FilterType::HighShelfCorner | FilterType::HighShelfCornerQ => {
                high_shelf()
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude in dB at `frequency`
    pub fn magnitude_db(&self, sample_rate: f64, frequency: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        let num = num_re * num_re + num_im * num_im;
        let den = den_re * den_re + den_im * den_im;
        if den <= f64::MIN_POSITIVE {
            return -FLOOR_DB;
        }
        (10.0 * (num / den).log10()).max(FLOOR_DB)
    }
}

/// Response of one band, ready to be sampled
#[derive(Debug, Clone, Copy)]
pub struct BandResponse {
    coeffs: BiquadCoeffs,
    sections: f64,
}

impl BandResponse {
    pub fn new(filter_type: FilterType, center: f64, gain_db: f64, q: f64) -> Self {
        let sections = match filter_type {
            FilterType::LinkwitzRileyLowPass | FilterType::LinkwitzRileyHighPass => 2.0,
            _ => 1.0,
        };
        Self {
            coeffs: BiquadCoeffs::calculate(filter_type, SAMPLE_RATE, center, gain_db, q),
            sections,
        }
    }

    /// Magnitude at `frequency`, in dB
    pub fn at(&self, frequency: f64) -> f64 {
        self.sections * self.coeffs.magnitude_db(SAMPLE_RATE, frequency)
    }
}

/// Magnitude of one band at `frequency`, in dB
pub fn magnitude_db(
    filter_type: FilterType,
    center: f64,
    gain_db: f64,
    q: f64,
    frequency: f64,
) -> f64 {
    BandResponse::new(filter_type, center, gain_db, q).at(frequency)
}
