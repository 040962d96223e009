//! Zero-phase Butterworth lowpass filtering.
//!
//! The filter is designed as a cascade of second-order sections (bilinear
//! transform of the analog Butterworth prototype with pre-warped cutoff) and
//! applied forward and backward over an odd-reflected extension of the input,
//! so the output has no net time shift and the same length as the input.

use crate::error::{JoltError, Result, Stage};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lowpass design parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Butterworth order (number of poles).
    pub order: usize,
    /// -3 dB cutoff frequency (Hz).
    pub cutoff_hz: f64,
    /// Sampling frequency of the series being filtered (Hz).
    pub sample_rate_hz: f64,
}

impl FilterConfig {
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Reflection length added at each end of the series, `3 × (order + 1)`.
    pub fn pad_len(&self) -> Result<usize> {
        self.order
            .checked_add(1)
            .and_then(|o| o.checked_mul(3))
            .ok_or_else(|| {
                JoltError::invalid_config(
                    Stage::Filter,
                    format!("filter order {} is too large", self.order),
                )
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.order < 1 {
            return Err(JoltError::invalid_config(
                Stage::Filter,
                "filter order must be at least 1",
            ));
        }
        self.pad_len()?;
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(JoltError::invalid_config(
                Stage::Filter,
                format!("sample rate must be positive, got {}", self.sample_rate_hz),
            ));
        }
        if !(self.cutoff_hz.is_finite() && self.cutoff_hz > 0.0) {
            return Err(JoltError::invalid_config(
                Stage::Filter,
                format!("cutoff must be positive, got {}", self.cutoff_hz),
            ));
        }
        if self.cutoff_hz >= self.nyquist_hz() {
            return Err(JoltError::invalid_config(
                Stage::Filter,
                format!(
                    "cutoff {} Hz must be below the Nyquist frequency {} Hz",
                    self.cutoff_hz,
                    self.nyquist_hz()
                ),
            ));
        }
        Ok(())
    }
}

/// One biquad stage, `a[0]` normalised to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SosSection {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl SosSection {
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Transposed direct-form II state after settling on a unit step.
    fn step_state(&self) -> [f64; 2] {
        let [_, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let gain = self.dc_gain();
        let z1 = b2 - a2 * gain;
        let z0 = b1 - a1 * gain + z1;
        [z0, z1]
    }
}

/// Butterworth lowpass as a cascade of second-order sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosFilter {
    order: usize,
    sections: Vec<SosSection>,
}

impl SosFilter {
    /// Design the lowpass described by `cfg`.
    pub fn design(cfg: &FilterConfig) -> Result<Self> {
        cfg.validate()?;
        let n = cfg.order;
        let fs2 = 2.0 * cfg.sample_rate_hz;
        let warped = fs2 * (PI * cfg.cutoff_hz / cfg.sample_rate_hz).tan();

        let mut sections = Vec::with_capacity((n + 1) / 2);
        if n % 2 == 1 {
            // The real analog pole at -warped maps to a single real z-plane pole.
            let pole = (fs2 - warped) / (fs2 + warped);
            let g = (1.0 - pole) / 2.0;
            sections.push(SosSection {
                b: [g, g, 0.0],
                a: [1.0, -pole, 0.0],
            });
        }
        // Most damped pair first; the pair nearest the unit circle runs last.
        for k in (0..n / 2).rev() {
            let angle = PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
            let s = Complex64::from_polar(warped, angle);
            let z = (fs2 + s) / (fs2 - s);
            let a1 = -2.0 * z.re;
            let a2 = z.norm_sqr();
            let g = (1.0 + a1 + a2) / 4.0;
            sections.push(SosSection {
                b: [g, 2.0 * g, g],
                a: [1.0, a1, a2],
            });
        }

        Ok(Self { order: n, sections })
    }

    pub fn sections(&self) -> &[SosSection] {
        &self.sections
    }

    /// Reflection length added at each end before filtering.
    pub fn pad_len(&self) -> usize {
        3 * (self.order + 1)
    }

    /// Forward-backward filtering. Output has the same length as `data`.
    pub fn filtfilt(&self, data: &[f64]) -> Result<Vec<f64>> {
        let n = data.len();
        let pad = self.pad_len();
        if n < pad + 1 {
            return Err(JoltError::InsufficientData {
                stage: Stage::Filter,
                needed: pad + 1,
                actual: n,
            });
        }

        let mut extended = Vec::with_capacity(n + 2 * pad);
        for i in (1..=pad).rev() {
            extended.push(2.0 * data[0] - data[i]);
        }
        extended.extend_from_slice(data);
        for i in 1..=pad {
            extended.push(2.0 * data[n - 1] - data[n - 1 - i]);
        }

        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();

        Ok(backward[pad..pad + n].to_vec())
    }

    /// Single causal pass, each section starting from its steady state for
    /// the first input sample.
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let mut y = input.to_vec();
        let mut level = input.first().copied().unwrap_or(0.0);
        for section in &self.sections {
            let [b0, b1, b2] = section.b;
            let [_, a1, a2] = section.a;
            let [s0, s1] = section.step_state();
            let mut z0 = s0 * level;
            let mut z1 = s1 * level;
            for sample in y.iter_mut() {
                let x = *sample;
                let out = b0 * x + z0;
                z0 = b1 * x - a1 * out + z1;
                z1 = b2 * x - a2 * out;
                *sample = out;
            }
            level *= section.dc_gain();
        }
        y
    }
}

/// Design the lowpass described by `cfg` and apply it with zero phase.
/// The series length is checked against the padding before any design work.
pub fn apply(series: &[f64], cfg: &FilterConfig) -> Result<Vec<f64>> {
    cfg.validate()?;
    let pad = cfg.pad_len()?;
    if series.len() <= pad {
        return Err(JoltError::InsufficientData {
            stage: Stage::Filter,
            needed: pad.saturating_add(1),
            actual: series.len(),
        });
    }
    SosFilter::design(cfg)?.filtfilt(series)
}
