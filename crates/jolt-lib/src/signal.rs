use crate::error::{JoltError, Result, Stage};
use serde::{Deserialize, Serialize};

/// Standard gravity (m/s²) used to express force in multiples of body weight.
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
    /// Time in seconds of sample `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.fs
    }
}

/// Region of interest as an inclusive `[start, end]` sample range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub start: usize,
    pub end: usize,
}

impl Roi {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Borrow the samples covered by the ROI.
    pub fn slice<'a>(&self, data: &'a [f64]) -> Result<&'a [f64]> {
        if self.is_empty() {
            return Err(JoltError::invalid_config(
                Stage::Pipeline,
                format!("roi start {} is after end {}", self.start, self.end),
            ));
        }
        if self.end >= data.len() {
            return Err(JoltError::invalid_config(
                Stage::Pipeline,
                format!(
                    "roi end {} is outside a series of {} samples",
                    self.end,
                    data.len()
                ),
            ));
        }
        Ok(&data[self.start..self.start + self.len()])
    }
}

/// Euclidean norm of simultaneous three-axis readings.
pub fn resultant(x: &[f64], y: &[f64], z: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((a, b), c)| (a * a + b * b + c * c).sqrt())
        .collect()
}

/// Express a force series in multiples of body weight (`mass × gravity`).
pub fn normalize_body_weight(data: &[f64], body_mass_kg: f64, gravity: f64) -> Result<Vec<f64>> {
    if !(body_mass_kg.is_finite() && body_mass_kg > 0.0) {
        return Err(JoltError::invalid_config(
            Stage::Pipeline,
            format!("body mass must be positive, got {}", body_mass_kg),
        ));
    }
    if !(gravity.is_finite() && gravity > 0.0) {
        return Err(JoltError::invalid_config(
            Stage::Pipeline,
            format!("gravity must be positive, got {}", gravity),
        ));
    }
    let body_weight = body_mass_kg * gravity;
    Ok(data.iter().map(|f| f / body_weight).collect())
}
