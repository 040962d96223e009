use crate::detectors::bouts::Bout;
use crate::error::{JoltError, Result, Stage};
use serde::{Deserialize, Serialize};

/// Timing of one bout on the analysed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoutTiming {
    pub first_peak_s: f64,
    pub last_peak_s: f64,
    pub duration_s: f64,
}

/// Loading summary over a list of bouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub fs: f64,
    pub bouts: Vec<Bout>,
    /// Conditioned-series value at every peak, in bout order.
    pub per_peak_magnitude: Vec<f64>,
    /// Rest between consecutive bouts (seconds).
    pub inter_bout_gaps: Vec<f64>,
    pub cycles_per_bout: Vec<usize>,
    pub total_cycles: usize,
    pub bout_count: usize,
    pub bout_timings: Vec<BoutTiming>,
}

impl Report {
    pub fn empty(fs: f64) -> Self {
        Self {
            fs,
            bouts: Vec::new(),
            per_peak_magnitude: Vec::new(),
            inter_bout_gaps: Vec::new(),
            cycles_per_bout: Vec::new(),
            total_cycles: 0,
            bout_count: 0,
            bout_timings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bouts.is_empty()
    }
}

pub fn summarize(bouts: &[Bout], filtered: &[f64], sample_rate_hz: f64) -> Result<Report> {
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(JoltError::invalid_config(
            Stage::Metrics,
            format!("sample rate must be positive, got {}", sample_rate_hz),
        ));
    }
    if bouts.is_empty() {
        return Ok(Report::empty(sample_rate_hz));
    }

    let mut per_peak_magnitude = Vec::new();
    for peak in bouts.iter().flat_map(|b| &b.peaks) {
        let value = filtered
            .get(peak.index)
            .copied()
            .ok_or(JoltError::InsufficientData {
                stage: Stage::Metrics,
                needed: peak.index + 1,
                actual: filtered.len(),
            })?;
        per_peak_magnitude.push(value);
    }

    let inter_bout_gaps = bouts
        .windows(2)
        .map(|w| (w[1].start_index as f64 - w[0].end_index as f64) / sample_rate_hz)
        .collect();
    let cycles_per_bout: Vec<usize> = bouts.iter().map(Bout::cycles).collect();
    let total_cycles = cycles_per_bout.iter().sum();
    let bout_timings = bouts
        .iter()
        .map(|b| {
            let first_peak_s = b.start_index as f64 / sample_rate_hz;
            let last_peak_s = b.end_index as f64 / sample_rate_hz;
            BoutTiming {
                first_peak_s,
                last_peak_s,
                duration_s: last_peak_s - first_peak_s,
            }
        })
        .collect();

    Ok(Report {
        fs: sample_rate_hz,
        bouts: bouts.to_vec(),
        per_peak_magnitude,
        inter_bout_gaps,
        cycles_per_bout,
        total_cycles,
        bout_count: bouts.len(),
        bout_timings,
    })
}
