use crate::error::{JoltError, Result, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A detected local maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
}

/// Height and separation constraints for peak picking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetectionConfig {
    /// Peaks must be strictly above this value.
    pub min_height: f64,
    /// Minimum index distance between two retained peaks.
    pub min_distance_samples: usize,
}

impl PeakDetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_distance_samples < 1 {
            return Err(JoltError::invalid_config(
                Stage::PeakDetection,
                "minimum peak distance must be at least 1 sample",
            ));
        }
        if self.min_height.is_nan() {
            return Err(JoltError::invalid_config(
                Stage::PeakDetection,
                "minimum height is NaN",
            ));
        }
        Ok(())
    }
}

/// Find local maxima above `cfg.min_height` that are at least
/// `cfg.min_distance_samples` apart. Returned peaks are sorted by index.
///
/// A sample (or a flat run of equal samples) is a maximum only when the
/// samples on both sides are strictly lower; a flat run is reported at its
/// first index. Runs touching either end of the series are never peaks, so
/// rising shoulders and edge values are skipped.
pub fn detect(series: &[f64], cfg: &PeakDetectionConfig) -> Result<Vec<Peak>> {
    cfg.validate()?;
    if series.len() < 3 {
        return Err(JoltError::InsufficientData {
            stage: Stage::PeakDetection,
            needed: 3,
            actual: series.len(),
        });
    }
    let candidates = local_maxima(series, cfg.min_height);
    Ok(enforce_distance(candidates, cfg.min_distance_samples))
}

/// Local maxima with plateaus reported at their first index. A plateau counts
/// only when both flanking samples are strictly lower.
fn local_maxima(series: &[f64], min_height: f64) -> Vec<Peak> {
    let n = series.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i < n - 1 {
        if series[i] > series[i - 1] {
            let mut ahead = i + 1;
            while ahead < n - 1 && series[ahead] == series[i] {
                ahead += 1;
            }
            if series[ahead] < series[i] && series[i] > min_height {
                peaks.push(Peak {
                    index: i,
                    value: series[i],
                });
            }
            i = ahead;
        } else {
            i += 1;
        }
    }
    peaks
}

/// Greedy suppression: tallest first, earlier index wins ties.
fn enforce_distance(candidates: Vec<Peak>, min_distance: usize) -> Vec<Peak> {
    if min_distance <= 1 {
        return candidates;
    }
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .value
            .total_cmp(&candidates[a].value)
            .then(candidates[a].index.cmp(&candidates[b].index))
    });

    let reach = min_distance - 1;
    let mut accepted = BTreeSet::new();
    for slot in order {
        let index = candidates[slot].index;
        let lo = index.saturating_sub(reach);
        let hi = index.saturating_add(reach);
        if accepted.range(lo..=hi).next().is_none() {
            accepted.insert(index);
        }
    }

    candidates
        .into_iter()
        .filter(|peak| accepted.contains(&peak.index))
        .collect()
}
