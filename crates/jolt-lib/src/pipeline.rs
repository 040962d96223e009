use crate::{
    detectors::{
        bouts::{segment, BoutConfig},
        peaks::{detect, Peak, PeakDetectionConfig},
    },
    error::{JoltError, Result, Stage},
    filters::butterworth::{self, FilterConfig},
    metrics::load::{summarize, Report},
    signal::Roi,
};
use serde::{Deserialize, Serialize};

/// Lowpass settings; the sample rate comes from [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowpassSettings {
    pub order: usize,
    pub cutoff_hz: f64,
}

/// How the minimum peak height is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightRule {
    /// Fixed threshold in series units.
    Absolute(f64),
    /// Multiple of the conditioned series' mean.
    MeanMultiple(f64),
}

impl HeightRule {
    pub fn resolve(&self, series: &[f64]) -> Result<f64> {
        let height = match *self {
            HeightRule::Absolute(h) => h,
            HeightRule::MeanMultiple(k) => {
                if series.is_empty() {
                    return Err(JoltError::InsufficientData {
                        stage: Stage::PeakDetection,
                        needed: 1,
                        actual: 0,
                    });
                }
                k * series.iter().sum::<f64>() / series.len() as f64
            }
        };
        if !height.is_finite() {
            return Err(JoltError::invalid_config(
                Stage::PeakDetection,
                format!("height rule {:?} resolved to {}", self, height),
            ));
        }
        Ok(height)
    }
}

/// Everything one pipeline call needs. Nothing is read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sample_rate_hz: f64,
    #[serde(default)]
    pub filter: Option<LowpassSettings>,
    pub height: HeightRule,
    pub min_peak_distance_s: f64,
    pub bout_gap_s: f64,
    #[serde(default)]
    pub roi: Option<Roi>,
}

impl PipelineConfig {
    pub fn filter_config(&self) -> Option<FilterConfig> {
        self.filter.map(|f| FilterConfig {
            order: f.order,
            cutoff_hz: f.cutoff_hz,
            sample_rate_hz: self.sample_rate_hz,
        })
    }

    pub fn min_distance_samples(&self) -> Result<usize> {
        seconds_to_samples(
            self.min_peak_distance_s,
            self.sample_rate_hz,
            Stage::PeakDetection,
            "minimum peak distance",
        )
    }

    pub fn gap_threshold_samples(&self) -> Result<usize> {
        seconds_to_samples(
            self.bout_gap_s,
            self.sample_rate_hz,
            Stage::BoutSegmentation,
            "bout gap",
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(JoltError::invalid_config(
                Stage::Pipeline,
                format!("sample rate must be positive, got {}", self.sample_rate_hz),
            ));
        }
        if let Some(filter) = self.filter_config() {
            filter.validate()?;
        }
        self.min_distance_samples()?;
        self.gap_threshold_samples()?;
        Ok(())
    }
}

fn seconds_to_samples(seconds: f64, fs: f64, stage: Stage, what: &str) -> Result<usize> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(JoltError::invalid_config(
            stage,
            format!("{} must be positive, got {} s", what, seconds),
        ));
    }
    let samples = (seconds * fs).round();
    if samples < 1.0 {
        return Err(JoltError::invalid_config(
            stage,
            format!("{} of {} s is shorter than one sample at {} Hz", what, seconds, fs),
        ));
    }
    Ok(samples as usize)
}

/// Output of one pipeline run. Indices are relative to the analysed slice;
/// add `index_offset` to map them onto the full recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub fs: f64,
    pub sample_count: usize,
    pub index_offset: usize,
    pub min_height: f64,
    pub min_distance_samples: usize,
    pub gap_threshold_samples: usize,
    pub filtered: Vec<f64>,
    pub peaks: Vec<Peak>,
    pub report: Report,
}

impl PipelineResult {
    pub fn absolute_index(&self, index: usize) -> usize {
        index + self.index_offset
    }
}

/// Run ROI slicing → lowpass → peak detection → bout segmentation → metrics.
pub fn run_pipeline(data: &[f64], cfg: &PipelineConfig) -> Result<PipelineResult> {
    cfg.validate()?;
    let min_distance_samples = cfg.min_distance_samples()?;
    let gap_threshold_samples = cfg.gap_threshold_samples()?;

    let (slice, index_offset) = match cfg.roi {
        Some(roi) => (roi.slice(data)?, roi.start),
        None => (data, 0),
    };

    let filtered = match cfg.filter_config() {
        Some(filter) => butterworth::apply(slice, &filter)?,
        None => slice.to_vec(),
    };
    if filtered.len() < 3 {
        return Err(JoltError::InsufficientData {
            stage: Stage::PeakDetection,
            needed: 3,
            actual: filtered.len(),
        });
    }

    let min_height = cfg.height.resolve(&filtered)?;
    let peaks = detect(
        &filtered,
        &PeakDetectionConfig {
            min_height,
            min_distance_samples,
        },
    )?;

    let report = if peaks.is_empty() {
        Report::empty(cfg.sample_rate_hz)
    } else {
        let bouts = segment(
            &peaks,
            &BoutConfig {
                gap_threshold_samples,
            },
        )?;
        summarize(&bouts, &filtered, cfg.sample_rate_hz)?
    };

    Ok(PipelineResult {
        fs: cfg.sample_rate_hz,
        sample_count: filtered.len(),
        index_offset,
        min_height,
        min_distance_samples,
        gap_threshold_samples,
        filtered,
        peaks,
        report,
    })
}
