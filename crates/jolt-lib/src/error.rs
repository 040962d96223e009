use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Filter,
    PeakDetection,
    BoutSegmentation,
    Metrics,
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Filter => "filter",
            Stage::PeakDetection => "peak detection",
            Stage::BoutSegmentation => "bout segmentation",
            Stage::Metrics => "metrics",
            Stage::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// Typed failures of the analysis core. Empty results are never errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JoltError {
    #[error("{stage}: invalid configuration: {reason}")]
    InvalidConfig { stage: Stage, reason: String },
    #[error("{stage}: insufficient data: need at least {needed} samples, got {actual}")]
    InsufficientData {
        stage: Stage,
        needed: usize,
        actual: usize,
    },
    #[error("{stage}: empty input")]
    EmptyInput { stage: Stage },
}

impl JoltError {
    pub fn invalid_config(stage: Stage, reason: impl Into<String>) -> Self {
        JoltError::InvalidConfig {
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JoltError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_stage_and_reason() {
        let err = JoltError::invalid_config(Stage::Filter, "cutoff above Nyquist");
        assert_eq!(
            err.to_string(),
            "filter: invalid configuration: cutoff above Nyquist"
        );
        assert!(matches!(
            err,
            JoltError::InvalidConfig {
                stage: Stage::Filter,
                ..
            }
        ));
    }

    #[test]
    fn insufficient_data_reports_counts() {
        let err = JoltError::InsufficientData {
            stage: Stage::PeakDetection,
            needed: 3,
            actual: 1,
        };
        assert!(err.to_string().contains("need at least 3 samples, got 1"));
    }
}
