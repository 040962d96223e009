//! Partition of an ordered peak sequence into bouts.
//!
//! A boundary sits after peak `k` when the gap to peak `k + 1` is at least the
//! rest threshold. Boundaries are kept as positions in the gap sequence, so
//! repeated gap widths never make the partition ambiguous.

use super::peaks::Peak;
use crate::error::{JoltError, Result, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoutConfig {
    /// Smallest inter-peak gap (samples) read as rest between bouts.
    pub gap_threshold_samples: usize,
}

impl BoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.gap_threshold_samples < 1 {
            return Err(JoltError::invalid_config(
                Stage::BoutSegmentation,
                "bout gap threshold must be at least 1 sample",
            ));
        }
        Ok(())
    }
}

/// A maximal run of peaks with no internal gap at or above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bout {
    pub peaks: Vec<Peak>,
    pub start_index: usize,
    pub end_index: usize,
}

impl Bout {
    fn from_run(run: &[Peak]) -> Self {
        Self {
            peaks: run.to_vec(),
            start_index: run[0].index,
            end_index: run[run.len() - 1].index,
        }
    }

    pub fn cycles(&self) -> usize {
        self.peaks.len()
    }
}

/// Positions `k` in the gap sequence where `peaks[k + 1].index -
/// peaks[k].index >= gap_threshold_samples`, ascending.
pub fn boundaries(peaks: &[Peak], cfg: &BoutConfig) -> Vec<usize> {
    peaks
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1].index.saturating_sub(pair[0].index) >= cfg.gap_threshold_samples)
        .map(|(k, _)| k)
        .collect()
}

/// Split `peaks` into bouts. The result always has `boundaries + 1` bouts.
pub fn segment(peaks: &[Peak], cfg: &BoutConfig) -> Result<Vec<Bout>> {
    if peaks.is_empty() {
        return Err(JoltError::EmptyInput {
            stage: Stage::BoutSegmentation,
        });
    }
    cfg.validate()?;
    if let Some(pair) = peaks.windows(2).find(|pair| pair[1].index <= pair[0].index) {
        return Err(JoltError::invalid_config(
            Stage::BoutSegmentation,
            format!(
                "peak indices must be strictly increasing ({} then {})",
                pair[0].index, pair[1].index
            ),
        ));
    }

    let cuts = boundaries(peaks, cfg);
    let mut bouts = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for k in cuts {
        bouts.push(Bout::from_run(&peaks[start..=k]));
        start = k + 1;
    }
    bouts.push(Bout::from_run(&peaks[start..]));
    Ok(bouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn peaks_at(indices: &[usize]) -> Vec<Peak> {
        indices
            .iter()
            .map(|&index| Peak { index, value: 1.0 })
            .collect()
    }

    fn bout_indices(bouts: &[Bout]) -> Vec<Vec<usize>> {
        bouts
            .iter()
            .map(|b| b.peaks.iter().map(|p| p.index).collect())
            .collect()
    }

    fn threshold(gap_threshold_samples: usize) -> BoutConfig {
        BoutConfig {
            gap_threshold_samples,
        }
    }

    #[test]
    fn two_bouts_split_at_long_rest() {
        let peaks = peaks_at(&[100, 140, 900, 940, 980]);
        let cfg = threshold(500);
        assert_eq!(boundaries(&peaks, &cfg), vec![1]);
        let bouts = segment(&peaks, &cfg).unwrap();
        assert_eq!(
            bout_indices(&bouts),
            vec![vec![100, 140], vec![900, 940, 980]]
        );
        assert_eq!((bouts[1].start_index, bouts[1].end_index), (900, 980));
        let cycles: Vec<usize> = bouts.iter().map(Bout::cycles).collect();
        assert_eq!(cycles, vec![2, 3]);
    }

    #[test]
    fn single_peak_is_one_bout() {
        let peaks = peaks_at(&[10]);
        for gap in [1, 5, 10_000] {
            let bouts = segment(&peaks, &threshold(gap)).unwrap();
            assert_eq!(bout_indices(&bouts), vec![vec![10]]);
            assert_eq!((bouts[0].start_index, bouts[0].end_index), (10, 10));
        }
    }

    #[test]
    fn no_boundary_keeps_all_peaks_together() {
        let peaks = peaks_at(&[0, 40, 80, 120]);
        let bouts = segment(&peaks, &threshold(41)).unwrap();
        assert_eq!(bouts.len(), 1);
        assert_eq!(bouts[0].peaks, peaks);
    }

    #[test]
    fn gap_equal_to_threshold_is_a_boundary() {
        let peaks = peaks_at(&[0, 50, 100]);
        assert_eq!(boundaries(&peaks, &threshold(50)), vec![0, 1]);
        assert_eq!(segment(&peaks, &threshold(50)).unwrap().len(), 3);
        assert_eq!(segment(&peaks, &threshold(51)).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_gap_widths_split_at_true_positions() {
        // Two rests of exactly 500 samples, separated by differently spaced cycles.
        let peaks = peaks_at(&[100, 140, 180, 680, 720, 1220, 1260, 1300, 1340]);
        let cfg = threshold(500);
        assert_eq!(boundaries(&peaks, &cfg), vec![2, 4]);
        let bouts = segment(&peaks, &cfg).unwrap();
        assert_eq!(
            bout_indices(&bouts),
            vec![
                vec![100, 140, 180],
                vec![680, 720],
                vec![1220, 1260, 1300, 1340]
            ]
        );
    }

    #[test]
    fn repeated_within_bout_gaps_do_not_confuse_boundaries() {
        let peaks = peaks_at(&[0, 600, 640, 680, 1280]);
        let bouts = segment(&peaks, &threshold(500)).unwrap();
        assert_eq!(
            bout_indices(&bouts),
            vec![vec![0], vec![600, 640, 680], vec![1280]]
        );
    }

    #[test]
    fn empty_peaks_is_an_error() {
        assert_eq!(
            segment(&[], &threshold(10)).unwrap_err(),
            JoltError::EmptyInput {
                stage: Stage::BoutSegmentation
            }
        );
    }

    #[test]
    fn zero_threshold_and_unsorted_peaks_are_rejected() {
        assert!(matches!(
            segment(&peaks_at(&[1, 2]), &threshold(0)),
            Err(JoltError::InvalidConfig { .. })
        ));
        assert!(matches!(
            segment(&peaks_at(&[5, 5]), &threshold(3)),
            Err(JoltError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn random_sequences_are_partitioned_exactly() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let count = rng.gen_range(1..60);
            let mut index = rng.gen_range(0..50);
            let mut indices = Vec::with_capacity(count);
            for _ in 0..count {
                indices.push(index);
                index += rng.gen_range(1..120);
            }
            let peaks = peaks_at(&indices);
            let cfg = threshold(rng.gen_range(1..130));
            let bouts = segment(&peaks, &cfg).unwrap();

            let flattened: Vec<Peak> = bouts.iter().flat_map(|b| b.peaks.clone()).collect();
            assert_eq!(flattened, peaks);
            let expected = 1 + indices
                .windows(2)
                .filter(|w| w[1] - w[0] >= cfg.gap_threshold_samples)
                .count();
            assert_eq!(bouts.len(), expected);

            for bout in &bouts {
                assert!(!bout.peaks.is_empty());
                for pair in bout.peaks.windows(2) {
                    assert!(pair[1].index - pair[0].index < cfg.gap_threshold_samples);
                }
                // A bout fed back in stays a single bout.
                assert_eq!(segment(&bout.peaks, &cfg).unwrap().len(), 1);
            }
            for pair in bouts.windows(2) {
                assert!(pair[1].start_index - pair[0].end_index >= cfg.gap_threshold_samples);
            }
        }
    }
}
