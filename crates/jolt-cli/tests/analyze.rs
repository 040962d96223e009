use assert_cmd::cargo::cargo_bin_cmd;
use jolt_lib::metrics::load::Report;
use jolt_lib::pipeline::PipelineResult;
use serde::Deserialize;
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};
use tempfile::tempdir;

#[derive(Deserialize)]
struct PeaksOutput {
    index_offset: usize,
    peaks: Vec<PeakOut>,
}

#[derive(Deserialize)]
struct PeakOut {
    index: usize,
    value: f64,
}

#[test]
fn analyze_reports_bouts_split_by_equal_rests() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let centres = [100, 140, 180, 680, 720, 1220, 1260, 1300];
    let input = write_impacts(dir.path(), 2000, &centres, 1.0)?;

    let mut cmd = cargo_bin_cmd!("jolt");
    cmd.args([
        "analyze",
        "--input",
        input.to_str().expect("utf8 path"),
        "--fs",
        "100",
        "--min-height",
        "2",
        "--min-distance-s",
        "0.3",
        "--bout-gap-s",
        "5",
        "--report-only",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Report = serde_json::from_slice(&output)?;

    assert_eq!(report.bout_count, 3);
    assert_eq!(report.cycles_per_bout, vec![3, 2, 3]);
    assert_eq!(report.total_cycles, 8);
    assert_eq!(report.inter_bout_gaps.len(), 2);
    for gap in &report.inter_bout_gaps {
        assert_close(*gap, 5.0, 1e-9);
    }
    assert_eq!(report.bouts[1].start_index, 680);
    Ok(())
}

#[test]
fn analyze_uses_config_file_and_roi() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = write_impacts(dir.path(), 2000, &[100, 140, 900, 940, 980], 1.0)?;
    let config = sample_path("test_data/analysis.toml");

    let mut cmd = cargo_bin_cmd!("jolt");
    cmd.args([
        "analyze",
        "--config",
        &config,
        "--input",
        input.to_str().expect("utf8 path"),
        "--roi",
        "800:1199",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let result: PipelineResult = serde_json::from_slice(&output)?;

    assert_eq!(result.index_offset, 800);
    assert_eq!(result.sample_count, 400);
    assert_eq!(result.filtered.len(), 400);
    let absolute: Vec<usize> = result
        .peaks
        .iter()
        .map(|p| result.absolute_index(p.index))
        .collect();
    assert_eq!(absolute, vec![900, 940, 980]);
    assert_eq!(result.report.bout_count, 1);
    assert_eq!(result.report.total_cycles, 3);
    Ok(())
}

#[test]
fn analyze_reads_accelerometer_csv_resultant() -> Result<(), Box<dyn Error>> {
    let csv = sample_path("test_data/accel_sample.csv");

    let mut cmd = cargo_bin_cmd!("jolt");
    cmd.args([
        "analyze",
        "--csv",
        &csv,
        "--skip-rows",
        "10",
        "--has-headers",
        "--axis",
        "resultant",
        "--fs",
        "100",
        "--no-filter",
        "--report-only",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Report = serde_json::from_slice(&output)?;

    assert_eq!(report.total_cycles, 1);
    assert_eq!(report.bouts[0].start_index, 1);
    assert_close(report.per_peak_magnitude[0], 5.0, 1e-12);
    Ok(())
}

#[test]
fn find_peaks_normalises_to_body_weight() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let body_weight = 74.0 * 9.81;
    let centres = [200, 260, 320];
    let input = write_impacts(dir.path(), 600, &centres, body_weight)?;

    let mut cmd = cargo_bin_cmd!("jolt");
    cmd.args([
        "find-peaks",
        "--input",
        input.to_str().expect("utf8 path"),
        "--fs",
        "100",
        "--body-mass-kg",
        "74",
        "--min-height",
        "2",
        "--min-distance-s",
        "0.4",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let peaks: PeaksOutput = serde_json::from_slice(&output)?;

    assert_eq!(peaks.index_offset, 0);
    let found: Vec<usize> = peaks.peaks.iter().map(|p| p.index).collect();
    assert_eq!(found, centres.to_vec());
    for peak in &peaks.peaks {
        assert_close(peak.value, 4.0, 0.1);
    }
    Ok(())
}

#[test]
fn analyze_without_sample_rate_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = write_impacts(dir.path(), 300, &[100], 1.0)?;

    let mut cmd = cargo_bin_cmd!("jolt");
    cmd.args(["analyze", "--input", input.to_str().expect("utf8 path")]);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&stderr).contains("--fs is required"));
    Ok(())
}

/// Baseline `scale` with Gaussian impacts of height `3 × scale` at `centres`.
fn write_impacts(
    dir: &Path,
    len: usize,
    centres: &[usize],
    scale: f64,
) -> Result<PathBuf, Box<dyn Error>> {
    let mut text = String::new();
    for i in 0..len {
        let impacts: f64 = centres
            .iter()
            .map(|&c| {
                let t = (i as f64 - c as f64) / 3.0;
                3.0 * (-0.5 * t * t).exp()
            })
            .sum();
        text.push_str(&format!("{}\n", scale * (1.0 + impacts)));
    }
    let path = dir.join("series.txt");
    fs::write(&path, text)?;
    Ok(path)
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn sample_path(relative: &str) -> String {
    workspace_root()
        .join(relative)
        .to_string_lossy()
        .to_string()
}
