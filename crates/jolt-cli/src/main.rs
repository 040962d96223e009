use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use jolt_lib::{
    detectors::{
        bouts::{boundaries, segment, BoutConfig},
        peaks::Peak,
    },
    filters::butterworth::{self, FilterConfig},
    io::{
        delimited::{self, Axis, DelimitedOptions},
        text as text_io,
    },
    metrics::load::{summarize, Report},
    pipeline::{run_pipeline, HeightRule, LowpassSettings, PipelineConfig},
    signal::{normalize_body_weight, Roi, TimeSeries, STANDARD_GRAVITY},
};
use log::{debug, info};
use serde::Serialize;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

const DEFAULT_ORDER: usize = 4;
const DEFAULT_CUTOFF_HZ: f64 = 20.0;
const DEFAULT_MIN_PEAK_DISTANCE_S: f64 = 0.4;
const DEFAULT_BOUT_GAP_S: f64 = 5.0;

#[derive(Parser)]
#[command(
    name = "jolt",
    version,
    about = "Jolt: impact bout segmentation and loading metrics"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AxisArg {
    X,
    Y,
    Z,
    Resultant,
}

impl From<AxisArg> for Axis {
    fn from(value: AxisArg) -> Self {
        match value {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
            AxisArg::Resultant => Axis::Resultant,
        }
    }
}

/// Where the raw series comes from.
#[derive(Args, Debug)]
struct SourceArgs {
    /// Newline-delimited samples (stdin when neither --input nor --csv is given)
    #[arg(long, conflicts_with = "csv")]
    input: Option<PathBuf>,
    /// Delimited sensor export with columns [id_or_timestamp, x, y, z]
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Preamble lines to drop before the table
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// First table row holds column names
    #[arg(long)]
    has_headers: bool,
    #[arg(long, value_enum, default_value = "resultant")]
    axis: AxisArg,
    /// Read this zero-based column instead of an axis (force plates)
    #[arg(long)]
    column: Option<usize>,
    /// Divide samples by body weight (mass × gravity)
    #[arg(long)]
    body_mass_kg: Option<f64>,
    #[arg(long, default_value_t = STANDARD_GRAVITY)]
    gravity: f64,
}

/// Pipeline settings; each flag overrides the --config file or the defaults.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// TOML file holding a full pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sampling frequency (Hz); required without --config
    #[arg(long)]
    fs: Option<f64>,
    #[arg(long)]
    order: Option<usize>,
    #[arg(long)]
    cutoff_hz: Option<f64>,
    /// Detect on the raw series
    #[arg(long, conflicts_with_all = ["order", "cutoff_hz"])]
    no_filter: bool,
    /// Absolute peak height threshold
    #[arg(long, conflicts_with = "height_mean_multiple")]
    min_height: Option<f64>,
    /// Peak height threshold as a multiple of the series mean
    #[arg(long)]
    height_mean_multiple: Option<f64>,
    #[arg(long)]
    min_distance_s: Option<f64>,
    /// Rest (seconds) that separates two bouts
    #[arg(long)]
    bout_gap_s: Option<f64>,
    /// Inclusive sample range START:END to analyse
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Roi>,
}

#[derive(Subcommand)]
enum Commands {
    /// Zero-phase Butterworth lowpass of a sample series
    Filter {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        fs: f64,
        #[arg(long, default_value_t = DEFAULT_ORDER)]
        order: usize,
        #[arg(long, default_value_t = DEFAULT_CUTOFF_HZ)]
        cutoff_hz: f64,
    },
    /// Detect impact peaks (filter → height rule → minimum distance)
    FindPeaks {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Group newline-delimited peak indices into bouts
    SegmentBouts {
        /// Peak indices (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        fs: f64,
        #[arg(long, default_value_t = DEFAULT_BOUT_GAP_S)]
        bout_gap_s: f64,
        /// Conditioned series to read peak magnitudes from; adds a report
        #[arg(long)]
        series: Option<PathBuf>,
    },
    /// Run the full pipeline and print peaks, bouts and loading metrics
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Print only the loading report
        #[arg(long)]
        report_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Filter {
            source,
            fs,
            order,
            cutoff_hz,
        } => cmd_filter(&source, fs, order, cutoff_hz)?,
        Commands::FindPeaks { source, pipeline } => cmd_find_peaks(&source, &pipeline)?,
        Commands::SegmentBouts {
            input,
            fs,
            bout_gap_s,
            series,
        } => cmd_segment_bouts(input.as_deref(), fs, bout_gap_s, series.as_deref())?,
        Commands::Analyze {
            source,
            pipeline,
            report_only,
        } => cmd_analyze(&source, &pipeline, report_only)?,
    }
    Ok(())
}

fn parse_roi(value: &str) -> std::result::Result<Roi, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", value))?;
    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad ROI start '{}': {}", start, e))?;
    let end = end
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad ROI end '{}': {}", end, e))?;
    if start > end {
        return Err(format!("ROI start {} is after end {}", start, end));
    }
    Ok(Roi::new(start, end))
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn read_indices(input: Option<&Path>) -> Result<Vec<usize>> {
    match input {
        Some(path) => text_io::read_event_indices(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_event_indices(&buf)
        }
    }
}

fn load_series(source: &SourceArgs, fs: f64) -> Result<TimeSeries> {
    let mut ts = match &source.csv {
        Some(path) => {
            let delimiter = u8::try_from(source.delimiter)
                .map_err(|_| anyhow!("delimiter must be a single-byte character"))?;
            let opts = DelimitedOptions {
                skip_rows: source.skip_rows,
                delimiter,
                has_headers: source.has_headers,
            };
            match source.column {
                Some(column) => delimited::read_column(path, &opts, column, fs)?,
                None => delimited::read_axis(path, &opts, source.axis.into(), fs)?,
            }
        }
        None => TimeSeries::new(fs, read_samples(source.input.as_deref())?),
    };
    info!("loaded {} samples ({:.2} s at {} Hz)", ts.len(), ts.duration(), fs);
    if let Some(mass) = source.body_mass_kg {
        ts.data = normalize_body_weight(&ts.data, mass, source.gravity)?;
        debug!("normalised to body weight ({} kg, g = {})", mass, source.gravity);
    }
    Ok(ts)
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Values used by the original jump-loading protocol when no config file is given.
fn protocol_defaults(fs: f64) -> PipelineConfig {
    PipelineConfig {
        sample_rate_hz: fs,
        filter: Some(LowpassSettings {
            order: DEFAULT_ORDER,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
        }),
        height: HeightRule::MeanMultiple(1.0),
        min_peak_distance_s: DEFAULT_MIN_PEAK_DISTANCE_S,
        bout_gap_s: DEFAULT_BOUT_GAP_S,
        roi: None,
    }
}

fn resolve_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let fs = args
                .fs
                .ok_or_else(|| anyhow!("--fs is required when no --config is given"))?;
            protocol_defaults(fs)
        }
    };
    if let Some(fs) = args.fs {
        cfg.sample_rate_hz = fs;
    }
    if args.no_filter {
        cfg.filter = None;
    } else if args.order.is_some() || args.cutoff_hz.is_some() {
        let base = cfg.filter.unwrap_or(LowpassSettings {
            order: DEFAULT_ORDER,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
        });
        cfg.filter = Some(LowpassSettings {
            order: args.order.unwrap_or(base.order),
            cutoff_hz: args.cutoff_hz.unwrap_or(base.cutoff_hz),
        });
    }
    if let Some(height) = args.min_height {
        cfg.height = HeightRule::Absolute(height);
    }
    if let Some(multiple) = args.height_mean_multiple {
        cfg.height = HeightRule::MeanMultiple(multiple);
    }
    if let Some(distance) = args.min_distance_s {
        cfg.min_peak_distance_s = distance;
    }
    if let Some(gap) = args.bout_gap_s {
        cfg.bout_gap_s = gap;
    }
    if args.roi.is_some() {
        cfg.roi = args.roi;
    }
    debug!("pipeline configuration: {:?}", cfg);
    Ok(cfg)
}

fn cmd_filter(source: &SourceArgs, fs: f64, order: usize, cutoff_hz: f64) -> Result<()> {
    let ts = load_series(source, fs)?;
    let cfg = FilterConfig {
        order,
        cutoff_hz,
        sample_rate_hz: fs,
    };
    let data = butterworth::apply(&ts.data, &cfg)?;
    let js = serde_json::to_string(&TimeSeries::new(fs, data))?;
    println!("{}", js);
    Ok(())
}

#[derive(Serialize)]
struct PeaksOutput {
    fs: f64,
    index_offset: usize,
    min_height: f64,
    min_distance_samples: usize,
    peaks: Vec<Peak>,
}

fn cmd_find_peaks(source: &SourceArgs, args: &PipelineArgs) -> Result<()> {
    let cfg = resolve_config(args)?;
    let ts = load_series(source, cfg.sample_rate_hz)?;
    let result = run_pipeline(&ts.data, &cfg)?;
    info!(
        "found {} peaks above {:.4} (min distance {} samples)",
        result.peaks.len(),
        result.min_height,
        result.min_distance_samples
    );
    for peak in &result.peaks {
        let absolute = result.absolute_index(peak.index);
        debug!(
            "peak at sample {} ({:.3} s): {:.4}",
            absolute,
            ts.time_of(absolute),
            peak.value
        );
    }
    let out = PeaksOutput {
        fs: result.fs,
        index_offset: result.index_offset,
        min_height: result.min_height,
        min_distance_samples: result.min_distance_samples,
        peaks: result.peaks,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

#[derive(Serialize)]
struct BoutSpan {
    start_index: usize,
    end_index: usize,
    peak_indices: Vec<usize>,
}

#[derive(Serialize)]
struct SegmentOutput {
    gap_threshold_samples: usize,
    boundaries: Vec<usize>,
    bouts: Vec<BoutSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<Report>,
}

fn cmd_segment_bouts(
    input: Option<&Path>,
    fs: f64,
    bout_gap_s: f64,
    series: Option<&Path>,
) -> Result<()> {
    if !(fs.is_finite() && fs > 0.0) {
        anyhow::bail!("sample rate must be positive and finite, got {}", fs);
    }
    if !(bout_gap_s.is_finite() && bout_gap_s > 0.0) {
        anyhow::bail!("bout gap must be positive and finite, got {} s", bout_gap_s);
    }
    let indices = read_indices(input)?;
    let values = series.map(text_io::read_f64_series).transpose()?;
    let peaks = indices
        .iter()
        .map(|&index| {
            let value = match &values {
                Some(data) => *data.get(index).ok_or_else(|| {
                    anyhow!("peak index {} outside series of {} samples", index, data.len())
                })?,
                None => 0.0,
            };
            Ok(Peak { index, value })
        })
        .collect::<Result<Vec<_>>>()?;

    let gap_threshold_samples = (bout_gap_s * fs).round();
    if gap_threshold_samples < 1.0 || gap_threshold_samples >= usize::MAX as f64 {
        anyhow::bail!(
            "bout gap of {} s at {} Hz does not fit a sample count",
            bout_gap_s,
            fs
        );
    }
    let cfg = BoutConfig {
        gap_threshold_samples: gap_threshold_samples as usize,
    };
    let bouts = segment(&peaks, &cfg)?;
    info!("{} peaks grouped into {} bouts", peaks.len(), bouts.len());

    let report = match &values {
        Some(data) => Some(summarize(&bouts, data, fs)?),
        None => None,
    };
    let out = SegmentOutput {
        gap_threshold_samples: cfg.gap_threshold_samples,
        boundaries: boundaries(&peaks, &cfg),
        bouts: bouts
            .iter()
            .map(|b| BoutSpan {
                start_index: b.start_index,
                end_index: b.end_index,
                peak_indices: b.peaks.iter().map(|p| p.index).collect(),
            })
            .collect(),
        report,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_analyze(source: &SourceArgs, args: &PipelineArgs, report_only: bool) -> Result<()> {
    let cfg = resolve_config(args)?;
    let ts = load_series(source, cfg.sample_rate_hz)?;
    let result = run_pipeline(&ts.data, &cfg)?;
    let report = &result.report;
    info!(
        "{} peaks, {} bouts, {} cycles",
        result.peaks.len(),
        report.bout_count,
        report.total_cycles
    );
    for (k, gap) in report.inter_bout_gaps.iter().enumerate() {
        debug!(
            "rest between bout {} and {}: {:.2} s ({:.4} h)",
            k + 1,
            k + 2,
            gap,
            gap / 3600.0
        );
    }
    let js = if report_only {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", js);
    Ok(())
}
