use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::signal::{resultant, TimeSeries};

/// Channel to extract from a `[id_or_timestamp, x, y, z]` export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    Resultant,
}

impl Axis {
    /// Zero-based column(s) holding this axis.
    pub fn columns(&self) -> &'static [usize] {
        match self {
            Axis::X => &[1],
            Axis::Y => &[2],
            Axis::Z => &[3],
            Axis::Resultant => &[1, 2, 3],
        }
    }
}

/// Layout of a delimited sensor export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedOptions {
    /// Preamble lines dropped before the table starts.
    pub skip_rows: usize,
    pub delimiter: u8,
    /// Whether the first table row names the columns.
    pub has_headers: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            delimiter: b',',
            has_headers: false,
        }
    }
}

/// Read the requested zero-based columns as floats. Other columns (such as
/// text timestamps) are never parsed.
pub fn read_columns(path: &Path, opts: &DelimitedOptions, columns: &[usize]) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buffered = BufReader::new(file);
    let mut discard = String::new();
    for line in 0..opts.skip_rows {
        discard.clear();
        let read = buffered
            .read_line(&mut discard)
            .with_context(|| format!("skipping preamble line {}", line + 1))?;
        if read == 0 {
            anyhow::bail!(
                "{} has fewer than {} preamble lines",
                path.display(),
                opts.skip_rows
            );
        }
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .has_headers(opts.has_headers)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(buffered);

    let mut out = vec![Vec::new(); columns.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        for (slot, &col) in columns.iter().enumerate() {
            let field = record
                .get(col)
                .ok_or_else(|| anyhow::anyhow!("row {} has no column {}", row + 1, col))?;
            let value = field
                .parse::<f64>()
                .with_context(|| format!("row {} column {}: not a number: {}", row + 1, col, field))?;
            out[slot].push(value);
        }
    }
    if out.first().map_or(true, |c| c.is_empty()) {
        anyhow::bail!("no data rows in {}", path.display());
    }
    Ok(out)
}

/// Load one axis (or the resultant of all three) from an accelerometer export.
pub fn read_axis(path: &Path, opts: &DelimitedOptions, axis: Axis, fs: f64) -> Result<TimeSeries> {
    let columns = read_columns(path, opts, axis.columns())?;
    let data = match axis {
        Axis::Resultant => resultant(&columns[0], &columns[1], &columns[2]),
        _ => columns.into_iter().next().unwrap_or_default(),
    };
    Ok(TimeSeries { fs, data })
}

/// Load a single column, e.g. vertical force from a force-plate export.
pub fn read_column(path: &Path, opts: &DelimitedOptions, column: usize, fs: f64) -> Result<TimeSeries> {
    let data = read_columns(path, opts, &[column])?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(TimeSeries { fs, data })
}
