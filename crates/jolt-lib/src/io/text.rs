use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

/// Parse one value per line, skipping blank and `#` comment lines. Only the
/// first comma/whitespace separated field of a line is read.
fn parse_lines<T>(text: &str, what: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let field = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .next()
            .unwrap_or(trimmed);
        let val = field
            .parse::<T>()
            .with_context(|| format!("line {} is not {}: {}", idx + 1, what, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no {} values found", what);
    }
    Ok(out)
}

/// Parse a newline-delimited sample series.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    parse_lines(text, "a number")
}

/// Read a newline-delimited sample series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Parse newline-delimited sample indices (e.g. peak positions).
pub fn parse_event_indices(text: &str) -> Result<Vec<usize>> {
    parse_lines(text, "a sample index")
}

pub fn read_event_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_event_indices(&text).with_context(|| format!("parsing {}", path.display()))
}
