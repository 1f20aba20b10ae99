//! Plain-text market files: one bar per line, `YYYYMMDD open high low close [volume]`,
//! separated by spaces, tabs or commas. Auxiliary series use `YYYYMMDD value`.

use crate::source::{PriceSource, SentimentSource, SourceError};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use table::{AuxPoint, OhlcvRow};

fn parse_date(line: &str, line_num: usize) -> Result<i64, SourceError> {
    let date_str = line
        .get(..8)
        .ok_or_else(|| SourceError::Parse(format!("Line {} too short", line_num)))?;
    if !date_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(SourceError::Parse(format!("Invalid date on line {}", line_num)));
    }

    let date = NaiveDate::parse_from_str(date_str, "%Y%m%d")
        .map_err(|_| SourceError::Parse(format!("Invalid date on line {}", line_num)))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| SourceError::Parse(format!("Invalid date on line {}", line_num)))
}

fn fields(line: &str) -> Vec<&str> {
    line.get(8..)
        .unwrap_or_default()
        .split([' ', '\t', ','])
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_field(part: &str, what: &str, line_num: usize) -> Result<f64, SourceError> {
    part.parse::<f64>()
        .map_err(|_| SourceError::Parse(format!("Invalid {} on line {}", what, line_num)))
}

/// Formats a millisecond timestamp as `YYYYMMDD` (UTC).
pub fn format_date(ts_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y%m%d").to_string())
        .unwrap_or_default()
}

/// Reads an OHLCV file. A missing volume column becomes NaN.
pub fn read_ohlcv_file<P: AsRef<Path>>(path: P) -> Result<Vec<OhlcvRow>, SourceError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let timestamp = parse_date(&line, line_num)?;
        let parts = fields(&line);
        if parts.len() < 4 {
            return Err(SourceError::Parse(format!(
                "Insufficient price data on line {}",
                line_num
            )));
        }

        let open = parse_field(parts[0], "open price", line_num)?;
        let high = parse_field(parts[1], "high price", line_num)?;
        let low = parse_field(parts[2], "low price", line_num)?;
        let close = parse_field(parts[3], "close price", line_num)?;
        let volume = match parts.get(4) {
            Some(v) => parse_field(v, "volume", line_num)?,
            None => f64::NAN,
        };

        if low > open || low > close || high < open || high < close {
            return Err(SourceError::Parse(format!(
                "Invalid open/high/low/close relationship on line {}",
                line_num
            )));
        }
        if open <= 0.0 || high <= 0.0 || low <= 0.0 || close <= 0.0 {
            return Err(SourceError::Parse(format!("Non-positive price on line {}", line_num)));
        }

        rows.push(OhlcvRow {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(rows)
}

pub fn write_ohlcv_file<P: AsRef<Path>>(path: P, rows: &[OhlcvRow]) -> Result<(), SourceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    for r in rows {
        writeln!(
            file,
            "{} {} {} {} {} {}",
            format_date(r.timestamp),
            r.open,
            r.high,
            r.low,
            r.close,
            r.volume
        )?;
    }
    Ok(())
}

pub fn read_aux_file<P: AsRef<Path>>(path: P) -> Result<Vec<AuxPoint>, SourceError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut points = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let timestamp = parse_date(&line, line_num)?;
        let value = fields(&line)
            .first()
            .ok_or_else(|| SourceError::Parse(format!("No value found on line {}", line_num)))
            .and_then(|v| parse_field(v, "value", line_num))?;
        points.push(AuxPoint { timestamp, value });
    }

    Ok(points)
}

pub fn write_aux_file<P: AsRef<Path>>(path: P, points: &[AuxPoint]) -> Result<(), SourceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    for p in points {
        writeln!(file, "{} {}", format_date(p.timestamp), p.value)?;
    }
    Ok(())
}

/// Price source backed by a local OHLCV file. The symbol and timeframe are
/// ignored; `limit` keeps the most recent bars.
#[derive(Debug, Clone)]
pub struct OhlcvFile {
    path: PathBuf,
}

impl OhlcvFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl PriceSource for OhlcvFile {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<OhlcvRow>, SourceError> {
        let mut rows = read_ohlcv_file(&self.path)?;
        rows.sort_by_key(|r| r.timestamp);
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.split_off(skip))
    }
}

/// Sentiment index read from a `YYYYMMDD value` file, such as the
/// `FEAR_GREED.TXT` written by `download_history`. Rows come back ascending
/// and `limit` keeps the most recent ones.
#[derive(Debug, Clone)]
pub struct SentimentFile {
    path: PathBuf,
}

impl SentimentFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SentimentSource for SentimentFile {
    fn name(&self) -> &str {
        "sentiment_file"
    }

    async fn fetch_index(&self, limit: usize) -> Result<Vec<AuxPoint>, SourceError> {
        let mut points = read_aux_file(&self.path)?;
        points.sort_by_key(|p| p.timestamp);
        let skip = points.len().saturating_sub(limit);
        Ok(points.split_off(skip))
    }
}
