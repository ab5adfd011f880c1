//! Snapshot Loader Module
//! Fetches a published CSV snapshot and normalises it into a canonical table.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

use super::cache::BoundedCache;
use super::source::Source;
use super::table::{CapacityTable, DATE_COLUMN, ID_COLUMNS};

/// Notes appended to every published snapshot after the data rows.
pub const FOOTER_ROWS: usize = 5;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("No data available: {0}")]
    SourceUnavailable(String),
    #[error("Date format error: {0}")]
    DateFormat(String),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
}

/// Everything that determines the content of a loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadRequest {
    pub source: Source,
    pub separator: u8,
    pub date_format: String,
}

impl LoadRequest {
    pub fn new(source: Source, separator: u8, date_format: impl Into<String>) -> Self {
        Self {
            source,
            separator,
            date_format: date_format.into(),
        }
    }
}

/// Loads snapshots, memoising the most recent tables.
pub struct DataLoader {
    timeout: Duration,
    cache: BoundedCache<LoadRequest, CapacityTable>,
}

impl DataLoader {
    pub fn new(timeout: Duration, cache_capacity: usize) -> Self {
        Self {
            timeout,
            cache: BoundedCache::new(cache_capacity),
        }
    }

    /// Load a snapshot, reusing a cached table for an identical request.
    pub fn load(&mut self, request: &LoadRequest) -> Result<CapacityTable, LoaderError> {
        let timeout = self.timeout;
        self.cache
            .get_or_try_insert_with(request.clone(), || Self::load_uncached(request, timeout))
    }

    /// Fetch and parse without touching the cache.
    pub fn load_uncached(
        request: &LoadRequest,
        timeout: Duration,
    ) -> Result<CapacityTable, LoaderError> {
        log::info!("Loading {}", request.source);
        let bytes = request.source.fetch(timeout)?;
        let table = Self::parse(&bytes, request.separator, &request.date_format)?;
        log::info!(
            "Loaded {} rows, {} columns from {}",
            table.height(),
            table.frame().width(),
            request.source
        );
        Ok(table)
    }

    /// Parse raw Latin-1 snapshot bytes into a canonical table.
    pub fn parse(
        bytes: &[u8],
        separator: u8,
        date_format: &str,
    ) -> Result<CapacityTable, LoaderError> {
        let text = decode_latin1(bytes);
        let trimmed = strip_footer(&text, FOOTER_ROWS);

        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_parse_options(CsvParseOptions::default().with_separator(separator))
            .into_reader_with_file_handle(Cursor::new(trimmed.into_bytes()))
            .finish()?;

        for name in ID_COLUMNS {
            if df.get_column_index(name).is_some() {
                df = df.drop(name)?;
            }
        }

        let df = drop_empty_rows(&df)?;
        let df = parse_dates(df, date_format)?;
        Ok(CapacityTable::from_frame(df))
    }
}

/// Decode the legacy single-byte encoding used by the publisher.
///
/// Uses windows-1252, which agrees with ISO-8859-1 everywhere except
/// 0x80..=0x9F: those bytes become printable characters such as '€'
/// instead of C1 control codes.
fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors {
        log::warn!("Snapshot contained bytes outside windows-1252");
    }
    text.into_owned()
}

/// Keep the header and drop the last `footer` non-blank data lines.
fn strip_footer(text: &str, footer: usize) -> String {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return String::new();
    };
    let rows: Vec<&str> = lines.collect();
    let keep = rows.len().saturating_sub(footer);

    let mut out = String::with_capacity(text.len());
    out.push_str(header);
    out.push('\n');
    for row in &rows[..keep] {
        out.push_str(row);
        out.push('\n');
    }
    out
}

/// Remove rows in which every field is null.
fn drop_empty_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut keep = BooleanChunked::full("keep".into(), false, df.height());
    for column in df.get_columns() {
        keep = &keep | &column.as_materialized_series().is_not_null();
    }
    let kept = df.filter(&keep)?;
    if kept.height() < df.height() {
        log::debug!("Dropped {} empty rows", df.height() - kept.height());
    }
    Ok(kept)
}

/// Replace the textual date column with a typed `Date` column.
fn parse_dates(df: DataFrame, date_format: &str) -> Result<DataFrame, LoaderError> {
    let column = df
        .column(DATE_COLUMN)
        .map_err(|_| LoaderError::DateFormat(format!("missing '{}' column", DATE_COLUMN)))?;
    let raw = column.cast(&DataType::String)?;

    let dates = raw
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| {
                LoaderError::DateFormat(format!("row {} has no date", row + 1))
            })?;
            parse_date(value, date_format).map_err(|reason| {
                LoaderError::DateFormat(format!(
                    "'{}' does not match '{}': {}",
                    value, date_format, reason
                ))
            })
        })
        .collect::<Result<Vec<NaiveDate>, LoaderError>>()?;

    let mut df = df;
    df.with_column(Column::new(DATE_COLUMN.into(), dates))?;
    Ok(df)
}

/// Parse one date, requiring a four-digit year wherever the format asks for `%Y`.
fn parse_date(value: &str, date_format: &str) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(value, date_format).map_err(|e| e.to_string())?;
    if date_format.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return Err(format!("year {} is not four digits", date.year()));
    }
    Ok(date)
}
