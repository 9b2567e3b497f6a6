use crate::error::{Era5Error, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Name of the date column in daily CSV files.
pub const DATE_COLUMN: &str = "date";

/// Number of hourly samples a complete local day aggregates.
pub const HOURS_PER_DAY: usize = 24;

/// Why a local day inside the series could not be aggregated.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// Fewer than 24 hourly samples fell in the day.
    AbsentHours { found: usize },
    /// An accumulated increment in the day was differenced across a gap.
    GapSpanned,
    /// Read back from a file with every column empty.
    NoValues,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Complete,
    Missing(MissingReason),
}

/// One local calendar day at one location.
///
/// A missing day keeps its place in the output with every column `None`, so
/// "no data" stays distinguishable from a zero flux.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub values: BTreeMap<String, Option<f64>>,
}

impl DailyRecord {
    pub fn complete(date: NaiveDate) -> Self {
        DailyRecord {
            date,
            status: DayStatus::Complete,
            values: BTreeMap::new(),
        }
    }

    pub fn missing(date: NaiveDate, reason: MissingReason, columns: &[String]) -> Self {
        DailyRecord {
            date,
            status: DayStatus::Missing(reason),
            values: columns.iter().map(|c| (c.clone(), None)).collect(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.status, DayStatus::Missing(_))
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    pub fn set(&mut self, column: &str, value: Option<f64>) {
        self.values.insert(column.to_string(), value);
    }

    /// Write records as CSV: `date` then `columns` in the given order.
    /// Missing values are empty cells.
    pub fn write_csv<W: Write>(records: &[DailyRecord], columns: &[String], writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push(DATE_COLUMN);
        header.extend(columns.iter().map(String::as_str));
        wtr.write_record(&header)?;
        for record in records {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(rda_utils::dates::format_date(&record.date));
            for column in columns {
                row.push(record.get(column).map_or(String::new(), |v| v.to_string()));
            }
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write records as a pretty-printed JSON array.
    pub fn write_json<W: Write>(records: &[DailyRecord], writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, records)?;
        Ok(())
    }

    /// Read a daily CSV back. A row whose every column is empty is a missing day.
    pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<DailyRecord>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        if headers.get(0) != Some(DATE_COLUMN) {
            return Err(Era5Error::InvalidFormat(format!(
                "daily CSV must start with a {DATE_COLUMN} column"
            )));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(String::from).collect();

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let raw_date = row.get(0).unwrap_or("");
            let date = rda_utils::dates::parse_date(raw_date)
                .map_err(|_| Era5Error::InvalidFormat(format!("bad date {raw_date:?}")))?;
            let mut record = DailyRecord::complete(date);
            for (i, column) in columns.iter().enumerate() {
                let cell = row.get(i + 1).unwrap_or("");
                let value = if cell.is_empty() {
                    None
                } else {
                    Some(cell.parse::<f64>().map_err(|_| {
                        Era5Error::InvalidFormat(format!("{column} on {raw_date}: {cell:?}"))
                    })?)
                };
                record.set(column, value);
            }
            if !columns.is_empty() && record.values.values().all(Option::is_none) {
                record.status = DayStatus::Missing(MissingReason::NoValues);
            }
            records.push(record);
        }
        Ok(records)
    }
}
