//! Helpers for loading SRT statistics logs and massaging raw field values.
use super::containers::{AnalysisError, Table};
use chrono::DateTime;

/// Reads a CSV statistics log into a [Table].
///
/// The first record is taken as the header row. No schema checks happen here;
/// the validator owns those.
pub fn load_file(filepath: &str) -> Result<Table, AnalysisError> {
    log::info!("Loading statistics log from {filepath}");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(filepath)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(columns, rows))
}

/// Parses a raw timestamp cell, elapsed milliseconds since the Unix epoch.
pub fn parse_millis(column: &str, value: &str) -> Result<i64, AnalysisError> {
    value.trim().parse().map_err(|_| AnalysisError::MalformedValue {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Formats an epoch-millisecond timestamp as a wall-clock time of day.
pub fn time_of_day(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(moment) => moment.time().format("%H:%M:%S%.3f").to_string(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_parse_and_reject() {
        assert_eq!(parse_millis("Time", " 61500 ").unwrap(), 61500);
        assert!(matches!(
            parse_millis("Time", "half past"),
            Err(AnalysisError::MalformedValue { .. })
        ));
    }

    #[test]
    fn time_of_day_keeps_millisecond_precision() {
        assert_eq!(time_of_day(61_500), "00:01:01.500");
        assert_eq!(time_of_day(0), "00:00:00.000");
    }
}
