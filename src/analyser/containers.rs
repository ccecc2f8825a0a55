use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Column count a raw SRT statistics log is expected to carry.
pub const SCHEMA_WIDTH: usize = 30;

// Columns the analysis reads by name.
pub const TIME: &str = "Time";
pub const SECONDS: &str = "Seconds";
pub const SOCKET_ID: &str = "SocketID";
pub const SENT_BYTES: &str = "byteSent";
pub const RTT: &str = "msRTT";
pub const BANDWIDTH: &str = "mbpsBandwidth";
pub const RECV_LATENCY: &str = "RCVLATENCYms";
pub const FLIGHT_SIZE: &str = "pktFlightSize";
pub const FLOW_WINDOW: &str = "pktFlowWindow";
pub const CONGESTION_WINDOW: &str = "pktCongestionWindow";

/// Failures that end the analysis of the current capture.
///
/// All of these short-circuit the pipeline; no partial table is ever produced.
/// A metric with zero events is not a failure and is modelled as an absent
/// [MetricEvents] instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("expected an SRT statistics log with 30 columns, found {found}")]
    SchemaMismatch { found: usize },

    #[error("the log holds no samples, so the capture side cannot be classified")]
    EmptyCapture,

    #[error("column `{0}` is missing from the table")]
    MissingField(String),

    #[error("column `{column}` holds non-numeric value `{value}`")]
    MalformedValue { column: String, value: String },

    #[error("failed to read statistics log: {0}")]
    Csv(#[from] csv::Error),
}

/// Which side of the link produced the capture. Fixed for its whole duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Sender,
    Receiver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A rectangular view of one statistics log: named columns over rows of raw
/// text cells.
///
/// Cells stay as the text they arrived as; numeric passes parse on demand, so
/// projecting and exporting never reformats anything.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column, or [AnalysisError::MissingField].
    pub fn column_index(&self, name: &str) -> Result<usize, AnalysisError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| AnalysisError::MissingField(name.to_string()))
    }

    /// Borrows one cell by row index and column name.
    pub fn cell(&self, row: usize, name: &str) -> Result<&str, AnalysisError> {
        let column = self.column_index(name)?;
        Ok(self.rows[row][column].as_str())
    }

    /// Parses one cell as a float.
    pub fn numeric_cell(&self, row: usize, name: &str) -> Result<f64, AnalysisError> {
        let value = self.cell(row, name)?;
        value.trim().parse().map_err(|_| AnalysisError::MalformedValue {
            column: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Parses a whole column as floats.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, AnalysisError> {
        let column = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| {
                row[column].trim().parse().map_err(|_| AnalysisError::MalformedValue {
                    column: name.to_string(),
                    value: row[column].clone(),
                })
            })
            .collect()
    }

    /// Copies the table without the named columns. Names that are not present
    /// are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Table {
        let kept: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !names.contains(&column.as_str()))
            .map(|(index, _)| index)
            .collect();

        let columns = kept.iter().map(|&index| self.columns[index].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| kept.iter().map(|&index| row[index].clone()).collect())
            .collect();

        Table::new(columns, rows)
    }

    /// Copies the named columns, in the given order.
    pub fn project(&self, names: &[&str]) -> Result<Table, AnalysisError> {
        let picked: Vec<usize> = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<_, _>>()?;

        let columns = picked.iter().map(|&index| self.columns[index].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| picked.iter().map(|&index| row[index].clone()).collect())
            .collect();

        Ok(Table::new(columns, rows))
    }

    /// Copies the rows at the given indices, keeping the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let rows = indices.iter().map(|&index| self.rows[index].clone()).collect();
        Table::new(self.columns.clone(), rows)
    }
}

/// Aggregates for one packet-health metric (loss, drop or retransmission).
#[derive(Debug, Serialize)]
pub struct MetricReport {
    /// Column the metric is read from; doubles as its export sheet name.
    pub column: String,
    /// Human-readable description, e.g. "Lost Sent Data Packets".
    pub label: String,
    /// `None` when the metric never fired during the capture.
    pub events: Option<MetricEvents>,
}

#[derive(Debug, Serialize)]
pub struct MetricEvents {
    pub max: f64,
    pub sum: f64,
    /// The worst rows for this metric, largest value first.
    pub worst: Table,
}

/// Scalar aggregates plus worst-row tables for one normalised capture.
#[derive(Debug, Serialize)]
pub struct LinkStats {
    pub rows: usize,
    pub cols: usize,
    /// Wall-clock time of the last sample.
    pub duration: String,
    /// Configured receive latency bound, ms.
    pub latency_ms: f64,
    pub rtt_min_ms: f64,
    pub rtt_max_ms: f64,
    pub rtt_mean_ms: f64,
    /// Minimum of the link bandwidth estimate, Mbps.
    pub bandwidth_floor_mbps: f64,
    /// Export sheet name for the congestion candidates table.
    pub rate_sheet: String,
    /// Rows with the smallest bandwidth estimate, ascending.
    pub congestion_candidates: Table,
    pub metrics: Vec<MetricReport>,
}

/// Samples whose in-flight packet count exceeded a window bound.
///
/// Holds indices into the normalised table rather than copies, so both breach
/// sets stay views over the same capture.
#[derive(Debug, Serialize)]
pub struct WindowBreach {
    pub window_column: String,
    pub explanation: String,
    pub rows: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![
                vec!["1".to_string(), "x".to_string(), "2.5".to_string()],
                vec!["3".to_string(), "y".to_string(), "4.5".to_string()],
            ],
        )
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        match table().column_index("d") {
            Err(AnalysisError::MissingField(name)) => assert_eq!(name, "d"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn numeric_column_rejects_text() {
        assert!(matches!(
            table().numeric_column("b"),
            Err(AnalysisError::MalformedValue { .. })
        ));
        assert_eq!(table().numeric_column("c").unwrap(), vec![2.5, 4.5]);
    }

    #[test]
    fn drop_and_project_preserve_row_order() {
        let dropped = table().drop_columns(&["b", "nonexistent"]);
        assert_eq!(dropped.columns, vec!["a", "c"]);
        assert_eq!(dropped.rows[1], vec!["3", "4.5"]);

        let projected = table().project(&["c", "a"]).unwrap();
        assert_eq!(projected.columns, vec!["c", "a"]);
        assert_eq!(projected.rows[0], vec!["2.5", "1"]);
    }

    #[test]
    fn take_rows_keeps_requested_order() {
        let picked = table().take_rows(&[1, 0]);
        assert_eq!(picked.rows[0][0], "3");
        assert_eq!(picked.rows[1][0], "1");
    }
}
