//! Pipeline stages: schema validation, capture-side classification, column
//! normalisation and report assembly.
use super::containers::{self, AnalysisError, LinkStats, Role, Table, WindowBreach, SCHEMA_WIDTH};
use super::{scan, stats, utils};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

// Columns only the receiving side fills in; pruned from a sender capture.
const SENDER_DROP: &[&str] = &[
    "pktRecv",
    "pktRcvLoss",
    "pktRcvDrop",
    "pktRcvRetrans",
    "pktRcvBelated",
    "byteRecv",
    "byteRcvLoss",
    "byteRcvDrop",
    "mbpsRecvRate",
    "mbpsMaxBW",
    "pktRcvFilterExtra",
    "pktRcvFilterSupply",
    "pktRcvFilterLoss",
];

// Columns only the sending side fills in; pruned from a receiver capture.
const RECEIVER_DROP: &[&str] = &[
    "pktSent",
    "pktSndLoss",
    "pktSndDrop",
    "pktRetrans",
    "byteSent",
    "byteSndDrop",
    "mbpsSendRate",
    "mbpsMaxBW",
    "pktSndFilterExtra",
];

const SENDER_METRICS: &[(&str, &str)] = &[
    ("pktSndLoss", "Lost Sent Data Packets"),
    ("pktSndDrop", "Dropped Sent Data Packets"),
    ("pktRetrans", "Retransmitted Data Packets"),
];

const RECEIVER_METRICS: &[(&str, &str)] = &[
    ("pktRcvLoss", "Lost Received Data Packets"),
    ("pktRcvDrop", "Dropped Received Data Packets"),
    ("pktRcvRetrans", "Retransmitted Data Packets"),
];

const SENDER_REPORT: &[&str] = &[
    "Time",
    "msRTT",
    "mbpsBandwidth",
    "pktSndDrop",
    "pktSndLoss",
    "pktRetrans",
    "mbpsSendRate",
];

const RECEIVER_REPORT: &[&str] = &[
    "Time",
    "msRTT",
    "mbpsBandwidth",
    "pktRcvDrop",
    "pktRcvLoss",
    "pktRcvRetrans",
    "mbpsRecvRate",
];

/// Per-side column bookkeeping: what to prune, which metrics to track and
/// which columns the worst-row tables report.
pub struct RoleSpec {
    pub drop: &'static [&'static str],
    pub metrics: &'static [(&'static str, &'static str)],
    pub report_columns: &'static [&'static str],
    pub rate_sheet: &'static str,
}

lazy_static! {
    static ref ROLE_SPECS: HashMap<Role, RoleSpec> = {
        let mut specs = HashMap::new();
        specs.insert(
            Role::Sender,
            RoleSpec {
                drop: SENDER_DROP,
                metrics: SENDER_METRICS,
                report_columns: SENDER_REPORT,
                rate_sheet: "mbpsSendRate",
            },
        );
        specs.insert(
            Role::Receiver,
            RoleSpec {
                drop: RECEIVER_DROP,
                metrics: RECEIVER_METRICS,
                report_columns: RECEIVER_REPORT,
                rate_sheet: "mbpsBandwidth",
            },
        );
        specs
    };
}

pub fn role_spec(role: Role) -> &'static RoleSpec {
    &ROLE_SPECS[&role]
}

/// Checks the raw schema width and strips the socket identifier column, which
/// carries no analytic value.
///
/// A width mismatch ends the analysis; no partial table is produced.
pub fn validate_schema(raw: &Table) -> Result<Table, AnalysisError> {
    if raw.width() != SCHEMA_WIDTH {
        return Err(AnalysisError::SchemaMismatch { found: raw.width() });
    }

    Ok(raw.drop_columns(&[containers::SOCKET_ID]))
}

/// Classifies the capture side from the first sample's cumulative sent bytes.
///
/// A capture that never sent a byte is read as receiver-side; that covers the
/// truly idle case as well.
pub fn classify_role(table: &Table) -> Result<Role, AnalysisError> {
    if table.is_empty() {
        return Err(AnalysisError::EmptyCapture);
    }

    let sent = table.numeric_cell(0, containers::SENT_BYTES)?;
    Ok(if sent != 0.0 { Role::Sender } else { Role::Receiver })
}

/// Prunes the columns the capture side cannot have filled in, derives the
/// elapsed-seconds field and rewrites `Time` as a wall-clock time of day.
///
/// Seconds are derived from the raw millisecond timestamps before the
/// rewrite; the time-of-day form drops the date and wraps at midnight, so
/// deriving afterwards would corrupt long captures.
pub fn normalise(table: &Table, role: Role) -> Result<Table, AnalysisError> {
    log::info!("Normalising {role}-side capture.");
    let pruned = table.drop_columns(role_spec(role).drop);
    let time_index = pruned.column_index(containers::TIME)?;

    let mut columns = Vec::with_capacity(pruned.width() + 1);
    columns.push(containers::SECONDS.to_string());
    columns.extend(pruned.columns.iter().cloned());

    let mut rows = Vec::with_capacity(pruned.len());
    for row in &pruned.rows {
        let millis = utils::parse_millis(containers::TIME, &row[time_index])?;

        let mut cells = Vec::with_capacity(row.len() + 1);
        cells.push((millis as f64 / 1000.0).to_string());
        for (index, cell) in row.iter().enumerate() {
            if index == time_index {
                cells.push(utils::time_of_day(millis));
            } else {
                cells.push(cell.clone());
            }
        }
        rows.push(cells);
    }

    Ok(Table::new(columns, rows))
}

/// Everything derived from one capture: the normalised table, the scalar and
/// worst-row statistics, and the two window breach sets.
#[derive(Debug, Serialize)]
pub struct SrtReport {
    pub role: Role,
    pub table: Table,
    pub stats: LinkStats,
    pub flow_breach: Option<WindowBreach>,
    pub congestion_breach: Option<WindowBreach>,
}

impl SrtReport {
    /// Sheet-name-to-table mapping handed to the export side.
    ///
    /// An absent table means "skip this sheet", never "emit a blank one".
    pub fn export_sheets(&self) -> Vec<(&str, Option<&Table>)> {
        let mut sheets: Vec<(&str, Option<&Table>)> = vec![(
            self.stats.rate_sheet.as_str(),
            Some(&self.stats.congestion_candidates),
        )];

        for metric in &self.stats.metrics {
            sheets.push((
                metric.column.as_str(),
                metric.events.as_ref().map(|events| &events.worst),
            ));
        }

        sheets
    }
}

/// Runs the full pipeline over one raw record set.
///
/// `worst_rows` bounds the per-metric worst-row tables and is clamped to
/// 1-100. The input table is left untouched; every stage works on its own
/// copy, so running twice over the same input yields the same report.
pub fn analyse(raw: &Table, worst_rows: usize) -> Result<SrtReport, AnalysisError> {
    log::info!("Starting analysis.");

    let validated = validate_schema(raw)?;
    let role = classify_role(&validated)?;
    log::info!("Capture classified as {role}-side.");

    let table = normalise(&validated, role)?;
    let stats = stats::summarise(&table, role, worst_rows)?;
    let (flow_breach, congestion_breach) = scan::scan_for_window_breaches(&table)?;

    Ok(SrtReport {
        role,
        table,
        stats,
        flow_breach,
        congestion_breach,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 30] = [
        "Time",
        "SocketID",
        "pktFlowWindow",
        "pktCongestionWindow",
        "pktFlightSize",
        "msRTT",
        "mbpsBandwidth",
        "mbpsMaxBW",
        "pktSent",
        "pktSndLoss",
        "pktSndDrop",
        "pktRetrans",
        "byteSent",
        "byteSndDrop",
        "mbpsSendRate",
        "usPktSndPeriod",
        "pktSndFilterExtra",
        "pktRecv",
        "pktRcvLoss",
        "pktRcvDrop",
        "pktRcvRetrans",
        "pktRcvBelated",
        "byteRecv",
        "byteRcvLoss",
        "byteRcvDrop",
        "mbpsRecvRate",
        "RCVLATENCYms",
        "pktRcvFilterExtra",
        "pktRcvFilterSupply",
        "pktRcvFilterLoss",
    ];

    fn raw_row(time: i64, byte_sent: i64) -> Vec<String> {
        HEADER
            .iter()
            .map(|&column| match column {
                "Time" => time.to_string(),
                "SocketID" => "381316134".to_string(),
                "byteSent" => byte_sent.to_string(),
                "msRTT" => "12.5".to_string(),
                "mbpsBandwidth" => "9.8".to_string(),
                "RCVLATENCYms" => "120".to_string(),
                "pktFlowWindow" => "8192".to_string(),
                "pktCongestionWindow" => "8192".to_string(),
                _ => "0".to_string(),
            })
            .collect()
    }

    fn raw_table(rows: &[(i64, i64)]) -> Table {
        Table::new(
            HEADER.iter().map(|column| column.to_string()).collect(),
            rows.iter().map(|&(time, sent)| raw_row(time, sent)).collect(),
        )
    }

    #[test]
    fn valid_schema_drops_socket_id() {
        let validated = validate_schema(&raw_table(&[(1000, 0)])).unwrap();
        assert_eq!(validated.width(), 29);
        assert!(validated.column_index(containers::SOCKET_ID).is_err());
    }

    #[test]
    fn schema_mismatch_reports_actual_width() {
        let mut raw = raw_table(&[(1000, 0)]);
        raw.columns.pop();
        for row in &mut raw.rows {
            row.pop();
        }

        match validate_schema(&raw) {
            Err(AnalysisError::SchemaMismatch { found }) => assert_eq!(found, 29),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_schema_stops_the_pipeline() {
        let mut raw = raw_table(&[(1000, 137)]);
        raw.columns.push("extra".to_string());
        for row in &mut raw.rows {
            row.push("0".to_string());
        }

        assert!(matches!(
            analyse(&raw, 10),
            Err(AnalysisError::SchemaMismatch { found: 31 })
        ));
    }

    #[test]
    fn classifies_sender_and_receiver() {
        let sender = validate_schema(&raw_table(&[(1000, 137)])).unwrap();
        assert_eq!(classify_role(&sender).unwrap(), Role::Sender);

        let receiver = validate_schema(&raw_table(&[(1000, 0)])).unwrap();
        assert_eq!(classify_role(&receiver).unwrap(), Role::Receiver);
    }

    #[test]
    fn empty_capture_cannot_be_classified() {
        let empty = validate_schema(&raw_table(&[])).unwrap();
        assert!(matches!(classify_role(&empty), Err(AnalysisError::EmptyCapture)));
    }

    #[test]
    fn sender_table_keeps_no_receiver_columns() {
        let validated = validate_schema(&raw_table(&[(1000, 137), (1500, 137)])).unwrap();
        let table = normalise(&validated, Role::Sender).unwrap();

        for dropped in role_spec(Role::Sender).drop {
            assert!(table.column_index(dropped).is_err(), "{dropped} survived");
        }
        assert_eq!(table.columns[0], containers::SECONDS);
    }

    #[test]
    fn receiver_table_keeps_no_sender_columns() {
        let validated = validate_schema(&raw_table(&[(1000, 0), (1500, 0)])).unwrap();
        let table = normalise(&validated, Role::Receiver).unwrap();

        for dropped in role_spec(Role::Receiver).drop {
            assert!(table.column_index(dropped).is_err(), "{dropped} survived");
        }
        assert_eq!(table.columns[0], containers::SECONDS);
    }

    #[test]
    fn seconds_follow_input_timestamps() {
        let validated = validate_schema(&raw_table(&[(1000, 0), (1500, 0), (2000, 0)])).unwrap();
        let table = normalise(&validated, Role::Receiver).unwrap();

        let seconds = table.numeric_column(containers::SECONDS).unwrap();
        assert_eq!(seconds, vec![1.0, 1.5, 2.0]);
        assert!(seconds.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn time_rewritten_as_time_of_day() {
        let validated = validate_schema(&raw_table(&[(61_500, 137)])).unwrap();
        let table = normalise(&validated, Role::Sender).unwrap();

        assert_eq!(table.cell(0, containers::TIME).unwrap(), "00:01:01.500");
    }

    #[test]
    fn pipeline_is_pure_and_repeatable() {
        let raw = raw_table(&[(1000, 137), (2000, 137), (3000, 137)]);
        let before = raw.clone();

        let first = analyse(&raw, 10).unwrap();
        let second = analyse(&raw, 10).unwrap();

        assert_eq!(raw, before);
        assert_eq!(first.table, second.table);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
