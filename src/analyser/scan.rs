//! Scans a normalised capture for in-flight counts that breach window bounds.
use super::containers::{self, AnalysisError, Table, WindowBreach};

/// Shown alongside flow window breaches.
pub const FLOW_EXPLANATION: &str = "pktFlightSize is the distance between the packet sequence \
    number that was last reported by an ACK message and the sequence number of the latest packet \
    sent. It should stay within the flow window granted by the receiver.";

/// Shown alongside congestion window breaches.
pub const CONGESTION_EXPLANATION: &str = "pktFlightSize is the distance between the packet \
    sequence number that was last reported by an ACK message and the sequence number of the \
    latest packet sent. pktCongestionWindow dynamically limits the maximum number of packets in \
    flight; the congestion control module adjusts it as the link changes.";

/// Collects the rows where `pktFlightSize` exceeds the given window column.
fn scan_window(
    table: &Table,
    window_column: &str,
    explanation: &str,
) -> Result<Option<WindowBreach>, AnalysisError> {
    let flight = table.numeric_column(containers::FLIGHT_SIZE)?;
    let window = table.numeric_column(window_column)?;

    let rows: Vec<usize> = flight
        .iter()
        .zip(window.iter())
        .enumerate()
        .filter(|(_, (in_flight, bound))| in_flight > bound)
        .map(|(index, _)| index)
        .collect();

    if rows.is_empty() {
        return Ok(None);
    }

    log::warn!("{} samples have pktFlightSize above {window_column}.", rows.len());
    Ok(Some(WindowBreach {
        window_column: window_column.to_string(),
        explanation: explanation.to_string(),
        rows,
    }))
}

/// Runs both window scans over the capture.
///
/// The selections are independent: a sample can breach the flow window, the
/// congestion window, both, or neither.
pub fn scan_for_window_breaches(
    table: &Table,
) -> Result<(Option<WindowBreach>, Option<WindowBreach>), AnalysisError> {
    let flow = scan_window(table, containers::FLOW_WINDOW, FLOW_EXPLANATION)?;
    let congestion = scan_window(table, containers::CONGESTION_WINDOW, CONGESTION_EXPLANATION)?;

    Ok((flow, congestion))
}

/// Materialises the two relevant columns for every flagged row.
pub fn breach_table(table: &Table, breach: &WindowBreach) -> Result<Table, AnalysisError> {
    table
        .take_rows(&breach.rows)
        .project(&[containers::FLIGHT_SIZE, breach.window_column.as_str()])
}
