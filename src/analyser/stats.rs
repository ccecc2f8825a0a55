//! Read-only aggregation over a normalised capture table.
use super::containers::{self, AnalysisError, LinkStats, MetricEvents, MetricReport, Role, Table};
use super::core::role_spec;
use std::cmp::Ordering;

/// Bounds for the operator-selected worst-row count.
pub const MIN_WORST_ROWS: usize = 1;
pub const MAX_WORST_ROWS: usize = 100;
pub const DEFAULT_WORST_ROWS: usize = 10;

/// Silently clamps the requested worst-row count into its bounds.
pub fn clamp_worst_rows(requested: usize) -> usize {
    requested.clamp(MIN_WORST_ROWS, MAX_WORST_ROWS)
}

/// RTT figures are reported at three fractional digits.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Min, max and mean of the RTT column, each rounded to three digits.
pub fn rtt_bounds(table: &Table) -> Result<(f64, f64, f64), AnalysisError> {
    let rtt = table.numeric_column(containers::RTT)?;
    let mean = rtt.iter().sum::<f64>() / rtt.len() as f64;

    Ok((round3(fold_min(&rtt)), round3(fold_max(&rtt)), round3(mean)))
}

/// Indices of the `n` rows with the smallest value in `column`, ascending.
///
/// The sort is stable, so rows with equal values keep their capture order.
pub fn smallest_rows(table: &Table, column: &str, n: usize) -> Result<Vec<usize>, AnalysisError> {
    let values = table.numeric_column(column)?;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    order.truncate(n);

    Ok(order)
}

/// Indices of the `n` rows with the largest value in `column`, descending,
/// with the same tie rule as [smallest_rows].
pub fn largest_rows(table: &Table, column: &str, n: usize) -> Result<Vec<usize>, AnalysisError> {
    let values = table.numeric_column(column)?;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    order.truncate(n);

    Ok(order)
}

/// Builds the full statistics summary for one normalised capture.
///
/// Metrics that never fired (column maximum of zero) get no worst-row table
/// and no max/sum; that absence flows through to the export side, which skips
/// the sheet entirely.
pub fn summarise(table: &Table, role: Role, worst_rows: usize) -> Result<LinkStats, AnalysisError> {
    let spec = role_spec(role);
    let n = clamp_worst_rows(worst_rows);

    let (rtt_min, rtt_max, rtt_mean) = rtt_bounds(table)?;
    let bandwidth = table.numeric_column(containers::BANDWIDTH)?;

    let last = table.len() - 1;
    let duration = table.cell(last, containers::TIME)?.to_string();
    let latency_ms = table.numeric_cell(last, containers::RECV_LATENCY)?;

    let candidates = smallest_rows(table, containers::BANDWIDTH, n)?;
    let congestion_candidates = table.take_rows(&candidates).project(spec.report_columns)?;

    let mut metrics = Vec::with_capacity(spec.metrics.len());
    for &(column, label) in spec.metrics {
        let values = table.numeric_column(column)?;
        let max = fold_max(&values);

        let events = if max > 0.0 {
            let worst = table
                .take_rows(&largest_rows(table, column, n)?)
                .project(spec.report_columns)?;
            Some(MetricEvents {
                max,
                sum: values.iter().sum(),
                worst,
            })
        } else {
            log::debug!("No {label} detected.");
            None
        };

        metrics.push(MetricReport {
            column: column.to_string(),
            label: label.to_string(),
            events,
        });
    }

    Ok(LinkStats {
        rows: table.len(),
        cols: table.width(),
        duration,
        latency_ms,
        rtt_min_ms: rtt_min,
        rtt_max_ms: rtt_max,
        rtt_mean_ms: rtt_mean,
        bandwidth_floor_mbps: fold_min(&bandwidth),
        rate_sheet: spec.rate_sheet.to_string(),
        congestion_candidates,
        metrics,
    })
}
