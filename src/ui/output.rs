use crate::analyser::containers::Table;
use crate::analyser::core::SrtReport;
use crate::analyser::scan;
use ansi_term::Colour;
use std::path::Path;

pub fn print_results(report: &SrtReport) {
    println!("\n\u{250F}\u{2501}\u{2501}\u{2501}\u{2501} Results");
    print_core(report);
    print_metrics(report);
    print_breaches(report);
}

pub fn print_core(report: &SrtReport) {
    let stats = &report.stats;
    println!("\u{2503}");
    println!("\u{2503} {} capture", Colour::Red.paint(report.role.to_string()));
    println!("\u{2503} Columns           : {}", stats.cols);
    println!("\u{2503} Rows              : {}", stats.rows);
    println!("\u{2503} Log Duration      : {}", Colour::Fixed(226).paint(&stats.duration));
    println!("\u{2503} Defined Latency   : {} ms", stats.latency_ms);
    println!("\u{2503} Minimal RTT       : {} ms", stats.rtt_min_ms);
    println!("\u{2503} Maximal RTT       : {} ms", stats.rtt_max_ms);
    println!("\u{2503} Average RTT       : {} ms", stats.rtt_mean_ms);
    println!("\u{2503} Minimal Bandwidth : {} Mbps", stats.bandwidth_floor_mbps);
    println!("\u{2503}");
}

fn print_table(table: &Table) {
    println!("\u{2503}   {}", table.columns.join("  "));
    for row in &table.rows {
        println!("\u{2503}   {}", row.join("  "));
    }
}

fn print_metrics(report: &SrtReport) {
    println!("\u{2503} Congestion candidates (smallest mbpsBandwidth):");
    print_table(&report.stats.congestion_candidates);

    for metric in &report.stats.metrics {
        println!("\u{2503}");
        match &metric.events {
            Some(events) => {
                println!("\u{2503} {}", Colour::Red.paint(&metric.label));
                println!("\u{2503} Maximal : {} packets", events.max);
                println!("\u{2503} Total   : {} packets", events.sum);
                print_table(&events.worst);
            }
            None => println!("\u{2503} No {} Detected", metric.label),
        }
    }
    println!("\u{2503}");
}

fn print_breaches(report: &SrtReport) {
    for breach in [&report.flow_breach, &report.congestion_breach]
        .into_iter()
        .flatten()
    {
        println!(
            "\u{2503} {}",
            Colour::Red.paint(format!("pktFlightSize exceeds {}!", breach.window_column))
        );
        println!("\u{2503} {}", breach.explanation);
        match scan::breach_table(&report.table, breach) {
            Ok(flagged) => print_table(&flagged),
            Err(err) => log::error!("Failed to materialise breach rows: {err}"),
        }
    }
}

pub fn data_as_json(report: &SrtReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub fn data_to_file(data: String, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, data)
}

/// Writes one CSV sheet per present table into `dir`.
///
/// Absent tables mean the metric never fired; their sheets are skipped rather
/// than emitted blank.
pub fn export_sheets(
    sheets: &[(&str, Option<&Table>)],
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    for (name, table) in sheets {
        let Some(table) = table else {
            log::debug!("Skipping empty sheet {name}.");
            continue;
        };

        let path = dir.join(format!("{name}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::utils;
    use tempfile::tempdir;

    fn sheet() -> Table {
        Table::new(
            vec!["Time".to_string(), "msRTT".to_string()],
            vec![
                vec!["00:00:01.000".to_string(), "12.5".to_string()],
                vec!["00:00:02.000".to_string(), "14.25".to_string()],
            ],
        )
    }

    #[test]
    fn export_skips_absent_sheets() {
        let table = sheet();
        let dir = tempdir().unwrap();

        export_sheets(
            &[("mbpsSendRate", Some(&table)), ("pktSndLoss", None)],
            dir.path(),
        )
        .unwrap();

        assert!(dir.path().join("mbpsSendRate.csv").exists());
        assert!(!dir.path().join("pktSndLoss.csv").exists());
    }

    #[test]
    fn exported_sheet_round_trips() {
        let table = sheet();
        let dir = tempdir().unwrap();

        export_sheets(&[("mbpsSendRate", Some(&table))], dir.path()).unwrap();

        let path = dir.path().join("mbpsSendRate.csv");
        let read_back = utils::load_file(path.to_str().unwrap()).unwrap();
        assert_eq!(read_back, table);
    }
}
