mod analyser;
mod ui;

use clap::{ArgAction, Parser};
use std::fs;
use std::path::Path;
use ui::output;

/// srtsift derives diagnostic statistics from SRT telemetry logs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV statistics log to analyse
    #[arg(short = 'f', long, value_parser)]
    file: String,

    /// Rows per worst-sample table, clamped to 1-100
    #[arg(short = 'r', long, default_value_t = analyser::stats::DEFAULT_WORST_ROWS, value_parser)]
    rows: usize,

    /// Display output as formatted JSON
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,

    /// Directory to export per-table CSV sheets
    #[arg(short = 'o', long, value_parser)]
    output_dir: Option<String>,
}

fn main() {
    simple_logger::init_with_env().unwrap();

    let args = Args::parse();
    let out;

    if let Some(out_dir) = args.output_dir.as_deref() {
        log::info!("Output directory {out_dir}");
        let _ = fs::create_dir_all(out_dir);
        out = Some(out_dir);
    } else {
        out = None;
    }

    let raw = match analyser::utils::load_file(&args.file) {
        Ok(table) => table,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    let report = match analyser::core::analyse(&raw, args.rows) {
        Ok(report) => report,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    // ---- Output ----
    if args.json {
        match output::data_as_json(&report) {
            Ok(json) => {
                if let Some(out_dir) = out {
                    let _ = output::data_to_file(json, Path::new(&format!("{out_dir}/srt_report.json")));
                } else {
                    println!("{json}");
                }
            }
            Err(err) => log::error!("Failed to serialise report: {err}"),
        }
    } else {
        output::print_results(&report);
        if let Some(out_dir) = out {
            if let Err(err) = output::export_sheets(&report.export_sheets(), Path::new(out_dir)) {
                log::error!("Export failed: {err}");
            }
        }
    }
}
