use anyhow::Context;
use clap::Parser;
use fiscasync_tools::analysis;
use fiscasync_tools::analysis::AnalyzerOptions;
use fiscasync_tools::logging;
use fiscasync_tools::spreadsheet::Criteria;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::warn;

/// Reports the layout of an Excel workbook: tables, headers, formulas and
/// styling patterns.
#[derive(Parser, Debug)]
#[command(name = "excel-analyzer", version)]
struct Args {
    /// Workbook to analyse (.xlsx, .xlsm, .xltx or .xltm)
    file: PathBuf,

    /// Directory receiving `<stem>_analysis.json`
    #[arg(long, env = "FISCASYNC_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Only analyse sheets whose name matches one of these glob patterns
    #[arg(long = "sheet", env = "FISCASYNC_SHEETS", value_delimiter = ',')]
    sheets: Vec<String>,

    /// Last row scanned per sheet
    #[arg(long, env = "FISCASYNC_MAX_ROWS", default_value_t = analysis::DEFAULT_MAX_ROWS)]
    max_rows: usize,

    /// Last column scanned per sheet
    #[arg(long, env = "FISCASYNC_MAX_COLUMNS", default_value_t = analysis::DEFAULT_MAX_COLUMNS)]
    max_columns: usize,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    if !args.file.exists() {
        println!("Error: File '{}' not found", args.file.display());
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let criteria = Criteria::with_patterns(args.sheets.as_slice()).context("Invalid sheet pattern")?;
    let options = AnalyzerOptions {
        max_rows: args.max_rows,
        max_columns: args.max_columns,
        criteria,
    };

    println!("Analyzing Excel file...");
    let report = analysis::analyze_file(&args.file, &options)?;
    print!("{}", analysis::render_text(&report));

    let output = analysis::output_path(&args.file, &args.output_dir);
    match analysis::write_json(&report, &output) {
        Ok(()) => println!("\nDetailed analysis saved to: {}", output.display()),
        Err(e) => warn!(path = %output.display(), "Could not save analysis: {e}"),
    }
    Ok(())
}
