//! # Spreadsheet Structure Analysis
//!
//! Walks the cells of a workbook and reports what its layout looks like:
//! dimensions, merged ranges, formulas, styling clusters, likely headers and
//! likely tables. The detection is heuristic and meant to guide whoever
//! rebuilds the form on screen, not to be authoritative.

mod cluster;
mod heuristics;
mod render;
mod report;

pub use cluster::Cluster;
pub use render::output_path;
pub use render::render_text;
pub use render::write_json;
pub use report::*;

use crate::error::FiscaError;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Styles;
use crate::spreadsheet::Workbook;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Rows scanned per sheet by default
pub const DEFAULT_MAX_ROWS: usize = 200;
/// Columns scanned per sheet by default
pub const DEFAULT_MAX_COLUMNS: usize = 50;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to analyze Excel file: {0}")]
    Failed(String),
}

/// Bounds of the scanned grid and sheet selection
#[derive(Clone, Debug)]
pub struct AnalyzerOptions {
    /// Last row scanned (inclusive)
    pub max_rows: usize,
    /// Last column scanned (inclusive)
    pub max_columns: usize,
    pub criteria: Criteria,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_columns: DEFAULT_MAX_COLUMNS,
            criteria: Criteria::default(),
        }
    }
}

/// Opens and analyses a workbook. Any failure, while opening or while
/// reading a sheet, is reported as a single [`AnalysisError::Failed`].
pub fn analyze_file<P: AsRef<Path>>(path: P, options: &AnalyzerOptions) -> Result<WorkbookAnalysis, FiscaError> {
    let path = path.as_ref();
    info!(file = %path.display(), "Analyzing workbook");
    Workbook::open(path)
        .and_then(|mut workbook| analyze_workbook(&mut workbook, options))
        .map_err(|error| AnalysisError::Failed(error.to_string()).into())
}

pub fn analyze_workbook(workbook: &mut Workbook, options: &AnalyzerOptions) -> Result<WorkbookAnalysis, FiscaError> {
    let sheets = workbook.read_sheets(&options.criteria)?;
    let styles = workbook.styles();
    let analysis = WorkbookAnalysis {
        file_info: FileInfo {
            filename: workbook.name.to_owned(),
            total_sheets: workbook.sheet_names().len(),
        },
        sheets: sheets
            .iter()
            .map(|sheet| analyze_sheet(sheet, styles, options))
            .collect(),
    };
    info!(
        file = %analysis.file_info.filename,
        sheets = analysis.sheets.len(),
        "Workbook analysed"
    );
    Ok(analysis)
}

/// Analyses one sheet within the scan bounds of `options`.
pub fn analyze_sheet(sheet: &Sheet, styles: &Styles, options: &AnalyzerOptions) -> SheetAnalysis {
    let mut styling = StylingPatterns::default();
    let mut formulas = Vec::new();
    let records = sheet
        .cells
        .iter()
        .filter(|cell| cell.row <= options.max_rows && cell.col <= options.max_columns)
        .map(|cell| CellRecord::new(cell, styles))
        .collect::<Vec<_>>();

    for record in &records {
        if let Some(color) = &record.styling.fill_color {
            styling.color_patterns.add(color, &record.address);
        }
        styling.font_patterns.add(&record.styling.font.key(), &record.address);
        if let Some(border) = &record.styling.border_key {
            styling.border_patterns.add(border, &record.address);
        }
        if record.value.starts_with('=') {
            formulas.push(FormulaEntry {
                address: record.address.to_owned(),
                formula: record.value.to_owned(),
            });
        }
    }

    let analysis = SheetAnalysis {
        name: sheet.name.to_owned(),
        dimensions: Dimensions {
            max_row: sheet.max_row,
            max_column: sheet.max_column,
            max_column_letter: sheet.max_column_letter(),
        },
        tables: heuristics::identify_tables(&records),
        merged_cells: sheet.merged_ranges.to_owned(),
        styling,
        formulas,
        headers: heuristics::identify_headers(&records),
        structure_analysis: heuristics::analyze_structure(&records),
    };
    debug!(
        sheet = %analysis.name,
        cells = records.len(),
        tables = analysis.tables.len(),
        headers = analysis.headers.len(),
        formulas = analysis.formulas.len(),
        "Sheet analysed"
    );
    analysis
}
