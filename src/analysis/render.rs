use crate::analysis::report::WorkbookAnalysis;
use crate::error::FiscaError;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

const MERGED_CELLS_SHOWN: usize = 10;
const HEADERS_SHOWN: usize = 10;
const FORMULAS_SHOWN: usize = 5;
const COLORS_SHOWN: usize = 5;

/// Console report of an analysis.
pub fn render_text(analysis: &WorkbookAnalysis) -> String {
    TextReport(analysis).to_string()
}

struct TextReport<'a>(&'a WorkbookAnalysis);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(out, self.0)
    }
}

fn write_report(out: &mut fmt::Formatter<'_>, analysis: &WorkbookAnalysis) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out, "EXCEL FILE ANALYSIS: {}", analysis.file_info.filename)?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out)?;
    writeln!(out, "Total Sheets: {}", analysis.file_info.total_sheets)?;

    for sheet in &analysis.sheets {
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "SHEET: {}", sheet.name)?;
        writeln!(out, "{}", "=".repeat(60))?;
        let dimensions = &sheet.dimensions;
        writeln!(
            out,
            "Dimensions: {} rows × {} columns ({})",
            dimensions.max_row, dimensions.max_column, dimensions.max_column_letter
        )?;

        if !sheet.merged_cells.is_empty() {
            let shown = sheet.merged_cells.iter().take(MERGED_CELLS_SHOWN).cloned().collect::<Vec<_>>();
            writeln!(out)?;
            writeln!(out, "Merged Cells ({}): {}", sheet.merged_cells.len(), shown.join(", "))?;
            if sheet.merged_cells.len() > MERGED_CELLS_SHOWN {
                writeln!(out, "... and {} more", sheet.merged_cells.len() - MERGED_CELLS_SHOWN)?;
            }
        }

        if !sheet.headers.is_empty() {
            writeln!(out)?;
            writeln!(out, "Identified Headers ({}):", sheet.headers.len())?;
            for header in sheet.headers.iter().take(HEADERS_SHOWN) {
                let reasons = header.reasons.iter().map(|reason| reason.as_str()).collect::<Vec<_>>();
                writeln!(out, "  - {}: {} ({})", header.address, header.value, reasons.join(", "))?;
            }
            if sheet.headers.len() > HEADERS_SHOWN {
                writeln!(out, "  ... and {} more", sheet.headers.len() - HEADERS_SHOWN)?;
            }
        }

        if !sheet.tables.is_empty() {
            writeln!(out)?;
            writeln!(out, "Identified Tables ({}):", sheet.tables.len())?;
            for (index, table) in sheet.tables.iter().enumerate() {
                writeln!(
                    out,
                    "  Table {}: Rows {}-{}, Columns: {:?}",
                    index + 1,
                    table.start_row,
                    table.end_row,
                    table.columns
                )?;
            }
        }

        if !sheet.formulas.is_empty() {
            writeln!(out)?;
            writeln!(out, "Formulas ({}):", sheet.formulas.len())?;
            for formula in sheet.formulas.iter().take(FORMULAS_SHOWN) {
                writeln!(out, "  - {}: {}", formula.address, formula.formula)?;
            }
            if sheet.formulas.len() > FORMULAS_SHOWN {
                writeln!(out, "  ... and {} more", sheet.formulas.len() - FORMULAS_SHOWN)?;
            }
        }

        let colors = &sheet.styling.color_patterns;
        if !colors.is_empty() {
            writeln!(out)?;
            writeln!(out, "Color Patterns ({}):", colors.len())?;
            for (color, cells) in colors.iter().take(COLORS_SHOWN) {
                writeln!(out, "  - Color {}: {} cells", color, cells.len())?;
            }
            if colors.len() > COLORS_SHOWN {
                writeln!(out, "  ... and {} more colors", colors.len() - COLORS_SHOWN)?;
            }
        }

        let structure = &sheet.structure_analysis;
        if !structure.title_cells.is_empty() {
            writeln!(out)?;
            writeln!(out, "Title Cells: {}", structure.title_cells.len())?;
        }
        if !structure.calculation_cells.is_empty() {
            writeln!(out, "Calculation Cells: {}", structure.calculation_cells.len())?;
        }
        if !structure.total_rows.is_empty() {
            writeln!(out, "Total Rows: {}", structure.total_rows.len())?;
        }
    }
    Ok(())
}

/// Where the JSON report of `input` goes: `<dir>/<stem>_analysis.json`
pub fn output_path(input: &Path, dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_owned());
    dir.join(format!("{stem}_analysis.json"))
}

/// Writes the analysis as pretty-printed UTF-8 JSON.
pub fn write_json(analysis: &WorkbookAnalysis, path: &Path) -> Result<(), FiscaError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, analysis)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::Dimensions;
    use crate::analysis::report::FileInfo;
    use crate::analysis::report::FormulaEntry;
    use crate::analysis::report::HeaderCandidate;
    use crate::analysis::report::HeaderReason;
    use crate::analysis::report::SheetAnalysis;
    use crate::analysis::report::StructurePatterns;
    use crate::analysis::report::StylingPatterns;
    use crate::analysis::report::TableCandidate;

    fn analysis() -> WorkbookAnalysis {
        let mut styling = StylingPatterns::default();
        styling.color_patterns.add("FFFFFF00", "A1");
        styling.color_patterns.add("FFFFFF00", "B1");
        let formulas = (2..=8)
            .map(|row| FormulaEntry { address: format!("D{row}"), formula: format!("=B{row}*C{row}") })
            .collect();
        WorkbookAnalysis {
            file_info: FileInfo { filename: "liasse.xlsx".to_owned(), total_sheets: 1 },
            sheets: vec![SheetAnalysis {
                name: "Bilan".to_owned(),
                dimensions: Dimensions { max_row: 8, max_column: 4, max_column_letter: "D".to_owned() },
                tables: vec![TableCandidate { start_row: 1, end_row: 8, columns: vec![1, 2, 3, 4], estimated_header_row: 1 }],
                merged_cells: vec!["A10:D10".to_owned()],
                styling,
                formulas,
                headers: vec![HeaderCandidate {
                    address: "A1".to_owned(),
                    row: 1,
                    column: 1,
                    value: "Désignation".to_owned(),
                    reasons: vec![HeaderReason::BoldFont, HeaderReason::BackgroundColor],
                }],
                structure_analysis: StructurePatterns::default(),
            }],
        }
    }

    #[test]
    fn text_report() {
        let text = render_text(&analysis());
        assert!(text.starts_with(&format!("\n{}\nEXCEL FILE ANALYSIS: liasse.xlsx\n", "=".repeat(80))));
        assert!(text.contains("Total Sheets: 1\n"));
        assert!(text.contains("SHEET: Bilan\n"));
        assert!(text.contains("Dimensions: 8 rows × 4 columns (D)\n"));
        assert!(text.contains("Merged Cells (1): A10:D10\n"));
        assert!(text.contains("  - A1: Désignation (bold_font, background_color)\n"));
        assert!(text.contains("  Table 1: Rows 1-8, Columns: [1, 2, 3, 4]\n"));
        assert!(text.contains("Formulas (7):\n"));
        assert!(text.contains("  - D6: =B6*C6\n"));
        assert!(!text.contains("D7: =B7*C7"));
        assert!(text.contains("  ... and 2 more\n"));
        assert!(text.contains("  - Color FFFFFF00: 2 cells\n"));
        assert!(!text.contains("Title Cells"));
    }

    #[test]
    fn json_report() {
        let directory = tempfile::tempdir().unwrap();
        let path = output_path(Path::new("/data/Liasse 2024.xlsx"), directory.path());
        assert_eq!(path.file_name().unwrap(), "Liasse 2024_analysis.json");

        write_json(&analysis(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"file_info\": {\n    \"filename\": \"liasse.xlsx\""));
        assert!(written.contains("\"value\": \"Désignation\""));
        assert!(written.contains("\"reasons\": [\n            \"bold_font\",\n            \"background_color\"\n          ]"));
        assert!(written.contains("\"color_patterns\": [\n          {\n            \"color\": \"FFFFFF00\""));
    }

    #[test]
    fn json_to_missing_directory_fails() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("absent").join("report.json");
        assert!(matches!(write_json(&analysis(), &path), Err(FiscaError::IoError(_))));
    }
}
