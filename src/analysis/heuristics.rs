//! Header, table and layout detection over the cell records of a sheet.

use crate::analysis::report::CellRecord;
use crate::analysis::report::HeaderCandidate;
use crate::analysis::report::HeaderReason;
use crate::analysis::report::StructurePatterns;
use crate::analysis::report::TableCandidate;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Words that mark a label in a French financial statement
const HEADER_KEYWORDS: [&str; 7] = ["total", "titre", "designation", "montant", "exercice", "compte", "libelle"];
/// Header labels are shorter than this many characters
const HEADER_MAX_LENGTH: usize = 50;
/// Populated columns a row needs to belong to a table
const TABLE_MIN_COLUMNS: usize = 3;
/// Columns two consecutive table rows must share
const TABLE_MIN_OVERLAP: usize = 2;
/// Rows a block needs to be reported as a table
const TABLE_MIN_ROWS: usize = 3;
/// Title cells are looked for in the first rows only
const TITLE_MAX_ROW: usize = 10;

/// Consecutive qualifying rows being collected into a table
struct Run {
    start_row: usize,
    end_row: usize,
    last_columns: BTreeSet<usize>,
}

impl Run {
    fn new(row: usize, columns: BTreeSet<usize>) -> Self {
        Run {
            start_row: row,
            end_row: row,
            last_columns: columns,
        }
    }

    fn accepts(&self, row: usize, columns: &BTreeSet<usize>) -> bool {
        row == self.end_row + 1 && self.last_columns.intersection(columns).count() >= TABLE_MIN_OVERLAP
    }

    fn extend(&mut self, row: usize, columns: BTreeSet<usize>) {
        self.end_row = row;
        self.last_columns = columns;
    }

    fn into_table(self) -> Option<TableCandidate> {
        if self.end_row - self.start_row + 1 < TABLE_MIN_ROWS {
            return None;
        }
        Some(TableCandidate {
            start_row: self.start_row,
            end_row: self.end_row,
            columns: self.last_columns.into_iter().collect(),
            estimated_header_row: self.start_row,
        })
    }
}

/// Finds blocks of adjacent rows that share most of their populated columns.
pub(crate) fn identify_tables(records: &[CellRecord]) -> Vec<TableCandidate> {
    let mut rows = BTreeMap::<usize, BTreeSet<usize>>::new();
    for record in records {
        rows.entry(record.row).or_default().insert(record.column);
    }

    let mut tables = Vec::new();
    let mut current = None::<Run>;
    for (row, columns) in rows {
        if columns.len() < TABLE_MIN_COLUMNS {
            continue;
        }
        current = match current.take() {
            Some(mut run) if run.accepts(row, &columns) => {
                run.extend(row, columns);
                Some(run)
            }
            previous => {
                if let Some(table) = previous.and_then(Run::into_table) {
                    tables.push(table);
                }
                Some(Run::new(row, columns))
            }
        };
    }
    if let Some(table) = current.and_then(Run::into_table) {
        tables.push(table);
    }
    tables
}

/// Cells that look like labels, with every reason that applies.
pub(crate) fn identify_headers(records: &[CellRecord]) -> Vec<HeaderCandidate> {
    records
        .iter()
        .filter_map(|record| {
            let mut is_header = false;
            let mut reasons = Vec::new();
            if record.is_bold() {
                is_header = true;
                reasons.push(HeaderReason::BoldFont);
            }
            if record.background_color().is_some() {
                is_header = true;
                reasons.push(HeaderReason::BackgroundColor);
            }
            // a border alone does not make a header
            if record.styling.has_border {
                reasons.push(HeaderReason::HasBorder);
            }
            if has_header_keyword(&record.value) {
                is_header = true;
                reasons.push(HeaderReason::HeaderKeywords);
            }
            is_header.then(|| HeaderCandidate {
                address: record.address.to_owned(),
                row: record.row,
                column: record.column,
                value: record.value.to_owned(),
                reasons,
            })
        })
        .collect()
}

/// Short, non-numeric text containing one of the header keywords
pub(crate) fn has_header_keyword(value: &str) -> bool {
    let value = value.trim();
    if value.chars().count() >= HEADER_MAX_LENGTH || is_numeric_text(value) {
        return false;
    }
    let lowered = value.to_lowercase();
    HEADER_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Digits only once `.`, `,` and spaces are removed
fn is_numeric_text(value: &str) -> bool {
    let mut digits = value.chars().filter(|c| !matches!(c, '.' | ',' | ' ')).peekable();
    digits.peek().is_some() && digits.all(|c| c.is_numeric())
}

/// Sorts cells into titles, calculations, inputs, totals and dividers.
pub(crate) fn analyze_structure(records: &[CellRecord]) -> StructurePatterns {
    let mut patterns = StructurePatterns::default();
    for record in records {
        let value = record.value.trim();
        if record.is_bold() && !value.is_empty() && record.row <= TITLE_MAX_ROW {
            patterns.title_cells.push(record.to_owned());
        }
        if record.has_formula {
            patterns.calculation_cells.push(record.to_owned());
        }
        if record.is_number() && !record.is_bold() {
            patterns.input_cells.push(record.to_owned());
        }
        if value.to_lowercase().contains("total") {
            patterns.total_rows.push(record.to_owned());
        }
        if value.is_empty() && record.background_color().is_some() {
            patterns.section_dividers.push(record.to_owned());
        }
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::CellStyling;
    use crate::analysis::report::FontRecord;
    use crate::spreadsheet::reference::index_to_reference;

    fn record(row: usize, column: usize, value: &str) -> CellRecord {
        CellRecord {
            address: index_to_reference(row, column),
            row,
            column,
            value: value.to_owned(),
            data_type: "str".to_owned(),
            has_formula: false,
            styling: CellStyling::default(),
        }
    }

    fn bold(mut record: CellRecord) -> CellRecord {
        record.styling.font = FontRecord { bold: true, ..FontRecord::default() };
        record
    }

    fn grid(rows: &[(usize, Vec<usize>)]) -> Vec<CellRecord> {
        rows.iter()
            .flat_map(|(row, columns)| columns.iter().map(move |column| record(*row, *column, "x")))
            .collect()
    }

    #[test]
    fn table_from_adjacent_rows() {
        let records = grid(&[(2, vec![1, 2, 3]), (3, vec![1, 2, 3]), (4, vec![2, 3, 4]), (5, vec![1])]);
        assert_eq!(identify_tables(&records), vec![TableCandidate {
            start_row: 2,
            end_row: 4,
            columns: vec![2, 3, 4],
            estimated_header_row: 2,
        }]);
    }

    #[test]
    fn gap_or_low_overlap_splits_tables() {
        // row 5 is missing, row 9 shares a single column with row 8
        let records = grid(&[
            (1, vec![1, 2, 3]), (2, vec![1, 2, 3]), (3, vec![1, 2, 3]),
            (4, vec![1, 2, 3]), (6, vec![1, 2, 3]), (7, vec![1, 2, 3]),
            (8, vec![1, 2, 3]), (9, vec![3, 4, 5]),
        ]);
        let tables = identify_tables(&records);
        let spans = tables.iter().map(|table| (table.start_row, table.end_row)).collect::<Vec<_>>();
        assert_eq!(spans, vec![(1, 4), (6, 8)]);
    }

    #[test]
    fn short_runs_are_not_tables() {
        let records = grid(&[(1, vec![1, 2, 3]), (2, vec![1, 2, 3]), (3, vec![1, 2])]);
        assert!(identify_tables(&records).is_empty());
    }

    #[test]
    fn header_reasons() {
        let mut bordered = record(1, 3, "Note");
        bordered.styling.has_border = true;
        let mut filled = record(2, 1, "Actif");
        filled.styling.fill_color = Some("FFD9E1F2".to_owned());
        let mut white = record(2, 2, "Passif");
        white.styling.fill_color = Some("FFFFFFFF".to_owned());
        let records = vec![
            bold(record(1, 1, "Designation")),
            record(1, 2, "Montant net"),
            bordered,
            filled,
            white,
            record(3, 1, "1 250 000,00"),
        ];
        let headers = identify_headers(&records);
        let found = headers.iter().map(|header| (header.address.as_str(), header.reasons.clone())).collect::<Vec<_>>();
        assert_eq!(found, vec![
            ("A1", vec![HeaderReason::BoldFont, HeaderReason::HeaderKeywords]),
            ("B1", vec![HeaderReason::HeaderKeywords]),
            ("A2", vec![HeaderReason::BackgroundColor]),
        ]);
    }

    #[test]
    fn header_keyword_rules() {
        assert!(has_header_keyword("  TOTAL GENERAL "));
        assert!(has_header_keyword("Libelle du compte"));
        assert!(!has_header_keyword("Capital social"));
        assert!(!has_header_keyword(&format!("Total {}", "x".repeat(50))));
        assert!(!has_header_keyword("12 500.00"));
    }

    #[test]
    fn structure_patterns() {
        let mut formula = record(12, 2, "=SUM(B2:B11)");
        formula.has_formula = true;
        formula.data_type = "formula".to_owned();
        let mut amount = record(3, 2, "1500");
        amount.data_type = "int".to_owned();
        let mut divider = record(4, 1, "");
        divider.styling.fill_color = Some("FF00B0F0".to_owned());
        let records = vec![
            bold(record(1, 1, "BILAN ACTIF")),
            bold(record(11, 1, "Hors titre")),
            amount,
            divider,
            record(12, 1, "Total actif"),
            formula,
        ];
        let patterns = analyze_structure(&records);
        let addresses = |cells: &[CellRecord]| cells.iter().map(|cell| cell.address.to_owned()).collect::<Vec<_>>();
        assert_eq!(addresses(&patterns.title_cells), vec!["A1"]);
        assert_eq!(addresses(&patterns.calculation_cells), vec!["B12"]);
        assert_eq!(addresses(&patterns.input_cells), vec!["B3"]);
        assert_eq!(addresses(&patterns.total_rows), vec!["A12"]);
        assert_eq!(addresses(&patterns.section_dividers), vec!["A4"]);
    }
}
