use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::reference::column_letter;

/// A worksheet read from a workbook: its populated cells in row-major order,
/// merged ranges and used range.
#[derive(Clone, Debug)]
pub struct Sheet {
    /// Sheet name
    pub name: String,
    /// Populated cells sorted by row then column
    pub cells: Vec<Cell>,
    /// Merged ranges as written in the worksheet (`A1:C1`)
    pub merged_ranges: Vec<String>,
    /// Last used row (1-based), styled empty cells included
    pub max_row: usize,
    /// Last used column (1-based), styled empty cells included
    pub max_column: usize,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            merged_ranges: Vec::new(),
            max_row: 0,
            max_column: 0,
        }
    }

    /// Extends the used range to include a cell position.
    pub(crate) fn touch(&mut self, row: usize, col: usize) {
        self.max_row = self.max_row.max(row);
        self.max_column = self.max_column.max(col);
    }

    /// Adds a populated cell and extends the used range.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.touch(cell.row, cell.col);
        self.cells.push(cell);
    }

    /// Sorts cells and clamps an empty sheet to a 1×1 used range.
    pub(crate) fn finish(&mut self) {
        self.cells.sort_by_key(|cell| (cell.row, cell.col));
        self.max_row = self.max_row.max(1);
        self.max_column = self.max_column.max(1);
    }

    pub fn max_column_letter(&self) -> String {
        column_letter(self.max_column.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&(row, col), |cell| (cell.row, cell.col))
            .ok()
            .map(|index| &self.cells[index])
    }
}
