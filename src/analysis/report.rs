//! Serializable shapes of the analysis report.

use crate::analysis::cluster::Cluster;
use crate::spreadsheet::styles::Border;
use crate::spreadsheet::Cell;
use crate::spreadsheet::Styles;
use serde::Serialize;

/// Font name reported when the workbook does not name one
const DEFAULT_FONT_NAME: &str = "Calibri";
/// Font size reported when the workbook does not size one
const DEFAULT_FONT_SIZE: f64 = 11.0;

#[derive(Clone, Debug, Serialize)]
pub struct WorkbookAnalysis {
    pub file_info: FileInfo,
    pub sheets: Vec<SheetAnalysis>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileInfo {
    pub filename: String,
    /// Number of worksheets in the workbook, analysed or not
    pub total_sheets: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SheetAnalysis {
    pub name: String,
    pub dimensions: Dimensions,
    pub tables: Vec<TableCandidate>,
    pub merged_cells: Vec<String>,
    pub styling: StylingPatterns,
    pub formulas: Vec<FormulaEntry>,
    pub headers: Vec<HeaderCandidate>,
    pub structure_analysis: StructurePatterns,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dimensions {
    pub max_row: usize,
    pub max_column: usize,
    pub max_column_letter: String,
}

/// Cell addresses clustered by fill color, font and border
#[derive(Clone, Debug, Serialize)]
pub struct StylingPatterns {
    pub color_patterns: Cluster,
    pub font_patterns: Cluster,
    pub border_patterns: Cluster,
}

impl Default for StylingPatterns {
    fn default() -> Self {
        Self {
            color_patterns: Cluster::new("color"),
            font_patterns: Cluster::new("pattern"),
            border_patterns: Cluster::new("pattern"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormulaEntry {
    pub address: String,
    /// Formula text including the leading `=`
    pub formula: String,
}

/// A contiguous block of rows that looks like tabular data
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCandidate {
    pub start_row: usize,
    pub end_row: usize,
    /// Populated columns of the block's last row
    pub columns: Vec<usize>,
    pub estimated_header_row: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderReason {
    BoldFont,
    BackgroundColor,
    HasBorder,
    HeaderKeywords,
}

impl HeaderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderReason::BoldFont => "bold_font",
            HeaderReason::BackgroundColor => "background_color",
            HeaderReason::HasBorder => "has_border",
            HeaderReason::HeaderKeywords => "header_keywords",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderCandidate {
    pub address: String,
    pub row: usize,
    pub column: usize,
    pub value: String,
    pub reasons: Vec<HeaderReason>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StructurePatterns {
    pub title_cells: Vec<CellRecord>,
    pub calculation_cells: Vec<CellRecord>,
    pub input_cells: Vec<CellRecord>,
    pub total_rows: Vec<CellRecord>,
    pub section_dividers: Vec<CellRecord>,
}

/// Snapshot of one populated cell: value, type and formatting
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellRecord {
    pub address: String,
    pub row: usize,
    pub column: usize,
    pub value: String,
    pub data_type: String,
    pub has_formula: bool,
    pub styling: CellStyling,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CellStyling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    pub font: FontRecord,
    #[serde(skip_serializing_if = "is_false")]
    pub has_border: bool,
    /// Border edge key, kept out of the cell record
    #[serde(skip)]
    pub border_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FontRecord {
    pub bold: bool,
    pub italic: bool,
    pub size: f64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Default for FontRecord {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            size: DEFAULT_FONT_SIZE,
            name: DEFAULT_FONT_NAME.to_owned(),
            color: None,
        }
    }
}

impl FontRecord {
    /// Cluster key `{bold}_{size}_{name}`
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.bold, self.size, self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AlignmentRecord {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: Option<bool>,
}

impl CellRecord {
    pub fn new(cell: &Cell, styles: &Styles) -> Self {
        let style = styles.cell_style(cell.style);
        let font = style
            .font
            .map(|font| FontRecord {
                bold: font.bold,
                italic: font.italic,
                size: font.size.unwrap_or(DEFAULT_FONT_SIZE),
                name: font.name.to_owned().unwrap_or_else(|| DEFAULT_FONT_NAME.to_owned()),
                color: font.color.to_owned(),
            })
            .unwrap_or_default();
        let border = style.border.filter(|border| border.is_visible());
        let styling = CellStyling {
            fill_color: style.fill.and_then(|fill| fill.visible_color()).map(str::to_owned),
            font,
            has_border: border.is_some(),
            border_key: border.map(border_key),
            alignment: style.alignment.map(|alignment| AlignmentRecord {
                horizontal: alignment.horizontal.to_owned(),
                vertical: alignment.vertical.to_owned(),
                wrap_text: alignment.wrap_text,
            }),
        };
        CellRecord {
            address: cell.reference(),
            row: cell.row,
            column: cell.col,
            value: cell.display_value(),
            data_type: cell.data_type().to_owned(),
            has_formula: cell.has_formula(),
            styling,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.styling.font.bold
    }

    /// Fill color that counts as a background: set and not pure white
    pub fn background_color(&self) -> Option<&str> {
        self.styling
            .fill_color
            .as_deref()
            .filter(|color| !is_white(color))
    }

    pub fn is_number(&self) -> bool {
        !self.has_formula && matches!(self.data_type.as_str(), "int" | "float")
    }
}

/// Border cluster key `{left}/{right}/{top}/{bottom}`
fn border_key(border: &Border) -> String {
    let edge = |edge: &Option<String>| edge.to_owned().unwrap_or_else(|| "none".to_owned());
    format!(
        "{}/{}/{}/{}",
        edge(&border.left),
        edge(&border.right),
        edge(&border.top),
        edge(&border.bottom)
    )
}

fn is_white(color: &str) -> bool {
    color.eq_ignore_ascii_case("FFFFFF") || color.eq_ignore_ascii_case("FFFFFFFF")
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::styles::Fill;
    use crate::spreadsheet::styles::Font;
    use crate::spreadsheet::styles::CellFormat;
    use crate::spreadsheet::CellType;

    fn styles() -> Styles {
        Styles {
            fonts: vec![
                Font::default(),
                Font { bold: true, size: Some(14.0), name: Some("Arial".to_owned()), ..Font::default() },
            ],
            fills: vec![
                Fill { pattern: Some("none".to_owned()), color: Some("00000000".to_owned()) },
                Fill { pattern: Some("solid".to_owned()), color: Some("FFFFFFFF".to_owned()) },
            ],
            borders: vec![
                Border::default(),
                Border { bottom: Some("thin".to_owned()), ..Border::default() },
            ],
            formats: vec![
                CellFormat::default(),
                CellFormat { font_id: 1, fill_id: 1, border_id: 1, ..CellFormat::default() },
            ],
        }
    }

    fn cell(style: usize) -> Cell {
        Cell {
            row: 2,
            col: 3,
            kind: CellType::Number,
            value: "42".to_owned(),
            formula: None,
            style,
        }
    }

    #[test]
    fn plain_cell_uses_default_font() {
        let record = CellRecord::new(&cell(0), &styles());
        assert_eq!(record.address, "C2");
        assert_eq!(record.data_type, "int");
        assert_eq!(record.styling.fill_color, None);
        assert_eq!(record.styling.font.key(), "false_11_Calibri");
        assert!(!record.styling.has_border);
        assert!(record.is_number());
    }

    #[test]
    fn styled_cell_snapshot() {
        let record = CellRecord::new(&cell(1), &styles());
        assert!(record.is_bold());
        assert_eq!(record.styling.font.key(), "true_14_Arial");
        assert_eq!(record.styling.fill_color.as_deref(), Some("FFFFFFFF"));
        assert_eq!(record.background_color(), None);
        assert!(record.styling.has_border);
        assert_eq!(record.styling.border_key.as_deref(), Some("none/none/none/thin"));
    }

    #[test]
    fn optional_styling_fields_are_omitted() {
        let record = CellRecord::new(&cell(0), &styles());
        let json = serde_json::to_value(&record).unwrap();
        let styling = json["styling"].as_object().unwrap();
        assert!(!styling.contains_key("fill_color"));
        assert!(!styling.contains_key("has_border"));
        assert!(!styling.contains_key("border_key"));
        assert_eq!(styling["font"]["name"], "Calibri");
        assert_eq!(json["has_formula"], false);
    }
}
