use crate::error::FiscaError;
use crate::error::ResultMessage;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::formula::SharedFormulas;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::styles::load_styles;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_FORMULA: QName = QName(b"f");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const TAG_MERGE_CELL: QName = QName(b"mergeCell");

/// Extensions of the SpreadsheetML package family
const SUPPORTED_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xltx", "xltm"];

/// An opened xlsx workbook: sheet list, styles and shared strings are loaded
/// eagerly, worksheets are parsed on demand.
pub struct Workbook {
    /// File name of the workbook
    pub name: String,
    zip: ZipArchive<UnifiedReader>,
    styles: Styles,
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
}

impl Workbook {
    /// Opens an xlsx workbook from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Workbook, FiscaError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            Err(SpreadsheetError::UnsupportedFormat(name.to_owned()))?;
        }
        Self::from_reader(&name, UnifiedReader::open(path)?)
    }

    /// Opens an xlsx workbook held in memory.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Workbook, FiscaError> {
        Self::from_reader(name, UnifiedReader::from_bytes(bytes))
    }

    /// Opens a workbook from an already opened reader; `name` is used in
    /// messages and the report.
    pub fn from_reader(name: &str, mut reader: UnifiedReader) -> Result<Workbook, FiscaError> {
        if reader.is_compound_document()? {
            Err(SpreadsheetError::PasswordProtected(name.to_owned()))?;
        }

        let mut zip = ZipArchive::new(reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(name.to_owned()))?;
        }
        let styles = load_styles(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(
            workbook = name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            date1904 = is_1904,
            "Opened workbook"
        );
        Ok(Workbook {
            name: name.to_owned(),
            zip,
            styles,
            shared_strings,
            sheets,
        })
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }

    /// Reads one worksheet by name.
    pub fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, FiscaError> {
        let zip_path = self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?;
        self.read_worksheet(sheet_name, &zip_path)
    }

    /// Reads the worksheets selected by the criteria, in workbook order.
    pub fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, FiscaError> {
        let selected = self.sheets
            .iter()
            .filter(|(name, _)| criteria.accept(name))
            .take(criteria.sheet_limit.unwrap_or(usize::MAX))
            .cloned()
            .collect::<Vec<_>>();
        selected
            .iter()
            .map(|(name, path)| self.read_worksheet(name, path).with_prefix(&format!("Sheet '{name}'")))
            .collect()
    }

    /// Parses a worksheet part: cell values, formulas and merged ranges.
    fn read_worksheet(&mut self, sheet_name: &str, zip_path: &str) -> Result<Sheet, FiscaError> {
        let mut sheet = Sheet::new(sheet_name);
        let mut shared_formulas = SharedFormulas::default();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut current = None::<Cell>;
        let mut has_value = false;
        let mut reader = self.zip
            .xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::MissingPart(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                row_count = event.parse_attribute_value::<usize>("r")?.unwrap_or(row_count + 1);
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                let (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count.max(1), col_count + 1));
                col_count = col;
                let style = event.parse_attribute_value::<usize>("s")?.unwrap_or(0);
                let kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("s") => CellType::SharedString,
                    Some("inlineStr") => CellType::InlineString,
                    Some("str") => CellType::FormulaString,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    Some("d") => CellType::IsoDateTime,
                    _ => self.styles.number_format(style),
                };
                has_value = false;
                current = Some(Cell {
                    row,
                    col,
                    kind,
                    value: String::new(),
                    formula: None,
                    style,
                });
            }
            Event::Start(event) if current.is_some() && event.name() == TAG_FORMULA => {
                let shared_id = match event.get_attribute_value("t")?.as_deref() {
                    Some("shared") => event.get_attribute_value("si")?.map(|id| id.to_string()),
                    _ => None,
                };
                let text = read_string_value(&mut reader, TAG_FORMULA, true)?;
                if let Some(cell) = current.as_mut() {
                    cell.formula = match shared_id {
                        Some(id) if text.is_empty() => shared_formulas.resolve(&id, cell.row, cell.col),
                        Some(id) => {
                            shared_formulas.define(&id, &text, cell.row, cell.col);
                            Some(text)
                        }
                        None if text.is_empty() => None,
                        None => Some(text),
                    };
                }
            }
            Event::Start(event) if current.is_some() && event.name() == TAG_VALUE => {
                let text = read_string_value(&mut reader, TAG_VALUE, true)?;
                has_value = !text.is_empty();
                if let Some(cell) = current.as_mut() {
                    cell.value = text;
                }
            }
            Event::Start(event) if current.is_some() && event.name() == TAG_INLINE_STRING => {
                let text = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                if let Some(cell) = current.as_mut() {
                    cell.value = text;
                }
                has_value = true;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(mut cell) = current.take() {
                    sheet.touch(cell.row, cell.col);
                    if has_value || cell.formula.is_some() {
                        if cell.kind == CellType::SharedString {
                            cell.value = resolve_shared_string(&self.shared_strings, sheet_name, &cell)?;
                        }
                        sheet.push(cell);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    sheet.merged_ranges.push(reference.to_string());
                }
            }
        });
        sheet.finish();
        debug!(
            sheet = sheet_name,
            cells = sheet.cells.len(),
            merged = sheet.merged_ranges.len(),
            max_row = sheet.max_row,
            max_column = sheet.max_column,
            "Read worksheet"
        );
        Ok(sheet)
    }
}

/// Looks up the text of a shared string cell
fn resolve_shared_string(shared_strings: &[String], sheet_name: &str, cell: &Cell) -> Result<String, FiscaError> {
    cell.value
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|index| shared_strings.get(index))
        .cloned()
        .ok_or_else(|| {
            SpreadsheetError::SharedStringIndex(sheet_name.to_owned(), cell.reference(), cell.value.to_owned()).into()
        })
}

/// Loads worksheet names and part paths from workbook.xml, and whether the
/// workbook uses the 1904 date system.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), FiscaError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_flag("date1904", false)?;
        }
    });
    Ok((sheets, is_1904))
}

/// Loads worksheet relationships: relationship id → part path
fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, FiscaError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheets; chartsheets and dialog sheets have no cells
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads the shared string table, empty when the part is absent
fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, FiscaError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Normalizes a relationship target to a path inside the package
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string value from XML content, handling text and CDATA sections.
/// Phonetic annotations are skipped; when `is_text_content` is false only
/// `<t>` runs are collected.
fn read_string_value<B: BufRead>(
    reader: &mut XmlReader<B>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, FiscaError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::testing::WorkbookBuilder;
    use crate::spreadsheet::testing::STYLES;

    fn workbook() -> Workbook {
        let bytes = WorkbookBuilder::new()
            .styles(STYLES)
            .shared_strings(&["Désignation", "Montant", "Total &amp; reste"])
            .sheet(
                "Bilan",
                r#"<sheetData>
                    <row r="1"><c r="A1" t="s" s="1"><v>0</v></c><c r="B1" t="s" s="1"><v>1</v></c></row>
                    <row r="2"><c r="A2" t="inlineStr"><is><t>Capital</t></is></c><c r="B2"><v>1500000</v></c></row>
                    <row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3"><f>SUM(B2:B2)</f><v>1500000</v></c><c r="C3" s="2"/></row>
                    <row r="5"><c r="A5" s="5"><v>45306</v></c><c r="B5" t="b"><v>1</v></c><c r="D5" t="e"><v>#DIV/0!</v></c></row>
                </sheetData>
                <mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>"#,
            )
            .sheet("Vide", "<sheetData/>")
            .build();
        Workbook::from_bytes("liasse.xlsx", bytes).unwrap()
    }

    #[test]
    fn lists_sheets_in_order() {
        let workbook = workbook();
        assert_eq!(workbook.sheet_names(), vec!["Bilan", "Vide"]);
    }

    #[test]
    fn reads_values_and_types() {
        let mut workbook = workbook();
        let sheet = workbook.read_sheet("Bilan").unwrap();
        let values = sheet.cells.iter().map(|cell| (cell.reference(), cell.display_value())).collect::<Vec<_>>();
        assert_eq!(values, vec![
            ("A1".to_owned(), "Désignation".to_owned()),
            ("B1".to_owned(), "Montant".to_owned()),
            ("A2".to_owned(), "Capital".to_owned()),
            ("B2".to_owned(), "1500000".to_owned()),
            ("A3".to_owned(), "Total & reste".to_owned()),
            ("B3".to_owned(), "=SUM(B2:B2)".to_owned()),
            ("A5".to_owned(), "2024-01-15 00:00:00".to_owned()),
            ("B5".to_owned(), "TRUE".to_owned()),
            ("D5".to_owned(), "#DIV/0!".to_owned()),
        ]);
        assert_eq!(sheet.get(5, 1).unwrap().data_type(), "datetime");
        assert_eq!(sheet.get(5, 4).unwrap().data_type(), "error");
    }

    #[test]
    fn used_range_and_merged_cells() {
        let mut workbook = workbook();
        let sheet = workbook.read_sheet("Bilan").unwrap();
        assert_eq!(sheet.max_row, 5);
        assert_eq!(sheet.max_column, 4);
        assert_eq!(sheet.max_column_letter(), "D");
        assert_eq!(sheet.merged_ranges, vec!["A1:B1".to_owned()]);
        // styled but empty: counted in the used range, not reported as a cell
        assert!(sheet.get(3, 3).is_none());

        let empty = workbook.read_sheet("Vide").unwrap();
        assert!(empty.is_empty());
        assert_eq!((empty.max_row, empty.max_column), (1, 1));
    }

    #[test]
    fn expands_shared_formulas() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                "Calcul",
                r#"<sheetData>
                    <row r="2"><c r="C2"><f t="shared" ref="C2:C4" si="0">A2*B2</f><v>2</v></c></row>
                    <row r="3"><c r="C3"><f t="shared" si="0"/><v>6</v></c></row>
                    <row r="4"><c r="C4"><f t="shared" si="0"/><v>12</v></c></row>
                </sheetData>"#,
            )
            .build();
        let mut workbook = Workbook::from_bytes("calcul.xlsx", bytes).unwrap();
        let sheet = workbook.read_sheet("Calcul").unwrap();
        let formulas = sheet.cells.iter().map(|cell| cell.display_value()).collect::<Vec<_>>();
        assert_eq!(formulas, vec!["=A2*B2", "=A3*B3", "=A4*B4"]);
    }

    #[test]
    fn dates_in_1904_system() {
        let bytes = WorkbookBuilder::new()
            .styles(STYLES)
            .date1904()
            .sheet("Dates", r#"<sheetData><row r="1"><c r="A1" s="5"><v>366</v></c></row></sheetData>"#)
            .build();
        let mut workbook = Workbook::from_bytes("dates.xlsx", bytes).unwrap();
        let sheet = workbook.read_sheet("Dates").unwrap();
        assert_eq!(sheet.cells[0].display_value(), "1905-01-01 00:00:00");
    }

    #[test]
    fn cells_without_reference_follow_row_order() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                "Brut",
                r#"<sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c t="inlineStr"><is><t>b</t></is></c></row><row><c><v>3</v></c></row></sheetData>"#,
            )
            .build();
        let mut workbook = Workbook::from_bytes("brut.xlsx", bytes).unwrap();
        let sheet = workbook.read_sheet("Brut").unwrap();
        let references = sheet.cells.iter().map(Cell::reference).collect::<Vec<_>>();
        assert_eq!(references, vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn overlong_reference_falls_back_to_position() {
        let reference = format!("{}1", "A".repeat(29));
        let bytes = WorkbookBuilder::new()
            .sheet(
                "Brut",
                &format!(r#"<sheetData><row r="1"><c r="A1"><v>1</v></c><c r="{reference}"><v>2</v></c></row></sheetData>"#),
            )
            .build();
        let mut workbook = Workbook::from_bytes("brut.xlsx", bytes).unwrap();
        let sheets = workbook.read_sheets(&Criteria::default()).unwrap();
        let references = sheets[0].cells.iter().map(Cell::reference).collect::<Vec<_>>();
        assert_eq!(references, vec!["A1", "B1"]);
    }

    #[test]
    fn empty_values_are_skipped() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                "Saisie",
                r#"<sheetData><row r="1"><c r="A1"><v></v></c><c r="B1"><v/></c><c r="C1"><f>A1+B1</f><v></v></c><c r="D1"><v>0</v></c></row></sheetData>"#,
            )
            .build();
        let mut workbook = Workbook::from_bytes("saisie.xlsx", bytes).unwrap();
        let sheet = workbook.read_sheet("Saisie").unwrap();
        let values = sheet.cells
            .iter()
            .map(|cell| (cell.reference(), cell.display_value()))
            .collect::<Vec<_>>();
        assert_eq!(values, vec![
            ("C1".to_owned(), "=A1+B1".to_owned()),
            ("D1".to_owned(), "0".to_owned()),
        ]);
    }

    #[test]
    fn criteria_select_sheets() {
        let mut workbook = workbook();
        let criteria = Criteria::with_patterns(&["Vi*"]).unwrap();
        let sheets = workbook.read_sheets(&criteria).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Vide");
    }

    #[test]
    fn missing_sheet() {
        let mut workbook = workbook();
        assert!(matches!(
            workbook.read_sheet("Absent"),
            Err(FiscaError::SpreadsheetError(SpreadsheetError::SheetNotFound(_)))
        ));
    }

    #[test]
    fn bad_shared_string_index() {
        let bytes = WorkbookBuilder::new()
            .sheet("Bilan", r#"<sheetData><row r="1"><c r="A1" t="s"><v>7</v></c></row></sheetData>"#)
            .build();
        let mut workbook = Workbook::from_bytes("bilan.xlsx", bytes).unwrap();
        assert!(matches!(
            workbook.read_sheet("Bilan"),
            Err(FiscaError::SpreadsheetError(SpreadsheetError::SharedStringIndex(_, _, _)))
        ));

        let error = workbook.read_sheets(&Criteria::default()).unwrap_err();
        assert!(error.to_string().starts_with("Sheet 'Bilan': "));
    }

    #[test]
    fn rejects_unsupported_extension() {
        assert!(matches!(
            Workbook::open("liasse.xls"),
            Err(FiscaError::SpreadsheetError(SpreadsheetError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn rejects_encrypted_package() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.resize(512, 0);
        assert!(matches!(
            Workbook::from_bytes("secret.xlsx", bytes),
            Err(FiscaError::SpreadsheetError(SpreadsheetError::PasswordProtected(_)))
        ));
    }

    #[test]
    fn rejects_non_zip_content() {
        let result = Workbook::from_bytes("notes.xlsx", b"not a workbook".to_vec());
        assert!(matches!(result, Err(FiscaError::ZipError(_))));
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }
}
