//! In-memory workbook fixtures.

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Style tables shared by the fixtures. `cellXfs` entries:
/// 0 plain, 1 bold, 2 yellow fill, 3 white fill, 4 thin border,
/// 5 date, 6 bold on yellow with border and centered text
pub(crate) const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><sz val="12"/><name val="Arial"/></font>
  </fonts>
  <fills count="4">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFFFF"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>
  </borders>
  <cellXfs count="7">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0" applyFont="1"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="3" borderId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="1" applyBorder="1"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf>
  </cellXfs>
</styleSheet>"#;

/// Builds a minimal xlsx package in memory.
#[derive(Default)]
pub(crate) struct WorkbookBuilder {
    sheets: Vec<(String, String)>,
    styles: Option<String>,
    shared_strings: Option<Vec<String>>,
    date1904: bool,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a worksheet; `content` is the body of `<worksheet>`
    pub(crate) fn sheet(mut self, name: &str, content: &str) -> Self {
        self.sheets.push((name.to_owned(), content.to_owned()));
        self
    }

    pub(crate) fn styles(mut self, styles: &str) -> Self {
        self.styles = Some(styles.to_owned());
        self
    }

    /// Shared string items, already XML-escaped
    pub(crate) fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|string| string.to_string()).collect());
        self
    }

    pub(crate) fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut add = |name: &str, content: &str| {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        };

        let mut sheets = String::new();
        let mut relationships = String::new();
        for (index, (name, content)) in self.sheets.iter().enumerate() {
            let id = index + 1;
            sheets.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));
            add(
                &format!("xl/worksheets/sheet{id}.xml"),
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{content}</worksheet>"#
                ),
            );
        }
        add(
            "xl/workbook.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="{}"/><sheets>{sheets}</sheets></workbook>"#,
                if self.date1904 { 1 } else { 0 }
            ),
        );
        add(
            "xl/_rels/workbook.xml.rels",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#
            ),
        );
        if let Some(styles) = &self.styles {
            add("xl/styles.xml", styles);
        }
        if let Some(strings) = &self.shared_strings {
            let items = strings
                .iter()
                .map(|string| format!("<si><t>{string}</t></si>"))
                .collect::<String>();
            add(
                "xl/sharedStrings.xml",
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{items}</sst>"#
                ),
            );
        }
        writer.finish().unwrap().into_inner()
    }
}
