//! Cell formatting tables parsed from `xl/styles.xml`.
//!
//! Only the parts the analyzer looks at are kept: number formats (to recognise
//! serial dates), fonts, pattern fills, border edges and alignment.

use crate::error::FiscaError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use tracing::debug;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FONTS: QName = QName(b"fonts");
const TAG_FONT: QName = QName(b"font");
const TAG_BOLD: QName = QName(b"b");
const TAG_ITALIC: QName = QName(b"i");
const TAG_SIZE: QName = QName(b"sz");
const TAG_NAME: QName = QName(b"name");
const TAG_COLOR: QName = QName(b"color");
const TAG_FILLS: QName = QName(b"fills");
const TAG_FILL: QName = QName(b"fill");
const TAG_PATTERN_FILL: QName = QName(b"patternFill");
const TAG_FOREGROUND_COLOR: QName = QName(b"fgColor");
const TAG_BORDERS: QName = QName(b"borders");
const TAG_BORDER: QName = QName(b"border");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_ALIGNMENT: QName = QName(b"alignment");

/// Font attributes of a cell
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub size: Option<f64>,
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Pattern fill of a cell
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fill {
    pub pattern: Option<String>,
    /// Foreground color: ARGB hex, `theme:N[+tint]` or `indexed:N`
    pub color: Option<String>,
}

impl Fill {
    /// The visible fill color, `None` when the pattern is `none` or absent.
    pub fn visible_color(&self) -> Option<&str> {
        match self.pattern.as_deref() {
            None | Some("none") => None,
            Some(_) => self.color.as_deref(),
        }
    }
}

/// Edge styles of a cell border (`thin`, `medium`, `double`, ...)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Border {
    pub left: Option<String>,
    pub right: Option<String>,
    pub top: Option<String>,
    pub bottom: Option<String>,
}

impl Border {
    pub fn is_visible(&self) -> bool {
        [&self.left, &self.right, &self.top, &self.bottom]
            .iter()
            .any(|edge| edge.as_deref().map(|style| style != "none").unwrap_or(false))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: Option<bool>,
}

/// One entry of the `cellXfs` table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellFormat {
    pub number_format: CellType,
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub alignment: Alignment,
}

/// Resolved formatting of a single cell
#[derive(Clone, Copy, Debug)]
pub struct CellStyle<'a> {
    pub font: Option<&'a Font>,
    pub fill: Option<&'a Fill>,
    pub border: Option<&'a Border>,
    pub alignment: Option<&'a Alignment>,
}

#[derive(Clone, Debug, Default)]
pub struct Styles {
    pub fonts: Vec<Font>,
    pub fills: Vec<Fill>,
    pub borders: Vec<Border>,
    pub formats: Vec<CellFormat>,
}

impl Styles {
    /// Number format kind for a style index, `Number` when unknown
    pub fn number_format(&self, style: usize) -> CellType {
        self.formats
            .get(style)
            .map(|format| format.number_format)
            .unwrap_or(CellType::Number)
    }

    /// Resolves the font, fill, border and alignment of a style index.
    /// Missing tables yield `None` members rather than an error.
    pub fn cell_style(&self, style: usize) -> CellStyle<'_> {
        let format = self.formats.get(style);
        CellStyle {
            font: self.fonts.get(format.map(|format| format.font_id).unwrap_or(0)),
            fill: self.fills.get(format.map(|format| format.fill_id).unwrap_or(0)),
            border: self.borders.get(format.map(|format| format.border_id).unwrap_or(0)),
            alignment: format.map(|format| &format.alignment),
        }
    }
}

/// Which table of styles.xml the parser is inside
#[derive(Copy, Clone, Debug, PartialEq)]
enum Section {
    Other,
    CustomFormats,
    Fonts,
    Fills,
    Borders,
    FormatIndexes,
}

/// Loads number formats, fonts, fills, borders and cell formats from styles.xml
pub(crate) fn load_styles(zip: &mut ZipArchive<UnifiedReader>, is_1904: bool) -> Result<Styles, FiscaError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Styles::default()),
    };

    let mut styles = Styles::default();
    let mut section = Section::Other;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes = Vec::<(String, CellFormat)>::new();
    match_xml_events!(reader => {
        Event::Start(event) if section == Section::Other => {
            section = match event.name() {
                name if name == TAG_CUSTOM_FORMATS => Section::CustomFormats,
                name if name == TAG_FONTS => Section::Fonts,
                name if name == TAG_FILLS => Section::Fills,
                name if name == TAG_BORDERS => Section::Borders,
                name if name == TAG_FORMAT_INDEXES => Section::FormatIndexes,
                _ => Section::Other,
            };
        }
        Event::End(event) if section != Section::Other && is_section_end(event.name(), section) => {
            section = Section::Other;
        }

        Event::Start(event) if section == Section::CustomFormats && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }

        Event::Start(event) if section == Section::Fonts && event.name() == TAG_FONT => {
            styles.fonts.push(Font::default());
        }
        Event::Start(event) if section == Section::Fonts => {
            if let Some(font) = styles.fonts.last_mut() {
                let name = event.name();
                if name == TAG_BOLD {
                    font.bold = event.get_flag("val", true)?;
                } else if name == TAG_ITALIC {
                    font.italic = event.get_flag("val", true)?;
                } else if name == TAG_SIZE {
                    font.size = event.parse_attribute_value("val")?;
                } else if name == TAG_NAME {
                    font.name = event.get_attribute_value("val")?.map(|value| value.to_string());
                } else if name == TAG_COLOR {
                    font.color = read_color(&event)?;
                }
            }
        }

        Event::Start(event) if section == Section::Fills && event.name() == TAG_FILL => {
            styles.fills.push(Fill::default());
        }
        Event::Start(event) if section == Section::Fills && event.name() == TAG_PATTERN_FILL => {
            if let Some(fill) = styles.fills.last_mut() {
                // patternType defaults to none when absent
                fill.pattern = Some(event.get_attribute_value("patternType")?
                    .map(|pattern| pattern.to_string())
                    .unwrap_or_else(|| "none".to_owned()));
            }
        }
        Event::Start(event) if section == Section::Fills && event.name() == TAG_FOREGROUND_COLOR => {
            if let Some(fill) = styles.fills.last_mut() {
                fill.color = read_color(&event)?;
            }
        }

        Event::Start(event) if section == Section::Borders && event.name() == TAG_BORDER => {
            styles.borders.push(Border::default());
        }
        Event::Start(event) if section == Section::Borders => {
            if let Some(border) = styles.borders.last_mut() {
                let style = event.get_attribute_value("style")?.map(|style| style.to_string());
                match event.name().as_ref() {
                    b"left" | b"start" => border.left = style,
                    b"right" | b"end" => border.right = style,
                    b"top" => border.top = style,
                    b"bottom" => border.bottom = style,
                    _ => (),
                }
            }
        }

        Event::Start(event) if section == Section::FormatIndexes && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?
                .map(|id| id.to_string())
                .unwrap_or_else(|| "0".to_owned());
            format_indexes.push((id, CellFormat {
                number_format: CellType::Number,
                font_id: event.parse_attribute_value("fontId")?.unwrap_or(0),
                fill_id: event.parse_attribute_value("fillId")?.unwrap_or(0),
                border_id: event.parse_attribute_value("borderId")?.unwrap_or(0),
                alignment: Alignment::default(),
            }));
        }
        Event::Start(event) if section == Section::FormatIndexes && event.name() == TAG_ALIGNMENT => {
            if let Some((_, format)) = format_indexes.last_mut() {
                format.alignment = Alignment {
                    horizontal: event.get_attribute_value("horizontal")?.map(|value| value.to_string()),
                    vertical: event.get_attribute_value("vertical")?.map(|value| value.to_string()),
                    wrap_text: event.get_attribute_value("wrapText")?.map(|value| value == "1" || value == "true"),
                };
            }
        }
    });

    styles.formats = format_indexes
        .into_iter()
        .map(|(id, mut format)| {
            format.number_format = custom_formats
                .get(&id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(&id, is_1904))
                .unwrap_or(CellType::Number);
            format
        })
        .collect();

    debug!(
        fonts = styles.fonts.len(),
        fills = styles.fills.len(),
        borders = styles.borders.len(),
        formats = styles.formats.len(),
        "Loaded workbook styles"
    );
    Ok(styles)
}

fn is_section_end(name: QName, section: Section) -> bool {
    match section {
        Section::CustomFormats => name == TAG_CUSTOM_FORMATS,
        Section::Fonts => name == TAG_FONTS,
        Section::Fills => name == TAG_FILLS,
        Section::Borders => name == TAG_BORDERS,
        Section::FormatIndexes => name == TAG_FORMAT_INDEXES,
        Section::Other => false,
    }
}

/// Reads a `<color>`-like element: `rgb` wins, then `theme` (with tint), then `indexed`.
fn read_color(event: &BytesStart) -> Result<Option<String>, FiscaError> {
    if let Some(rgb) = event.get_attribute_value("rgb")? {
        return Ok(Some(rgb.to_ascii_uppercase()));
    }
    if let Some(theme) = event.get_attribute_value("theme")? {
        let color = match event.get_attribute_value("tint")? {
            Some(tint) => format!("theme:{theme}+{tint}"),
            None => format!("theme:{theme}"),
        };
        return Ok(Some(color));
    }
    Ok(event.get_attribute_value("indexed")?.map(|indexed| format!("indexed:{indexed}")))
}
