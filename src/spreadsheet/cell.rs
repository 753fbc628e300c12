use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `1`/`0`
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references (resolved while reading)
    SharedString,
    /// Cached string result of a formula
    FormulaString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            _ => Self::Number,
        }
    }

    fn is_serial_date(&self) -> bool {
        matches!(
            self,
            Self::NumberDateTime1900 | Self::NumberDate1900 | Self::NumberDateTime1904 | Self::NumberDate1904
        )
    }

    fn is_serial_time(&self) -> bool {
        matches!(self, Self::NumberTime1900 | Self::NumberTime1904)
    }

    fn is_1904(&self) -> bool {
        matches!(
            self,
            Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904
        )
    }
}

/// A populated worksheet cell. Rows and columns are 1-based.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub kind: CellType,
    /// Stored value, with shared strings already resolved
    pub value: String,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
    /// Index into the workbook `cellXfs` table
    pub style: usize,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Text form of the cell as the analyzer sees it: formulas keep their
    /// source text, serial dates are rendered as timestamps.
    pub fn display_value(&self) -> String {
        if let Some(formula) = &self.formula {
            return format!("={formula}");
        }
        match self.kind {
            CellType::Boolean => if self.value == "1" { "TRUE" } else { "FALSE" }.to_owned(),
            CellType::Number => to_number_string(&self.value),
            kind if kind.is_serial_date() => {
                to_datetime_string(&self.value, kind.is_1904()).unwrap_or_else(|| self.value.to_owned())
            }
            kind if kind.is_serial_time() => to_time_string(&self.value).unwrap_or_else(|| self.value.to_owned()),
            CellType::IsoDateTime => self.value.replace('T', " "),
            _ => self.value.to_owned(),
        }
    }

    /// Scalar type name reported for the cell.
    pub fn data_type(&self) -> &'static str {
        if self.formula.is_some() {
            return "formula";
        }
        match self.kind {
            CellType::Boolean => "bool",
            CellType::Number if is_integer_literal(&self.value) => "int",
            CellType::Number => "float",
            kind if kind.is_serial_date() => "datetime",
            kind if kind.is_serial_time() => "time",
            CellType::IsoDateTime => "datetime",
            CellType::Error => "error",
            _ => "str",
        }
    }

    /// Whether the cell holds a plain (non-formula) number.
    pub fn is_number(&self) -> bool {
        self.formula.is_none() && self.kind == CellType::Number
    }
}

/// Serial of 9999-12-31, the last date Excel displays
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

fn is_integer_literal(value: &str) -> bool {
    !value.contains(['.', 'e', 'E']) && value.parse::<i64>().is_ok()
}

/// Normalizes a stored number (`"2.5000000000000001E-2"` → `"0.025"`).
fn to_number_string(value: &str) -> String {
    if is_integer_literal(value) {
        return value.to_owned();
    }
    match value.parse::<f64>() {
        Ok(number) => number.to_string(),
        Err(_) => value.to_owned(),
    }
}

/// Converts an Excel serial number to a timestamp.
/// Handles the Lotus 1-2-3 leap year bug of the 1900 epoch.
fn to_naive_datetime(value: &str, is_1904: bool) -> Option<NaiveDateTime> {
    let serial = value.parse::<f64>().ok().filter(|serial| (0.0..=MAX_DATE_SERIAL).contains(serial))?;
    let mut days = serial.trunc() as i64;
    let base = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        if days < 60 {
            days += 1;
        }
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let seconds = (serial.fract() * 86_400f64).round() as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)
}

fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    to_naive_datetime(value, is_1904).map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn to_time_string(value: &str) -> Option<String> {
    let fraction = value.parse::<f64>().ok()?.fract();
    let seconds = ((fraction * 86_400f64).round() as u32).min(86_399);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).map(|time| time.format("%H:%M:%S").to_string())
}
