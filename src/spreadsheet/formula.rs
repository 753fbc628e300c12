//! Shared formula expansion.
//!
//! A worksheet stores a shared formula once, on its anchor cell; the other
//! cells of the shared range only carry the group id. Their formula is the
//! anchor's with every relative reference moved by the cell's offset.

use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::column_letter;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Anchor formulas of the shared groups seen so far in a worksheet
#[derive(Debug, Default)]
pub(crate) struct SharedFormulas {
    groups: HashMap<String, (String, usize, usize)>,
}

impl SharedFormulas {
    /// Records the anchor formula of a shared group
    pub(crate) fn define(&mut self, id: &str, formula: &str, row: usize, col: usize) {
        self.groups.insert(id.to_owned(), (formula.to_owned(), row, col));
    }

    /// Formula of a dependent cell of a shared group
    pub(crate) fn resolve(&self, id: &str, row: usize, col: usize) -> Option<String> {
        let (formula, anchor_row, anchor_col) = self.groups.get(id)?;
        let row_offset = row as i64 - *anchor_row as i64;
        let col_offset = col as i64 - *anchor_col as i64;
        Some(translate_formula(formula, row_offset, col_offset))
    }
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\$?)([A-Za-z]{1,3})(\$?)(\d+)").expect("Hardcode regex pattern"))
}

/// Moves the relative references of `formula` by the given offsets.
/// `$`-anchored parts and string literals are left untouched; a reference
/// pushed before row 1 or column A becomes `#REF!`.
pub(crate) fn translate_formula(formula: &str, row_offset: i64, col_offset: i64) -> String {
    if row_offset == 0 && col_offset == 0 {
        return formula.to_owned();
    }
    let mut translated = String::with_capacity(formula.len());
    for (index, segment) in formula.split('"').enumerate() {
        if index > 0 {
            translated.push('"');
        }
        if index % 2 == 1 {
            // inside a string literal
            translated.push_str(segment);
        } else {
            translated.push_str(&translate_segment(segment, row_offset, col_offset));
        }
    }
    translated
}

fn translate_segment(segment: &str, row_offset: i64, col_offset: i64) -> String {
    let mut translated = String::with_capacity(segment.len());
    let mut last = 0usize;
    for captures in reference_pattern().captures_iter(segment) {
        let whole = match captures.get(0) {
            Some(whole) => whole,
            None => continue,
        };
        let before = segment[..whole.start()].chars().next_back();
        let after = segment[whole.end()..].chars().next();
        // part of a longer name (LOG10, Table1), a function call or a number
        let is_name_part = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
        if before.map(is_name_part).unwrap_or(false) || after.map(|c| is_name_part(c) || c == '(').unwrap_or(false) {
            continue;
        }

        let col_anchor = &captures[1];
        let letters = &captures[2];
        let row_anchor = &captures[3];
        let digits = &captures[4];
        let (col, row) = match (col_to_index(letters), digits.parse::<i64>()) {
            (Some(col), Ok(row)) => (col as i64, row),
            _ => continue,
        };
        let col = if col_anchor.is_empty() { col + col_offset } else { col };
        let row = if row_anchor.is_empty() { row + row_offset } else { row };

        translated.push_str(&segment[last..whole.start()]);
        if col < 1 || row < 1 {
            translated.push_str("#REF!");
        } else {
            translated.push_str(&format!("{col_anchor}{}{row_anchor}{row}", column_letter(col as usize)));
        }
        last = whole.end();
    }
    translated.push_str(&segment[last..]);
    translated
}
