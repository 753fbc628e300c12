//! Conversions between `A1`-style references and 1-based row/column numbers.

/// Converts a 1-based column number to its letters (`1` → `A`, `28` → `AB`).
pub fn column_letter(col: usize) -> String {
    let mut col = col;
    let mut letters = Vec::<u8>::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts column letters to a 1-based column number (`AB` → `28`).
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |index, byte| {
        if byte.is_ascii_alphabetic() {
            index
                .checked_mul(26)?
                .checked_add((byte.to_ascii_uppercase() - b'A') as usize + 1)
        } else {
            None
        }
    })
}

/// Converts a 1-based row/column pair to an `A1`-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row)
}

/// Parses an `A1`-style reference (optionally `$`-anchored) into a 1-based
/// `(row, col)` pair.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = col_to_index(letters)?;
    let row = digits.parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}
