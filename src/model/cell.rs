//! A1-notation helpers: cell addresses are a column letter (A-ZZ) joined to a
//! 1-based row number.

use crate::Result;
use anyhow::ensure;

/// Builds an A1-notation cell address, e.g. `cell("B", 12)` is `"B12"`.
pub(crate) fn cell(column: &str, row: usize) -> String {
    format!("{column}{row}")
}

/// True for one- or two-letter uppercase column names (A through ZZ).
pub(crate) fn is_column_letter(s: &str) -> bool {
    !s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Returns the column immediately to the left, e.g. "C" -> "B", "AA" -> "Z".
/// Column "A" has no left neighbor and is an error.
pub(crate) fn column_left(column: &str) -> Result<String> {
    let index = column_index(column)?;
    ensure!(index > 1, "Column '{column}' has no column to its left");
    Ok(column_name(index - 1))
}

/// 1-based column index: A=1, B=2, ..., Z=26, AA=27.
fn column_index(column: &str) -> Result<u32> {
    ensure!(
        is_column_letter(column),
        "'{column}' is not a column letter (expected e.g. 'B' or 'AB')"
    );
    Ok(column
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A') + 1))
}

/// Inverse of `column_index`.
fn column_name(mut index: u32) -> String {
    let mut name = String::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        index = (index - 1) / 26;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell() {
        assert_eq!(cell("A", 1), "A1");
        assert_eq!(cell("P", 37), "P37");
        assert_eq!(cell("AB", 2), "AB2");
    }

    #[test]
    fn test_is_column_letter() {
        assert!(is_column_letter("A"));
        assert!(is_column_letter("ZZ"));
        assert!(!is_column_letter(""));
        assert!(!is_column_letter("a"));
        assert!(!is_column_letter("A1"));
        assert!(!is_column_letter("AAA"));
    }

    #[test]
    fn test_column_left() {
        assert_eq!(column_left("C").unwrap(), "B");
        assert_eq!(column_left("AA").unwrap(), "Z");
        assert_eq!(column_left("BA").unwrap(), "AZ");
        assert!(column_left("A").is_err());
        assert!(column_left("3").is_err());
    }

    #[test]
    fn test_column_index_round_trip() {
        for (name, index) in [("A", 1), ("Z", 26), ("AA", 27), ("AZ", 52), ("ZZ", 702)] {
            assert_eq!(column_index(name).unwrap(), index);
            assert_eq!(column_name(index), name);
        }
    }
}
