//! Implements the very simple `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can
//! run the whole app, top-to-bottom, without using Google Sheets.

use crate::api::Sheet;
use crate::model::cell::cell;
use crate::Result;
use std::collections::HashMap;

/// An implementation of the `Sheet` trait that does not use Google sheets. It holds
/// cells in memory, keyed by A1-notation address, and records every write.
pub(crate) struct TestSheet {
    pub(crate) cells: HashMap<String, String>,
    pub(crate) writes: Vec<(String, String)>,
}

impl TestSheet {
    /// Create an empty `TestSheet`.
    pub(crate) fn new() -> Self {
        Self {
            cells: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Place a value in a cell without recording it as a write.
    pub(crate) fn seed(&mut self, addr: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(addr.into(), value.into());
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn read_column(&mut self, column: &str) -> Result<Vec<String>> {
        let mut values = Vec::new();
        for row in 1.. {
            match self.cells.get(&cell(column, row)) {
                Some(value) => values.push(value.clone()),
                None => break,
            }
        }
        Ok(values)
    }

    async fn read_cell(&mut self, addr: &str) -> Result<String> {
        Ok(self.cells.get(addr).cloned().unwrap_or_default())
    }

    async fn write_cell(&mut self, addr: &str, value: &str) -> Result<()> {
        self.cells.insert(addr.to_string(), value.to_string());
        self.writes.push((addr.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_column_contiguous() {
        let mut sheet = TestSheet::new();
        sheet.seed("A1", "2026-08-20");
        sheet.seed("A2", "2026-08-21");
        // A4 without A3 is past the contiguous run and must not be returned.
        sheet.seed("A4", "2026-08-24");

        let values = sheet.read_column("A").await.unwrap();
        assert_eq!(values, vec!["2026-08-20", "2026-08-21"]);
        assert!(sheet.read_column("B").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_and_write_cell() {
        let mut sheet = TestSheet::new();
        assert_eq!(sheet.read_cell("B7").await.unwrap(), "");

        sheet.write_cell("B7", "5000").await.unwrap();
        assert_eq!(sheet.read_cell("B7").await.unwrap(), "5000");
        assert_eq!(sheet.writes, vec![("B7".to_string(), "5000".to_string())]);
    }
}
