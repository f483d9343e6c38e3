use std::collections::BTreeMap;

use rust_xlsxwriter::{Worksheet, XlsxError};

use super::styles::Style;

/// Excel rejects cells longer than this.
pub const MAX_CELL_CHARS: usize = 32_767;
pub const MAX_AUTO_WIDTH: usize = 50;
pub const WIDTH_PADDING: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Count(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Style,
}

impl Cell {
    pub fn text(value: impl Into<String>, style: Style) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            style,
        }
    }

    pub fn count(value: usize, style: Style) -> Self {
        Self {
            value: CellValue::Count(value),
            style,
        }
    }

    fn display_len(&self) -> usize {
        match &self.value {
            CellValue::Text(text) => text.chars().count(),
            CellValue::Count(value) => value.to_string().len(),
        }
    }
}

/// Rows of styled cells plus column and merge layout, written in one pass.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
    fixed_widths: BTreeMap<usize, f64>,
    /// Zero-based row index to the last merged column, starting at column 0.
    merges: BTreeMap<usize, usize>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            fixed_widths: BTreeMap::new(),
            merges: BTreeMap::new(),
        }
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    pub fn push_blank_row(&mut self) {
        self.rows.push(Vec::new());
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn set_width(&mut self, column: usize, width: f64) {
        self.fixed_widths.insert(column, width);
    }

    /// Merges a single 1-based row from column 0 through `last_column`.
    pub fn merge_row(&mut self, row: usize, last_column: usize) {
        self.merges.insert(row - 1, last_column);
    }

    fn column_widths(&self) -> Vec<f64> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (0..columns)
            .map(|column| {
                if let Some(width) = self.fixed_widths.get(&column) {
                    return *width;
                }
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|cells| cells.get(column))
                    .map(Cell::display_len)
                    .max()
                    .unwrap_or(0);
                (longest.min(MAX_AUTO_WIDTH) + WIDTH_PADDING) as f64
            })
            .collect()
    }

    pub fn write_to(&self, worksheet: &mut Worksheet) -> Result<(), XlsxError> {
        worksheet.set_name(self.name.as_str())?;
        for (column, width) in self.column_widths().into_iter().enumerate() {
            worksheet.set_column_width(to_col(column), width)?;
        }

        for (row_index, cells) in self.rows.iter().enumerate() {
            let row = to_row(row_index);
            let merged = self.merges.get(&row_index).copied();
            for (column, cell) in cells.iter().enumerate() {
                let format = cell.style.format();
                match (&cell.value, merged) {
                    (CellValue::Text(text), Some(last_column)) if column == 0 => {
                        worksheet.merge_range(
                            row,
                            0,
                            row,
                            to_col(last_column),
                            &truncate_cell(text),
                            &format,
                        )?;
                    }
                    (CellValue::Text(text), _) => {
                        worksheet.write_string_with_format(
                            row,
                            to_col(column),
                            truncate_cell(text).into_owned(),
                            &format,
                        )?;
                    }
                    (CellValue::Count(value), _) => {
                        worksheet.write_number_with_format(
                            row,
                            to_col(column),
                            *value as f64,
                            &format,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn to_row(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn to_col(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

fn truncate_cell(text: &str) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => std::borrow::Cow::Owned(text[..cut].to_string()),
        None => std::borrow::Cow::Borrowed(text),
    }
}
