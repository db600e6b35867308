use crate::pricelist::row::RawCell;
use crate::pricelist::row::RawRow;
use crate::spreadsheet::cell::Cell;

/// One sheet of a spreadsheet file, holding its non-empty cells.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells, row-major once `finish` has run
    pub(crate) cells: Vec<Cell>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    pub(super) fn push(&mut self, cell: Cell) {
        if self.row_upper_bound.map(|row| row < cell.row).unwrap_or(true) {
            self.row_upper_bound = Some(cell.row);
        }
        if self.col_upper_bound.map(|col| col < cell.col).unwrap_or(true) {
            self.col_upper_bound = Some(cell.col);
        }
        self.cells.push(cell);
    }

    /// Puts the cells in row-major order. Readers call this once the sheet is complete.
    pub(super) fn finish(&mut self) {
        self.cells.sort_by_key(|cell| (cell.row, cell.col));
    }

    /// Dense rows from the first row to the last non-empty one.
    /// Rows without cells come out as all-empty rows; every row is as wide as the widest one.
    pub(crate) fn rows(&self) -> impl Iterator<Item = RawRow> + '_ {
        let width = self.col_upper_bound.map(|col| col + 1).unwrap_or(0);
        let height = self.row_upper_bound.map(|row| row + 1).unwrap_or(0);
        let mut cells = self.cells.iter().peekable();
        (0..height).map(move |row| {
            let mut record = vec![RawCell::Empty; width];
            while let Some(cell) = cells.next_if(|cell| cell.row == row) {
                record[cell.col] = cell.to_raw();
            }
            record
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, kind: CellType, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("prices.xlsx", "Лист1");
        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert_eq!(sheet.rows().count(), 0);
    }

    #[test]
    fn sparse_cells_become_dense_rows() {
        let mut sheet = Sheet::new("prices.xlsx", "Лист1");
        push(&mut sheet, 1, 0, CellType::Text, "Модель: A");
        push(&mut sheet, 3, 2, CellType::Number, "100");
        push(&mut sheet, 3, 0, CellType::Text, "S");
        sheet.finish();

        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_upper_bound, Some(2));
        let rows: Vec<RawRow> = sheet.rows().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.len() == 3));
        assert!(rows[0].iter().all(RawCell::is_blank));
        assert_eq!(rows[1][0], RawCell::from("Модель: A"));
        assert!(rows[2].iter().all(RawCell::is_blank));
        assert_eq!(rows[3], vec![RawCell::from("S"), RawCell::Empty, RawCell::Number(100.0)]);
    }
}
