//! Raw cell values as the scanner sees them.

/// A single materialized cell value. Formulas are already resolved by the reader.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum RawCell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Date, time or duration, kept as rendered text. Never a label, size or price.
    Temporal(String),
}

/// One spreadsheet row, left to right.
pub(crate) type RawRow = Vec<RawCell>;

impl RawCell {
    /// True for empty cells and whitespace-only strings.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(text) => text.trim().is_empty(),
            RawCell::Number(_) | RawCell::Temporal(_) => false,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            RawCell::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub(crate) fn number(&self) -> Option<f64> {
        match self {
            RawCell::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Lower-cased, trimmed string content used for label matching.
    pub(crate) fn label_text(&self) -> Option<String> {
        self.text().map(|text| text.trim().to_lowercase())
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_owned())
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

/// Returns the cell at `index`, treating positions past the end of the row as empty.
pub(crate) fn cell_at(row: &[RawCell], index: Option<usize>) -> &RawCell {
    const EMPTY: &RawCell = &RawCell::Empty;
    index.and_then(|index| row.get(index)).unwrap_or(EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells() {
        assert!(RawCell::Empty.is_blank());
        assert!(RawCell::from("  \t ").is_blank());
        assert!(!RawCell::from(" x ").is_blank());
        assert!(!RawCell::from(0.0).is_blank());
        assert!(!RawCell::Temporal("2024-05-01".to_owned()).is_blank());
    }

    #[test]
    fn temporal_cells_are_neither_text_nor_number() {
        let cell = RawCell::Temporal("2024-05-01".to_owned());
        assert_eq!(cell.text(), None);
        assert_eq!(cell.number(), None);
        assert_eq!(cell.label_text(), None);
    }

    #[test]
    fn label_text_is_lower_and_trimmed() {
        assert_eq!(RawCell::from("  Розмір ").label_text().as_deref(), Some("розмір"));
        assert_eq!(RawCell::from(12.0).label_text(), None);
    }

    #[test]
    fn cell_at_out_of_range() {
        let row = vec![RawCell::from("a")];
        assert_eq!(cell_at(&row, Some(0)), &RawCell::from("a"));
        assert_eq!(cell_at(&row, Some(5)), &RawCell::Empty);
        assert_eq!(cell_at(&row, None), &RawCell::Empty);
    }
}
