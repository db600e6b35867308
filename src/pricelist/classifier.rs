//! Row classification.
use crate::pricelist::labels::LabelKind;
use crate::pricelist::labels::LabelTable;
use crate::pricelist::row::RawCell;

/// Quote characters trimmed around a model name.
const QUOTES: &[char] = &['"', '\'', '«', '»', '“', '”', '„'];

/// What a row means to the scanner.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RowKind {
    /// Every cell is empty or whitespace
    Blank,
    /// A cell names a new model
    ModelMarker(String),
    /// A cell carries the size label; the value is that cell's column
    HeaderCandidate(usize),
    /// Anything else
    Data,
}

/// Classifies a row. Model markers win over size labels on the same row,
/// and the leftmost matching cell wins within each test.
pub(crate) fn classify(row: &[RawCell], labels: &LabelTable) -> RowKind {
    if row.iter().all(RawCell::is_blank) {
        return RowKind::Blank;
    }
    if let Some(model) = row.iter().find_map(|cell| model_name(cell, labels)) {
        return RowKind::ModelMarker(model);
    }
    row.iter()
        .position(|cell| has_prefix(cell, LabelKind::Size, labels))
        .map(RowKind::HeaderCandidate)
        .unwrap_or(RowKind::Data)
}

/// True if the cell is a string whose lower-cased trimmed form starts with a `kind` variant.
pub(crate) fn has_prefix(cell: &RawCell, kind: LabelKind, labels: &LabelTable) -> bool {
    cell.label_text()
        .map(|text| labels.prefix_of(kind, &text).is_some())
        .unwrap_or(false)
}

/// Extracts the model name from a model-marker cell.
fn model_name(cell: &RawCell, labels: &LabelTable) -> Option<String> {
    let text = cell.text()?.trim();
    let variant = labels.prefix_of(LabelKind::Model, &text.to_lowercase())?;
    let rest = strip_label(text, variant).unwrap_or(text);
    Some(rest.trim().trim_matches(QUOTES).trim().to_owned())
}

/// Strips a lower-case `label` from the start of `text`, comparing case-insensitively,
/// and returns the remainder in its original case.
fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let mut expected = label.chars().peekable();
    for (index, character) in text.char_indices() {
        if expected.peek().is_none() {
            return Some(&text[index..]);
        }
        for lower in character.to_lowercase() {
            if expected.next() != Some(lower) {
                return None;
            }
        }
    }
    expected.peek().is_none().then_some("")
}
