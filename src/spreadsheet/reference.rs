//! A1-style cell references
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("Hardcode regex pattern")
});

/// Converts a 0-based (row, col) pair to a reference like `B3`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::<char>::new();
    let mut number = col + 1;
    while number > 0 {
        let remainder = (number - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        number = (number - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

/// Converts a reference like `B3` or `$B$3` to a 0-based (row, col) pair.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE.captures(reference)?;
    let col = captures[1]
        .chars()
        .map(|letter| letter.to_ascii_uppercase() as usize - 'A' as usize + 1)
        .fold(0usize, |index, digit| index * 26 + digit);
    let row = captures[2].parse::<usize>().ok()?;
    Some((row - 1, col - 1))
}
