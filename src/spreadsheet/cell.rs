use crate::error::PriceListError;
use crate::pricelist::row::RawCell;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::TimeDelta;
use std::fmt::Display;
use tracing::warn;

/// Storage kind of a cell value as found in the file.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean stored as `1` / `0`
    Boolean,
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
    /// ISO 8601 duration strings (`PT10H30M0S`)
    IsoDuration,
    /// String values, shared strings already resolved
    Text,
    /// Error literal such as `#N/A`
    Error,
}

impl CellType {
    /// Maps a built-in Excel number format id to its date/time kind.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Detects date and time placeholders in a custom number format code.
    /// Quoted literals, escaped characters and bracketed sections such as colors are skipped.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

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
            (false, false, _) => Self::Number,
        }
    }
}

/// One non-empty cell read from a sheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Value exactly as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Returns the A1-style reference of the cell
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the cell to the value the price-list scanner works on.
    /// Dates and times keep their rendering but are neither labels nor prices.
    pub(crate) fn to_raw(&self) -> RawCell {
        match self.kind {
            CellType::Empty => RawCell::Empty,
            CellType::Text | CellType::Error => RawCell::Text(self.value.to_owned()),
            CellType::Boolean => RawCell::Number(if self.value == "1" { 1.0 } else { 0.0 }),
            CellType::Number => match self.value.trim().parse::<f64>() {
                Ok(number) => RawCell::Number(number),
                Err(_) => {
                    warn!(cell = %self.reference(), value = %self.value, "numeric cell is not a number, reading it as text");
                    RawCell::Text(self.value.to_owned())
                }
            },
            _ => RawCell::Temporal(self.to_string()),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = match self.kind {
            CellType::Boolean => Ok(if self.value == "1" { "true" } else { "false" }.to_owned()),
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false),
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true),
            CellType::NumberDate1900 => to_date_string(&self.value, false),
            CellType::NumberDate1904 => to_date_string(&self.value, true),
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Ok(self.value.replace('T', " ")),
            CellType::IsoDuration => Ok(to_duration_string(&self.value)),
            _ => Ok(self.value.to_owned()),
        };
        // A date-formatted cell holding something else prints as stored
        write!(f, "{}", rendered.unwrap_or_else(|_| self.value.to_owned()))
    }
}

/// Converts an Excel serial day to an ISO date.
/// The 1900 system counts the nonexistent 1900-02-29 (Lotus 1-2-3 leap year bug).
fn to_date_string(value: &str, is_1904: bool) -> Result<String, PriceListError> {
    let days = value.trim().parse::<f64>()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = days
        .checked_add(offset)
        .and_then(TimeDelta::try_days)
        .and_then(|delta| NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(delta))
        .ok_or_else(|| SpreadsheetError::DateRangeError(value.to_owned()))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts a fraction of a day to `HH:MM:SS[.mmm]`.
fn to_time_string(value: &str) -> Result<String, PriceListError> {
    let factor = value.trim().parse::<f64>()?.fract();
    let mut rest = (factor * 86_400_000f64).round() as i64;
    let milliseconds = rest % 1_000;
    rest /= 1_000;
    let seconds = rest % 60;
    rest /= 60;
    let minutes = rest % 60;
    let hours = rest / 60;
    let time = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Ok(time)
}

fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, PriceListError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}

/// Renders an ODS duration such as `PT10H30M05S` as `10:30:05`.
fn to_duration_string(value: &str) -> String {
    let Some(body) = value.strip_prefix("PT") else {
        return value.to_owned();
    };
    let mut parts = [0u64; 3];
    let mut number = String::new();
    for character in body.chars() {
        let slot = match character {
            'H' => 0,
            'M' => 1,
            'S' => 2,
            _ => {
                number.push(character);
                continue;
            }
        };
        // Seconds may carry a fraction; it is dropped
        let whole = number.split('.').next().unwrap_or_default();
        parts[slot] = whole.parse().unwrap_or(0);
        number.clear();
    }
    format!("{:02}:{:02}:{:02}", parts[0], parts[1], parts[2])
}
