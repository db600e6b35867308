//! # Spreadsheet readers
//!
//! Reads Excel 2007+ (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`) workbooks into
//! [`Sheet`]s. Files come from a local path, a remote URL or memory, see
//! [`UnifiedReader`].
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

use crate::error::PriceListError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    #[error("Unsupported spreadsheet format '{0}', expected .xlsx, .xlsm, .xlam or .ods")]
    FileFormatError(String),

    #[error("Missing workbook part '{0}'")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Date serial '{0}' is out of range")]
    DateRangeError(String),
}

/// A workbook whose sheets can be read.
pub(crate) trait Spreadsheet {
    /// Returns the file name this spreadsheet was opened from
    fn name(&self) -> String;

    /// Reads the sheets accepted by `criteria`, in workbook order
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PriceListError>;
}

/// Opens a spreadsheet from a local path or remote URL, choosing the reader by file extension.
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, PriceListError> {
    let extension = file_extension(file_name);
    if !matches!(extension.as_str(), "xlsx" | "xlsm" | "xlam" | "ods") {
        Err(SpreadsheetError::FileFormatError(file_name.to_owned()))?;
    }
    let reader = UnifiedReader::new(file_name)?;
    open_spreadsheet_reader(file_name, &extension, reader)
}

/// Opens a spreadsheet of the given format from an already opened reader.
pub(crate) fn open_spreadsheet_reader(
    file_name: &str,
    extension: &str,
    reader: UnifiedReader,
) -> Result<Box<dyn Spreadsheet>, PriceListError> {
    match extension {
        "xlsx" | "xlsm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(file_name, reader)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(file_name, reader)?)),
        _ => Err(SpreadsheetError::FileFormatError(file_name.to_owned()))?,
    }
}

/// Lower-cased extension of a path or of a URL's path component.
fn file_extension(file_name: &str) -> String {
    let path = match Url::parse(file_name) {
        Ok(url) if UnifiedReader::is_remote_url(file_name) => url.path().to_owned(),
        _ => file_name.to_owned(),
    };
    Path::new(&path)
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;
    use zip::ZipWriter;

    /// Builds a stored ZIP archive in memory.
    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn file_extensions() {
        assert_eq!(file_extension("/data/Prices.XLSX"), "xlsx");
        assert_eq!(file_extension("https://example.com/list.ods?token=abc"), "ods");
        assert_eq!(file_extension("s3://bucket/list.xlsm"), "xlsm");
        assert_eq!(file_extension("notes"), "");
    }

    #[test]
    fn add_in_workbooks_read_as_xlsx() {
        assert_eq!(file_extension("/data/Prices.XLAM"), "xlam");
        let reader = UnifiedReader::from_bytes(crate::spreadsheet::xlsx::tests::price_list_xlsx());
        let spreadsheet = open_spreadsheet_reader("prices.xlam", "xlam", reader).unwrap();
        assert_eq!(spreadsheet.name(), "prices.xlam");
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let error = open_spreadsheet("prices.csv").err().unwrap();
        assert!(error.to_string().contains("prices.csv"));

        let reader = UnifiedReader::from_bytes(Vec::new());
        assert!(open_spreadsheet_reader("prices.xls", "xls", reader).is_err());
    }
}
