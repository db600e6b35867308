use thiserror::Error;

/// Main error type for the price-list extension.
/// Aggregates errors from the standard library, dependencies and internal modules.
#[derive(Error, Debug)]
pub(crate) enum PriceListError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    // Third-party library errors
    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    UnifiedReaderError(#[from] crate::helpers::reader::UnifiedReaderError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),

    // Price list errors
    #[error("{0}")]
    LabelError(#[from] crate::pricelist::labels::LabelError),

    // Extension module errors
    #[error("{0}")]
    ExtensionError(#[from] crate::extension::ExtensionError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, PriceListError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| PriceListError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_names_the_source() {
        let result: Result<(), PriceListError> = Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
        let message = result.with_prefix("prices.xlsx").unwrap_err().to_string();
        assert!(message.starts_with("prices.xlsx: "), "{message}");
    }

    #[test]
    fn with_prefix_keeps_ok() {
        let result: Result<usize, PriceListError> = Ok(3);
        assert_eq!(result.with_prefix("prices.xlsx").unwrap(), 3);
    }
}
