//! # SQL surface
//!
//! Parameter handling and the `read_price_list` table function.
pub(crate) mod read_price_list;
mod writer;

use crate::bridge::ValueBridge;
use crate::error::PriceListError;
use crate::helpers::reader::UnifiedReader;
use crate::pricelist::labels::LabelKind;
use crate::pricelist::labels::LabelTable;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use glob::Pattern;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    #[error("Missing parameter '{0}'")]
    MissingParameterError(String),

    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameterError(String, String),

    #[error("No file matches '{0}'")]
    FileGlobNoMatchError(String),

    #[error("No sheet of '{0}' matches '{1}'")]
    SheetWildcardError(String, String),
}

/// A positional table-function parameter.
pub(crate) trait Param<T> {
    fn kind() -> LogicalTypeHandle;

    fn read(bind: &BindInfo, index: u64) -> Result<T, PriceListError>;
}

/// A named table-function parameter, `None` when the query leaves it out.
pub(crate) trait NamedParam<T> {
    fn name() -> &'static str;

    fn kind() -> LogicalTypeHandle;

    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_owned(), Self::kind())
    }

    fn read(bind: &BindInfo) -> Result<Option<T>, PriceListError>;
}

/// Source file: a path, a local glob or a remote URL
pub(crate) struct FileParam;

/// Glob over sheet names
pub(crate) struct SheetParam;

/// Extra label variants keyed by label kind
pub(crate) struct LabelsParam;

pub(crate) struct FallbackRatioParam;

/// Name of an extra output column holding the source file
pub(crate) struct FileNameColumnParam;

/// Name of an extra output column holding the sheet name
pub(crate) struct SheetNameColumnParam;

impl Param<Vec<String>> for FileParam {
    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo, index: u64) -> Result<Vec<String>, PriceListError> {
        let file = bind.get_parameter(index).to_varchar();
        if file.trim().is_empty() {
            Err(ExtensionError::MissingParameterError("file".to_owned()))?;
        }
        expand_files(&file)
    }
}

impl NamedParam<Pattern> for SheetParam {
    fn name() -> &'static str {
        "sheet"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<Pattern>, PriceListError> {
        bind.get_named_parameter(Self::name())
            .map(|value| -> Result<Pattern, PriceListError> { Ok(Pattern::new(&value.to_varchar())?) })
            .transpose()
    }
}

impl NamedParam<LabelTable> for LabelsParam {
    fn name() -> &'static str {
        "labels"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::map(
            &LogicalTypeHandle::from(LogicalTypeId::Varchar),
            &LogicalTypeHandle::list(&LogicalTypeHandle::from(LogicalTypeId::Varchar)),
        )
    }

    fn read(bind: &BindInfo) -> Result<Option<LabelTable>, PriceListError> {
        bind.get_named_parameter(Self::name())
            .map(|value| {
                let entries = value.to_map_entries().iter().map(|(key, variants)| {
                    let variants = ValueBridge::to_list(variants).iter().map(|variant| variant.to_varchar()).collect();
                    (key.to_varchar(), variants)
                }).collect::<Vec<(String, Vec<String>)>>();
                build_label_table(entries)
            })
            .transpose()
    }
}

impl NamedParam<f64> for FallbackRatioParam {
    fn name() -> &'static str {
        "fallback_ratio"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Double)
    }

    fn read(bind: &BindInfo) -> Result<Option<f64>, PriceListError> {
        bind.get_named_parameter(Self::name())
            .map(|value| check_fallback_ratio(value.to_double()))
            .transpose()
    }
}

impl NamedParam<String> for FileNameColumnParam {
    fn name() -> &'static str {
        "file_name_column"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, PriceListError> {
        bind.get_named_parameter(Self::name())
            .map(|value| check_column_name(Self::name(), value.to_varchar()))
            .transpose()
    }
}

impl NamedParam<String> for SheetNameColumnParam {
    fn name() -> &'static str {
        "sheet_name_column"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, PriceListError> {
        bind.get_named_parameter(Self::name())
            .map(|value| check_column_name(Self::name(), value.to_varchar()))
            .transpose()
    }
}

/// Expands a local glob into the sorted list of matching paths.
/// Remote URLs and plain paths come back unchanged.
fn expand_files(file: &str) -> Result<Vec<String>, PriceListError> {
    if UnifiedReader::is_remote_url(file) || !file.contains(['*', '?', '[']) {
        return Ok(vec![file.to_owned()]);
    }
    let mut files = glob::glob(file)?
        .map(|path| -> Result<String, PriceListError> { Ok(path?.to_string_lossy().into_owned()) })
        .collect::<Result<Vec<String>, PriceListError>>()?;
    if files.is_empty() {
        Err(ExtensionError::FileGlobNoMatchError(file.to_owned()))?;
    }
    files.sort();
    Ok(files)
}

/// Default label table extended with `(kind, variants)` entries.
fn build_label_table(entries: Vec<(String, Vec<String>)>) -> Result<LabelTable, PriceListError> {
    let mut labels = LabelTable::default();
    for (key, variants) in entries {
        labels.extend(LabelKind::parse(&key)?, variants);
    }
    Ok(labels)
}

fn check_fallback_ratio(ratio: f64) -> Result<f64, PriceListError> {
    if !(0.0..=1.0).contains(&ratio) {
        Err(ExtensionError::InvalidParameterError(
            FallbackRatioParam::name().to_owned(),
            format!("{ratio} is outside [0, 1]"),
        ))?;
    }
    Ok(ratio)
}

fn check_column_name(parameter: &str, name: String) -> Result<String, PriceListError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        Err(ExtensionError::InvalidParameterError(parameter.to_owned(), "column name is empty".to_owned()))?;
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn plain_paths_and_urls_pass_through() {
        assert_eq!(expand_files("prices.xlsx").unwrap(), vec!["prices.xlsx"]);
        assert_eq!(
            expand_files("https://example.com/prices*.xlsx").unwrap(),
            vec!["https://example.com/prices*.xlsx"]
        );
    }

    #[test]
    fn local_glob_is_sorted() {
        let directory = std::env::temp_dir().join(format!("price-list-glob-{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        for name in ["b.xlsx", "a.xlsx", "c.ods"] {
            File::create(directory.join(name)).unwrap();
        }
        let pattern = directory.join("*.xlsx").to_string_lossy().into_owned();
        let files = expand_files(&pattern).unwrap();
        std::fs::remove_dir_all(&directory).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.xlsx"));
        assert!(files[1].ends_with("b.xlsx"));
    }

    #[test]
    fn glob_without_match_fails() {
        let pattern = std::env::temp_dir().join("price-list-none-*.xlsx").to_string_lossy().into_owned();
        let error = expand_files(&pattern).unwrap_err();
        assert!(error.to_string().starts_with("No file matches"));
    }

    #[test]
    fn labels_extend_defaults() {
        let labels = build_label_table(vec![
            ("Size".to_owned(), vec!["Size".to_owned(), "Розмір UA".to_owned()]),
            ("noise".to_owned(), vec!["Примітка".to_owned()]),
        ]).unwrap();
        assert_eq!(labels.variants(LabelKind::Size), ["розмір", "size", "розмір ua"]);
        assert!(labels.variants(LabelKind::Noise).contains(&"примітка".to_owned()));
    }

    #[test]
    fn unknown_label_kind_fails() {
        let error = build_label_table(vec![("colour".to_owned(), vec![])]).unwrap_err();
        assert!(error.to_string().contains("colour"));
    }

    #[test]
    fn fallback_ratio_bounds() {
        assert_eq!(check_fallback_ratio(0.0).unwrap(), 0.0);
        assert_eq!(check_fallback_ratio(1.0).unwrap(), 1.0);
        assert!(check_fallback_ratio(1.5).is_err());
        assert!(check_fallback_ratio(-0.1).is_err());
        assert!(check_fallback_ratio(f64::NAN).is_err());
    }

    #[test]
    fn column_names_are_trimmed() {
        assert_eq!(check_column_name("file_name_column", " source ".to_owned()).unwrap(), "source");
        assert!(check_column_name("file_name_column", "  ".to_owned()).is_err());
    }
}
