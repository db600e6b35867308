use crate::error::PriceListError;
use crate::error::ResultMessage;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputColumn;
use crate::extension::writer::RecordSource;
use crate::extension::ExtensionError;
use crate::extension::FallbackRatioParam;
use crate::extension::FileNameColumnParam;
use crate::extension::FileParam;
use crate::extension::LabelsParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::SheetNameColumnParam;
use crate::extension::SheetParam;
use crate::pricelist::extract_records;
use crate::pricelist::normalizer::NormalizedRecord;
use crate::pricelist::ScanOptions;
use crate::pricelist::DEFAULT_FALLBACK_RATIO;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use glob::Pattern;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use tracing::info;

/// Rows per output chunk, DuckDB's standard vector size
const CHUNK_SIZE: usize = 2048;

/// Parameters for the read_price_list table function
struct ReadPriceListParameters {
    /// Spreadsheet files, globs already expanded
    files: Vec<String>,
    sheet: Option<Pattern>,
    options: ScanOptions,
    file_name_column: Option<String>,
    sheet_name_column: Option<String>,
}

impl TryFrom<&BindInfo> for ReadPriceListParameters {
    type Error = PriceListError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(ReadPriceListParameters {
            files: FileParam::read(bind, 0)?,
            sheet: SheetParam::read(bind)?,
            options: ScanOptions {
                labels: LabelsParam::read(bind)?.unwrap_or_default(),
                fallback_ratio: FallbackRatioParam::read(bind)?.unwrap_or(DEFAULT_FALLBACK_RATIO),
            },
            file_name_column: FileNameColumnParam::read(bind)?,
            sheet_name_column: SheetNameColumnParam::read(bind)?,
        })
    }
}

/// Records extracted from one sheet
struct PriceListSheet {
    file_name: String,
    sheet_name: String,
    records: Vec<NormalizedRecord>,
}

#[repr(C)]
/// Data structure for the bind phase of the read_price_list table function
pub(crate) struct ReadPriceListBindData {
    /// Output columns with their names
    columns: Vec<(OutputColumn, String)>,
    sheets: Vec<PriceListSheet>,
}

impl TryFrom<&ReadPriceListParameters> for ReadPriceListBindData {
    type Error = PriceListError;

    fn try_from(parameters: &ReadPriceListParameters) -> Result<Self, Self::Error> {
        let mut columns: Vec<(OutputColumn, String)> = OutputColumn::RECORD
            .iter()
            .map(|column| (*column, column.default_name().to_owned()))
            .collect();
        for (column, name) in [
            (OutputColumn::FileName, &parameters.file_name_column),
            (OutputColumn::SheetName, &parameters.sheet_name_column),
        ] {
            if let Some(name) = name {
                if columns.iter().any(|(_, existing)| existing.eq_ignore_ascii_case(name)) {
                    Err(ExtensionError::InvalidParameterError(
                        name.to_owned(),
                        "duplicate output column name".to_owned(),
                    ))?;
                }
                columns.push((column, name.to_owned()));
            }
        }

        let criteria = Criteria::for_sheet(parameters.sheet.to_owned());
        let sheets = parameters.files.iter().map(|file_name| {
            load_price_lists(file_name, &criteria, &parameters.options).with_prefix(file_name)
        }).collect::<Result<Vec<_>, _>>()?;

        Ok(ReadPriceListBindData {
            columns,
            sheets: sheets.into_iter().flatten().collect(),
        })
    }
}

/// Reads the sheets of one file accepted by `criteria` and extracts their records.
fn load_price_lists(
    file_name: &str,
    criteria: &Criteria,
    options: &ScanOptions,
) -> Result<Vec<PriceListSheet>, PriceListError> {
    let mut spreadsheet = open_spreadsheet(file_name)?;
    let sheets = spreadsheet.read_sheets(criteria)?;
    if sheets.is_empty() {
        match &criteria.sheet_name_pattern {
            Some(pattern) => Err(ExtensionError::SheetWildcardError(spreadsheet.name(), pattern.to_string()))?,
            None => Err(SpreadsheetError::SpreadsheetEmptyError(spreadsheet.name()))?,
        }
    }
    Ok(sheets.into_iter().map(|sheet| {
        let records = extract_records(sheet.rows(), options);
        info!(file = file_name, sheet = %sheet.name, records = records.len(), "price list sheet processed");
        PriceListSheet {
            file_name: sheet.file_name,
            sheet_name: sheet.name,
            records,
        }
    }).collect())
}

#[repr(C)]
/// Data structure for the initialization phase of the read_price_list table function
pub(crate) struct ReadPriceListInitData {
    /// (sheet_index, first record) pairs, one per output chunk
    chunks: Vec<(usize, usize)>,
    /// Atomic counter tracking current iteration position
    index: AtomicUsize,
    /// Column projection indices for selective column reading
    projections: Vec<usize>,
}

/// DuckDB table function reading normalized price-list records from spreadsheets
pub(crate) struct ReadPriceListTableFunction;

impl VTab for ReadPriceListTableFunction {
    type InitData = ReadPriceListInitData;
    type BindData = ReadPriceListBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = ReadPriceListParameters::try_from(bind)?;
        let data = ReadPriceListBindData::try_from(&parameters)?;
        for (column, name) in &data.columns {
            bind.add_result_column(name, LogicalTypeHandle::from(column.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(init: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        let bind: *const Self::BindData = init.get_bind_data();
        let mut chunks = Vec::<(usize, usize)>::new();
        unsafe {
            for (sheet_index, sheet) in (*bind).sheets.iter().enumerate() {
                for start in (0..sheet.records.len()).step_by(CHUNK_SIZE) {
                    chunks.push((sheet_index, start));
                }
            }
        };
        let projections = init.get_column_indices()
            .into_iter()
            .map(|index| index as usize)
            .collect::<Vec<_>>();
        Ok(ReadPriceListInitData {
            chunks,
            index: AtomicUsize::new(0),
            projections,
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        let index = init.index.fetch_add(1, Ordering::Relaxed);
        match init.chunks.get(index) {
            Some(&(sheet_index, start)) => {
                let sheet = &bind.sheets[sheet_index];
                let records = &sheet.records[start..sheet.records.len().min(start + CHUNK_SIZE)];
                let source = RecordSource {
                    file_name: &sheet.file_name,
                    sheet_name: &sheet.sheet_name,
                };
                let mut vectors: Vec<_> = (0..init.projections.len()).map(|index| output.flat_vector(index)).collect();
                output.set_len(records.len());
                for (row, record) in records.iter().enumerate() {
                    for (index, col) in init.projections.iter().enumerate() {
                        let column = bind.columns[*col].0;
                        write_to_vector(column, record, &source, &mut vectors[index], row);
                    }
                }
            }
            // No more data to process
            None => output.set_len(0),
        }
        Ok(())
    }

    fn supports_pushdown() -> bool {
        true
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![FileParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SheetParam::definition(),
            LabelsParam::definition(),
            FallbackRatioParam::definition(),
            FileNameColumnParam::definition(),
            SheetNameColumnParam::definition(),
        ])
    }
}
