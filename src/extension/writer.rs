//! Writes normalized records into DuckDB vectors.

use crate::pricelist::normalizer::NormalizedRecord;
use duckdb::core::FlatVector;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeId;

/// One output column of `read_price_list`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) enum OutputColumn {
    Model,
    Size,
    WholesalePrice,
    WholesalePromo,
    RetailPrice,
    RetailPromo,
    FileName,
    SheetName,
}

impl OutputColumn {
    /// Columns every query returns, in order.
    pub(super) const RECORD: [OutputColumn; 6] = [
        OutputColumn::Model,
        OutputColumn::Size,
        OutputColumn::WholesalePrice,
        OutputColumn::WholesalePromo,
        OutputColumn::RetailPrice,
        OutputColumn::RetailPromo,
    ];

    pub(super) const fn default_name(&self) -> &'static str {
        match self {
            OutputColumn::Model => "Model_rez",
            OutputColumn::Size => "Size_rez",
            OutputColumn::WholesalePrice => "Price_Opt",
            OutputColumn::WholesalePromo => "Price_Opt_Akciya",
            OutputColumn::RetailPrice => "Price_Rozn",
            OutputColumn::RetailPromo => "Price_Rozn_Akcia",
            OutputColumn::FileName => "file_name",
            OutputColumn::SheetName => "sheet_name",
        }
    }

    pub(super) const fn to_logical_type_id(&self) -> LogicalTypeId {
        match self {
            OutputColumn::WholesalePrice
            | OutputColumn::WholesalePromo
            | OutputColumn::RetailPrice
            | OutputColumn::RetailPromo => LogicalTypeId::Double,
            _ => LogicalTypeId::Varchar,
        }
    }

    fn price(&self, record: &NormalizedRecord) -> Option<f64> {
        match self {
            OutputColumn::WholesalePrice => record.wholesale_price,
            OutputColumn::WholesalePromo => record.wholesale_promo,
            OutputColumn::RetailPrice => record.retail_price,
            OutputColumn::RetailPromo => record.retail_promo,
            _ => None,
        }
    }
}

/// Where a record came from
pub(super) struct RecordSource<'a> {
    pub(super) file_name: &'a str,
    pub(super) sheet_name: &'a str,
}

/// Writes one field of `record` at `row` of `vector`. Absent prices become NULL.
pub(super) fn write_to_vector(
    column: OutputColumn,
    record: &NormalizedRecord,
    source: &RecordSource,
    vector: &mut FlatVector,
    row: usize,
) {
    match column {
        OutputColumn::Model => vector.insert(row, record.model.as_str()),
        OutputColumn::Size => vector.insert(row, record.size.as_str()),
        OutputColumn::FileName => vector.insert(row, source.file_name),
        OutputColumn::SheetName => vector.insert(row, source.sheet_name),
        _ => match column.price(record) {
            Some(price) => write_primitive(vector, row, price),
            None => vector.set_null(row),
        },
    }
}

/// Writes a primitive value directly to a vector using pointer arithmetic.
fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    unsafe {
        let pointer: *mut T = vector.as_mut_ptr();
        std::ptr::write(pointer.add(index), value);
    }
}
