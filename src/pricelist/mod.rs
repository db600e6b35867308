//! Price-list extraction: turns the rows of one sheet into normalized records.
pub(crate) mod classifier;
pub(crate) mod header;
pub(crate) mod labels;
pub(crate) mod normalizer;
pub(crate) mod row;
pub(crate) mod scanner;

use crate::pricelist::labels::LabelTable;
use crate::pricelist::normalizer::NormalizedRecord;
use crate::pricelist::row::RawRow;
use crate::pricelist::scanner::BlockScanner;

/// Promo price as a share of the base price when a percentage header carries no value.
pub(crate) const DEFAULT_FALLBACK_RATIO: f64 = 0.7;

/// Settings shared by every sheet of one scan.
#[derive(Clone, Debug)]
pub(crate) struct ScanOptions {
    pub(crate) labels: LabelTable,
    pub(crate) fallback_ratio: f64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            labels: LabelTable::default(),
            fallback_ratio: DEFAULT_FALLBACK_RATIO,
        }
    }
}

/// Extracts every record of one sheet, in row order.
pub(crate) fn extract_records<R>(rows: R, options: &ScanOptions) -> Vec<NormalizedRecord>
where
    R: IntoIterator<Item = RawRow>,
{
    BlockScanner::new(rows, options).collect()
}
