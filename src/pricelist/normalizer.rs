//! Record normalization.
use crate::pricelist::header::ColumnRole;
use crate::pricelist::header::HeaderLayout;
use crate::pricelist::labels::LabelKind;
use crate::pricelist::row::cell_at;
use crate::pricelist::row::RawCell;
use crate::pricelist::ScanOptions;

/// One output row of the price list.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NormalizedRecord {
    pub(crate) model: String,
    pub(crate) size: String,
    pub(crate) wholesale_price: Option<f64>,
    pub(crate) wholesale_promo: Option<f64>,
    pub(crate) retail_price: Option<f64>,
    pub(crate) retail_promo: Option<f64>,
}

/// Rounds to two decimal places. Exact halves go to the even cent.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Builds a record from a data row whose size cell has already been validated.
pub(crate) fn normalize(
    row: &[RawCell],
    model: &str,
    size: &str,
    layout: &HeaderLayout,
    options: &ScanOptions,
) -> NormalizedRecord {
    let (wholesale_price, wholesale_promo) = price_pair(
        row,
        layout,
        (ColumnRole::WholesalePrice, ColumnRole::WholesalePromo),
        layout.wholesale_promo_is_percent,
        options,
    );
    let (retail_price, retail_promo) = price_pair(
        row,
        layout,
        (ColumnRole::RetailPrice, ColumnRole::RetailPromo),
        layout.retail_promo_is_percent,
        options,
    );
    NormalizedRecord {
        model: model.to_owned(),
        size: size.trim().to_owned(),
        wholesale_price,
        wholesale_promo,
        retail_price,
        retail_promo,
    }
}

/// Derives a (base, promo) price pair for one side of the list.
fn price_pair(
    row: &[RawCell],
    layout: &HeaderLayout,
    (base_role, promo_role): (ColumnRole, ColumnRole),
    is_percent: bool,
    options: &ScanOptions,
) -> (Option<f64>, Option<f64>) {
    let base = cell_at(row, layout.mapping.get(base_role)).number();
    let promo = match cell_at(row, layout.mapping.get(promo_role)) {
        RawCell::Text(text) if options.labels.equals(LabelKind::Unavailable, &text.trim().to_lowercase()) => None,
        RawCell::Number(value) => Some(round2(*value)),
        _ if is_percent => base.map(|base| round2(base * options.fallback_ratio)),
        _ => None,
    };
    (base.map(round2), promo)
}
