//! Header row resolution.
use crate::pricelist::labels::LabelKind;
use crate::pricelist::labels::LabelTable;
use crate::pricelist::row::RawCell;
use std::collections::HashMap;

/// Semantic meaning of a column within one model block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ColumnRole {
    Size,
    WholesalePrice,
    WholesalePromo,
    RetailPrice,
    RetailPromo,
}

impl ColumnRole {
    /// Price roles in matching order. Promotional roles come first because some of
    /// their labels extend a base-price label ("оптова ціна акція" vs "оптова ціна").
    const PRICE_ROLES: [ColumnRole; 4] = [
        ColumnRole::WholesalePromo,
        ColumnRole::WholesalePrice,
        ColumnRole::RetailPromo,
        ColumnRole::RetailPrice,
    ];

    pub(crate) const fn label_kind(&self) -> LabelKind {
        match self {
            ColumnRole::Size => LabelKind::Size,
            ColumnRole::WholesalePrice => LabelKind::WholesalePrice,
            ColumnRole::WholesalePromo => LabelKind::WholesalePromo,
            ColumnRole::RetailPrice => LabelKind::RetailPrice,
            ColumnRole::RetailPromo => LabelKind::RetailPromo,
        }
    }
}

/// Column index per role. A missing role means the block's header has no such column.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ColumnMapping {
    columns: HashMap<ColumnRole, usize>,
}

impl ColumnMapping {
    pub(crate) fn get(&self, role: ColumnRole) -> Option<usize> {
        self.columns.get(&role).copied()
    }

    pub(crate) fn contains(&self, role: ColumnRole) -> bool {
        self.columns.contains_key(&role)
    }

    /// Assigns a column to a role unless the role is already taken.
    fn claim(&mut self, role: ColumnRole, column: usize) -> bool {
        if self.contains(role) {
            false
        } else {
            self.columns.insert(role, column);
            true
        }
    }
}

/// Result of resolving one header row.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HeaderLayout {
    pub(crate) mapping: ColumnMapping,
    /// The wholesale promo header announces a percentage instead of holding prices
    pub(crate) wholesale_promo_is_percent: bool,
    /// The retail promo header announces a percentage instead of holding prices
    pub(crate) retail_promo_is_percent: bool,
}

/// Maps header labels to column roles.
///
/// `size_column` comes from classification. Every other string cell claims the first
/// price role it matches; a role keeps the leftmost column that claimed it.
pub(crate) fn resolve_header(row: &[RawCell], size_column: usize, labels: &LabelTable) -> HeaderLayout {
    let mut layout = HeaderLayout::default();
    layout.mapping.claim(ColumnRole::Size, size_column);

    for (column, cell) in row.iter().enumerate() {
        if column == size_column {
            continue;
        }
        let Some(raw) = cell.text() else { continue };
        let text = raw.trim().to_lowercase();
        let Some(role) = ColumnRole::PRICE_ROLES
            .into_iter()
            .find(|role| labels.prefix_of(role.label_kind(), &text).is_some())
        else {
            continue;
        };
        if !layout.mapping.claim(role, column) {
            continue;
        }
        // "% " usually ends the label, match it on the untrimmed text
        let is_percent = labels.contained_in(LabelKind::Percent, &raw.to_lowercase());
        match role {
            ColumnRole::WholesalePromo => layout.wholesale_promo_is_percent = is_percent,
            ColumnRole::RetailPromo => layout.retail_promo_is_percent = is_percent,
            _ => (),
        }
    }
    layout
}
