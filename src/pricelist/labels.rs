//! Recognized label variants.
//!
//! Every kind of label the scanner looks for is a list of lower-cased variants. The
//! built-in table covers the Ukrainian price lists this extension was written for;
//! callers extend it through the `labels` parameter without touching the scanner.
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum LabelError {
    #[error("Unknown label kind '{0}', expected one of: {1}")]
    UnknownKindError(String, String),
}

/// What a label variant identifies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum LabelKind {
    /// Prefix of a model-marker cell (`Модель: "X"`)
    Model,
    /// Prefix of the size column header
    Size,
    WholesalePrice,
    WholesalePromo,
    RetailPrice,
    RetailPromo,
    /// Exact promotional cell value meaning "no promotion"
    Unavailable,
    /// Substring of a promo header announcing a percentage discount
    Percent,
    /// Prefix of descriptive sub-heading rows inside a block
    Noise,
}

impl LabelKind {
    pub(crate) const ALL: [LabelKind; 9] = [
        LabelKind::Model,
        LabelKind::Size,
        LabelKind::WholesalePrice,
        LabelKind::WholesalePromo,
        LabelKind::RetailPrice,
        LabelKind::RetailPromo,
        LabelKind::Unavailable,
        LabelKind::Percent,
        LabelKind::Noise,
    ];

    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            LabelKind::Model => "model",
            LabelKind::Size => "size",
            LabelKind::WholesalePrice => "wholesale_price",
            LabelKind::WholesalePromo => "wholesale_promo",
            LabelKind::RetailPrice => "retail_price",
            LabelKind::RetailPromo => "retail_promo",
            LabelKind::Unavailable => "unavailable",
            LabelKind::Percent => "percent",
            LabelKind::Noise => "noise",
        }
    }

    /// Parses a kind from its parameter key, ignoring case.
    pub(crate) fn parse(name: &str) -> Result<Self, LabelError> {
        let key = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| {
                let expected = Self::ALL.map(|kind| kind.as_str()).join(", ");
                LabelError::UnknownKindError(name.to_owned(), expected)
            })
    }

    const fn defaults(&self) -> &'static [&'static str] {
        match self {
            LabelKind::Model => &["модель:", "назва моделі"],
            LabelKind::Size => &["розмір"],
            LabelKind::WholesalePrice => &["оптова ціна", "ціна гурт"],
            LabelKind::WholesalePromo => &["акційна оптова ціна", "акційна гуртова ціна", "оптова ціна акція"],
            LabelKind::RetailPrice => &["роздрібна ціна", "ціна роздріб"],
            LabelKind::RetailPromo => &["акційна роздрібна ціна", "роздрібна ціна акція"],
            LabelKind::Unavailable => &["відсутня"],
            LabelKind::Percent => &["% "],
            LabelKind::Noise => &["основні характеристики"],
        }
    }
}

/// Label variants per kind, all lower-case.
#[derive(Clone, Debug)]
pub(crate) struct LabelTable {
    variants: HashMap<LabelKind, Vec<String>>,
}

impl Default for LabelTable {
    fn default() -> Self {
        let variants = LabelKind::ALL
            .into_iter()
            .map(|kind| {
                let defaults = kind.defaults().iter().map(|it| it.to_string()).collect();
                (kind, defaults)
            })
            .collect();
        LabelTable { variants }
    }
}

impl LabelTable {
    pub(crate) fn variants(&self, kind: LabelKind) -> &[String] {
        self.variants.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends variants for a kind. Blank and duplicate variants are ignored.
    pub(crate) fn extend<I, S>(&mut self, kind: LabelKind, variants: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = self.variants.entry(kind).or_default();
        for variant in variants {
            // Marker substrings such as "% " keep their whitespace
            let variant = variant.as_ref().to_lowercase();
            if !variant.trim().is_empty() && !known.contains(&variant) {
                known.push(variant);
            }
        }
    }

    /// Returns the first variant of `kind` that `text` starts with.
    /// `text` must already be lower-cased.
    pub(crate) fn prefix_of(&self, kind: LabelKind, text: &str) -> Option<&str> {
        self.variants(kind)
            .iter()
            .find(|variant| text.starts_with(variant.as_str()))
            .map(String::as_str)
    }

    pub(crate) fn equals(&self, kind: LabelKind, text: &str) -> bool {
        self.variants(kind).iter().any(|variant| variant == text)
    }

    pub(crate) fn contained_in(&self, kind: LabelKind, text: &str) -> bool {
        self.variants(kind).iter().any(|variant| text.contains(variant.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_names() {
        assert_eq!(LabelKind::parse("Wholesale_Promo").unwrap(), LabelKind::WholesalePromo);
        assert_eq!(LabelKind::parse(" noise ").unwrap(), LabelKind::Noise);
        let error = LabelKind::parse("price").unwrap_err();
        assert!(error.to_string().contains("'price'"));
        assert!(error.to_string().contains("retail_promo"));
    }

    #[test]
    fn default_table_matches_prefixes() {
        let labels = LabelTable::default();
        assert_eq!(labels.prefix_of(LabelKind::Model, "модель: x"), Some("модель:"));
        assert_eq!(labels.prefix_of(LabelKind::Size, "розмір, см"), Some("розмір"));
        assert_eq!(labels.prefix_of(LabelKind::Size, "ціна"), None);
        assert!(labels.equals(LabelKind::Unavailable, "відсутня"));
        assert!(!labels.equals(LabelKind::Unavailable, "відсутня зараз"));
        assert!(labels.contained_in(LabelKind::Percent, "знижка, % від ціни"));
    }

    #[test]
    fn extend_lowercases_and_deduplicates() {
        let mut labels = LabelTable::default();
        labels.extend(LabelKind::Size, ["Size", "РОЗМІР", "  ", "size"]);
        assert_eq!(labels.variants(LabelKind::Size), ["розмір", "size"]);
        assert_eq!(labels.prefix_of(LabelKind::Size, "size (eu)"), Some("size"));
    }
}
