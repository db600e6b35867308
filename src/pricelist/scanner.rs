//! Block scanner: the state machine that walks a sheet's rows.
use crate::pricelist::classifier::classify;
use crate::pricelist::classifier::has_prefix;
use crate::pricelist::classifier::RowKind;
use crate::pricelist::header::resolve_header;
use crate::pricelist::header::ColumnRole;
use crate::pricelist::header::HeaderLayout;
use crate::pricelist::labels::LabelKind;
use crate::pricelist::normalizer::normalize;
use crate::pricelist::normalizer::NormalizedRecord;
use crate::pricelist::row::cell_at;
use crate::pricelist::row::RawRow;
use crate::pricelist::ScanOptions;
use tracing::debug;

#[derive(Copy, Clone, Debug, PartialEq)]
enum ScanState {
    /// Looking for the next model marker
    Seeking,
    /// Model found, looking for its header row
    AwaitingHeader,
    /// Header resolved, consuming data rows
    InBlock,
}

/// Model and header context of the block being scanned.
#[derive(Clone, Debug, Default)]
pub(crate) struct BlockContext {
    pub(crate) model: String,
    pub(crate) layout: HeaderLayout,
}

impl BlockContext {
    /// Starts a new model block, dropping everything from the previous one.
    fn start_model(&mut self, model: String) {
        self.model = model;
        self.layout = HeaderLayout::default();
    }

    /// Replaces the header within the current model.
    fn apply_header(&mut self, layout: HeaderLayout) {
        self.layout = layout;
    }
}

/// Lazily turns rows into normalized records.
///
/// A model marker met inside a block is pushed back and re-read from `Seeking`,
/// so it is captured exactly like the first marker of the sheet.
pub(crate) struct BlockScanner<'a, I>
where
    I: Iterator<Item = RawRow>,
{
    rows: I,
    pushed_back: Option<RawRow>,
    state: ScanState,
    context: BlockContext,
    options: &'a ScanOptions,
}

impl<'a, I> BlockScanner<'a, I>
where
    I: Iterator<Item = RawRow>,
{
    pub(crate) fn new<R>(rows: R, options: &'a ScanOptions) -> Self
    where
        R: IntoIterator<Item = RawRow, IntoIter = I>,
    {
        BlockScanner {
            rows: rows.into_iter(),
            pushed_back: None,
            state: ScanState::Seeking,
            context: BlockContext::default(),
            options,
        }
    }

    fn next_row(&mut self) -> Option<RawRow> {
        self.pushed_back.take().or_else(|| self.rows.next())
    }

    fn resolve(&mut self, row: &RawRow, size_column: usize) {
        let layout = resolve_header(row, size_column, &self.options.labels);
        debug!(
            model = %self.context.model,
            size_column,
            wholesale_promo_is_percent = layout.wholesale_promo_is_percent,
            retail_promo_is_percent = layout.retail_promo_is_percent,
            "found header: {:?}",
            layout.mapping,
        );
        self.context.apply_header(layout);
    }

    /// Validates a data row and normalizes it, or returns `None` to skip it.
    fn record(&self, row: &RawRow) -> Option<NormalizedRecord> {
        let size = cell_at(row, self.context.layout.mapping.get(ColumnRole::Size))
            .text()
            .filter(|size| !size.trim().is_empty())?;
        if row.iter().any(|cell| has_prefix(cell, LabelKind::Noise, &self.options.labels)) {
            return None;
        }
        Some(normalize(row, &self.context.model, size, &self.context.layout, self.options))
    }
}

impl<I> Iterator for BlockScanner<'_, I>
where
    I: Iterator<Item = RawRow>,
{
    type Item = NormalizedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(row) = self.next_row() {
            let kind = classify(&row, &self.options.labels);
            match (self.state, kind) {
                (ScanState::Seeking, RowKind::ModelMarker(model)) => {
                    debug!(model = %model, "found model");
                    self.context.start_model(model);
                    self.state = ScanState::AwaitingHeader;
                }
                (ScanState::Seeking, _) => (),
                (ScanState::AwaitingHeader, RowKind::HeaderCandidate(size_column)) => {
                    self.resolve(&row, size_column);
                    self.state = ScanState::InBlock;
                }
                // Descriptive rows between the model marker and its table
                (ScanState::AwaitingHeader, _) => (),
                (ScanState::InBlock, RowKind::Blank) => (),
                (ScanState::InBlock, RowKind::ModelMarker(_)) => {
                    self.pushed_back = Some(row);
                    self.state = ScanState::Seeking;
                }
                (ScanState::InBlock, RowKind::HeaderCandidate(size_column)) => {
                    self.resolve(&row, size_column);
                }
                (ScanState::InBlock, RowKind::Data) => {
                    if let Some(record) = self.record(&row) {
                        return Some(record);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricelist::row::RawCell;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    fn text(value: &str) -> RawCell {
        if value.is_empty() {
            RawCell::Empty
        } else {
            RawCell::from(value)
        }
    }

    fn scan(rows: Vec<RawRow>) -> Vec<NormalizedRecord> {
        init_tracing();
        let options = ScanOptions::default();
        BlockScanner::new(rows, &options).collect()
    }

    #[test]
    fn no_model_marker_yields_nothing() {
        let rows = vec![
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("S"), RawCell::from(10.0)],
        ];
        assert!(scan(rows).is_empty());
    }

    #[test]
    fn blank_rows_never_emit() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("   "), RawCell::Empty],
            vec![],
            vec![text("S"), RawCell::from(10.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "S");
    }

    #[test]
    fn noise_before_header_is_skipped() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Тканина: бавовна"), RawCell::from(100.0)],
            vec![text("S"), RawCell::from(5.0)],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("M"), RawCell::from(10.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "M");
        assert_eq!(records[0].wholesale_price, Some(10.0));
    }

    #[test]
    fn invalid_size_cells_are_skipped() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![RawCell::from(42.0), RawCell::from(10.0)],
            vec![text("  "), RawCell::from(10.0)],
            vec![RawCell::Empty, RawCell::from(10.0)],
            vec![text("XL"), RawCell::from(12.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "XL");
    }

    #[test]
    fn date_in_size_column_is_skipped() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![RawCell::Temporal("2024-05-01".to_owned()), RawCell::from(10.0)],
            vec![text("S"), RawCell::Temporal("2024-05-01".to_owned())],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "S");
        assert_eq!(records[0].wholesale_price, None);
    }

    #[test]
    fn second_marker_before_header_keeps_first_model() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Модель: B")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("S"), RawCell::from(10.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model, "A");
        assert_eq!(records[0].wholesale_price, Some(10.0));
    }

    #[test]
    fn description_rows_inside_block_are_skipped() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("S"), text("Основні характеристики: бавовна 100%")],
            vec![text("M"), RawCell::from(10.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "M");
    }

    #[test]
    fn new_model_marker_resets_mapping() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("S"), RawCell::from(10.0)],
            vec![text("Модель: B")],
            vec![text("Примітка"), RawCell::from(1.0), RawCell::from(2.0)],
            vec![text(""), text("Роздрібна ціна"), text("Розмір")],
            vec![RawCell::from(99.0), RawCell::from(20.0), text("L")],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model, "A");
        assert_eq!(records[0].wholesale_price, Some(10.0));
        assert_eq!(records[1].model, "B");
        assert_eq!(records[1].size, "L");
        assert_eq!(records[1].wholesale_price, None);
        assert_eq!(records[1].retail_price, Some(20.0));
    }

    #[test]
    fn model_marker_on_data_row_is_reprocessed() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("Модель: B"), text("Розмір"), text("Оптова ціна")],
            vec![text("S"), RawCell::from(10.0)],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("M"), RawCell::from(11.0)],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model, "B");
        assert_eq!(records[0].size, "M");
    }

    #[test]
    fn second_header_in_same_model_replaces_mapping() {
        let rows = vec![
            vec![text("Модель: A")],
            vec![text("Розмір"), text("Оптова ціна")],
            vec![text("S"), RawCell::from(10.0)],
            vec![text("Роздрібна ціна"), text("Розмір")],
            vec![RawCell::from(30.0), text("M")],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].model, "A");
        assert_eq!(records[1].size, "M");
        assert_eq!(records[1].wholesale_price, None);
        assert_eq!(records[1].retail_price, Some(30.0));
    }

    #[test]
    fn two_blocks_with_distinct_promo_rules() {
        let rows = vec![
            vec![text("Прайс-лист 2024")],
            vec![],
            vec![text("Модель: \"Alpha\"")],
            vec![text("Розмір"), text("Оптова ціна"), text("Акційна оптова ціна"), text("Роздрібна ціна"), text("Акційна роздрібна ціна")],
            vec![text("S"), RawCell::from(100.0), RawCell::from(90.0), RawCell::from(150.0), text("відсутня")],
            vec![text("M"), RawCell::from(110.0), RawCell::Empty, RawCell::from(160.0), RawCell::from(140.5)],
            vec![],
            vec![text("Назва моделі Beta")],
            vec![text("Опис моделі")],
            vec![text("Розмір"), text("Оптова ціна"), text("Акційна оптова ціна, % "), text("Роздрібна ціна"), text("Акційна роздрібна ціна, % ")],
            vec![text("L"), RawCell::from(200.0), RawCell::Empty, RawCell::from(300.0), text("відсутня")],
            vec![text("XL"), RawCell::from(210.0), RawCell::from(150.0), text("-"), RawCell::Empty],
            vec![text("Всього"), text("")],
        ];
        let records = scan(rows);
        assert_eq!(records.len(), 5);

        assert_eq!(records[0].model, "Alpha");
        assert_eq!(records[0].size, "S");
        assert_eq!(records[0].wholesale_promo, Some(90.0));
        assert_eq!(records[0].retail_promo, None);

        assert_eq!(records[1].size, "M");
        assert_eq!(records[1].wholesale_promo, None);
        assert_eq!(records[1].retail_promo, Some(140.5));

        assert_eq!(records[2].model, "Beta");
        assert_eq!(records[2].size, "L");
        assert_eq!(records[2].wholesale_price, Some(200.0));
        assert_eq!(records[2].wholesale_promo, Some(140.0));
        assert_eq!(records[2].retail_price, Some(300.0));
        assert_eq!(records[2].retail_promo, None);

        assert_eq!(records[3].size, "XL");
        assert_eq!(records[3].wholesale_promo, Some(150.0));
        assert_eq!(records[3].retail_price, None);
        assert_eq!(records[3].retail_promo, None);

        assert_eq!(records[4].size, "Всього");
        assert_eq!(records[4].wholesale_price, None);
    }
}
