use glob::Pattern;

/// Selects which sheets of a spreadsheet are read.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name pattern; `None` accepts every sheet
    pub(crate) sheet_name_pattern: Option<Pattern>,

    /// Maximum number of sheets to read.
    pub(crate) sheet_limit: Option<usize>,
}

impl Criteria {
    /// Criteria for the `sheet` parameter: the matching sheets, or a single sheet
    /// when no pattern was given.
    pub(crate) fn for_sheet(pattern: Option<Pattern>) -> Self {
        let sheet_limit = if pattern.is_none() { Some(1) } else { None };
        Criteria {
            sheet_name_pattern: pattern,
            sheet_limit,
        }
    }

    /// Narrows the default selection to the sheet the workbook was saved on.
    /// An explicit pattern is kept as given.
    pub(crate) fn with_active_sheet(&self, active_sheet: Option<&str>) -> Criteria {
        match (&self.sheet_name_pattern, active_sheet) {
            (None, Some(name)) => Criteria {
                sheet_name_pattern: Pattern::new(&Pattern::escape(name)).ok(),
                sheet_limit: Some(1),
            },
            _ => self.clone(),
        }
    }

    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_pattern
            .as_ref()
            .map(|pattern| pattern.matches(sheet_name))
            .unwrap_or(true)
    }

    /// True once `count` sheets have been read and the limit allows no more.
    pub(crate) fn is_full(&self, count: usize) -> bool {
        self.sheet_limit.map(|limit| count >= limit).unwrap_or(false)
    }
}
