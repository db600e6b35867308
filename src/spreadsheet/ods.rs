use crate::error::PriceListError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cell hidden under a merged cell
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// Cell comment, not part of the value
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of `text:c` spaces
const SPACES: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");
const FILE_ENTRY: QName = QName(b"manifest:file-entry");
const ENCRYPTION_DATA: QName = QName(b"manifest:encryption-data");
const CONFIG_ITEM: QName = QName(b"config:config-item");
/// Sheet size limits; repeat counts beyond them are filler
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

#[derive(Error, Debug)]
pub(crate) enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// An OpenDocument spreadsheet
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Table selected when the document was saved
    active_sheet: Option<String>,
}

impl OdsSpreadsheet {
    pub(crate) fn open(file_name: &str, reader: UnifiedReader) -> Result<Self, PriceListError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        let active_sheet = load_active_table(&mut zip)?;
        debug!(file = file_name, active_sheet = ?active_sheet, "opened ods spreadsheet");
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
            active_sheet,
        })
    }

    /// Walks `content.xml` once. Repeated rows and columns are expanded for non-empty
    /// cells only, so the trailing filler most writers emit costs nothing.
    fn read_content(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PriceListError> {
        let mut sheets = Vec::<Sheet>::new();
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;

        let mut sheet = None::<Sheet>;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut in_text = false;
        let mut in_annotation = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                let name = event.get_attribute_value("table:name")?.unwrap_or_default();
                sheet = criteria.accept(&name).then(|| Sheet::new(&self.name, &name));
                row = 0;
            }
            Event::End(event) if event.name() == TABLE => {
                if let Some(mut finished) = sheet.take() {
                    finished.finish();
                    sheets.push(finished);
                    if criteria.is_full(sheets.len()) {
                        break;
                    }
                }
            }
            Event::Start(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row = row.saturating_add(row_count);
            }
            Event::Start(event) if sheet.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                in_text = false;
                col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.get_attribute_value("office:value-type")?;
                kind = match value_type.as_deref() {
                    None => CellType::Empty,
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => {
                        let is_error = event.get_attribute_value("calcext:value-type")?
                            .map(|calculated| calculated == "error")
                            .unwrap_or(false);
                        if is_error { CellType::Error } else { CellType::Text }
                    }
                    // float, percentage, currency
                    Some(_) => CellType::Number,
                };
                match kind {
                    CellType::Text | CellType::Error => in_text = true,
                    CellType::Boolean => {
                        let is_true = event.get_attribute_value("office:boolean-value")?
                            .map(|flag| flag != "false" && flag != "0")
                            .unwrap_or(false);
                        value.push(if is_true { '1' } else { '0' });
                    }
                    CellType::IsoDateTime => value.push_str(&event.get_attribute_value("office:date-value")?.unwrap_or_default()),
                    CellType::IsoDuration => value.push_str(&event.get_attribute_value("office:time-value")?.unwrap_or_default()),
                    CellType::Number => value.push_str(&event.get_attribute_value("office:value")?.unwrap_or_default()),
                    _ => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if let Some(current) = sheet.as_mut().filter(|_| kind != CellType::Empty && !value.is_empty()) {
                    let row_end = row.saturating_add(row_count).min(MAX_ROWS);
                    let col_end = col.saturating_add(col_count).min(MAX_COLS);
                    for row_number in row..row_end {
                        for col_number in col..col_end {
                            current.push(Cell {
                                row: row_number,
                                col: col_number,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col = col.saturating_add(col_count);
                kind = CellType::Empty;
                in_text = false;
                in_annotation = false;
            }
            Event::Start(event) if in_text && event.name() == ANNOTATION => in_annotation = true,
            Event::End(event) if in_text && event.name() == ANNOTATION => in_annotation = false,
            Event::Start(event) if in_text && !in_annotation && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if in_text && !in_annotation && event.name() == SPACES => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1usize);
                value.extend(std::iter::repeat_n(' ', count));
            }
            Event::Start(event) if in_text && !in_annotation && event.name() == TAB => value.push('\t'),
            Event::Start(event) if in_text && !in_annotation && event.name() == LINE_BREAK => value.push('\n'),
            Event::Text(event) if in_text && !in_annotation => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if in_text && !in_annotation => value.push_bytes_ref(&event)?,
        });
        Ok(sheets)
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// Without a pattern the active table is read. A stale active table name falls back
    /// to the first table.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PriceListError> {
        let active = criteria.with_active_sheet(self.active_sheet.as_deref());
        let sheets = self.read_content(&active)?;
        if sheets.is_empty() && self.active_sheet.is_some() && criteria.sheet_name_pattern.is_none() {
            return self.read_content(criteria);
        }
        Ok(sheets)
    }
}

/// Name in the first `ActiveTable` view setting of `settings.xml`
fn load_active_table(zip: &mut ZipArchive<UnifiedReader>) -> Result<Option<String>, PriceListError> {
    let mut reader = match zip.xml_reader("settings.xml")? {
        Some(reader) => reader,
        None => return Ok(None),
    };
    let mut active_table = None::<String>;
    match_xml_events!(reader => {
        Event::Start(event) if active_table.is_none() && event.name() == CONFIG_ITEM => {
            if event.get_attribute_value("config:name")?.as_deref() == Some("ActiveTable") {
                active_table = Some(String::new());
            }
        }
        Event::End(event) if active_table.is_some() && event.name() == CONFIG_ITEM => break,
        Event::Text(event) => {
            if let Some(name) = active_table.as_mut() {
                name.push_bytes_text(&event)?;
            }
        }
        Event::GeneralRef(event) => {
            if let Some(name) = active_table.as_mut() {
                name.push_bytes_ref(&event)?;
            }
        }
    });
    Ok(active_table.filter(|name| !name.is_empty()))
}

/// Rejects archives whose `mimetype` entry names another document type
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), PriceListError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Encrypted entries are declared in the manifest
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, PriceListError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == FILE_ENTRY => in_file_entry = true,
        Event::End(event) if event.name() == FILE_ENTRY => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == ENCRYPTION_DATA => return Ok(true),
    });
    Ok(false)
}
