use crate::error::PriceListError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: QName = QName(b"Relationship"); // Package relationship
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_WORKBOOK_VIEW: QName = QName(b"workbookView"); // Window state, including the selected tab
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

type EntryReader<'a> = XmlReader<BufReader<ZipFile<'a, UnifiedReader>>>;

/// An Excel 2007+ workbook
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Cell kind per style index (`s` attribute of a cell)
    number_formats: Vec<CellType>,
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Sheet selected when the workbook was saved
    active_sheet: Option<String>,
}

/// Sheet list and settings from `xl/workbook.xml`
struct Workbook {
    sheets: Vec<(String, String)>,
    active_sheet: Option<String>,
    is_1904: bool,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str, reader: UnifiedReader) -> Result<XlsxSpreadsheet, PriceListError> {
        let mut zip = ZipArchive::new(reader)?;
        let Workbook { sheets, active_sheet, is_1904 } = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(
            file = file_name,
            sheets = sheets.len(),
            active_sheet = ?active_sheet,
            shared_strings = shared_strings.len(),
            "opened xlsx workbook",
        );
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            shared_strings,
            sheets,
            active_sheet,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PriceListError> {
        let criteria = criteria.with_active_sheet(self.active_sheet.as_deref());
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if criteria.is_full(sheets.len()) {
                break;
            } else if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut is_shared = false;
            let mut value = String::new();
            let mut reader = self.zip.xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                        row_count = number.saturating_sub(1);
                    }
                    col_count = 0;
                }
                Event::End(event) if event.name() == TAG_ROW => {
                    row_count += 1;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count, col_count));
                    col_count = col + 1;
                    value.clear();
                    is_shared = false;
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("inlineStr") | Some("str") => CellType::Text,
                        Some("s") => {
                            is_shared = true;
                            CellType::Text
                        }
                        Some("d") => CellType::IsoDateTime,
                        Some("b") => CellType::Boolean,
                        Some("e") => CellType::Error,
                        _ => CellType::Number,
                    };
                    if kind == CellType::Number {
                        if let Some(format_id) = event.get_attribute_value("s")?.filter(|id| !id.is_empty()) {
                            let index = format_id.parse::<usize>()?;
                            kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                        }
                    }
                }
                Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if !value.is_empty() && event.name() == TAG_CELL => {
                    if is_shared {
                        let index = value.trim().parse::<usize>()?;
                        value = self.shared_strings.get(index).cloned().unwrap_or_default();
                    }
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
            });
            sheet.finish();
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

/// Reads worksheet names and their archive paths, the active tab, and whether dates use
/// the 1904 system. An active tab naming a sheet that cannot be read is ignored.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<Workbook, PriceListError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    // Every declared sheet, since `activeTab` counts unreadable ones too
    let mut sheet_names: Vec<String> = Vec::new();
    let mut active_tab = None::<usize>;
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET.as_ref() => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            sheet_names.push(name.as_deref().unwrap_or_default().to_owned());
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if active_tab.is_none() && event.local_name().as_ref() == TAG_WORKBOOK_VIEW.as_ref() => {
            active_tab = event.parse_attribute_value("activeTab")?;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES.as_ref() => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    let active_sheet = active_tab
        .and_then(|index| sheet_names.get(index))
        .filter(|name| sheets.iter().any(|(sheet_name, _)| sheet_name == *name))
        .cloned();
    Ok(Workbook {
        sheets,
        active_sheet,
        is_1904,
    })
}

/// Maps worksheet relationship ids to archive paths.
fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, PriceListError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
    let mut relationships = HashMap::<String, String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP.as_ref() => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder
fn to_zip_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Reads the cell kind of every style index from `styles.xml`, so that date-formatted
/// numbers can be told apart from plain ones.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, is_1904: bool) -> Result<Vec<CellType>, PriceListError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        // Formats listed after cellXfs (cellStyleXfs, dxfs) do not apply to cells
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.get_attribute_value("numFmtId")?.unwrap_or_default().to_string());
        }
    });

    let number_formats = format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect();
    Ok(number_formats)
}

/// Loads the whole shared string table
fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, PriceListError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Collects the text up to `end_tag`, skipping phonetic runs.
/// With `is_text_content` the element's own text counts; otherwise only `<t>` children do.
fn read_string_value(reader: &mut EntryReader<'_>, end_tag: QName, is_text_content: bool) -> Result<String, PriceListError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pricelist::row::RawCell;
    use crate::pricelist::row::RawRow;
    use crate::spreadsheet::tests::zip_bytes;
    use glob::Pattern;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookPr/>
<sheets>
<sheet name="Опис" sheetId="1" r:id="rId1"/>
<sheet name="Прайс" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="dd.mm.yyyy"/></numFmts>
<cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="2"/></cellXfs>
</styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="8" uniqueCount="8">
<si><t>Модель: "Alpha"</t></si>
<si><t>Розмір</t></si>
<si><r><t>Оптова </t></r><r><t>ціна</t></r></si>
<si><t>Акційна оптова ціна, % </t></si>
<si><t>S</t></si>
<si><t>M</t><rPh><t>ignored</t></rPh></si>
<si><t>відсутня</t></si>
<si><t>Прайс &amp; опис</t></si>
</sst>"#;

    const DESCRIPTION_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>7</v></c></row>
</sheetData></worksheet>"#;

    const PRICE_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Прайс-лист</t></is></c><c r="C1" s="1"><v>45292</v></c></row>
<row r="3"><c r="A3" t="s"><v>0</v></c></row>
<row r="4"><c r="A4" t="s"><v>1</v></c><c r="B4" t="s"><v>2</v></c><c r="C4" t="s"><v>3</v></c></row>
<row r="5"><c r="A5" t="s"><v>4</v></c><c r="B5" s="2"><v>100</v></c><c r="C5"/></row>
<row r="6"><c t="s"><v>5</v></c><c><v>120.5</v></c><c t="s"><v>6</v></c></row>
<row r="7"><c r="A7" t="b"><v>1</v></c><c r="B7" t="e"><v>#N/A</v></c></row>
</sheetData></worksheet>"#;

    /// An in-memory workbook with a description sheet and a price sheet.
    pub(crate) fn price_list_xlsx() -> Vec<u8> {
        workbook_with(WORKBOOK)
    }

    fn workbook_with(workbook: &str) -> Vec<u8> {
        zip_bytes(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", DESCRIPTION_SHEET),
            ("xl/worksheets/sheet2.xml", PRICE_SHEET),
        ])
    }

    fn open() -> XlsxSpreadsheet {
        XlsxSpreadsheet::open("memory.xlsx", UnifiedReader::from_bytes(price_list_xlsx())).unwrap()
    }

    #[test]
    fn workbook_structure() {
        let spreadsheet = open();
        assert_eq!(spreadsheet.name(), "memory.xlsx");
        assert_eq!(
            spreadsheet.sheets,
            vec![
                ("Опис".to_owned(), "xl/worksheets/sheet1.xml".to_owned()),
                ("Прайс".to_owned(), "xl/worksheets/sheet2.xml".to_owned()),
            ]
        );
        assert_eq!(
            spreadsheet.number_formats,
            vec![CellType::Number, CellType::NumberDate1900, CellType::Number]
        );
        assert_eq!(spreadsheet.shared_strings[2], "Оптова ціна");
        assert_eq!(spreadsheet.shared_strings[5], "M");
        assert_eq!(spreadsheet.shared_strings[7], "Прайс & опис");
    }

    #[test]
    fn first_sheet_by_default() {
        let sheets = open().read_sheets(&Criteria::for_sheet(None)).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Опис");
        let rows: Vec<RawRow> = sheets[0].rows().collect();
        assert_eq!(rows, vec![vec![RawCell::from("Прайс & опис")]]);
    }

    #[test]
    fn active_tab_by_default() {
        let workbook = WORKBOOK.replace("<workbookPr/>", r#"<workbookPr/><bookViews><workbookView activeTab="1"/></bookViews>"#);
        let mut spreadsheet = XlsxSpreadsheet::open("active.xlsx", UnifiedReader::from_bytes(workbook_with(&workbook))).unwrap();
        assert_eq!(spreadsheet.active_sheet.as_deref(), Some("Прайс"));

        let sheets = spreadsheet.read_sheets(&Criteria::for_sheet(None)).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Прайс");

        let criteria = Criteria::for_sheet(Some(Pattern::new("Опис").unwrap()));
        let sheets = spreadsheet.read_sheets(&criteria).unwrap();
        assert_eq!(sheets[0].name, "Опис");
    }

    #[test]
    fn active_tab_out_of_range_reads_first_sheet() {
        let workbook = WORKBOOK.replace("<workbookPr/>", r#"<workbookPr/><bookViews><workbookView activeTab="5"/></bookViews>"#);
        let mut spreadsheet = XlsxSpreadsheet::open("stale.xlsx", UnifiedReader::from_bytes(workbook_with(&workbook))).unwrap();
        assert_eq!(spreadsheet.active_sheet, None);
        let sheets = spreadsheet.read_sheets(&Criteria::for_sheet(None)).unwrap();
        assert_eq!(sheets[0].name, "Опис");
    }

    #[test]
    fn sheet_cells_to_rows() {
        let criteria = Criteria::for_sheet(Some(Pattern::new("Прайс").unwrap()));
        let sheets = open().read_sheets(&criteria).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].file_name, "memory.xlsx");

        let rows: Vec<RawRow> = sheets[0].rows().collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], vec![RawCell::from("Прайс-лист"), RawCell::Empty, RawCell::Temporal("2024-01-01".to_owned())]);
        assert!(rows[1].iter().all(RawCell::is_blank));
        assert_eq!(rows[2][0], RawCell::from("Модель: \"Alpha\""));
        assert_eq!(rows[3][2], RawCell::from("Акційна оптова ціна, % "));
        assert_eq!(rows[4], vec![RawCell::from("S"), RawCell::Number(100.0), RawCell::Empty]);
        assert_eq!(rows[5], vec![RawCell::from("M"), RawCell::Number(120.5), RawCell::from("відсутня")]);
        assert_eq!(rows[6], vec![RawCell::Number(1.0), RawCell::from("#N/A"), RawCell::Empty]);
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let bytes = zip_bytes(&[("xl/_rels/workbook.xml.rels", RELATIONSHIPS)]);
        let error = XlsxSpreadsheet::open("broken.xlsx", UnifiedReader::from_bytes(bytes)).err().unwrap();
        assert!(error.to_string().contains("xl/workbook.xml"));
    }

    #[test]
    fn relationship_targets() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
