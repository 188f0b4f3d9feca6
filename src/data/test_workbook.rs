//! Test Workbook Builder
//! Assembles minimal xlsx packages in memory (direct ZIP/XML generation) for loader tests.

use crate::data::loader::{LoaderError, SourceFetcher};
pub use crate::data::loader::{JOIN_KEY, LAT_LONG_SHEET, MEASUREMENT_SHEET};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// One worksheet cell.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    pub fn number(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Serves fixed bytes or a fixed HTTP status instead of touching the network.
pub enum FixtureFetcher {
    Bytes(Vec<u8>),
    Status(u16),
}

impl SourceFetcher for FixtureFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, LoaderError> {
        match self {
            FixtureFetcher::Bytes(bytes) => Ok(bytes.clone()),
            FixtureFetcher::Status(code) => Err(LoaderError::Status(*code)),
        }
    }
}

#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<(String, Vec<Vec<Cell>>)>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str, rows: Vec<Vec<Cell>>) -> Self {
        self.sheets.push((name.to_string(), rows));
        self
    }

    /// One school present in both sheets.
    pub fn single_school_fixture() -> Vec<u8> {
        Self::new()
            .sheet(
                LAT_LONG_SHEET,
                vec![
                    vec![Cell::text(JOIN_KEY), Cell::text("latitude"), Cell::text("longitude")],
                    vec![Cell::number(1.0), Cell::number(13.1), Cell::number(-59.6)],
                ],
            )
            .sheet(
                MEASUREMENT_SHEET,
                vec![
                    vec![
                        Cell::text(JOIN_KEY),
                        Cell::text("download_speed"),
                        Cell::text("upload_speed"),
                        Cell::text("latency"),
                    ],
                    vec![
                        Cell::number(1.0),
                        Cell::number(10.0),
                        Cell::number(2.0),
                        Cell::number(50.0),
                    ],
                ],
            )
            .build()
    }

    /// Two sheets whose identifiers never overlap.
    pub fn disjoint_fixture() -> Vec<u8> {
        Self::new()
            .sheet(
                LAT_LONG_SHEET,
                vec![
                    vec![Cell::text(JOIN_KEY), Cell::text("latitude"), Cell::text("longitude")],
                    vec![Cell::number(1.0), Cell::number(13.1), Cell::number(-59.6)],
                ],
            )
            .sheet(
                MEASUREMENT_SHEET,
                vec![
                    vec![
                        Cell::text(JOIN_KEY),
                        Cell::text("download_speed"),
                        Cell::text("upload_speed"),
                        Cell::text("latency"),
                    ],
                    vec![
                        Cell::number(2.0),
                        Cell::number(10.0),
                        Cell::number(2.0),
                        Cell::number(50.0),
                    ],
                ],
            )
            .build()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let parts = [
            ("[Content_Types].xml".to_string(), self.content_types_xml()),
            ("_rels/.rels".to_string(), Self::rels_xml()),
            ("xl/workbook.xml".to_string(), self.workbook_xml()),
            ("xl/_rels/workbook.xml.rels".to_string(), self.workbook_rels_xml()),
        ];
        for (name, body) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }

        for (idx, (_, rows)) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)
                .unwrap();
            zip.write_all(Self::sheet_xml(rows).as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn content_types_xml(&self) -> String {
        let overrides: String = (1..=self.sheets.len())
            .map(|i| {
                format!(
                    r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                    i
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{}</Types>"#,
            overrides
        )
    }

    fn rels_xml() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            .to_string()
    }

    fn workbook_xml(&self) -> String {
        let sheets: String = self
            .sheets
            .iter()
            .enumerate()
            .map(|(idx, (name, _))| {
                format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                    escape_xml(name),
                    idx + 1,
                    idx + 1
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
            sheets
        )
    }

    fn workbook_rels_xml(&self) -> String {
        let rels: String = (1..=self.sheets.len())
            .map(|i| {
                format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                    i, i
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        )
    }

    fn sheet_xml(rows: &[Vec<Cell>]) -> String {
        let mut body = String::new();
        for (r, row) in rows.iter().enumerate() {
            body.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_letter(c), r + 1);
                match cell {
                    Cell::Text(s) => body.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        reference,
                        escape_xml(s)
                    )),
                    Cell::Number(v) => {
                        body.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, v))
                    }
                    Cell::Empty => {}
                }
            }
            body.push_str("</row>");
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            body
        )
    }
}

fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
