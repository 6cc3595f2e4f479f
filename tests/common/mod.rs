#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::fs;

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="character" w:styleId="a5"><w:name w:val="Strong"/></w:style></w:styles>"#;

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML_NS}" xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// A minimal but Word-shaped `.docx` with the given body content.
pub fn docx_bytes(body: &str) -> Vec<u8> {
    docx_bytes_with(body, &[])
}

pub fn docx_bytes_with(body: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let document = document_xml(body);
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/media/image1.png", &b"\x89PNG not really"[..]),
    ];
    for (name, xml) in extra {
        entries.push((*name, xml.as_bytes()));
    }
    zip_bytes(&entries)
}

pub fn write_docx(path: &Path, body: &str) {
    fs::write(path, docx_bytes(body)).unwrap();
}

pub fn read_entry(path: &Path, name: &str) -> Option<Vec<u8>> {
    let file = fs::File::open(path).ok()?;
    let mut zip = zip::ZipArchive::new(file).ok()?;
    let mut entry = zip.by_name(name).ok()?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data).ok()?;
    Some(data)
}

pub fn read_part(path: &Path, name: &str) -> String {
    String::from_utf8(read_entry(path, name).expect("part present")).unwrap()
}

/// Text of each `w:p` in a document part, `w:t` content only.
pub fn paragraph_texts(xml: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    doc.descendants()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(WML_NS))
        .map(|p| {
            p.descendants()
                .filter(|n| n.tag_name().name() == "t" && n.tag_name().namespace() == Some(WML_NS))
                .filter(|t| {
                    t.ancestors()
                        .find(|a| a.tag_name().name() == "p")
                        .is_some_and(|a| a == p)
                })
                .filter_map(|t| t.text())
                .collect::<String>()
        })
        .collect()
}

pub const HEADERS: [&str; 7] = [
    "产品名称", "基金账号", "证券代码", "证券名称", "金额", "份额", "基金净值",
];

fn column_letter(i: usize) -> char {
    (b'A' + i as u8) as char
}

/// A single-sheet workbook. Cells that parse as numbers are written as
/// numeric cells, everything else through the shared string table.
pub fn xlsx_bytes(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut shared: Vec<&str> = Vec::new();
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(c), r + 1);
            if value.parse::<f64>().is_ok() {
                sheet_rows.push_str(&format!(r#"<c r="{cell_ref}"><v>{value}</v></c>"#));
            } else {
                let idx = shared.len();
                shared.push(*value);
                sheet_rows.push_str(&format!(r#"<c r="{cell_ref}" t="s"><v>{idx}</v></c>"#));
            }
        }
        sheet_rows.push_str("</row>");
    }

    let sml = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    let rel = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    let workbook = format!(
        r#"<workbook xmlns="{sml}" xmlns:r="{rel}"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    );
    let workbook_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    let sheet = format!(r#"<worksheet xmlns="{sml}"><sheetData>{sheet_rows}</sheetData></worksheet>"#);
    let sst: String = shared.iter().map(|s| format!("<si><t>{s}</t></si>")).collect();
    let count = shared.len();
    let shared_strings =
        format!(r#"<sst xmlns="{sml}" count="{count}" uniqueCount="{count}">{sst}</sst>"#);

    zip_bytes(&[
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
        ("xl/sharedStrings.xml", shared_strings.as_bytes()),
    ])
}

pub fn fund_row<'a>(name: &'a str, amount: &'a str) -> Vec<&'a str> {
    vec![name, "A0001", "600000", "浦发银行", amount, "1200.5", "1.0234"]
}

pub fn write_dataset(path: &Path, rows: &[Vec<&str>]) {
    let mut all = vec![HEADERS.to_vec()];
    all.extend(rows.iter().cloned());
    fs::write(path, xlsx_bytes(&all)).unwrap();
}
