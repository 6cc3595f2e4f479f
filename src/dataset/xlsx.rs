//! Minimal SpreadsheetML reader: the first worksheet of a workbook, every
//! cell as a string.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::Error;

const SML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Columns A..=XFD.
const MAX_COLUMNS: usize = 16_384;

fn sml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

fn sml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children()
        .filter(move |n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

fn read_zip_text(zip: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Concatenated text of a `<si>` or `<is>` element: plain `<t>` or rich-text
/// runs, skipping phonetic hints.
fn string_item_text(node: roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| n.tag_name().name() == "t" && n.tag_name().namespace() == Some(SML_NS))
        .filter(|n| !n.ancestors().any(|a| a.tag_name().name() == "rPh"))
        .filter_map(|n| n.text())
        .collect()
}

fn parse_shared_strings(zip: &mut zip::ZipArchive<std::fs::File>) -> Result<Vec<String>, Error> {
    let Some(xml_content) = read_zip_text(zip, "xl/sharedStrings.xml") else {
        return Ok(Vec::new());
    };
    let xml = roxmltree::Document::parse(&xml_content)?;
    Ok(sml_children(xml.root_element(), "si")
        .map(string_item_text)
        .collect())
}

/// Resolve the zip path of the first `<sheet>` listed in the workbook.
fn first_sheet_path(zip: &mut zip::ZipArchive<std::fs::File>) -> Result<String, Error> {
    const FALLBACK: &str = "xl/worksheets/sheet1.xml";

    let workbook = read_zip_text(zip, "xl/workbook.xml")
        .ok_or_else(|| Error::InvalidDataset("missing xl/workbook.xml".into()))?;
    let xml = roxmltree::Document::parse(&workbook)?;
    let rel_id = sml(xml.root_element(), "sheets")
        .and_then(|sheets| sml_children(sheets, "sheet").next())
        .and_then(|sheet| sheet.attribute((REL_NS, "id")))
        .map(str::to_string);
    let Some(rel_id) = rel_id else {
        log::warn!("Workbook lists no sheets, trying {FALLBACK}");
        return Ok(FALLBACK.to_string());
    };

    let Some(rels_content) = read_zip_text(zip, "xl/_rels/workbook.xml.rels") else {
        return Ok(FALLBACK.to_string());
    };
    let rels = roxmltree::Document::parse(&rels_content)?;
    let target = rels
        .root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .find(|n| n.attribute("Id") == Some(rel_id.as_str()))
        .and_then(|n| n.attribute("Target"));

    Ok(match target {
        Some(t) => t
            .strip_prefix('/')
            .map(String::from)
            .unwrap_or_else(|| format!("xl/{t}")),
        None => FALLBACK.to_string(),
    })
}

/// Zero-based column index of a cell reference like `AB12`. `None` when the
/// reference has no letters or the index does not fit a `usize`.
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: Vec<u8> = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for b in letters {
        col = col
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A' + 1) as usize)?;
    }
    Some(col - 1)
}

fn cell_value(cell: roxmltree::Node, shared: &[String]) -> Result<String, Error> {
    let raw = sml(cell, "v").and_then(|v| v.text()).unwrap_or("");
    Ok(match cell.attribute("t") {
        Some("s") => {
            let idx: usize = raw.trim().parse().map_err(|_| {
                Error::InvalidDataset(format!("bad shared string index {raw:?}"))
            })?;
            shared.get(idx).cloned().ok_or_else(|| {
                Error::InvalidDataset(format!("shared string {idx} out of range"))
            })?
        }
        Some("inlineStr") => sml(cell, "is").map(string_item_text).unwrap_or_default(),
        Some("b") => match raw {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        _ => raw.to_string(),
    })
}

pub(super) fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>, Error> {
    let file = std::fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|_| Error::InvalidDataset(format!("{} is not a ZIP archive", path.display())))?;

    let shared = parse_shared_strings(&mut zip)?;
    let sheet_path = first_sheet_path(&mut zip)?;
    log::debug!("Reading worksheet {sheet_path}");
    let sheet_content = read_zip_text(&mut zip, &sheet_path)
        .ok_or_else(|| Error::InvalidDataset(format!("missing worksheet {sheet_path}")))?;
    let xml = roxmltree::Document::parse(&sheet_content)?;

    let Some(sheet_data) = sml(xml.root_element(), "sheetData") else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for row in sml_children(sheet_data, "row") {
        let mut cells: HashMap<usize, String> = HashMap::new();
        let mut next_col = 0usize;
        for cell in sml_children(row, "c") {
            let col = match cell.attribute("r") {
                Some(cell_ref) => column_index(cell_ref)
                    .filter(|c| *c < MAX_COLUMNS)
                    .ok_or_else(|| {
                        Error::InvalidDataset(format!("bad cell reference {cell_ref:?}"))
                    })?,
                None => next_col,
            };
            cells.insert(col, cell_value(cell, &shared)?);
            next_col = col + 1;
        }
        let width = cells.keys().max().map_or(0, |m| m + 1);
        let values: Vec<String> = (0..width)
            .map(|c| cells.remove(&c).unwrap_or_default())
            .collect();
        if values.iter().all(|v| v.is_empty()) && rows.is_empty() {
            continue;
        }
        rows.push(values);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("G7"), Some(6));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1048576"), Some(16383));
    }

    #[test]
    fn oversized_column_reference_is_rejected() {
        let cell_ref = format!("{}1", "A".repeat(52));
        assert_eq!(column_index(&cell_ref), None);
    }

    #[test]
    fn rich_text_shared_string_is_concatenated() {
        let xml = format!(
            r#"<sst xmlns="{SML_NS}"><si><r><t>Fund</t></r><r><t>X</t></r><rPh><t>ふ</t></rPh></si></sst>"#
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let si = doc.root_element().first_element_child().unwrap();
        assert_eq!(string_item_text(si), "FundX");
    }
}
