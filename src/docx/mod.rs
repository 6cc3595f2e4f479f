mod styles;

use std::io::{Cursor, Read, Seek, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::engine::{RichTextContainer, substitute};
use crate::error::Error;
use crate::model::{Run, RunFonts, RunProperties};
use crate::replacements::ReplacementMap;

pub use styles::{StyleDefinition, StyleKind, StyleSnapshot};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// Element order of `w:pPr` children (CT_PPr).
const PPR_ORDER: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(super) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn ppr_rank(node: roxmltree::Node) -> usize {
    if node.tag_name().namespace() != Some(WML_NS) {
        return PPR_ORDER.len();
    }
    PPR_ORDER
        .iter()
        .position(|n| *n == node.tag_name().name())
        .unwrap_or(PPR_ORDER.len())
}

// ─── Package I/O ────────────────────────────────────────────────────────────

/// A `.docx` zip held in memory as ordered `(entry name, bytes)` pairs so it
/// can be written back with every untouched entry byte-for-byte intact.
#[derive(Clone, Debug)]
pub struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| Error::template_load(path, e))?;
        Self::read(file, path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::read(Cursor::new(bytes), Path::new("<memory>"))
    }

    fn read<R: Read + Seek>(reader: R, path: &Path) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(reader)
            .map_err(|_| Error::template_load(path, "file is not a ZIP archive"))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| Error::template_load(path, e))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| Error::template_load(path, e))?;
            entries.push((name, data));
        }
        Ok(Package { entries })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    /// Media entries are stored, everything else deflated, matching what Word
    /// itself writes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in &self.entries {
            let opts = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

// ─── Paragraph containers ───────────────────────────────────────────────────

/// Where a paragraph sits, decided by its nearest enclosing text box or
/// table cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParagraphKind {
    Body,
    TableCell,
    TextBox,
}

fn classify(p: roxmltree::Node) -> ParagraphKind {
    for ancestor in p.ancestors().skip(1) {
        if ancestor.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match ancestor.tag_name().name() {
            "txbxContent" => return ParagraphKind::TextBox,
            "tc" => return ParagraphKind::TableCell,
            _ => {}
        }
    }
    ParagraphKind::Body
}

fn parse_run_properties(rpr: roxmltree::Node, xml: &str) -> RunProperties {
    let mut props = RunProperties::default();
    for child in rpr.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        if child.tag_name().namespace() != Some(WML_NS) {
            props.push_raw(&format!("ext:{name}"), &xml[child.range()]);
            continue;
        }
        let val = child.attribute((WML_NS, "val"));
        match name {
            "rStyle" if val.is_some() => props.style = val.map(str::to_string),
            "rFonts" => {
                let mut fonts = RunFonts::default();
                for attr in child.attributes() {
                    if attr.namespace() == Some(WML_NS) {
                        fonts.set(attr.name(), attr.value());
                    }
                }
                props.fonts = Some(fonts);
            }
            "sz" if val.and_then(|v| v.parse::<u32>().ok()).is_some() => {
                props.size = val.and_then(|v| v.parse().ok());
            }
            "szCs" if val.and_then(|v| v.parse::<u32>().ok()).is_some() => {
                props.complex_size = val.and_then(|v| v.parse().ok());
            }
            _ => props.push_raw(name, &xml[child.range()]),
        }
    }
    props
}

/// Read a `w:r` as plain text. Runs carrying anything other than text, tabs
/// and line breaks (drawings, fields, notes, page breaks) are opaque and
/// yield `None`; they are never rewritten.
fn parse_text_run(node: roxmltree::Node, xml: &str) -> Option<Run> {
    let mut run = Run::default();
    for child in node.children() {
        if child.is_text() {
            if child.text().is_some_and(|t| t.trim().is_empty()) {
                continue;
            }
            return None;
        }
        if !child.is_element() {
            continue;
        }
        if child.tag_name().namespace() != Some(WML_NS) {
            return None;
        }
        match child.tag_name().name() {
            "rPr" => run.properties = parse_run_properties(child, xml),
            "t" => run.text.push_str(child.text().unwrap_or("")),
            "tab" => run.text.push('\t'),
            "br" if child
                .attribute((WML_NS, "type"))
                .is_none_or(|t| t == "textWrapping") =>
            {
                run.text.push('\n')
            }
            "cr" => run.text.push('\n'),
            "lastRenderedPageBreak" => {}
            _ => return None,
        }
    }
    Some(run)
}

/// Text runs of one paragraph together with the byte range each occupies in
/// the part's XML.
#[derive(Debug, Default)]
struct ParagraphRuns {
    slots: Vec<Range<usize>>,
    original: Vec<Run>,
    runs: Vec<Run>,
}

impl ParagraphRuns {
    fn from_nodes<'a>(nodes: impl IntoIterator<Item = roxmltree::Node<'a, 'a>>, xml: &str) -> Self {
        let mut out = ParagraphRuns::default();
        for node in nodes {
            let Some(run) = parse_text_run(node, xml) else {
                let own_text_has_marker = node.descendants().any(|t| {
                    is_wml(t, "t")
                        && t.ancestors().find(|a| is_wml(*a, "r")) == Some(node)
                        && t.text().is_some_and(|s| s.contains('$'))
                });
                if own_text_has_marker {
                    log::warn!(
                        "Run at byte {} mixes text with embedded content; its text is not searched",
                        node.range().start
                    );
                } else {
                    log::debug!("Leaving non-text run at byte {} untouched", node.range().start);
                }
                continue;
            };
            out.slots.push(node.range());
            out.original.push(run.clone());
            out.runs.push(run);
        }
        out
    }

    /// Splices turning the original runs into the current ones. Each rebuilt
    /// run replaces the original run it was carved from; originals with no
    /// descendant are removed and unchanged ones are left alone.
    fn edits(&self, prefix: &str) -> Result<Vec<Edit>, Error> {
        if self.slots.is_empty() {
            return Ok(Vec::new());
        }
        let mut grouped: Vec<Vec<&Run>> = vec![Vec::new(); self.slots.len()];
        let mut slot = 0;
        for run in &self.runs {
            if let Some(origin) = run.origin() {
                if origin < slot || origin >= self.slots.len() {
                    return Err(Error::ContainerConsistency(format!(
                        "run origin {origin} out of order after slot {slot}"
                    )));
                }
                slot = origin;
            }
            grouped[slot].push(run);
        }

        let mut edits = Vec::new();
        for (i, group) in grouped.iter().enumerate() {
            let unchanged = match group.as_slice() {
                [only] => {
                    only.text == self.original[i].text
                        && only.properties == self.original[i].properties
                }
                _ => false,
            };
            if unchanged {
                continue;
            }
            let replacement: String = group.iter().map(|r| r.to_xml(prefix)).collect();
            edits.push(Edit::replace(self.slots[i].clone(), replacement));
        }
        Ok(edits)
    }
}

trait XmlBacked: RichTextContainer {
    fn paragraph_runs(&self) -> &ParagraphRuns;
}

/// A body or table-cell paragraph. Runs are its direct `w:r` children plus
/// those wrapped in hyperlinks, smart tags, insertions, simple fields and
/// content controls.
struct NativeParagraph {
    inner: ParagraphRuns,
}

impl NativeParagraph {
    fn new(p: roxmltree::Node, xml: &str) -> Self {
        fn collect_run_nodes<'a>(
            parent: roxmltree::Node<'a, 'a>,
            out: &mut Vec<roxmltree::Node<'a, 'a>>,
        ) {
            for child in parent.children() {
                if child.tag_name().namespace() != Some(WML_NS) {
                    continue;
                }
                match child.tag_name().name() {
                    "r" => out.push(child),
                    "hyperlink" | "smartTag" | "ins" | "customXml" | "fldSimple" => {
                        collect_run_nodes(child, out)
                    }
                    "sdt" => {
                        if let Some(content) = wml(child, "sdtContent") {
                            collect_run_nodes(content, out);
                        }
                    }
                    _ => {}
                }
            }
        }
        let mut nodes = Vec::new();
        collect_run_nodes(p, &mut nodes);
        NativeParagraph {
            inner: ParagraphRuns::from_nodes(nodes, xml),
        }
    }
}

/// A paragraph inside a text box (`w:txbxContent`, either DrawingML or VML).
/// Runs are every `w:r` below the paragraph that does not belong to a nested
/// paragraph.
struct TextBoxParagraph {
    inner: ParagraphRuns,
}

impl TextBoxParagraph {
    fn new(p: roxmltree::Node, xml: &str) -> Self {
        let nodes = p.descendants().filter(|n| {
            is_wml(*n, "r") && n.ancestors().skip(1).find(|a| is_wml(*a, "p")) == Some(p)
        });
        TextBoxParagraph {
            inner: ParagraphRuns::from_nodes(nodes, xml),
        }
    }
}

macro_rules! impl_container {
    ($ty:ty) => {
        impl RichTextContainer for $ty {
            fn runs(&self) -> &[Run] {
                &self.inner.runs
            }

            fn replace_runs(&mut self, runs: Vec<Run>) {
                self.inner.runs = runs;
            }
        }

        impl XmlBacked for $ty {
            fn paragraph_runs(&self) -> &ParagraphRuns {
                &self.inner
            }
        }
    };
}

impl_container!(NativeParagraph);
impl_container!(TextBoxParagraph);

// ─── XML splicing ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl Edit {
    fn replace(range: Range<usize>, replacement: String) -> Self {
        Edit { range, replacement }
    }

    fn insert(at: usize, replacement: String) -> Self {
        Edit {
            range: at..at,
            replacement,
        }
    }
}

fn apply_edits(xml: &str, mut edits: Vec<Edit>) -> Result<String, Error> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(xml.len() + edits.len() * 64);
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            return Err(Error::ContainerConsistency(format!(
                "overlapping edits at byte {}",
                edit.range.start
            )));
        }
        out.push_str(&xml[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&xml[cursor..]);
    Ok(out)
}

/// Add `child_xml` as the last child of `node`, expanding `<x/>` if needed.
fn append_child(node: roxmltree::Node, xml: &str, child_xml: &str) -> Edit {
    let range = node.range();
    let source = &xml[range.clone()];
    if source.ends_with("/>") {
        let open = source[..source.len() - 2].trim_end();
        let qname = source[1..]
            .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .next()
            .unwrap_or_default();
        return Edit::replace(range, format!("{open}>{child_xml}</{qname}>"));
    }
    let close = source.rfind("</").unwrap_or(source.len());
    Edit::insert(range.start + close, child_xml.to_string())
}

/// Force `<w:jc w:val="left"/>` on a paragraph. Table-cell paragraphs are
/// always left-aligned in the output.
fn left_alignment_edit(p: roxmltree::Node, xml: &str, prefix: &str) -> Option<Edit> {
    let jc = format!("<{prefix}:jc {prefix}:val=\"left\"/>");
    let Some(ppr) = wml(p, "pPr") else {
        let ppr_xml = format!("<{prefix}:pPr>{jc}</{prefix}:pPr>");
        return Some(match p.first_element_child() {
            Some(first) => Edit::insert(first.range().start, ppr_xml),
            None => append_child(p, xml, &ppr_xml),
        });
    };
    if let Some(existing) = wml(ppr, "jc") {
        if existing.attribute((WML_NS, "val")) == Some("left") {
            return None;
        }
        return Some(Edit::replace(existing.range(), jc));
    }
    let jc_rank = PPR_ORDER.iter().position(|n| *n == "jc").unwrap_or(0);
    match ppr
        .children()
        .filter(|n| n.is_element())
        .find(|n| ppr_rank(*n) > jc_rank)
    {
        Some(next) => Some(Edit::insert(next.range().start, jc)),
        None => Some(append_child(ppr, xml, &jc)),
    }
}

// ─── Document ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FillReport {
    pub parts: usize,
    pub paragraphs: usize,
    pub replaced: usize,
    pub aligned_cells: usize,
}

impl FillReport {
    fn absorb(&mut self, other: FillReport) {
        self.parts += other.parts;
        self.paragraphs += other.paragraphs;
        self.replaced += other.replaced;
        self.aligned_cells += other.aligned_cells;
    }
}

fn wml_prefix<'a>(root: roxmltree::Node<'a, 'a>, part: &str) -> Result<&'a str, Error> {
    match root.lookup_prefix(WML_NS) {
        Some(prefix) if !prefix.is_empty() => Ok(prefix),
        _ => Err(Error::template_load(
            part,
            "WordprocessingML namespace is not bound to a prefix",
        )),
    }
}

fn fill_container<C: XmlBacked>(
    container: &mut C,
    replacements: &ReplacementMap,
    styles: &StyleSnapshot,
    prefix: &str,
    report: &mut FillReport,
) -> Result<Vec<Edit>, Error> {
    let outcome = substitute(container, replacements, styles)?;
    report.replaced += outcome.replaced;
    if !outcome.changed() {
        return Ok(Vec::new());
    }
    container.paragraph_runs().edits(prefix)
}

/// Substitute placeholders in every paragraph of one story part. Returns the
/// rewritten XML, or `None` when nothing changed.
fn fill_part(
    part: &str,
    xml_content: &str,
    replacements: &ReplacementMap,
    styles: &StyleSnapshot,
) -> Result<(Option<String>, FillReport), Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    let prefix = wml_prefix(xml.root_element(), part)?;

    let mut report = FillReport {
        parts: 1,
        ..Default::default()
    };
    let mut edits = Vec::new();

    for p in xml.descendants().filter(|n| is_wml(*n, "p")) {
        report.paragraphs += 1;
        let kind = classify(p);
        if kind == ParagraphKind::TableCell
            && let Some(edit) = left_alignment_edit(p, xml_content, prefix)
        {
            edits.push(edit);
            report.aligned_cells += 1;
        }
        let paragraph_edits = match kind {
            ParagraphKind::TextBox => {
                log::debug!("Processing text box paragraph at byte {}", p.range().start);
                let mut container = TextBoxParagraph::new(p, xml_content);
                fill_container(&mut container, replacements, styles, prefix, &mut report)?
            }
            ParagraphKind::Body | ParagraphKind::TableCell => {
                let mut container = NativeParagraph::new(p, xml_content);
                fill_container(&mut container, replacements, styles, prefix, &mut report)?
            }
        };
        edits.extend(paragraph_edits);
    }

    if edits.is_empty() {
        return Ok((None, report));
    }
    Ok((Some(apply_edits(xml_content, edits)?), report))
}

/// Text of every paragraph in a part, as the substitution engine sees it.
fn part_paragraph_texts(xml_content: &str) -> Result<Vec<String>, Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    Ok(xml
        .descendants()
        .filter(|n| is_wml(*n, "p"))
        .map(|p| match classify(p) {
            ParagraphKind::TextBox => TextBoxParagraph::new(p, xml_content).text(),
            _ => NativeParagraph::new(p, xml_content).text(),
        })
        .collect())
}

/// A template loaded for filling: the package plus the style snapshot
/// captured before any substitution.
#[derive(Clone, Debug)]
pub struct TemplateDocument {
    path: PathBuf,
    package: Package,
    styles: StyleSnapshot,
}

impl TemplateDocument {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let package = Package::open(path)?;
        Self::from_package(package, path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_package(Package::from_bytes(bytes)?, Path::new("<memory>"))
    }

    fn from_package(package: Package, path: &Path) -> Result<Self, Error> {
        if package.part(DOCUMENT_PART).is_none() {
            return Err(Error::template_load(
                path,
                "missing word/document.xml (is this a DOCX file?)",
            ));
        }
        let styles = match package.part(STYLES_PART) {
            Some(bytes) => StyleSnapshot::parse(&decode_part(path, STYLES_PART, bytes)?)?,
            None => StyleSnapshot::default(),
        };
        Ok(TemplateDocument {
            path: path.to_path_buf(),
            package,
            styles,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn styles(&self) -> &StyleSnapshot {
        &self.styles
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// The main document part followed by headers and footers.
    pub fn story_parts(&self) -> Vec<String> {
        let mut extra: Vec<String> = self
            .package
            .part_names()
            .filter(|n| {
                n.strip_prefix("word/")
                    .is_some_and(|rest| {
                        !rest.contains('/')
                            && (rest.starts_with("header") || rest.starts_with("footer"))
                            && rest.ends_with(".xml")
                    })
            })
            .map(str::to_string)
            .collect();
        extra.sort();
        let mut parts = vec![DOCUMENT_PART.to_string()];
        parts.extend(extra);
        parts
    }

    /// Apply one replacement map to every paragraph of every story part.
    pub fn fill(&mut self, replacements: &ReplacementMap) -> Result<FillReport, Error> {
        let mut report = FillReport::default();
        for part in self.story_parts() {
            let Some(bytes) = self.package.part(&part) else {
                continue;
            };
            let xml_content = decode_part(&self.path, &part, bytes)?;
            let (rewritten, part_report) =
                fill_part(&part, &xml_content, replacements, &self.styles)?;
            log::debug!(
                "{part}: {} paragraphs, {} replacements",
                part_report.paragraphs,
                part_report.replaced
            );
            report.absorb(part_report);
            if let Some(xml) = rewritten {
                self.package.set_part(&part, xml.into_bytes());
            }
        }
        Ok(report)
    }

    /// Paragraph texts of the main document part.
    pub fn paragraph_texts(&self) -> Result<Vec<String>, Error> {
        let bytes = self
            .package
            .part(DOCUMENT_PART)
            .ok_or_else(|| Error::template_load(&self.path, "missing word/document.xml"))?;
        part_paragraph_texts(&decode_part(&self.path, DOCUMENT_PART, bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        self.package.save(path)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.package.to_bytes()
    }
}

fn decode_part(path: &Path, part: &str, bytes: &[u8]) -> Result<String, Error> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::template_load(path, format!("{part} is not valid UTF-8")))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{WML_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn fill(body: &str, pairs: &[(&str, &str)]) -> String {
        let xml = doc(body);
        let map = ReplacementMap::from_pairs(pairs.iter().copied());
        let (out, _) = fill_part("word/document.xml", &xml, &map, &StyleSnapshot::default()).unwrap();
        out.unwrap_or(xml)
    }

    #[test]
    fn untouched_part_is_not_rewritten() {
        let xml = doc(r#"<w:p><w:r><w:t>plain</w:t></w:r></w:p>"#);
        let map = ReplacementMap::from_pairs([("$X$", "1")]);
        let (out, report) = fill_part("word/document.xml", &xml, &map, &StyleSnapshot::default()).unwrap();
        assert!(out.is_none());
        assert_eq!(report.paragraphs, 1);
    }

    #[test]
    fn split_token_keeps_surrounding_runs() {
        let out = fill(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>A</w:t></w:r><w:r><w:rPr><w:sz w:val="28"/></w:rPr><w:t xml:space="preserve">x $</w:t></w:r><w:r><w:t>X$ y</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>Z</w:t></w:r></w:p>"#,
            &[("$X$", "v")],
        );
        assert!(out.contains(r#"<w:r><w:rPr><w:b/></w:rPr><w:t>A</w:t></w:r>"#));
        assert!(out.contains(
            r#"<w:r><w:rPr><w:sz w:val="28"/></w:rPr><w:t xml:space="preserve">x v</w:t></w:r>"#
        ));
        assert!(out.contains(r#"<w:r><w:t xml:space="preserve"> y</w:t></w:r>"#));
        assert!(out.contains(r#"<w:r><w:rPr><w:i/></w:rPr><w:t>Z</w:t></w:r>"#));
        let texts = part_paragraph_texts(&out).unwrap();
        assert_eq!(texts, ["Ax v yZ"]);
    }

    #[test]
    fn drawing_runs_are_left_alone() {
        let body = r#"<w:p><w:r><w:t>$X</w:t></w:r><w:r><w:drawing><pic/></w:drawing></w:r><w:r><w:t>$</w:t></w:r></w:p>"#;
        let out = fill(body, &[("$X$", "v")]);
        assert!(out.contains("<w:drawing><pic/></w:drawing>"));
        assert!(!out.contains("$X"));
    }

    #[test]
    fn hyperlink_runs_take_part() {
        let out = fill(
            r#"<w:p><w:r><w:t>$</w:t></w:r><w:hyperlink><w:r><w:t>X$</w:t></w:r></w:hyperlink></w:p>"#,
            &[("$X$", "v")],
        );
        assert_eq!(part_paragraph_texts(&out).unwrap(), ["v"]);
        assert!(out.contains("<w:hyperlink></w:hyperlink>"));
    }

    #[test]
    fn table_cells_are_left_aligned() {
        let out = fill(
            r#"<w:tbl><w:tr><w:tc><w:p><w:pPr><w:spacing w:after="0"/><w:jc w:val="center"/></w:pPr><w:r><w:t>a</w:t></w:r></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p><w:p><w:pPr><w:ind w:left="10"/><w:rPr><w:b/></w:rPr></w:pPr></w:p><w:p/></w:tc></w:tr></w:tbl>"#,
            &[],
        );
        assert!(out.contains(r#"<w:pPr><w:spacing w:after="0"/><w:jc w:val="left"/></w:pPr>"#));
        assert!(out.contains(r#"<w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:t>b</w:t></w:r></w:p>"#));
        assert!(out.contains(
            r#"<w:pPr><w:ind w:left="10"/><w:jc w:val="left"/><w:rPr><w:b/></w:rPr></w:pPr>"#
        ));
        assert!(out.contains(r#"<w:p><w:pPr><w:jc w:val="left"/></w:pPr></w:p>"#));
        assert!(!out.contains("center"));
    }

    #[test]
    fn text_box_paragraphs_are_filled() {
        let body = r#"<w:p><w:r><w:t>outer</w:t></w:r><w:r><w:drawing><wps:txbx xmlns:wps="urn:wps"><w:txbxContent><w:p><w:r><w:t>$</w:t></w:r><w:r><w:t>X$</w:t></w:r></w:p></w:txbxContent></wps:txbx></w:drawing></w:r></w:p>"#;
        let out = fill(body, &[("$X$", "v")]);
        assert_eq!(part_paragraph_texts(&out).unwrap(), ["outer", "v"]);
        assert!(out.contains("<w:t>outer</w:t>"));
    }

    #[test]
    fn alternate_content_text_boxes_are_both_filled() {
        let body = r#"<w:p><w:r><mc:AlternateContent xmlns:mc="urn:mc" xmlns:v="urn:v"><mc:Choice><w:drawing><w:txbxContent><w:p><w:r><w:t>$X$</w:t></w:r></w:p></w:txbxContent></w:drawing></mc:Choice><mc:Fallback><w:pict><v:shape><v:textbox><w:txbxContent><w:p><w:r><w:t>$X$</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></mc:Fallback></mc:AlternateContent></w:r></w:p>"#;
        let out = fill(body, &[("$X$", "v")]);
        assert_eq!(part_paragraph_texts(&out).unwrap(), ["", "v", "v"]);
    }

    #[test]
    fn simple_field_results_take_part() {
        let out = fill(
            r#"<w:p><w:fldSimple w:instr="MERGEFIELD a"><w:r><w:t>$X$</w:t></w:r></w:fldSimple></w:p>"#,
            &[("$X$", "v")],
        );
        assert_eq!(part_paragraph_texts(&out).unwrap(), ["v"]);
    }

    #[test]
    fn unprefixed_namespace_is_rejected() {
        let xml = format!(r#"<document xmlns="{WML_NS}"><body/></document>"#);
        let map = ReplacementMap::default();
        assert!(fill_part("word/document.xml", &xml, &map, &StyleSnapshot::default()).is_err());
    }
}
