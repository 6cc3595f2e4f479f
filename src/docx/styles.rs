use std::collections::HashMap;

use super::{WML_NS, wml_attr};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    fn parse(val: &str) -> Option<Self> {
        match val {
            "paragraph" => Some(StyleKind::Paragraph),
            "character" => Some(StyleKind::Character),
            "table" => Some(StyleKind::Table),
            "numbering" => Some(StyleKind::Numbering),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleDefinition {
    pub id: String,
    pub name: String,
    pub kind: StyleKind,
}

/// The styles a document defines, captured once before substitution. Runs
/// reference styles by id; lookups also accept the display name.
#[derive(Clone, Debug, Default)]
pub struct StyleSnapshot {
    by_id: HashMap<String, StyleDefinition>,
    id_by_name: HashMap<String, String>,
}

impl StyleSnapshot {
    /// Snapshot of character styles given as `(id, name)` pairs.
    pub fn from_definitions<'a>(defs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut snapshot = StyleSnapshot::default();
        for (id, name) in defs {
            snapshot.insert(StyleDefinition {
                id: id.to_string(),
                name: name.to_string(),
                kind: StyleKind::Character,
            });
        }
        snapshot
    }

    /// Parse the content of `word/styles.xml`.
    pub fn parse(xml_content: &str) -> Result<Self, Error> {
        let xml = roxmltree::Document::parse(xml_content)?;
        let mut snapshot = StyleSnapshot::default();

        for node in xml.root_element().children() {
            if node.tag_name().name() != "style" || node.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            let Some(id) = node.attribute((WML_NS, "styleId")) else {
                continue;
            };
            let kind = node
                .attribute((WML_NS, "type"))
                .and_then(StyleKind::parse)
                .unwrap_or(StyleKind::Paragraph);
            let name = wml_attr(node, "name").unwrap_or(id);

            snapshot.insert(StyleDefinition {
                id: id.to_string(),
                name: name.to_string(),
                kind,
            });
        }

        log::debug!("Captured {} styles", snapshot.len());
        Ok(snapshot)
    }

    fn insert(&mut self, def: StyleDefinition) {
        self.id_by_name
            .entry(def.name.clone())
            .or_insert_with(|| def.id.clone());
        self.by_id.insert(def.id.clone(), def);
    }

    /// Find a style by id, falling back to its display name.
    pub fn resolve(&self, reference: &str) -> Option<&StyleDefinition> {
        self.by_id.get(reference).or_else(|| {
            self.id_by_name
                .get(reference)
                .and_then(|id| self.by_id.get(id))
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
