/// Element order of `w:rPr` children as laid down by CT_RPr. Properties that
/// are re-emitted are slotted back in by rank so Word accepts the result.
const RPR_ORDER: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
    "rPrChange",
];

fn rpr_rank(name: &str) -> usize {
    RPR_ORDER
        .iter()
        .position(|n| *n == name)
        .unwrap_or(RPR_ORDER.len() - 1)
}

/// A maximal span of text sharing one explicit formatting assignment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub properties: RunProperties,
    pub(crate) origin: Option<usize>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn styled(text: impl Into<String>, properties: RunProperties) -> Self {
        Run {
            text: text.into(),
            properties,
            origin: None,
        }
    }

    /// Index of the run this one was carved out of, counted in the run list
    /// the container held before substitution started.
    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    /// Carve a fragment that inherits this run's formatting and origin.
    pub(crate) fn fragment(&self, text: String) -> Run {
        Run {
            text,
            properties: self.properties.clone(),
            origin: self.origin,
        }
    }

    /// Serialize as a `w:r` element using the part's WordprocessingML prefix.
    /// Tabs and line feeds become `w:tab` and `w:br`.
    pub fn to_xml(&self, prefix: &str) -> String {
        let mut out = format!("<{prefix}:r>");
        out.push_str(&self.properties.to_xml(prefix));
        let mut pending = String::new();
        let flush = |pending: &mut String, out: &mut String| {
            if !pending.is_empty() {
                out.push_str(&format!(
                    "<{prefix}:t xml:space=\"preserve\">{}</{prefix}:t>",
                    escape_text(pending)
                ));
                pending.clear();
            }
        };
        for ch in self.text.chars() {
            match ch {
                '\t' => {
                    flush(&mut pending, &mut out);
                    out.push_str(&format!("<{prefix}:tab/>"));
                }
                '\n' => {
                    flush(&mut pending, &mut out);
                    out.push_str(&format!("<{prefix}:br/>"));
                }
                _ => pending.push(ch),
            }
        }
        flush(&mut pending, &mut out);
        out.push_str(&format!("</{prefix}:r>"));
        out
    }
}

/// The `w:rFonts` attributes of a run, keyed by local name (`ascii`,
/// `hAnsi`, `eastAsia`, `cs`, `hint`, theme variants).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunFonts {
    attributes: Vec<(String, String)>,
}

impl RunFonts {
    pub fn named(name: &str) -> Self {
        let mut fonts = RunFonts::default();
        fonts.set_name(name);
        fonts
    }

    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == attr)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, attr: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == attr) {
            Some(slot) => slot.1 = value.to_string(),
            None => self
                .attributes
                .push((attr.to_string(), value.to_string())),
        }
    }

    /// Family name as Word reports it: the ASCII slot first, then the
    /// high-ANSI and East Asian slots.
    pub fn name(&self) -> Option<&str> {
        self.get("ascii")
            .or_else(|| self.get("hAnsi"))
            .or_else(|| self.get("eastAsia"))
    }

    pub fn set_name(&mut self, name: &str) {
        for attr in ["ascii", "hAnsi", "eastAsia"] {
            self.set(attr, name);
        }
    }

    fn to_xml(&self, prefix: &str) -> String {
        let mut out = format!("<{prefix}:rFonts");
        for (k, v) in &self.attributes {
            out.push_str(&format!(" {prefix}:{k}=\"{}\"", escape_attr(v)));
        }
        out.push_str("/>");
        out
    }
}

/// A `w:rPr` child that is carried through untouched.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RawProperty {
    pub(crate) name: String,
    pub(crate) xml: String,
}

/// Character formatting of a run. Style reference, fonts and size are
/// modelled; every other property is kept as its original XML.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunProperties {
    pub style: Option<String>,
    pub fonts: Option<RunFonts>,
    pub size: Option<u32>, // half-points
    pub complex_size: Option<u32>,
    pub(crate) raw: Vec<RawProperty>,
}

impl RunProperties {
    pub fn font_name(&self) -> Option<&str> {
        self.fonts.as_ref().and_then(|f| f.name())
    }

    pub fn set_font_name(&mut self, name: &str) {
        self.fonts.get_or_insert_with(RunFonts::default).set_name(name);
    }

    /// Font size in points.
    pub fn font_size(&self) -> Option<f32> {
        self.size.map(|hp| hp as f32 / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.style.is_none()
            && self.fonts.is_none()
            && self.size.is_none()
            && self.complex_size.is_none()
            && self.raw.is_empty()
    }

    pub(crate) fn push_raw(&mut self, name: &str, xml: &str) {
        self.raw.push(RawProperty {
            name: name.to_string(),
            xml: xml.to_string(),
        });
    }

    pub fn to_xml(&self, prefix: &str) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut children: Vec<(String, String)> = self
            .raw
            .iter()
            .map(|p| (p.name.clone(), p.xml.clone()))
            .collect();
        let mut modelled = Vec::new();
        if let Some(style) = &self.style {
            modelled.push((
                "rStyle",
                format!("<{prefix}:rStyle {prefix}:val=\"{}\"/>", escape_attr(style)),
            ));
        }
        if let Some(fonts) = &self.fonts {
            modelled.push(("rFonts", fonts.to_xml(prefix)));
        }
        if let Some(sz) = self.size {
            modelled.push(("sz", format!("<{prefix}:sz {prefix}:val=\"{sz}\"/>")));
        }
        if let Some(sz) = self.complex_size {
            modelled.push(("szCs", format!("<{prefix}:szCs {prefix}:val=\"{sz}\"/>")));
        }
        for (name, xml) in modelled {
            let rank = rpr_rank(name);
            let at = children
                .iter()
                .position(|(n, _)| rpr_rank(n) > rank)
                .unwrap_or(children.len());
            children.insert(at, (name.to_string(), xml));
        }

        let mut out = format!("<{prefix}:rPr>");
        for (_, xml) in children {
            out.push_str(&xml);
        }
        out.push_str(&format!("</{prefix}:rPr>"));
        out
    }
}

pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
