use crate::errors::{AutofillError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

const CONTROL_SELECTOR: &str = "input, select, textarea";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Input,
    Select,
    TextArea,
}

impl ElementKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::Input => "input",
            ElementKind::Select => "select",
            ElementKind::TextArea => "textarea",
        }
    }

    pub(crate) fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "input" => Some(ElementKind::Input),
            "select" => Some(ElementKind::Select),
            "textarea" => Some(ElementKind::TextArea),
            _ => None,
        }
    }
}

/// Weak reference to an element in the live page.
///
/// Never a held DOM handle: the descriptor is re-resolved inside the page on
/// every use, and resolution checks `isConnected` so a re-rendered page is
/// detected as a stale reference instead of dereferenced blindly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementRef {
    Id(String),
    Name { tag: String, name: String },
    Index { tag: String, index: usize },
}

impl ElementRef {
    /// JS expression resolving the element, or `null` when it is gone.
    pub fn to_js(&self) -> String {
        match self {
            ElementRef::Id(id) => format!("document.getElementById({})", js_string(id)),
            ElementRef::Name { tag, name } => format!(
                "document.querySelector({})",
                js_string(&format!("{}[name=\"{}\"]", tag, name.replace('"', "\\\"")))
            ),
            ElementRef::Index { tag, index } => {
                format!("document.getElementsByTagName({})[{}]", js_string(tag), index)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub kind: ElementKind,
    pub attributes: HashMap<String, String>,
    /// Options, for selects only.
    pub options: Vec<SelectOption>,
    pub visible: bool,
    pub element_ref: ElementRef,
}

impl FormField {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_file_input(&self) -> bool {
        self.kind == ElementKind::Input && self.attr("type") == Some("file")
    }

    /// Select elements and ARIA/framework combobox inputs go through the
    /// dropdown driver rather than plain text injection.
    pub fn is_select_like(&self) -> bool {
        self.kind == ElementKind::Select
            || self.attr("role") == Some("combobox")
            || self.attr("aria-haspopup") == Some("listbox")
            || self.attr("aria-autocomplete").is_some()
    }
}

/// A `<label>` with its visible text and the controls it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelNode {
    pub text: String,
    pub for_id: Option<String>,
    /// Indices into `FormSnapshot::fields` for controls nested in the label.
    pub nested: Vec<usize>,
}

/// Parsed view of the page's form controls at one instant. The page keeps
/// mutating after capture, so consumers treat every `ElementRef` as possibly
/// stale and re-capture rather than caching aggressively.
#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub url: String,
    pub html: String,
    pub fields: Vec<FormField>,
    pub labels: Vec<LabelNode>,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

impl FormSnapshot {
    pub fn capture(url: &str, html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let control_selector = parse_selector(CONTROL_SELECTOR)?;
        let label_selector = parse_selector("label")?;

        let controls: Vec<scraper::ElementRef> = document.select(&control_selector).collect();

        let mut fields = Vec::with_capacity(controls.len());
        let mut tag_counts: HashMap<String, usize> = HashMap::new();
        for element in &controls {
            let tag = element.value().name().to_lowercase();
            let index_in_tag = {
                let counter = tag_counts.entry(tag.clone()).or_insert(0);
                let current = *counter;
                *counter += 1;
                current
            };
            let Some(kind) = ElementKind::from_tag(&tag) else {
                continue;
            };

            let mut attributes = HashMap::new();
            for (name, value) in element.value().attrs() {
                attributes.insert(name.to_string(), value.to_string());
            }

            let element_ref = reference_for(&tag, index_in_tag, &attributes);
            let options = if kind == ElementKind::Select {
                collect_options(element)?
            } else {
                Vec::new()
            };
            let visible = !is_hidden(&attributes);

            fields.push(FormField {
                kind,
                attributes,
                options,
                visible,
                element_ref,
            });
        }

        let mut labels = Vec::new();
        for label in document.select(&label_selector) {
            let text = collapse_whitespace(&label.text().collect::<Vec<_>>().join(" "));
            if text.is_empty() {
                continue;
            }
            let for_id = label.value().attr("for").map(str::to_string);
            let nested = label
                .select(&control_selector)
                .filter_map(|nested| controls.iter().position(|c| c.id() == nested.id()))
                .collect();
            labels.push(LabelNode {
                text,
                for_id,
                nested,
            });
        }

        Ok(Self {
            url: url.to_string(),
            html: html.to_string(),
            fields,
            labels,
            captured_at: chrono::Utc::now(),
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_by_id(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.attr("id") == Some(id))
    }
}

fn reference_for(tag: &str, index_in_tag: usize, attributes: &HashMap<String, String>) -> ElementRef {
    if let Some(id) = attributes.get("id").filter(|v| !v.is_empty()) {
        return ElementRef::Id(id.clone());
    }
    if let Some(name) = attributes.get("name").filter(|v| !v.is_empty()) {
        return ElementRef::Name {
            tag: tag.to_string(),
            name: name.clone(),
        };
    }
    ElementRef::Index {
        tag: tag.to_string(),
        index: index_in_tag,
    }
}

fn collect_options(select: &scraper::ElementRef) -> Result<Vec<SelectOption>> {
    let option_selector = parse_selector("option")?;
    Ok(select
        .select(&option_selector)
        .map(|option| {
            let text = collapse_whitespace(&option.text().collect::<Vec<_>>().join(" "));
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                // per HTML semantics a value-less option submits its text
                .unwrap_or_else(|| text.clone());
            SelectOption { value, text }
        })
        .collect())
}

fn is_hidden(attributes: &HashMap<String, String>) -> bool {
    if attributes.get("type").map(String::as_str) == Some("hidden") {
        return true;
    }
    if attributes.contains_key("hidden") {
        return true;
    }
    if let Some(style) = attributes.get("style") {
        let style = style.to_lowercase();
        if style.contains("display:none")
            || style.contains("display: none")
            || style.contains("visibility:hidden")
            || style.contains("visibility: hidden")
        {
            return true;
        }
    }
    // Class-name approximation of computed-style hiding; a static snapshot
    // cannot run getComputedStyle.
    if let Some(class) = attributes.get("class") {
        let class = class.to_lowercase();
        if class.contains("hidden") || class.contains("invisible") || class.contains("d-none") {
            return true;
        }
    }
    false
}

pub(crate) fn parse_selector(source: &str) -> Result<Selector> {
    Selector::parse(source).map_err(|e| AutofillError::InvalidSelector(format!("{}: {}", source, e)))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"));
    re.replace_all(text.trim(), " ").into_owned()
}

/// Escape a Rust string into a JS double-quoted string literal.
pub(crate) fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
