use crate::dom::snapshot::{parse_selector, ElementKind, ElementRef, FormField, FormSnapshot};
use scraper::Html;
use std::collections::HashMap;
use tracing::debug;

/// Attribute scan order. First attribute pass that yields any visible match
/// wins; later attributes are never consulted for a "better" candidate.
const ATTRIBUTE_PRIORITY: [&str; 4] = ["placeholder", "name", "aria-label", "id"];

/// Finds the form control best matching a semantic keyword set.
///
/// Matching is case-insensitive substring containment with no token-boundary
/// awareness. That deliberately favors recall over precision: a false
/// positive ends up visually flagged for the human reviewer rather than
/// silently submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldLocator;

impl FieldLocator {
    /// Strict priority order, first match wins:
    /// 1. label association (`for` attribute or a nested control),
    /// 2. attribute scan over visible controls of the requested kind.
    pub fn locate<'s>(
        &self,
        snapshot: &'s FormSnapshot,
        keywords: &[String],
        kind: ElementKind,
    ) -> Option<&'s FormField> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return None;
        }

        if let Some(field) = self.locate_by_label(snapshot, &keywords, kind) {
            return Some(field);
        }
        self.locate_by_attribute(snapshot, &keywords, kind)
    }

    fn locate_by_label<'s>(
        &self,
        snapshot: &'s FormSnapshot,
        keywords: &[String],
        kind: ElementKind,
    ) -> Option<&'s FormField> {
        for label in &snapshot.labels {
            let text = label.text.to_lowercase();
            if !keywords.iter().any(|k| text.contains(k)) {
                continue;
            }

            if let Some(for_id) = &label.for_id {
                if let Some(field) = snapshot.field_by_id(for_id) {
                    if field.kind == kind && field.visible {
                        debug!(label = %label.text, "matched via label for-attribute");
                        return Some(field);
                    }
                }
            }

            for &index in &label.nested {
                if let Some(field) = snapshot.fields.get(index) {
                    if field.kind == kind && field.visible {
                        debug!(label = %label.text, "matched via nested label control");
                        return Some(field);
                    }
                }
            }
        }
        None
    }

    fn locate_by_attribute<'s>(
        &self,
        snapshot: &'s FormSnapshot,
        keywords: &[String],
        kind: ElementKind,
    ) -> Option<&'s FormField> {
        for attribute in ATTRIBUTE_PRIORITY {
            for field in &snapshot.fields {
                if field.kind != kind || !field.visible {
                    continue;
                }
                let Some(value) = field.attr(attribute) else {
                    continue;
                };
                let value = value.to_lowercase();
                if keywords.iter().any(|k| value.contains(k)) {
                    debug!(attribute, "matched via attribute scan");
                    return Some(field);
                }
            }
        }
        None
    }

    /// Direct-selector strategy: platform-specific id/name/data-attribute
    /// guesses, tried in order before the generic heuristic. A hit must still
    /// resolve to a visible control known to the snapshot.
    pub fn locate_direct<'s>(
        &self,
        snapshot: &'s FormSnapshot,
        selectors: &[String],
    ) -> Option<&'s FormField> {
        let document = Html::parse_document(&snapshot.html);
        let control_selector = parse_selector("input, select, textarea").ok()?;

        for source in selectors {
            let Ok(selector) = parse_selector(source) else {
                debug!(selector = %source, "skipping unparseable selector guess");
                continue;
            };
            let Some(hit) = document.select(&selector).next() else {
                continue;
            };

            let tag = hit.value().name().to_lowercase();
            if ElementKind::from_tag(&tag).is_none() {
                continue;
            }

            let mut attributes = HashMap::new();
            for (name, value) in hit.value().attrs() {
                attributes.insert(name.to_string(), value.to_string());
            }
            let reference = if let Some(id) = attributes.get("id").filter(|v| !v.is_empty()) {
                ElementRef::Id(id.clone())
            } else if let Some(name) = attributes.get("name").filter(|v| !v.is_empty()) {
                ElementRef::Name {
                    tag: tag.clone(),
                    name: name.clone(),
                }
            } else {
                // Anonymous element: recover its document-order index among
                // controls of the same tag, matching the snapshot's scheme.
                let index = document
                    .select(&control_selector)
                    .filter(|c| c.value().name().to_lowercase() == tag)
                    .position(|c| c.id() == hit.id())?;
                ElementRef::Index {
                    tag: tag.clone(),
                    index,
                }
            };

            if let Some(field) = snapshot
                .fields
                .iter()
                .find(|f| f.element_ref == reference && f.visible)
            {
                debug!(selector = %source, "matched via direct selector guess");
                return Some(field);
            }
        }
        None
    }
}
