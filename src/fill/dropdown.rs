use crate::core::config::DropdownConfig;
use crate::core::PageDriver;
use crate::dom::snapshot::js_string;
use crate::dom::{ElementRef, SelectOption};
use crate::errors::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownKind {
    Native,
    FrameworkManagedSelect,
    AriaCombobox,
    Unknown,
}

/// Class-name fragments associated with searchable-select widget libraries.
/// Kept private to the classifier so the heuristic stays swappable.
const FRAMEWORK_CLASS_HINTS: &[&str] = &[
    "react-select",
    "select__control",
    "select__value-container",
    "Select-control",
    "select2",
    "chosen-container",
    "multiselect",
];

/// What the in-page probe reports about a widget and its ancestors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DropdownProbe {
    pub tag: String,
    pub role: Option<String>,
    pub aria_haspopup: Option<String>,
    /// Class attribute of the element and its nearest ancestors.
    pub class_chain: Vec<String>,
}

/// Classified per element at fill time, never cached: one page can mix
/// widget types freely.
pub fn classify_dropdown(probe: &DropdownProbe) -> DropdownKind {
    if probe.tag.eq_ignore_ascii_case("select") {
        return DropdownKind::Native;
    }
    let has_framework_hint = probe
        .class_chain
        .iter()
        .any(|class| FRAMEWORK_CLASS_HINTS.iter().any(|hint| class.contains(hint)));
    if has_framework_hint {
        return DropdownKind::FrameworkManagedSelect;
    }
    if probe.role.as_deref() == Some("combobox")
        || probe.aria_haspopup.as_deref() == Some("listbox")
    {
        return DropdownKind::AriaCombobox;
    }
    DropdownKind::Unknown
}

/// Native option matching, in four fallback passes: exact value, exact text,
/// option-text-contains-term, term-contains-option-text. The first pass that
/// yields any match wins, so an exact hit is never shadowed by a partial one.
pub fn match_native_option(options: &[SelectOption], target: &str) -> Option<usize> {
    let term = target.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }
    options
        .iter()
        .position(|o| o.value.to_lowercase() == term)
        .or_else(|| options.iter().position(|o| o.text.to_lowercase() == term))
        .or_else(|| {
            options
                .iter()
                .position(|o| o.text.to_lowercase().contains(&term))
        })
        .or_else(|| {
            options.iter().position(|o| {
                let text = o.text.trim().to_lowercase();
                !text.is_empty() && term.contains(&text)
            })
        })
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StepResult {
    ok: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ScanResult {
    matched: bool,
    text: Option<String>,
}

/// Drives selection widgets through their interaction protocols.
///
/// Popup strategies interleave fixed settle delays between open, type and
/// scan because option lists render asynchronously and expose no portable
/// ready signal; the delay is a documented flakiness trade-off.
#[derive(Debug, Clone)]
pub struct DropdownDriver {
    settle: Duration,
}

impl DropdownDriver {
    pub fn new(config: &DropdownConfig) -> Self {
        Self {
            settle: Duration::from_millis(config.settle_ms),
        }
    }

    /// Returns whether an option matching `text` was committed.
    pub async fn fill<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
        text: &str,
    ) -> Result<bool> {
        let probe = self.probe(page, target).await?;
        if probe.tag.is_empty() {
            return Ok(false);
        }
        let kind = classify_dropdown(&probe);
        debug!(?kind, tag = %probe.tag, "classified dropdown");
        match kind {
            // Unknown widgets get the native strategy as a last resort.
            DropdownKind::Native | DropdownKind::Unknown => {
                self.fill_native(page, target, text).await
            }
            DropdownKind::FrameworkManagedSelect => self.fill_framework(page, target, text).await,
            DropdownKind::AriaCombobox => self.fill_combobox(page, target, text).await,
        }
    }

    async fn probe<P: PageDriver>(&self, page: &P, target: &ElementRef) -> Result<DropdownProbe> {
        let script = format!(
            r#"(function() {{ /* formpilot: probe */
    const el = {resolver};
    if (!el || !el.isConnected) return {{tag: '', classChain: []}};
    const chain = [];
    let node = el;
    for (let depth = 0; node && depth < 5; depth++) {{
        if (typeof node.className === 'string' && node.className) chain.push(node.className);
        node = node.parentElement;
    }}
    return {{
        tag: el.tagName.toLowerCase(),
        role: el.getAttribute('role'),
        ariaHaspopup: el.getAttribute('aria-haspopup'),
        classChain: chain
    }};
}})()"#,
            resolver = target.to_js(),
        );
        let raw = page.execute_script(&script).await?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn fill_native<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
        text: &str,
    ) -> Result<bool> {
        let script = format!(
            r#"(function() {{ /* formpilot: options */
    const el = {resolver};
    if (!el || !el.isConnected || el.tagName.toLowerCase() !== 'select') return null;
    return Array.from(el.options).map(o => ({{value: o.value, text: (o.textContent || '').trim()}}));
}})()"#,
            resolver = target.to_js(),
        );
        let raw = page.execute_script(&script).await?;
        let options: Option<Vec<SelectOption>> = serde_json::from_value(raw)?;
        let Some(options) = options else {
            return Ok(false);
        };
        let Some(index) = match_native_option(&options, text) else {
            debug!(term = %text, "no native option matched");
            return Ok(false);
        };

        let commit = format!(
            r#"(function() {{ /* formpilot: select */
    const el = {resolver};
    if (!el || !el.isConnected) return {{ok: false}};
    el.selectedIndex = {index};
    el.dispatchEvent(new Event('input', {{bubbles: true}}));
    el.dispatchEvent(new Event('change', {{bubbles: true}}));
    el.dispatchEvent(new Event('blur', {{bubbles: true}}));
    return {{ok: true}};
}})()"#,
            resolver = target.to_js(),
            index = index,
        );
        let raw = page.execute_script(&commit).await?;
        let result: StepResult = serde_json::from_value(raw)?;
        Ok(result.ok)
    }

    async fn fill_framework<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
        text: &str,
    ) -> Result<bool> {
        let open = format!(
            r#"(function() {{ /* formpilot: popup-open */
    const el = {resolver};
    if (!el || !el.isConnected) return {{ok: false}};
    const control = el.closest("[class*='select'], [class*='dropdown']") || el;
    control.dispatchEvent(new MouseEvent('mousedown', {{bubbles: true}}));
    if (control.click) control.click();
    return {{ok: true}};
}})()"#,
            resolver = target.to_js(),
        );
        let raw = page.execute_script(&open).await?;
        let opened: StepResult = serde_json::from_value(raw)?;
        if !opened.ok {
            return Ok(false);
        }
        tokio::time::sleep(self.settle).await;

        // Narrow the rendered option list through the popup's filter input
        // when one exists; harmless when absent.
        let filter = format!(
            r#"(function() {{ /* formpilot: popup-filter */
    const el = {resolver};
    const root = el && el.isConnected
        ? (el.closest("[class*='select'], [class*='dropdown']") || el)
        : document;
    let box = root.querySelector("input:not([type='hidden'])");
    if (!box && document.activeElement && document.activeElement.tagName === 'INPUT') {{
        box = document.activeElement;
    }}
    if (!box) return {{ok: false}};
    const desc = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value');
    if (desc && desc.set) {{
        desc.set.call(box, {text});
    }} else {{
        box.value = {text};
    }}
    box.dispatchEvent(new Event('input', {{bubbles: true}}));
    return {{ok: true}};
}})()"#,
            resolver = target.to_js(),
            text = js_string(text),
        );
        let raw = page.execute_script(&filter).await?;
        let typed: StepResult = serde_json::from_value(raw)?;
        if typed.ok {
            tokio::time::sleep(self.settle).await;
        }

        let scan = format!(
            r#"(function() {{ /* formpilot: popup-scan */
    const term = {text}.toLowerCase();
    const candidates = document.querySelectorAll("[role='option'], [class*='option'], [id*='option']");
    for (const candidate of candidates) {{
        if (candidate.offsetParent === null) continue;
        const optionText = (candidate.textContent || '').trim().toLowerCase();
        if (!optionText) continue;
        if (optionText.includes(term) || term.includes(optionText)) {{
            candidate.click();
            return {{matched: true, text: candidate.textContent.trim()}};
        }}
    }}
    document.body.click();
    return {{matched: false}};
}})()"#,
            text = js_string(text),
        );
        let raw = page.execute_script(&scan).await?;
        let result: ScanResult = serde_json::from_value(raw)?;
        if let Some(matched_text) = &result.text {
            debug!(option = %matched_text, "framework select option clicked");
        }
        Ok(result.matched)
    }

    async fn fill_combobox<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
        text: &str,
    ) -> Result<bool> {
        let open = format!(
            r#"(function() {{ /* formpilot: combobox-open */
    const el = {resolver};
    if (!el || !el.isConnected) return {{ok: false}};
    el.focus();
    if (el.click) el.click();
    return {{ok: true}};
}})()"#,
            resolver = target.to_js(),
        );
        let raw = page.execute_script(&open).await?;
        let opened: StepResult = serde_json::from_value(raw)?;
        if !opened.ok {
            return Ok(false);
        }
        tokio::time::sleep(self.settle).await;

        let scan = format!(
            r#"(function() {{ /* formpilot: combobox-scan */
    const el = {resolver};
    if (!el || !el.isConnected) return {{matched: false}};
    const term = {text}.toLowerCase();
    let listbox = null;
    const controls = el.getAttribute('aria-controls') || el.getAttribute('aria-owns');
    if (controls) listbox = document.getElementById(controls.split(' ')[0]);
    if (!listbox) {{
        listbox = Array.from(document.querySelectorAll("[role='listbox']"))
            .find(candidate => candidate.offsetParent !== null) || null;
    }}
    if (!listbox) {{
        el.blur();
        return {{matched: false}};
    }}
    for (const option of listbox.querySelectorAll("[role='option']")) {{
        const optionText = (option.textContent || '').trim().toLowerCase();
        if (!optionText) continue;
        if (optionText.includes(term) || term.includes(optionText)) {{
            option.click();
            return {{matched: true, text: option.textContent.trim()}};
        }}
    }}
    el.blur();
    return {{matched: false}};
}})()"#,
            resolver = target.to_js(),
            text = js_string(text),
        );
        let raw = page.execute_script(&scan).await?;
        let result: ScanResult = serde_json::from_value(raw)?;
        Ok(result.matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;
    use serde_json::json;

    fn options(entries: &[(&str, &str)]) -> Vec<SelectOption> {
        entries
            .iter()
            .map(|(value, text)| SelectOption {
                value: value.to_string(),
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn select_tag_classifies_native() {
        let probe = DropdownProbe {
            tag: "select".into(),
            ..Default::default()
        };
        assert_eq!(classify_dropdown(&probe), DropdownKind::Native);
    }

    #[test]
    fn framework_class_hints_classify_before_aria() {
        // react-select marks its inner input with role=combobox; the class
        // hint must take precedence so the popup protocol is used.
        let probe = DropdownProbe {
            tag: "input".into(),
            role: Some("combobox".into()),
            class_chain: vec!["select__input".into(), "select__control css-1x2y".into()],
            ..Default::default()
        };
        assert_eq!(classify_dropdown(&probe), DropdownKind::FrameworkManagedSelect);
    }

    #[test]
    fn aria_attributes_classify_combobox() {
        let by_role = DropdownProbe {
            tag: "input".into(),
            role: Some("combobox".into()),
            ..Default::default()
        };
        assert_eq!(classify_dropdown(&by_role), DropdownKind::AriaCombobox);

        let by_haspopup = DropdownProbe {
            tag: "div".into(),
            aria_haspopup: Some("listbox".into()),
            ..Default::default()
        };
        assert_eq!(classify_dropdown(&by_haspopup), DropdownKind::AriaCombobox);
    }

    #[test]
    fn unclassifiable_widgets_are_unknown() {
        let probe = DropdownProbe {
            tag: "div".into(),
            class_chain: vec!["custom-widget".into()],
            ..Default::default()
        };
        assert_eq!(classify_dropdown(&probe), DropdownKind::Unknown);
    }

    #[test]
    fn exact_text_match_beats_partial_containment() {
        // "male" is a substring of "Female"; the exact match on "Male" must
        // win because the exact pass runs first.
        let opts = options(&[("m", "Male"), ("f", "Female"), ("nb", "Non-binary")]);
        assert_eq!(match_native_option(&opts, "male"), Some(0));
    }

    #[test]
    fn exact_value_match_is_first_priority() {
        let opts = options(&[("CA", "California"), ("CO", "Colorado")]);
        assert_eq!(match_native_option(&opts, "CA"), Some(0));
        assert_eq!(match_native_option(&opts, "ca"), Some(0));
    }

    #[test]
    fn option_text_containment_is_third_priority() {
        let opts = options(&[("1", "United States of America"), ("2", "Canada")]);
        assert_eq!(match_native_option(&opts, "united states"), Some(0));
    }

    #[test]
    fn term_containment_is_last_resort() {
        let opts = options(&[("", "Select..."), ("y", "Yes"), ("n", "No")]);
        assert_eq!(match_native_option(&opts, "Yes, I am authorized"), Some(1));
    }

    #[test]
    fn empty_option_text_never_matches_by_containment() {
        let opts = options(&[("", ""), ("y", "Yes")]);
        assert_eq!(match_native_option(&opts, "definitely yes"), Some(1));
    }

    #[test]
    fn empty_term_matches_nothing() {
        let opts = options(&[("a", "A")]);
        assert_eq!(match_native_option(&opts, "   "), None);
    }

    #[tokio::test]
    async fn native_fill_commits_matched_option() {
        let page = FakePage::new("<html></html>");
        page.respond(
            "formpilot: probe",
            json!({"tag": "select", "classChain": []}),
        );
        page.respond(
            "formpilot: options",
            json!([{"value": "CA", "text": "California"}]),
        );
        page.respond("formpilot: select", json!({"ok": true}));

        let driver = DropdownDriver::new(&DropdownConfig { settle_ms: 0 });
        let done = driver
            .fill(&page, &ElementRef::Id("state".into()), "CA")
            .await
            .unwrap();
        assert!(done);

        let commits: Vec<String> = page
            .scripts()
            .into_iter()
            .filter(|s| s.contains("formpilot: select"))
            .collect();
        assert_eq!(commits.len(), 1, "change must be dispatched exactly once");
        assert!(commits[0].contains("selectedIndex = 0"));
    }

    #[tokio::test]
    async fn native_fill_reports_failure_without_match() {
        let page = FakePage::new("<html></html>");
        page.respond("formpilot: probe", json!({"tag": "select", "classChain": []}));
        page.respond("formpilot: options", json!([{"value": "x", "text": "Nope"}]));

        let driver = DropdownDriver::new(&DropdownConfig { settle_ms: 0 });
        let done = driver
            .fill(&page, &ElementRef::Id("state".into()), "California")
            .await
            .unwrap();
        assert!(!done);
        assert!(
            !page.scripts().iter().any(|s| s.contains("formpilot: select")),
            "no commit without a match"
        );
    }

    #[tokio::test]
    async fn framework_fill_opens_types_and_scans() {
        let page = FakePage::new("<html></html>");
        page.respond(
            "formpilot: probe",
            json!({"tag": "input", "role": "combobox", "classChain": ["select__control"]}),
        );
        page.respond("formpilot: popup-open", json!({"ok": true}));
        page.respond("formpilot: popup-filter", json!({"ok": true}));
        page.respond(
            "formpilot: popup-scan",
            json!({"matched": true, "text": "Female"}),
        );

        let driver = DropdownDriver::new(&DropdownConfig { settle_ms: 0 });
        let done = driver
            .fill(&page, &ElementRef::Id("gender".into()), "Female")
            .await
            .unwrap();
        assert!(done);

        let scripts = page.scripts();
        let order: Vec<usize> = ["popup-open", "popup-filter", "popup-scan"]
            .iter()
            .map(|marker| {
                scripts
                    .iter()
                    .position(|s| s.contains(marker))
                    .expect(marker)
            })
            .collect();
        assert!(order[0] < order[1] && order[1] < order[2]);
    }

    #[tokio::test]
    async fn combobox_scan_failure_is_a_single_field_failure() {
        let page = FakePage::new("<html></html>");
        page.respond(
            "formpilot: probe",
            json!({"tag": "input", "role": "combobox", "classChain": []}),
        );
        page.respond("formpilot: combobox-open", json!({"ok": true}));
        page.respond("formpilot: combobox-scan", json!({"matched": false}));

        let driver = DropdownDriver::new(&DropdownConfig { settle_ms: 0 });
        let done = driver
            .fill(&page, &ElementRef::Id("country".into()), "Atlantis")
            .await
            .unwrap();
        assert!(!done);
    }

    #[tokio::test]
    async fn stale_probe_reports_failure() {
        let page = FakePage::new("<html></html>");
        page.respond("formpilot: probe", json!({"tag": "", "classChain": []}));

        let driver = DropdownDriver::new(&DropdownConfig { settle_ms: 0 });
        let done = driver
            .fill(&page, &ElementRef::Id("gone".into()), "x")
            .await
            .unwrap();
        assert!(!done);
    }
}
