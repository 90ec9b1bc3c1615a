use crate::core::PageDriver;
use crate::dom::snapshot::js_string;
use crate::dom::ElementRef;
use crate::errors::Result;
use serde::Deserialize;

/// Result of one injection attempt, decoded from the in-page script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InjectOutcome {
    /// Value stuck; `via` records which strategy landed it.
    Applied { via: String },
    /// Element already held the target value; no events were dispatched.
    Noop,
    /// Both strategies ran and the framework reverted the value.
    Rejected { observed: String },
    /// The reference no longer resolves to an attached element.
    Stale,
}

#[derive(Debug, Deserialize)]
struct ReadBack {
    stale: bool,
    #[serde(default)]
    value: Option<String>,
}

/// Writes a value so that framework-managed state observes the change.
///
/// Naive `element.value = x` assignment is silently overwritten by controlled
/// inputs on the next render tick. The injector therefore tries the browser's
/// native text-insertion command first (accepted by virtually all controlled-
/// input listeners because it mimics keystrokes), and falls back to the value
/// setter on the element *prototype* — bypassing any instance-level override
/// the framework installed — followed by synthetic `input`/`change` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueInjector;

impl ValueInjector {
    pub async fn inject<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
        value: &str,
    ) -> Result<InjectOutcome> {
        let script = Self::inject_script(target, value);
        let raw = page.execute_script(&script).await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Current value of the element, or `None` when the reference is stale.
    pub async fn read_value<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
    ) -> Result<Option<String>> {
        let script = Self::read_script(target);
        let raw = page.execute_script(&script).await?;
        let read: ReadBack = serde_json::from_value(raw)?;
        if read.stale {
            return Ok(None);
        }
        Ok(Some(read.value.unwrap_or_default()))
    }

    fn inject_script(target: &ElementRef, value: &str) -> String {
        format!(
            r#"(function() {{ /* formpilot: inject */
    const el = {resolver};
    if (!el || !el.isConnected) return {{status: 'stale'}};
    const target = {value};
    const current = el.value === undefined || el.value === null ? '' : String(el.value);
    if (current === target) return {{status: 'noop'}};
    el.focus();
    let inserted = false;
    try {{
        el.value = '';
        if (el.select) el.select();
        inserted = !!(document.execCommand && document.execCommand('insertText', false, target));
    }} catch (e) {{
        inserted = false;
    }}
    let via = 'insert-text';
    if (!inserted || el.value !== target) {{
        via = 'prototype-setter';
        const proto = el instanceof window.HTMLTextAreaElement
            ? window.HTMLTextAreaElement.prototype
            : window.HTMLInputElement.prototype;
        const desc = Object.getOwnPropertyDescriptor(proto, 'value');
        if (desc && desc.set) {{
            desc.set.call(el, target);
        }} else {{
            el.value = target;
        }}
        el.dispatchEvent(new Event('input', {{bubbles: true}}));
        el.dispatchEvent(new Event('change', {{bubbles: true}}));
    }}
    el.dispatchEvent(new Event('blur', {{bubbles: true}}));
    if (el.value === target) return {{status: 'applied', via: via}};
    return {{status: 'rejected', observed: String(el.value === undefined ? '' : el.value)}};
}})()"#,
            resolver = target.to_js(),
            value = js_string(value),
        )
    }

    fn read_script(target: &ElementRef) -> String {
        format!(
            r#"(function() {{ /* formpilot: read */
    const el = {resolver};
    if (!el || !el.isConnected) return {{stale: true}};
    return {{stale: false, value: el.value === undefined || el.value === null ? '' : String(el.value)}};
}})()"#,
            resolver = target.to_js(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;
    use serde_json::json;

    fn target() -> ElementRef {
        ElementRef::Id("email".into())
    }

    #[test]
    fn inject_script_checks_attachment_before_use() {
        let script = ValueInjector::inject_script(&target(), "x");
        assert!(script.contains("isConnected"));
        assert!(script.contains("document.getElementById(\"email\")"));
    }

    #[test]
    fn inject_script_tries_insert_text_before_prototype_setter() {
        let script = ValueInjector::inject_script(&target(), "jane@example.com");
        let insert_at = script.find("insertText").expect("insertText strategy");
        let proto_at = script
            .find("HTMLInputElement.prototype")
            .expect("prototype fallback");
        assert!(insert_at < proto_at);
        assert!(script.contains("new Event('input'"));
        assert!(script.contains("new Event('change'"));
        assert!(script.contains("new Event('blur'"));
    }

    #[test]
    fn inject_script_short_circuits_on_equal_value() {
        let script = ValueInjector::inject_script(&target(), "x");
        let noop_at = script.find("'noop'").expect("noop branch");
        let focus_at = script.find("el.focus()").expect("focus call");
        assert!(noop_at < focus_at, "idempotence check must precede any mutation");
    }

    #[test]
    fn inject_script_escapes_values() {
        let script = ValueInjector::inject_script(&target(), "a\"b\nc");
        assert!(script.contains(r#""a\"b\nc""#));
    }

    #[tokio::test]
    async fn outcomes_decode_from_page_json() {
        let page = FakePage::new("<html></html>");
        page.respond("formpilot: inject", json!({"status": "applied", "via": "insert-text"}));
        page.respond("formpilot: inject", json!({"status": "noop"}));
        page.respond("formpilot: inject", json!({"status": "rejected", "observed": ""}));
        page.respond("formpilot: inject", json!({"status": "stale"}));

        let injector = ValueInjector;
        assert_eq!(
            injector.inject(&page, &target(), "x").await.unwrap(),
            InjectOutcome::Applied {
                via: "insert-text".into()
            }
        );
        assert_eq!(
            injector.inject(&page, &target(), "x").await.unwrap(),
            InjectOutcome::Noop
        );
        assert_eq!(
            injector.inject(&page, &target(), "x").await.unwrap(),
            InjectOutcome::Rejected { observed: "".into() }
        );
        assert_eq!(
            injector.inject(&page, &target(), "x").await.unwrap(),
            InjectOutcome::Stale
        );
    }

    #[tokio::test]
    async fn read_value_distinguishes_stale_from_empty() {
        let page = FakePage::new("<html></html>");
        page.respond("formpilot: read", json!({"stale": true}));
        page.respond("formpilot: read", json!({"stale": false, "value": ""}));
        page.respond("formpilot: read", json!({"stale": false, "value": "hello"}));

        let injector = ValueInjector;
        assert_eq!(injector.read_value(&page, &target()).await.unwrap(), None);
        assert_eq!(
            injector.read_value(&page, &target()).await.unwrap(),
            Some(String::new())
        );
        assert_eq!(
            injector.read_value(&page, &target()).await.unwrap(),
            Some("hello".into())
        );
    }
}
