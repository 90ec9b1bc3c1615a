use crate::core::config::FeedbackConfig;
use crate::core::PageDriver;
use crate::dom::snapshot::js_string;
use crate::dom::ElementRef;
use crate::errors::Result;
use uuid::Uuid;

const CONFIRMED_COLOR: &str = "#22c55e";
const NEEDS_MANUAL_COLOR: &str = "#f59e0b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Success,
    Warning,
}

/// Visual reporting channel: border coloring on filled fields plus transient
/// toasts. This is the engine's only outward signal; a human reviews the page
/// to judge outcome, so marking never implies server-side acceptance.
#[derive(Debug, Clone)]
pub struct FeedbackPanel {
    config: FeedbackConfig,
}

impl FeedbackPanel {
    pub fn new(config: FeedbackConfig) -> Self {
        Self { config }
    }

    /// Green border: value confirmed stable after injection.
    pub async fn mark_confirmed<P: PageDriver>(&self, page: &P, target: &ElementRef) -> Result<()> {
        self.mark(page, target, CONFIRMED_COLOR).await
    }

    /// Yellow border: the field needs manual attention (file uploads, fields
    /// the engine knows it cannot reliably fill).
    pub async fn mark_needs_manual<P: PageDriver>(
        &self,
        page: &P,
        target: &ElementRef,
    ) -> Result<()> {
        self.mark(page, target, NEEDS_MANUAL_COLOR).await
    }

    async fn mark<P: PageDriver>(&self, page: &P, target: &ElementRef, color: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let script = format!(
            r#"(function() {{ /* formpilot: mark */
    const el = {resolver};
    if (!el || !el.isConnected) return false;
    el.style.border = '2px solid {color}';
    el.style.borderRadius = '3px';
    return true;
}})()"#,
            resolver = target.to_js(),
            color = color,
        );
        page.execute_script(&script).await?;
        Ok(())
    }

    pub async fn toast<P: PageDriver>(
        &self,
        page: &P,
        message: &str,
        tone: ToastTone,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let background = match tone {
            ToastTone::Success => "#16a34a",
            ToastTone::Warning => "#d97706",
        };
        let id = format!("formpilot-toast-{}", Uuid::new_v4().simple());
        let script = format!(
            r#"(function() {{ /* formpilot: toast */
    const node = document.createElement('div');
    node.id = {id};
    node.textContent = {message};
    node.style.cssText = 'position:fixed;top:16px;right:16px;z-index:2147483647;'
        + 'padding:10px 16px;border-radius:6px;color:#fff;font:13px sans-serif;'
        + 'background:{background};box-shadow:0 2px 8px rgba(0,0,0,0.25);';
    document.body.appendChild(node);
    setTimeout(() => {{ node.remove(); }}, {duration});
    return true;
}})()"#,
            id = js_string(&id),
            message = js_string(message),
            background = background,
            duration = self.config.toast_duration_ms,
        );
        page.execute_script(&script).await?;
        Ok(())
    }
}
