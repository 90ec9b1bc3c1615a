use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Access to a single live page.
///
/// The fill engine drives everything through script evaluation against one
/// page, so any CDP-backed tab (or a scripted fake in tests) can host a fill
/// pass. Implementations must tolerate being called many times per page: the
/// engine re-reads the document on every pass rather than caching element
/// handles across event-loop turns.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluate a JavaScript expression in the page and return its value.
    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Serialized document, `document.documentElement.outerHTML`.
    async fn page_html(&self) -> Result<String>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String>;
}
