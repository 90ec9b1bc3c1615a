//! Scripted page driver and fixtures for exercising the engine without a
//! browser.

use crate::core::PageDriver;
use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// In-memory [`PageDriver`] whose script results are scripted by the test.
///
/// Responses are keyed by a marker substring of the evaluated script (every
/// engine script carries a `formpilot: <name>` comment); each key holds a
/// FIFO queue. Scripts with no queued response evaluate to `null`, which is
/// also what a real page returns for a script whose result is undefined.
pub struct FakePage {
    html: Mutex<String>,
    url: Mutex<String>,
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    script_log: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new(html: &str) -> Self {
        Self {
            html: Mutex::new(html.to_string()),
            url: Mutex::new("https://careers.example.com/apply".to_string()),
            responses: Mutex::new(HashMap::new()),
            script_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_url(html: &str, url: &str) -> Self {
        let page = Self::new(html);
        *page.url.lock().expect("url lock") = url.to_string();
        page
    }

    /// Swap the document, as a page re-render would.
    pub fn set_html(&self, html: &str) {
        *self.html.lock().expect("html lock") = html.to_string();
    }

    /// Queue `response` for the next script containing `marker`.
    pub fn respond(&self, marker: &str, response: Value) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(marker.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every script evaluated so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.script_log.lock().expect("script log lock").clone()
    }

    pub fn scripts_matching(&self, marker: &str) -> usize {
        self.scripts().iter().filter(|s| s.contains(marker)).count()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.script_log
            .lock()
            .expect("script log lock")
            .push(script.to_string());

        let mut responses = self.responses.lock().expect("responses lock");
        for (marker, queue) in responses.iter_mut() {
            if script.contains(marker.as_str()) {
                if let Some(response) = queue.pop_front() {
                    return Ok(response);
                }
            }
        }
        Ok(Value::Null)
    }

    async fn page_html(&self) -> Result<String> {
        Ok(self.html.lock().expect("html lock").clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().expect("url lock").clone())
    }
}

/// A small application form resembling a generic careers page.
pub fn basic_application_form() -> &'static str {
    r#"
    <html><body>
      <form id="application">
        <label for="first_name">First Name</label>
        <input id="first_name" type="text">
        <label for="last_name">Last Name</label>
        <input id="last_name" type="text">
        <label for="email">Email Address</label>
        <input id="email" type="email">
        <input type="text" name="phone" placeholder="Phone number">
        <input type="text" aria-label="LinkedIn profile URL" id="linkedin_url">
        <select name="gender">
          <option value="">Select...</option>
          <option value="m">Male</option>
          <option value="f">Female</option>
          <option value="nb">Non-binary</option>
        </select>
        <input type="file" name="resume">
        <button type="submit">Submit application</button>
      </form>
    </body></html>
    "#
}

/// Install a tracing subscriber for test debugging; safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn responses_pop_in_fifo_order_per_marker() {
        let page = FakePage::new("<html></html>");
        page.respond("formpilot: read", json!({"stale": false, "value": "1"}));
        page.respond("formpilot: read", json!({"stale": false, "value": "2"}));

        let first = page
            .execute_script("(function() { /* formpilot: read */ })()")
            .await
            .unwrap();
        let second = page
            .execute_script("(function() { /* formpilot: read */ })()")
            .await
            .unwrap();
        assert_eq!(first["value"], "1");
        assert_eq!(second["value"], "2");
    }

    #[tokio::test]
    async fn unmatched_scripts_evaluate_to_null() {
        let page = FakePage::new("<html></html>");
        let result = page.execute_script("1 + 1").await.unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(page.scripts().len(), 1);
    }

    #[tokio::test]
    async fn html_swaps_simulate_rerenders() {
        let page = FakePage::new("<html><body></body></html>");
        page.set_html("<html><body><input name='email'></body></html>");
        assert!(page.page_html().await.unwrap().contains("email"));
    }
}
