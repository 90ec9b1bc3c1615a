use crate::core::config::BrowserConfig;
use crate::core::PageDriver;
use crate::errors::{AutofillError, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;

/// Chrome process owner; hands out [`ChromePage`] drivers per tab.
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self { browser: None }
    }

    pub async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| AutofillError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| AutofillError::LaunchFailed(e.to_string()))?;
        self.browser = Some(browser);
        Ok(())
    }

    /// Open a tab on `url` and wait for the initial navigation.
    pub async fn open(&self, url: &str) -> Result<ChromePage> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(AutofillError::BrowserNotLaunched)?;

        let tab = browser
            .new_tab()
            .map_err(|e| AutofillError::BrowserError(e.to_string()))?;
        tab.navigate_to(url)
            .map_err(|e| AutofillError::NavigationFailed(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| AutofillError::NavigationFailed(e.to_string()))?;

        Ok(ChromePage { tab })
    }

    pub fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    pub async fn close(&mut self) -> Result<()> {
        self.browser = None;
        Ok(())
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// [`PageDriver`] over one Chrome tab.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AutofillError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AutofillError::NavigationFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn execute_script(&self, script: &str) -> Result<Value> {
        // CDP returns objects by reference; serialize in the page so the
        // result always crosses the wire as a primitive.
        let wrapped = format!("JSON.stringify({})", script);
        let result = self
            .tab
            .evaluate(&wrapped, false)
            .map_err(|e| AutofillError::JavaScriptFailed(e.to_string()))?;
        match result.value {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            // undefined does not stringify; treat it as null like the page would
            _ => Ok(Value::Null),
        }
    }

    async fn page_html(&self) -> Result<String> {
        let html = self
            .execute_script("document.documentElement.outerHTML")
            .await?;
        Ok(html.as_str().unwrap_or("").to_string())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }
}
