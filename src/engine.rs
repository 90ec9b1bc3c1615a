use crate::core::{EngineConfig, PageDriver};
use crate::errors::Result;
use crate::fill::{FillOrchestrator, PassReport};
use crate::platform::{classify, PlatformKind, PlatformProfile};
use crate::profile::{FieldMappings, ProfileRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Installs the click counter on first use and returns the current count.
/// Clicks on button-like elements hint at a page-internal step transition
/// (multi-page application wizards) that may have revealed new fields.
const CLICK_WATCH_SCRIPT: &str = r#"(function() { /* formpilot: clicks */
    if (!window.__formpilotClicks) {
        const state = {count: 0};
        document.addEventListener('click', (event) => {
            if (!event.target || !event.target.closest) return;
            const hit = event.target.closest(
                "button, [role='button'], input[type='submit'], input[type='button'], a");
            if (hit) state.count += 1;
        }, true);
        window.__formpilotClicks = state;
    }
    return window.__formpilotClicks.count;
})()"#;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub platform: PlatformKind,
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub fn confirmed(&self) -> usize {
        self.passes.iter().map(PassReport::confirmed).sum()
    }

    pub fn needs_manual(&self) -> usize {
        self.passes.iter().map(PassReport::needs_manual).sum()
    }
}

/// Per-page entry point tying the components together.
///
/// Everything is dependency-injected and constructed once per page load; the
/// only page-global state is the namespaced click counter the watch script
/// installs, which a full navigation discards along with any pending timers.
pub struct AutofillEngine<P: PageDriver> {
    page: Arc<P>,
    config: EngineConfig,
    mappings: FieldMappings,
    values: ProfileRecord,
    platform_override: Option<PlatformProfile>,
}

impl<P: PageDriver> AutofillEngine<P> {
    pub fn new(page: Arc<P>, values: ProfileRecord) -> Self {
        Self {
            page,
            config: EngineConfig::default(),
            mappings: FieldMappings::default(),
            values,
            platform_override: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mappings(mut self, mappings: FieldMappings) -> Self {
        self.mappings = mappings;
        self
    }

    /// Force a platform profile instead of classifying the page.
    pub fn with_platform_profile(mut self, profile: PlatformProfile) -> Self {
        self.platform_override = Some(profile);
        self
    }

    /// Classify the current page. Re-runs the pure classifier on every call:
    /// SPA navigations can change the effective platform without a page load.
    pub async fn classify_page(&self) -> Result<PlatformKind> {
        let url = self.page.current_url().await?;
        let html = self.page.page_html().await?;
        Ok(classify(&url, &html))
    }

    /// Fill the page: one orchestrated pass, then a bounded watch for clicks
    /// on button-like elements that grants follow-up passes for multi-step
    /// forms.
    pub async fn run(&self) -> Result<RunReport> {
        let platform = match &self.platform_override {
            Some(profile) => profile.clone(),
            None => {
                let kind = self.classify_page().await?;
                PlatformProfile::for_platform(kind)
            }
        };
        info!(platform = ?platform.kind, "starting autofill");

        let orchestrator =
            FillOrchestrator::new(Arc::clone(&self.page), self.config.clone(), platform.clone());
        let mut passes = vec![orchestrator.run(&self.values, &self.mappings).await?];

        let mut extra_passes = self.config.pass.click_passes;
        if extra_passes > 0 {
            let mut seen = match self.poll_clicks().await {
                Ok(count) => count,
                Err(error) => {
                    debug!(%error, "click watcher could not be installed");
                    extra_passes = 0;
                    0
                }
            };
            let deadline =
                Instant::now() + Duration::from_millis(self.config.pass.click_watch_ms);
            while extra_passes > 0 && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(self.config.pass.click_poll_ms)).await;
                let count = match self.poll_clicks().await {
                    Ok(count) => count,
                    Err(error) => {
                        debug!(%error, "click poll failed, stopping watch");
                        break;
                    }
                };
                if count > seen {
                    seen = count;
                    debug!("button-like click observed, scheduling follow-up pass");
                    tokio::time::sleep(Duration::from_millis(self.config.pass.click_settle_ms))
                        .await;
                    passes.push(orchestrator.run(&self.values, &self.mappings).await?);
                    extra_passes -= 1;
                }
            }
        }

        Ok(RunReport {
            platform: platform.kind,
            passes,
        })
    }

    async fn poll_clicks(&self) -> Result<u64> {
        let raw = self.page.execute_script(CLICK_WATCH_SCRIPT).await?;
        Ok(raw.as_u64().unwrap_or(0))
    }
}
