use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub browser: BrowserConfig,
    pub pass: PassConfig,
    pub retry: RetryConfig,
    pub dropdown: DropdownConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    /// Upper bound on full fill passes while the form never looks mounted.
    /// Platform profiles override this per ATS.
    pub max_attempts: u32,
    /// Delay between rescheduled passes.
    pub reschedule_delay_ms: u64,
    /// Minimum number of form controls before a page counts as mounted.
    pub min_form_elements: usize,
    /// Extra passes granted after a button-like click (multi-step forms).
    pub click_passes: u32,
    /// How long the engine watches for click re-triggers after a pass.
    pub click_watch_ms: u64,
    /// Poll interval for the click counter.
    pub click_poll_ms: u64,
    /// Pause between a detected click and the follow-up pass, so the page
    /// transition has a chance to render new fields.
    pub click_settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Re-injection budget per field after the first write.
    pub budget: u32,
    /// Delay between confirmation rounds.
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropdownConfig {
    /// Fixed settle delay after opening a popup or typing into its filter.
    /// Popup option lists render asynchronously and expose no portable
    /// ready signal, so this is a wall-clock heuristic.
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub toast_duration_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![],
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            reschedule_delay_ms: 1500,
            min_form_elements: 3,
            click_passes: 1,
            click_watch_ms: 15000,
            click_poll_ms: 500,
            click_settle_ms: 1200,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            budget: 3,
            interval_ms: 600,
        }
    }
}

impl Default for DropdownConfig {
    fn default() -> Self {
        Self { settle_ms: 400 }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            toast_duration_ms: 4000,
        }
    }
}
