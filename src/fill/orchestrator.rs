use crate::core::{EngineConfig, PageDriver};
use crate::dom::{ElementKind, ElementRef, FieldLocator, FormField, FormSnapshot};
use crate::errors::Result;
use crate::feedback::{FeedbackPanel, ToastTone};
use crate::fill::dropdown::DropdownDriver;
use crate::fill::inject::{InjectOutcome, ValueInjector};
use crate::platform::PlatformProfile;
use crate::profile::{FieldMappings, ProfileRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-field fill lifecycle.
///
/// ```text
/// Searching -> Filling -> Confirmed
///             \-> Retrying (value didn't stick) -> Filling
///             \-> Exhausted (budget spent)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Searching,
    Filling,
    Retrying,
    Confirmed,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Value observed stable after injection; field marked safe.
    Confirmed,
    /// No matching element; a normal negative result, reported silently.
    NotFound,
    /// Retry budget spent without the value sticking.
    Exhausted,
    /// Flagged for the human: file uploads and other unfillable fields.
    NeedsManual,
}

#[derive(Debug, Clone)]
pub struct FieldReport {
    pub slot: String,
    pub outcome: FieldOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub fields: Vec<FieldReport>,
}

impl PassReport {
    pub fn confirmed(&self) -> usize {
        self.count(FieldOutcome::Confirmed)
    }

    pub fn exhausted(&self) -> usize {
        self.count(FieldOutcome::Exhausted)
    }

    pub fn needs_manual(&self) -> usize {
        self.count(FieldOutcome::NeedsManual)
    }

    pub fn not_found(&self) -> usize {
        self.count(FieldOutcome::NotFound)
    }

    fn count(&self, outcome: FieldOutcome) -> usize {
        self.fields.iter().filter(|f| f.outcome == outcome).count()
    }
}

/// Ephemeral per-field state. The element reference is weak: it is re-resolved
/// in the page on every use and dropped (`None`) the moment it reads back as
/// detached, which re-routes the field through the locator.
#[derive(Debug, Clone)]
struct FillAttempt {
    slot: String,
    value: String,
    target: Option<ElementRef>,
    retries_left: u32,
    state: FillState,
    manual: bool,
}

impl FillAttempt {
    fn new(slot: String, value: String, budget: u32) -> Self {
        Self {
            slot,
            value,
            target: None,
            retries_left: budget,
            state: FillState::Searching,
            manual: false,
        }
    }

    fn outcome(&self) -> FieldOutcome {
        if self.manual {
            return FieldOutcome::NeedsManual;
        }
        match self.state {
            FillState::Confirmed => FieldOutcome::Confirmed,
            FillState::Exhausted => FieldOutcome::Exhausted,
            _ => FieldOutcome::NotFound,
        }
    }
}

/// One shared fill engine for every platform; the differences between ATS
/// handlers live in the [`PlatformProfile`] data it is constructed with.
pub struct FillOrchestrator<P: PageDriver> {
    page: Arc<P>,
    locator: FieldLocator,
    injector: ValueInjector,
    dropdowns: DropdownDriver,
    feedback: FeedbackPanel,
    config: EngineConfig,
    platform: PlatformProfile,
}

impl<P: PageDriver> FillOrchestrator<P> {
    pub fn new(page: Arc<P>, config: EngineConfig, platform: PlatformProfile) -> Self {
        let dropdowns = DropdownDriver::new(&config.dropdown);
        let feedback = FeedbackPanel::new(config.feedback.clone());
        Self {
            page,
            locator: FieldLocator,
            injector: ValueInjector,
            dropdowns,
            feedback,
            config,
            platform,
        }
    }

    pub fn platform(&self) -> &PlatformProfile {
        &self.platform
    }

    /// Run fill passes until the form mounts, then fill it once.
    ///
    /// While the page carries fewer controls than the readiness threshold the
    /// pass reschedules on a fixed delay, up to the platform's attempt budget.
    pub async fn run(
        &self,
        values: &ProfileRecord,
        mappings: &FieldMappings,
    ) -> Result<PassReport> {
        let max_attempts = self.platform.max_pass_attempts.max(1);
        for attempt in 1..=max_attempts {
            let snapshot = self.capture().await?;
            if snapshot.field_count() >= self.config.pass.min_form_elements {
                let report = self.run_pass(&snapshot, values, mappings).await?;
                self.notify(&report).await;
                return Ok(report);
            }
            debug!(
                attempt,
                fields = snapshot.field_count(),
                "form not mounted yet, rescheduling pass"
            );
            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_millis(self.config.pass.reschedule_delay_ms))
                    .await;
            }
        }

        info!(platform = ?self.platform.kind, "gave up waiting for the form to mount");
        if let Err(error) = self
            .feedback
            .toast(
                self.page.as_ref(),
                "Autofill could not find an application form on this page",
                ToastTone::Warning,
            )
            .await
        {
            debug!(%error, "failure toast could not be shown");
        }
        Ok(PassReport::default())
    }

    /// One pass over the profile's fields: a sequential sweep that locates and
    /// writes each field, then interleaved confirmation rounds so no field's
    /// retries block another's.
    async fn run_pass(
        &self,
        snapshot: &FormSnapshot,
        values: &ProfileRecord,
        mappings: &FieldMappings,
    ) -> Result<PassReport> {
        let mut attempts: Vec<FillAttempt> = self
            .platform
            .field_order
            .iter()
            .filter_map(|slot| {
                values
                    .get(slot)
                    .map(|value| FillAttempt::new(slot.clone(), value.to_string(), self.config.retry.budget))
            })
            .collect();

        for attempt in attempts.iter_mut() {
            if let Err(error) = self.start_field(snapshot, attempt, mappings).await {
                // Contained per field: an unexpected failure degrades this one
                // field to not-found and never aborts the pass.
                warn!(slot = %attempt.slot, %error, "field fill failed");
                attempt.state = FillState::Searching;
                attempt.target = None;
            }
        }

        self.confirmation_rounds(&mut attempts, mappings).await?;

        let report = PassReport {
            fields: attempts
                .iter()
                .map(|a| FieldReport {
                    slot: a.slot.clone(),
                    outcome: a.outcome(),
                })
                .collect(),
        };
        info!(
            platform = ?self.platform.kind,
            confirmed = report.confirmed(),
            not_found = report.not_found(),
            exhausted = report.exhausted(),
            needs_manual = report.needs_manual(),
            "fill pass finished"
        );
        Ok(report)
    }

    async fn start_field(
        &self,
        snapshot: &FormSnapshot,
        attempt: &mut FillAttempt,
        mappings: &FieldMappings,
    ) -> Result<()> {
        attempt.state = FillState::Searching;
        let Some(field) = self.locate_slot(snapshot, &attempt.slot, mappings) else {
            debug!(slot = %attempt.slot, "no matching element");
            return Ok(());
        };
        let target = field.element_ref.clone();

        if field.is_file_input() {
            attempt.manual = true;
            attempt.state = FillState::Exhausted;
            self.mark_needs_manual(&target).await;
            return Ok(());
        }

        attempt.target = Some(target.clone());
        attempt.state = FillState::Filling;

        if field.is_select_like() {
            let done = self
                .dropdowns
                .fill(self.page.as_ref(), &target, &attempt.value)
                .await?;
            if done {
                attempt.state = FillState::Confirmed;
                self.mark_confirmed(&target).await;
            } else {
                // Popup never rendered a matching option; a single-field
                // failure that leaves the rest of the pass alone.
                attempt.state = FillState::Exhausted;
            }
            return Ok(());
        }

        match self
            .injector
            .inject(self.page.as_ref(), &target, &attempt.value)
            .await?
        {
            InjectOutcome::Noop => {
                attempt.state = FillState::Confirmed;
                self.mark_confirmed(&target).await;
            }
            InjectOutcome::Stale => {
                attempt.target = None;
                attempt.state = FillState::Retrying;
            }
            InjectOutcome::Applied { .. } | InjectOutcome::Rejected { .. } => {
                attempt.state = FillState::Retrying;
            }
        }
        Ok(())
    }

    /// Interleaved rounds: every unconfirmed field gets one check per round,
    /// and no field's confirmation blocks another's retries.
    async fn confirmation_rounds(
        &self,
        attempts: &mut [FillAttempt],
        mappings: &FieldMappings,
    ) -> Result<()> {
        while attempts.iter().any(|a| a.state == FillState::Retrying) {
            tokio::time::sleep(Duration::from_millis(self.config.retry.interval_ms)).await;
            let snapshot = self.capture().await?;
            for attempt in attempts
                .iter_mut()
                .filter(|a| a.state == FillState::Retrying)
            {
                if let Err(error) = self.retry_field(&snapshot, attempt, mappings).await {
                    warn!(slot = %attempt.slot, %error, "field retry failed");
                    attempt.state = FillState::Searching;
                    attempt.target = None;
                }
            }
        }
        Ok(())
    }

    async fn retry_field(
        &self,
        snapshot: &FormSnapshot,
        attempt: &mut FillAttempt,
        mappings: &FieldMappings,
    ) -> Result<()> {
        // A dropped reference means the page re-rendered; resolve again with
        // the same keyword set before touching anything.
        if attempt.target.is_none() {
            match self.locate_slot(snapshot, &attempt.slot, mappings) {
                Some(field) if !field.is_file_input() => {
                    attempt.target = Some(field.element_ref.clone());
                }
                _ => {
                    debug!(slot = %attempt.slot, "element gone and no replacement found");
                    attempt.state = FillState::Searching;
                    return Ok(());
                }
            }
        }
        let Some(target) = attempt.target.clone() else {
            return Ok(());
        };

        match self.injector.read_value(self.page.as_ref(), &target).await? {
            None => {
                attempt.target = None;
                self.spend_retry(attempt);
            }
            Some(current) if current == attempt.value => {
                attempt.state = FillState::Confirmed;
                self.mark_confirmed(&target).await;
            }
            Some(_) => {
                if attempt.retries_left == 0 {
                    attempt.state = FillState::Exhausted;
                    return Ok(());
                }
                attempt.retries_left -= 1;
                attempt.state = FillState::Retrying;
                match self
                    .injector
                    .inject(self.page.as_ref(), &target, &attempt.value)
                    .await?
                {
                    InjectOutcome::Noop => {
                        attempt.state = FillState::Confirmed;
                        self.mark_confirmed(&target).await;
                    }
                    InjectOutcome::Stale => {
                        attempt.target = None;
                    }
                    InjectOutcome::Applied { .. } | InjectOutcome::Rejected { .. } => {}
                }
            }
        }
        Ok(())
    }

    fn spend_retry(&self, attempt: &mut FillAttempt) {
        if attempt.retries_left == 0 {
            attempt.state = FillState::Exhausted;
        } else {
            attempt.retries_left -= 1;
        }
    }

    fn locate_slot<'s>(
        &self,
        snapshot: &'s FormSnapshot,
        slot: &str,
        mappings: &FieldMappings,
    ) -> Option<&'s FormField> {
        if let Some(guesses) = self.platform.selector_guesses.get(slot) {
            if let Some(field) = self.locator.locate_direct(snapshot, guesses) {
                return Some(field);
            }
        }
        let keywords = mappings.keywords(slot)?;
        for kind in [ElementKind::Input, ElementKind::TextArea, ElementKind::Select] {
            if let Some(field) = self.locator.locate(snapshot, keywords, kind) {
                return Some(field);
            }
        }
        None
    }

    async fn capture(&self) -> Result<FormSnapshot> {
        let url = self.page.current_url().await?;
        let html = self.page.page_html().await?;
        FormSnapshot::capture(&url, &html)
    }

    async fn mark_confirmed(&self, target: &ElementRef) {
        if let Err(error) = self.feedback.mark_confirmed(self.page.as_ref(), target).await {
            debug!(%error, "could not mark field as confirmed");
        }
    }

    async fn mark_needs_manual(&self, target: &ElementRef) {
        if let Err(error) = self
            .feedback
            .mark_needs_manual(self.page.as_ref(), target)
            .await
        {
            debug!(%error, "could not mark field for manual attention");
        }
    }

    async fn notify(&self, report: &PassReport) {
        let message = if report.confirmed() > 0 {
            let mut message = format!("Autofill completed {} field(s)", report.confirmed());
            if report.needs_manual() > 0 {
                message.push_str(&format!(
                    "; {} need manual attention",
                    report.needs_manual()
                ));
            }
            Some((message, ToastTone::Success))
        } else if report.exhausted() > 0 {
            Some((
                "Autofill could not confirm any fields; please review the form manually".to_string(),
                ToastTone::Warning,
            ))
        } else {
            // Nothing matched at all: stay silent rather than nagging on
            // pages that merely look like forms.
            None
        };

        if let Some((message, tone)) = message {
            if let Err(error) = self.feedback.toast(self.page.as_ref(), &message, tone).await {
                debug!(%error, "toast could not be shown");
            }
        }
    }
}
