use crate::platform::PlatformKind;
use std::collections::HashMap;

/// Per-platform strategy data for the shared fill orchestrator.
///
/// One orchestrator parameterized by this profile replaces what would
/// otherwise be near-identical handlers per ATS: the differences between
/// platforms are selector guesses, field order and patience, not logic.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub kind: PlatformKind,
    /// Upper bound on rescheduled passes while the form looks unmounted.
    pub max_pass_attempts: u32,
    /// Semantic slots attempted, in order.
    pub field_order: Vec<String>,
    /// Per-slot CSS selector guesses tried before the generic locator. A
    /// performance shortcut, not a correctness requirement: misses fall
    /// through to the keyword heuristic.
    pub selector_guesses: HashMap<String, Vec<String>>,
}

const COMMON_ORDER: &[&str] = &[
    "firstName",
    "lastName",
    "fullName",
    "email",
    "phone",
    "linkedin",
    "github",
    "website",
    "location",
    "currentCompany",
    "currentTitle",
    "resume",
    "coverLetter",
    "gender",
    "ethnicity",
    "veteranStatus",
    "disabilityStatus",
    "workAuthorization",
    "sponsorship",
];

fn order(slots: &[&str]) -> Vec<String> {
    slots.iter().map(|s| s.to_string()).collect()
}

fn guesses(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(slot, selectors)| {
            (
                slot.to_string(),
                selectors.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

impl PlatformProfile {
    pub fn for_platform(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Greenhouse => Self {
                kind,
                max_pass_attempts: 12,
                field_order: order(COMMON_ORDER),
                selector_guesses: guesses(&[
                    ("firstName", &["#first_name", "input[name='job_application[first_name]']"]),
                    ("lastName", &["#last_name", "input[name='job_application[last_name]']"]),
                    ("email", &["#email", "input[name='job_application[email]']"]),
                    ("phone", &["#phone", "input[name='job_application[phone]']"]),
                    ("location", &["#candidate-location", "#job_application_location"]),
                ]),
            },
            PlatformKind::Lever => Self {
                kind,
                max_pass_attempts: 12,
                field_order: order(&[
                    "fullName",
                    "email",
                    "phone",
                    "currentCompany",
                    "linkedin",
                    "github",
                    "website",
                    "resume",
                    "coverLetter",
                ]),
                selector_guesses: guesses(&[
                    ("fullName", &["input[name='name']"]),
                    ("email", &["input[name='email']"]),
                    ("phone", &["input[name='phone']"]),
                    ("currentCompany", &["input[name='org']"]),
                    ("linkedin", &["input[name='urls[LinkedIn]']"]),
                    ("github", &["input[name='urls[GitHub]']"]),
                    ("website", &["input[name='urls[Portfolio]']", "input[name='urls[Other]']"]),
                ]),
            },
            // Workday renders its wizard slowly and in stages; give it the
            // longest pass budget.
            PlatformKind::Workday => Self {
                kind,
                max_pass_attempts: 30,
                field_order: order(COMMON_ORDER),
                selector_guesses: guesses(&[
                    ("firstName", &["input[data-automation-id='legalNameSection_firstName']"]),
                    ("lastName", &["input[data-automation-id='legalNameSection_lastName']"]),
                    ("email", &["input[data-automation-id='email']"]),
                    ("phone", &["input[data-automation-id='phone-number']"]),
                    ("location", &["input[data-automation-id='addressSection_city']"]),
                ]),
            },
            PlatformKind::Taleo => Self {
                kind,
                max_pass_attempts: 20,
                field_order: order(COMMON_ORDER),
                selector_guesses: guesses(&[
                    ("firstName", &["input[id*='firstName']"]),
                    ("lastName", &["input[id*='lastName']"]),
                    ("email", &["input[id*='email']"]),
                    ("phone", &["input[id*='phoneNumber']", "input[id*='phone']"]),
                ]),
            },
            PlatformKind::SmartRecruiters => Self {
                kind,
                max_pass_attempts: 15,
                field_order: order(COMMON_ORDER),
                selector_guesses: guesses(&[
                    ("firstName", &["input[name='firstName']"]),
                    ("lastName", &["input[name='lastName']"]),
                    ("email", &["input[name='email']"]),
                    ("phone", &["input[name='phoneNumber']"]),
                ]),
            },
            PlatformKind::Ashby => Self {
                kind,
                max_pass_attempts: 12,
                field_order: order(COMMON_ORDER),
                selector_guesses: guesses(&[
                    ("fullName", &["input[name='_systemfield_name']"]),
                    ("email", &["input[name='_systemfield_email']"]),
                    ("phone", &["input[name='_systemfield_phone']"]),
                ]),
            },
            PlatformKind::Generic => Self {
                kind,
                max_pass_attempts: 10,
                field_order: order(COMMON_ORDER),
                selector_guesses: HashMap::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_a_profile() {
        for kind in [
            PlatformKind::Greenhouse,
            PlatformKind::Lever,
            PlatformKind::Workday,
            PlatformKind::Taleo,
            PlatformKind::SmartRecruiters,
            PlatformKind::Ashby,
            PlatformKind::Generic,
        ] {
            let profile = PlatformProfile::for_platform(kind);
            assert_eq!(profile.kind, kind);
            assert!(!profile.field_order.is_empty());
            assert!(profile.max_pass_attempts >= 10);
            assert!(profile.max_pass_attempts <= 30);
        }
    }

    #[test]
    fn workday_is_the_most_patient() {
        assert_eq!(
            PlatformProfile::for_platform(PlatformKind::Workday).max_pass_attempts,
            30
        );
    }

    #[test]
    fn generic_profile_has_no_selector_guesses() {
        assert!(PlatformProfile::for_platform(PlatformKind::Generic)
            .selector_guesses
            .is_empty());
    }

    #[test]
    fn lever_uses_single_full_name_field() {
        let profile = PlatformProfile::for_platform(PlatformKind::Lever);
        assert!(profile.field_order.contains(&"fullName".to_string()));
        assert!(!profile.field_order.contains(&"firstName".to_string()));
    }
}
