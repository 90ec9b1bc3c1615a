use crate::dom::snapshot::parse_selector;
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    Greenhouse,
    Lever,
    Workday,
    Taleo,
    SmartRecruiters,
    Ashby,
    Generic,
}

/// Hostname fragments per platform, checked in this fixed priority order so
/// no two entries can match ambiguously.
const HOST_TABLE: &[(PlatformKind, &[&str])] = &[
    (PlatformKind::Greenhouse, &["greenhouse.io"]),
    (PlatformKind::Lever, &["lever.co"]),
    (PlatformKind::Workday, &["myworkdayjobs.com", "workday.com"]),
    (PlatformKind::Taleo, &["taleo.net"]),
    (PlatformKind::SmartRecruiters, &["smartrecruiters.com"]),
    (PlatformKind::Ashby, &["ashbyhq.com"]),
];

/// DOM markers for ATS embedded under custom career-site domains, same
/// priority order as the host table.
const DOM_MARKERS: &[(PlatformKind, &str)] = &[
    (
        PlatformKind::Greenhouse,
        "#grnhse_app, #application_form, iframe[src*='greenhouse.io']",
    ),
    (
        PlatformKind::Lever,
        "form[action*='lever.co'], iframe[src*='lever.co']",
    ),
    (
        PlatformKind::Workday,
        "[data-automation-id='jobApplicationButton'], [data-automation-id='applyFlowPage']",
    ),
    (
        PlatformKind::Taleo,
        "#hqj-apply-button, a.masterlink, .taleo-apply-button",
    ),
    (
        PlatformKind::SmartRecruiters,
        "st-modal-content, [class*='smartrecruiters']",
    ),
    (
        PlatformKind::Ashby,
        "#ashby_embed, iframe[src*='ashbyhq.com']",
    ),
];

/// Decide which ATS the current page belongs to.
///
/// Pure function over (URL, serialized DOM): no side effects and no caching,
/// so it is safe to call on every mutation pass. SPA navigations can change
/// the effective platform without a full page load, which is why callers
/// re-classify instead of memoizing.
pub fn classify(url: &str, html: &str) -> PlatformKind {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase));
    let href = url.to_lowercase();

    if let Some(host) = &host {
        for (kind, fragments) in HOST_TABLE {
            if fragments.iter().any(|f| host.contains(f)) {
                return *kind;
            }
        }
    }
    // Full-href fallback catches hosted boards linked through redirect paths.
    for (kind, fragments) in HOST_TABLE {
        if fragments.iter().any(|f| href.contains(f)) {
            return *kind;
        }
    }

    let document = Html::parse_document(html);
    for (kind, marker) in DOM_MARKERS {
        let Ok(selector) = parse_selector(marker) else {
            continue;
        };
        if document.select(&selector).next().is_some() {
            return *kind;
        }
    }

    PlatformKind::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hostnames_classify_directly() {
        assert_eq!(
            classify("https://boards.greenhouse.io/acme/jobs/1", "<html></html>"),
            PlatformKind::Greenhouse
        );
        assert_eq!(
            classify("https://jobs.lever.co/acme/123", "<html></html>"),
            PlatformKind::Lever
        );
        assert_eq!(
            classify("https://acme.wd5.myworkdayjobs.com/careers", "<html></html>"),
            PlatformKind::Workday
        );
        assert_eq!(
            classify("https://acme.taleo.net/careersection/2/jobapply.ftl", "<html></html>"),
            PlatformKind::Taleo
        );
        assert_eq!(
            classify("https://jobs.smartrecruiters.com/Acme/123", "<html></html>"),
            PlatformKind::SmartRecruiters
        );
        assert_eq!(
            classify("https://jobs.ashbyhq.com/acme/123", "<html></html>"),
            PlatformKind::Ashby
        );
    }

    #[test]
    fn unknown_host_falls_back_to_dom_markers() {
        let html = r#"<html><body><div id="grnhse_app"></div></body></html>"#;
        assert_eq!(
            classify("https://careers.acme.com/openings/1", html),
            PlatformKind::Greenhouse
        );

        let workday = r#"<html><body><button data-automation-id="jobApplicationButton">Apply</button></body></html>"#;
        assert_eq!(
            classify("https://careers.acme.com/openings/1", workday),
            PlatformKind::Workday
        );
    }

    #[test]
    fn hostname_wins_over_dom_markers() {
        // A Lever-hosted page embedding a Greenhouse iframe still classifies
        // by hostname first.
        let html = r#"<html><body><iframe src="https://boards.greenhouse.io/embed"></iframe></body></html>"#;
        assert_eq!(
            classify("https://jobs.lever.co/acme/1", html),
            PlatformKind::Lever
        );
    }

    #[test]
    fn nothing_matches_yields_generic() {
        assert_eq!(
            classify("https://careers.acme.com/apply", "<html><body><form></form></body></html>"),
            PlatformKind::Generic
        );
    }

    #[test]
    fn unparseable_url_still_checks_href_substring() {
        assert_eq!(
            classify("boards.greenhouse.io/acme", "<html></html>"),
            PlatformKind::Greenhouse
        );
    }

    #[test]
    fn classification_is_stable_across_repeat_calls() {
        let html = r#"<html><body><div id="grnhse_app"></div></body></html>"#;
        let first = classify("https://careers.acme.com/1", html);
        let second = classify("https://careers.acme.com/1", html);
        assert_eq!(first, second);
    }
}
