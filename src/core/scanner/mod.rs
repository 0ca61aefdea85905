// src/core/scanner/mod.rs

//! The scan pipeline. Each stage lives in its own sub-module; this module
//! orchestrates them per request and assembles the final report.

pub mod consent_scanner;
pub mod crawl_scanner;
pub mod render_scanner;
pub mod score;
pub mod ssl_scanner;
pub mod static_scanner;
pub mod tool_scanner;
pub mod wordpress_scanner;

use crate::core::error::{Result, ScanError};
use crate::core::models::{
    CapturedRequest, CategorizedFindings, ComplianceReport, ConsentEvaluation, ScanStats,
};
use crate::core::signatures::{self, PatternSet, DEFAULT_PATTERNS, VENDOR_SIGNATURES};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// `pagesSample` never exceeds this many entries.
pub const MAX_PAGES_SAMPLE: usize = 20;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

static RE_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// A scan target must be a full URL with an explicit http(s) scheme.
pub fn is_valid_target(url: &str) -> bool {
    RE_TARGET.is_match(url)
}

/// Runs the whole compliance pipeline for one request and assembles the
/// report. All state is request-scoped; nothing is shared across concurrent
/// calls.
///
/// Stage order (sequential; the dynamic stages share the target site's
/// serving capacity): static pass → main render → crawl expansion → TLS
/// inspection → consent render → privacy-link render → tool detection →
/// scoring.
pub async fn run_compliance_scan(target: &str) -> Result<ComplianceReport> {
    // Validation happens before any network or browser resource is touched.
    if !is_valid_target(target) {
        return Err(ScanError::InvalidUrl(
            "a full URL including http(s) is required".to_string(),
        ));
    }
    let base = Url::parse(target)
        .map_err(|e| ScanError::InvalidUrl(format!("unparseable URL: {e}")))?;

    info!(target, "Starting compliance scan.");
    let patterns: &PatternSet = &DEFAULT_PATTERNS;
    let client = reqwest::Client::builder()
        .user_agent(concat!("PrivScan/", env!("CARGO_PKG_VERSION")))
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;

    // Static pass over the server-delivered markup.
    let html = static_scanner::fetch_page(&client, target).await?;
    let mut findings = static_scanner::build_findings(&html, patterns);

    // Main render; a failure here fails the whole request.
    let capture = render_scanner::run_render_capture(target).await?;

    // Bounded same-origin expansion merging into the static findings.
    let discovered = crawl_scanner::discover_same_origin(&capture.anchor_hrefs, &base);
    let crawled = crawl_scanner::expand(&client, &discovered, patterns, &mut findings).await;

    // Best-effort probes; each degrades to its default on failure.
    let ssl = ssl_scanner::run_ssl_scan(target).await;
    let consent = consent_scanner::run_consent_scan(target).await;
    let privacy = consent_scanner::run_privacy_link_scan(target).await;

    let request_urls: Vec<String> = capture.requests.iter().map(|r| r.url.clone()).collect();
    let categorized =
        final_categorization(&findings.categorized, &capture.requests, &base, &consent, patterns);
    let tools =
        tool_scanner::detect_tools(&request_urls, categorized.consent_present, &VENDOR_SIGNATURES);
    let external_pixels = tool_scanner::collect_external_pixels(&request_urls);
    let (score, score_breakdown) = score::compute_score(&categorized);

    let tips = finalize_tips(findings.tips, &privacy);

    let stats = build_stats(target, &crawled, &capture.requests, &base, ssl, capture.cookies.len(), patterns);

    info!(score, pages = stats.pages_scanned, tools = tools.len(), "Compliance scan finished.");
    Ok(ComplianceReport {
        url: target.to_string(),
        indicators: findings.indicators,
        scripts: findings.scripts,
        links: findings.links,
        wp: findings.wordpress,
        categorized,
        tips,
        score,
        score_breakdown,
        cookies: capture.cookies,
        tools,
        external_pixels,
        stats,
        fingerprint: capture.fingerprint,
        privacy,
    })
}

/// The documented precedence contract between the two detection passes.
///
/// Headline categorization prefers *loaded* evidence: the tracker, Google
/// and critical-tool flags are recomputed from the URLs the browser actually
/// requested, and the external-files flag from cross-origin script or
/// stylesheet requests. A resource that is merely referenced in markup but
/// never loaded does not set a headline flag; its static detection stays
/// visible in `indicators` and `tips`. Consent is the one additive case:
/// either pass may establish it, since CMP markup can be server-delivered or
/// script-injected.
pub fn final_categorization(
    static_pass: &CategorizedFindings,
    requests: &[CapturedRequest],
    base: &Url,
    consent: &ConsentEvaluation,
    patterns: &PatternSet,
) -> CategorizedFindings {
    let trackers_loaded = requests
        .iter()
        .any(|r| signatures::matches_any(&patterns.trackers, &r.url));
    let google_loaded = requests
        .iter()
        .any(|r| signatures::matches_any(&patterns.google_tools, &r.url));
    let critical_loaded = requests
        .iter()
        .any(|r| signatures::matches_any(&patterns.critical_tools, &r.url));
    let external_loaded = requests.iter().any(|r| {
        (r.resource_type == "script" || r.resource_type == "stylesheet")
            && is_cross_origin(&r.url, base)
    });

    debug!(
        trackers_loaded,
        google_loaded, critical_loaded, external_loaded, "Final categorization computed."
    );

    CategorizedFindings {
        tracking_cookies: trackers_loaded,
        trackers: trackers_loaded,
        google_tools: google_loaded,
        critical_tools: critical_loaded,
        external_files: external_loaded,
        consent_present: static_pass.consent_present || consent.found,
    }
}

/// The static pass always proposes reviewing the privacy policy; the tip
/// survives only when the rendered pages exposed no policy link, and appears
/// exactly once even after crawl merging.
fn finalize_tips(
    mut tips: Vec<String>,
    privacy: &crate::core::models::PrivacyPolicyCheck,
) -> Vec<String> {
    tips.retain(|tip| tip != static_scanner::PRIVACY_POLICY_TIP);
    if !privacy.present {
        tips.push(static_scanner::PRIVACY_POLICY_TIP.to_string());
    }
    tips
}

fn is_cross_origin(url: &str, base: &Url) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            (parsed.scheme() == "http" || parsed.scheme() == "https")
                && parsed.origin() != base.origin()
        }
        Err(_) => false,
    }
}

fn build_stats(
    target: &str,
    crawled: &[String],
    requests: &[CapturedRequest],
    base: &Url,
    ssl: crate::core::models::SslInfo,
    cookies_count: usize,
    patterns: &PatternSet,
) -> ScanStats {
    let scripts_count = requests.iter().filter(|r| r.resource_type == "script").count() as u32;
    let images_count = requests.iter().filter(|r| r.resource_type == "image").count() as u32;
    let trackers_count = requests
        .iter()
        .filter(|r| signatures::matches_any(&patterns.trackers, &r.url))
        .count();
    let external_files_count = requests
        .iter()
        .filter(|r| is_cross_origin(&r.url, base))
        .count();

    let pages_sample: Vec<String> = std::iter::once(target.to_string())
        .chain(crawled.iter().cloned())
        .take(MAX_PAGES_SAMPLE)
        .collect();

    ScanStats {
        ssl,
        pages_scanned: 1 + crawled.len(),
        pages_sample,
        scripts_count,
        images_count,
        trackers_count,
        external_files_count,
        cookies_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, resource_type: &str) -> CapturedRequest {
        CapturedRequest {
            url: url.to_string(),
            resource_type: resource_type.to_string(),
            status: 200,
        }
    }

    #[test]
    fn target_validation_requires_http_scheme() {
        assert!(is_valid_target("https://example.com"));
        assert!(is_valid_target("HTTP://example.com"));
        assert!(!is_valid_target("example.com"));
        assert!(!is_valid_target("ftp://example.com"));
        assert!(!is_valid_target(""));
    }

    #[test]
    fn referenced_but_never_loaded_tracker_does_not_set_headline_flag() {
        let static_pass = CategorizedFindings {
            tracking_cookies: true,
            trackers: true,
            google_tools: true,
            ..Default::default()
        };
        let base = Url::parse("https://example.com/").unwrap();
        let final_flags = final_categorization(
            &static_pass,
            &[], // nothing was actually loaded
            &base,
            &ConsentEvaluation::default(),
            &DEFAULT_PATTERNS,
        );
        assert!(!final_flags.trackers);
        assert!(!final_flags.google_tools);
    }

    #[test]
    fn loaded_tracker_sets_headline_flag_even_without_static_hit() {
        let base = Url::parse("https://example.com/").unwrap();
        let requests = vec![request(
            "https://www.googletagmanager.com/gtm.js?id=GTM-AAAA",
            "script",
        )];
        let final_flags = final_categorization(
            &CategorizedFindings::default(),
            &requests,
            &base,
            &ConsentEvaluation::default(),
            &DEFAULT_PATTERNS,
        );
        assert!(final_flags.trackers);
        assert!(final_flags.tracking_cookies);
        assert!(final_flags.google_tools);
    }

    #[test]
    fn external_files_require_cross_origin_script_or_stylesheet() {
        let base = Url::parse("https://example.com/").unwrap();
        let same_origin = vec![request("https://example.com/app.js", "script")];
        let cross_image = vec![request("https://cdn.example.net/logo.png", "image")];
        let cross_css = vec![request("https://cdn.example.net/site.css", "stylesheet")];

        let flags = |reqs: &[CapturedRequest]| {
            final_categorization(
                &CategorizedFindings::default(),
                reqs,
                &base,
                &ConsentEvaluation::default(),
                &DEFAULT_PATTERNS,
            )
        };
        assert!(!flags(&same_origin).external_files);
        assert!(!flags(&cross_image).external_files);
        assert!(flags(&cross_css).external_files);
    }

    #[test]
    fn consent_is_additive_across_both_passes() {
        let base = Url::parse("https://example.com/").unwrap();
        let static_consent = CategorizedFindings {
            consent_present: true,
            ..Default::default()
        };
        let rendered_consent = ConsentEvaluation {
            found: true,
            has_tcf: false,
        };

        let from_static = final_categorization(
            &static_consent,
            &[],
            &base,
            &ConsentEvaluation::default(),
            &DEFAULT_PATTERNS,
        );
        let from_render = final_categorization(
            &CategorizedFindings::default(),
            &[],
            &base,
            &rendered_consent,
            &DEFAULT_PATTERNS,
        );
        assert!(from_static.consent_present);
        assert!(from_render.consent_present);
    }

    #[test]
    fn privacy_tip_survives_only_without_a_policy_link() {
        use crate::core::models::PrivacyPolicyCheck;
        let tips = vec![
            "Some other tip".to_string(),
            static_scanner::PRIVACY_POLICY_TIP.to_string(),
            static_scanner::PRIVACY_POLICY_TIP.to_string(),
        ];

        let with_link = finalize_tips(
            tips.clone(),
            &PrivacyPolicyCheck {
                present: true,
                url: Some("https://example.com/privacy".to_string()),
            },
        );
        assert!(!with_link.iter().any(|t| t == static_scanner::PRIVACY_POLICY_TIP));
        assert!(with_link.iter().any(|t| t == "Some other tip"));

        let without_link = finalize_tips(tips, &PrivacyPolicyCheck::default());
        assert_eq!(
            without_link
                .iter()
                .filter(|t| *t == static_scanner::PRIVACY_POLICY_TIP)
                .count(),
            1
        );
    }

    #[test]
    fn stats_count_by_resource_type_and_origin() {
        let base = Url::parse("https://example.com/").unwrap();
        let requests = vec![
            request("https://example.com/app.js", "script"),
            request("https://cdn.example.net/lib.js", "script"),
            request("https://example.com/logo.png", "image"),
            request("https://www.google-analytics.com/analytics.js", "script"),
        ];
        let stats = build_stats(
            "https://example.com/",
            &["https://example.com/about".to_string()],
            &requests,
            &base,
            Default::default(),
            3,
            &DEFAULT_PATTERNS,
        );
        assert_eq!(stats.scripts_count, 3);
        assert_eq!(stats.images_count, 1);
        assert_eq!(stats.trackers_count, 1);
        assert_eq!(stats.external_files_count, 2);
        assert_eq!(stats.pages_scanned, 2);
        assert_eq!(stats.cookies_count, 3);
        assert_eq!(
            stats.pages_sample,
            vec!["https://example.com/", "https://example.com/about"]
        );
    }

    #[test]
    fn pages_sample_is_capped_at_twenty() {
        let base = Url::parse("https://example.com/").unwrap();
        let crawled: Vec<String> = (0..30).map(|i| format!("https://example.com/p{i}")).collect();
        let stats = build_stats(
            "https://example.com/",
            &crawled,
            &[],
            &base,
            Default::default(),
            0,
            &DEFAULT_PATTERNS,
        );
        assert_eq!(stats.pages_sample.len(), MAX_PAGES_SAMPLE);
        assert_eq!(stats.pages_scanned, 31);
    }
}
