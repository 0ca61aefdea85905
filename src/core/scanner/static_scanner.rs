// src/core/scanner/static_scanner.rs

use crate::core::error::Result;
use crate::core::models::StaticFindings;
use crate::core::scanner::wordpress_scanner;
use crate::core::signatures::PatternSet;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

/// Tip texts referenced again by the aggregator, kept as constants so the
/// privacy-policy dedup can compare by equality instead of substring guessing.
pub const PRIVACY_POLICY_TIP: &str = "Review your privacy policy: purposes, legal bases, recipients, retention periods, data subject rights.";
pub const PROCESSING_RECORD_TIP: &str =
    "Maintain a record of processing activities (GDPR Art. 30).";

static RE_PLAIN_HTTP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^http://").unwrap());

/// Fetches one page following redirects and returns its body as text.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!(url, "Fetching page for static analysis.");
    let response = client.get(url).send().await?;
    debug!(url, status = %response.status(), "Received static response.");
    Ok(response.text().await?)
}

/// Pulls script `src` and link `href` URLs from the parsed document, in
/// document order, without deduplication. Downstream consumers decide
/// whether to deduplicate.
pub fn extract_resources(document: &Html) -> (Vec<String>, Vec<String>) {
    let mut scripts = Vec::new();
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("script[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                if !src.is_empty() {
                    scripts.push(src.to_string());
                }
            }
        }
    }
    if let Ok(selector) = Selector::parse("link[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if !href.is_empty() {
                    links.push(href.to_string());
                }
            }
        }
    }

    (scripts, links)
}

/// Runs the full static pass over one server-delivered document: resource
/// extraction, signature classification, WordPress sub-detection, and the
/// human-readable indicators and tips derived from the text-level evidence.
pub fn build_findings(html: &str, patterns: &PatternSet) -> StaticFindings {
    let document = Html::parse_document(html);
    let (scripts, links) = extract_resources(&document);

    // Single concatenated blob: raw HTML plus every extracted resource URL.
    let mut blob = String::with_capacity(html.len() + 256);
    blob.push_str(html);
    for url in scripts.iter().chain(links.iter()) {
        blob.push('\n');
        blob.push_str(url);
    }

    let categorized = patterns.classify(&blob);
    debug!(
        trackers = categorized.trackers,
        google = categorized.google_tools,
        critical = categorized.critical_tools,
        external = categorized.external_files,
        consent = categorized.consent_present,
        "Static classification complete."
    );

    let mut indicators = Vec::new();
    if categorized.trackers {
        indicators.push("Trackers may load without consent".to_string());
    }
    if categorized.google_tools {
        indicators.push("Google tools in use, verify consent handling".to_string());
    }
    if categorized.critical_tools {
        indicators.push("Critical third-party tools detected, review processor agreements".to_string());
    }
    if categorized.external_files {
        indicators.push("External files loaded, verify their origin".to_string());
    }
    if !categorized.consent_present {
        indicators.push("No consent manager found".to_string());
    }

    let mut tips = Vec::new();
    if categorized.trackers || categorized.google_tools {
        tips.push("Gate trackers behind consent before they load (TCF 2.2 / CMP).".to_string());
    }
    if !categorized.consent_present {
        tips.push(
            "Integrate a consent management platform (e.g. Sourcepoint, OneTrust, Cookiebot)."
                .to_string(),
        );
    }
    if categorized.external_files {
        tips.push("Apply Subresource Integrity and review third-country transfers.".to_string());
    }
    if categorized.critical_tools {
        tips.push(
            "Conclude data processing agreements and document the processing in your records."
                .to_string(),
        );
    }
    if scripts.iter().any(|s| RE_PLAIN_HTTP.is_match(s)) {
        tips.push("Load resources over HTTPS only (no mixed content).".to_string());
    }

    let wordpress = wordpress_scanner::detect(html, &blob);

    // Baseline guidance independent of what matched. The privacy-policy tip
    // is re-evaluated by the aggregator once the rendered privacy-link check
    // has run.
    tips.push(PROCESSING_RECORD_TIP.to_string());
    tips.push(PRIVACY_POLICY_TIP.to_string());
    if !categorized.consent_present {
        tips.push(
            "Obtain consent before loading non-essential services; design banners and overlays accordingly."
                .to_string(),
        );
    }

    info!(
        scripts = scripts.len(),
        links = links.len(),
        indicators = indicators.len(),
        "Static pass finished."
    );

    StaticFindings {
        categorized,
        indicators,
        tips,
        scripts,
        links,
        wordpress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signatures::DEFAULT_PATTERNS;

    const GTM_PAGE: &str = r#"<html><head>
        <script src="https://www.googletagmanager.com/gtm.js?id=GTM-XYZ"></script>
        <link href="https://cdn.example.net/site.css" rel="stylesheet">
        </head><body><a href="/imprint">Imprint</a></body></html>"#;

    #[test]
    fn resources_are_extracted_in_document_order_without_dedup() {
        let html = r#"<script src="/a.js"></script><script src="/b.js"></script>
                      <script src="/a.js"></script><link href="/style.css">"#;
        let document = Html::parse_document(html);
        let (scripts, links) = extract_resources(&document);
        assert_eq!(scripts, vec!["/a.js", "/b.js", "/a.js"]);
        assert_eq!(links, vec!["/style.css"]);
    }

    #[test]
    fn gtm_without_consent_yields_google_indicator_and_missing_consent() {
        let findings = build_findings(GTM_PAGE, &DEFAULT_PATTERNS);
        assert!(findings.categorized.google_tools);
        assert!(!findings.categorized.consent_present);
        assert!(findings
            .indicators
            .iter()
            .any(|i| i.contains("Google tools")));
        assert!(findings
            .indicators
            .iter()
            .any(|i| i.contains("No consent manager")));
    }

    #[test]
    fn mixed_content_script_adds_https_tip() {
        let html = r#"<script src="http://legacy.example.org/old.js"></script>"#;
        let findings = build_findings(html, &DEFAULT_PATTERNS);
        assert!(findings.tips.iter().any(|t| t.contains("HTTPS only")));
    }

    #[test]
    fn baseline_tips_are_always_present() {
        let findings = build_findings("<html></html>", &DEFAULT_PATTERNS);
        assert!(findings.tips.iter().any(|t| t == PROCESSING_RECORD_TIP));
        assert_eq!(
            findings.tips.iter().filter(|t| *t == PRIVACY_POLICY_TIP).count(),
            1
        );
    }

    #[test]
    fn onetrust_page_is_both_critical_and_consenting() {
        let html = r#"<script src="https://cdn.cookielaw.org/scripttemplates/otSDKStub.js"></script>
                      <div class="onetrust-cookieconsent-banner"></div>"#;
        let findings = build_findings(html, &DEFAULT_PATTERNS);
        assert!(findings.categorized.critical_tools);
        assert!(findings.categorized.consent_present);
    }
}
