// src/core/scanner/wordpress_scanner.rs

//! WordPress sub-detector. Works on the raw markup rather than the parsed
//! DOM: path signatures survive minification and can hide inside comments or
//! inline scripts where a DOM walk would not reach them.

use crate::core::models::WordPressReport;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

static RE_WP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)wp-content|wp-includes|<meta[^>]+name=["']generator["'][^>]+WordPress"#)
        .unwrap()
});
static RE_GENERATOR_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+name=["']generator["'][^>]*content=["']([^"']*)["']"#).unwrap()
});
static RE_WP_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)WordPress\s+([\d.]+)").unwrap());
static RE_PLUGIN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)/wp-content/plugins/([^/'"\s?]+)"#).unwrap());
static RE_THEME_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)/wp-content/themes/([^/'"\s?]+)"#).unwrap());

static RE_CONTACT_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)contact-form-7").unwrap());
static RE_WOOCOMMERCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)woocommerce").unwrap());
static RE_WORDFENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)wordfence").unwrap());

/// Captures every slug matched by `re` over the whole document,
/// deduplicated in first-seen order.
fn collect_slugs(re: &Regex, html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut slugs = Vec::new();
    for caps in re.captures_iter(html) {
        if let Some(slug) = caps.get(1) {
            let slug = slug.as_str().to_string();
            if seen.insert(slug.clone()) {
                slugs.push(slug);
            }
        }
    }
    slugs
}

/// Inspects raw HTML for WordPress signatures, extracting version,
/// plugin/theme slugs and heuristic compliance notes.
///
/// `blob` is the concatenated text the pattern matcher also sees (raw HTML
/// plus resource URLs); high-impact plugin hints are tested against it so
/// externally referenced plugin assets count too.
pub fn detect(html: &str, blob: &str) -> WordPressReport {
    let is_wordpress = RE_WP_MARKER.is_match(html);

    let version = RE_GENERATOR_CONTENT
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|content| RE_WP_VERSION.captures(content.as_str()))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let plugins = collect_slugs(&RE_PLUGIN_PATH, html);
    let themes = collect_slugs(&RE_THEME_PATH, html);

    let mut notes = Vec::new();
    if is_wordpress {
        debug!(
            version = ?version,
            plugins = plugins.len(),
            themes = themes.len(),
            "WordPress detected."
        );
        if plugins.is_empty() {
            notes.push(
                "No plugins detected; resources may be bundled or minified.".to_string(),
            );
        }
        if themes.is_empty() {
            notes.push(
                "No theme detected; paths may be rewritten by caching or a proxy.".to_string(),
            );
        }
        if RE_CONTACT_FORM.is_match(blob) {
            notes.push(
                "Contact Form 7 detected; review data collection and third-country transfers."
                    .to_string(),
            );
        }
        if RE_WOOCOMMERCE.is_match(blob) {
            notes.push(
                "WooCommerce detected; review payment/tracking integrations and processor agreements."
                    .to_string(),
            );
        }
        if RE_WORDFENCE.is_match(blob) {
            notes.push(
                "Wordfence detected; review IP storage and log retention.".to_string(),
            );
        }
    }

    WordPressReport {
        is_wordpress,
        version,
        plugins,
        themes,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_wordpress_from_path_signature() {
        let html = r#"<link href="/wp-content/themes/astra/style.css">"#;
        let report = detect(html, html);
        assert!(report.is_wordpress);
        assert_eq!(report.themes, vec!["astra"]);
    }

    #[test]
    fn extracts_version_from_generator_meta() {
        let html = r#"<meta name="generator" content="WordPress 6.4.2">"#;
        let report = detect(html, html);
        assert!(report.is_wordpress);
        assert_eq!(report.version.as_deref(), Some("6.4.2"));
    }

    #[test]
    fn plugin_slugs_are_deduplicated_in_first_seen_order() {
        let html = r#"
            <script src="/wp-content/plugins/contact-form-7/includes/js/index.js"></script>
            <link href="/wp-content/plugins/woocommerce/assets/css/woocommerce.css">
            <script src="/wp-content/plugins/contact-form-7/includes/js/swv.js"></script>
        "#;
        let report = detect(html, html);
        assert_eq!(report.plugins, vec!["contact-form-7", "woocommerce"]);
    }

    #[test]
    fn high_impact_plugins_produce_named_notes() {
        let html = r#"
            <script src="/wp-content/plugins/contact-form-7/x.js"></script>
            <script src="/wp-content/plugins/woocommerce/x.js"></script>
            <script src="/wp-content/plugins/wordfence/x.js"></script>
        "#;
        let report = detect(html, html);
        assert!(report.notes.iter().any(|n| n.contains("Contact Form 7")));
        assert!(report.notes.iter().any(|n| n.contains("WooCommerce")));
        assert!(report.notes.iter().any(|n| n.contains("Wordfence")));
    }

    #[test]
    fn missing_plugins_and_theme_yield_heuristic_notes() {
        let html = r#"<meta name="generator" content="WordPress 6.0">"#;
        let report = detect(html, html);
        assert!(report.notes.iter().any(|n| n.contains("No plugins")));
        assert!(report.notes.iter().any(|n| n.contains("No theme")));
    }

    #[test]
    fn non_wordpress_page_yields_empty_report() {
        let report = detect("<html><body>plain</body></html>", "");
        assert!(!report.is_wordpress);
        assert!(report.version.is_none());
        assert!(report.notes.is_empty());
    }
}
