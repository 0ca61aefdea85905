// src/core/scanner/crawl_scanner.rs

//! Bounded same-origin crawl expansion. Re-runs the static pass over a small
//! set of pages discovered in the rendered DOM and folds the results into
//! the aggregate findings. Strictly best-effort: a failing sub-fetch is
//! dropped, never escalated.

use crate::core::models::StaticFindings;
use crate::core::scanner::static_scanner;
use crate::core::signatures::PatternSet;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Crawl expansion never explores more than this many discovered URLs.
pub const MAX_CRAWL_PAGES: usize = 8;

/// Resolves rendered-DOM anchor hrefs against the page origin and keeps the
/// absolute same-origin results, deduplicated, capped at [`MAX_CRAWL_PAGES`].
/// The start page itself is excluded.
pub fn discover_same_origin(hrefs: &[String], base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut discovered = Vec::new();

    for href in hrefs {
        if discovered.len() >= MAX_CRAWL_PAGES {
            break;
        }
        let Some(resolved) = resolve_href(base, href) else {
            continue;
        };
        if resolved.origin() != base.origin() {
            continue;
        }
        let resolved = resolved.to_string();
        if resolved == base.as_str() {
            continue;
        }
        if seen.insert(resolved.clone()) {
            discovered.push(resolved);
        }
    }

    debug!(candidates = hrefs.len(), kept = discovered.len(), "Same-origin discovery complete.");
    discovered
}

/// Fetches each discovered URL sequentially, re-runs the static pass and
/// merges scripts, links and indicators (deduplicated) into `findings`.
/// Returns the URLs that were actually fetched successfully.
pub async fn expand(
    client: &reqwest::Client,
    urls: &[String],
    patterns: &PatternSet,
    findings: &mut StaticFindings,
) -> Vec<String> {
    let mut crawled = Vec::new();

    for url in urls {
        match static_scanner::fetch_page(client, url).await {
            Ok(html) => {
                let page = static_scanner::build_findings(&html, patterns);
                merge_dedup(&mut findings.scripts, page.scripts);
                merge_dedup(&mut findings.links, page.links);
                merge_dedup(&mut findings.indicators, page.indicators);
                crawled.push(url.clone());
            }
            Err(e) => {
                // Isolated: one bad sub-page must not fail the scan.
                warn!(url, error = %e, "Crawl sub-fetch failed, skipping page.");
            }
        }
    }

    info!(requested = urls.len(), crawled = crawled.len(), "Crawl expansion finished.");
    crawled
}

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    // Skip non-navigational hrefs outright.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

fn merge_dedup(into: &mut Vec<String>, additions: Vec<String>) {
    let mut seen: HashSet<String> = into.iter().cloned().collect();
    for item in additions {
        if seen.insert(item.clone()) {
            into.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/start").unwrap()
    }

    #[test]
    fn keeps_only_absolute_same_origin_urls() {
        let hrefs = vec![
            "/about".to_string(),
            "https://example.com/contact".to_string(),
            "https://other.example.net/x".to_string(),
            "http://example.com/insecure".to_string(), // different scheme => different origin
            "mailto:privacy@example.com".to_string(),
            "javascript:void(0)".to_string(),
            "#top".to_string(),
        ];
        let discovered = discover_same_origin(&hrefs, &base());
        assert_eq!(
            discovered,
            vec!["https://example.com/about", "https://example.com/contact"]
        );
    }

    #[test]
    fn deduplicates_and_strips_fragments() {
        let hrefs = vec![
            "/about".to_string(),
            "/about#team".to_string(),
            "https://example.com/about".to_string(),
        ];
        let discovered = discover_same_origin(&hrefs, &base());
        assert_eq!(discovered, vec!["https://example.com/about"]);
    }

    #[test]
    fn caps_discovery_at_eight_urls() {
        let hrefs: Vec<String> = (0..40).map(|i| format!("/page-{i}")).collect();
        let discovered = discover_same_origin(&hrefs, &base());
        assert_eq!(discovered.len(), MAX_CRAWL_PAGES);
    }

    #[test]
    fn excludes_the_start_page_itself() {
        let hrefs = vec!["https://example.com/start".to_string()];
        assert!(discover_same_origin(&hrefs, &base()).is_empty());
    }

    #[test]
    fn merge_dedup_preserves_existing_order() {
        let mut into = vec!["a".to_string(), "b".to_string()];
        merge_dedup(&mut into, vec!["b".to_string(), "c".to_string(), "c".to_string()]);
        assert_eq!(into, vec!["a", "b", "c"]);
    }
}
