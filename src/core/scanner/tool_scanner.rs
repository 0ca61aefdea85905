// src/core/scanner/tool_scanner.rs

use crate::core::models::ToolMatch;
use crate::core::signatures::{self, VendorSignature};
use tracing::debug;

/// Sample URLs retained per detected vendor.
pub const MAX_SAMPLE_URLS: usize = 5;
/// External-pixel URLs retained in the report.
pub const MAX_EXTERNAL_PIXELS: usize = 30;

/// Maps captured request URLs onto the vendor registry. Registry entries
/// with zero matching URLs are omitted; `nonCompliant` is derived from the
/// final consent flag.
pub fn detect_tools(
    request_urls: &[String],
    consent_present: bool,
    vendors: &[VendorSignature],
) -> Vec<ToolMatch> {
    let mut tools = Vec::new();

    for vendor in vendors {
        let matches: Vec<String> = request_urls
            .iter()
            .filter(|url| vendor.pattern.is_match(url))
            .take(MAX_SAMPLE_URLS)
            .cloned()
            .collect();
        if matches.is_empty() {
            continue;
        }
        debug!(vendor = vendor.name, samples = matches.len(), "Vendor matched.");
        tools.push(ToolMatch {
            name: vendor.name.to_string(),
            matches,
            requires_consent: vendor.requires_consent,
            non_compliant: vendor.requires_consent && !consent_present,
            category: vendor.category.to_string(),
        });
    }

    tools
}

/// Collects tracking-pixel-ish request URLs, capped at
/// [`MAX_EXTERNAL_PIXELS`].
pub fn collect_external_pixels(request_urls: &[String]) -> Vec<String> {
    request_urls
        .iter()
        .filter(|url| signatures::EXTERNAL_PIXEL.is_match(url))
        .take(MAX_EXTERNAL_PIXELS)
        .cloned()
        .collect()
}
