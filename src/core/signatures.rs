// src/core/signatures.rs

//! Immutable signature registries driving every heuristic in the scanner.
//!
//! Registries are plain data compiled once at first use. Scanner entry
//! points take them by reference, so tests can substitute fixture registries
//! without touching global state. Heuristic by design: false negatives are
//! acceptable, silence is not proof of compliance.

use crate::core::models::CategorizedFindings;
use once_cell::sync::Lazy;
use regex::Regex;

/// Scripts and endpoints of known tracking mechanisms.
const TRACKER_SOURCES: &[&str] = &[
    r"google-analytics\.com/analytics\.js",
    r"gtag\s*\(",
    r"googletagmanager\.com/gtm\.js",
    r"GTM-[A-Z0-9]+",
    r"googlesyndication\.com|adservice\.google\.com|doubleclick\.net",
    r"connect\.facebook\.net/",
    r"fbq\s*\(",
    r"facebook\.com/tr/",
    r"hotjar\.com/",
    r"hj\s*\(",
    r"clarity\.ms/",
    r"clarity\s*\(",
    r"matomo\.(js|php)",
    r"plausible\.io/",
    r"umami\.(js|is)",
    r"tiktok\.com/i18n/pixel",
    r"snap\.licdn\.com|px\.ads\.linkedin\.com",
];

/// Google-operated services that imply data transfer to Google.
const GOOGLE_TOOL_SOURCES: &[&str] = &[
    r"googletagmanager\.com",
    r"google-analytics\.com",
    r"recaptcha\.net|google\.com/recaptcha",
    r"googleapis\.com|gstatic\.com",
    r"maps\.googleapis\.com|maps\.google\.com",
];

/// Third-party tools with heavyweight processing implications
/// (processor agreements, data transfer reviews).
const CRITICAL_TOOL_SOURCES: &[&str] = &[
    r"cdn\.cookielaw\.org",
    r"cdn\.segment\.com",
    r"cdn\.sentry-cdn\.com|browser\.sentry-cdn\.com",
    r"intercomcdn\.com|widget\.intercom\.io",
    r"mixpanel\.com",
];

/// Externally hosted script/stylesheet references in markup.
const EXTERNAL_FILE_SOURCES: &[&str] = &[
    r"https?://[^\s]+\.(js|css)",
    r#"<link[^>]+href="https?://"#,
];

/// Consent-manager hints visible in server-delivered markup.
const CONSENT_HINT_SOURCES: &[&str] = &[
    r"cookie(consent|banner|notice)",
    r"tcfapi|__tcfapi",
    r"consent([-_])?manager",
];

/// CMP vendor and protocol signatures evaluated inside the *rendered* page.
/// JavaScript regex bodies; kept compatible with both regex dialects so the
/// same data can back Rust-side fixtures.
pub const CMP_HINT_SOURCES: &[&str] = &[
    "__tcfapi|tcfapi",
    "cookie(consent|banner|notice)",
    "consent[-_]?manager",
    "real[-_ ]?cookie[-_ ]?banner",
    "borlabs[-_ ]?cookie",
    "usercentrics",
    "onetrust",
    "cookieyes",
    "complianz",
];

/// Privacy-policy phrase patterns for anchor text and hrefs, covering both
/// German and English spellings.
pub const PRIVACY_LINK_SOURCES: &[&str] = &[
    "datenschutzerkl[aä]rung",
    "datenschutz",
    "privacy\\s*policy",
];

/// Tracking-pixel-ish request URLs (beacons, collectors, 1x1 gifs).
pub static EXTERNAL_PIXEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)pixel|track|collect|g\.gif|/generate_204").unwrap());

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|src| Regex::new(&format!("(?i){src}")).unwrap())
        .collect()
}

/// One category's worth of signatures plus the classification entry point.
///
/// A category is considered present when *any* of its signatures matches;
/// there is no short-circuit-order dependency and no state.
#[derive(Debug)]
pub struct PatternSet {
    pub trackers: Vec<Regex>,
    pub google_tools: Vec<Regex>,
    pub critical_tools: Vec<Regex>,
    pub external_files: Vec<Regex>,
    pub consent_hints: Vec<Regex>,
}

impl PatternSet {
    /// The built-in, versioned signature registry.
    pub fn builtin() -> Self {
        Self {
            trackers: compile(TRACKER_SOURCES),
            google_tools: compile(GOOGLE_TOOL_SOURCES),
            critical_tools: compile(CRITICAL_TOOL_SOURCES),
            external_files: compile(EXTERNAL_FILE_SOURCES),
            consent_hints: compile(CONSENT_HINT_SOURCES),
        }
    }

    /// Classifies a text blob (raw HTML plus extracted resource URLs)
    /// against every category. Pure predicate.
    pub fn classify(&self, text: &str) -> CategorizedFindings {
        let trackers = matches_any(&self.trackers, text);
        CategorizedFindings {
            tracking_cookies: trackers,
            trackers,
            google_tools: matches_any(&self.google_tools, text),
            critical_tools: matches_any(&self.critical_tools, text),
            external_files: matches_any(&self.external_files, text),
            consent_present: matches_any(&self.consent_hints, text),
        }
    }
}

pub fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

pub static DEFAULT_PATTERNS: Lazy<PatternSet> = Lazy::new(PatternSet::builtin);

/// One entry of the vendor registry applied to captured request URLs.
#[derive(Debug)]
pub struct VendorSignature {
    pub name: &'static str,
    pub pattern: Regex,
    pub requires_consent: bool,
    pub category: &'static str,
}

impl VendorSignature {
    fn new(name: &'static str, pattern: &str, requires_consent: bool, category: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
            requires_consent,
            category,
        }
    }
}

/// Known third-party vendors recognizable from loaded request URLs.
pub static VENDOR_SIGNATURES: Lazy<Vec<VendorSignature>> = Lazy::new(|| {
    vec![
        VendorSignature::new(
            "Google Fonts",
            r"(fonts\.googleapis\.com|fonts\.gstatic\.com)",
            true,
            "fonts",
        ),
        VendorSignature::new(
            "WordPress Stats (Jetpack)",
            r"pixel\.wp\.com/g\.gif",
            true,
            "analytics",
        ),
        VendorSignature::new(
            "AJAX CDN (Cloudflare)",
            r"(cdnjs\.cloudflare\.com|ajax\.cloudflare\.com)",
            true,
            "cdn",
        ),
        VendorSignature::new(
            "YouTube",
            r"(youtube\.com|youtu\.be|i\.ytimg\.com)",
            true,
            "video",
        ),
        VendorSignature::new("Vimeo", r"player\.vimeo\.com", true, "video"),
        VendorSignature::new("Gravatar", r"gravatar\.com/avatar", true, "avatars"),
    ]
});
