// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Wire names follow the report JSON consumed by the frontend, hence the
// camelCase renames throughout.

/// Headline categorization flags. After the full pipeline these reflect
/// *loaded* (request-level) evidence; during the static pass they reflect
/// *referenced* (text-level) evidence only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedFindings {
    pub tracking_cookies: bool,
    pub trackers: bool,
    pub google_tools: bool,
    pub critical_tools: bool,
    pub external_files: bool,
    pub consent_present: bool,
}

/// Everything the static pass learns from one fetched document, later
/// extended by the crawl expander.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFindings {
    pub categorized: CategorizedFindings,
    pub indicators: Vec<String>,
    pub tips: Vec<String>,
    pub scripts: Vec<String>,
    pub links: Vec<String>,
    pub wordpress: WordPressReport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordPressReport {
    #[serde(rename = "isWordPress")]
    pub is_wordpress: bool,
    pub version: Option<String>,
    /// Plugin slugs, first-seen order, deduplicated.
    pub plugins: Vec<String>,
    /// Theme slugs, first-seen order, deduplicated.
    pub themes: Vec<String>,
    pub notes: Vec<String>,
}

/// One completed network request observed during the main render.
/// Ordering in the capture list is completion order, not request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub url: String,
    /// Lowercase resource-type tag as reported by the browser
    /// ("script", "stylesheet", "image", "xhr", ...).
    #[serde(rename = "type")]
    pub resource_type: String,
    pub status: u16,
}

/// Snapshot of one browser cookie after the main render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCookie {
    pub name: String,
    pub domain: String,
    pub path: String,
    /// Expiry as epoch seconds; -1 for session cookies.
    pub expires: f64,
    pub session: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
}

/// Client-side environment as reported by an in-page script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFingerprint {
    pub language: String,
    pub platform: String,
    pub user_agent: String,
    pub screen: ScreenInfo,
    pub timezone_minutes: i32,
    pub touch: bool,
    pub cookies_enabled: bool,
    /// First 10 plugin names, truncated in-page.
    pub plugins: Vec<String>,
}

/// Raw output of the dynamic capture controller for one render session.
#[derive(Debug, Clone, Default)]
pub struct RenderCapture {
    pub requests: Vec<CapturedRequest>,
    pub cookies: Vec<PageCookie>,
    pub fingerprint: ClientFingerprint,
    /// Anchor hrefs harvested from the rendered DOM, fed to the crawl expander.
    pub anchor_hrefs: Vec<String>,
}

/// Best-effort TLS posture. `Default` is the degraded "no SSL observed"
/// value; the inspector never fails the scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslInfo {
    #[serde(rename = "hasSSL")]
    pub has_ssl: bool,
    pub issuer: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub cipher: Option<String>,
}

/// Secondary-render consent evaluation. `Default` is the degraded negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentEvaluation {
    pub found: bool,
    pub has_tcf: bool,
}

/// Secondary-render privacy-policy link check. `Default` is the degraded
/// negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyPolicyCheck {
    pub present: bool,
    pub url: Option<String>,
}

/// One vendor detected among the captured request URLs. Only emitted when at
/// least one URL matched; `matches` holds at most 5 samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMatch {
    pub name: String,
    pub matches: Vec<String>,
    pub requires_consent: bool,
    pub non_compliant: bool,
    pub category: String,
}

/// Every signed term of the score, independently inspectable. The score is
/// never a black box.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: i32,
    pub minus_trackers: i32,
    pub minus_google: i32,
    pub minus_critical: i32,
    pub minus_external: i32,
    pub plus_consent: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub ssl: SslInfo,
    pub pages_scanned: usize,
    /// Scanned-page URLs, capped at 20 entries.
    pub pages_sample: Vec<String>,
    pub scripts_count: u32,
    pub images_count: u32,
    pub trackers_count: usize,
    pub external_files_count: usize,
    pub cookies_count: usize,
}

/// Top-level aggregate returned by `/scan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub url: String,
    pub indicators: Vec<String>,
    pub scripts: Vec<String>,
    pub links: Vec<String>,
    pub wp: WordPressReport,
    pub categorized: CategorizedFindings,
    pub tips: Vec<String>,
    pub score: u8,
    pub score_breakdown: ScoreBreakdown,
    pub cookies: Vec<PageCookie>,
    pub tools: Vec<ToolMatch>,
    /// Tracking-pixel-ish request URLs, capped at 30 entries.
    pub external_pixels: Vec<String>,
    pub stats: ScanStats,
    pub fingerprint: ClientFingerprint,
    pub privacy: PrivacyPolicyCheck,
}
