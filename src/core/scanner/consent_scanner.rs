// src/core/scanner/consent_scanner.rs

//! Consent-manager and privacy-policy detection over the *rendered* page.
//!
//! Two independent secondary renders: CMPs routinely inject their markup via
//! script, so the server-delivered HTML alone underreports consent tooling.
//! Both probes are best-effort and degrade to their `Default` negatives on
//! any failure; neither can fail the scan.

use crate::core::error::Result;
use crate::core::models::{ConsentEvaluation, PrivacyPolicyCheck};
use crate::core::scanner::render_scanner::{evaluate_json, launch_browser};
use crate::core::signatures::{CMP_HINT_SOURCES, PRIVACY_LINK_SOURCES};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::timeout;
use tracing::{info, warn};

const SECONDARY_RENDER_TIMEOUT: Duration = Duration::from_secs(30);
const VIEWPORT: (u32, u32) = (1366, 900);

/// Renders the target and tests the live DOM plus the `window.__tcfapi`
/// hook against the CMP signature registry.
pub async fn run_consent_scan(target: &str) -> ConsentEvaluation {
    info!(target, "Starting consent-manager render.");
    let url = target.to_string();
    let task = spawn_blocking(move || perform_consent_eval(&url));

    match timeout(SECONDARY_RENDER_TIMEOUT, task).await {
        Ok(Ok(Ok(result))) => {
            info!(found = result.found, has_tcf = result.has_tcf, "Consent render finished.");
            result
        }
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "Consent render failed, assuming no consent manager.");
            ConsentEvaluation::default()
        }
        Ok(Err(e)) => {
            warn!(panic = %e, "Consent render task panicked, assuming no consent manager.");
            ConsentEvaluation::default()
        }
        Err(_) => {
            warn!(target, "Consent render timed out, assuming no consent manager.");
            ConsentEvaluation::default()
        }
    }
}

/// Renders the target and scans anchor text and hrefs for privacy-policy
/// phrases, returning the first match resolved against the page origin.
pub async fn run_privacy_link_scan(target: &str) -> PrivacyPolicyCheck {
    info!(target, "Starting privacy-link render.");
    let url = target.to_string();
    let task = spawn_blocking(move || perform_privacy_eval(&url));

    match timeout(SECONDARY_RENDER_TIMEOUT, task).await {
        Ok(Ok(Ok(result))) => {
            info!(present = result.present, url = ?result.url, "Privacy-link render finished.");
            result
        }
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "Privacy-link render failed, assuming no policy link.");
            PrivacyPolicyCheck::default()
        }
        Ok(Err(e)) => {
            warn!(panic = %e, "Privacy-link render task panicked, assuming no policy link.");
            PrivacyPolicyCheck::default()
        }
        Err(_) => {
            warn!(target, "Privacy-link render timed out, assuming no policy link.");
            PrivacyPolicyCheck::default()
        }
    }
}

fn perform_consent_eval(target: &str) -> Result<ConsentEvaluation> {
    let browser = launch_browser(VIEWPORT)?;
    let tab = browser
        .new_tab()
        .map_err(super::render_scanner::browser_err)?;
    tab.set_default_timeout(SECONDARY_RENDER_TIMEOUT);
    tab.navigate_to(target)
        .map_err(super::render_scanner::browser_err)?;
    tab.wait_until_navigated()
        .map_err(super::render_scanner::browser_err)?;

    evaluate_json(&tab, &consent_eval_js())
}

fn perform_privacy_eval(target: &str) -> Result<PrivacyPolicyCheck> {
    let browser = launch_browser(VIEWPORT)?;
    let tab = browser
        .new_tab()
        .map_err(super::render_scanner::browser_err)?;
    tab.set_default_timeout(SECONDARY_RENDER_TIMEOUT);
    tab.navigate_to(target)
        .map_err(super::render_scanner::browser_err)?;
    tab.wait_until_navigated()
        .map_err(super::render_scanner::browser_err)?;

    evaluate_json(&tab, &privacy_eval_js())
}

fn js_regex_array(sources: &[&str]) -> String {
    sources
        .iter()
        .map(|src| format!("/{src}/i"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// In-page CMP test generated from the signature registry.
fn consent_eval_js() -> String {
    format!(
        r#"
JSON.stringify((function () {{
  var html = document.documentElement ? document.documentElement.innerHTML : '';
  var hints = [{hints}];
  var hasTcf = typeof window.__tcfapi === 'function';
  var found = hasTcf || hints.some(function (re) {{ return re.test(html); }});
  return {{ found: found, hasTcf: hasTcf }};
}})())
"#,
        hints = js_regex_array(CMP_HINT_SOURCES)
    )
}

/// In-page privacy-link search generated from the phrase registry.
fn privacy_eval_js() -> String {
    format!(
        r#"
JSON.stringify((function () {{
  var patterns = [{patterns}];
  var anchors = Array.from(document.querySelectorAll('a[href]'));
  for (var i = 0; i < anchors.length; i++) {{
    var text = (anchors[i].textContent || '').trim();
    var href = (anchors[i].getAttribute('href') || '').trim();
    var hit = patterns.some(function (re) {{ return re.test(text) || re.test(href); }});
    if (hit) {{
      var resolved;
      try {{ resolved = new URL(href, location.origin).toString(); }} catch (e) {{ resolved = href; }}
      return {{ present: true, url: resolved }};
    }}
  }}
  return {{ present: false, url: null }};
}})())
"#,
        patterns = js_regex_array(PRIVACY_LINK_SOURCES)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_consent_script_embeds_every_cmp_hint() {
        let js = consent_eval_js();
        for hint in CMP_HINT_SOURCES {
            assert!(js.contains(hint), "hint {hint} missing from script");
        }
        assert!(js.contains("__tcfapi"));
    }

    #[test]
    fn generated_privacy_script_covers_locale_spellings() {
        let js = privacy_eval_js();
        assert!(js.contains("datenschutz"));
        assert!(js.contains("privacy\\s*policy"));
    }
}
