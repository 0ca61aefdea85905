// src/core/scanner/render_scanner.rs

//! Dynamic capture controller: drives an isolated headless-browser session,
//! records every completed network request for the lifetime of the
//! navigation, then snapshots cookies, the client fingerprint and the
//! rendered anchor set. Each invocation launches its own browser process;
//! dropping the `Browser` terminates it on every exit path.

use crate::core::error::{Result, ScanError};
use crate::core::models::{CapturedRequest, ClientFingerprint, PageCookie, RenderCapture};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::spawn_blocking;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Hard bound on the whole main render; exceeding it fails the scan request.
pub const MAIN_RENDER_TIMEOUT: Duration = Duration::from_secs(45);
/// Bound for the screenshot render, an independent failure domain.
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);
/// The page counts as settled once no request completed for this long.
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(1500);
/// Upper bound on waiting for quiet after navigation finished.
const NETWORK_QUIET_MAX_WAIT: Duration = Duration::from_secs(15);

const VIEWPORT: (u32, u32) = (1366, 900);

const FINGERPRINT_JS: &str = r#"
JSON.stringify({
  language: navigator.language || '',
  platform: navigator.platform || '',
  userAgent: navigator.userAgent || '',
  screen: {
    width: window.screen.width,
    height: window.screen.height,
    colorDepth: window.screen.colorDepth
  },
  timezoneMinutes: new Date().getTimezoneOffset(),
  touch: 'ontouchstart' in window,
  cookiesEnabled: navigator.cookieEnabled,
  plugins: (navigator.plugins ? Array.from(navigator.plugins).map(function (p) { return p.name; }).slice(0, 10) : [])
})
"#;

const ANCHOR_HREFS_JS: &str = r#"
JSON.stringify(Array.from(document.querySelectorAll('a[href]'))
  .map(function (el) { return (el.getAttribute('href') || '').trim(); })
  .filter(function (h) { return h.length > 0; }))
"#;

/// Renders the target and returns the captured network activity, the cookie
/// jar snapshot, the client fingerprint and the rendered anchor hrefs.
///
/// Timeout or navigation failure is a hard failure of the whole scan
/// request; there is no partial success here.
pub async fn run_render_capture(target: &str) -> Result<RenderCapture> {
    info!(target, "Starting main render.");
    let url = target.to_string();
    let task = spawn_blocking(move || perform_render(&url));

    match timeout(MAIN_RENDER_TIMEOUT, task).await {
        Err(_) => {
            warn!(target, "Main render exceeded the hard timeout.");
            Err(ScanError::RenderTimeout(MAIN_RENDER_TIMEOUT.as_secs()))
        }
        Ok(joined) => {
            let capture = joined??;
            info!(
                requests = capture.requests.len(),
                cookies = capture.cookies.len(),
                anchors = capture.anchor_hrefs.len(),
                "Main render finished."
            );
            Ok(capture)
        }
    }
}

fn perform_render(target: &str) -> Result<RenderCapture> {
    let browser = launch_browser(VIEWPORT)?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tab.set_default_timeout(MAIN_RENDER_TIMEOUT);

    // Request-scoped capture state; nothing survives past this session.
    let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let last_completed = Arc::new(Mutex::new(Instant::now()));
    {
        let requests = Arc::clone(&requests);
        let last_completed = Arc::clone(&last_completed);
        tab.register_response_handling(
            "request-capture",
            Box::new(move |params, _fetch_body| {
                let record = CapturedRequest {
                    url: params.response.url.clone(),
                    resource_type: format!("{:?}", params.Type).to_lowercase(),
                    status: params.response.status as u16,
                };
                if let Ok(mut list) = requests.lock() {
                    list.push(record);
                }
                if let Ok(mut stamp) = last_completed.lock() {
                    *stamp = Instant::now();
                }
            }),
        )
        .map_err(browser_err)?;
    }

    tab.navigate_to(target).map_err(browser_err)?;
    tab.wait_until_navigated().map_err(browser_err)?;
    wait_for_network_quiet(&last_completed);

    let cookies = tab
        .get_cookies()
        .map_err(browser_err)?
        .into_iter()
        .map(|c| PageCookie {
            name: c.name,
            domain: c.domain,
            path: c.path,
            expires: c.expires,
            session: c.session,
        })
        .collect();

    let fingerprint: ClientFingerprint = evaluate_json(&tab, FINGERPRINT_JS)?;
    let anchor_hrefs: Vec<String> = evaluate_json(&tab, ANCHOR_HREFS_JS)?;

    let requests = match requests.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    Ok(RenderCapture {
        requests,
        cookies,
        fingerprint,
        anchor_hrefs,
    })
}

/// Tolerant settle policy: wait for a short quiet period rather than zero
/// in-flight activity, bounded so chatty pages cannot stall the render.
fn wait_for_network_quiet(last_completed: &Arc<Mutex<Instant>>) {
    let deadline = Instant::now() + NETWORK_QUIET_MAX_WAIT;
    loop {
        if Instant::now() >= deadline {
            debug!("Network never went quiet within the settle bound, continuing.");
            return;
        }
        let last = match last_completed.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if last.elapsed() >= NETWORK_QUIET_WINDOW {
            return;
        }
        std::thread::sleep(Duration::from_millis(150));
    }
}

/// Captures a PNG screenshot of the target at the requested viewport.
/// Independent failure domain from `/scan`; 30 second bound.
pub async fn capture_screenshot(
    target: &str,
    width: u32,
    height: u32,
    full_page: bool,
) -> Result<Vec<u8>> {
    info!(target, width, height, full_page, "Starting screenshot render.");
    let url = target.to_string();
    let task = spawn_blocking(move || perform_screenshot(&url, width, height, full_page));

    match timeout(SCREENSHOT_TIMEOUT, task).await {
        Err(_) => Err(ScanError::RenderTimeout(SCREENSHOT_TIMEOUT.as_secs())),
        Ok(joined) => joined?,
    }
}

fn perform_screenshot(target: &str, width: u32, height: u32, full_page: bool) -> Result<Vec<u8>> {
    let browser = launch_browser((width, height))?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tab.set_default_timeout(SCREENSHOT_TIMEOUT);

    tab.navigate_to(target).map_err(browser_err)?;
    tab.wait_until_navigated().map_err(browser_err)?;
    // Late paints (fonts, lazy images) land within a short grace period.
    std::thread::sleep(Duration::from_millis(500));

    let clip = if full_page {
        let metrics = tab
            .call_method(Page::GetLayoutMetrics(None))
            .map_err(browser_err)?;
        let size = metrics.css_content_size;
        Some(Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
            scale: 1.0,
        })
    } else {
        None
    };

    tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, clip, true)
        .map_err(browser_err)
}

/// Launches an isolated headless browser with a fixed window size.
pub(crate) fn launch_browser(window_size: (u32, u32)) -> Result<Browser> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .window_size(Some(window_size))
        .idle_browser_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| ScanError::Browser(format!("invalid launch options: {e}")))?;
    Browser::new(options).map_err(|e| ScanError::Browser(format!("browser launch failed: {e}")))
}

/// Evaluates an in-page expression that returns a `JSON.stringify`d value
/// and deserializes it.
pub(crate) fn evaluate_json<T: DeserializeOwned>(tab: &Tab, expression: &str) -> Result<T> {
    let object = tab.evaluate(expression, false).map_err(browser_err)?;
    let value = object
        .value
        .ok_or_else(|| ScanError::Browser("in-page expression returned no value".to_string()))?;
    let text = value
        .as_str()
        .ok_or_else(|| ScanError::Browser("in-page expression returned a non-string".to_string()))?;
    serde_json::from_str(text)
        .map_err(|e| ScanError::Browser(format!("in-page result deserialization failed: {e}")))
}

pub(crate) fn browser_err(e: anyhow::Error) -> ScanError {
    ScanError::Browser(e.to_string())
}
