// src/server.rs

//! Thin HTTP layer over the scan engine. One route per operation, JSON in
//! and out, with the error shapes the frontend expects.

use crate::core::error::ScanError;
use crate::core::scanner::{self, render_scanner};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{error, info, warn};

const DEFAULT_SCREENSHOT_WIDTH: u32 = 1280;
const DEFAULT_SCREENSHOT_HEIGHT: u32 = 720;

/// Binds the listener and serves until the process is terminated.
pub async fn serve(addr: SocketAddr) -> Result<(), hyper::Error> {
    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, Infallible>(service_fn(route))
    });

    info!(%addr, "HTTP layer listening.");
    Server::bind(&addr).serve(make_svc).await
}

async fn route(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path().to_string();
    let query = parse_query(req.uri().query().unwrap_or(""));

    let response = match (req.method(), path.as_str()) {
        (&Method::GET, "/scan") | (&Method::GET, "/api/scan") => handle_scan(&query).await,
        (&Method::GET, "/screenshot") | (&Method::GET, "/api/screenshot") => {
            handle_screenshot(&query).await
        }
        (&Method::GET, "/health") | (&Method::GET, "/api/health") => handle_health(),
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" })),
    };

    Ok(response)
}

async fn handle_scan(query: &HashMap<String, String>) -> Response<Body> {
    let target = query.get("url").map(String::as_str).unwrap_or("");

    match scanner::run_compliance_scan(target).await {
        Ok(report) => match serde_json::to_vec(&report) {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap_or_else(|_| Response::new(Body::empty())),
            Err(e) => {
                error!(error = %e, "Report serialization failed.");
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({ "error": "Scan failed", "details": e.to_string() }),
                )
            }
        },
        Err(ScanError::InvalidUrl(_)) => {
            warn!(target, "Rejected scan request with invalid target.");
            json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": "Please provide a full URL including http(s)." }),
            )
        }
        Err(e) => {
            error!(target, error = %e, "Scan request failed.");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Scan failed", "details": e.to_string() }),
            )
        }
    }
}

async fn handle_screenshot(query: &HashMap<String, String>) -> Response<Body> {
    let target = query.get("url").map(String::as_str).unwrap_or("");
    if !scanner::is_valid_target(target) {
        warn!(target, "Rejected screenshot request with invalid target.");
        return json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Please provide a full URL including http(s)." }),
        );
    }

    let (width, height) = query
        .get("size")
        .and_then(|s| parse_size(s))
        .unwrap_or((DEFAULT_SCREENSHOT_WIDTH, DEFAULT_SCREENSHOT_HEIGHT));
    let full_page = query
        .get("fullPage")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    match render_scanner::capture_screenshot(target, width, height, full_page).await {
        Ok(png) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "image/png")
            .header("Cache-Control", "public, max-age=60")
            .body(Body::from(png))
            .unwrap_or_else(|_| Response::new(Body::empty())),
        Err(e) => {
            error!(target, error = %e, "Screenshot request failed.");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Screenshot failed", "details": e.to_string() }),
            )
        }
    }
}

fn handle_health() -> Response<Body> {
    json_response(StatusCode::OK, &json!({ "ok": true }))
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Parses a `WxH` viewport spec like `1366x900`.
fn parse_size(spec: &str) -> Option<(u32, u32)> {
    let (w, h) = spec.split_once('x')?;
    let width = w.trim().parse().ok().filter(|&v| v > 0)?;
    let height = h.trim().parse().ok().filter(|&v| v > 0)?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_spec_parses_width_by_height() {
        assert_eq!(parse_size("1366x900"), Some((1366, 900)));
        assert_eq!(parse_size("800x600"), Some((800, 600)));
    }

    #[test]
    fn malformed_size_specs_are_rejected() {
        assert_eq!(parse_size("1366"), None);
        assert_eq!(parse_size("x900"), None);
        assert_eq!(parse_size("0x600"), None);
        assert_eq!(parse_size("axb"), None);
    }

    #[test]
    fn query_strings_decode_into_pairs() {
        let q = parse_query("url=https%3A%2F%2Fexample.com&fullPage=true");
        assert_eq!(q.get("url").map(String::as_str), Some("https://example.com"));
        assert_eq!(q.get("fullPage").map(String::as_str), Some("true"));
    }
}
