// src/core/error.rs

use thiserror::Error;

/// Hard-failure taxonomy for the scan pipeline.
///
/// Only errors that must abort a whole request live here; best-effort
/// sub-operations (TLS probe, consent/privacy renders, individual crawl
/// fetches) degrade to default values instead and never surface as a
/// `ScanError`.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The caller-supplied target failed validation. Raised before any
    /// network or browser activity; the HTTP layer maps this to 400.
    #[error("invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Browser launch, navigation or in-page evaluation failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// The main render did not reach a settled state within the hard bound.
    #[error("render timed out after {0} seconds")]
    RenderTimeout(u64),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
