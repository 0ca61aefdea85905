// src/core/scanner/ssl_scanner.rs

use crate::core::models::SslInfo;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use url::Url;
use x509_parser::prelude::*;

/// Bound applied to connect, read and write during the probe.
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(8);

/// Inspects the TLS posture of the target.
///
/// Non-https schemes return the degraded `hasSSL:false` value immediately,
/// without any network attempt. Connection errors and timeouts degrade the
/// same way; this operation never fails the overall scan.
pub async fn run_ssl_scan(target: &str) -> SslInfo {
    let Ok(url) = Url::parse(target) else {
        warn!(target, "Unparseable URL, skipping TLS inspection.");
        return SslInfo::default();
    };
    if url.scheme() != "https" {
        debug!(target, "Non-https scheme, skipping TLS inspection.");
        return SslInfo::default();
    }
    let Some(host) = url.host_str().map(str::to_string) else {
        warn!(target, "URL without host, skipping TLS inspection.");
        return SslInfo::default();
    };
    let port = url.port().unwrap_or(443);

    info!(host, port, "Starting TLS inspection.");
    let probe = spawn_blocking(move || perform_tls_probe(&host, port)).await;

    match probe {
        Ok(Ok(info)) => {
            info!(issuer = ?info.issuer, cipher = ?info.cipher, "TLS inspection finished.");
            info
        }
        Ok(Err(e)) => {
            warn!(error = %e, "TLS probe failed, reporting hasSSL=false.");
            SslInfo::default()
        }
        Err(e) => {
            warn!(panic = %e, "TLS probe task panicked, reporting hasSSL=false.");
            SslInfo::default()
        }
    }
}

fn perform_tls_probe(host: &str, port: u16) -> Result<SslInfo, String> {
    debug!(host, port, "Performing raw TLS handshake.");

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InspectionOnlyVerifier))
        .with_no_client_auth();
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| format!("invalid server name: {e}"))?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)
        .map_err(|e| format!("TLS client setup failed: {e}"))?;

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("address resolution failed: {e}"))?
        .next()
        .ok_or_else(|| format!("no address for {host}:{port}"))?;
    let mut sock = TcpStream::connect_timeout(&addr, TLS_HANDSHAKE_TIMEOUT)
        .map_err(|e| format!("TCP connect failed: {e}"))?;
    sock.set_read_timeout(Some(TLS_HANDSHAKE_TIMEOUT))
        .map_err(|e| format!("socket setup failed: {e}"))?;
    sock.set_write_timeout(Some(TLS_HANDSHAKE_TIMEOUT))
        .map_err(|e| format!("socket setup failed: {e}"))?;

    while conn.is_handshaking() {
        conn.complete_io(&mut sock)
            .map_err(|e| format!("TLS handshake failed: {e}"))?;
    }

    let cipher = conn
        .negotiated_cipher_suite()
        .map(|suite| format!("{:?}", suite.suite()));

    let cert_der = conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| "no peer certificate presented".to_string())?;
    let (_, x509) = parse_x509_certificate(cert_der.as_ref())
        .map_err(|e| format!("X.509 parse error: {e}"))?;

    // Prefer the issuer organization, fall back to its common name.
    let issuer = x509
        .issuer()
        .iter_organization()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .or_else(|| {
            x509.issuer()
                .iter_common_name()
                .next()
                .and_then(|attr| attr.as_str().ok())
        })
        .map(str::to_string);

    let validity = x509.validity();
    Ok(SslInfo {
        has_ssl: true,
        issuer,
        valid_from: Some(asn1_time_to_chrono_utc(&validity.not_before)),
        valid_to: Some(asn1_time_to_chrono_utc(&validity.not_after)),
        cipher,
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

/// Accepts any certificate chain. This probe reports on certificates, it
/// does not rely on them: an expired or self-signed certificate is a finding
/// to surface, not a reason to abort the handshake.
#[derive(Debug)]
struct InspectionOnlyVerifier;

impl ServerCertVerifier for InspectionOnlyVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
