//! Certificate expiry probe.
//!
//! Completes a real TLS handshake and reads the leaf certificate's validity
//! window directly, instead of shelling out to `openssl s_client`.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio_rustls::TlsConnector;

/// Expiry facts for one host's leaf certificate.
#[derive(Debug, Clone)]
pub struct CertExpiry {
    pub host: String,
    pub not_after: DateTime<Utc>,
    pub days_left: i64,
}

/// Connect to `host:port`, handshake, and report when the peer's leaf
/// certificate expires.
pub async fn probe(host: &str, port: u16) -> anyhow::Result<CertExpiry> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = tokio::net::TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;
    let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
        .with_context(|| format!("invalid server name: {host}"))?;
    let stream = connector
        .connect(server_name, tcp)
        .await
        .with_context(|| format!("TLS handshake with {host}:{port} failed"))?;

    let (_, session) = stream.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .with_context(|| format!("{host}:{port} presented no certificate"))?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| anyhow::anyhow!("failed to parse peer certificate: {e}"))?;
    let not_after_ts = cert.validity().not_after.timestamp();
    let not_after =
        DateTime::from_timestamp(not_after_ts, 0).context("certificate notAfter out of range")?;
    let days_left = (not_after_ts - Utc::now().timestamp()) / 86_400;

    Ok(CertExpiry {
        host: host.to_string(),
        not_after,
        days_left,
    })
}
