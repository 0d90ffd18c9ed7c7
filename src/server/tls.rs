//! TLS server context setup.
//!
//! Only TLS 1.2 and 1.3 are offered, with rustls's default suite set
//! (ECDHE with AES-GCM or CHACHA20-POLY1305); the legacy SSL and TLS 1.0/1.1
//! protocols are never negotiated.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rustls::{Certificate, PrivateKey, ServerConfig};

/// Builds the server context from PEM certificate and key files. Fails when
/// either file is unreadable or the key does not match the certificate.
pub fn server_context(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder()
        .with_safe_default_cipher_suites()
        .with_safe_default_kx_groups()
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])
        .context("failed to initialize ssl context")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .with_context(|| {
            format!(
                "private key {} does not match the certificate {}",
                key_path.display(),
                cert_path.display()
            )
        })?;

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>> {
    let file = File::open(path)
        .with_context(|| format!("failed to load ssl cert {}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .with_context(|| format!("invalid PEM in ssl cert {}", path.display()))?;
    if certs.is_empty() {
        bail!("no certificates found in {}", path.display());
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

fn load_key(path: &Path) -> Result<PrivateKey> {
    let file = File::open(path)
        .with_context(|| format!("failed to load ssl key {}", path.display()))?;
    let items = rustls_pemfile::read_all(&mut BufReader::new(file))
        .with_context(|| format!("invalid PEM in ssl key {}", path.display()))?;

    for item in items {
        match item {
            rustls_pemfile::Item::PKCS8Key(key)
            | rustls_pemfile::Item::RSAKey(key)
            | rustls_pemfile::Item::ECKey(key) => return Ok(PrivateKey(key)),
            _ => {}
        }
    }
    bail!("no private key found in {}", path.display());
}
