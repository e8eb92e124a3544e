//! TLS and TCP connector setup for the hyper transport.
//!
//! # Feature Flags
//!
//! TLS requires both a crypto provider and root certificates:
//!
//! - **Crypto providers** (choose one):
//!   - `tls-ring` - Use ring crypto (default with `tls` feature)
//!   - `tls-aws-lc` - Use AWS LC crypto
//!   - neither: a process-wide default installed with
//!     `CryptoProvider::install_default()` is used if present
//!
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! Missing pieces surface as [`ClientBuildError::Tls`] from the builder.

use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::builder::ClientBuildError;

/// Returns true if both a crypto provider feature and a root certificate
/// feature are enabled.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

/// Pick the crypto provider: ring, then aws-lc, then the installed default.
fn crypto_provider_builder()
-> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, ClientBuildError> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(std::sync::Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(std::sync::Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    let provider = provider.ok_or_else(|| {
        ClientBuildError::Tls(
            "no crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install one with `CryptoProvider::install_default()`"
                .to_string(),
        )
    })?;

    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientBuildError::Tls(e.to_string()))
}

/// Build the root certificate store from enabled features.
///
/// Native roots are preferred when both root features are enabled.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> Result<rustls::RootCertStore, ClientBuildError> {
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            tracing::debug!(errors = ?native_certs.errors, "errors loading native certs");
        }
        let (added, ignored) = roots.add_parsable_certificates(native_certs.certs);
        tracing::debug!(added, ignored, "loaded native root certificates");
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    Ok(roots)
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn build_root_store() -> Result<rustls::RootCertStore, ClientBuildError> {
    Err(ClientBuildError::Tls(
        "no root certificates: enable `tls-native-roots` or `tls-webpki-roots`".to_string(),
    ))
}

/// Build the default TLS configuration from the enabled features.
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let builder = crypto_provider_builder()?;
    let roots = build_root_store()?;
    Ok(builder.with_root_certificates(roots).with_no_client_auth())
}

/// Build the TCP connector.
///
/// `http://` and `https://` targets are both accepted; the TLS layer decides
/// per request.
pub fn build_http_connector(
    connect_timeout: Option<Duration>,
    tcp_keepalive: Option<Duration>,
) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);
    connector.set_nodelay(true);
    connector.set_connect_timeout(connect_timeout);
    connector.set_keepalive(tcp_keepalive);
    connector
}

/// Wrap a TCP connector with rustls, negotiating HTTP/1.1 or HTTP/2 via ALPN.
pub fn build_https_connector(
    http: HttpConnector,
    tls_config: ClientConfig,
) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(http)
}
