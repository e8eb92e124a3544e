//! Network transport for the roundtrip client.
//!
//! [`HyperTransport`] is the default base transport: hyper_util's pooled
//! client over a rustls connector.
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! Any other [`Transport`](roundtrip_core::Transport) can be supplied to the
//! client builder instead, for example a
//! [`TransportFn`](roundtrip_core::TransportFn) in tests.

mod connector;
mod hyper;

pub use connector::{
    build_http_connector, build_https_connector, default_tls_config, has_tls_support,
};
pub use self::hyper::{HyperTransport, HyperTransportBuilder, defaults};
