//! Process-wide default client.
//!
//! The default client is built lazily with [`Client::new`] on first use and
//! can be replaced with [`set_default_client`]. Only the convenience
//! functions below read it; everything else takes a client explicitly.

use std::sync::{PoisonError, RwLock};

use roundtrip_core::ClientError;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::builder::ClientBuildError;
use crate::client::Client;

static DEFAULT_CLIENT: RwLock<Option<Client>> = RwLock::new(None);

/// The default client, building it on first use.
///
/// A failed build is not cached; the next call tries again.
pub fn default_client() -> Result<Client, ClientBuildError> {
    if let Some(client) = DEFAULT_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return Ok(client.clone());
    }

    let mut slot = DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = slot.as_ref() {
        return Ok(client.clone());
    }
    let client = Client::new()?;
    *slot = Some(client.clone());
    Ok(client)
}

/// Replace the default client.
pub fn set_default_client(client: Client) {
    *DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
}

/// GET `url` with the default client and decode a JSON response.
pub async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, ClientError> {
    default_client()?.get_json(url).await
}

/// POST `body` as JSON with the default client and decode a JSON response.
pub async fn post_json<B, T>(url: &str, body: &B) -> Result<T, ClientError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    default_client()?.post_json(url, body).await
}
