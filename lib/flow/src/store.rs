//! Per-provider blobs in the browser session.
//!
//! Each provider's session blob is gzip-compressed and base64-encoded before
//! it is handed to the session store under the provider's name. Reading a
//! missing, undecodable, or truncated entry yields [`FlowError::NoSession`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use gatehouse_core::{ProviderName, Result};
use std::io::{self, Read, Write};
use tower_sessions::Session;
use tracing::debug;

use crate::error::FlowError;

/// Stores, loads and removes provider blobs in a `tower_sessions::Session`.
///
/// Writes mark the session modified; the session layer then refreshes the
/// response's session cookie.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAdapter;

impl SessionAdapter {
    /// Compresses `payload` and stores it under the provider's name.
    pub async fn store(
        &self,
        session: &Session,
        provider: &ProviderName,
        payload: &[u8],
    ) -> Result<(), FlowError> {
        let compressed = compress(payload).map_err(|e| FlowError::Session {
            details: format!("failed to compress '{provider}' session: {e}"),
        })?;

        session
            .insert(provider.as_str(), STANDARD.encode(compressed))
            .await
            .map_err(|e| FlowError::Session {
                details: e.to_string(),
            })?;

        Ok(())
    }

    /// Loads and decompresses the blob stored under the provider's name.
    pub async fn load(
        &self,
        session: &Session,
        provider: &ProviderName,
    ) -> Result<Vec<u8>, FlowError> {
        let no_session = || FlowError::NoSession {
            provider: provider.clone(),
        };

        // Read untyped so a wrongly typed entry is corrupt, not a store failure.
        let value: serde_json::Value = session
            .get(provider.as_str())
            .await
            .map_err(|e| FlowError::Session {
                details: e.to_string(),
            })?
            .ok_or_else(no_session)?;

        let encoded = value.as_str().ok_or_else(|| {
            debug!(provider = %provider, "stored session is not a string");
            no_session()
        })?;

        let compressed = STANDARD.decode(encoded).map_err(|e| {
            debug!(provider = %provider, error = %e, "stored session is not valid base64");
            no_session()
        })?;

        let payload = decompress(&compressed).map_err(|e| {
            debug!(provider = %provider, error = %e, "stored session is not valid gzip");
            no_session()
        })?;

        Ok(payload)
    }

    /// Removes the blob stored under the provider's name.
    ///
    /// Removing an entry that does not exist succeeds.
    pub async fn remove(
        &self,
        session: &Session,
        provider: &ProviderName,
    ) -> Result<(), FlowError> {
        session
            .remove_value(provider.as_str())
            .await
            .map_err(|e| FlowError::Session {
                details: format!("could not delete '{provider}' session: {e}"),
            })?;

        Ok(())
    }
}

fn compress(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

fn decompress(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut payload)?;
    Ok(payload)
}
