//! HMAC-SHA256 delivery signatures.

use super::{WebhookError, WebhookResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Header carrying the event name.
pub const EVENT_HEADER: &str = "x-github-event";
/// Header carrying the delivery identifier.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Shared webhook secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    /// Wraps a non-empty secret.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::EmptySecret`] when `secret` is empty.
    pub fn new(secret: impl Into<Vec<u8>>) -> WebhookResult<Self> {
        let bytes = secret.into();
        if bytes.is_empty() {
            return Err(WebhookError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    /// Returns the raw secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

fn mac_for(secret: &WebhookSecret, body: &[u8]) -> WebhookResult<HmacSha256> {
    let mut mac =
        HmacSha256::new_from_slice(secret.expose()).map_err(|_| WebhookError::EmptySecret)?;
    mac.update(body);
    Ok(mac)
}

/// Computes the `sha256=<hex>` signature header value for `body`.
///
/// # Errors
///
/// Returns [`WebhookError::EmptySecret`] if the MAC rejects the key.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> WebhookResult<String> {
    let digest = mac_for(secret, body)?.finalize().into_bytes();
    Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(digest)))
}

/// Checks `header` against the HMAC-SHA256 of `body`.
///
/// The digest comparison runs in constant time.
///
/// # Errors
///
/// Returns [`WebhookError::MissingSignature`] without a header,
/// [`WebhookError::MalformedSignature`] when it is not `sha256=<hex>`, or
/// [`WebhookError::SignatureMismatch`] when the digest differs.
pub fn verify_signature(
    secret: &WebhookSecret,
    body: &[u8],
    header: Option<&str>,
) -> WebhookResult<()> {
    let value = header.ok_or(WebhookError::MissingSignature)?.trim();
    let encoded = value.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        WebhookError::MalformedSignature(format!("expected `{SIGNATURE_PREFIX}` prefix"))
    })?;
    let expected =
        hex::decode(encoded).map_err(|err| WebhookError::MalformedSignature(err.to_string()))?;
    mac_for(secret, body)?
        .verify_slice(&expected)
        .map_err(|_| WebhookError::SignatureMismatch)
}
