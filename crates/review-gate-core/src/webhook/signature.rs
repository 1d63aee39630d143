//! Webhook signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw body, keyed by the
//! webhook secret, and sends the digest as `X-Hub-Signature-256: sha256=<hex>`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::instrument;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Predicate deciding whether a body was signed with the configured secret.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` only when `signature` is a valid signature of `body`.
    ///
    /// A missing signature is never valid.
    async fn verify(&self, body: &[u8], signature: Option<&str>) -> bool;

    /// Length of the configured secret, for metadata-only failure logging.
    fn secret_length(&self) -> usize;
}

// ============================================================================
// WebhookSecret
// ============================================================================

/// Webhook shared secret. Zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<REDACTED>)")
    }
}

// ============================================================================
// HmacSignatureVerifier
// ============================================================================

/// HMAC-SHA256 verifier for GitHub's `sha256=<hex>` signature format.
///
/// # Examples
///
/// ```rust
/// use review_gate_core::webhook::{HmacSignatureVerifier, WebhookSecret};
///
/// let verifier = HmacSignatureVerifier::new(WebhookSecret::new("It's a Secret to Everybody"));
/// let signature = verifier.sign(b"Hello, World!");
/// assert_eq!(
///     signature,
///     "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
/// );
/// ```
pub struct HmacSignatureVerifier {
    secret: WebhookSecret,
}

impl HmacSignatureVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Compute the `sha256=<hex>` signature of `body` with the configured secret.
    pub fn sign(&self, body: &[u8]) -> String {
        format!("sha256={}", hex::encode(self.digest(body)))
    }

    fn digest(&self, body: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(self.secret.expose().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl SignatureVerifier for HmacSignatureVerifier {
    #[instrument(skip_all, fields(has_signature = signature.is_some(), body_len = body.len()))]
    async fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        if self.secret.is_empty() {
            return false;
        }

        let Some(provided) = signature.and_then(|s| s.strip_prefix("sha256=")) else {
            return false;
        };

        let Ok(provided) = hex::decode(provided) else {
            return false;
        };

        let expected = self.digest(body);
        if expected.is_empty() || provided.len() != expected.len() {
            return false;
        }

        provided.ct_eq(&expected).into()
    }

    fn secret_length(&self) -> usize {
        self.secret.len()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
