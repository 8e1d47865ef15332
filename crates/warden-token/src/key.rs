//! HMAC signing key.

use jsonwebtoken::{DecodingKey, EncodingKey};
use zeroize::Zeroizing;

use crate::error::{TokenError, TokenResult};

/// Minimum key length in bytes.
pub const MIN_KEY_BYTES: usize = 32;

/// Shared secret for HMAC-SHA256 signing.
///
/// The bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SigningKey {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] if the key is shorter than
    /// [`MIN_KEY_BYTES`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> TokenResult<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.len() < MIN_KEY_BYTES {
            return Err(TokenError::InvalidKey(format!(
                "key is {} bytes; at least {MIN_KEY_BYTES} are required",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty keys are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.bytes)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.bytes)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
