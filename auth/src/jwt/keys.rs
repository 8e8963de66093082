use std::collections::HashMap;
use std::fmt;

use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;

use super::errors::JwtError;

/// HMAC secret paired with its key identifier.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Versioned set of signing keys.
///
/// The active key signs new tokens and is named in the token header (`kid`).
/// Every key in the ring verifies, so retired keys keep accepting tokens they
/// signed until those expire.
#[derive(Clone)]
pub struct KeyRing {
    active: String,
    keys: HashMap<String, SigningKey>,
}

impl KeyRing {
    /// Minimum HMAC secret length for HS256.
    pub const MIN_SECRET_BYTES: usize = 32;

    /// Create a ring holding a single active key.
    ///
    /// # Arguments
    /// * `kid` - Identifier written into the `kid` header of issued tokens
    /// * `secret` - HMAC secret, at least 32 bytes
    ///
    /// # Errors
    /// * `WeakKey` - Secret shorter than 32 bytes
    pub fn new(kid: impl Into<String>, secret: &[u8]) -> Result<Self, JwtError> {
        let key = Self::signing_key(kid.into(), secret)?;
        let active = key.kid.clone();
        let mut keys = HashMap::new();
        keys.insert(active.clone(), key);
        Ok(Self { active, keys })
    }

    /// Build a ring from every configured key, selecting `active` for signing.
    ///
    /// # Errors
    /// * `WeakKey` - Any secret shorter than 32 bytes
    /// * `UnknownActiveKey` - `active` does not name a configured key
    pub fn from_secrets<'a, I>(active: &str, secrets: I) -> Result<Self, JwtError>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut keys = HashMap::new();
        for (kid, secret) in secrets {
            let key = Self::signing_key(kid.to_string(), secret)?;
            keys.insert(key.kid.clone(), key);
        }

        if !keys.contains_key(active) {
            return Err(JwtError::UnknownActiveKey(active.to_string()));
        }

        Ok(Self {
            active: active.to_string(),
            keys,
        })
    }

    /// Add a verification key. The active key is unchanged.
    pub fn with_key(mut self, kid: impl Into<String>, secret: &[u8]) -> Result<Self, JwtError> {
        let key = Self::signing_key(kid.into(), secret)?;
        self.keys.insert(key.kid.clone(), key);
        Ok(self)
    }

    pub fn active(&self) -> &SigningKey {
        // `new` and `from_secrets` guarantee the active kid is present.
        &self.keys[&self.active]
    }

    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    fn signing_key(kid: String, secret: &[u8]) -> Result<SigningKey, JwtError> {
        if secret.len() < Self::MIN_SECRET_BYTES {
            return Err(JwtError::WeakKey {
                kid,
                min: Self::MIN_SECRET_BYTES,
                actual: secret.len(),
            });
        }

        Ok(SigningKey {
            kid,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        f.debug_struct("KeyRing")
            .field("active", &self.active)
            .field("kids", &kids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_A: &[u8] = b"first_secret_key_at_least_32_bytes!";
    const SECRET_B: &[u8] = b"second_secret_key_at_least_32_bytes";

    #[test]
    fn test_rejects_short_secret() {
        let result = KeyRing::new("k1", b"too-short");
        assert!(matches!(
            result,
            Err(JwtError::WeakKey { min: 32, actual: 9, .. })
        ));
    }

    #[test]
    fn test_from_secrets_requires_active_key() {
        let result = KeyRing::from_secrets("missing", [("k1", SECRET_A)]);
        assert_eq!(
            result.unwrap_err(),
            JwtError::UnknownActiveKey("missing".to_string())
        );
    }

    #[test]
    fn test_with_key_keeps_active() {
        let ring = KeyRing::new("k2", SECRET_B)
            .unwrap()
            .with_key("k1", SECRET_A)
            .unwrap();

        assert_eq!(ring.active().kid(), "k2");
        assert!(ring.get("k1").is_some());
        assert!(ring.get("k3").is_none());
    }

    #[test]
    fn test_debug_does_not_print_secrets() {
        let ring = KeyRing::new("k1", SECRET_A).unwrap();
        let output = format!("{:?}", ring);

        assert!(output.contains("k1"));
        assert!(!output.contains("first_secret"));
    }
}
