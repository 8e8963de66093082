use std::sync::Arc;

use jsonwebtoken::crypto;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::AccessClaims;
use super::errors::JwtError;
use super::keys::KeyRing;
use crate::clock::Clock;

/// Signs and verifies compact access tokens.
///
/// Tokens are `header.claims.signature` with an HS256 signature over the first
/// two segments. The codec is stateless: it never consults a revocation list.
pub struct JwtCodec {
    keys: KeyRing,
    clock: Arc<dyn Clock>,
    leeway_seconds: i64,
    algorithm: Algorithm,
}

impl JwtCodec {
    /// Create a codec over a key ring.
    ///
    /// # Arguments
    /// * `keys` - Signing and verification keys
    /// * `clock` - Time source for the expiry check
    /// * `leeway_seconds` - Clock skew tolerated past `exp`
    pub fn new(keys: KeyRing, clock: Arc<dyn Clock>, leeway_seconds: i64) -> Self {
        Self {
            keys,
            clock,
            leeway_seconds,
            algorithm: Algorithm::HS256,
        }
    }

    /// Sign claims with the active key.
    ///
    /// # Errors
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn issue(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        let key = self.keys.active();
        let mut header = Header::new(self.algorithm);
        header.kid = Some(key.kid().to_string());

        encode(&header, claims, key.encoding()).map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked before anything in the payload is trusted,
    /// including the expiry. Signature comparison is constant-time.
    ///
    /// # Errors
    /// * `Malformed` - Not a three-segment token, or undecodable header/claims
    /// * `InvalidSignature` - Signature mismatch, unknown `kid` or unexpected algorithm
    /// * `Expired` - `exp` is in the past beyond the configured leeway
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let (message, signature) = split_token(token)?;

        let header = decode_header(token).map_err(|e| JwtError::Malformed(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(JwtError::InvalidSignature);
        }

        let key = match header.kid.as_deref() {
            Some(kid) => self.keys.get(kid).ok_or(JwtError::InvalidSignature)?,
            None => self.keys.active(),
        };

        let valid = crypto::verify(signature, message.as_bytes(), key.decoding(), self.algorithm)
            .map_err(|_| JwtError::InvalidSignature)?;
        if !valid {
            return Err(JwtError::InvalidSignature);
        }

        // Expiry is checked below against the injected clock.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<AccessClaims>(token, key.decoding(), &validation)
            .map_err(|e| JwtError::Malformed(e.to_string()))?
            .claims;

        if claims.is_expired(self.clock.now(), self.leeway_seconds) {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }
}

fn split_token(token: &str) -> Result<(&str, &str), JwtError> {
    let (message, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| JwtError::Malformed("expected three segments".to_string()))?;

    let segments = message.split('.').count();
    if segments != 2 || signature.is_empty() || message.split('.').any(str::is_empty) {
        return Err(JwtError::Malformed("expected three segments".to_string()));
    }

    Ok((message, signature))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";
    const OTHER_SECRET: &[u8] = b"other_secret_key_at_least_32_bytes_!";

    fn codec_with_clock(clock: Arc<ManualClock>) -> JwtCodec {
        JwtCodec::new(KeyRing::new("k1", SECRET).unwrap(), clock, 5)
    }

    fn sample_claims(clock: &ManualClock) -> AccessClaims {
        AccessClaims::new(
            "user123",
            vec!["USER".to_string()],
            false,
            clock.now(),
            Duration::minutes(15),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let claims = sample_claims(&clock);

        let token = codec.issue(&claims).expect("Failed to issue token");
        assert_eq!(token.split('.').count(), 3);

        let decoded = codec.verify(&token).expect("Failed to verify token");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_header_carries_kid() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());

        let token = codec.issue(&sample_claims(&clock)).unwrap();
        let header = decode_header(&token).unwrap();

        assert_eq!(header.kid.as_deref(), Some("k1"));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let token = codec.issue(&sample_claims(&clock)).unwrap();

        let signature_start = token.rfind('.').unwrap() + 1;
        for index in signature_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(
                codec.verify(&tampered),
                Err(JwtError::InvalidSignature),
                "byte {} was not detected",
                index
            );
        }
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let token = codec.issue(&sample_claims(&clock)).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = AccessClaims {
            roles: vec!["ADMIN".to_string()],
            ..sample_claims(&clock)
        };
        let forged_token = JwtCodec::new(KeyRing::new("k1", OTHER_SECRET).unwrap(), clock, 5)
            .issue(&forged)
            .unwrap();
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();

        assert_eq!(codec.verify(&parts.join(".")), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_verify_expired_token() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let token = codec.issue(&sample_claims(&clock)).unwrap();

        clock.advance(Duration::minutes(15) + Duration::seconds(3));
        assert!(codec.verify(&token).is_ok(), "within leeway");

        clock.advance(Duration::seconds(2));
        assert_eq!(codec.verify(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_expired_and_forged_reports_signature() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let forger = JwtCodec::new(KeyRing::new("k1", OTHER_SECRET).unwrap(), clock.clone(), 5);
        let token = forger.issue(&sample_claims(&clock)).unwrap();

        clock.advance(Duration::hours(1));
        assert_eq!(codec.verify(&token), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_verify_malformed_token() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock);

        for token in ["", "abc", "a.b", "a..c", "a.b.c.d", "invalid.token.here"] {
            assert!(
                matches!(codec.verify(token), Err(JwtError::Malformed(_))),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_unknown_kid_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with_clock(clock.clone());
        let foreign = JwtCodec::new(KeyRing::new("k9", SECRET).unwrap(), clock.clone(), 5);

        let token = foreign.issue(&sample_claims(&clock)).unwrap();
        assert_eq!(codec.verify(&token), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_retired_key_still_verifies() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let old = JwtCodec::new(KeyRing::new("k1", SECRET).unwrap(), clock.clone(), 5);
        let token = old.issue(&sample_claims(&clock)).unwrap();

        let rotated_ring = KeyRing::new("k2", OTHER_SECRET)
            .unwrap()
            .with_key("k1", SECRET)
            .unwrap();
        let rotated = JwtCodec::new(rotated_ring, clock.clone(), 5);

        assert!(rotated.verify(&token).is_ok());

        let fresh = rotated.issue(&sample_claims(&clock)).unwrap();
        assert_eq!(decode_header(&fresh).unwrap().kid.as_deref(), Some("k2"));
        assert_eq!(old.verify(&fresh), Err(JwtError::InvalidSignature));
    }
}
