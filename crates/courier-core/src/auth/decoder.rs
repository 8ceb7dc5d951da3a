//! Token decoding seam and an unverified JWT decoder
//!
//! Signature verification belongs to the server. The client only needs the
//! payload to know who is logged in and when the token stops being useful.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation};
use std::time::Duration;

use crate::auth::claims::Claims;
use crate::error::DecodeError;

/// Reads claims and expiry out of an opaque token
pub trait TokenDecoder: Send + Sync {
    /// Decode the token's claims
    fn decode(&self, token: &str) -> Result<Claims, DecodeError>;

    /// Whether the token is past its expiry
    fn is_expired(&self, token: &str) -> bool;
}

/// Decodes a JWT payload with `jsonwebtoken`, skipping signature and claim
/// validation
#[derive(Clone)]
pub struct JwtDecoder {
    validation: Validation,
    expiry_margin: Duration,
}

impl JwtDecoder {
    pub fn new() -> Self {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            validation,
            expiry_margin: Duration::ZERO,
        }
    }

    /// Treat tokens as expired this long before their `exp` claim
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Expiry check against an explicit clock.
    ///
    /// A token without `exp` never expires; one that cannot be decoded is
    /// always expired. A token whose `exp` equals `now` is expired.
    pub fn is_expired_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let claims = match self.decode(token) {
            Ok(claims) => claims,
            Err(_) => return true,
        };
        let Some(expires_at) = claims.expires_at() else {
            return false;
        };
        let margin_ms = i64::try_from(self.expiry_margin.as_millis()).unwrap_or(i64::MAX);
        expires_at.timestamp_millis() <= now.timestamp_millis().saturating_add(margin_ms)
    }
}

impl Default for JwtDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("expiry_margin", &self.expiry_margin)
            .finish()
    }
}

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken => DecodeError::Malformed,
                ErrorKind::Base64(inner) => DecodeError::Base64(inner.to_string()),
                _ => DecodeError::Payload(e.to_string()),
            })
    }

    fn is_expired(&self, token: &str) -> bool {
        self.is_expired_at(token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    /// Base64url of `{"alg":"HS256","typ":"JWT"}`
    const HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

    fn jwt(payload: serde_json::Value) -> String {
        jsonwebtoken::encode(&Header::default(), &payload, &EncodingKey::from_secret(b"server-secret")).unwrap()
    }

    #[test]
    fn test_decodes_payload() {
        let token = jwt(json!({"sub": "42", "name": "Ana"}));
        let claims = JwtDecoder::new().decode(&token).unwrap();
        assert_eq!(claims.subject(), Some("42"));
        assert_eq!(claims.get("name"), Some(&json!("Ana")));
    }

    #[test]
    fn test_ignores_signature() {
        let token = jwt(json!({"sub": "7"}));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{}.bm90LWEtc2lnbmF0dXJl", unsigned);
        assert_eq!(JwtDecoder::new().decode(&forged).unwrap().subject(), Some("7"));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        let decoder = JwtDecoder::new();
        assert_eq!(decoder.decode("not-a-jwt"), Err(DecodeError::Malformed));
        assert!(decoder.decode("a.b.c.d").is_err());
        assert!(matches!(
            decoder.decode(&format!("{}.!!!.c", HEADER)),
            Err(DecodeError::Base64(_))
        ));

        // "hello"
        let not_json = format!("{}.aGVsbG8.c", HEADER);
        assert!(matches!(decoder.decode(&not_json), Err(DecodeError::Payload(_))));

        // "[1,2]"
        let array = format!("{}.WzEsMl0.c", HEADER);
        assert!(matches!(decoder.decode(&array), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn test_expiry() {
        let decoder = JwtDecoder::new();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let live = jwt(json!({"exp": 1_700_000_100}));
        let dead = jwt(json!({"exp": 1_699_999_000}));
        let edge = jwt(json!({"exp": 1_700_000_000}));
        let forever = jwt(json!({"sub": "1"}));

        assert!(!decoder.is_expired_at(&live, now));
        assert!(decoder.is_expired_at(&dead, now));
        assert!(decoder.is_expired_at(&edge, now));
        assert!(!decoder.is_expired_at(&forever, now));
        assert!(decoder.is_expired_at("garbage", now));
    }

    #[test]
    fn test_expiry_margin() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = jwt(json!({"exp": 1_700_000_030}));

        assert!(!JwtDecoder::new().is_expired_at(&token, now));
        let decoder = JwtDecoder::new().with_expiry_margin(Duration::from_secs(60));
        assert!(decoder.is_expired_at(&token, now));
    }

    #[test]
    fn test_audience_and_issuer_are_not_checked() {
        let token = jwt(json!({"sub": "9", "aud": "other-app", "iss": "someone", "nbf": 4_000_000_000u64}));
        assert_eq!(JwtDecoder::new().decode(&token).unwrap().subject(), Some("9"));
    }
}
