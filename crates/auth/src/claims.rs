use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// JWT claims model.
///
/// Tokens carry identity only. Role and permissions are looked up per request,
/// so a role change takes effect without re-issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    pub email: String,

    /// Issued-at timestamp (seconds since epoch on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration timestamp (seconds since epoch on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl JwtClaims {
    pub fn new(sub: PrincipalId, email: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            email: email.into(),
            iat: now,
            exp: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate JWT claims against `now`.
///
/// Signature checks happen in [`JwtValidator`] implementations.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Issues signed tokens for authenticated users.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, claims: &JwtClaims) -> Result<String, TokenValidationError>;
}

/// HMAC-SHA256 shared-secret validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                _ => TokenValidationError::Malformed(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// HMAC-SHA256 shared-secret issuer.
pub struct Hs256JwtIssuer {
    key: EncodingKey,
}

impl Hs256JwtIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
        }
    }
}

impl JwtIssuer for Hs256JwtIssuer {
    fn issue(&self, claims: &JwtClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| TokenValidationError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims::new(
            PrincipalId::from_uuid(Uuid::now_v7()),
            "admin@example.com",
            now,
            Duration::hours(1),
        )
    }

    // Round to whole seconds: the wire format drops sub-second precision.
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let now = now();
        let original = claims(now);
        let token = Hs256JwtIssuer::new("secret").issue(&original).unwrap();

        let decoded = Hs256JwtValidator::new("secret").validate(&token, now).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = now();
        let token = Hs256JwtIssuer::new("secret").issue(&claims(now)).unwrap();

        let err = Hs256JwtValidator::new("other").validate(&token, now).unwrap_err();
        assert_eq!(err, TokenValidationError::InvalidSignature);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = now();
        let token = Hs256JwtIssuer::new("secret").issue(&claims(now)).unwrap();

        let later = now + Duration::hours(2);
        let err = Hs256JwtValidator::new("secret").validate(&token, later).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = Hs256JwtValidator::new("secret")
            .validate("not.a.token", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn claim_windows() {
        let now = now();
        let mut c = claims(now);
        assert_eq!(validate_claims(&c, now - Duration::seconds(1)), Err(TokenValidationError::NotYetValid));

        c.exp = c.iat;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
