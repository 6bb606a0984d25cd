// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token codec (HS256).
//!
//! Verification order is fixed: structure, signature, issuer/audience, then
//! the time checks (`exp`, then `iat` against the clock-skew tolerance).
//! Time checks are done here against the injected [`Clock`] rather than by
//! `jsonwebtoken`, so the refresh flow can reuse the signature check while
//! applying its own expiry window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};

use super::claims::{TokenClaims, UserContext};
use crate::clock::Clock;

/// Minimum signing secret length.
pub const MIN_SECRET_LEN: usize = 32;

/// Default access token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Tolerance for `iat` values ahead of the local clock (5 minutes).
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 5 * 60;

/// Reason a token was rejected or could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token issuer or audience is invalid")]
    InvalidClaims,
    #[error("signing secret must be at least {MIN_SECRET_LEN} characters")]
    WeakSecret,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Token codec settings.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: Duration,
    pub issuer: String,
    pub audience: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if config.secret.chars().count() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud"]);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            clock,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> i64 {
        self.clock.unix_timestamp()
    }

    /// Sign a token for `user`, issued now and valid for the configured TTL.
    pub fn sign(&self, user: &UserContext) -> Result<IssuedToken, TokenError> {
        let iat = self.clock.unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            role: user.role,
            iat,
            exp: iat.saturating_add(ttl),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = self.encode_claims(&claims)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Sign arbitrary claims as-is.
    pub fn encode_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Full verification for protected-route access: no expiry grace.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.verify_signature(token)?;
        check_times(&claims, self.clock.unix_timestamp(), 0)?;
        Ok(claims)
    }

    /// Structure, signature, issuer and audience only; the caller applies
    /// its own time windows.
    pub fn verify_signature(&self, token: &str) -> Result<TokenClaims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }
        decode_header(token).map_err(|_| TokenError::Malformed)?;

        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaims,
                _ => TokenError::Malformed,
            })
    }
}

/// `exp` must not have passed by more than `expiry_grace_secs`, and `iat`
/// must not be further ahead than [`CLOCK_SKEW_TOLERANCE_SECS`].
pub fn check_times(
    claims: &TokenClaims,
    now: i64,
    expiry_grace_secs: i64,
) -> Result<(), TokenError> {
    if now > claims.exp.saturating_add(expiry_grace_secs) {
        return Err(TokenError::Expired);
    }
    if claims.iat > now.saturating_add(CLOCK_SKEW_TOLERANCE_SECS) {
        return Err(TokenError::NotYetValid);
    }
    Ok(())
}
