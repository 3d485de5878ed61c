// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HS256 session tokens re-issued after a role switch.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::token::{SessionToken, TokenError, TokenIssuer};
use crate::domain::user::User;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub iss: String,
    pub system_role: String,
    pub current_role: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtTokenIssuer {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtTokenIssuer {
    pub fn new(issuer: impl Into<String>, secret: &str, ttl_seconds: u64) -> Self {
        Self {
            issuer: issuer.into(),
            ttl: Duration::seconds(ttl_seconds as i64),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Verify signature, expiry and issuer
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenIssuer {
    async fn issue(&self, user: &User) -> Result<SessionToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: user.id.to_string(),
            iss: self.issuer.clone(),
            system_role: user.system_role.as_str().to_string(),
            current_role: user.current_role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let access_token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SessionToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }
}
