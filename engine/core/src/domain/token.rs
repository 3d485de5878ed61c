// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::User;

/// Session credential reflecting a user's roles at issue time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign session token: {0}")]
    Signing(String),

    #[error("Invalid session token: {0}")]
    Invalid(String),
}

/// Re-issues credentials after a role switch
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, user: &User) -> Result<SessionToken, TokenError>;
}
