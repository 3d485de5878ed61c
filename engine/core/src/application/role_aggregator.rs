// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Role Aggregation Service
//!
//! Keeps `User.current_role` consistent with the membership ledger:
//! a user is `VOLUNTEER` iff they hold at least one `APPROVED` membership.
//!
//! [`RoleAggregator`] holds the in-transaction primitives shared by every
//! workflow that touches memberships. [`RoleService`] exposes the
//! user-facing operations (recompute, explicit role switch).

use crate::application::unit_of_work::finish;
use crate::domain::error::WorkflowError;
use crate::domain::events::RoleEvent;
use crate::domain::membership::MembershipStatus;
use crate::domain::repository::{UserLookup, WorkflowStore, WorkflowTransaction};
use crate::domain::token::{SessionToken, TokenIssuer};
use crate::domain::user::{CurrentRole, User, UserId};
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a role write inside a transaction
#[derive(Debug, Clone)]
pub struct RoleUpdate {
    /// User as stored after the write
    pub user: User,
    /// Previous role, if the write changed it
    pub previous: Option<CurrentRole>,
}

impl RoleUpdate {
    pub fn changed(&self) -> bool {
        self.previous.is_some()
    }

    pub fn event(&self) -> Option<RoleEvent> {
        self.previous.map(|from| RoleEvent::CurrentRoleChanged {
            user_id: self.user.id,
            from,
            to: self.user.current_role,
            changed_at: Utc::now(),
        })
    }
}

/// In-transaction role primitives
pub struct RoleAggregator;

impl RoleAggregator {
    /// Derive the role from the APPROVED membership count. Idempotent; only
    /// writes when the stored role differs.
    ///
    /// The user row is locked before counting, so concurrent membership
    /// changes for the same user are counted one after the other.
    pub async fn recompute(
        tx: &mut dyn WorkflowTransaction,
        user_id: UserId,
    ) -> Result<RoleUpdate, WorkflowError> {
        tx.get_user_for_update(user_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("user", user_id))?;

        let approved = tx
            .count_memberships_with_status(user_id, MembershipStatus::Approved)
            .await?;
        let derived = CurrentRole::from_approved_count(approved);
        Self::write(tx, user_id, derived).await
    }

    /// Unconditional VOLUNTEER, used right after an approval.
    pub async fn set_volunteer(
        tx: &mut dyn WorkflowTransaction,
        user_id: UserId,
    ) -> Result<RoleUpdate, WorkflowError> {
        Self::write(tx, user_id, CurrentRole::Volunteer).await
    }

    async fn write(
        tx: &mut dyn WorkflowTransaction,
        user_id: UserId,
        role: CurrentRole,
    ) -> Result<RoleUpdate, WorkflowError> {
        let mut user = tx
            .get_user_for_update(user_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("user", user_id))?;

        if user.current_role == role {
            debug!("User {} already {}, no role write", user_id, role);
            return Ok(RoleUpdate { user, previous: None });
        }

        tx.set_current_role(user_id, role).await?;
        let previous = user.current_role;
        user.current_role = role;
        debug!("User {} role {} -> {}", user_id, previous, role);

        Ok(RoleUpdate {
            user,
            previous: Some(previous),
        })
    }
}

/// Outcome of an explicit role switch
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoleSwitch {
    pub user: User,
    /// Re-issued credentials; absent when the issuer failed
    pub token: Option<SessionToken>,
}

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait RoleService: Send + Sync {
    /// Recompute and persist the derived role for a user
    async fn recompute_role(&self, user_id: UserId) -> Result<User, WorkflowError>;

    /// Switch the acting user's current role. `requested_role` must name
    /// ATTENDEE or VOLUNTEER.
    async fn switch_role(&self, user_id: UserId, requested_role: &str) -> Result<RoleSwitch, WorkflowError>;

    /// Active user by id
    async fn get_user(&self, user_id: UserId) -> Result<User, WorkflowError>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardRoleService {
    store: Arc<dyn WorkflowStore>,
    users: Arc<dyn UserLookup>,
    token_issuer: Arc<dyn TokenIssuer>,
    event_bus: Arc<EventBus>,
}

impl StandardRoleService {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        users: Arc<dyn UserLookup>,
        token_issuer: Arc<dyn TokenIssuer>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            users,
            token_issuer,
            event_bus,
        }
    }

    fn publish(&self, update: &RoleUpdate) {
        if let Some(event) = update.event() {
            self.event_bus.publish_role_event(event);
        }
    }
}

#[async_trait]
impl RoleService for StandardRoleService {
    async fn recompute_role(&self, user_id: UserId) -> Result<User, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let result = RoleAggregator::recompute(tx.as_mut(), user_id).await;
        let update = finish(tx, result).await?;

        if update.changed() {
            info!("Recomputed role for user {}: {}", user_id, update.user.current_role);
        }
        self.publish(&update);
        Ok(update.user)
    }

    async fn switch_role(&self, user_id: UserId, requested_role: &str) -> Result<RoleSwitch, WorkflowError> {
        let requested: CurrentRole = requested_role.parse()?;
        info!("User {} requested role switch to {}", user_id, requested);

        let mut tx = self.store.begin().await?;
        let result = switch_in(tx.as_mut(), user_id, requested).await;
        let update = finish(tx, result).await?;
        self.publish(&update);

        let token = match self.token_issuer.issue(&update.user).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Role switched for user {} but token issue failed: {}", user_id, e);
                None
            }
        };

        Ok(RoleSwitch {
            user: update.user,
            token,
        })
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, WorkflowError> {
        self.users
            .get_user(user_id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| WorkflowError::not_found("user", user_id))
    }
}

async fn switch_in(
    tx: &mut dyn WorkflowTransaction,
    user_id: UserId,
    requested: CurrentRole,
) -> Result<RoleUpdate, WorkflowError> {
    let user = tx
        .get_user_for_update(user_id)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| WorkflowError::not_found("user", user_id))?;

    if requested == CurrentRole::Volunteer {
        let approved = tx
            .count_memberships_with_status(user.id, MembershipStatus::Approved)
            .await?;
        if approved == 0 {
            return Err(WorkflowError::PermissionDenied(format!(
                "user {} has no approved volunteer membership",
                user_id
            )));
        }
    }

    RoleAggregator::write(tx, user_id, requested).await
}
