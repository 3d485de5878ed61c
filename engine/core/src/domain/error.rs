// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow error taxonomy shared by every service in the engine.
//!
//! Business-rule failures (`NotFound`, `PermissionDenied`, `Conflict`,
//! `InvalidState`, `InvalidArgument`) are detected before any mutating write.
//! `Repository` carries storage failures that aborted a transaction.

use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable kind, used by the HTTP layer
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Conflict(_) => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Repository(_) => "repository",
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => WorkflowError::Conflict(msg),
            RepositoryError::NotFound(msg) => WorkflowError::NotFound {
                entity: "record",
                id: msg,
            },
            other => WorkflowError::Repository(other),
        }
    }
}
