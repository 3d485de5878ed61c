// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use tracing::warn;

use crate::domain::error::WorkflowError;
use crate::domain::repository::WorkflowTransaction;

/// Commit on success, roll back on failure. The original error wins over a
/// failed rollback.
pub(crate) async fn finish<T>(
    tx: Box<dyn WorkflowTransaction>,
    result: Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after '{}' failed: {}", err, rollback_err);
            }
            Err(err)
        }
    }
}
