// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Best-effort notification dispatch.
//!
//! Workflows call the notifier only after their transaction commits. A failed
//! notification is logged and counted; it never reaches the caller.

use crate::domain::notification::{NotificationGateway, NotificationRequest};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn NotificationGateway>,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self { gateway }
    }

    pub async fn send(&self, request: NotificationRequest) {
        let recipient = request.recipient;
        let kind = request.kind;

        match self.gateway.notify(request).await {
            Ok(()) => debug!("Notified user {} ({})", recipient, kind.as_str()),
            Err(e) => {
                warn!("Failed to notify user {} ({}): {}", recipient, kind.as_str(), e);
                metrics::counter!("vhub_notifications_failed_total", "kind" => kind.as_str()).increment(1);
            }
        }
    }

    pub async fn send_all(&self, requests: Vec<NotificationRequest>) {
        for request in requests {
            self.send(request).await;
        }
    }
}
