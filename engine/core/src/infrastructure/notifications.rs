// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Notification gateway that records notifications.
//!
//! Delivery (mail, push) is handled by whoever consumes the stored records or
//! the `NotificationCreated` events on the bus.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::events::NotificationEvent;
use crate::domain::notification::{Notification, NotificationError, NotificationGateway, NotificationRequest};
use crate::domain::repository::NotificationRepository;
use crate::infrastructure::event_bus::EventBus;

pub struct RecordingNotificationGateway {
    repository: Arc<dyn NotificationRepository>,
    event_bus: Arc<EventBus>,
}

impl RecordingNotificationGateway {
    pub fn new(repository: Arc<dyn NotificationRepository>, event_bus: Arc<EventBus>) -> Self {
        Self { repository, event_bus }
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn notify(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        let notification = Notification::from_request(request);

        self.repository
            .save(&notification)
            .await
            .map_err(|e| NotificationError::Storage(e.to_string()))?;

        debug!(
            "Recorded {} notification {} for user {}",
            notification.kind.as_str(),
            notification.id,
            notification.recipient
        );
        self.event_bus
            .publish_notification_event(NotificationEvent::NotificationCreated {
                notification_id: notification.id,
                recipient: notification.recipient,
                kind: notification.kind,
                created_at: notification.created_at,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;
    use crate::domain::user::UserId;
    use crate::infrastructure::event_bus::DomainEvent;
    use crate::infrastructure::repositories::InMemoryNotificationRepository;

    #[tokio::test]
    async fn test_notify_persists_and_publishes() {
        let repository = Arc::new(InMemoryNotificationRepository::new());
        let event_bus = Arc::new(EventBus::new(8));
        let mut receiver = event_bus.subscribe();
        let gateway = RecordingNotificationGateway::new(repository.clone(), event_bus);

        let recipient = UserId::new();
        gateway
            .notify(NotificationRequest::new(recipient, NotificationKind::TaskAssigned, "Set up the stage"))
            .await
            .unwrap();

        let stored = repository.find_by_recipient(recipient, true).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "Set up the stage");

        match receiver.recv().await.unwrap() {
            DomainEvent::Notification(NotificationEvent::NotificationCreated { recipient: r, .. }) => {
                assert_eq!(r, recipient)
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
