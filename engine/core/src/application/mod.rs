// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_volunteers;
pub mod notifications;
pub mod notifier;
pub mod repository_factory;
pub mod role_aggregator;
pub mod task_workflow;
pub(crate) mod unit_of_work;
pub mod volunteer_applications;

// Re-export services for convenience
pub use event_volunteers::{MembershipService, StandardMembershipService};
pub use notifications::{NotificationService, StandardNotificationService};
pub use notifier::Notifier;
pub use repository_factory::{create_repositories, Repositories};
pub use role_aggregator::{RoleAggregator, RoleService, RoleSwitch, StandardRoleService};
pub use task_workflow::{StandardTaskService, TaskService};
pub use volunteer_applications::{ApplicationService, NewApplication, StandardApplicationService};
