// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod event_bus;
pub mod notifications;
pub mod repositories;
pub mod token_issuer;

pub use event_bus::{DomainEvent, EventBus};
pub use token_issuer::JwtTokenIssuer;
