// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Aggregates, value objects and ports for the volunteer workflow.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure workflow rules; no I/O beyond the repository and gateway traits

pub mod error;
pub mod event;
pub mod events;
pub mod hub_config;
pub mod membership;
pub mod notification;
pub mod permission;
pub mod repository;
pub mod task;
pub mod token;
pub mod user;
pub mod volunteer_application;
