// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Volunteer Hub core
//!
//! Volunteer workflow engine for community events: applications, event
//! rosters, per-event tasks and the derived role of every user.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain rules, transactional application services, storage
//!   adapters and the HTTP API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
