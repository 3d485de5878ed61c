// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server mode implementation
//!
//! Handles:
//! - Service wiring from configuration
//! - Prometheus exporter
//! - Graceful shutdown

pub mod server;

pub use server::start_server;
