// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`volunteer-hub-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. No business logic lives here.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | REST endpoints under `/api/v1` plus `/health` |

pub mod api;
