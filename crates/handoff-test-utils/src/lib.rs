// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Handoff integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockNotifier`] - captures notifications, optional delivery failure
//! - [`MockTextGenerator`] - scripted summaries and suggestions
//! - [`ManualClock`] - settable wall clock
//! - [`TestHarness`] - temp SQLite store plus a fully wired service

pub mod clock;
pub mod harness;
pub mod mock_generator;
pub mod mock_notifier;

pub use clock::ManualClock;
pub use harness::{TestHarness, professional, rule};
pub use mock_generator::MockTextGenerator;
pub use mock_notifier::MockNotifier;
