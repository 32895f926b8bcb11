// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-off orchestration for the Handoff escalation service.
//!
//! [`HandoffService`] is the single entry point the hosting application
//! calls. It owns the guarded session lifecycle, the escalation policy engine,
//! the timeout and inactivity sweeps, and the non-agreement detector, and is
//! written purely against the collaborator traits in `handoff-core`.

pub mod detector;
pub mod escalation;
pub mod lifecycle;
pub mod monitor;
mod notify;
pub mod policy;
pub mod service;

pub use detector::{DetectionResult, NonAgreementDetector};
pub use escalation::EscalationOutcome;
pub use lifecycle::{NewSession, RematchOutcome};
pub use monitor::{SweepKind, SweepReport};
pub use policy::{EscalationDecision, RulePolicy};
pub use service::{HandoffService, HelpRequest};
