// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery for the standalone binary.
//!
//! Delivery channels live outside this service, so the binary records each
//! notification as a structured log event for a log shipper to pick up.

use async_trait::async_trait;
use handoff_core::types::{AdapterType, HealthStatus, Notification};
use handoff_core::{HandoffError, Notifier, PluginAdapter};
use tracing::info;

/// Emits every notification as an `info!` event.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginAdapter for LogNotifier {
    fn name(&self) -> &str {
        "log-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), HandoffError> {
        info!(
            conversation_id = %notification.conversation_id,
            recipient_id = %notification.recipient_id,
            kind = %notification.kind,
            session_id = notification.session_id.as_deref().unwrap_or_default(),
            text = %notification.text,
            "notification"
        );
        Ok(())
    }
}
