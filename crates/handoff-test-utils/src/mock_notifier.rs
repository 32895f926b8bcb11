// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` implements `Notifier` by capturing every notification for
//! later assertions. Delivery can be made to fail to exercise best-effort
//! paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use handoff_core::traits::adapter::PluginAdapter;
use handoff_core::traits::notifier::Notifier;
use handoff_core::types::{AdapterType, HealthStatus, Notification, NotificationKind};
use handoff_core::HandoffError;

/// A notifier that records what it was asked to deliver.
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Every notification passed to `notify()`, in order. Failed deliveries
    /// are not recorded.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Kinds of the captured notifications, in order.
    pub async fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().await.iter().map(|n| n.kind).collect()
    }

    pub async fn count_of(&self, kind: NotificationKind) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("delivery failing".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), HandoffError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HandoffError::Collaborator {
                message: "mock delivery failure".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
