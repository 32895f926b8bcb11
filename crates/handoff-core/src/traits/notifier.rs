// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery boundary (push, in-conversation messages).

use async_trait::async_trait;

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Notification;

/// Delivers user- and professional-facing notifications.
#[async_trait]
pub trait Notifier: PluginAdapter {
    /// Sends a notification. Delivery guarantees belong to the implementation.
    async fn notify(&self, notification: &Notification) -> Result<(), HandoffError>;
}
