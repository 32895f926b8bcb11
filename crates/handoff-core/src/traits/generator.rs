// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-generation boundary used for hand-off summaries and suggestions.

use async_trait::async_trait;

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ConversationMessage;

/// Produces short natural-language texts from conversation transcripts.
#[async_trait]
pub trait TextGenerator: PluginAdapter {
    /// Summarizes the conversation for the professional taking over.
    async fn summarize(&self, transcript: &[ConversationMessage]) -> Result<String, HandoffError>;

    /// Produces a short empathetic suggestion after a dissatisfaction signal.
    async fn suggest(
        &self,
        transcript: &[ConversationMessage],
        signal: &str,
    ) -> Result<String, HandoffError>;
}
