// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text generator adapter for deterministic testing.
//!
//! Responses are popped from a FIFO queue shared by `summarize` and
//! `suggest`. When the queue is empty a fixed default text is returned.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use handoff_core::traits::adapter::PluginAdapter;
use handoff_core::traits::generator::TextGenerator;
use handoff_core::types::{AdapterType, ConversationMessage, HealthStatus};
use handoff_core::HandoffError;

pub const DEFAULT_SUMMARY: &str = "mock summary";
pub const DEFAULT_SUGGESTION: &str = "mock suggestion";

/// A text generator with pre-configured responses.
pub struct MockTextGenerator {
    responses: Arc<Mutex<VecDeque<String>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Make subsequent calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `summarize` and `suggest` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next_response(&self, default: &str) -> Result<String, HandoffError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(HandoffError::Collaborator {
                message: "mock generation failure".to_string(),
                source: None,
            });
        }
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| default.to_string()))
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTextGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::TextGenerator
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn summarize(&self, _transcript: &[ConversationMessage]) -> Result<String, HandoffError> {
        self.next_response(DEFAULT_SUMMARY).await
    }

    async fn suggest(
        &self,
        _transcript: &[ConversationMessage],
        _signal: &str,
    ) -> Result<String, HandoffError> {
        self.next_response(DEFAULT_SUGGESTION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_then_default() {
        let generator = MockTextGenerator::with_responses(vec!["first".to_string()]);
        assert_eq!(generator.summarize(&[]).await.unwrap(), "first");
        assert_eq!(generator.suggest(&[], "x").await.unwrap(), DEFAULT_SUGGESTION);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn failure_injection() {
        let generator = MockTextGenerator::new();
        generator.set_failing(true);
        assert!(generator.summarize(&[]).await.is_err());
        generator.set_failing(false);
        assert_eq!(generator.summarize(&[]).await.unwrap(), DEFAULT_SUMMARY);
    }
}
