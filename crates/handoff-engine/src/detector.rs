// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-agreement detection over the recent conversation window.
//!
//! The detector only proposes an escalation. Whether one happens is up to the
//! caller.

use handoff_config::model::DetectorConfig;
use handoff_core::TextGenerator;
use handoff_core::types::{ConversationMessage, SenderKind};
use serde::Serialize;
use tracing::{debug, warn};

/// Built-in dissatisfaction phrases, matched case-insensitively as substrings.
pub const DISSATISFACTION_PHRASES: &[&str] = &[
    "not helping",
    "not helpful",
    "doesn't understand",
    "does not understand",
    "don't understand me",
    "try a different professional",
    "different professional",
    "someone else",
    "another professional",
    "not listening",
    "this isn't working",
    "this is not working",
    "waste of time",
    "not satisfied",
];

/// What the detector found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub should_escalate: bool,
    pub matched_phrase: Option<String>,
    /// The user turn that matched.
    pub message_id: Option<String>,
    /// Short empathetic reply from the text generator, when requested.
    pub suggestion: Option<String>,
}

/// Phrase matcher over the most recent user turns.
#[derive(Debug, Clone)]
pub struct NonAgreementDetector {
    phrases: Vec<String>,
    window: usize,
    suggest: bool,
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

impl NonAgreementDetector {
    pub fn from_config(config: &DetectorConfig) -> Self {
        let phrases = DISSATISFACTION_PHRASES
            .iter()
            .map(|p| p.to_string())
            .chain(config.extra_phrases.iter().map(|p| normalize(p.trim())))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            phrases,
            window: config.window,
            suggest: config.suggest,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The newest user turn inside the window that contains a phrase,
    /// together with the phrase.
    pub fn scan<'a>(
        &self,
        messages: &'a [ConversationMessage],
    ) -> Option<(&'a ConversationMessage, &str)> {
        let start = messages.len().saturating_sub(self.window);
        messages[start..]
            .iter()
            .rev()
            .filter(|m| m.sender_kind == SenderKind::User)
            .find_map(|m| {
                let text = normalize(&m.content);
                self.phrases
                    .iter()
                    .find(|phrase| text.contains(phrase.as_str()))
                    .map(|phrase| (m, phrase.as_str()))
            })
    }

    /// Scan `messages` (oldest first) and, on a match, optionally ask the
    /// generator for a suggestion. A failing generator does not hide the match.
    pub async fn detect(
        &self,
        messages: &[ConversationMessage],
        generator: Option<&dyn TextGenerator>,
    ) -> DetectionResult {
        let Some((message, phrase)) = self.scan(messages) else {
            debug!(turns = messages.len(), "no dissatisfaction signal");
            return DetectionResult::default();
        };

        let suggestion = match generator {
            Some(generator) if self.suggest => {
                let start = messages.len().saturating_sub(self.window);
                match generator.suggest(&messages[start..], phrase).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(error = %e, "suggestion request failed");
                        None
                    }
                }
            }
            _ => None,
        };

        DetectionResult {
            should_escalate: true,
            matched_phrase: Some(phrase.to_string()),
            message_id: Some(message.id.clone()),
            suggestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn turn(id: &str, kind: SenderKind, content: &str) -> ConversationMessage {
        ConversationMessage {
            id: id.to_string(),
            conversation_id: "c-1".to_string(),
            sender_id: "someone".to_string(),
            sender_kind: kind,
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn detector(window: usize) -> NonAgreementDetector {
        NonAgreementDetector::from_config(&DetectorConfig {
            window,
            ..DetectorConfig::default()
        })
    }

    #[test]
    fn matches_user_turns_case_insensitively() {
        let messages = vec![
            turn("m1", SenderKind::User, "hi"),
            turn("m2", SenderKind::Professional, "hello"),
            turn("m3", SenderKind::User, "Honestly this is NOT HELPING at all"),
        ];
        let detector = detector(10);
        let (message, phrase) = detector.scan(&messages).unwrap();
        assert_eq!(message.id, "m3");
        assert_eq!(phrase, "not helping");
    }

    #[test]
    fn curly_apostrophes_are_normalized() {
        let messages = vec![turn("m1", SenderKind::User, "She doesn\u{2019}t understand me")];
        let detector = detector(10);
        let (_, phrase) = detector.scan(&messages).unwrap();
        assert_eq!(phrase, "doesn't understand");
    }

    #[test]
    fn ignores_non_user_turns() {
        let messages = vec![turn(
            "m1",
            SenderKind::Assistant,
            "If I'm not helping, I can find someone else.",
        )];
        assert!(detector(10).scan(&messages).is_none());
    }

    #[test]
    fn only_the_window_is_inspected() {
        let mut messages = vec![turn("old", SenderKind::User, "waste of time")];
        for i in 0..3 {
            messages.push(turn(&format!("m{i}"), SenderKind::User, "thanks, that helps"));
        }
        assert!(detector(3).scan(&messages).is_none());
        assert_eq!(detector(4).scan(&messages).unwrap().0.id, "old");
    }

    #[test]
    fn extra_phrases_extend_the_list() {
        let detector = NonAgreementDetector::from_config(&DetectorConfig {
            extra_phrases: vec!["  Rubbish Advice ".to_string()],
            ..DetectorConfig::default()
        });
        let messages = vec![turn("m1", SenderKind::User, "That is rubbish advice.")];
        assert_eq!(detector.scan(&messages).unwrap().1, "rubbish advice");
    }

    #[tokio::test]
    async fn detect_without_generator_has_no_suggestion() {
        let messages = vec![turn("m1", SenderKind::User, "can I talk to someone else")];
        let result = detector(10).detect(&messages, None).await;
        assert!(result.should_escalate);
        assert_eq!(result.message_id.as_deref(), Some("m1"));
        assert!(result.suggestion.is_none());
    }

    #[tokio::test]
    async fn detect_reports_nothing_on_calm_conversation() {
        let messages = vec![turn("m1", SenderKind::User, "that makes sense, thank you")];
        assert_eq!(detector(10).detect(&messages, None).await, DetectionResult::default());
    }
}
