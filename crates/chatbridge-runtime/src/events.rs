// Turn events: the upstream units the bridge translates
//
// An agent turn is a finite stream of TurnEvents. `content: None` signals
// "turn started, no text yet". `partial: true` marks a delta; a
// non-partial event carries the full text of the current part.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;

/// A finite, non-restartable stream of turn events.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnEvent>> + Send>>;

/// One part of a turn's content. Currently text only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TurnPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Content carried by one turn event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<TurnPart>,
}

impl TurnContent {
    /// Single-part text content authored by the user.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".into()),
            parts: vec![TurnPart::text(text)],
        }
    }

    /// Single-part text content authored by the agent.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("model".into()),
            parts: vec![TurnPart::text(text)],
        }
    }

    /// All text parts joined with a space, trimmed.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        parts.join(" ").trim().to_string()
    }
}

/// The upstream unit consumed from the agent runtime. Carries no identity
/// of its own; the translator assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TurnContent>,
    #[serde(default)]
    pub partial: bool,
}

impl TurnEvent {
    /// "Turn started, no text yet."
    pub fn started() -> Self {
        Self {
            content: None,
            partial: false,
        }
    }

    /// An incremental text delta.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            content: Some(TurnContent::agent_text(text)),
            partial: true,
        }
    }

    /// The final state of the current part.
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            content: Some(TurnContent::agent_text(text)),
            partial: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_text_joins_parts() {
        let content = TurnContent {
            role: None,
            parts: vec![TurnPart::text("a"), TurnPart { text: None }, TurnPart::text("b")],
        };
        assert_eq!(content.text(), "a b");
    }

    #[test]
    fn started_event_has_no_content() {
        let event = TurnEvent::started();
        assert!(event.content.is_none());
        assert!(!event.partial);
    }

    #[test]
    fn event_serde_round_trip() {
        let event = TurnEvent::delta("Hel");
        let json = serde_json::to_string(&event).unwrap();
        let back: TurnEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
