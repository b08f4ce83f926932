//! Thought bubbles
//!
//! Short hints shown to the trainee when an action does nothing.

use csi_evidence::PlaceError;
use csi_interaction::ActionRejected;
use csi_roles::RoleChangeError;
use csi_timeline::TimelineError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bubble timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    /// Seconds a bubble stays up
    pub display_seconds: f32,
    /// Bubbles shown at once; the oldest is dropped beyond this
    pub max_visible: usize,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            display_seconds: 3.0,
            max_visible: 3,
        }
    }
}

/// A visible bubble
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub text: String,
    pub remaining: f32,
}

/// Timed hint queue
#[derive(Debug, Default)]
pub struct ThoughtBubbles {
    config: BubbleConfig,
    visible: VecDeque<Bubble>,
}

impl ThoughtBubbles {
    pub fn new(config: BubbleConfig) -> Self {
        Self {
            config,
            visible: VecDeque::new(),
        }
    }

    /// Show a bubble. Showing the same text again restarts its timer.
    pub fn show(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.visible.retain(|bubble| bubble.text != text);
        log::debug!("Thought bubble: {}", text);
        self.visible.push_back(Bubble {
            text,
            remaining: self.config.display_seconds,
        });
        while self.visible.len() > self.config.max_visible.max(1) {
            self.visible.pop_front();
        }
    }

    pub fn tick(&mut self, dt: f32) {
        for bubble in &mut self.visible {
            bubble.remaining -= dt;
        }
        self.visible.retain(|bubble| bubble.remaining > 0.0);
    }

    /// Newest visible bubble
    pub fn current(&self) -> Option<&str> {
        self.visible.back().map(|bubble| bubble.text.as_str())
    }

    pub fn visible(&self) -> impl Iterator<Item = &Bubble> {
        self.visible.iter()
    }

    pub fn clear(&mut self) {
        self.visible.clear();
    }
}

/// Hint for a rejected action, if the trainee can do something about it
pub fn rejection_hint(rejected: &ActionRejected) -> Option<String> {
    let text = match rejected {
        ActionRejected::NotPermitted(_) => "I can't do that yet.".to_string(),
        ActionRejected::Timeline(TimelineError::NotOccurred(event)) => {
            format!("I don't know when this happened yet: {}.", event.label())
        }
        ActionRejected::Placement(PlaceError::TooClose { .. }) => {
            "That's too close to another marker.".to_string()
        }
        ActionRejected::Placement(PlaceError::NoFreeSlot(_)) => {
            "I'm out of markers.".to_string()
        }
        ActionRejected::SegmentTooShort { .. } => "The tape line is too short.".to_string(),
        ActionRejected::BrushNotLoaded => "The brush needs powder first.".to_string(),
        ActionRejected::PrintNotRevealed(_) => "I should dust this print first.".to_string(),
        ActionRejected::TapeOutOfOrder(_) => "The lifting tape isn't ready for that.".to_string(),
        ActionRejected::TweezersEmpty => "The tweezers aren't holding anything.".to_string(),
        ActionRejected::PackEmpty => "There's nothing in the evidence pack.".to_string(),
        ActionRejected::PackNotSealed => "I need to seal the pack before signing it.".to_string(),
        _ => return None,
    };
    Some(text)
}

/// Hint for a refused role change
pub fn role_hint(error: &RoleChangeError) -> Option<String> {
    match error {
        RoleChangeError::AlreadyActive(role) => Some(format!("I'm already the {}.", role.display_name())),
        RoleChangeError::MissingPrefab(role) => {
            Some(format!("The {} isn't available.", role.display_name()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csi_timeline::TimelineEvent;

    #[test]
    fn test_bubble_expires() {
        let mut bubbles = ThoughtBubbles::new(BubbleConfig {
            display_seconds: 1.0,
            max_visible: 3,
        });
        bubbles.show("first");
        bubbles.tick(0.6);
        bubbles.show("second");
        bubbles.tick(0.6);

        assert_eq!(bubbles.visible().count(), 1);
        assert_eq!(bubbles.current(), Some("second"));

        bubbles.tick(1.0);
        assert!(bubbles.current().is_none());
    }

    #[test]
    fn test_repeat_restarts_timer() {
        let mut bubbles = ThoughtBubbles::new(BubbleConfig::default());
        bubbles.show("again");
        bubbles.tick(2.0);
        bubbles.show("again");
        bubbles.tick(2.0);
        assert_eq!(bubbles.visible().count(), 1);
        assert_eq!(bubbles.current(), Some("again"));
    }

    #[test]
    fn test_visible_cap() {
        let mut bubbles = ThoughtBubbles::new(BubbleConfig {
            display_seconds: 5.0,
            max_visible: 2,
        });
        bubbles.show("a");
        bubbles.show("b");
        bubbles.show("c");
        let texts: Vec<_> = bubbles.visible().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_hints() {
        assert!(rejection_hint(&ActionRejected::BrushNotLoaded).is_some());
        assert!(rejection_hint(&ActionRejected::Timeline(TimelineError::NotOccurred(
            TimelineEvent::FirstResponderArrived
        )))
        .is_some());
        assert!(rejection_hint(&ActionRejected::HandsDisabled).is_none());
    }
}
