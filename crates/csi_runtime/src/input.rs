//! Controller input translation
//!
//! The XR toolkit hands us one [`ControllerSample`] per hand per frame.
//! [`InputManager`] turns level changes into edge events and queues them
//! for the session.

use csi_core::Hand;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trigger value above which a pinch starts
pub const PRESS_THRESHOLD: f32 = 0.7;
/// Trigger value below which a pinch ends
pub const RELEASE_THRESHOLD: f32 = 0.3;
/// Thumbstick deflection below which no event is queued
pub const STICK_NOISE: f32 = 0.1;

/// Raw controller state for one hand
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSample {
    /// Trigger value (0.0 - 1.0)
    pub trigger: f32,
    /// Grip value (0.0 - 1.0)
    pub grip: f32,
    /// Primary button (A/X)
    pub primary: bool,
    /// Secondary button (B/Y)
    pub secondary: bool,
    pub thumbstick: Vec2,
}

/// Edge-triggered input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PinchStarted(Hand),
    PinchEnded(Hand),
    GripStarted(Hand),
    GripEnded(Hand),
    PrimaryPressed(Hand),
    SecondaryPressed(Hand),
    Thumbstick { hand: Hand, value: Vec2 },
}

impl InputEvent {
    pub fn hand(&self) -> Hand {
        match *self {
            Self::PinchStarted(hand)
            | Self::PinchEnded(hand)
            | Self::GripStarted(hand)
            | Self::GripEnded(hand)
            | Self::PrimaryPressed(hand)
            | Self::SecondaryPressed(hand)
            | Self::Thumbstick { hand, .. } => hand,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HandLatch {
    pinching: bool,
    gripping: bool,
    primary: bool,
    secondary: bool,
}

/// Per-hand edge detector with an event queue
#[derive(Debug, Default)]
pub struct InputManager {
    latches: [HandLatch; 2],
    event_queue: VecDeque<InputEvent>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest sample for a hand
    pub fn update(&mut self, hand: Hand, sample: ControllerSample) {
        let latch = &mut self.latches[hand.index()];
        let mut events = Vec::new();

        if let Some(pressed) = hysteresis(latch.pinching, sample.trigger) {
            latch.pinching = pressed;
            events.push(if pressed {
                InputEvent::PinchStarted(hand)
            } else {
                InputEvent::PinchEnded(hand)
            });
        }

        if let Some(pressed) = hysteresis(latch.gripping, sample.grip) {
            latch.gripping = pressed;
            events.push(if pressed {
                InputEvent::GripStarted(hand)
            } else {
                InputEvent::GripEnded(hand)
            });
        }

        if sample.primary && !latch.primary {
            events.push(InputEvent::PrimaryPressed(hand));
        }
        latch.primary = sample.primary;

        if sample.secondary && !latch.secondary {
            events.push(InputEvent::SecondaryPressed(hand));
        }
        latch.secondary = sample.secondary;

        if sample.thumbstick.length() > STICK_NOISE {
            events.push(InputEvent::Thumbstick {
                hand,
                value: sample.thumbstick,
            });
        }

        self.event_queue.extend(events);
    }

    /// Queue an event directly
    pub fn dispatch(&mut self, event: InputEvent) {
        self.event_queue.push_back(event);
    }

    /// Take the oldest queued event
    pub fn poll(&mut self) -> Option<InputEvent> {
        self.event_queue.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<InputEvent> {
        self.event_queue.drain(..).collect()
    }

    pub fn is_pinching(&self, hand: Hand) -> bool {
        self.latches[hand.index()].pinching
    }
}

/// New latch state if the analog value crossed a threshold
fn hysteresis(latched: bool, value: f32) -> Option<bool> {
    if !latched && value >= PRESS_THRESHOLD {
        Some(true)
    } else if latched && value <= RELEASE_THRESHOLD {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(value: f32) -> ControllerSample {
        ControllerSample {
            trigger: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_pinch_edges() {
        let mut input = InputManager::new();

        input.update(Hand::Right, trigger(0.9));
        input.update(Hand::Right, trigger(0.9));
        input.update(Hand::Right, trigger(0.5));
        assert!(input.is_pinching(Hand::Right));
        input.update(Hand::Right, trigger(0.1));

        assert_eq!(
            input.drain_events(),
            vec![
                InputEvent::PinchStarted(Hand::Right),
                InputEvent::PinchEnded(Hand::Right),
            ]
        );
        assert!(!input.is_pinching(Hand::Right));
    }

    #[test]
    fn test_buttons_fire_once_per_press() {
        let mut input = InputManager::new();
        let held = ControllerSample {
            secondary: true,
            ..Default::default()
        };

        input.update(Hand::Left, held);
        input.update(Hand::Left, held);
        input.update(Hand::Left, ControllerSample::default());
        input.update(Hand::Left, held);

        let events = input.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| *e == InputEvent::SecondaryPressed(Hand::Left)));
    }

    #[test]
    fn test_thumbstick_noise() {
        let mut input = InputManager::new();
        input.update(
            Hand::Left,
            ControllerSample {
                thumbstick: Vec2::new(0.05, 0.0),
                ..Default::default()
            },
        );
        assert!(input.poll().is_none());

        input.update(
            Hand::Left,
            ControllerSample {
                thumbstick: Vec2::new(0.0, -0.8),
                ..Default::default()
            },
        );
        assert_eq!(
            input.poll(),
            Some(InputEvent::Thumbstick {
                hand: Hand::Left,
                value: Vec2::new(0.0, -0.8)
            })
        );
    }

    #[test]
    fn test_hands_are_independent() {
        let mut input = InputManager::new();
        input.update(Hand::Left, trigger(1.0));
        input.update(Hand::Right, trigger(0.0));
        assert!(input.is_pinching(Hand::Left));
        assert!(!input.is_pinching(Hand::Right));
        assert_eq!(input.poll().map(|e| e.hand()), Some(Hand::Left));
    }
}
