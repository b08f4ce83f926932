//! Interaction manager

use crate::actions::{self, ActionRejected, Outcome};
use crate::context::InteractionContext;
use crate::dispatch::{self, PinchContext};
use crate::proximity::{self, ProximityEvent};
use csi_core::{Hand, ItemId, Role};
use csi_inventory::{HandSlots, HeldItem, ItemRegistry, ItemType, SelectionOracle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interaction tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Shortest police tape segment that can be committed (meters)
    pub min_tape_segment: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_tape_segment: 0.2,
        }
    }
}

/// Grab failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrabError {
    #[error("Hands are disabled")]
    HandsDisabled,
    #[error("{0} is not selected by either hand")]
    NotSelected(ItemId),
    #[error("Unknown item {0}")]
    UnknownItem(ItemId),
}

/// A performed interaction
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEvent {
    pub hand: Hand,
    pub item: ItemId,
    pub item_type: ItemType,
    pub role: Role,
    pub outcome: Outcome,
}

impl InteractionEvent {
    /// One-line summary
    pub fn describe(&self) -> String {
        format!(
            "{} used {} ({} hand): {}",
            self.role.display_name(),
            self.item_type.display_name(),
            self.hand,
            self.outcome.name()
        )
    }
}

/// Hand slots plus pinch and proximity handling
#[derive(Debug, Default)]
pub struct InteractionManager {
    config: InteractionConfig,
    hands: HandSlots,
    pending: Vec<InteractionEvent>,
}

impl InteractionManager {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            hands: HandSlots::new(),
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn hands(&self) -> &HandSlots {
        &self.hands
    }

    /// Mutable hands, for the role hand-off
    pub fn hands_mut(&mut self) -> &mut HandSlots {
        &mut self.hands
    }

    /// Item in a hand
    pub fn held(&self, hand: Hand) -> Option<HeldItem> {
        self.hands.get(hand)
    }

    /// Bind an item to whichever hand's interactor selects it
    pub fn grab(
        &mut self,
        item: ItemId,
        selection: &dyn SelectionOracle,
        items: &mut ItemRegistry,
    ) -> Result<Hand, GrabError> {
        let hand = Hand::BOTH
            .into_iter()
            .find(|hand| selection.selected_by(*hand) == Some(item))
            .ok_or(GrabError::NotSelected(item))?;
        self.grab_with(hand, item, items)?;
        Ok(hand)
    }

    /// Bind an item to a specific hand. An item held by the other hand moves.
    pub fn grab_with(
        &mut self,
        hand: Hand,
        item: ItemId,
        items: &mut ItemRegistry,
    ) -> Result<(), GrabError> {
        if !self.hands.is_enabled() {
            return Err(GrabError::HandsDisabled);
        }
        let item_type = items.item_type(item).ok_or(GrabError::UnknownItem(item))?;

        if let Some(displaced) = self.hands.insert(hand, HeldItem::new(item, item_type)) {
            if displaced.id != item {
                log::debug!("{} dropped {} for {}", hand, displaced.id, item);
                if let Some(dropped) = items.get_mut(displaced.id) {
                    dropped.held_by = None;
                }
            }
        }
        if let Some(grabbed) = items.get_mut(item) {
            grabbed.held_by = Some(hand);
        }
        log::debug!("{} hand grabbed {} ({})", hand, item, item_type.display_name());
        Ok(())
    }

    /// Empty a hand
    pub fn release(&mut self, hand: Hand, items: &mut ItemRegistry) -> Option<HeldItem> {
        if !self.hands.is_enabled() {
            log::warn!("Ignoring release from {} hand while hands are disabled", hand);
            return None;
        }
        let released = self.hands.take(hand)?;
        if let Some(item) = items.get_mut(released.id) {
            item.held_by = None;
        }
        log::debug!("{} hand released {}", hand, released.id);
        Some(released)
    }

    /// Release an item from whichever hand holds it
    pub fn release_item(&mut self, item: ItemId, items: &mut ItemRegistry) -> Option<Hand> {
        let hand = self.hands.find(item)?;
        self.release(hand, items).map(|_| hand)
    }

    /// Apply a proximity report
    pub fn on_proximity(&mut self, event: ProximityEvent, ctx: &mut InteractionContext<'_>) {
        proximity::apply(event, ctx);
    }

    /// Perform whatever a pinch with `hand` means right now
    pub fn pinch(
        &mut self,
        hand: Hand,
        ctx: &mut InteractionContext<'_>,
    ) -> Result<InteractionEvent, ActionRejected> {
        if !self.hands.is_enabled() {
            return Err(ActionRejected::HandsDisabled);
        }
        let this = self.hands.get(hand).ok_or(ActionRejected::EmptyHand(hand))?;
        let item = ctx
            .items
            .get(this.id)
            .ok_or(ActionRejected::UnknownItem(this.id))?;
        if item.paused {
            return Err(ActionRejected::Paused(this.id));
        }

        let pinch = PinchContext {
            this,
            other: self.hands.get(hand.other()),
            item,
            items: &*ctx.items,
            scene: &*ctx.scene,
        };
        let (rule, action) =
            dispatch::resolve(&pinch).ok_or(ActionRejected::NoAction(this.item_type))?;

        match actions::perform(action, this, &self.config, ctx) {
            Ok(outcome) => {
                let event = InteractionEvent {
                    hand,
                    item: this.id,
                    item_type: this.item_type,
                    role: ctx.role,
                    outcome,
                };
                log::info!("{}", event.describe());
                self.pending.push(event.clone());
                Ok(event)
            }
            Err(rejected) => {
                log::warn!("{} rejected: {}", rule.name, rejected);
                Err(rejected)
            }
        }
    }

    /// Drain performed interactions
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.pending)
    }
}
