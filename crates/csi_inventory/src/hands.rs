//! Hand slots

use crate::item::ItemType;
use csi_core::{Hand, ItemId};

/// What a hand holds: the item and its type, resolved once at grab time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeldItem {
    pub id: ItemId,
    pub item_type: ItemType,
}

impl HeldItem {
    pub fn new(id: ItemId, item_type: ItemType) -> Self {
        Self { id, item_type }
    }
}

/// The engine's "which item does this hand's interactor select" predicate
pub trait SelectionOracle {
    /// Item currently selected by a hand's interactor
    fn selected_by(&self, hand: Hand) -> Option<ItemId>;
}

/// Fixed selection, for hosts that push selection state explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticSelection {
    pub left: Option<ItemId>,
    pub right: Option<ItemId>,
}

impl StaticSelection {
    /// Only `hand` selects `item`
    pub fn single(hand: Hand, item: ItemId) -> Self {
        let mut selection = Self::default();
        match hand {
            Hand::Left => selection.left = Some(item),
            Hand::Right => selection.right = Some(item),
        }
        selection
    }
}

impl SelectionOracle for StaticSelection {
    fn selected_by(&self, hand: Hand) -> Option<ItemId> {
        match hand {
            Hand::Left => self.left,
            Hand::Right => self.right,
        }
    }
}

/// Two hand slots. An item is never in both at once.
#[derive(Debug, Clone)]
pub struct HandSlots {
    slots: [Option<HeldItem>; 2],
    /// Hand interaction enabled (disabled during role hand-off)
    enabled: bool,
}

impl HandSlots {
    /// Create empty, enabled slots
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            enabled: true,
        }
    }

    /// Item in a hand
    pub fn get(&self, hand: Hand) -> Option<HeldItem> {
        self.slots[hand.index()]
    }

    /// Check if a hand is empty
    pub fn is_empty(&self, hand: Hand) -> bool {
        self.slots[hand.index()].is_none()
    }

    /// Hand holding an item
    pub fn find(&self, id: ItemId) -> Option<Hand> {
        Hand::BOTH
            .into_iter()
            .find(|hand| self.slots[hand.index()].map(|h| h.id) == Some(id))
    }

    /// Put an item in a hand, first removing it from the other hand.
    /// Returns whatever the hand held before, if it was a different item.
    pub fn insert(&mut self, hand: Hand, item: HeldItem) -> Option<HeldItem> {
        if let Some(previous) = self.find(item.id) {
            self.slots[previous.index()] = None;
        }
        self.slots[hand.index()].replace(item)
    }

    /// Empty a hand
    pub fn take(&mut self, hand: Hand) -> Option<HeldItem> {
        self.slots[hand.index()].take()
    }

    /// Everything held, left first
    pub fn held(&self) -> impl Iterator<Item = (Hand, HeldItem)> + '_ {
        Hand::BOTH
            .into_iter()
            .filter_map(move |hand| self.slots[hand.index()].map(|item| (hand, item)))
    }

    /// Empty both hands
    pub fn clear(&mut self) -> Vec<(Hand, HeldItem)> {
        let held: Vec<_> = self.held().collect();
        self.slots = [None, None];
        held
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for HandSlots {
    fn default() -> Self {
        Self::new()
    }
}
