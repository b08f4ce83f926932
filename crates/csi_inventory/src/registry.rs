//! Item registry

use crate::item::{ItemState, ItemType, PowderType};
use csi_core::{Hand, IdGenerator, ItemId, Pose, SceneObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Something an item is physically touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactTarget {
    Item(ItemId),
    Object(SceneObjectId),
}

/// An item in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub item_type: ItemType,
    pub name: String,
    pub pose: Pose,
    /// Physics/interaction suspended (during role hand-off)
    pub paused: bool,
    /// Hand currently holding the item
    pub held_by: Option<Hand>,
    /// Current contacts reported by the physics collaborator
    pub contacts: Vec<ContactTarget>,
    pub state: ItemState,
}

impl Item {
    /// Create an item with the default state for its type
    pub fn new(id: ItemId, item_type: ItemType, pose: Pose) -> Self {
        Self {
            id,
            item_type,
            name: item_type.display_name().to_string(),
            pose,
            paused: false,
            held_by: None,
            contacts: Vec::new(),
            state: ItemState::for_type(item_type),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set powder for a jar or pre-loaded brush
    pub fn with_powder(mut self, powder: PowderType) -> Self {
        match &mut self.state {
            ItemState::PowderJar { powder: p } => *p = powder,
            ItemState::Brush { powder: p } => *p = Some(powder),
            _ => log::warn!("{} cannot carry powder", self.name),
        }
        self
    }

    /// Check if touching a target
    pub fn touches(&self, target: ContactTarget) -> bool {
        self.contacts.contains(&target)
    }

    /// Scene objects currently touched
    pub fn touched_objects(&self) -> impl Iterator<Item = SceneObjectId> + '_ {
        self.contacts.iter().filter_map(|c| match c {
            ContactTarget::Object(id) => Some(*id),
            ContactTarget::Item(_) => None,
        })
    }
}

/// Every item in the scene, keyed by id
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: BTreeMap<ItemId, Item>,
    ids: IdGenerator,
}

impl ItemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an item with the default state for its type
    pub fn spawn(&mut self, item_type: ItemType, pose: Pose) -> ItemId {
        let id = ItemId(self.ids.next_raw());
        self.items.insert(id, Item::new(id, item_type, pose));
        id
    }

    /// Spawn an item after customising it
    pub fn spawn_with<F>(&mut self, item_type: ItemType, pose: Pose, customise: F) -> ItemId
    where
        F: FnOnce(Item) -> Item,
    {
        let id = ItemId(self.ids.next_raw());
        self.items.insert(id, customise(Item::new(id, item_type, pose)));
        id
    }

    /// Insert a fully built item (restoring a save). Replaces an existing id.
    pub fn insert(&mut self, item: Item) {
        self.ids.reserve_past(item.id.raw());
        self.items.insert(item.id, item);
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Item type of a live item
    pub fn item_type(&self, id: ItemId) -> Option<ItemType> {
        self.items.get(&id).map(|item| item.item_type)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Suspend or resume an item's simulation
    pub fn set_paused(&mut self, id: ItemId, paused: bool) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Move an item
    pub fn set_pose(&mut self, id: ItemId, pose: Pose) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.pose = pose;
                true
            }
            None => false,
        }
    }

    /// Record a contact. Returns false for unknown items or duplicate contacts.
    pub fn add_contact(&mut self, id: ItemId, target: ContactTarget) -> bool {
        match self.items.get_mut(&id) {
            Some(item) if !item.contacts.contains(&target) => {
                item.contacts.push(target);
                true
            }
            _ => false,
        }
    }

    /// Forget a contact
    pub fn remove_contact(&mut self, id: ItemId, target: ContactTarget) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                let before = item.contacts.len();
                item.contacts.retain(|c| *c != target);
                before != item.contacts.len()
            }
            None => false,
        }
    }

    /// Copy out every item
    pub fn snapshot(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    /// Replace contents with saved items
    pub fn restore(&mut self, items: Vec<Item>) {
        self.items.clear();
        for item in items {
            self.insert(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::TapeStage;

    #[test]
    fn test_spawn_and_lookup() {
        let mut items = ItemRegistry::new();
        let pen = items.spawn(ItemType::Pen, Pose::default());
        let tape = items.spawn(ItemType::FingerprintTapeRoll, Pose::default());

        assert_ne!(pen, tape);
        assert_eq!(items.item_type(pen), Some(ItemType::Pen));
        assert_eq!(
            items.get(tape).and_then(|i| i.state.tape_stage()),
            Some(TapeStage::Retracted)
        );
    }

    #[test]
    fn test_spawn_with_powder() {
        let mut items = ItemRegistry::new();
        let jar = items.spawn_with(ItemType::PowderJar, Pose::default(), |item| {
            item.with_powder(PowderType::Fluorescent)
        });
        assert_eq!(items.get(jar).and_then(|i| i.state.powder()), Some(PowderType::Fluorescent));
    }

    #[test]
    fn test_contacts() {
        let mut items = ItemRegistry::new();
        let brush = items.spawn(ItemType::FingerprintBrush, Pose::default());
        let print = ContactTarget::Object(SceneObjectId(9));

        assert!(items.add_contact(brush, print));
        assert!(!items.add_contact(brush, print));
        assert_eq!(items.get(brush).unwrap().touched_objects().collect::<Vec<_>>(), vec![SceneObjectId(9)]);
        assert!(items.remove_contact(brush, print));
        assert!(!items.get(brush).unwrap().touches(print));
    }

    #[test]
    fn test_restore_keeps_ids_unique() {
        let mut items = ItemRegistry::new();
        let saved = vec![Item::new(ItemId(10), ItemType::Camera, Pose::default())];
        items.restore(saved);

        let fresh = items.spawn(ItemType::Pen, Pose::default());
        assert!(fresh.raw() > 10);
        assert_eq!(items.len(), 2);
    }
}
