//! Pinch dispatch table
//!
//! Every rule is checked on every pinch. When more than one matches, the
//! overlap is logged and the highest priority wins (declaration order breaks
//! ties).

use csi_core::{ItemId, SceneObjectId};
use csi_evidence::MarkerKind;
use csi_inventory::{
    ContactTarget, HeldItem, Item, ItemRegistry, ItemState, ItemType, SceneObjectKind, SceneObjects,
};
use std::cmp::Reverse;

/// What a pinch does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WriteNotepad { notepad: ItemId },
    WriteForm { form: ItemId },
    SignPack { pack: ItemId },
    PoliceTape,
    Measure,
    PlaceMarker(MarkerKind),
    Photograph,
    CallToc,
    ToggleFlashlight,
    ToggleGloves,
    LoadBrush { jar: ItemId },
    DustPrint { print: SceneObjectId },
    ExtendTape,
    LiftPrint { print: SceneObjectId },
    AttachPrint { card: ItemId },
    PickEvidence { evidence: SceneObjectId },
    BagEvidence { pack: ItemId },
    SealPack { pack: ItemId },
    TakeSwab { evidence: SceneObjectId },
}

/// What a rule can see
pub struct PinchContext<'a> {
    /// Item in the pinching hand
    pub this: HeldItem,
    /// Item in the other hand
    pub other: Option<HeldItem>,
    pub item: &'a Item,
    pub items: &'a ItemRegistry,
    pub scene: &'a SceneObjects,
}

impl PinchContext<'_> {
    /// Other hand's item if it has this type
    pub fn other_is(&self, item_type: ItemType) -> Option<ItemId> {
        self.other
            .filter(|held| held.item_type == item_type)
            .map(|held| held.id)
    }

    /// First touched item matching a predicate
    pub fn touching_item(&self, predicate: impl Fn(ItemType) -> bool) -> Option<ItemId> {
        self.item.contacts.iter().find_map(|contact| match contact {
            ContactTarget::Item(id) => self
                .items
                .item_type(*id)
                .filter(|t| predicate(*t))
                .map(|_| *id),
            ContactTarget::Object(_) => None,
        })
    }

    /// First touched scene object matching a predicate
    pub fn touching_object(&self, predicate: impl Fn(&SceneObjectKind) -> bool) -> Option<SceneObjectId> {
        self.item
            .touched_objects()
            .find(|id| self.scene.get(*id).map_or(false, |o| predicate(&o.kind)))
    }

    fn touching_fingerprint(&self) -> Option<SceneObjectId> {
        self.touching_object(|kind| matches!(kind, SceneObjectKind::Fingerprint { .. }))
    }

    fn touching_evidence(&self) -> Option<SceneObjectId> {
        self.touching_object(|kind| matches!(kind, SceneObjectKind::Evidence { .. }))
    }

    fn is(&self, item_type: ItemType) -> bool {
        self.this.item_type == item_type
    }
}

/// One dispatch rule
pub struct Rule {
    pub name: &'static str,
    /// Higher wins
    pub priority: i32,
    pub matcher: fn(&PinchContext<'_>) -> Option<Action>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

fn pen_write(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::Pen) {
        return None;
    }
    // The tip decides; a held page only counts when the tip touches nothing
    let target = p.touching_item(|t| t.is_writable()).or_else(|| {
        p.other
            .filter(|held| held.item_type.is_writable())
            .map(|held| held.id)
    })?;

    match p.items.item_type(target)? {
        ItemType::Notepad => Some(Action::WriteNotepad { notepad: target }),
        ItemType::EvidencePack => Some(Action::SignPack { pack: target }),
        _ => Some(Action::WriteForm { form: target }),
    }
}

fn seal_pack(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::SealTapeRoll) {
        return None;
    }
    p.other_is(ItemType::EvidencePack)
        .map(|pack| Action::SealPack { pack })
}

fn bag_evidence(p: &PinchContext<'_>) -> Option<Action> {
    let holding = matches!(p.item.state, ItemState::Tweezers { holding: Some(_) });
    if !p.is(ItemType::Tweezers) || !holding {
        return None;
    }
    p.other_is(ItemType::EvidencePack)
        .map(|pack| Action::BagEvidence { pack })
}

fn pick_evidence(p: &PinchContext<'_>) -> Option<Action> {
    let empty = matches!(p.item.state, ItemState::Tweezers { holding: None });
    if !p.is(ItemType::Tweezers) || !empty {
        return None;
    }
    p.touching_evidence()
        .map(|evidence| Action::PickEvidence { evidence })
}

fn take_swab(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::Swab) {
        return None;
    }
    p.touching_evidence()
        .map(|evidence| Action::TakeSwab { evidence })
}

fn load_brush(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::FingerprintBrush) {
        return None;
    }
    p.other_is(ItemType::PowderJar)
        .map(|jar| Action::LoadBrush { jar })
}

fn dust_print(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::FingerprintBrush) {
        return None;
    }
    p.touching_fingerprint()
        .map(|print| Action::DustPrint { print })
}

fn attach_print(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::FingerprintTapeRoll) {
        return None;
    }
    p.other_is(ItemType::FingerprintCard)
        .map(|card| Action::AttachPrint { card })
}

fn lift_print(p: &PinchContext<'_>) -> Option<Action> {
    if !p.is(ItemType::FingerprintTapeRoll) {
        return None;
    }
    p.touching_fingerprint()
        .map(|print| Action::LiftPrint { print })
}

fn extend_tape(p: &PinchContext<'_>) -> Option<Action> {
    (p.is(ItemType::FingerprintTapeRoll) && p.touching_fingerprint().is_none())
        .then_some(Action::ExtendTape)
}

fn single(item_type: ItemType, action: Action) -> impl Fn(&PinchContext<'_>) -> Option<Action> {
    move |p| p.is(item_type).then_some(action)
}

fn police_tape(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::PoliceTapeRoll, Action::PoliceTape)(p)
}

fn measure(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::TapeMeasure, Action::Measure)(p)
}

fn place_marker(p: &PinchContext<'_>) -> Option<Action> {
    match p.this.item_type {
        ItemType::ItemMarker => Some(Action::PlaceMarker(MarkerKind::Item)),
        ItemType::BodyMarker => Some(Action::PlaceMarker(MarkerKind::Body)),
        _ => None,
    }
}

fn photograph(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::Camera, Action::Photograph)(p)
}

fn call_toc(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::Radio, Action::CallToc)(p)
}

fn toggle_flashlight(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::Flashlight, Action::ToggleFlashlight)(p)
}

fn toggle_gloves(p: &PinchContext<'_>) -> Option<Action> {
    single(ItemType::Gloves, Action::ToggleGloves)(p)
}

/// Dispatch table, highest priority first
pub const RULES: &[Rule] = &[
    Rule { name: "pen-write", priority: 100, matcher: pen_write },
    Rule { name: "seal-pack", priority: 90, matcher: seal_pack },
    Rule { name: "bag-evidence", priority: 90, matcher: bag_evidence },
    Rule { name: "attach-print", priority: 80, matcher: attach_print },
    Rule { name: "load-brush", priority: 80, matcher: load_brush },
    Rule { name: "lift-print", priority: 70, matcher: lift_print },
    Rule { name: "dust-print", priority: 70, matcher: dust_print },
    Rule { name: "pick-evidence", priority: 60, matcher: pick_evidence },
    Rule { name: "take-swab", priority: 60, matcher: take_swab },
    Rule { name: "extend-tape", priority: 50, matcher: extend_tape },
    Rule { name: "police-tape", priority: 10, matcher: police_tape },
    Rule { name: "measure", priority: 10, matcher: measure },
    Rule { name: "place-marker", priority: 10, matcher: place_marker },
    Rule { name: "photograph", priority: 10, matcher: photograph },
    Rule { name: "call-toc", priority: 10, matcher: call_toc },
    Rule { name: "flashlight", priority: 10, matcher: toggle_flashlight },
    Rule { name: "gloves", priority: 10, matcher: toggle_gloves },
];

/// Pick the action for a pinch
pub fn resolve(pinch: &PinchContext<'_>) -> Option<(&'static Rule, Action)> {
    let mut matches: Vec<(&'static Rule, Action)> = RULES
        .iter()
        .filter_map(|rule| (rule.matcher)(pinch).map(|action| (rule, action)))
        .collect();
    matches.sort_by_key(|(rule, _)| Reverse(rule.priority));

    if matches.len() > 1 {
        let names: Vec<_> = matches.iter().map(|(rule, _)| rule.name).collect();
        log::warn!(
            "Ambiguous pinch with {}: {:?} match, using '{}'",
            pinch.this.item_type.display_name(),
            names,
            matches[0].0.name
        );
    }
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use csi_core::Pose;
    use csi_inventory::ItemRegistry;

    fn resolve_for(
        items: &ItemRegistry,
        scene: &SceneObjects,
        this: ItemId,
        other: Option<ItemId>,
    ) -> Option<(&'static str, Action)> {
        let held = |id: ItemId| HeldItem::new(id, items.item_type(id).unwrap());
        let pinch = PinchContext {
            this: held(this),
            other: other.map(held),
            item: items.get(this).unwrap(),
            items,
            scene,
        };
        resolve(&pinch).map(|(rule, action)| (rule.name, action))
    }

    #[test]
    fn test_pen_writes_on_touched_page_first() {
        let mut items = ItemRegistry::new();
        let scene = SceneObjects::new();
        let pen = items.spawn(ItemType::Pen, Pose::default());
        let notepad = items.spawn(ItemType::Notepad, Pose::default());
        let form = items.spawn(ItemType::SketchForm, Pose::default());

        // Nothing touched, the held page is the target
        assert_eq!(
            resolve_for(&items, &scene, pen, Some(notepad)),
            Some(("pen-write", Action::WriteNotepad { notepad }))
        );

        items.add_contact(pen, ContactTarget::Item(form));
        assert_eq!(
            resolve_for(&items, &scene, pen, Some(notepad)),
            Some(("pen-write", Action::WriteForm { form }))
        );
        assert_eq!(
            resolve_for(&items, &scene, pen, None),
            Some(("pen-write", Action::WriteForm { form }))
        );
    }

    #[test]
    fn test_lifting_tape_routes_by_contact() {
        let mut items = ItemRegistry::new();
        let mut scene = SceneObjects::new();
        let tape = items.spawn(ItemType::FingerprintTapeRoll, Pose::default());
        let print = scene.add(SceneObjectKind::fingerprint("glass"), glam::Vec3::ZERO, 0.05);

        assert_eq!(resolve_for(&items, &scene, tape, None), Some(("extend-tape", Action::ExtendTape)));

        items.add_contact(tape, ContactTarget::Object(print));
        assert_eq!(
            resolve_for(&items, &scene, tape, None),
            Some(("lift-print", Action::LiftPrint { print }))
        );
    }

    #[test]
    fn test_overlap_takes_highest_priority() {
        let mut items = ItemRegistry::new();
        let mut scene = SceneObjects::new();
        let brush = items.spawn(ItemType::FingerprintBrush, Pose::default());
        let jar = items.spawn(ItemType::PowderJar, Pose::default());
        let print = scene.add(SceneObjectKind::fingerprint("glass"), glam::Vec3::ZERO, 0.05);
        items.add_contact(brush, ContactTarget::Object(print));

        assert_eq!(
            resolve_for(&items, &scene, brush, Some(jar)),
            Some(("load-brush", Action::LoadBrush { jar }))
        );
    }

    #[test]
    fn test_unhandled_item() {
        let mut items = ItemRegistry::new();
        let scene = SceneObjects::new();
        let clipboard = items.spawn(ItemType::Clipboard, Pose::default());
        assert_eq!(resolve_for(&items, &scene, clipboard, None), None);
    }

    #[test]
    fn test_rules_sorted() {
        assert!(RULES.windows(2).all(|w| w[0].priority >= w[1].priority));
    }
}
