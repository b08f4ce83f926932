//! Proximity reports from the physics collaborator

use crate::context::InteractionContext;
use csi_core::ItemId;
use csi_gamestate::FlagKey;
use csi_inventory::{ContactTarget, ItemType};

/// A contact or check reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProximityEvent {
    /// An item started touching something
    Began { item: ItemId, target: ContactTarget },
    /// An item stopped touching something
    Ended { item: ItemId, target: ContactTarget },
    /// The player took the victim's pulse
    PulseTaken { bpm: i32 },
    /// The player looked at their watch
    WatchGlanced,
}

/// Flag a pen tip toggles while touching an item of this type
fn write_flag(target: ItemType) -> Option<FlagKey> {
    match target {
        ItemType::Notepad => Some(FlagKey::CanWriteNotepad),
        ItemType::EvidencePack => Some(FlagKey::CanWriteEvidencePackSeal),
        t if t.form_kind().is_some() => Some(FlagKey::CanWriteForm),
        _ => None,
    }
}

/// Apply a proximity report
pub(crate) fn apply(event: ProximityEvent, ctx: &mut InteractionContext<'_>) {
    match event {
        ProximityEvent::Began { item, target } => {
            if !ctx.items.add_contact(item, target) {
                return;
            }
            if let Some(flag) = pen_write_flag(item, target, ctx) {
                ctx.flags.set_bool(flag, true);
            }
        }
        ProximityEvent::Ended { item, target } => {
            if !ctx.items.remove_contact(item, target) {
                return;
            }
            if let Some(flag) = pen_write_flag(item, target, ctx) {
                let still_touching = pen_touches_writable(flag, ctx);
                ctx.flags.set_bool(flag, still_touching);
            }
        }
        ProximityEvent::PulseTaken { bpm } => {
            ctx.flags.set_int(FlagKey::Pulse, bpm);
            ctx.flags.set_bool(FlagKey::HasCheckedPulse, true);
        }
        ProximityEvent::WatchGlanced => {
            ctx.flags.set_bool(FlagKey::HasCheckedTime, true);
        }
    }
}

/// Whether any pen still touches an item that grants `flag`
fn pen_touches_writable(flag: FlagKey, ctx: &InteractionContext<'_>) -> bool {
    ctx.items
        .iter()
        .filter(|item| item.item_type == ItemType::Pen)
        .flat_map(|pen| pen.contacts.iter())
        .any(|contact| match contact {
            ContactTarget::Item(other) => {
                ctx.items.item_type(*other).and_then(write_flag) == Some(flag)
            }
            ContactTarget::Object(_) => false,
        })
}

fn pen_write_flag(
    item: ItemId,
    target: ContactTarget,
    ctx: &InteractionContext<'_>,
) -> Option<FlagKey> {
    if ctx.items.item_type(item)? != ItemType::Pen {
        return None;
    }
    match target {
        ContactTarget::Item(other) => write_flag(ctx.items.item_type(other)?),
        ContactTarget::Object(_) => None,
    }
}
