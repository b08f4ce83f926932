//! Action execution
//!
//! Each action checks every precondition before mutating anything, so a
//! rejected action leaves the session untouched.

use crate::context::InteractionContext;
use crate::dispatch::Action;
use crate::manager::InteractionConfig;
use csi_core::{Hand, ItemId, SceneObjectId};
use csi_evidence::{MarkerRef, PlaceError};
use csi_gamestate::{FlagKey, GameAction};
use csi_inventory::{
    FormField, FormKind, HeldItem, Item, ItemState, LiftedPrint, Photo, PowderType, SceneObject,
    SceneObjectKind, TapeSegment, TapeStage,
};
use csi_timeline::{TimelineError, TimelineEvent};
use glam::Vec3;
use thiserror::Error;

/// Why a pinch did nothing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionRejected {
    #[error("Hands are disabled")]
    HandsDisabled,
    #[error("Game is paused")]
    GamePaused,
    #[error("Nothing in the {0} hand")]
    EmptyHand(Hand),
    #[error("{0} is paused")]
    Paused(ItemId),
    #[error("Nothing to do with {0:?}")]
    NoAction(csi_inventory::ItemType),
    #[error("Unknown item {0}")]
    UnknownItem(ItemId),
    #[error("Unknown scene object {0}")]
    UnknownObject(SceneObjectId),
    #[error("Not allowed yet: {0:?}")]
    NotPermitted(GameAction),
    #[error("Nothing left to write")]
    NothingToWrite,
    #[error("Form is already complete")]
    FormComplete,
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Placement(#[from] PlaceError),
    #[error("Tape segment too short ({length:.2}m < {min:.2}m)")]
    SegmentTooShort { length: f32, min: f32 },
    #[error("Brush has no powder")]
    BrushNotLoaded,
    #[error("Lifting tape is {0:?}")]
    TapeOutOfOrder(TapeStage),
    #[error("Print {0} has not been dusted")]
    PrintNotRevealed(SceneObjectId),
    #[error("Print {0} was already lifted")]
    AlreadyLifted(SceneObjectId),
    #[error("Evidence {0} was already collected")]
    AlreadyCollected(SceneObjectId),
    #[error("Evidence {0} was already swabbed")]
    AlreadySampled(SceneObjectId),
    #[error("Tweezers are empty")]
    TweezersEmpty,
    #[error("Tweezers are already holding something")]
    TweezersFull,
    #[error("Swab already used")]
    SwabUsed,
    #[error("Evidence pack is empty")]
    PackEmpty,
    #[error("Evidence pack is sealed")]
    PackSealed,
    #[error("Evidence pack is not sealed yet")]
    PackNotSealed,
    #[error("Evidence pack is already signed")]
    PackSigned,
}

/// What an action did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoteWritten { line: String },
    FormWritten { field: FormField, complete: bool },
    PackSigned { pack: ItemId },
    TapeStarted { at: Vec3 },
    TapeCommitted(TapeSegment),
    MeasureStarted { at: Vec3 },
    Measured { length: f32 },
    MarkerPlaced(MarkerRef),
    PhotoTaken { count: usize },
    TocCalled,
    FlashlightToggled { on: bool },
    GlovesToggled { on: bool },
    BrushLoaded(PowderType),
    PrintDusted { print: SceneObjectId, powder: PowderType },
    TapeExtended,
    PrintLifted { print: SceneObjectId, powder: PowderType },
    PrintAttached { card: ItemId, print: SceneObjectId },
    EvidencePicked(SceneObjectId),
    EvidenceBagged { pack: ItemId, evidence: SceneObjectId },
    PackSealed { pack: ItemId },
    SwabTaken(SceneObjectId),
}

impl Outcome {
    /// Stable name for logs and analytics
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoteWritten { .. } => "note_written",
            Self::FormWritten { .. } => "form_written",
            Self::PackSigned { .. } => "pack_signed",
            Self::TapeStarted { .. } => "tape_started",
            Self::TapeCommitted(_) => "tape_committed",
            Self::MeasureStarted { .. } => "measure_started",
            Self::Measured { .. } => "measured",
            Self::MarkerPlaced(_) => "marker_placed",
            Self::PhotoTaken { .. } => "photo_taken",
            Self::TocCalled => "toc_called",
            Self::FlashlightToggled { .. } => "flashlight_toggled",
            Self::GlovesToggled { .. } => "gloves_toggled",
            Self::BrushLoaded(_) => "brush_loaded",
            Self::PrintDusted { .. } => "print_dusted",
            Self::TapeExtended => "tape_extended",
            Self::PrintLifted { .. } => "print_lifted",
            Self::PrintAttached { .. } => "print_attached",
            Self::EvidencePicked(_) => "evidence_picked",
            Self::EvidenceBagged { .. } => "evidence_bagged",
            Self::PackSealed { .. } => "pack_sealed",
            Self::SwabTaken(_) => "swab_taken",
        }
    }
}

fn item<'a>(ctx: &'a InteractionContext<'_>, id: ItemId) -> Result<&'a Item, ActionRejected> {
    ctx.items.get(id).ok_or(ActionRejected::UnknownItem(id))
}

fn item_state_mut<'a>(
    ctx: &'a mut InteractionContext<'_>,
    id: ItemId,
) -> Result<&'a mut ItemState, ActionRejected> {
    ctx.items
        .get_mut(id)
        .map(|item| &mut item.state)
        .ok_or(ActionRejected::UnknownItem(id))
}

fn object<'a>(ctx: &'a InteractionContext<'_>, id: SceneObjectId) -> Result<&'a SceneObject, ActionRejected> {
    ctx.scene.get(id).ok_or(ActionRejected::UnknownObject(id))
}

fn object_kind_mut<'a>(
    ctx: &'a mut InteractionContext<'_>,
    id: SceneObjectId,
) -> Result<&'a mut SceneObjectKind, ActionRejected> {
    ctx.scene
        .get_mut(id)
        .map(|object| &mut object.kind)
        .ok_or(ActionRejected::UnknownObject(id))
}

fn require_permission(ctx: &InteractionContext<'_>, action: GameAction) -> Result<(), ActionRejected> {
    if ctx.flags.can_perform(action) {
        Ok(())
    } else {
        Err(ActionRejected::NotPermitted(action))
    }
}

fn clock_time(ctx: &InteractionContext<'_>, event: TimelineEvent) -> Result<String, ActionRejected> {
    Ok(ctx.timeline.require(event)?.format("%H:%M").to_string())
}

/// Run an action for the item held in `hand`
pub(crate) fn perform(
    action: Action,
    this: HeldItem,
    config: &InteractionConfig,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    match action {
        Action::WriteNotepad { notepad } => write_notepad(notepad, ctx),
        Action::WriteForm { form } => write_form(form, ctx),
        Action::SignPack { pack } => sign_pack(pack, ctx),
        Action::PoliceTape => police_tape(this.id, config, ctx),
        Action::Measure => measure(this.id, ctx),
        Action::PlaceMarker(kind) => {
            let pose = item(ctx, this.id)?.pose;
            let placed_at = ctx.now();
            let marker = ctx.evidence.place_marker(
                kind,
                pose.position,
                pose.rotation,
                ctx.role,
                ctx.case_id.map(str::to_string),
                placed_at,
            )?;
            ctx.record_once(TimelineEvent::EvidenceMarked);
            Ok(Outcome::MarkerPlaced(marker))
        }
        Action::Photograph => {
            let pose = item(ctx, this.id)?.pose;
            let photo = Photo {
                position: pose.position,
                rotation: pose.rotation,
                taken_at: ctx.now(),
            };
            let count = match item_state_mut(ctx, this.id)? {
                ItemState::Camera { photos } => {
                    photos.push(photo);
                    photos.len()
                }
                _ => return Err(ActionRejected::NoAction(this.item_type)),
            };
            ctx.record_once(TimelineEvent::PhotographsTaken);
            Ok(Outcome::PhotoTaken { count })
        }
        Action::CallToc => {
            ctx.record_once(TimelineEvent::CalledTOC);
            Ok(Outcome::TocCalled)
        }
        Action::ToggleFlashlight => match item_state_mut(ctx, this.id)? {
            ItemState::Flashlight { on } => {
                *on = !*on;
                Ok(Outcome::FlashlightToggled { on: *on })
            }
            _ => Err(ActionRejected::NoAction(this.item_type)),
        },
        Action::ToggleGloves => {
            let on = !ctx.flags.get_bool(FlagKey::HasGlovesOn);
            ctx.flags.set_bool(FlagKey::HasGlovesOn, on);
            Ok(Outcome::GlovesToggled { on })
        }
        Action::LoadBrush { jar } => {
            let powder = item(ctx, jar)?
                .state
                .powder()
                .ok_or(ActionRejected::UnknownItem(jar))?;
            match item_state_mut(ctx, this.id)? {
                ItemState::Brush { powder: loaded } => *loaded = Some(powder),
                _ => return Err(ActionRejected::NoAction(this.item_type)),
            }
            Ok(Outcome::BrushLoaded(powder))
        }
        Action::DustPrint { print } => dust_print(this, print, ctx),
        Action::ExtendTape => match item_state_mut(ctx, this.id)? {
            ItemState::LiftingTape { stage } if *stage == TapeStage::Retracted => {
                *stage = TapeStage::Extended;
                Ok(Outcome::TapeExtended)
            }
            ItemState::LiftingTape { stage } => Err(ActionRejected::TapeOutOfOrder(*stage)),
            _ => Err(ActionRejected::NoAction(this.item_type)),
        },
        Action::LiftPrint { print } => lift_print(this, print, ctx),
        Action::AttachPrint { card } => attach_print(this, card, ctx),
        Action::PickEvidence { evidence } => pick_evidence(this, evidence, ctx),
        Action::BagEvidence { pack } => bag_evidence(this, pack, ctx),
        Action::SealPack { pack } => {
            match item(ctx, pack)?.state.as_pack() {
                Some(state) if state.sealed => return Err(ActionRejected::PackSealed),
                Some(state) if state.contents.is_empty() => return Err(ActionRejected::PackEmpty),
                Some(_) => {}
                None => return Err(ActionRejected::UnknownItem(pack)),
            }
            if let ItemState::Pack(state) = item_state_mut(ctx, pack)? {
                state.sealed = true;
            }
            ctx.record_once(TimelineEvent::EvidenceSealed);
            Ok(Outcome::PackSealed { pack })
        }
        Action::TakeSwab { evidence } => take_swab(this, evidence, ctx),
    }
}

fn write_notepad(notepad: ItemId, ctx: &mut InteractionContext<'_>) -> Result<Outcome, ActionRejected> {
    // First permitted fact the case can fill in; a missing time falls through
    let mut blocked = None;
    let mut next = None;
    for action in [GameAction::WriteArrival, GameAction::WritePulse] {
        if !ctx.flags.can_perform(action) {
            continue;
        }
        match notepad_line(action, ctx) {
            Ok(line) => {
                next = Some((action, line));
                break;
            }
            Err(e) => {
                blocked.get_or_insert(e);
            }
        }
    }
    let (action, line) = match next {
        Some(next) => next,
        None => return Err(blocked.unwrap_or(ActionRejected::NothingToWrite)),
    };

    match item_state_mut(ctx, notepad)? {
        ItemState::Notepad { lines } => lines.push(line.clone()),
        _ => return Err(ActionRejected::UnknownItem(notepad)),
    }
    let written = match action {
        GameAction::WriteArrival => FlagKey::HasWrittenArrival,
        _ => FlagKey::HasWrittenPulse,
    };
    ctx.flags.set_bool(written, true);
    Ok(Outcome::NoteWritten { line })
}

fn notepad_line(action: GameAction, ctx: &InteractionContext<'_>) -> Result<String, ActionRejected> {
    Ok(match action {
        GameAction::WriteArrival => {
            format!("Arrived {}", clock_time(ctx, TimelineEvent::FirstResponderArrived)?)
        }
        _ => format!("Pulse {} bpm", ctx.flags.get_int(FlagKey::Pulse)),
    })
}

fn write_form(form: ItemId, ctx: &mut InteractionContext<'_>) -> Result<Outcome, ActionRejected> {
    require_permission(ctx, GameAction::WriteForm)?;

    let state = item(ctx, form)?
        .state
        .as_form()
        .ok_or(ActionRejected::UnknownItem(form))?;
    let kind = state.kind;
    let field = state.next_field().ok_or(ActionRejected::FormComplete)?;
    let text = form_text(field, ctx)?;

    let complete = match item_state_mut(ctx, form)? {
        ItemState::Form(state) => {
            state.write(field, text);
            state.is_complete()
        }
        _ => false,
    };

    if complete {
        let event = match kind {
            FormKind::Investigator => TimelineEvent::InvestigatorFilledUp,
            FormKind::Sketch => TimelineEvent::SketchFilledUp,
            FormKind::Custody => TimelineEvent::CustodyFilledUp,
        };
        ctx.record(event);
    }
    Ok(Outcome::FormWritten { field, complete })
}

/// Text the writer puts in a field, from what the case knows so far
fn form_text(field: FormField, ctx: &InteractionContext<'_>) -> Result<String, ActionRejected> {
    Ok(match field {
        FormField::CaseNumber => ctx.case_id.unwrap_or("UNASSIGNED").to_string(),
        FormField::IncidentTime => clock_time(ctx, TimelineEvent::Incident)?,
        FormField::ArrivalTime => clock_time(ctx, TimelineEvent::InvestigatorArrived)?,
        FormField::CordonTime => clock_time(ctx, TimelineEvent::Cordoned)?,
        FormField::SceneOutline => format!("{} objects", ctx.scene.len()),
        FormField::MarkerPositions => {
            ctx.timeline.require(TimelineEvent::EvidenceMarked)?;
            let labels: Vec<_> = ctx.evidence.iter().map(|m| m.label()).collect();
            labels.join(", ")
        }
        FormField::ItemDescription => {
            ctx.timeline.require(TimelineEvent::EvidenceCollected)?;
            ctx.scene
                .iter()
                .filter_map(|o| match &o.kind {
                    SceneObjectKind::Evidence { label, collected: true, .. } => Some(label.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", ")
        }
        FormField::CollectedBy | FormField::Signature => ctx.role.display_name().to_string(),
        FormField::SealTime => clock_time(ctx, TimelineEvent::EvidenceSealed)?,
    })
}

fn sign_pack(pack: ItemId, ctx: &mut InteractionContext<'_>) -> Result<Outcome, ActionRejected> {
    require_permission(ctx, GameAction::SignEvidencePack)?;
    match item(ctx, pack)?.state.as_pack() {
        Some(state) if !state.sealed => return Err(ActionRejected::PackNotSealed),
        Some(state) if state.signature.is_some() => return Err(ActionRejected::PackSigned),
        Some(_) => {}
        None => return Err(ActionRejected::UnknownItem(pack)),
    }

    let signature = ctx.role.display_name().to_string();
    if let ItemState::Pack(state) = item_state_mut(ctx, pack)? {
        state.signature = Some(signature);
    }
    Ok(Outcome::PackSigned { pack })
}

fn police_tape(
    roll: ItemId,
    config: &InteractionConfig,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    let current = item(ctx, roll)?.pose.position;
    let ItemState::Tape(tape) = item_state_mut(ctx, roll)? else {
        return Err(ActionRejected::UnknownItem(roll));
    };

    let Some(start) = tape.anchor else {
        tape.anchor = Some(current);
        return Ok(Outcome::TapeStarted { at: current });
    };

    let segment = TapeSegment::new(start, current);
    if segment.length() < config.min_tape_segment {
        return Err(ActionRejected::SegmentTooShort {
            length: segment.length(),
            min: config.min_tape_segment,
        });
    }
    tape.anchor = None;
    tape.segments.push(segment);
    ctx.record_once(TimelineEvent::Cordoned);
    Ok(Outcome::TapeCommitted(segment))
}

fn measure(roll: ItemId, ctx: &mut InteractionContext<'_>) -> Result<Outcome, ActionRejected> {
    let current = item(ctx, roll)?.pose.position;
    let ItemState::Tape(tape) = item_state_mut(ctx, roll)? else {
        return Err(ActionRejected::UnknownItem(roll));
    };

    match tape.anchor.take() {
        None => {
            tape.anchor = Some(current);
            Ok(Outcome::MeasureStarted { at: current })
        }
        Some(start) => {
            let segment = TapeSegment::new(start, current);
            tape.segments.push(segment);
            Ok(Outcome::Measured {
                length: segment.length(),
            })
        }
    }
}

fn dust_print(
    this: HeldItem,
    print: SceneObjectId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    let powder = item(ctx, this.id)?
        .state
        .powder()
        .ok_or(ActionRejected::BrushNotLoaded)?;

    match object_kind_mut(ctx, print)? {
        SceneObjectKind::Fingerprint { lifted: true, .. } => Err(ActionRejected::AlreadyLifted(print)),
        SceneObjectKind::Fingerprint { revealed, .. } => {
            *revealed = Some(powder);
            Ok(Outcome::PrintDusted { print, powder })
        }
        _ => Err(ActionRejected::NoAction(this.item_type)),
    }
}

fn lift_print(
    this: HeldItem,
    print: SceneObjectId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    match item(ctx, this.id)?.state.tape_stage() {
        Some(TapeStage::Extended) => {}
        Some(stage) => return Err(ActionRejected::TapeOutOfOrder(stage)),
        None => return Err(ActionRejected::NoAction(this.item_type)),
    }

    let powder = match &object(ctx, print)?.kind {
        SceneObjectKind::Fingerprint { lifted: true, .. } => {
            return Err(ActionRejected::AlreadyLifted(print))
        }
        SceneObjectKind::Fingerprint {
            revealed: Some(powder),
            ..
        } => *powder,
        _ => return Err(ActionRejected::PrintNotRevealed(print)),
    };

    if let SceneObjectKind::Fingerprint { lifted, .. } = object_kind_mut(ctx, print)? {
        *lifted = true;
    }
    if let ItemState::LiftingTape { stage } = item_state_mut(ctx, this.id)? {
        *stage = TapeStage::Lifted {
            powder,
            source: print,
        };
    }
    ctx.record_once(TimelineEvent::FingerprintLifted);
    Ok(Outcome::PrintLifted { print, powder })
}

fn attach_print(
    this: HeldItem,
    card: ItemId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    let (powder, source) = match item(ctx, this.id)?.state.tape_stage() {
        Some(TapeStage::Lifted { powder, source }) => (powder, source),
        Some(stage) => return Err(ActionRejected::TapeOutOfOrder(stage)),
        None => return Err(ActionRejected::NoAction(this.item_type)),
    };

    match item_state_mut(ctx, card)? {
        ItemState::FingerprintCard { prints } => prints.push(LiftedPrint { source, powder }),
        _ => return Err(ActionRejected::UnknownItem(card)),
    }
    if let ItemState::LiftingTape { stage } = item_state_mut(ctx, this.id)? {
        *stage = TapeStage::Retracted;
    }
    Ok(Outcome::PrintAttached { card, print: source })
}

fn pick_evidence(
    this: HeldItem,
    evidence: SceneObjectId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    require_permission(ctx, GameAction::CollectEvidence)?;
    if !matches!(item(ctx, this.id)?.state, ItemState::Tweezers { holding: None }) {
        return Err(ActionRejected::TweezersFull);
    }

    match object_kind_mut(ctx, evidence)? {
        SceneObjectKind::Evidence { collected: true, .. } => {
            return Err(ActionRejected::AlreadyCollected(evidence))
        }
        SceneObjectKind::Evidence { collected, .. } => *collected = true,
        _ => return Err(ActionRejected::NoAction(this.item_type)),
    }
    if let ItemState::Tweezers { holding } = item_state_mut(ctx, this.id)? {
        *holding = Some(evidence);
    }
    ctx.record_once(TimelineEvent::EvidenceCollected);
    Ok(Outcome::EvidencePicked(evidence))
}

fn bag_evidence(
    this: HeldItem,
    pack: ItemId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    let evidence = match item(ctx, this.id)?.state {
        ItemState::Tweezers {
            holding: Some(evidence),
        } => evidence,
        _ => return Err(ActionRejected::TweezersEmpty),
    };

    match item_state_mut(ctx, pack)? {
        ItemState::Pack(state) if state.sealed => return Err(ActionRejected::PackSealed),
        ItemState::Pack(state) => state.contents.push(evidence),
        _ => return Err(ActionRejected::UnknownItem(pack)),
    }
    if let ItemState::Tweezers { holding } = item_state_mut(ctx, this.id)? {
        *holding = None;
    }
    Ok(Outcome::EvidenceBagged { pack, evidence })
}

fn take_swab(
    this: HeldItem,
    evidence: SceneObjectId,
    ctx: &mut InteractionContext<'_>,
) -> Result<Outcome, ActionRejected> {
    require_permission(ctx, GameAction::CollectEvidence)?;
    if !matches!(item(ctx, this.id)?.state, ItemState::Swab { sample: None }) {
        return Err(ActionRejected::SwabUsed);
    }

    match object_kind_mut(ctx, evidence)? {
        SceneObjectKind::Evidence { sampled: true, .. } => {
            return Err(ActionRejected::AlreadySampled(evidence))
        }
        SceneObjectKind::Evidence { sampled, .. } => *sampled = true,
        _ => return Err(ActionRejected::NoAction(this.item_type)),
    }
    if let ItemState::Swab { sample } = item_state_mut(ctx, this.id)? {
        *sample = Some(evidence);
    }
    Ok(Outcome::SwabTaken(evidence))
}
