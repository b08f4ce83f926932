//! Item types and per-type state

use chrono::NaiveDateTime;
use csi_core::SceneObjectId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Every kind of item in the investigator's kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    Pen,
    Notepad,
    InvestigatorForm,
    SketchForm,
    CustodyForm,
    FingerprintCard,
    PoliceTapeRoll,
    ItemMarker,
    BodyMarker,
    TapeMeasure,
    Camera,
    PhotoScale,
    Flashlight,
    Radio,
    Gloves,
    FingerprintBrush,
    PowderJar,
    FingerprintTapeRoll,
    EvidencePack,
    SealTapeRoll,
    Tweezers,
    Swab,
    Thermometer,
    Clipboard,
    BodyBag,
    Briefcase,
}

impl ItemType {
    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pen => "Pen",
            Self::Notepad => "Notepad",
            Self::InvestigatorForm => "Investigator Form",
            Self::SketchForm => "Sketch Form",
            Self::CustodyForm => "Chain of Custody Form",
            Self::FingerprintCard => "Fingerprint Card",
            Self::PoliceTapeRoll => "Police Tape",
            Self::ItemMarker => "Evidence Marker",
            Self::BodyMarker => "Body Marker",
            Self::TapeMeasure => "Tape Measure",
            Self::Camera => "Camera",
            Self::PhotoScale => "Photo Scale",
            Self::Flashlight => "Flashlight",
            Self::Radio => "Radio",
            Self::Gloves => "Gloves",
            Self::FingerprintBrush => "Fingerprint Brush",
            Self::PowderJar => "Powder Jar",
            Self::FingerprintTapeRoll => "Lifting Tape",
            Self::EvidencePack => "Evidence Pack",
            Self::SealTapeRoll => "Seal Tape",
            Self::Tweezers => "Tweezers",
            Self::Swab => "Swab",
            Self::Thermometer => "Thermometer",
            Self::Clipboard => "Clipboard",
            Self::BodyBag => "Body Bag",
            Self::Briefcase => "Briefcase",
        }
    }

    /// Form subtype for form items
    pub fn form_kind(&self) -> Option<FormKind> {
        match self {
            Self::InvestigatorForm => Some(FormKind::Investigator),
            Self::SketchForm => Some(FormKind::Sketch),
            Self::CustodyForm => Some(FormKind::Custody),
            _ => None,
        }
    }

    /// Check if a pen can write on this item
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Notepad | Self::EvidencePack) || self.form_kind().is_some()
    }
}

/// Fingerprint powder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowderType {
    #[default]
    Black,
    White,
    Magnetic,
    Fluorescent,
}

/// Form subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormKind {
    Investigator,
    Sketch,
    Custody,
}

impl FormKind {
    /// Fields in the order the writer fills them
    pub fn fields(&self) -> &'static [FormField] {
        match self {
            Self::Investigator => &[
                FormField::CaseNumber,
                FormField::IncidentTime,
                FormField::ArrivalTime,
                FormField::CordonTime,
            ],
            Self::Sketch => &[
                FormField::SceneOutline,
                FormField::MarkerPositions,
                FormField::Signature,
            ],
            Self::Custody => &[
                FormField::ItemDescription,
                FormField::CollectedBy,
                FormField::SealTime,
                FormField::Signature,
            ],
        }
    }
}

/// One line on a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormField {
    CaseNumber,
    IncidentTime,
    ArrivalTime,
    CordonTime,
    SceneOutline,
    MarkerPositions,
    ItemDescription,
    CollectedBy,
    SealTime,
    Signature,
}

/// Form page writer: a cursor over the subtype's fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub kind: FormKind,
    pub lines: Vec<(FormField, String)>,
}

impl FormState {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    /// Field the next write fills
    pub fn next_field(&self) -> Option<FormField> {
        self.kind.fields().get(self.lines.len()).copied()
    }

    /// Write the next field. Returns false if `field` is not next.
    pub fn write(&mut self, field: FormField, text: impl Into<String>) -> bool {
        if self.next_field() != Some(field) {
            return false;
        }
        self.lines.push((field, text.into()));
        true
    }

    /// Every field written
    pub fn is_complete(&self) -> bool {
        self.next_field().is_none()
    }

    /// Text written in a field
    pub fn line(&self, field: FormField) -> Option<&str> {
        self.lines
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, text)| text.as_str())
    }
}

/// A committed length of tape between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapeSegment {
    pub start: Vec3,
    pub end: Vec3,
}

impl TapeSegment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Mesh transform for a unit-length tape along +X: (center, rotation, scale)
    pub fn mesh_transform(&self) -> (Vec3, Quat, Vec3) {
        let center = (self.start + self.end) * 0.5;
        let direction = (self.end - self.start).normalize_or_zero();
        let rotation = if direction == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::X, direction)
        };
        (center, rotation, Vec3::new(self.length(), 1.0, 1.0))
    }
}

/// Start/commit state shared by police tape and tape measure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapeRollState {
    /// Start point while measuring
    pub anchor: Option<Vec3>,
    pub segments: Vec<TapeSegment>,
}

impl TapeRollState {
    /// Whether a segment is being laid out
    pub fn is_measuring(&self) -> bool {
        self.anchor.is_some()
    }
}

/// A photograph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub position: Vec3,
    pub rotation: Quat,
    pub taken_at: NaiveDateTime,
}

/// Lifting tape pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TapeStage {
    #[default]
    Retracted,
    Extended,
    Lifted {
        powder: PowderType,
        source: SceneObjectId,
    },
}

/// A print attached to a fingerprint card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftedPrint {
    pub source: SceneObjectId,
    pub powder: PowderType,
}

/// Evidence pack contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackState {
    pub contents: Vec<SceneObjectId>,
    pub sealed: bool,
    pub signature: Option<String>,
}

/// Per-type item state, resolved once from the item type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemState {
    /// No behaviour-specific state
    Plain,
    Notepad { lines: Vec<String> },
    Form(FormState),
    Tape(TapeRollState),
    Camera { photos: Vec<Photo> },
    Flashlight { on: bool },
    Brush { powder: Option<PowderType> },
    PowderJar { powder: PowderType },
    LiftingTape { stage: TapeStage },
    FingerprintCard { prints: Vec<LiftedPrint> },
    Pack(PackState),
    Tweezers { holding: Option<SceneObjectId> },
    Swab { sample: Option<SceneObjectId> },
}

impl ItemState {
    /// Initial state for an item type
    pub fn for_type(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Notepad => Self::Notepad { lines: Vec::new() },
            ItemType::InvestigatorForm | ItemType::SketchForm | ItemType::CustodyForm => item_type
                .form_kind()
                .map(|kind| Self::Form(FormState::new(kind)))
                .unwrap_or(Self::Plain),
            ItemType::PoliceTapeRoll | ItemType::TapeMeasure => Self::Tape(TapeRollState::default()),
            ItemType::Camera => Self::Camera { photos: Vec::new() },
            ItemType::Flashlight => Self::Flashlight { on: false },
            ItemType::FingerprintBrush => Self::Brush { powder: None },
            ItemType::PowderJar => Self::PowderJar {
                powder: PowderType::default(),
            },
            ItemType::FingerprintTapeRoll => Self::LiftingTape {
                stage: TapeStage::Retracted,
            },
            ItemType::FingerprintCard => Self::FingerprintCard { prints: Vec::new() },
            ItemType::EvidencePack => Self::Pack(PackState::default()),
            ItemType::Tweezers => Self::Tweezers { holding: None },
            ItemType::Swab => Self::Swab { sample: None },
            _ => Self::Plain,
        }
    }

    /// Powder carried by this item (jar, loaded brush, lifted tape)
    pub fn powder(&self) -> Option<PowderType> {
        match self {
            Self::PowderJar { powder } => Some(*powder),
            Self::Brush { powder } => *powder,
            Self::LiftingTape {
                stage: TapeStage::Lifted { powder, .. },
            } => Some(*powder),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&FormState> {
        match self {
            Self::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_tape(&self) -> Option<&TapeRollState> {
        match self {
            Self::Tape(tape) => Some(tape),
            _ => None,
        }
    }

    pub fn as_pack(&self) -> Option<&PackState> {
        match self {
            Self::Pack(pack) => Some(pack),
            _ => None,
        }
    }

    /// Lifting tape stage
    pub fn tape_stage(&self) -> Option<TapeStage> {
        match self {
            Self::LiftingTape { stage } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_resolved_from_type() {
        assert!(matches!(ItemState::for_type(ItemType::Pen), ItemState::Plain));
        assert!(matches!(
            ItemState::for_type(ItemType::SketchForm),
            ItemState::Form(FormState { kind: FormKind::Sketch, .. })
        ));
        assert_eq!(
            ItemState::for_type(ItemType::FingerprintTapeRoll).tape_stage(),
            Some(TapeStage::Retracted)
        );
    }

    #[test]
    fn test_form_writer_order() {
        let mut form = FormState::new(FormKind::Sketch);
        assert_eq!(form.next_field(), Some(FormField::SceneOutline));
        assert!(!form.write(FormField::Signature, "out of order"));
        assert!(form.write(FormField::SceneOutline, "Living room, 4x5m"));
        assert!(form.write(FormField::MarkerPositions, "1, 2"));
        assert!(form.write(FormField::Signature, "Sketcher"));
        assert!(form.is_complete());
        assert_eq!(form.line(FormField::MarkerPositions), Some("1, 2"));
    }

    #[test]
    fn test_tape_segment_transform() {
        let segment = TapeSegment::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
        let (center, rotation, scale) = segment.mesh_transform();

        assert_eq!(center, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(scale.x, 2.0);
        assert!((rotation * Vec3::X - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_powder_lookup() {
        let tape = ItemState::LiftingTape {
            stage: TapeStage::Lifted {
                powder: PowderType::Magnetic,
                source: SceneObjectId(4),
            },
        };
        assert_eq!(tape.powder(), Some(PowderType::Magnetic));
        assert_eq!(ItemState::Brush { powder: None }.powder(), None);
    }
}
