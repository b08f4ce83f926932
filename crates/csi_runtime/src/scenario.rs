//! Scripted scenarios
//!
//! A scenario lays out the kit and the scene, then replays a list of trainee
//! actions against a [`Session`]. Used by the `csi_sim` binary and by the
//! integration tests.
//!
//! ```toml
//! name = "Break-in"
//!
//! [[items]]
//! name = "pen"
//! type = "Pen"
//!
//! [[objects]]
//! name = "door-print"
//! kind = "fingerprint"
//! label = "door handle"
//! position = [0.0, 1.0, 0.0]
//!
//! [[steps]]
//! action = "role"
//! role = "first_responder"
//!
//! [[steps]]
//! action = "grab"
//! hand = "Right"
//! item = "pen"
//! ```

use crate::input::ControllerSample;
use crate::session::Session;
use csi_core::{Hand, ItemId, Pose, Role, SceneObjectId};
use csi_gamestate::SaveError;
use csi_interaction::ProximityEvent;
use csi_inventory::{ContactTarget, ItemType, PowderType, SceneObjectKind};
use glam::{Vec2, Vec3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Simulation step used for waits and role changes (seconds)
const TICK: f32 = 0.05;
/// Ticks allowed for a role change to finish
const MAX_TRANSITION_TICKS: usize = 200;

/// Scenario failures. Rejected actions are not failures; they go in the report.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Step {step}: unknown item {name:?}")]
    UnknownItem { step: usize, name: String },
    #[error("Step {step}: unknown item or object {name:?}")]
    UnknownTarget { step: usize, name: String },
    #[error("Step {step}: {reason}")]
    BadRole { step: usize, reason: String },
    #[error("Duplicate name {0:?}")]
    DuplicateName(String),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Kit item placed before the first step
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub position: [f32; 3],
    /// Powder in a jar
    pub powder: Option<PowderType>,
}

/// Static scene object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Fingerprint,
    Evidence,
    Victim,
}

/// Static scene object
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    pub name: String,
    pub kind: ObjectKind,
    /// Surface for prints, description for evidence
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_radius() -> f32 {
    0.1
}

/// One trainee action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Let simulated time pass
    Wait { seconds: f32 },
    /// Switch role and wait for the change to finish
    Role { role: String },
    Grab { hand: Hand, item: String },
    Release { hand: Hand },
    /// Start touching an item or scene object; without a target, the
    /// closest scene object in reach of the item
    Touch {
        item: String,
        #[serde(default)]
        target: Option<String>,
    },
    Untouch { item: String, target: String },
    Move { item: String, position: [f32; 3] },
    Pinch { hand: Hand },
    Pulse { bpm: i32 },
    Watch,
    /// Raw controller sample
    Controller {
        hand: Hand,
        #[serde(default)]
        trigger: f32,
        #[serde(default)]
        grip: f32,
        #[serde(default)]
        primary: bool,
        #[serde(default)]
        secondary: bool,
        #[serde(default)]
        stick: [f32; 2],
    },
    /// Save to a slot, or the quick slot when none is named
    Save {
        #[serde(default)]
        slot: Option<String>,
    },
    Load {
        #[serde(default)]
        slot: Option<String>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::Wait { .. } => "wait",
            Self::Role { .. } => "role",
            Self::Grab { .. } => "grab",
            Self::Release { .. } => "release",
            Self::Touch { .. } => "touch",
            Self::Untouch { .. } => "untouch",
            Self::Move { .. } => "move",
            Self::Pinch { .. } => "pinch",
            Self::Pulse { .. } => "pulse",
            Self::Watch => "watch",
            Self::Controller { .. } => "controller",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
        }
    }
}

/// A full scenario file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub items: Vec<ItemSpec>,
    pub objects: Vec<ObjectSpec>,
    pub steps: Vec<Step>,
}

/// Something the trainee tried that did nothing
#[derive(Debug, Clone, PartialEq)]
pub struct Refusal {
    pub step: usize,
    pub action: &'static str,
    pub reason: String,
}

/// What happened during a run
#[derive(Debug, Clone, Default)]
pub struct ScenarioReport {
    /// Descriptions of performed interactions
    pub performed: Vec<String>,
    pub refused: Vec<Refusal>,
}

/// Name lookups built while laying out the scene
#[derive(Debug, Default)]
struct Names {
    items: HashMap<String, ItemId>,
    objects: HashMap<String, SceneObjectId>,
}

impl Names {
    fn item(&self, step: usize, name: &str) -> Result<ItemId, ScenarioError> {
        self.items
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownItem {
                step,
                name: name.to_string(),
            })
    }

    fn target(&self, step: usize, name: &str) -> Result<ContactTarget, ScenarioError> {
        if let Some(id) = self.items.get(name) {
            return Ok(ContactTarget::Item(*id));
        }
        self.objects
            .get(name)
            .map(|id| ContactTarget::Object(*id))
            .ok_or_else(|| ScenarioError::UnknownTarget {
                step,
                name: name.to_string(),
            })
    }
}

/// Scene object the item's position falls inside, closest first
fn in_reach(session: &Session, item: ItemId) -> Option<SceneObjectId> {
    let position = session.items().get(item)?.pose.position;
    session.scene().nearest(position).map(|object| object.id)
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Lay out the scene and replay every step
    pub fn run(&self, session: &mut Session) -> Result<ScenarioReport, ScenarioError> {
        log::info!("Running scenario {:?} ({} steps)", self.name, self.steps.len());
        let names = self.lay_out(session)?;
        let mut report = ScenarioReport::default();

        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            if let Err(reason) = self.apply(number, step, &names, session, &mut report)? {
                log::info!("Step {} ({}) did nothing: {}", number, step.name(), reason);
                report.refused.push(Refusal {
                    step: number,
                    action: step.name(),
                    reason,
                });
            }
            session.tick(0.0);
        }

        session.flush_log();
        Ok(report)
    }

    fn lay_out(&self, session: &mut Session) -> Result<Names, ScenarioError> {
        let mut names = Names::default();

        for spec in &self.items {
            let pose = Pose::from_position(Vec3::from(spec.position));
            let name = spec.name.clone();
            let powder = spec.powder;
            let id = session.items_mut().spawn_with(spec.item_type, pose, |item| {
                let item = item.with_name(name);
                match powder {
                    Some(powder) => item.with_powder(powder),
                    None => item,
                }
            });
            if names.items.insert(spec.name.clone(), id).is_some() {
                return Err(ScenarioError::DuplicateName(spec.name.clone()));
            }
        }

        for spec in &self.objects {
            let kind = match spec.kind {
                ObjectKind::Fingerprint => SceneObjectKind::fingerprint(spec.label.as_str()),
                ObjectKind::Evidence => SceneObjectKind::evidence(spec.label.as_str()),
                ObjectKind::Victim => SceneObjectKind::Victim,
            };
            let id = session.add_scene_object(kind, Vec3::from(spec.position), spec.radius);
            if names.items.contains_key(&spec.name)
                || names.objects.insert(spec.name.clone(), id).is_some()
            {
                return Err(ScenarioError::DuplicateName(spec.name.clone()));
            }
        }

        Ok(names)
    }

    /// Outer error aborts the run; inner error is a refusal
    fn apply(
        &self,
        step: usize,
        action: &Step,
        names: &Names,
        session: &mut Session,
        report: &mut ScenarioReport,
    ) -> Result<Result<(), String>, ScenarioError> {
        match action {
            Step::Wait { seconds } => {
                let mut remaining = *seconds;
                while remaining > 0.0 {
                    let dt = remaining.min(TICK);
                    session.tick(dt);
                    remaining -= dt;
                }
            }
            Step::Role { role } => {
                let role: Role = role
                    .parse()
                    .map_err(|reason| ScenarioError::BadRole { step, reason })?;
                if let Err(e) = session.request_role(role) {
                    return Ok(Err(e.to_string()));
                }
                for _ in 0..MAX_TRANSITION_TICKS {
                    session.tick(TICK);
                    if !session.roles().is_transitioning() {
                        break;
                    }
                }
                if session.roles().active_role() != role {
                    return Ok(Err(format!("still {}", session.roles().active_role())));
                }
            }
            Step::Grab { hand, item } => {
                let id = names.item(step, item)?;
                if let Err(e) = session.grab_with(*hand, id) {
                    return Ok(Err(e.to_string()));
                }
            }
            Step::Release { hand } => {
                if session.release(*hand).is_none() {
                    return Ok(Err(format!("nothing released from the {} hand", hand)));
                }
            }
            Step::Touch { item, target } => {
                let id = names.item(step, item)?;
                let target = match target {
                    Some(name) => names.target(step, name)?,
                    None => match in_reach(session, id) {
                        Some(object) => ContactTarget::Object(object),
                        None => return Ok(Err(format!("nothing in reach of {}", item))),
                    },
                };
                session.report_proximity(ProximityEvent::Began { item: id, target });
            }
            Step::Untouch { item, target } => {
                let event = ProximityEvent::Ended {
                    item: names.item(step, item)?,
                    target: names.target(step, target)?,
                };
                session.report_proximity(event);
            }
            Step::Move { item, position } => {
                let id = names.item(step, item)?;
                let rotation = session
                    .items()
                    .get(id)
                    .map(|i| i.pose.rotation)
                    .unwrap_or_default();
                session
                    .items_mut()
                    .set_pose(id, Pose::new(Vec3::from(*position), rotation));
            }
            Step::Pinch { hand } => match session.pinch(*hand) {
                Ok(event) => report.performed.push(event.describe()),
                Err(rejected) => return Ok(Err(rejected.to_string())),
            },
            Step::Pulse { bpm } => session.report_proximity(ProximityEvent::PulseTaken { bpm: *bpm }),
            Step::Watch => session.report_proximity(ProximityEvent::WatchGlanced),
            Step::Controller {
                hand,
                trigger,
                grip,
                primary,
                secondary,
                stick,
            } => {
                session.feed_controller(
                    *hand,
                    ControllerSample {
                        trigger: *trigger,
                        grip: *grip,
                        primary: *primary,
                        secondary: *secondary,
                        thumbstick: Vec2::from(*stick),
                    },
                );
            }
            Step::Save { slot: Some(slot) } => {
                let path = session.save(slot)?;
                log::info!("Saved to {}", path.display());
            }
            Step::Save { slot: None } => session.quicksave()?,
            Step::Load { slot: Some(slot) } => session.load(slot)?,
            Step::Load { slot: None } => session.quickload()?,
        }
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_toml_str(
            r#"
            name = "parse"

            [[items]]
            name = "jar"
            type = "PowderJar"
            powder = "White"

            [[objects]]
            name = "print"
            kind = "fingerprint"
            label = "window"

            [[steps]]
            action = "wait"
            seconds = 1.5

            [[steps]]
            action = "grab"
            hand = "Left"
            item = "jar"

            [[steps]]
            action = "watch"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.items[0].powder, Some(PowderType::White));
        assert_eq!(scenario.objects[0].radius, 0.1);
        assert!(matches!(scenario.steps[0], Step::Wait { seconds } if seconds == 1.5));
        assert!(matches!(scenario.steps[1], Step::Grab { hand: Hand::Left, .. }));
        assert!(matches!(scenario.steps[2], Step::Watch));
    }

    #[test]
    fn test_unknown_item_aborts() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[steps]]
            action = "grab"
            hand = "Right"
            item = "missing"
            "#,
        )
        .unwrap();
        let mut session = Session::new(Default::default());
        assert!(matches!(
            scenario.run(&mut session),
            Err(ScenarioError::UnknownItem { step: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[items]]
            name = "pen"
            type = "Pen"

            [[objects]]
            name = "pen"
            kind = "victim"
            "#,
        )
        .unwrap();
        let mut session = Session::new(Default::default());
        assert!(matches!(
            scenario.run(&mut session),
            Err(ScenarioError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_touch_finds_object_in_reach() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[items]]
            name = "tweezers"
            type = "Tweezers"
            position = [1.0, 0.0, 0.0]

            [[items]]
            name = "brush"
            type = "FingerprintBrush"
            position = [9.0, 0.0, 0.0]

            [[objects]]
            name = "victim"
            kind = "victim"
            position = [1.5, 0.0, 0.0]
            radius = 1.0

            [[objects]]
            name = "knife"
            kind = "evidence"
            label = "knife"
            position = [1.1, 0.0, 0.0]
            radius = 0.2

            [[steps]]
            action = "touch"
            item = "tweezers"

            [[steps]]
            action = "touch"
            item = "brush"
            "#,
        )
        .unwrap();
        let mut session = Session::new(Default::default());
        let report = scenario.run(&mut session).unwrap();

        let tweezers = session
            .items()
            .iter()
            .find(|item| item.item_type == ItemType::Tweezers)
            .unwrap();
        let knife = session
            .scene()
            .iter()
            .find(|object| matches!(object.kind, SceneObjectKind::Evidence { .. }))
            .unwrap();
        assert_eq!(tweezers.contacts, vec![ContactTarget::Object(knife.id)]);

        assert_eq!(report.refused.len(), 1);
        assert_eq!(report.refused[0].action, "touch");
    }
}
