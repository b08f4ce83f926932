//! Training session
//!
//! Owns every registry of one case and pumps them in a fixed order each
//! [`Session::tick`]:
//!
//! 1. queued controller input (menu navigation or pinches)
//! 2. the case clock (frozen while the role menu is open)
//! 3. the role manager's transition state machine
//! 4. role and interaction notifications (timeline stamps, backend log)
//! 5. thought bubbles and the backend logger

use crate::bubbles::{self, ThoughtBubbles};
use crate::config::SessionConfig;
use crate::input::{ControllerSample, InputEvent, InputManager};
use chrono::NaiveDateTime;
use csi_backend::{ClassRoster, DocumentStore, EventLogger, UserProfile};
use csi_core::{CaseClock, Hand, ItemId, Pose, Role, SceneObjectId};
use csi_evidence::{EvidenceEvent, EvidenceManager, EvidenceSnapshot};
use csi_gamestate::{GameFlags, SaveData, SaveError, SaveHeader, SaveManager};
use csi_interaction::{
    ActionRejected, GrabError, InteractionContext, InteractionEvent, InteractionManager,
    ProximityEvent,
};
use csi_inventory::{
    HeldItem, Item, ItemRegistry, ItemType, SceneObject, SceneObjectKind, SceneObjects,
    SelectionOracle,
};
use csi_roles::{RigDriver, RoleChangeError, RoleEvent, RoleHost, RoleManager, RoleSnapshot, SimulatedRig};
use csi_timeline::{Timeline, TimelineEvent, TimelineSnapshot};
use glam::Vec3;
use std::path::PathBuf;
use std::sync::Arc;

const SECTION_CLOCK: &str = "clock";
const SECTION_TIMELINE: &str = "timeline";
const SECTION_EVIDENCE: &str = "evidence";
const SECTION_ITEMS: &str = "items";
const SECTION_SCENE: &str = "scene";
const SECTION_ROLES: &str = "roles";

/// Borrow the registries an interaction works on
macro_rules! interaction_context {
    ($session:ident) => {
        InteractionContext {
            items: &mut $session.items,
            scene: &mut $session.scene,
            flags: &mut $session.flags,
            timeline: &mut $session.timeline,
            evidence: &mut $session.evidence,
            clock: &$session.clock,
            role: $session.roles.active_role(),
            evening_hour: $session.config.timeline.evening_hour,
            case_id: Some($session.config.case.id.as_str()),
        }
    };
}

/// One trainee working one case
pub struct Session {
    config: SessionConfig,
    clock: CaseClock,
    flags: GameFlags,
    timeline: Timeline,
    evidence: EvidenceManager,
    items: ItemRegistry,
    scene: SceneObjects,
    roles: RoleManager,
    interaction: InteractionManager,
    input: InputManager,
    bubbles: ThoughtBubbles,
    rig: Box<dyn RigDriver + Send>,
    logger: Option<EventLogger>,
    saves: SaveManager,
}

impl Session {
    /// Fresh session with a simulated rig and no backend
    pub fn new(config: SessionConfig) -> Self {
        let incident = config.timeline.incident;
        let saves = SaveManager::new(config.case.save_dir.clone()).with_format(config.case.save_format);
        log::info!("Starting case {} (incident at {})", config.case.id, incident);

        Self {
            clock: CaseClock::new(incident),
            flags: GameFlags::new(),
            timeline: Timeline::new(incident),
            evidence: EvidenceManager::new(config.evidence.clone()),
            items: ItemRegistry::new(),
            scene: SceneObjects::new(),
            roles: RoleManager::from_config(config.roles.clone()),
            interaction: InteractionManager::new(config.interaction.clone()),
            input: InputManager::new(),
            bubbles: ThoughtBubbles::new(config.bubbles.clone()),
            rig: Box::new(SimulatedRig::default()),
            logger: None,
            saves,
            config,
        }
    }

    /// Drive a real XR rig instead of the simulated one
    pub fn with_rig(mut self, rig: Box<dyn RigDriver + Send>) -> Self {
        self.rig = rig;
        self
    }

    /// Log to a backend as `user` and offer only the roles their classes unlock
    pub fn with_backend(mut self, store: Arc<dyn DocumentStore>, user: UserProfile) -> Self {
        let unlocked = if user.guest {
            Role::selectable().to_vec()
        } else {
            ClassRoster::new(store.clone()).unlocked_roles(&user.id)
        };
        self.set_unlocked_roles(&unlocked);

        let mut logger = EventLogger::new(store, self.config.logger.clone());
        logger.set_user(Some(user));
        self.logger = Some(logger);
        self
    }

    // --- Accessors ---

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &CaseClock {
        &self.clock
    }

    /// Current case time, rolled into the evening
    pub fn now(&self) -> NaiveDateTime {
        self.clock.evening_now(self.config.timeline.evening_hour)
    }

    pub fn flags(&self) -> &GameFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut GameFlags {
        &mut self.flags
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn evidence(&self) -> &EvidenceManager {
        &self.evidence
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemRegistry {
        &mut self.items
    }

    pub fn scene(&self) -> &SceneObjects {
        &self.scene
    }

    pub fn roles(&self) -> &RoleManager {
        &self.roles
    }

    pub fn interaction(&self) -> &InteractionManager {
        &self.interaction
    }

    pub fn bubbles(&self) -> &ThoughtBubbles {
        &self.bubbles
    }

    pub fn logger(&self) -> Option<&EventLogger> {
        self.logger.as_ref()
    }

    pub fn rig_pose(&self) -> Pose {
        self.rig.rig_pose()
    }

    // --- Scene setup ---

    pub fn spawn_item(&mut self, item_type: ItemType, pose: Pose) -> ItemId {
        self.items.spawn(item_type, pose)
    }

    pub fn add_scene_object(&mut self, kind: SceneObjectKind, position: Vec3, radius: f32) -> SceneObjectId {
        self.scene.add(kind, position, radius)
    }

    /// Restrict the role menu
    pub fn set_unlocked_roles(&mut self, roles: &[Role]) {
        log::info!("{} role(s) unlocked", roles.len());
        self.roles.menu_mut().set_options(roles);
    }

    // --- Roles ---

    /// Switch role directly, bypassing the menu
    pub fn request_role(&mut self, role: Role) -> Result<(), RoleChangeError> {
        self.roles.request_role_change(role).inspect_err(|e| {
            if let Some(hint) = bubbles::role_hint(e) {
                self.bubbles.show(hint);
            }
        })
    }

    pub fn toggle_menu(&mut self) {
        let current = self.roles.active_role();
        self.roles.menu_mut().toggle(current);
        log::debug!("Role menu {}", if self.roles.is_paused() { "opened" } else { "closed" });
    }

    /// Switch to the highlighted menu entry
    pub fn commit_menu(&mut self) -> Result<Role, RoleChangeError> {
        match self.roles.commit_menu() {
            Ok(role) => Ok(role),
            Err(e) => {
                log::warn!("Menu selection refused: {}", e);
                if let Some(hint) = bubbles::role_hint(&e) {
                    self.bubbles.show(hint);
                }
                Err(e)
            }
        }
    }

    // --- Hands ---

    /// The XR toolkit reports a grab
    pub fn grab(&mut self, item: ItemId, selection: &dyn SelectionOracle) -> Result<Hand, GrabError> {
        self.interaction.grab(item, selection, &mut self.items)
    }

    pub fn grab_with(&mut self, hand: Hand, item: ItemId) -> Result<(), GrabError> {
        self.interaction.grab_with(hand, item, &mut self.items)
    }

    /// The XR toolkit reports a release
    pub fn release(&mut self, hand: Hand) -> Option<HeldItem> {
        self.interaction.release(hand, &mut self.items)
    }

    pub fn held(&self, hand: Hand) -> Option<HeldItem> {
        self.interaction.held(hand)
    }

    /// Trigger pressed on `hand`
    pub fn pinch(&mut self, hand: Hand) -> Result<InteractionEvent, ActionRejected> {
        if self.roles.is_paused() {
            return Err(ActionRejected::GamePaused);
        }

        let result = {
            let mut ctx = interaction_context!(self);
            self.interaction.pinch(hand, &mut ctx)
        };

        if let Err(rejected) = &result {
            if let Some(hint) = bubbles::rejection_hint(rejected) {
                self.bubbles.show(hint);
            }
        }
        result
    }

    /// Physics reports a contact change or a diegetic reading
    pub fn report_proximity(&mut self, event: ProximityEvent) {
        let mut ctx = interaction_context!(self);
        self.interaction.on_proximity(event, &mut ctx);
    }

    // --- Input ---

    /// Queue a controller sample; its events are handled on the next tick
    pub fn feed_controller(&mut self, hand: Hand, sample: ControllerSample) {
        self.input.update(hand, sample);
    }

    /// Route one input event. The open menu takes the stick and buttons.
    pub fn handle_input(&mut self, event: InputEvent) {
        let menu_open = self.roles.is_paused();
        match event {
            InputEvent::SecondaryPressed(_) => self.toggle_menu(),
            InputEvent::Thumbstick { value, .. } if menu_open => {
                self.roles.menu_mut().navigate(value);
            }
            InputEvent::PrimaryPressed(_) if menu_open => {
                let _ = self.commit_menu();
            }
            InputEvent::PinchStarted(hand) if !menu_open => {
                let _ = self.pinch(hand);
            }
            _ => {}
        }
    }

    // --- Loop ---

    /// Advance the session by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        for event in self.input.drain_events() {
            self.handle_input(event);
        }

        if !self.roles.is_paused() {
            self.clock.advance(dt as f64);
        }

        {
            let mut host = RoleHost::new(self.interaction.hands_mut(), &mut self.items, &mut *self.rig);
            self.roles.tick(dt, &mut host);
        }

        for event in self.roles.drain_events() {
            self.on_role_event(event);
        }

        for event in self.interaction.drain_events() {
            self.log_backend("interaction", event.describe());
        }

        for event in self.evidence.drain_events() {
            if let EvidenceEvent::Removed(marker) = event {
                log::debug!("Marker slot {:?} freed", marker);
            }
        }

        for change in self.flags.drain_changes() {
            log::debug!("{:?}: {:?} -> {:?}", change.key, change.old, change.new);
        }

        self.bubbles.tick(dt);
        if let Some(logger) = &mut self.logger {
            logger.tick(dt);
        }
    }

    fn on_role_event(&mut self, event: RoleEvent) {
        match event {
            RoleEvent::Started { from, to } => {
                self.log_backend("role", format!("{} -> {} started", from, to));
            }
            RoleEvent::Changed { from, to, .. } => {
                let arrival = match to {
                    Role::FirstResponder => Some(TimelineEvent::FirstResponderArrived),
                    Role::InvestigatorOnCase => Some(TimelineEvent::InvestigatorArrived),
                    _ => None,
                };
                if let Some(arrival) = arrival {
                    self.timeline.set_event_now_if_absent(
                        arrival,
                        &self.clock,
                        self.config.timeline.evening_hour,
                    );
                }
                self.log_backend("role", format!("{} -> {}", from, to));
            }
            RoleEvent::ChangeFailed { from, to, error } => {
                if let Some(hint) = bubbles::role_hint(&error) {
                    self.bubbles.show(hint);
                }
                self.log_backend("role", format!("{} -> {} failed: {}", from, to, error));
            }
        }
    }

    fn log_backend(&mut self, category: &str, message: String) {
        let at = self.now();
        if let Some(logger) = &mut self.logger {
            logger.log(at, category, message);
        }
    }

    /// Push queued backend log entries now
    pub fn flush_log(&mut self) {
        if let Some(logger) = &mut self.logger {
            logger.flush();
        }
    }

    // --- Persistence ---

    /// Write the whole case to a save slot
    pub fn save(&self, slot: &str) -> Result<PathBuf, SaveError> {
        self.saves.save(slot, &self.save_data(slot)?)
    }

    /// Save to the quick slot
    pub fn quicksave(&self) -> Result<(), SaveError> {
        self.saves.quicksave(&self.save_data("quicksave")?)
    }

    fn save_data(&self, name: &str) -> Result<SaveData, SaveError> {
        if let Some(role) = self.roles.pending_role() {
            log::warn!("Saving mid-change to {}; the change will not be resumed", role);
        }

        let header = SaveHeader::new(name)
            .with_case(self.config.case.id.as_str())
            .with_elapsed(self.clock.elapsed())
            .with_role(self.roles.active_role().key());
        let mut data = SaveData::new(header, self.flags.snapshot());
        data.store_section(SECTION_CLOCK, &self.clock)?;
        data.store_section(SECTION_TIMELINE, &self.timeline.snapshot())?;
        data.store_section(SECTION_EVIDENCE, &self.evidence.snapshot())?;
        data.store_section(SECTION_ITEMS, &self.items.snapshot())?;
        data.store_section(SECTION_SCENE, &self.scene.snapshot())?;
        data.store_section(SECTION_ROLES, &self.roles.snapshot())?;
        Ok(data)
    }

    /// Replace the case with a save slot. Nothing changes if any section fails to load.
    pub fn load(&mut self, slot: &str) -> Result<(), SaveError> {
        let data = self.saves.load(slot)?;
        self.apply_save(data)
    }

    /// Replace the case with the quick slot
    pub fn quickload(&mut self) -> Result<(), SaveError> {
        let data = self.saves.quickload()?;
        self.apply_save(data)
    }

    fn apply_save(&mut self, data: SaveData) -> Result<(), SaveError> {
        if data.header.case_id != self.config.case.id {
            log::warn!(
                "Loading save of case {} into case {}",
                data.header.case_id,
                self.config.case.id
            );
        }

        let clock: CaseClock = data.load_section(SECTION_CLOCK)?;
        let timeline: TimelineSnapshot = data.load_section(SECTION_TIMELINE)?;
        let evidence: EvidenceSnapshot = data.load_section(SECTION_EVIDENCE)?;
        let items: Vec<Item> = data.load_section(SECTION_ITEMS)?;
        let scene: Vec<SceneObject> = data.load_section(SECTION_SCENE)?;
        let roles: RoleSnapshot = data.load_section(SECTION_ROLES)?;

        self.clock = clock;
        self.flags.restore(&data.flags);
        self.timeline.restore(&timeline);
        self.evidence.restore(&evidence);
        self.items.restore(items);
        self.scene.restore(scene);
        self.roles.restore(roles);
        self.roles.menu_mut().close();
        self.rebind_hands();

        if let Some(avatar) = self.roles.active_avatar() {
            self.rig.place_rig(avatar.pose);
        }
        log::info!("Loaded {} as {}", data.header.name, self.roles.active_role());
        Ok(())
    }

    /// Refill the hand slots from the items' `held_by`
    fn rebind_hands(&mut self) {
        let hands = self.interaction.hands_mut();
        hands.clear();
        hands.set_enabled(true);
        for item in self.items.iter() {
            if let Some(hand) = item.held_by {
                hands.insert(hand, HeldItem::new(item.id, item.item_type));
            }
        }
        let paused: Vec<ItemId> = self.items.iter().filter(|i| i.paused).map(|i| i.id).collect();
        for id in paused {
            self.items.set_paused(id, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csi_backend::{MemoryStore, UserProfile};
    use glam::Vec2;

    fn settle(session: &mut Session) {
        for _ in 0..10 {
            session.tick(0.05);
        }
    }

    #[test]
    fn test_session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session>();
    }

    /// Headset that records every teleport
    struct RecordingRig {
        pose: Pose,
        placed: Arc<parking_lot::Mutex<Vec<Pose>>>,
    }

    impl RigDriver for RecordingRig {
        fn rig_pose(&self) -> Pose {
            self.pose
        }

        fn place_rig(&mut self, pose: Pose) {
            self.pose = pose;
            self.placed.lock().push(pose);
        }
    }

    #[test]
    fn test_role_change_moves_external_rig() {
        let placed = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let rig = RecordingRig {
            pose: Pose::default(),
            placed: placed.clone(),
        };
        let mut session = Session::new(SessionConfig::default()).with_rig(Box::new(rig));

        session.request_role(Role::Searcher).unwrap();
        settle(&mut session);
        assert_eq!(session.roles().active_role(), Role::Searcher);

        let placed = placed.lock();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed.last(), Some(&session.rig_pose()));
    }

    #[test]
    fn test_first_responder_arrival_stamped() {
        let mut session = Session::new(SessionConfig::default());
        session.tick(120.0);
        session.request_role(Role::FirstResponder).unwrap();
        settle(&mut session);

        assert_eq!(session.roles().active_role(), Role::FirstResponder);
        let arrived = session
            .timeline()
            .event_time(TimelineEvent::FirstResponderArrived)
            .unwrap();
        assert_eq!(arrived.format("%H:%M").to_string(), "19:32");

        // Re-entering the role keeps the first arrival
        session.request_role(Role::Photographer).unwrap();
        settle(&mut session);
        session.tick(600.0);
        session.request_role(Role::FirstResponder).unwrap();
        settle(&mut session);
        assert_eq!(
            session.timeline().event_time(TimelineEvent::FirstResponderArrived),
            Some(arrived)
        );
    }

    #[test]
    fn test_menu_routes_input() {
        let mut session = Session::new(SessionConfig::default());
        session.handle_input(InputEvent::SecondaryPressed(Hand::Left));
        assert!(session.roles().is_paused());

        // Clock frozen while the menu is open
        let before = session.clock().elapsed();
        session.tick(1.0);
        assert_eq!(session.clock().elapsed(), before);

        session.handle_input(InputEvent::Thumbstick {
            hand: Hand::Left,
            value: Vec2::new(0.0, -1.0),
        });
        let highlighted = session.roles().menu().highlighted().unwrap();
        session.handle_input(InputEvent::PrimaryPressed(Hand::Left));
        assert!(!session.roles().is_paused());
        settle(&mut session);
        assert_eq!(session.roles().active_role(), highlighted);
    }

    #[test]
    fn test_pinch_refused_while_paused() {
        let mut session = Session::new(SessionConfig::default());
        session.toggle_menu();
        assert_eq!(session.pinch(Hand::Right), Err(ActionRejected::GamePaused));
    }

    #[test]
    fn test_rejection_shows_bubble() {
        let mut session = Session::new(SessionConfig::default());
        session.request_role(Role::FingerprintSpecialist).unwrap();
        settle(&mut session);

        let brush = session.spawn_item(ItemType::FingerprintBrush, Pose::default());
        session.grab_with(Hand::Right, brush).unwrap();
        let print = session.add_scene_object(
            SceneObjectKind::fingerprint("door handle"),
            Vec3::new(0.0, 1.0, 0.0),
            0.1,
        );
        session.report_proximity(ProximityEvent::Began {
            item: brush,
            target: csi_inventory::ContactTarget::Object(print),
        });

        assert_eq!(session.pinch(Hand::Right), Err(ActionRejected::BrushNotLoaded));
        assert!(session.bubbles().current().is_some());
    }

    #[test]
    fn test_locked_roles_hidden_from_menu() {
        let store = MemoryStore::new();
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let roster = ClassRoster::new(shared.clone());
        roster
            .create_class("intro", "Intro", &["first_responder", "photographer"])
            .unwrap();
        roster.enroll("intro", "trainee-1").unwrap();

        let user = UserProfile {
            id: "trainee-1".to_string(),
            display_name: "Trainee".to_string(),
            verified: true,
            guest: false,
        };
        let session = Session::new(SessionConfig::default()).with_backend(shared, user);
        assert_eq!(
            session.roles().menu().options(),
            &[Role::FirstResponder, Role::Photographer]
        );
    }

    #[test]
    fn test_role_changes_logged() {
        let store = MemoryStore::new();
        let mut config = SessionConfig::default();
        config.logger.batch_size = 10;
        let user = UserProfile {
            id: "trainee-2".to_string(),
            display_name: "Trainee".to_string(),
            verified: true,
            guest: false,
        };
        let mut session = Session::new(config).with_backend(Arc::new(store.clone()), user);
        session.request_role(Role::Sketcher).unwrap();
        settle(&mut session);
        session.flush_log();

        let logger = session.logger().unwrap();
        assert_eq!(logger.pending(), 0);
        assert_eq!(logger.sent(), 2);
    }
}
