//! Role manager
//!
//! Owns the avatar map and drives role changes as an explicit state machine
//! advanced by [`RoleManager::tick`]:
//!
//! 1. **Suspend** - disable hands, pause held items, deactivate the old avatar
//! 2. **Swap** - look up or instantiate the target avatar and activate it
//! 3. **Reposition** - move the XR rig to the new avatar
//! 4. **Settle** - wait `settle_delay` seconds
//! 5. **Resume** - reattach held items to the new hands, re-enable hands

use crate::avatar::{Avatar, AvatarCatalog, AvatarPrefab};
use crate::menu::RoleMenu;
use csi_core::{AvatarId, Hand, IdGenerator, Pose, Role};
use csi_inventory::{HandSlots, HeldItem, ItemRegistry};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

/// Role system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Seconds between menu highlight moves
    pub menu_cooldown: f32,
    /// Thumbstick deflection ignored by the menu
    pub stick_deadzone: f32,
    /// Height the rig is placed at after a role change
    pub rig_height: f32,
    /// Seconds between repositioning and handing items back
    pub settle_delay: f32,
    /// First-activation pose for avatars without their own
    pub spawn_pose: Pose,
    /// Avatar prefabs. Empty means one standard prefab per playable role.
    pub avatars: Vec<AvatarPrefab>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            menu_cooldown: 0.3,
            stick_deadzone: 0.5,
            rig_height: 0.0,
            settle_delay: 0.1,
            spawn_pose: Pose::IDENTITY,
            avatars: Vec::new(),
        }
    }
}

impl RoleConfig {
    /// Build the avatar catalog this config describes
    pub fn catalog(&self) -> AvatarCatalog {
        if self.avatars.is_empty() {
            AvatarCatalog::standard_at(self.spawn_pose)
        } else {
            AvatarCatalog::from_prefabs(self.spawn_pose, self.avatars.iter().cloned())
        }
    }
}

/// Rejected role change requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleChangeError {
    #[error("A change to {0} is already in progress")]
    AlreadyTransitioning(Role),
    #[error("{0} is already the active role")]
    AlreadyActive(Role),
    #[error("Cannot switch to the empty role")]
    NoneRole,
    #[error("No role highlighted")]
    NoSelection,
    #[error("No avatar prefab configured for {0}")]
    MissingPrefab(Role),
}

/// Role notifications
#[derive(Debug, Clone, PartialEq)]
pub enum RoleEvent {
    /// A transition was accepted
    Started { from: Role, to: Role },
    /// The new role is active and the hands are back
    Changed { from: Role, to: Role, avatar: AvatarId },
    /// The transition was aborted; `from` is still active
    ChangeFailed { from: Role, to: Role, error: RoleChangeError },
}

/// Transition progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionPhase {
    Suspend,
    Swap,
    Reposition,
    Settle { remaining: f32 },
    Resume,
}

/// External XR rig
pub trait RigDriver {
    /// Where the player currently is
    fn rig_pose(&self) -> Pose;
    /// Teleport the player
    fn place_rig(&mut self, pose: Pose);
}

/// Rig that just remembers its pose
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulatedRig {
    pub pose: Pose,
}

impl RigDriver for SimulatedRig {
    fn rig_pose(&self) -> Pose {
        self.pose
    }

    fn place_rig(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

/// What a transition needs from the rest of the session
pub struct RoleHost<'a> {
    pub hands: &'a mut HandSlots,
    pub items: &'a mut ItemRegistry,
    pub rig: &'a mut dyn RigDriver,
}

impl<'a> RoleHost<'a> {
    pub fn new(
        hands: &'a mut HandSlots,
        items: &'a mut ItemRegistry,
        rig: &'a mut dyn RigDriver,
    ) -> Self {
        Self { hands, items, rig }
    }
}

#[derive(Debug, Clone)]
struct Transition {
    from: Role,
    to: Role,
    phase: TransitionPhase,
    held: Vec<(Hand, HeldItem)>,
}

/// Serializable role state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub active: Role,
    pub avatars: Vec<Avatar>,
}

/// Role manager
pub struct RoleManager {
    config: RoleConfig,
    catalog: AvatarCatalog,
    avatars: BTreeMap<Role, Avatar>,
    ids: IdGenerator,
    active: Role,
    transition: Option<Transition>,
    menu: RoleMenu,
    pending: Vec<RoleEvent>,
}

impl RoleManager {
    /// Create a manager with no role embodied
    pub fn new(config: RoleConfig, catalog: AvatarCatalog) -> Self {
        let menu = RoleMenu::new(config.menu_cooldown, config.stick_deadzone);
        Self {
            config,
            catalog,
            avatars: BTreeMap::new(),
            ids: IdGenerator::new(),
            active: Role::None,
            transition: None,
            menu,
            pending: Vec::new(),
        }
    }

    /// Create a manager using the config's own catalog
    pub fn from_config(config: RoleConfig) -> Self {
        let catalog = config.catalog();
        Self::new(config, catalog)
    }

    pub fn config(&self) -> &RoleConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AvatarCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut AvatarCatalog {
        &mut self.catalog
    }

    /// Currently embodied role
    pub fn active_role(&self) -> Role {
        self.active
    }

    /// Avatar of the active role
    pub fn active_avatar(&self) -> Option<&Avatar> {
        self.avatars.get(&self.active).filter(|a| a.active)
    }

    /// Avatar for a role, if it was ever instantiated
    pub fn avatar(&self, role: Role) -> Option<&Avatar> {
        self.avatars.get(&role)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.avatars.values()
    }

    /// Check if a transition is in flight
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Phase of the transition in flight
    pub fn phase(&self) -> Option<TransitionPhase> {
        self.transition.as_ref().map(|t| t.phase)
    }

    /// Target of the transition in flight
    pub fn pending_role(&self) -> Option<Role> {
        self.transition.as_ref().map(|t| t.to)
    }

    pub fn menu(&self) -> &RoleMenu {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut RoleMenu {
        &mut self.menu
    }

    /// Game is paused while the menu is open
    pub fn is_paused(&self) -> bool {
        self.menu.is_open()
    }

    /// Ask for a role change. The change itself happens over the next ticks.
    pub fn request_role_change(&mut self, target: Role) -> Result<(), RoleChangeError> {
        if let Some(transition) = &self.transition {
            log::warn!(
                "Ignoring change to {}: change to {} in progress",
                target,
                transition.to
            );
            return Err(RoleChangeError::AlreadyTransitioning(transition.to));
        }
        if target == Role::None {
            return Err(RoleChangeError::NoneRole);
        }
        if target == self.active {
            return Err(RoleChangeError::AlreadyActive(target));
        }

        log::info!("Role change requested: {} -> {}", self.active, target);
        self.transition = Some(Transition {
            from: self.active,
            to: target,
            phase: TransitionPhase::Suspend,
            held: Vec::new(),
        });
        self.pending.push(RoleEvent::Started {
            from: self.active,
            to: target,
        });
        Ok(())
    }

    /// Close the menu and switch to the highlighted role
    pub fn commit_menu(&mut self) -> Result<Role, RoleChangeError> {
        let role = self.menu.commit().ok_or(RoleChangeError::NoSelection)?;
        self.request_role_change(role)?;
        Ok(role)
    }

    /// Advance the menu cooldown and any transition in flight
    pub fn tick(&mut self, dt: f32, host: &mut RoleHost<'_>) {
        self.menu.tick(dt);

        let Some(mut transition) = self.transition.take() else {
            return;
        };
        let mut dt = dt;

        loop {
            match transition.phase {
                TransitionPhase::Suspend => {
                    self.suspend(&mut transition, host);
                    transition.phase = TransitionPhase::Swap;
                }
                TransitionPhase::Swap => {
                    if let Err(error) = self.swap(&transition) {
                        self.roll_back(&transition, host, error);
                        return;
                    }
                    transition.phase = TransitionPhase::Reposition;
                }
                TransitionPhase::Reposition => {
                    self.reposition(transition.to, host);
                    transition.phase = TransitionPhase::Settle {
                        remaining: self.config.settle_delay,
                    };
                }
                TransitionPhase::Settle { remaining } => {
                    let remaining = remaining - dt;
                    dt = 0.0;
                    if remaining > 0.0 {
                        transition.phase = TransitionPhase::Settle { remaining };
                        self.transition = Some(transition);
                        return;
                    }
                    transition.phase = TransitionPhase::Resume;
                }
                TransitionPhase::Resume => {
                    self.resume(&transition, host);
                    return;
                }
            }
        }
    }

    fn suspend(&mut self, transition: &mut Transition, host: &mut RoleHost<'_>) {
        host.hands.set_enabled(false);
        transition.held = host.hands.held().collect();
        for (hand, held) in &transition.held {
            host.items.set_paused(held.id, true);
            log::debug!("Paused {} in {} hand", held.id, hand);
        }

        if let Some(old) = self.avatars.get_mut(&transition.from) {
            old.pose = host.rig.rig_pose().at_height(old.pose.position.y);
            old.set_active(false);
        }
    }

    fn swap(&mut self, transition: &Transition) -> Result<AvatarId, RoleChangeError> {
        let avatar = match self.avatars.entry(transition.to) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let prefab = self
                    .catalog
                    .prefab(transition.to)
                    .ok_or(RoleChangeError::MissingPrefab(transition.to))?;
                let id = AvatarId(self.ids.next_raw());
                log::info!("Instantiating '{}' as {}", prefab.name, id);
                entry.insert(Avatar::instantiate(
                    id,
                    prefab,
                    self.catalog.spawn_pose(transition.to),
                ))
            }
        };
        avatar.set_active(true);
        self.active = transition.to;
        Ok(avatar.id)
    }

    fn reposition(&mut self, role: Role, host: &mut RoleHost<'_>) {
        if let Some(avatar) = self.avatars.get(&role) {
            host.rig
                .place_rig(avatar.pose.at_height(self.config.rig_height));
        }
    }

    fn resume(&mut self, transition: &Transition, host: &mut RoleHost<'_>) {
        let Some(avatar) = self.avatars.get(&transition.to) else {
            return;
        };

        for (hand, held) in &transition.held {
            if let Some(item) = host.items.get_mut(held.id) {
                item.paused = false;
                item.pose = avatar.hand_pose(*hand);
                item.held_by = Some(*hand);
            }
            if host.hands.get(*hand) != Some(*held) {
                host.hands.insert(*hand, *held);
            }
        }
        host.hands.set_enabled(true);

        log::info!("Now playing as {}", transition.to);
        self.pending.push(RoleEvent::Changed {
            from: transition.from,
            to: transition.to,
            avatar: avatar.id,
        });
    }

    fn roll_back(&mut self, transition: &Transition, host: &mut RoleHost<'_>, error: RoleChangeError) {
        log::error!("Role change to {} aborted: {}", transition.to, error);

        if let Some(old) = self.avatars.get_mut(&transition.from) {
            old.set_active(true);
        }
        for (_, held) in &transition.held {
            host.items.set_paused(held.id, false);
        }
        host.hands.set_enabled(true);

        self.pending.push(RoleEvent::ChangeFailed {
            from: transition.from,
            to: transition.to,
            error,
        });
    }

    /// Drain pending notifications
    pub fn drain_events(&mut self) -> Vec<RoleEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Copy out the role state
    pub fn snapshot(&self) -> RoleSnapshot {
        RoleSnapshot {
            active: self.active,
            avatars: self.avatars.values().cloned().collect(),
        }
    }

    /// Replace the role state. Any transition in flight is dropped.
    pub fn restore(&mut self, snapshot: RoleSnapshot) {
        if let Some(transition) = self.transition.take() {
            log::warn!("Dropping change to {} on restore", transition.to);
        }
        self.avatars.clear();
        for avatar in snapshot.avatars {
            self.ids.reserve_past(avatar.id.raw());
            self.avatars.insert(avatar.role, avatar);
        }
        self.active = snapshot.active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csi_inventory::{ItemType, PowderType};
    use glam::Vec3;

    struct Fixture {
        roles: RoleManager,
        hands: HandSlots,
        items: ItemRegistry,
        rig: SimulatedRig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                roles: RoleManager::from_config(RoleConfig::default()),
                hands: HandSlots::new(),
                items: ItemRegistry::new(),
                rig: SimulatedRig::default(),
            }
        }

        fn tick(&mut self, dt: f32) {
            let mut host = RoleHost::new(&mut self.hands, &mut self.items, &mut self.rig);
            self.roles.tick(dt, &mut host);
        }

        fn switch(&mut self, role: Role) {
            self.roles.request_role_change(role).unwrap();
            self.tick(0.0);
            self.tick(1.0);
            assert_eq!(self.roles.active_role(), role);
            assert!(!self.roles.is_transitioning());
        }

        fn active_count(&self) -> usize {
            self.roles.avatars().filter(|a| a.active).count()
        }
    }

    #[test]
    fn test_first_change() {
        let mut fx = Fixture::new();
        assert_eq!(fx.roles.active_role(), Role::None);

        fx.switch(Role::FirstResponder);
        let events = fx.roles.drain_events();
        assert!(matches!(events[0], RoleEvent::Started { from: Role::None, to: Role::FirstResponder }));
        assert!(matches!(events[1], RoleEvent::Changed { to: Role::FirstResponder, .. }));
        assert_eq!(fx.active_count(), 1);
    }

    #[test]
    fn test_rejects_reentrant_and_same_role() {
        let mut fx = Fixture::new();
        fx.roles.request_role_change(Role::Photographer).unwrap();
        assert_eq!(
            fx.roles.request_role_change(Role::Sketcher),
            Err(RoleChangeError::AlreadyTransitioning(Role::Photographer))
        );
        fx.tick(0.0);
        fx.tick(1.0);

        assert_eq!(
            fx.roles.request_role_change(Role::Photographer),
            Err(RoleChangeError::AlreadyActive(Role::Photographer))
        );
        assert_eq!(fx.roles.request_role_change(Role::None), Err(RoleChangeError::NoneRole));
    }

    #[test]
    fn test_avatar_kept_with_last_pose() {
        let mut fx = Fixture::new();
        fx.switch(Role::FirstResponder);
        let first_id = fx.roles.active_avatar().unwrap().id;

        // Player walks somewhere
        fx.rig.pose = Pose::from_position(Vec3::new(3.0, 0.0, 1.0));
        fx.switch(Role::Photographer);
        assert_eq!(fx.rig.pose.position, Vec3::ZERO);
        assert_eq!(fx.active_count(), 1);

        fx.switch(Role::FirstResponder);
        let avatar = fx.roles.active_avatar().unwrap();
        assert_eq!(avatar.id, first_id);
        assert_eq!(avatar.pose.position, Vec3::new(3.0, 0.0, 1.0));
        assert_eq!(fx.rig.pose.position, Vec3::new(3.0, 0.0, 1.0));
        assert_eq!(fx.roles.avatars().count(), 2);
    }

    #[test]
    fn test_held_item_paused_then_reattached() {
        let mut fx = Fixture::new();
        fx.switch(Role::FirstResponder);

        let brush = fx
            .items
            .spawn_with(ItemType::FingerprintBrush, Pose::default(), |i| i.with_powder(PowderType::Magnetic));
        fx.hands.insert(Hand::Left, HeldItem::new(brush, ItemType::FingerprintBrush));

        fx.roles.request_role_change(Role::FingerprintSpecialist).unwrap();
        fx.tick(0.0);
        assert!(fx.roles.is_transitioning());
        assert!(fx.items.get(brush).unwrap().paused);
        assert!(!fx.hands.is_enabled());

        fx.tick(0.5);
        let item = fx.items.get(brush).unwrap();
        assert!(!item.paused);
        assert_eq!(item.state.powder(), Some(PowderType::Magnetic));
        assert_eq!(fx.hands.find(brush), Some(Hand::Left));
        assert!(fx.hands.is_enabled());

        let avatar = fx.roles.active_avatar().unwrap();
        assert_eq!(item.pose, avatar.hand_pose(Hand::Left));
    }

    #[test]
    fn test_missing_prefab_rolls_back() {
        let mut fx = Fixture::new();
        fx.switch(Role::FirstResponder);
        fx.roles.drain_events();
        fx.roles.catalog_mut().unregister(Role::Measurer);

        fx.roles.request_role_change(Role::Measurer).unwrap();
        fx.tick(0.0);

        assert!(!fx.roles.is_transitioning());
        assert_eq!(fx.roles.active_role(), Role::FirstResponder);
        assert!(fx.roles.active_avatar().is_some());
        assert!(fx.hands.is_enabled());
        assert!(fx.roles.avatar(Role::Measurer).is_none());
        assert!(matches!(
            fx.roles.drain_events().last(),
            Some(RoleEvent::ChangeFailed { error: RoleChangeError::MissingPrefab(Role::Measurer), .. })
        ));
    }

    #[test]
    fn test_commit_menu() {
        let mut fx = Fixture::new();
        fx.roles.menu_mut().open(Role::None);
        assert!(fx.roles.is_paused());
        fx.roles.menu_mut().cycle(1);

        assert_eq!(fx.roles.commit_menu(), Ok(Role::InvestigatorOnCase));
        assert!(!fx.roles.is_paused());
        assert_eq!(fx.roles.commit_menu(), Err(RoleChangeError::NoSelection));
    }

    #[test]
    fn test_config_from_toml() {
        let config: RoleConfig = toml::from_str(
            r#"
            menu_cooldown = 0.5
            rig_height = 1.2

            [[avatars]]
            role = "Collector"
            name = "collector_rig"
            "#,
        )
        .unwrap();

        assert_eq!(config.menu_cooldown, 0.5);
        assert_eq!(config.settle_delay, 0.1);
        let catalog = config.catalog();
        assert_eq!(catalog.roles().collect::<Vec<_>>(), vec![Role::Collector]);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut fx = Fixture::new();
        fx.switch(Role::Sketcher);
        let snapshot = fx.roles.snapshot();

        let mut other = RoleManager::from_config(RoleConfig::default());
        other.restore(snapshot);
        assert_eq!(other.active_role(), Role::Sketcher);
        assert!(other.active_avatar().is_some());
    }
}
