//! Role selection menu
//!
//! While open the game is paused. The highlighted entry moves with the
//! thumbstick at most once per cooldown; nothing changes until `commit`.

use csi_core::Role;
use glam::Vec2;

/// Role menu state
#[derive(Debug, Clone)]
pub struct RoleMenu {
    open: bool,
    options: Vec<Role>,
    highlighted: usize,
    /// Seconds between highlight moves
    cooldown: f32,
    cooldown_remaining: f32,
    /// Stick deflection below this is ignored
    deadzone: f32,
}

impl RoleMenu {
    /// Closed menu offering every playable role
    pub fn new(cooldown: f32, deadzone: f32) -> Self {
        Self {
            open: false,
            options: Role::selectable().to_vec(),
            highlighted: 0,
            cooldown,
            cooldown_remaining: 0.0,
            deadzone,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open with the current role highlighted when it is on offer
    pub fn open(&mut self, current: Role) {
        self.open = true;
        self.cooldown_remaining = 0.0;
        self.highlighted = self
            .options
            .iter()
            .position(|r| *r == current)
            .unwrap_or(0);
        log::debug!("Role menu opened ({} options)", self.options.len());
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Open if closed, close if open
    pub fn toggle(&mut self, current: Role) {
        if self.open {
            self.close();
        } else {
            self.open(current);
        }
    }

    /// Restrict the menu to these roles (keeps menu order, drops non-playable)
    pub fn set_options(&mut self, roles: &[Role]) {
        let current = self.highlighted();
        self.options = Role::selectable()
            .into_iter()
            .filter(|r| roles.contains(r))
            .collect();
        self.highlighted = current
            .and_then(|role| self.options.iter().position(|r| *r == role))
            .unwrap_or(0);
    }

    pub fn options(&self) -> &[Role] {
        &self.options
    }

    /// Role under the cursor
    pub fn highlighted(&self) -> Option<Role> {
        self.options.get(self.highlighted).copied()
    }

    /// Move the highlight from a thumbstick deflection.
    /// Down (negative y) moves to the next entry. Returns the new highlight
    /// when it moved.
    pub fn navigate(&mut self, stick: Vec2) -> Option<Role> {
        if !self.open || self.cooldown_remaining > 0.0 || stick.y.abs() < self.deadzone {
            return None;
        }
        self.cycle(if stick.y < 0.0 { 1 } else { -1 })
    }

    /// Step the highlight, wrapping. Starts the cooldown.
    pub fn cycle(&mut self, step: i32) -> Option<Role> {
        if !self.open || self.options.is_empty() {
            return None;
        }
        let len = self.options.len() as i32;
        self.highlighted = (self.highlighted as i32 + step).rem_euclid(len) as usize;
        self.cooldown_remaining = self.cooldown;
        self.highlighted()
    }

    /// Close and return the highlighted role
    pub fn commit(&mut self) -> Option<Role> {
        if !self.open {
            return None;
        }
        self.open = false;
        self.highlighted()
    }

    /// Advance the cooldown timer
    pub fn tick(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }
}

impl Default for RoleMenu {
    fn default() -> Self {
        Self::new(0.3, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_limits_scrolling() {
        let mut menu = RoleMenu::default();
        menu.open(Role::FirstResponder);

        let down = Vec2::new(0.0, -1.0);
        assert_eq!(menu.navigate(down), Some(Role::InvestigatorOnCase));
        // Same deflection on the next frames does nothing
        menu.tick(0.016);
        assert_eq!(menu.navigate(down), None);
        menu.tick(0.3);
        assert_eq!(menu.navigate(down), Some(Role::SocoTeamLead));
    }

    #[test]
    fn test_deadzone_and_closed() {
        let mut menu = RoleMenu::default();
        assert_eq!(menu.navigate(Vec2::new(0.0, -1.0)), None);

        menu.open(Role::None);
        assert_eq!(menu.navigate(Vec2::new(0.9, -0.2)), None);
        assert_eq!(menu.highlighted(), Some(Role::FirstResponder));
    }

    #[test]
    fn test_wraps_upwards() {
        let mut menu = RoleMenu::default();
        menu.open(Role::FirstResponder);
        assert_eq!(menu.navigate(Vec2::new(0.0, 1.0)), Some(Role::EvidenceCustodian));
    }

    #[test]
    fn test_options_restricted() {
        let mut menu = RoleMenu::default();
        menu.set_options(&[Role::Photographer, Role::FirstResponder, Role::None]);
        assert_eq!(menu.options(), &[Role::FirstResponder, Role::Photographer]);

        menu.open(Role::Photographer);
        assert_eq!(menu.commit(), Some(Role::Photographer));
        assert!(!menu.is_open());
    }
}
