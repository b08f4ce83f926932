//! CSI Runtime - Training Session
//!
//! Ties the registries of one case together behind a single [`Session`]
//! and advances them with an explicit tick loop.
//!
//! # Features
//!
//! - Session context owning items, scene, flags, timeline, markers and roles
//! - Controller edge detection with menu or interaction routing
//! - Arrival stamps on role changes
//! - Thought bubble hints for actions that do nothing
//! - Backend event logging and class-based role unlocks
//! - Save/load of the whole case
//! - TOML config with `CSI_*` environment overrides
//! - Scripted scenarios for headless runs
//!
//! # Example
//!
//! ```ignore
//! use csi_runtime::prelude::*;
//!
//! let config = SessionConfig::load(None)?;
//! let mut session = Session::new(config);
//! session.request_role(Role::FirstResponder)?;
//!
//! loop {
//!     session.feed_controller(Hand::Right, sample);
//!     session.tick(dt);
//! }
//! ```

pub mod bubbles;
pub mod config;
pub mod input;
pub mod scenario;
pub mod session;

pub mod prelude {
    pub use crate::bubbles::{rejection_hint, role_hint, Bubble, BubbleConfig, ThoughtBubbles};
    pub use crate::config::{CaseConfig, ConfigError, SessionConfig, TimelineConfig};
    pub use crate::input::{ControllerSample, InputEvent, InputManager};
    pub use crate::scenario::{Refusal, Scenario, ScenarioError, ScenarioReport, Step};
    pub use crate::session::Session;
    pub use csi_core::{Hand, Pose, Role};
}

pub use prelude::*;
