//! CSI Interaction - Item Dispatch
//!
//! Tracks what each hand holds and turns a pinch into exactly one action,
//! chosen from the item in the pinching hand, the item in the other hand and
//! whatever the item is touching.
//!
//! # Features
//!
//! - Grab/release bound to the engine's selection state
//! - Proximity reports that flip write permissions and checks
//! - Priority-ordered dispatch table with ambiguity reporting
//! - Notepad, forms, police tape, markers, camera, radio
//! - Fingerprint pipeline (load brush, dust, extend tape, lift, attach)
//! - Evidence collection, bagging, sealing and swabbing
//!
//! # Example
//!
//! ```ignore
//! use csi_interaction::prelude::*;
//!
//! let mut interaction = InteractionManager::new(InteractionConfig::default());
//! interaction.grab_with(Hand::Right, pen, &mut items)?;
//! interaction.grab_with(Hand::Left, notepad, &mut items)?;
//!
//! let mut ctx = InteractionContext { /* registries */ };
//! match interaction.pinch(Hand::Right, &mut ctx) {
//!     Ok(event) => log::info!("{}", event.describe()),
//!     Err(rejected) => log::debug!("{}", rejected),
//! }
//! ```

pub mod actions;
pub mod context;
pub mod dispatch;
pub mod manager;
pub mod proximity;

pub mod prelude {
    pub use crate::actions::{ActionRejected, Outcome};
    pub use crate::context::InteractionContext;
    pub use crate::dispatch::{Action, PinchContext, Rule, RULES};
    pub use crate::manager::{GrabError, InteractionConfig, InteractionEvent, InteractionManager};
    pub use crate::proximity::ProximityEvent;
}

pub use prelude::*;
