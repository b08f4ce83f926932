//! CSI Timeline - Case Timeline Registry
//!
//! Named, optionally-set points in time about the case. The incident anchor
//! is always present; every other event is absent until gameplay sets it.
//!
//! ```ignore
//! use csi_timeline::prelude::*;
//!
//! let mut timeline = Timeline::new(clock.anchor());
//! timeline.set_event_now_if_absent(TimelineEvent::Cordoned, &clock, 18);
//! let cordoned = timeline.require(TimelineEvent::Cordoned)?;
//! ```

pub mod event;
pub mod timeline;

pub mod prelude {
    pub use crate::event::TimelineEvent;
    pub use crate::timeline::{Timeline, TimelineEntry, TimelineError, TimelineSnapshot};
}

pub use prelude::*;
