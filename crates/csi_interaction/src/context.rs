//! Registries an interaction may touch

use chrono::NaiveDateTime;
use csi_core::{CaseClock, Role};
use csi_evidence::EvidenceManager;
use csi_gamestate::GameFlags;
use csi_inventory::{ItemRegistry, SceneObjects};
use csi_timeline::{Timeline, TimelineEvent};

/// Borrowed view of the session state for one interaction
pub struct InteractionContext<'a> {
    pub items: &'a mut ItemRegistry,
    pub scene: &'a mut SceneObjects,
    pub flags: &'a mut GameFlags,
    pub timeline: &'a mut Timeline,
    pub evidence: &'a mut EvidenceManager,
    pub clock: &'a CaseClock,
    /// Role performing the interaction
    pub role: Role,
    /// Hour before which case times roll forward into the evening
    pub evening_hour: u32,
    pub case_id: Option<&'a str>,
}

impl InteractionContext<'_> {
    /// Case time for anything recorded now
    pub fn now(&self) -> NaiveDateTime {
        self.clock.evening_now(self.evening_hour)
    }

    /// Record an event unless it already happened
    pub fn record_once(&mut self, event: TimelineEvent) -> bool {
        self.timeline
            .set_event_now_if_absent(event, self.clock, self.evening_hour)
    }

    /// Record an event, overwriting any earlier time
    pub fn record(&mut self, event: TimelineEvent) -> NaiveDateTime {
        self.timeline
            .set_event_now(event, self.clock, self.evening_hour)
    }
}
