//! Timeline registry

use crate::event::TimelineEvent;
use chrono::{Duration, NaiveDateTime};
use csi_core::clock::CaseClock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Timeline errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// A dependent event was queried before it happened
    #[error("Timeline event has not occurred yet: {0}")]
    NotOccurred(TimelineEvent),
    /// The incident anchor cannot be removed
    #[error("The incident anchor cannot be cleared")]
    AnchorRequired,
}

/// One set event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub event: TimelineEvent,
    pub time: NaiveDateTime,
}

/// Serializable copy of the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub events: BTreeMap<TimelineEvent, NaiveDateTime>,
}

/// Case timeline.
///
/// The incident is recorded at construction, so queries relative to it can
/// never observe a missing anchor.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: BTreeMap<TimelineEvent, NaiveDateTime>,
}

impl Timeline {
    /// Create a timeline anchored at the incident time
    pub fn new(incident: NaiveDateTime) -> Self {
        let mut events = BTreeMap::new();
        events.insert(TimelineEvent::Incident, incident);
        Self { events }
    }

    /// Incident anchor
    pub fn incident(&self) -> NaiveDateTime {
        // Present since construction; `clear` refuses to remove it.
        self.events
            .get(&TimelineEvent::Incident)
            .copied()
            .unwrap_or_default()
    }

    /// Check if an event has happened
    pub fn has_event(&self, event: TimelineEvent) -> bool {
        self.events.contains_key(&event)
    }

    /// Time of an event, if it happened
    pub fn event_time(&self, event: TimelineEvent) -> Option<NaiveDateTime> {
        self.events.get(&event).copied()
    }

    /// Time of an event the caller depends on
    pub fn require(&self, event: TimelineEvent) -> Result<NaiveDateTime, TimelineError> {
        self.event_time(event)
            .ok_or(TimelineError::NotOccurred(event))
    }

    /// Set an event at an explicit time (overwrites)
    pub fn set_event(&mut self, event: TimelineEvent, time: NaiveDateTime) {
        if let Some(previous) = self.events.insert(event, time) {
            log::debug!("Timeline {:?} overwritten ({} -> {})", event, previous, time);
        } else {
            log::info!("Timeline {:?} at {}", event, time.format("%H:%M"));
        }
    }

    /// Stamp an event with the clock's evening-adjusted "now".
    ///
    /// Overwrites an existing entry; callers wanting set-once semantics check
    /// [`has_event`](Self::has_event) first or use
    /// [`set_event_now_if_absent`](Self::set_event_now_if_absent).
    pub fn set_event_now(&mut self, event: TimelineEvent, clock: &CaseClock, evening_hour: u32) -> NaiveDateTime {
        let time = clock.evening_now(evening_hour);
        self.set_event(event, time);
        time
    }

    /// Stamp an event only if it has not happened yet. Returns true if set.
    pub fn set_event_now_if_absent(&mut self, event: TimelineEvent, clock: &CaseClock, evening_hour: u32) -> bool {
        if self.has_event(event) {
            return false;
        }
        self.set_event_now(event, clock, evening_hour);
        true
    }

    /// Remove an event
    pub fn clear(&mut self, event: TimelineEvent) -> Result<Option<NaiveDateTime>, TimelineError> {
        if event == TimelineEvent::Incident {
            return Err(TimelineError::AnchorRequired);
        }
        Ok(self.events.remove(&event))
    }

    /// Duration between the incident and an event
    pub fn since_incident(&self, event: TimelineEvent) -> Result<Duration, TimelineError> {
        Ok(self.require(event)? - self.incident())
    }

    /// "HH:MM" for a set event
    pub fn format_time(&self, event: TimelineEvent) -> Option<String> {
        self.event_time(event)
            .map(|t| t.format("%H:%M").to_string())
    }

    /// Set events in chronological order (ties broken by narrative order)
    pub fn entries(&self) -> Vec<TimelineEntry> {
        let mut entries: Vec<_> = self
            .events
            .iter()
            .map(|(event, time)| TimelineEntry {
                event: *event,
                time: *time,
            })
            .collect();
        entries.sort_by(|a, b| a.time.cmp(&b.time).then(a.event.cmp(&b.event)));
        entries
    }

    /// Number of set events (including the incident)
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false: the incident is always present
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Copy out for saving
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            events: self.events.clone(),
        }
    }

    /// Restore from a snapshot. A snapshot without an incident keeps the current anchor.
    pub fn restore(&mut self, snapshot: &TimelineSnapshot) {
        let incident = snapshot
            .events
            .get(&TimelineEvent::Incident)
            .copied()
            .unwrap_or_else(|| self.incident());
        self.events = snapshot.events.clone();
        self.events.insert(TimelineEvent::Incident, incident);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    #[test]
    fn test_incident_always_present() {
        let timeline = Timeline::new(at(19, 0));
        assert!(timeline.has_event(TimelineEvent::Incident));
        assert_eq!(timeline.incident(), at(19, 0));
        assert_eq!(
            timeline.require(TimelineEvent::Cordoned),
            Err(TimelineError::NotOccurred(TimelineEvent::Cordoned))
        );
    }

    #[test]
    fn test_set_event_now_overwrites() {
        let mut clock = CaseClock::new(at(19, 0));
        let mut timeline = Timeline::new(clock.anchor());

        clock.advance(60.0);
        timeline.set_event_now(TimelineEvent::Cordoned, &clock, 18);
        clock.advance(120.0);
        timeline.set_event_now(TimelineEvent::Cordoned, &clock, 18);

        assert_eq!(timeline.event_time(TimelineEvent::Cordoned), Some(at(19, 3)));
    }

    #[test]
    fn test_guarded_set_is_idempotent() {
        let mut clock = CaseClock::new(at(19, 0));
        let mut timeline = Timeline::new(clock.anchor());

        clock.advance(60.0);
        assert!(timeline.set_event_now_if_absent(TimelineEvent::CalledTOC, &clock, 18));
        clock.advance(600.0);
        assert!(!timeline.set_event_now_if_absent(TimelineEvent::CalledTOC, &clock, 18));

        assert_eq!(timeline.event_time(TimelineEvent::CalledTOC), Some(at(19, 1)));
    }

    #[test]
    fn test_evening_rollover_applied() {
        let clock = CaseClock::new(at(15, 40));
        let mut timeline = Timeline::new(clock.anchor());
        timeline.set_event_now(TimelineEvent::FirstResponderArrived, &clock, 18);

        assert_eq!(timeline.format_time(TimelineEvent::FirstResponderArrived).as_deref(), Some("18:40"));
    }

    #[test]
    fn test_clear_refuses_anchor() {
        let mut timeline = Timeline::new(at(19, 0));
        timeline.set_event(TimelineEvent::EvidenceMarked, at(19, 30));

        assert_eq!(timeline.clear(TimelineEvent::Incident), Err(TimelineError::AnchorRequired));
        assert_eq!(timeline.clear(TimelineEvent::EvidenceMarked), Ok(Some(at(19, 30))));
        assert!(!timeline.has_event(TimelineEvent::EvidenceMarked));
    }

    #[test]
    fn test_entries_chronological() {
        let mut timeline = Timeline::new(at(19, 0));
        timeline.set_event(TimelineEvent::Cordoned, at(19, 20));
        timeline.set_event(TimelineEvent::FirstResponderArrived, at(19, 10));

        let order: Vec<_> = timeline.entries().into_iter().map(|e| e.event).collect();
        assert_eq!(
            order,
            vec![
                TimelineEvent::Incident,
                TimelineEvent::FirstResponderArrived,
                TimelineEvent::Cordoned
            ]
        );
        assert_eq!(
            timeline.since_incident(TimelineEvent::Cordoned),
            Ok(Duration::minutes(20))
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let mut timeline = Timeline::new(at(19, 0));
        timeline.set_event(TimelineEvent::PhotographsTaken, at(19, 45));
        let bytes = bincode::serialize(&timeline.snapshot()).unwrap();

        let mut restored = Timeline::new(at(8, 0));
        restored.restore(&bincode::deserialize(&bytes).unwrap());
        assert_eq!(restored.incident(), at(19, 0));
        assert!(restored.has_event(TimelineEvent::PhotographsTaken));
    }
}
