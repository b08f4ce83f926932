//! Scene flag registry
//!
//! Flags are only ever flipped by proximity/collision reports from outside the
//! coordinator; readers are the interaction dispatcher and UI observers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named flag in the scene bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlagKey {
    /// Pen tip is touching the notepad
    CanWriteNotepad,
    /// Pen tip is touching a form
    CanWriteForm,
    /// Pen tip is touching an evidence pack seal
    CanWriteEvidencePackSeal,
    /// Player has looked at the time
    HasCheckedTime,
    /// Arrival time has been written on the notepad
    HasWrittenArrival,
    /// Player has taken the victim's pulse
    HasCheckedPulse,
    /// Pulse has been written on the notepad
    HasWrittenPulse,
    /// Player is wearing gloves
    HasGlovesOn,
    /// Measured pulse in bpm
    Pulse,
}

impl FlagKey {
    /// Every flag key
    pub const ALL: [FlagKey; 9] = [
        Self::CanWriteNotepad,
        Self::CanWriteForm,
        Self::CanWriteEvidencePackSeal,
        Self::HasCheckedTime,
        Self::HasWrittenArrival,
        Self::HasCheckedPulse,
        Self::HasWrittenPulse,
        Self::HasGlovesOn,
        Self::Pulse,
    ];

    /// Value a fresh scene starts with
    pub fn default_value(&self) -> FlagValue {
        match self {
            Self::Pulse => FlagValue::Int(0),
            _ => FlagValue::Bool(false),
        }
    }
}

/// Flag value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagValue {
    Bool(bool),
    Int(i32),
}

impl FlagValue {
    /// Truthiness (ints are true when non-zero)
    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
        }
    }

    /// Integer view (bools map to 0/1)
    pub fn as_int(&self) -> i32 {
        match *self {
            Self::Bool(b) => i32::from(b),
            Self::Int(i) => i,
        }
    }
}

/// A recorded change of one flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub key: FlagKey,
    pub old: FlagValue,
    pub new: FlagValue,
}

/// Observer handle returned by [`GameFlags::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Callback fired on change of a single flag
pub type FlagObserver = Box<dyn Fn(&FlagChange) + Send + Sync>;

/// Serializable copy of the whole bag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagSnapshot {
    pub values: BTreeMap<FlagKey, FlagValue>,
}

/// Flag bag with change notification
pub struct GameFlags {
    values: BTreeMap<FlagKey, FlagValue>,
    observers: HashMap<FlagKey, Vec<(ObserverId, FlagObserver)>>,
    next_observer: u64,
    pending: Vec<FlagChange>,
}

impl GameFlags {
    /// Create a bag with every flag at its default
    pub fn new() -> Self {
        Self {
            values: FlagKey::ALL
                .iter()
                .map(|key| (*key, key.default_value()))
                .collect(),
            observers: HashMap::new(),
            next_observer: 1,
            pending: Vec::new(),
        }
    }

    /// Raw value
    pub fn get(&self, key: FlagKey) -> FlagValue {
        self.values
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_value())
    }

    /// Boolean view of a flag
    pub fn get_bool(&self, key: FlagKey) -> bool {
        self.get(key).as_bool()
    }

    /// Integer view of a flag
    pub fn get_int(&self, key: FlagKey) -> i32 {
        self.get(key).as_int()
    }

    /// Set a boolean flag. Returns true if the value changed.
    pub fn set_bool(&mut self, key: FlagKey, value: bool) -> bool {
        self.set(key, FlagValue::Bool(value))
    }

    /// Set an integer flag. Returns true if the value changed.
    pub fn set_int(&mut self, key: FlagKey, value: i32) -> bool {
        self.set(key, FlagValue::Int(value))
    }

    /// Set any flag. Observers only hear about real changes.
    pub fn set(&mut self, key: FlagKey, value: FlagValue) -> bool {
        let old = self.get(key);
        if old == value {
            return false;
        }

        self.values.insert(key, value);
        let change = FlagChange {
            key,
            old,
            new: value,
        };
        log::debug!("Flag {:?}: {:?} -> {:?}", key, old, value);

        if let Some(observers) = self.observers.get(&key) {
            for (_, observer) in observers {
                observer(&change);
            }
        }
        self.pending.push(change);
        true
    }

    /// Register a change callback for one flag
    pub fn observe<F>(&mut self, key: FlagKey, callback: F) -> ObserverId
    where
        F: Fn(&FlagChange) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers
            .entry(key)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a change callback. Returns false if it was not registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        for observers in self.observers.values_mut() {
            if let Some(index) = observers.iter().position(|(oid, _)| *oid == id) {
                observers.remove(index);
                return true;
            }
        }
        false
    }

    /// Drain changes recorded since the last drain
    pub fn drain_changes(&mut self) -> Vec<FlagChange> {
        std::mem::take(&mut self.pending)
    }

    /// Copy every value out
    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            values: self.values.clone(),
        }
    }

    /// Restore from a snapshot. Keys missing from the snapshot reset to default.
    pub fn restore(&mut self, snapshot: &FlagSnapshot) {
        for key in FlagKey::ALL {
            let value = snapshot
                .values
                .get(&key)
                .copied()
                .unwrap_or_else(|| key.default_value());
            self.set(key, value);
        }
    }

    /// Reset every flag to its default
    pub fn reset(&mut self) {
        self.restore(&FlagSnapshot::default());
    }
}

impl Default for GameFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameFlags")
            .field("values", &self.values)
            .field("observers", &self.observers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let flags = GameFlags::new();
        assert!(!flags.get_bool(FlagKey::CanWriteNotepad));
        assert_eq!(flags.get_int(FlagKey::Pulse), 0);
    }

    #[test]
    fn test_observer_fires_only_on_change() {
        let mut flags = GameFlags::new();
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        flags.observe(FlagKey::HasCheckedPulse, move |change| {
            assert_eq!(change.key, FlagKey::HasCheckedPulse);
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(flags.set_bool(FlagKey::HasCheckedPulse, true));
        assert!(!flags.set_bool(FlagKey::HasCheckedPulse, true));
        flags.set_bool(FlagKey::CanWriteForm, true);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(flags.drain_changes().len(), 2);
        assert!(flags.drain_changes().is_empty());
    }

    #[test]
    fn test_unobserve() {
        let mut flags = GameFlags::new();
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let id = flags.observe(FlagKey::Pulse, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        flags.set_int(FlagKey::Pulse, 72);
        assert!(flags.unobserve(id));
        assert!(!flags.unobserve(id));
        flags.set_int(FlagKey::Pulse, 80);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut flags = GameFlags::new();
        flags.set_bool(FlagKey::HasGlovesOn, true);
        flags.set_int(FlagKey::Pulse, 64);
        let snapshot = flags.snapshot();

        flags.reset();
        assert!(!flags.get_bool(FlagKey::HasGlovesOn));

        flags.restore(&snapshot);
        assert!(flags.get_bool(FlagKey::HasGlovesOn));
        assert_eq!(flags.get_int(FlagKey::Pulse), 64);
    }

    #[test]
    fn test_snapshot_json() {
        let mut flags = GameFlags::new();
        flags.set_bool(FlagKey::CanWriteForm, true);
        let json = serde_json::to_string(&flags.snapshot()).unwrap();
        let back: FlagSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags.snapshot());
    }
}
