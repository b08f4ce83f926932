//! Identifiers for items, scene objects and avatars

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Get the raw value
            #[inline]
            pub const fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Handle to an interactive item (pen, tape roll, marker...)
    ItemId,
    "item#"
);
define_id!(
    /// Handle to a static object in the scene (fingerprint, evidence, victim)
    SceneObjectId,
    "obj#"
);
define_id!(
    /// Handle to an instantiated role avatar
    AvatarId,
    "avatar#"
);

/// Monotonic id source, starting at 1 so 0 never names a live object
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU32,
}

impl IdGenerator {
    /// Create a new generator
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Next raw value
    pub fn next_raw(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Make sure future ids are greater than `raw` (after restoring a snapshot)
    pub fn reserve_past(&self, raw: u32) {
        self.next.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator() {
        let gen = IdGenerator::new();
        let a = ItemId(gen.next_raw());
        let b = ItemId(gen.next_raw());
        assert_ne!(a, b);
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
    }

    #[test]
    fn test_reserve_past() {
        let gen = IdGenerator::new();
        gen.reserve_past(41);
        assert_eq!(gen.next_raw(), 42);

        // Never moves backwards
        gen.reserve_past(3);
        assert_eq!(gen.next_raw(), 43);
    }

    #[test]
    fn test_display() {
        assert_eq!(ItemId(7).to_string(), "item#7");
        assert_eq!(SceneObjectId(3).to_string(), "obj#3");
    }
}
