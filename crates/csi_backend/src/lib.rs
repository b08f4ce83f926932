//! CSI Backend - Accounts, Classes and Event Logs
//!
//! Everything here talks to a document store through the [`DocumentStore`]
//! seam. When the store is unreachable the callers degrade: sign-in falls
//! back to a guest, unlocks fall back to every role, logging is skipped or
//! retried later.
//!
//! # Features
//!
//! - Document store trait with an in-memory implementation
//! - Sign-in with guest fallback
//! - Class roster with per-class unlocked content
//! - Batched event logger with bounded retries
//!
//! # Example
//!
//! ```ignore
//! use csi_backend::prelude::*;
//!
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let user = sign_in_or_guest(&MemoryAuth::new(), "trainee-7", "secret");
//!
//! let mut logger = EventLogger::new(store.clone(), LoggerConfig::default());
//! logger.set_user(Some(user));
//! logger.log(now, "role_changed", "First Responder");
//! logger.tick(dt);
//! ```

pub mod auth;
pub mod error;
pub mod logger;
pub mod roster;
pub mod store;

pub mod prelude {
    pub use crate::auth::{sign_in_or_guest, AuthProvider, MemoryAuth, UserProfile};
    pub use crate::error::{BackendError, BackendResult};
    pub use crate::logger::{EventLogger, LogEntry, LoggerConfig};
    pub use crate::roster::{ClassRecord, ClassRoster, UserRecord};
    pub use crate::store::{DocumentStore, MemoryStore};
    pub use std::sync::Arc;
}

pub use prelude::*;
