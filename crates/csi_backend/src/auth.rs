//! Sign-in

use crate::error::{BackendError, BackendResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who is playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    /// Account verified by the provider
    pub verified: bool,
    /// Offline fallback profile; nothing is logged for guests
    pub guest: bool,
}

impl UserProfile {
    /// Fallback profile used when sign-in fails
    pub fn guest() -> Self {
        Self {
            id: "guest".to_string(),
            display_name: "Guest".to_string(),
            verified: false,
            guest: true,
        }
    }
}

/// Identity provider
pub trait AuthProvider {
    /// Verify credentials
    fn sign_in(&self, user_id: &str, secret: &str) -> BackendResult<UserProfile>;
}

/// Sign in, or fall back to the guest profile
pub fn sign_in_or_guest(provider: &dyn AuthProvider, user_id: &str, secret: &str) -> UserProfile {
    match provider.sign_in(user_id, secret) {
        Ok(profile) => {
            log::info!("Signed in as {}", profile.display_name);
            profile
        }
        Err(e) => {
            log::warn!("Sign-in failed ({}), continuing as guest", e);
            UserProfile::guest()
        }
    }
}

/// Provider over a fixed account table
pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, (String, UserProfile)>>,
    available: bool,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            available: true,
        }
    }

    /// Provider that is never reachable
    pub fn offline() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            available: false,
        }
    }

    /// Register an account
    pub fn register(&self, user_id: &str, secret: &str, display_name: &str, verified: bool) {
        let profile = UserProfile {
            id: user_id.to_string(),
            display_name: display_name.to_string(),
            verified,
            guest: false,
        };
        self.accounts
            .write()
            .insert(user_id.to_string(), (secret.to_string(), profile));
    }
}

impl AuthProvider for MemoryAuth {
    fn sign_in(&self, user_id: &str, secret: &str) -> BackendResult<UserProfile> {
        if !self.available {
            return Err(BackendError::Unavailable);
        }
        match self.accounts.read().get(user_id) {
            Some((stored, profile)) if stored == secret => Ok(profile.clone()),
            _ => Err(BackendError::InvalidCredentials(user_id.to_string())),
        }
    }
}
