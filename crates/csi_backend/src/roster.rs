//! Classes and unlocked content

use crate::error::{BackendError, BackendResult};
use crate::store::DocumentStore;
use csi_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const CLASSES: &str = "classes";
const USERS: &str = "users";

/// A class document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    /// Content keys unlocked for enrolled students (role keys among them)
    pub unlocked: Vec<String>,
    pub students: Vec<String>,
}

/// A user document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub classes: Vec<String>,
}

/// Class enrollment over the document store
pub struct ClassRoster {
    store: Arc<dyn DocumentStore>,
}

impl ClassRoster {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create or replace a class
    pub fn create_class(&self, class_id: &str, name: &str, unlocked: &[&str]) -> BackendResult<()> {
        let record = ClassRecord {
            name: name.to_string(),
            unlocked: unlocked.iter().map(|s| s.to_string()).collect(),
            students: Vec::new(),
        };
        self.store.put_as(CLASSES, class_id, &record)?;
        log::info!("Created class {} ({})", class_id, name);
        Ok(())
    }

    /// Fetch a class
    pub fn class(&self, class_id: &str) -> BackendResult<ClassRecord> {
        self.store
            .get_as(CLASSES, class_id)?
            .ok_or_else(|| BackendError::NotFound {
                collection: CLASSES.to_string(),
                id: class_id.to_string(),
            })
    }

    /// Enroll a user in a class (idempotent)
    pub fn enroll(&self, class_id: &str, user_id: &str) -> BackendResult<()> {
        let mut class = self.class(class_id)?;
        if !class.students.iter().any(|s| s == user_id) {
            class.students.push(user_id.to_string());
            self.store.put_as(CLASSES, class_id, &class)?;
        }

        let mut user: UserRecord = self.store.get_as(USERS, user_id)?.unwrap_or_default();
        if !user.classes.iter().any(|c| c == class_id) {
            user.classes.push(class_id.to_string());
            self.store.put_as(USERS, user_id, &user)?;
        }
        log::info!("Enrolled {} in {}", user_id, class_id);
        Ok(())
    }

    /// Union of the unlock lists of every class the user is in
    pub fn unlocked_content(&self, user_id: &str) -> BackendResult<BTreeSet<String>> {
        let user: UserRecord = self.store.get_as(USERS, user_id)?.unwrap_or_default();
        let mut unlocked = BTreeSet::new();
        for class_id in &user.classes {
            match self.class(class_id) {
                Ok(class) => unlocked.extend(class.unlocked),
                Err(BackendError::NotFound { .. }) => {
                    log::warn!("{} is enrolled in missing class {}", user_id, class_id)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(unlocked)
    }

    /// Roles the user may pick. Every role when the store is unreachable.
    pub fn unlocked_roles(&self, user_id: &str) -> Vec<Role> {
        match self.unlocked_content(user_id) {
            Ok(content) => Role::selectable()
                .into_iter()
                .filter(|role| content.contains(role.key()))
                .collect(),
            Err(e) => {
                log::warn!("Cannot load unlocks for {} ({}), unlocking every role", user_id, e);
                Role::selectable().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn roster() -> (MemoryStore, ClassRoster) {
        let store = MemoryStore::new();
        let roster = ClassRoster::new(Arc::new(store.clone()));
        (store, roster)
    }

    #[test]
    fn test_unlocks_are_union_of_classes() {
        let (_, roster) = roster();
        roster
            .create_class("c1", "Intro", &["first_responder", "photographer"])
            .unwrap();
        roster
            .create_class("c2", "Prints", &["fingerprint_specialist", "photographer"])
            .unwrap();
        roster.enroll("c1", "u1").unwrap();
        roster.enroll("c2", "u1").unwrap();
        roster.enroll("c2", "u1").unwrap();

        assert_eq!(roster.class("c2").unwrap().students, vec!["u1".to_string()]);
        assert_eq!(
            roster.unlocked_roles("u1"),
            vec![Role::FirstResponder, Role::Photographer, Role::FingerprintSpecialist]
        );
        assert!(roster.unlocked_roles("nobody").is_empty());
    }

    #[test]
    fn test_enroll_unknown_class() {
        let (_, roster) = roster();
        assert!(matches!(roster.enroll("missing", "u1"), Err(BackendError::NotFound { .. })));
    }

    #[test]
    fn test_offline_unlocks_everything() {
        let (store, roster) = roster();
        store.set_available(false);
        assert_eq!(roster.unlocked_roles("u1").len(), 10);
    }
}
