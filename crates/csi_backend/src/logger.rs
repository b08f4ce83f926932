//! Batched event logger
//!
//! Entries queue in a capacity-capped FIFO. Every `flush_interval` seconds a
//! batch of up to `batch_size` entries is appended to the user's log. A failed
//! batch is retried every `retry_interval` seconds, at most `max_retries`
//! times, then dropped.

use crate::auth::UserProfile;
use crate::store::DocumentStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

const LOGS: &str = "logs";

/// Logger tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub batch_size: usize,
    /// Seconds between batches
    pub flush_interval: f32,
    /// Seconds between retries of a failed batch
    pub retry_interval: f32,
    pub max_retries: u32,
    /// Queued entries kept at most; the oldest go first
    pub capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            flush_interval: 5.0,
            retry_interval: 2.0,
            max_retries: 3,
            capacity: 500,
        }
    }
}

/// One logged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: NaiveDateTime,
    pub category: String,
    pub message: String,
}

struct Batch {
    entries: Vec<LogEntry>,
    /// Failed attempts so far
    failures: u32,
}

/// Event logger
pub struct EventLogger {
    store: Arc<dyn DocumentStore>,
    config: LoggerConfig,
    user: Option<UserProfile>,
    queue: VecDeque<LogEntry>,
    in_flight: Option<Batch>,
    flush_timer: f32,
    retry_timer: f32,
    sent: usize,
    dropped: usize,
}

impl EventLogger {
    pub fn new(store: Arc<dyn DocumentStore>, config: LoggerConfig) -> Self {
        let flush_timer = config.flush_interval;
        Self {
            store,
            config,
            user: None,
            queue: VecDeque::new(),
            in_flight: None,
            flush_timer,
            retry_timer: 0.0,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Set who the entries belong to
    pub fn set_user(&mut self, user: Option<UserProfile>) {
        self.user = user;
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    fn enabled(&self) -> bool {
        self.user.as_ref().map_or(false, |u| !u.guest)
    }

    /// Queue an entry. Guests and signed-out sessions log nothing.
    pub fn log(&mut self, at: NaiveDateTime, category: &str, message: impl Into<String>) {
        if !self.enabled() {
            return;
        }
        if self.queue.len() >= self.config.capacity {
            self.queue.pop_front();
            self.dropped += 1;
            log::warn!("Event log full, dropped oldest entry");
        }
        self.queue.push_back(LogEntry {
            at,
            category: category.to_string(),
            message: message.into(),
        });
    }

    /// Advance timers; sends or retries a batch when due
    pub fn tick(&mut self, dt: f32) {
        if self.in_flight.is_some() {
            self.retry_timer -= dt;
            if self.retry_timer <= 0.0 {
                self.send();
            }
            return;
        }

        self.flush_timer -= dt;
        if self.flush_timer <= 0.0 {
            self.flush_timer = self.config.flush_interval;
            self.start_batch();
        }
    }

    /// Send a batch now, ignoring the timers
    pub fn flush(&mut self) {
        if self.in_flight.is_none() {
            self.start_batch();
        } else {
            self.send();
        }
    }

    fn start_batch(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let count = self.queue.len().min(self.config.batch_size);
        self.in_flight = Some(Batch {
            entries: self.queue.drain(..count).collect(),
            failures: 0,
        });
        self.send();
    }

    fn send(&mut self) {
        let Some(mut batch) = self.in_flight.take() else {
            return;
        };
        let Some(user) = self.user.as_ref() else {
            self.dropped += batch.entries.len();
            return;
        };

        let documents: Vec<_> = batch
            .entries
            .iter()
            .filter_map(|entry| serde_json::to_value(entry).ok())
            .collect();

        match self.store.append(LOGS, &user.id, &documents) {
            Ok(_) => {
                log::debug!("Sent {} log entries", batch.entries.len());
                self.sent += batch.entries.len();
            }
            Err(e) => {
                batch.failures += 1;
                if batch.failures > self.config.max_retries {
                    log::error!(
                        "Dropping {} log entries after {} attempts: {}",
                        batch.entries.len(),
                        batch.failures,
                        e
                    );
                    self.dropped += batch.entries.len();
                } else {
                    log::warn!("Log upload failed ({}), retrying in {}s", e, self.config.retry_interval);
                    self.retry_timer = self.config.retry_interval;
                    self.in_flight = Some(batch);
                }
            }
        }
    }

    /// Entries waiting, including a batch awaiting retry
    pub fn pending(&self) -> usize {
        self.queue.len() + self.in_flight.as_ref().map_or(0, |b| b.entries.len())
    }

    /// Entries stored successfully
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Entries lost to capacity or exhausted retries
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Check if a failed batch is waiting to be retried
    pub fn is_retrying(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .and_then(|d| d.and_hms_opt(20, 0, 0))
            .unwrap()
    }

    fn user() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            display_name: "Trainee".to_string(),
            verified: true,
            guest: false,
        }
    }

    fn logger(store: &MemoryStore, config: LoggerConfig) -> EventLogger {
        let mut logger = EventLogger::new(Arc::new(store.clone()), config);
        logger.set_user(Some(user()));
        logger
    }

    #[test]
    fn test_batches_on_interval() {
        let store = MemoryStore::new();
        let config = LoggerConfig {
            batch_size: 2,
            flush_interval: 1.0,
            ..LoggerConfig::default()
        };
        let mut logger = logger(&store, config);
        for i in 0..3 {
            logger.log(at(), "test", format!("entry {}", i));
        }

        logger.tick(0.5);
        assert!(store.log("logs", "u1").is_empty());
        logger.tick(0.5);
        assert_eq!(store.log("logs", "u1").len(), 2);
        logger.tick(1.0);
        assert_eq!(store.log("logs", "u1").len(), 3);
        assert_eq!(logger.sent(), 3);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_retries_then_succeeds() {
        let store = MemoryStore::new();
        let mut logger = logger(&store, LoggerConfig::default());
        logger.log(at(), "test", "hello");

        store.fail_next(2);
        logger.flush();
        assert!(logger.is_retrying());
        logger.tick(2.0);
        assert!(logger.is_retrying());
        logger.tick(2.0);
        assert!(!logger.is_retrying());
        assert_eq!(store.log("logs", "u1").len(), 1);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let store = MemoryStore::new();
        let config = LoggerConfig {
            max_retries: 2,
            ..LoggerConfig::default()
        };
        let mut logger = logger(&store, config);
        logger.log(at(), "test", "lost");

        store.set_available(false);
        logger.flush();
        logger.tick(2.0);
        logger.tick(2.0);
        assert!(!logger.is_retrying());
        assert_eq!(logger.dropped(), 1);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_guest_skips_logging() {
        let store = MemoryStore::new();
        let mut logger = EventLogger::new(Arc::new(store.clone()), LoggerConfig::default());
        logger.set_user(Some(UserProfile::guest()));
        logger.log(at(), "test", "ignored");
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let store = MemoryStore::new();
        let config = LoggerConfig {
            capacity: 2,
            ..LoggerConfig::default()
        };
        let mut logger = logger(&store, config);
        for i in 0..3 {
            logger.log(at(), "test", format!("{}", i));
        }
        assert_eq!(logger.pending(), 2);
        assert_eq!(logger.dropped(), 1);

        logger.flush();
        let sent = store.log("logs", "u1");
        assert_eq!(sent[0]["message"], "1");
    }
}
