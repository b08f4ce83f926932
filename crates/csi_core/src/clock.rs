//! Case clock
//!
//! In-world time starts at the incident anchor and advances with the
//! simulation tick. Facts written by the player are stamped in "evening"
//! time: anything earlier than the evening hour is rolled forward.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Hour of day (24h) before which case times are rolled forward
pub const DEFAULT_EVENING_HOUR: u32 = 18;

/// Roll `time` forward by whole hours so it lands at or after `evening_hour`.
///
/// Minutes and seconds are preserved.
pub fn evening_rollover(time: NaiveDateTime, evening_hour: u32) -> NaiveDateTime {
    let hour = time.hour();
    if hour < evening_hour {
        time + Duration::hours(i64::from(evening_hour - hour))
    } else {
        time
    }
}

/// Simulation clock anchored at the incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseClock {
    /// Wall time of the incident
    anchor: NaiveDateTime,
    /// Seconds simulated since the anchor
    elapsed: f64,
}

impl CaseClock {
    /// Create a clock starting at `anchor`
    pub fn new(anchor: NaiveDateTime) -> Self {
        Self {
            anchor,
            elapsed: 0.0,
        }
    }

    /// Advance by `delta_time` seconds (negative deltas are ignored)
    pub fn advance(&mut self, delta_time: f64) {
        if delta_time > 0.0 {
            self.elapsed += delta_time;
        }
    }

    /// The incident anchor
    pub fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// Seconds since the anchor
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Current in-world time
    pub fn now(&self) -> NaiveDateTime {
        self.anchor + Duration::milliseconds((self.elapsed * 1000.0) as i64)
    }

    /// Current in-world time with the evening rollover applied
    pub fn evening_now(&self, evening_hour: u32) -> NaiveDateTime {
        evening_rollover(self.now(), evening_hour)
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
    fn test_rollover_moves_afternoon_into_evening() {
        assert_eq!(evening_rollover(at(14, 25), 18), at(18, 25));
        assert_eq!(evening_rollover(at(20, 5), 18), at(20, 5));
        assert_eq!(evening_rollover(at(18, 0), 18), at(18, 0));
    }

    #[test]
    fn test_clock_advance() {
        let mut clock = CaseClock::new(at(19, 0));
        clock.advance(90.0);
        clock.advance(-5.0);
        assert_eq!(clock.now(), at(19, 1) + Duration::seconds(30));
        assert_eq!(clock.evening_now(18), clock.now());
    }
}
