//! Session identifiers and the wall clock used to correlate events.
//!
//! Every timestamp recorded by the turn tracker and the audio locator comes
//! from `now_secs`, so all timing arithmetic shares one epoch.

use chrono::Utc;

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Generate a session id from the start time plus a random suffix.
///
/// Uniqueness is a requirement on the system, not a guarantee of this
/// scheme; the random component makes collisions between sessions started
/// in the same second unlikely.
pub fn new_session_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_carry_timestamp_and_suffix() {
        let id = new_session_id();
        let (secs, suffix) = id.split_once('-').expect("id should contain a dash");
        assert!(secs.parse::<i64>().is_ok(), "prefix should be epoch seconds");
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn now_secs_is_monotonic_enough() {
        let a = now_secs();
        let b = now_secs();
        assert!(b >= a);
        assert!(a > 1_600_000_000.0, "should be a plausible epoch time");
    }
}
