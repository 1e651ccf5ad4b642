use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Mutex;

/// Issues signing timestamps that never go backwards within a process
///
/// The lookup API rejects requests whose timestamp drifts too far, and two
/// requests signed in the same process must not appear out of order even if
/// the wall clock is stepped back.
#[derive(Debug, Default)]
pub struct SigningClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SigningClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp as an ISO-8601 UTC string with millisecond
    /// precision (`2024-01-01T00:00:00.000Z`)
    pub fn timestamp(&self) -> String {
        self.next_at(Utc::now())
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn next_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_timestamp_format() {
        let clock = SigningClock::new();
        let ts = clock.timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.parse::<DateTime<Utc>>().is_ok());
    }

    #[test]
    fn test_clock_does_not_go_backwards() {
        let clock = SigningClock::new();
        let now = Utc::now();

        let first = clock.next_at(now);
        let stepped_back = clock.next_at(now - Duration::seconds(30));

        assert_eq!(first, now);
        assert_eq!(stepped_back, now);
    }

    #[test]
    fn test_clock_advances() {
        let clock = SigningClock::new();
        let now = Utc::now();

        clock.next_at(now);
        let later = clock.next_at(now + Duration::seconds(1));
        assert!(later > now);
    }
}
