use std::time::Duration;
use tokio::time::Instant;

/// Elapsed-time accounting for one recording session.
///
/// The start instant never moves. Pause intervals are kept so an event is
/// judged by when it happened, not when the consumer got to it: events
/// inside a pause are dropped, and only pauses that ended before an event
/// are subtracted from its offset.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    started_at: Instant,
    paused_since: Option<Instant>,
    pauses: Vec<(Instant, Instant)>,
}

impl RecordingClock {
    pub fn start(started_at: Instant) -> Self {
        Self {
            started_at,
            paused_since: None,
            pauses: Vec::new(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Returns false if already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused_since.is_some() {
            return false;
        }
        self.paused_since = Some(now);
        true
    }

    /// Returns false if not paused.
    pub fn resume(&mut self, now: Instant) -> bool {
        match self.paused_since.take() {
            Some(since) => {
                self.pauses.push((since, now.max(since)));
                true
            }
            None => false,
        }
    }

    /// Active recording time at `at`, or `None` if `at` falls inside a pause.
    pub fn offset_of(&self, at: Instant) -> Option<Duration> {
        if self.paused_since.is_some_and(|since| at >= since) {
            return None;
        }
        let mut paused_before = Duration::ZERO;
        for (from, to) in &self.pauses {
            if at >= *from && at < *to {
                return None;
            }
            if *to <= at {
                paused_before += *to - *from;
            }
        }
        Some(
            at.saturating_duration_since(self.started_at)
                .saturating_sub(paused_before),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_without_pause() {
        let start = Instant::now();
        let clock = RecordingClock::start(start);
        assert_eq!(
            clock.offset_of(start + Duration::from_millis(750)),
            Some(Duration::from_millis(750))
        );
    }

    #[test]
    fn test_events_during_pause_are_dropped() {
        let start = Instant::now();
        let mut clock = RecordingClock::start(start);
        assert!(clock.pause(start + Duration::from_secs(1)));
        assert!(!clock.pause(start + Duration::from_secs(2)));

        assert!(clock.is_paused());
        assert_eq!(clock.offset_of(start + Duration::from_millis(1500)), None);
        // captured before the pause, delivered late
        assert_eq!(
            clock.offset_of(start + Duration::from_millis(900)),
            Some(Duration::from_millis(900))
        );
    }

    #[test]
    fn test_paused_time_excluded_after_resume() {
        let start = Instant::now();
        let mut clock = RecordingClock::start(start);
        clock.pause(start + Duration::from_secs(1));
        assert!(clock.resume(start + Duration::from_secs(4)));
        assert!(!clock.resume(start + Duration::from_secs(5)));

        assert_eq!(clock.started_at(), start);
        assert_eq!(
            clock.offset_of(start + Duration::from_millis(4500)),
            Some(Duration::from_millis(1500))
        );
        // happened during the pause but processed after resume
        assert_eq!(clock.offset_of(start + Duration::from_secs(2)), None);
    }
}
