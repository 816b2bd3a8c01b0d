use std::{
    future::{poll_fn, Future},
    pin::Pin,
    task::Poll,
};

use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior, Sleep};

/// What a scheduled timer drives inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    GameClock,
    Poll,
    Cooldown,
    Celebration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    id: u64,
    kind: TimerKind,
}

impl TimerToken {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

enum Schedule {
    Every(Interval),
    Once(Pin<Box<Sleep>>),
}

struct Entry {
    token: TimerToken,
    schedule: Schedule,
}

/// Every timer a session runs, in one place, so teardown is a single
/// `cancel_all`.
///
/// Timers are polled from the owning task through [`Timers::fired`]; nothing
/// is spawned, so a cancelled timer can never fire late.
pub struct Timers {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl Timers {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Periodic timer; first fires one `period` from now. Late ticks are
    /// delayed rather than fired in a burst.
    pub fn every(&mut self, kind: TimerKind, period: Duration) -> TimerToken {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.push(kind, Schedule::Every(interval))
    }

    /// One-shot timer, removed once it fires.
    pub fn once(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        self.push(kind, Schedule::Once(Box::pin(time::sleep(delay))))
    }

    fn push(&mut self, kind: TimerKind, schedule: Schedule) -> TimerToken {
        self.next_id += 1;
        let token = TimerToken {
            id: self.next_id,
            kind,
        };
        self.entries.push(Entry { token, schedule });
        token
    }

    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.token != token);
        self.entries.len() != before
    }

    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.token.kind != kind);
        before - self.entries.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.entries.len();
        self.entries.clear();
        cancelled
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|entry| entry.token.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves with the next timer to fire. Timers due at the same instant
    /// fire in scheduling order. Pending forever while nothing is scheduled.
    pub async fn fired(&mut self) -> TimerToken {
        poll_fn(|cx| {
            for index in 0..self.entries.len() {
                let entry = &mut self.entries[index];
                let ready = match &mut entry.schedule {
                    Schedule::Every(interval) => interval.poll_tick(cx).is_ready(),
                    Schedule::Once(sleep) => sleep.as_mut().poll(cx).is_ready(),
                };

                if ready {
                    let token = entry.token;
                    if matches!(entry.schedule, Schedule::Once(_)) {
                        self.entries.remove(index);
                    }
                    return Poll::Ready(token);
                }
            }
            Poll::Pending
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn periodic_timer_fires_each_period() {
        let mut timers = Timers::new();
        let start = Instant::now();
        timers.every(TimerKind::GameClock, Duration::from_secs(1));

        for expected in 1..=3 {
            let token = timers.fired().await;
            assert_eq!(token.kind(), TimerKind::GameClock);
            assert_eq!(start.elapsed(), Duration::from_secs(expected));
        }
        assert!(timers.is_scheduled(TimerKind::GameClock));
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_is_removed_after_firing() {
        let mut timers = Timers::new();
        timers.once(TimerKind::Cooldown, Duration::from_millis(1200));
        assert!(timers.is_scheduled(TimerKind::Cooldown));

        let token = timers.fired().await;
        assert_eq!(token.kind(), TimerKind::Cooldown);
        assert!(!timers.is_scheduled(TimerKind::Cooldown));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_schedule_wins_ties() {
        let mut timers = Timers::new();
        timers.every(TimerKind::GameClock, Duration::from_secs(1));
        timers.every(TimerKind::Poll, Duration::from_millis(500));

        assert_eq!(timers.fired().await.kind(), TimerKind::Poll);
        // Both are due at one second; the clock was scheduled first.
        assert_eq!(timers.fired().await.kind(), TimerKind::GameClock);
        assert_eq!(timers.fired().await.kind(), TimerKind::Poll);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let mut timers = Timers::new();
        let poll = timers.every(TimerKind::Poll, Duration::from_millis(200));
        timers.every(TimerKind::GameClock, Duration::from_secs(1));
        timers.once(TimerKind::Cooldown, Duration::from_millis(100));

        assert!(timers.cancel(poll));
        assert!(!timers.cancel(poll));
        assert_eq!(timers.cancel_kind(TimerKind::Cooldown), 1);

        let start = Instant::now();
        assert_eq!(timers.fired().await.kind(), TimerKind::GameClock);
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        assert_eq!(timers.cancel_all(), 1);
        assert_eq!(timers.cancel_all(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_set_stays_pending() {
        let mut timers = Timers::new();
        let outcome = time::timeout(Duration::from_secs(5), timers.fired()).await;
        assert!(outcome.is_err());
    }
}
