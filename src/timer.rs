//! Countdown timers
//!
//! A [`Countdown`] counts down whole seconds by scheduling one tick alarm
//! per second through the injected scheduler. Each start bumps the timer's
//! generation and every tick alarm carries the generation it was scheduled
//! under, so ticks from a stopped or restarted countdown are recognised as
//! stale and dropped. Restarting a running countdown therefore stops the
//! previous one implicitly. Ticks also carry the owner the countdown was
//! created for (the clue attempt or final round), so a fresh countdown never
//! accepts ticks left over from an earlier one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Logical clock a countdown belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    /// Per-clue buzz/answer window
    Response,
    /// Final-round answer window
    Final,
}

/// Alarm messages delivered back to the countdown once per second
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One second has elapsed on a countdown
    Tick {
        /// Clock the tick belongs to
        clock: Clock,
        /// Attempt that owns the countdown
        owner: u64,
        /// Generation of the countdown that scheduled the tick
        generation: u64,
    },
}

/// Result of delivering a tick to a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The tick belongs to a stopped or superseded countdown
    Stale,
    /// The countdown is still running with this many seconds left
    Remaining(u32),
    /// The countdown reached zero and stopped itself
    Expired,
}

/// One-second-resolution countdown on a single logical clock
#[derive(Debug, Clone)]
pub struct Countdown {
    clock: Clock,
    owner: u64,
    generation: u64,
    total: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    /// Creates a stopped countdown on the given clock for `owner`
    pub fn new(clock: Clock, owner: u64) -> Self {
        Self {
            clock,
            owner,
            generation: 0,
            total: 0,
            remaining: 0,
            running: false,
        }
    }

    /// Starts counting down from `seconds`, superseding any running countdown
    pub fn start<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        seconds: u32,
        schedule_message: &mut S,
    ) {
        self.generation += 1;
        self.total = seconds;
        self.remaining = seconds;
        self.running = true;
        self.schedule_tick(schedule_message);
    }

    /// Stops the countdown; safe to call when it is not running
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.generation += 1;
        }
    }

    /// Delivers a tick alarm to the countdown
    ///
    /// On [`Tick::Remaining`] the next tick is already scheduled. On
    /// [`Tick::Expired`] the countdown has stopped and will not expire again.
    pub fn receive_tick<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        alarm: &AlarmMessage,
        schedule_message: &mut S,
    ) -> Tick {
        let AlarmMessage::Tick {
            clock,
            owner,
            generation,
        } = *alarm;
        if !self.running
            || clock != self.clock
            || owner != self.owner
            || generation != self.generation
        {
            return Tick::Stale;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop();
            Tick::Expired
        } else {
            self.schedule_tick(schedule_message);
            Tick::Remaining(self.remaining)
        }
    }

    fn schedule_tick<S: FnMut(crate::AlarmMessage, Duration)>(&self, schedule_message: &mut S) {
        schedule_message(
            AlarmMessage::Tick {
                clock: self.clock,
                owner: self.owner,
                generation: self.generation,
            }
            .into(),
            Duration::from_secs(1),
        );
    }

    /// Seconds left on the countdown
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Seconds the countdown was started with
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether the countdown is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::Scheduler;

    fn tick_of(message: crate::AlarmMessage) -> AlarmMessage {
        match message {
            crate::AlarmMessage::Timer(tick) => tick,
            other => panic!("unexpected alarm {other:?}"),
        }
    }

    #[test]
    fn test_counts_down_and_expires_once() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.schedule_fn();
        let mut countdown = Countdown::new(Clock::Response, 1);

        countdown.start(3, &mut schedule);
        assert!(countdown.is_running());
        assert_eq!(countdown.total(), 3);

        let mut outcomes = Vec::new();
        while let Some((alarm, delay)) = scheduler.pop() {
            assert_eq!(delay, Duration::from_secs(1));
            outcomes.push(countdown.receive_tick(&tick_of(alarm), &mut schedule));
        }

        assert_eq!(
            outcomes,
            vec![Tick::Remaining(2), Tick::Remaining(1), Tick::Expired]
        );
        assert!(!countdown.is_running());
        assert_eq!(scheduler.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_stop_makes_pending_tick_stale() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.schedule_fn();
        let mut countdown = Countdown::new(Clock::Final, 1);

        countdown.start(30, &mut schedule);
        countdown.stop();
        countdown.stop();

        let (alarm, _) = scheduler.pop().unwrap();
        assert_eq!(
            countdown.receive_tick(&tick_of(alarm), &mut schedule),
            Tick::Stale
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_restart_supersedes_previous_countdown() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.schedule_fn();
        let mut countdown = Countdown::new(Clock::Response, 1);

        countdown.start(10, &mut schedule);
        countdown.start(5, &mut schedule);

        let (old, _) = scheduler.pop().unwrap();
        let (new, _) = scheduler.pop().unwrap();

        assert_eq!(
            countdown.receive_tick(&tick_of(old), &mut schedule),
            Tick::Stale
        );
        assert_eq!(
            countdown.receive_tick(&tick_of(new), &mut schedule),
            Tick::Remaining(4)
        );
    }

    #[test]
    fn test_tick_for_other_clock_is_stale() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.schedule_fn();
        let mut countdown = Countdown::new(Clock::Response, 1);

        countdown.start(10, &mut schedule);
        let (alarm, _) = scheduler.pop().unwrap();
        let AlarmMessage::Tick {
            owner, generation, ..
        } = tick_of(alarm);
        let foreign = AlarmMessage::Tick {
            clock: Clock::Final,
            owner,
            generation,
        };
        assert_eq!(countdown.receive_tick(&foreign, &mut schedule), Tick::Stale);
        assert_eq!(countdown.remaining(), 10);
    }

    #[test]
    fn test_tick_from_previous_owner_is_stale() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.schedule_fn();

        let mut first = Countdown::new(Clock::Response, 1);
        first.start(10, &mut schedule);
        let (leftover, _) = scheduler.pop().unwrap();

        let mut second = Countdown::new(Clock::Response, 2);
        second.start(10, &mut schedule);
        assert_eq!(
            second.receive_tick(&tick_of(leftover), &mut schedule),
            Tick::Stale
        );
        assert_eq!(second.remaining(), 10);
    }
}
