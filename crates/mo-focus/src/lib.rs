//! Deep-work countdown timer for MasteryOS.
//!
//! A [`FocusTimer`] owns at most one scheduled countdown task. Starting again
//! cancels the previous task first, and pausing, resetting, or dropping the
//! timer cancels it as well. Every task carries a generation number that is
//! checked under the shared lock before each tick, so a tick racing a cancel
//! is discarded instead of being delivered late.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Length of one focus session in seconds.
pub const FOCUS_SESSION_SECS: u32 = 25 * 60;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Events emitted by a running countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusEvent {
    /// One second elapsed.
    Tick {
        /// Seconds left in the session.
        remaining: u32,
    },
    /// The session reached zero; the countdown has reset and stopped.
    Completed,
}

#[derive(Debug)]
struct Countdown {
    generation: u64,
    remaining: u32,
    running: bool,
}

/// Cancellable 25-minute countdown.
#[derive(Debug)]
pub struct FocusTimer {
    runtime: Handle,
    countdown: Arc<Mutex<Countdown>>,
    task: Option<JoinHandle<()>>,
    events: UnboundedSender<FocusEvent>,
    period: Duration,
}

impl FocusTimer {
    /// Create a stopped timer and the receiver its events arrive on.
    pub fn new(runtime: Handle) -> (Self, UnboundedReceiver<FocusEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let timer = Self {
            runtime,
            countdown: Arc::new(Mutex::new(Countdown {
                generation: 0,
                remaining: FOCUS_SESSION_SECS,
                running: false,
            })),
            task: None,
            events,
            period: TICK_PERIOD,
        };
        (timer, receiver)
    }

    /// Override the tick period. Session length stays at [`FOCUS_SESSION_SECS`] ticks.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Start or resume the countdown, cancelling any task already scheduled.
    pub fn start(&mut self) {
        self.cancel();
        let generation = {
            let mut countdown = self.lock();
            countdown.generation += 1;
            countdown.running = true;
            if countdown.remaining == 0 {
                countdown.remaining = FOCUS_SESSION_SECS;
            }
            debug!(
                "event=focus_start generation={} remaining={}",
                countdown.generation, countdown.remaining
            );
            countdown.generation
        };
        let task = run_countdown(
            Arc::clone(&self.countdown),
            generation,
            self.period,
            self.events.clone(),
        );
        self.task = Some(self.runtime.spawn(task));
    }

    /// Stop ticking and keep the remaining time.
    pub fn pause(&mut self) {
        self.cancel();
    }

    /// Stop ticking and restore a full session.
    pub fn reset(&mut self) {
        self.cancel();
        self.lock().remaining = FOCUS_SESSION_SECS;
    }

    /// Pause when running, start otherwise.
    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Whether a countdown is active.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Seconds left in the current session.
    pub fn remaining_secs(&self) -> u32 {
        self.lock().remaining
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_clock(self.remaining_secs())
    }

    fn cancel(&mut self) {
        {
            let mut countdown = self.lock();
            countdown.generation += 1;
            countdown.running = false;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FocusTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Format seconds as `MM:SS`.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

async fn run_countdown(
    countdown: Arc<Mutex<Countdown>>,
    generation: u64,
    period: Duration,
    events: UnboundedSender<FocusEvent>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let mut state = countdown.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            return;
        }
        state.remaining = state.remaining.saturating_sub(1);
        let event = if state.remaining == 0 {
            state.remaining = FOCUS_SESSION_SECS;
            state.running = false;
            state.generation += 1;
            info!("event=focus_complete generation={generation}");
            FocusEvent::Completed
        } else {
            FocusEvent::Tick {
                remaining: state.remaining,
            }
        };
        // Sent while holding the lock so a concurrent cancel sees either the
        // whole tick or none of it.
        if events.send(event).is_err() || event == FocusEvent::Completed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(FOCUS_SESSION_SECS), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_a_full_session() {
        let (mut timer, mut events) = FocusTimer::new(Handle::current());
        timer.start();
        assert!(timer.is_running());

        let mut ticks = 0;
        loop {
            match events.recv().await.expect("event") {
                FocusEvent::Tick { .. } => ticks += 1,
                FocusEvent::Completed => break,
            }
        }
        assert_eq!(ticks, FOCUS_SESSION_SECS - 1);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_secs(), FOCUS_SESSION_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_and_keeps_time() {
        let (mut timer, mut events) = FocusTimer::new(Handle::current());
        timer.start();
        assert_eq!(
            events.recv().await,
            Some(FocusEvent::Tick {
                remaining: FOCUS_SESSION_SECS - 1
            })
        );
        timer.pause();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(timer.remaining_secs(), FOCUS_SESSION_SECS - 1);

        timer.start();
        assert_eq!(
            events.recv().await,
            Some(FocusEvent::Tick {
                remaining: FOCUS_SESSION_SECS - 2
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_pending_ticks() {
        let (mut timer, mut events) = FocusTimer::new(Handle::current());
        timer.start();
        events.recv().await.expect("first tick");
        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.display(), "25:00");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_keeps_a_single_countdown() {
        let (mut timer, mut events) = FocusTimer::new(Handle::current());
        timer.start();
        timer.start();
        timer.start();
        assert_eq!(
            events.recv().await,
            Some(FocusEvent::Tick {
                remaining: FOCUS_SESSION_SECS - 1
            })
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_period_spaces_ticks() {
        let (timer, mut events) = FocusTimer::new(Handle::current());
        let mut timer = timer.with_period(Duration::from_millis(10));
        timer.start();
        tokio::time::sleep(Duration::from_millis(35)).await;

        let mut remaining = Vec::new();
        while let Ok(FocusEvent::Tick { remaining: left }) = events.try_recv() {
            remaining.push(left);
        }
        assert_eq!(
            remaining,
            vec![
                FOCUS_SESSION_SECS - 1,
                FOCUS_SESSION_SECS - 2,
                FOCUS_SESSION_SECS - 3
            ]
        );
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let (mut timer, mut events) = FocusTimer::new(Handle::current());
        timer.start();
        drop(timer);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(events.recv().await, None);
    }
}
