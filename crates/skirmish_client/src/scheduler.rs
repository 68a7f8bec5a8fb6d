//! Periodic timers that run independently of the frame loop.
//!
//! A session polls [`Scheduler::due`] whenever it gets control, whether from
//! a rendered frame or a wall-clock wakeup, so timers keep firing while
//! frames are throttled. Each timer fires at most once per poll.

use skirmish_core::config::GameConfig;

/// A periodic job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Advance the simulation while frames are not being rendered.
    BackgroundTick,
    /// Retry pending remote actions. Armed only while any are waiting.
    PendingRetry,
    /// Broadcast local unit positions.
    PositionSync,
}

impl TimerTask {
    const ALL: [Self; 3] = [Self::BackgroundTick, Self::PendingRetry, Self::PositionSync];

    const fn index(self) -> usize {
        match self {
            Self::BackgroundTick => 0,
            Self::PendingRetry => 1,
            Self::PositionSync => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    period_ms: u64,
    next_due_ms: Option<u64>,
}

/// The session's timers.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timers: [Timer; 3],
    running: bool,
}

impl Scheduler {
    /// Timers with the periods from `config`, all disarmed.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        let timer = |period_ms: u64| Timer {
            period_ms: period_ms.max(1),
            next_due_ms: None,
        };
        Self {
            timers: [
                timer(config.background_tick_ms),
                timer(config.retry_tick_ms),
                timer(config.position_sync_ms),
            ],
            running: false,
        }
    }

    /// Start the scheduler and arm `tasks`.
    pub fn start(&mut self, now_ms: u64, tasks: &[TimerTask]) {
        self.running = true;
        for &task in tasks {
            self.arm(task, now_ms);
        }
        tracing::debug!(?tasks, "Timers started");
    }

    /// Disarm everything. Later polls return nothing until restarted.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("Timers stopped");
        }
        self.running = false;
        for timer in &mut self.timers {
            timer.next_due_ms = None;
        }
    }

    /// Whether the scheduler has been started and not stopped.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Arm `task` to fire one period from now. No-op if already armed or
    /// the scheduler is stopped.
    pub fn arm(&mut self, task: TimerTask, now_ms: u64) {
        if !self.running {
            return;
        }
        let timer = &mut self.timers[task.index()];
        if timer.next_due_ms.is_none() {
            timer.next_due_ms = Some(now_ms + timer.period_ms);
        }
    }

    /// Disarm `task`.
    pub fn disarm(&mut self, task: TimerTask) {
        self.timers[task.index()].next_due_ms = None;
    }

    /// Whether `task` is armed.
    #[must_use]
    pub fn is_armed(&self, task: TimerTask) -> bool {
        self.timers[task.index()].next_due_ms.is_some()
    }

    /// Period of `task`.
    #[must_use]
    pub fn period_ms(&self, task: TimerTask) -> u64 {
        self.timers[task.index()].period_ms
    }

    /// Earliest time any armed timer fires.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().filter_map(|t| t.next_due_ms).min()
    }

    /// Tasks due at `now_ms`, each rescheduled one period after now.
    pub fn due(&mut self, now_ms: u64) -> Vec<TimerTask> {
        if !self.running {
            return Vec::new();
        }
        let mut fired = Vec::new();
        for task in TimerTask::ALL {
            let timer = &mut self.timers[task.index()];
            if let Some(next) = timer.next_due_ms {
                if next <= now_ms {
                    timer.next_due_ms = Some(now_ms + timer.period_ms);
                    fired.push(task);
                }
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        Scheduler::new(&GameConfig::default())
    }

    #[test]
    fn test_timers_fire_on_their_period() {
        let mut scheduler = scheduler();
        scheduler.start(0, &[TimerTask::BackgroundTick, TimerTask::PositionSync]);

        assert!(scheduler.due(49).is_empty());
        assert_eq!(scheduler.due(50), vec![TimerTask::BackgroundTick]);
        assert_eq!(scheduler.next_deadline(), Some(100));

        let fired = scheduler.due(1_000);
        assert!(fired.contains(&TimerTask::BackgroundTick));
        assert!(fired.contains(&TimerTask::PositionSync));
        assert!(!fired.contains(&TimerTask::PendingRetry));
    }

    #[test]
    fn test_long_gap_fires_once() {
        let mut scheduler = scheduler();
        scheduler.start(0, &[TimerTask::BackgroundTick]);
        assert_eq!(scheduler.due(5_000).len(), 1);
        assert!(scheduler.due(5_010).is_empty());
    }

    #[test]
    fn test_arm_is_idempotent() {
        let mut scheduler = scheduler();
        scheduler.start(0, &[]);
        scheduler.arm(TimerTask::PendingRetry, 0);
        scheduler.arm(TimerTask::PendingRetry, 40);
        assert_eq!(scheduler.due(50), vec![TimerTask::PendingRetry]);

        scheduler.disarm(TimerTask::PendingRetry);
        assert!(!scheduler.is_armed(TimerTask::PendingRetry));
        assert!(scheduler.due(500).is_empty());
    }

    #[test]
    fn test_stopped_scheduler_is_silent() {
        let mut scheduler = scheduler();
        scheduler.start(0, &[TimerTask::BackgroundTick]);
        scheduler.stop();
        scheduler.arm(TimerTask::PendingRetry, 0);
        assert!(!scheduler.is_running());
        assert!(scheduler.due(10_000).is_empty());
        assert_eq!(scheduler.next_deadline(), None);
    }
}
