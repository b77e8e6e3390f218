//! The one periodic job: recompute the dashboard snapshot and publish it.
//! The HTTP server's `/status` reads the latest published snapshot.

use crate::schedule::{DashboardSnapshot, Timetable};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

pub const DEFAULT_TICK: Duration = Duration::from_secs(10);

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Owns at most one refresh task. Starting again replaces the running task,
/// so there is never more than one timer.
pub struct StatusTicker {
    timetable: Arc<Timetable>,
    sender: Arc<watch::Sender<DashboardSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl StatusTicker {
    pub fn new(timetable: Timetable, now: NaiveDateTime) -> Self {
        let initial = timetable.snapshot(now);
        let (sender, _) = watch::channel(initial);
        Self {
            timetable: Arc::new(timetable),
            sender: Arc::new(sender),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> DashboardSnapshot {
        self.sender.borrow().clone()
    }

    /// Recompute immediately, outside the periodic schedule.
    pub fn refresh(&self, now: NaiveDateTime) -> DashboardSnapshot {
        let snapshot = self.timetable.snapshot(now);
        self.sender.send_replace(snapshot.clone());
        snapshot
    }

    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, period: Duration) {
        self.start_with_clock(period, local_now);
    }

    pub fn start_with_clock<F>(&mut self, period: Duration, clock: F)
    where
        F: Fn() -> NaiveDateTime + Send + 'static,
    {
        if self.stop() {
            debug!("replacing running status ticker");
        }
        let timetable = Arc::clone(&self.timetable);
        let sender = Arc::clone(&self.sender);
        let period = period.max(Duration::from_millis(1));

        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let snapshot = timetable.snapshot(clock());
                debug!(status = snapshot.status.kind(), "dashboard status refreshed");
                sender.send_replace(snapshot);
            }
        }));
        info!(period_ms = period.as_millis() as u64, "status ticker started");
    }

    /// Abort the running task. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
