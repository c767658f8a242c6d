use crate::message::{SchedulerMessage, SchedulerSettings, SchedulerState};
use crate::worker_thread::WorkerThread;
use metric::{CancelToken, RefreshObserver};
use perf_core::ChartGroup;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

struct ScheduledGroup {
    group: Arc<dyn ChartGroup>,
    visible: bool,
}

struct Scheduler {
    settings: SchedulerSettings,
    groups: Vec<ScheduledGroup>,
    paused: bool,
    cycle: u64,
    cancel: Arc<CancelToken>,
    state_tx: Sender<SchedulerState>,
}

impl Scheduler {
    /// Returns false when the loop should stop.
    fn handle(&mut self, message: SchedulerMessage, next_due: &mut Instant) -> bool {
        match message {
            SchedulerMessage::UpdateSettings(settings) => {
                if settings.refresh_period != self.settings.refresh_period {
                    *next_due = Instant::now() + settings.refresh_period;
                }
                self.settings = settings;
            }
            SchedulerMessage::AddGroup(group) => {
                self.groups.retain(|entry| entry.group.name() != group.name());
                log::debug!("scheduling group '{}'", group.name());
                self.groups.push(ScheduledGroup {
                    group,
                    visible: true,
                });
            }
            SchedulerMessage::RemoveGroup(name) => {
                self.groups.retain(|entry| entry.group.name() != name);
            }
            SchedulerMessage::SetVisible(name, visible) => {
                let sleep_when_hidden = self.settings.sleep_when_hidden;
                if let Some(entry) = self.groups.iter_mut().find(|e| e.group.name() == name) {
                    entry.visible = visible;
                    if sleep_when_hidden {
                        if let Err(err) = entry.group.set_sleep_mode(!visible) {
                            log::warn!("{err}");
                        }
                    }
                }
            }
            SchedulerMessage::SetPaused(paused) => self.paused = paused,
            SchedulerMessage::RefreshNow => *next_due = Instant::now(),
            SchedulerMessage::Shutdown => return false,
        }
        true
    }

    fn run_cycle(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);
        let mut state = SchedulerState {
            cycle: self.cycle,
            ..SchedulerState::default()
        };
        for entry in &self.groups {
            if self.cancel.is_cancelled() {
                state.cancelled = true;
                break;
            }
            let summary = entry.group.refresh(self.cancel.as_ref());
            state.summaries.push((entry.group.name().to_string(), summary));
            if summary.cancelled {
                state.cancelled = true;
                break;
            }
        }
        if state.cancelled {
            log::debug!("refresh cycle {} cancelled", self.cycle);
            self.cancel.reset();
        }
        let _ = self.state_tx.send(state);
    }
}

/// Starts the refresh loop on its own thread.
///
/// Setting `cancel` aborts the cycle in progress between items; the next
/// cycle starts with the token cleared.
pub fn spawn_scheduler(
    settings: SchedulerSettings,
    cancel: Arc<CancelToken>,
) -> Result<(Sender<SchedulerMessage>, Receiver<SchedulerState>, JoinHandle<()>), String> {
    let (tx, rx) = mpsc::channel::<SchedulerMessage>();
    let (state_tx, state_rx) = mpsc::channel::<SchedulerState>();

    let handle = WorkerThread::spawn("perf-scheduler", move || {
        let mut next_due = Instant::now() + settings.refresh_period;
        let mut scheduler = Scheduler {
            settings,
            groups: Vec::new(),
            paused: false,
            cycle: 0,
            cancel,
            state_tx,
        };
        let mut forced = false;

        loop {
            let timeout = next_due.saturating_duration_since(Instant::now());
            match rx.recv_timeout(timeout) {
                Ok(message) => {
                    let refresh_now = matches!(message, SchedulerMessage::RefreshNow);
                    if !scheduler.handle(message, &mut next_due) {
                        break;
                    }
                    forced |= refresh_now;
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if !scheduler.paused || forced {
                scheduler.run_cycle();
            }
            forced = false;
            next_due = Instant::now() + scheduler.settings.refresh_period;
        }
        log::debug!("scheduler stopped after {} cycle(s)", scheduler.cycle);
    })?;

    Ok((tx, state_rx, handle))
}
