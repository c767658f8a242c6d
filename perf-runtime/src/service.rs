use crate::message::{SchedulerMessage, SchedulerSettings, SchedulerState};
use crate::scheduler::spawn_scheduler;
use metric::CancelToken;
use perf_core::ChartGroup;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Owns the scheduler thread and talks to it over its message channel.
pub struct SchedulerService {
    tx: Sender<SchedulerMessage>,
    state_rx: Receiver<SchedulerState>,
    cancel: Arc<CancelToken>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerService {
    pub fn new(settings: SchedulerSettings) -> Result<Self, String> {
        let cancel = Arc::new(CancelToken::new());
        let (tx, state_rx, handle) = spawn_scheduler(settings, cancel.clone())?;
        Ok(Self {
            tx,
            state_rx,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn add_group(&self, group: Arc<dyn ChartGroup>) {
        let _ = self.tx.send(SchedulerMessage::AddGroup(group));
    }

    pub fn remove_group(&self, name: &str) {
        let _ = self.tx.send(SchedulerMessage::RemoveGroup(name.to_string()));
    }

    pub fn set_visible(&self, name: &str, visible: bool) {
        let _ = self
            .tx
            .send(SchedulerMessage::SetVisible(name.to_string(), visible));
    }

    pub fn set_paused(&self, paused: bool) {
        let _ = self.tx.send(SchedulerMessage::SetPaused(paused));
    }

    pub fn update_settings(&self, settings: SchedulerSettings) {
        let _ = self.tx.send(SchedulerMessage::UpdateSettings(settings));
    }

    pub fn refresh_now(&self) {
        let _ = self.tx.send(SchedulerMessage::RefreshNow);
    }

    /// Aborts the cycle in progress; later cycles run normally.
    pub fn cancel_cycle(&self) {
        self.cancel.cancel();
    }

    pub fn poll_state(&self) -> Option<SchedulerState> {
        self.state_rx.try_recv().ok()
    }

    /// Blocks until a state with `cycle >= cycles` arrives.
    pub fn wait_for_cycles(&self, cycles: u64, timeout: Duration) -> Result<SchedulerState, String> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.state_rx.recv_timeout(remaining) {
                Ok(state) if state.cycle >= cycles => return Ok(state),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    return Err(format!("Timed out waiting for refresh cycle {cycles}"))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err("Scheduler thread stopped".to_string())
                }
            }
        }
    }

    /// Cancels the running cycle and joins the scheduler thread.
    pub fn shutdown(mut self) -> Result<(), String> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), String> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.cancel.cancel();
        let _ = self.tx.send(SchedulerMessage::Shutdown);
        handle
            .join()
            .map_err(|_| "Scheduler thread panicked".to_string())
    }
}

impl Drop for SchedulerService {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("{err}");
        }
    }
}
