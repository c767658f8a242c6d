use perf_core::{ChartGroup, PerfSettings, RefreshSummary};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub refresh_period: Duration,
    pub sleep_when_hidden: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings::from(&PerfSettings::default())
    }
}

impl From<&PerfSettings> for SchedulerSettings {
    fn from(settings: &PerfSettings) -> Self {
        Self {
            refresh_period: Duration::from_secs(settings.refresh_rate_secs.max(1)),
            sleep_when_hidden: settings.sleep_when_hidden,
        }
    }
}

/// Snapshot published after every refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub cycle: u64,
    pub summaries: Vec<(String, RefreshSummary)>,
    pub cancelled: bool,
}

impl SchedulerState {
    pub fn summary(&self, group: &str) -> Option<RefreshSummary> {
        self.summaries
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, summary)| *summary)
    }
}

pub enum SchedulerMessage {
    UpdateSettings(SchedulerSettings),
    AddGroup(Arc<dyn ChartGroup>),
    RemoveGroup(String),
    /// Tells the scheduler whether a group's cards are on screen.
    SetVisible(String, bool),
    SetPaused(bool),
    RefreshNow,
    Shutdown,
}

impl std::fmt::Debug for SchedulerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerMessage::UpdateSettings(settings) => {
                f.debug_tuple("UpdateSettings").field(settings).finish()
            }
            SchedulerMessage::AddGroup(group) => f.debug_tuple("AddGroup").field(&group.name()).finish(),
            SchedulerMessage::RemoveGroup(name) => f.debug_tuple("RemoveGroup").field(name).finish(),
            SchedulerMessage::SetVisible(name, visible) => {
                f.debug_tuple("SetVisible").field(name).field(visible).finish()
            }
            SchedulerMessage::SetPaused(paused) => f.debug_tuple("SetPaused").field(paused).finish(),
            SchedulerMessage::RefreshNow => f.write_str("RefreshNow"),
            SchedulerMessage::Shutdown => f.write_str("Shutdown"),
        }
    }
}
