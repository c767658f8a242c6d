use crate::chart::ChartFactory;
use crate::controller::{ChartGroup, ControllerContext, GroupController, RefreshSummary, SourceKind};
use crate::pin::{MemoryPinBoard, PinBoard, PinCard};
use crate::scale::ScaleGroups;
use crate::settings::PerfSettings;
use crate::undo::{UndoHistory, UndoStack};
use crate::CoreError;
use identity::{ChartSource, PinDescription};
use metric::{DataFeed, PolledItem, RefreshObserver, RefreshWindow};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Owns everything controllers share: scale groups, the pin board, the undo
/// history and the chart factory.
pub struct Dashboard {
    settings: PerfSettings,
    scales: ScaleGroups,
    pin_board: Arc<MemoryPinBoard>,
    undo: Arc<UndoHistory>,
    factory: Arc<dyn ChartFactory>,
    groups: Mutex<Vec<Arc<dyn ChartGroup>>>,
}

impl Dashboard {
    pub fn new(settings: PerfSettings, factory: Arc<dyn ChartFactory>) -> Self {
        let settings = crate::settings::normalize_settings(settings);
        Self {
            scales: ScaleGroups::new(settings.include_zero),
            pin_board: Arc::new(MemoryPinBoard::new("default")),
            undo: Arc::new(UndoHistory::new(settings.undo_limit)),
            factory,
            groups: Mutex::new(Vec::new()),
            settings,
        }
    }

    /// Replaces the pin board; call before adding controllers.
    pub fn with_pin_board(mut self, board: MemoryPinBoard) -> Self {
        self.pin_board = Arc::new(board);
        self
    }

    pub fn settings(&self) -> &PerfSettings {
        &self.settings
    }

    pub fn window(&self) -> RefreshWindow {
        self.settings.window()
    }

    /// Item sized to the dashboard's window, starting on the configured
    /// default history.
    pub fn polled_item(
        &self,
        name: impl Into<String>,
        full_name: impl Into<String>,
        source: ChartSource,
        feed: Arc<dyn DataFeed>,
    ) -> PolledItem {
        PolledItem::new(name, full_name, source, feed, self.window())
            .with_history_type(self.settings.default_history)
    }

    pub fn scales(&self) -> &ScaleGroups {
        &self.scales
    }

    pub fn pin_board(&self) -> &Arc<MemoryPinBoard> {
        &self.pin_board
    }

    pub fn undo(&self) -> &Arc<UndoHistory> {
        &self.undo
    }

    pub fn factory(&self) -> Arc<dyn ChartFactory> {
        self.factory.clone()
    }

    pub fn context(&self) -> ControllerContext {
        let pin_board: Arc<dyn PinBoard> = self.pin_board.clone();
        let undo: Arc<dyn UndoStack> = self.undo.clone();
        ControllerContext::new()
            .with_pin_board(pin_board)
            .with_undo(undo)
    }

    /// Binds `controller` to this dashboard and starts tracking it.
    pub fn add_controller<K: SourceKind + 'static>(
        &self,
        controller: GroupController<K>,
    ) -> Result<Arc<GroupController<K>>, CoreError> {
        let controller = Arc::new(controller);
        controller.bind(self.context())?;
        let group: Arc<dyn ChartGroup> = controller.clone();
        self.lock().push(group);
        Ok(controller)
    }

    pub fn groups(&self) -> Vec<Arc<dyn ChartGroup>> {
        self.lock().clone()
    }

    /// Materializes the pins stored on the board.
    pub fn restore_pins(&self) -> Vec<(PinDescription, Result<Arc<PinCard>, CoreError>)> {
        self.pin_board.restore()
    }

    /// Refreshes every controller in order, stopping early on cancellation.
    pub fn refresh_all(&self, observer: &dyn RefreshObserver) -> Vec<RefreshSummary> {
        let mut summaries = Vec::new();
        for group in self.groups() {
            let summary = group.refresh(observer);
            summaries.push(summary);
            if summary.cancelled {
                break;
            }
        }
        summaries
    }

    pub fn set_sleep_mode_all(&self, sleep: bool) {
        for group in self.groups() {
            if let Err(err) = group.set_sleep_mode(sleep) {
                log::warn!("{err}");
            }
        }
    }

    /// Clears every controller and forgets them.
    pub fn shutdown(&self) {
        let groups = std::mem::take(&mut *self.lock());
        for group in groups {
            group.clear();
        }
        self.undo.clear();
        log::info!("dashboard shut down");
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn ChartGroup>>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
