use crate::chart::ChartView;
use identity::{DataType, HistoryType};
use metric::MetricItem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Whether an option change comes from the user or from undo/redo.
/// Only user changes are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    #[default]
    User,
    Replay,
}

impl ApplyMode {
    pub fn records_undo(self) -> bool {
        self == ApplyMode::User
    }
}

pub trait UndoableAction: Send + Sync {
    fn description(&self) -> String;
    fn undo(&self);
    fn redo(&self);
}

pub trait UndoStack: Send + Sync {
    fn add_undo_action(&self, action: Box<dyn UndoableAction>);
}

pub(crate) fn apply_data_type(
    item: &dyn MetricItem,
    view: &dyn ChartView,
    chart: &str,
    data_type: Option<DataType>,
) {
    item.set_data_type(data_type);
    view.show_data_type(chart, data_type);
}

pub(crate) fn apply_history_type(
    item: &dyn MetricItem,
    view: &dyn ChartView,
    chart: &str,
    history_type: Option<HistoryType>,
) {
    item.set_history_type(history_type, true);
    view.show_history_type(chart, history_type);
}

/// Captures one item's option change so it can be replayed either way.
pub struct OptionChange<T> {
    item: Arc<dyn MetricItem>,
    view: Arc<dyn ChartView>,
    chart: String,
    old: T,
    new: T,
}

impl<T> OptionChange<T> {
    pub fn new(
        item: Arc<dyn MetricItem>,
        view: Arc<dyn ChartView>,
        chart: impl Into<String>,
        old: T,
        new: T,
    ) -> Self {
        Self {
            item,
            view,
            chart: chart.into(),
            old,
            new,
        }
    }
}

pub type DataTypeChange = OptionChange<Option<DataType>>;
pub type HistoryTypeChange = OptionChange<Option<HistoryType>>;

fn label<T: std::fmt::Debug>(value: &Option<T>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => "none".to_string(),
    }
}

impl UndoableAction for DataTypeChange {
    fn description(&self) -> String {
        format!(
            "{} data type {} -> {}",
            self.item.name(),
            label(&self.old),
            label(&self.new)
        )
    }

    fn undo(&self) {
        apply_data_type(self.item.as_ref(), self.view.as_ref(), &self.chart, self.old);
    }

    fn redo(&self) {
        apply_data_type(self.item.as_ref(), self.view.as_ref(), &self.chart, self.new);
    }
}

impl UndoableAction for HistoryTypeChange {
    fn description(&self) -> String {
        format!(
            "{} history {} -> {}",
            self.item.name(),
            label(&self.old),
            label(&self.new)
        )
    }

    fn undo(&self) {
        apply_history_type(self.item.as_ref(), self.view.as_ref(), &self.chart, self.old);
    }

    fn redo(&self) {
        apply_history_type(self.item.as_ref(), self.view.as_ref(), &self.chart, self.new);
    }
}

pub const DEFAULT_UNDO_LIMIT: usize = 50;

#[derive(Default)]
struct Stacks {
    undo: Vec<Box<dyn UndoableAction>>,
    redo: Vec<Box<dyn UndoableAction>>,
}

/// Bounded undo/redo history. Oldest actions fall off once the limit is hit.
pub struct UndoHistory {
    limit: usize,
    stacks: Mutex<Stacks>,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl UndoHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            stacks: Mutex::new(Stacks::default()),
        }
    }

    /// Reverts the latest action and returns its description.
    pub fn undo(&self) -> Option<String> {
        let action = self.lock().undo.pop()?;
        // applied outside the lock; actions touch items and views only
        action.undo();
        let description = action.description();
        self.lock().redo.push(action);
        Some(description)
    }

    pub fn redo(&self) -> Option<String> {
        let action = self.lock().redo.pop()?;
        action.redo();
        let description = action.description();
        self.lock().undo.push(action);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.lock().redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut stacks = self.lock();
        stacks.undo.clear();
        stacks.redo.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Stacks> {
        self.stacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UndoStack for UndoHistory {
    fn add_undo_action(&self, action: Box<dyn UndoableAction>) {
        log::debug!("undo: recorded '{}'", action.description());
        let mut stacks = self.lock();
        stacks.redo.clear();
        stacks.undo.push(action);
        if stacks.undo.len() > self.limit {
            stacks.undo.remove(0);
        }
    }
}
