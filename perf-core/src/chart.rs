use crate::scale::AxisRange;
use identity::{DataType, HistoryType};
use metric::Dataset;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Rendering surface for one card. A card hosts one or more named charts.
///
/// Implementations are called from the refresh thread (through scale
/// managers) and must not call back into the manager that drives them.
pub trait ChartView: Send + Sync {
    fn name(&self) -> &str;
    fn attach_dataset(&self, chart: &str, dataset: Dataset);
    fn dataset(&self, chart: &str) -> Option<Dataset>;
    /// Enables or disables the pin affordance of one chart on this card.
    fn set_pin_enabled(&self, chart: &str, enabled: bool);
    fn is_pin_enabled(&self, chart: &str) -> bool;
    fn set_range(&self, range: AxisRange);
    fn show_data_type(&self, _chart: &str, _data_type: Option<DataType>) {}
    fn show_history_type(&self, _chart: &str, _history_type: Option<HistoryType>) {}
    /// Preferred size in pixels.
    fn size(&self) -> (u32, u32) {
        (400, 200)
    }
}

pub trait ChartFactory: Send + Sync {
    /// Builds a card named `name` hosting one chart per `(chart, dataset)`.
    fn create_card(&self, name: &str, charts: &[(String, Dataset)]) -> Arc<dyn ChartView>;

    fn create_chart(&self, name: &str, dataset: &Dataset) -> Arc<dyn ChartView> {
        self.create_card(name, &[(name.to_string(), dataset.clone())])
    }
}

#[derive(Debug, Clone, Default)]
struct ChartSlot {
    dataset: Option<Dataset>,
    pin_enabled: bool,
    data_type: Option<DataType>,
    history_type: Option<HistoryType>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    slots: HashMap<String, ChartSlot>,
    range: Option<AxisRange>,
}

/// In-memory [`ChartView`] that only records what it was told to show.
#[derive(Debug)]
pub struct HeadlessChart {
    name: String,
    size: (u32, u32),
    state: Mutex<HeadlessState>,
    range_updates: AtomicUsize,
}

impl HeadlessChart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: (400, 200),
            state: Mutex::new(HeadlessState::default()),
            range_updates: AtomicUsize::new(0),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn range(&self) -> Option<AxisRange> {
        self.lock().range
    }

    pub fn range_updates(&self) -> usize {
        self.range_updates.load(Ordering::SeqCst)
    }

    pub fn shown_data_type(&self, chart: &str) -> Option<DataType> {
        self.lock().slots.get(chart).and_then(|slot| slot.data_type)
    }

    pub fn shown_history_type(&self, chart: &str) -> Option<HistoryType> {
        self.lock().slots.get(chart).and_then(|slot| slot.history_type)
    }

    pub fn charts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().slots.keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChartView for HeadlessChart {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach_dataset(&self, chart: &str, dataset: Dataset) {
        let mut state = self.lock();
        let slot = state
            .slots
            .entry(chart.to_string())
            .or_insert_with(|| ChartSlot {
                pin_enabled: true,
                ..ChartSlot::default()
            });
        slot.dataset = Some(dataset);
    }

    fn dataset(&self, chart: &str) -> Option<Dataset> {
        self.lock().slots.get(chart).and_then(|slot| slot.dataset.clone())
    }

    fn set_pin_enabled(&self, chart: &str, enabled: bool) {
        if let Some(slot) = self.lock().slots.get_mut(chart) {
            slot.pin_enabled = enabled;
        }
    }

    fn is_pin_enabled(&self, chart: &str) -> bool {
        self.lock()
            .slots
            .get(chart)
            .map(|slot| slot.pin_enabled)
            .unwrap_or(false)
    }

    fn set_range(&self, range: AxisRange) {
        self.lock().range = Some(range);
        self.range_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn show_data_type(&self, chart: &str, data_type: Option<DataType>) {
        if let Some(slot) = self.lock().slots.get_mut(chart) {
            slot.data_type = data_type;
        }
    }

    fn show_history_type(&self, chart: &str, history_type: Option<HistoryType>) {
        if let Some(slot) = self.lock().slots.get_mut(chart) {
            slot.history_type = history_type;
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Builds [`HeadlessChart`]s and keeps every one it produced.
#[derive(Debug, Default)]
pub struct HeadlessChartFactory {
    created: Mutex<Vec<Arc<HeadlessChart>>>,
}

impl HeadlessChartFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<Arc<HeadlessChart>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently created chart named `name`.
    pub fn find(&self, name: &str) -> Option<Arc<HeadlessChart>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|chart| chart.name == name)
            .cloned()
    }
}

impl ChartFactory for HeadlessChartFactory {
    fn create_card(&self, name: &str, charts: &[(String, Dataset)]) -> Arc<dyn ChartView> {
        let chart = Arc::new(HeadlessChart::new(name));
        for (slot, dataset) in charts {
            chart.attach_dataset(slot, dataset.clone());
        }
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chart.clone());
        chart
    }
}
