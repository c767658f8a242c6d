use crate::dataset::Dataset;
use crate::observer::RefreshObserver;
use crate::{DataFeed, FeedRequest, MetricError, MetricItem};
use identity::{ChartSource, DataProviderName, DataType, HistoryType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Refresh rate and live time window that size a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshWindow {
    pub refresh_rate_secs: u64,
    pub time_window_secs: u64,
}

impl Default for RefreshWindow {
    fn default() -> Self {
        Self {
            refresh_rate_secs: 10,
            time_window_secs: 600,
        }
    }
}

impl RefreshWindow {
    pub fn new(refresh_rate_secs: u64, time_window_secs: u64) -> Self {
        Self {
            refresh_rate_secs,
            time_window_secs,
        }
    }

    /// Number of points needed to cover the span of `history` at this rate.
    pub fn max_points(&self, history: Option<HistoryType>) -> usize {
        let rate = self.refresh_rate_secs.max(1);
        let span = history
            .and_then(HistoryType::span_secs)
            .unwrap_or(self.time_window_secs);
        (span.div_ceil(rate) as usize).max(1)
    }
}

#[derive(Debug, Clone)]
struct ItemConfig {
    provider: DataProviderName,
    source: ChartSource,
    data_type: Option<DataType>,
    history_type: Option<HistoryType>,
    window: RefreshWindow,
}

/// [`MetricItem`] that pulls from a [`DataFeed`] into a bounded dataset.
pub struct PolledItem {
    name: String,
    full_name: String,
    feed: Arc<dyn DataFeed>,
    config: Mutex<ItemConfig>,
    active: AtomicBool,
    // held across the active check and the dataset write of a refresh
    write_gate: Mutex<()>,
    dataset: Dataset,
}

impl PolledItem {
    pub fn new(
        name: impl Into<String>,
        full_name: impl Into<String>,
        source: ChartSource,
        feed: Arc<dyn DataFeed>,
        window: RefreshWindow,
    ) -> Self {
        let name = name.into();
        let dataset = Dataset::new(name.clone(), window.max_points(None));
        Self {
            full_name: full_name.into(),
            feed,
            config: Mutex::new(ItemConfig {
                provider: source.default_provider(),
                source,
                data_type: None,
                history_type: None,
                window,
            }),
            active: AtomicBool::new(true),
            write_gate: Mutex::new(()),
            dataset,
            name,
        }
    }

    pub fn with_data_type(self, data_type: DataType) -> Self {
        self.lock().data_type = Some(data_type);
        self
    }

    pub fn with_history_type(self, history_type: HistoryType) -> Self {
        {
            let mut config = self.lock();
            config.history_type = Some(history_type);
            self.dataset
                .set_capacity(config.window.max_points(config.history_type));
        }
        self
    }

    pub fn with_provider(self, provider: DataProviderName) -> Self {
        self.lock().provider = provider;
        self
    }

    pub fn window(&self) -> RefreshWindow {
        self.lock().window
    }

    /// Applies a new refresh rate / time window and resizes the dataset.
    pub fn set_window(&self, window: RefreshWindow) {
        let mut config = self.lock();
        config.window = window;
        self.dataset
            .set_capacity(window.max_points(config.history_type));
    }

    fn request(&self) -> FeedRequest {
        let config = self.lock();
        FeedRequest {
            item: self.name.clone(),
            provider: config.provider,
            source: config.source.clone(),
            data_type: config.data_type,
            history_type: config.history_type,
            max_points: config.window.max_points(config.history_type),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ItemConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricItem for PolledItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn provider(&self) -> DataProviderName {
        self.lock().provider
    }

    fn source(&self) -> ChartSource {
        self.lock().source.clone()
    }

    fn data_type(&self) -> Option<DataType> {
        self.lock().data_type
    }

    fn history_type(&self) -> Option<HistoryType> {
        self.lock().history_type
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn dataset(&self) -> Dataset {
        self.dataset.clone()
    }

    fn set_sources(&self, source: ChartSource) {
        self.lock().source = source;
        self.dataset.clear();
    }

    fn set_data_provider(&self, provider: DataProviderName) {
        self.lock().provider = provider;
        self.dataset.clear();
    }

    fn set_data_type(&self, data_type: Option<DataType>) {
        self.lock().data_type = data_type;
        self.dataset.clear();
    }

    fn set_history_type(&self, history_type: Option<HistoryType>, recompute: bool) {
        let capacity = {
            let mut config = self.lock();
            config.history_type = history_type;
            config.window.max_points(history_type)
        };
        if recompute {
            self.dataset.clear();
            self.dataset.set_capacity(capacity);
        }
    }

    /// Waits for an in-flight dataset write, so no samples land after
    /// deactivation returns.
    fn set_active(&self, active: bool) {
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.active.store(active, Ordering::SeqCst);
    }

    fn refresh(&self, observer: &dyn RefreshObserver) -> Result<bool, MetricError> {
        if !self.is_active() || observer.is_cancelled() {
            return Ok(false);
        }
        let request = self.request();
        let samples = self.feed.fetch(&request)?;
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        // deactivated while the fetch was outstanding
        if !self.is_active() {
            return Ok(false);
        }
        match request.history_type {
            Some(history) if history != HistoryType::Current => self.dataset.replace(&samples),
            _ => self.dataset.extend(&samples),
        }
        log::trace!(
            "refreshed '{}' with {} sample(s)",
            self.name,
            samples.len()
        );
        Ok(true)
    }

    fn clear(&self) {
        self.dataset.clear();
    }

    fn copy(&self) -> Arc<dyn MetricItem> {
        let config = self.lock().clone();
        let capacity = config.window.max_points(config.history_type);
        Arc::new(PolledItem {
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            feed: self.feed.clone(),
            config: Mutex::new(config),
            active: AtomicBool::new(false),
            write_gate: Mutex::new(()),
            dataset: Dataset::new(self.name.clone(), capacity),
        })
    }
}
