use identity::{ChartSource, DataProviderName, DataType, HistoryType};
use std::sync::Arc;

pub mod dataset;
pub mod item;
pub mod observer;

pub use dataset::{Dataset, DatasetObserver, Sample, SubscriptionId};
pub use item::{PolledItem, RefreshWindow};
pub use observer::{CancelToken, RefreshObserver};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("feed failed for '{item}': {message}")]
    Feed { item: String, message: String },
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// What an item asks the feed for on each refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub item: String,
    pub provider: DataProviderName,
    pub source: ChartSource,
    pub data_type: Option<DataType>,
    pub history_type: Option<HistoryType>,
    pub max_points: usize,
}

/// Source of raw samples, typically backed by the fabric management client.
pub trait DataFeed: Send + Sync {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Sample>, MetricError>;
}

/// One polled time series.
///
/// Items are shared between the refresh thread and the UI thread, so every
/// method takes `&self`. Two `refresh` calls on the same item must not
/// overlap; the scheduler runs one cycle at a time per controller.
pub trait MetricItem: Send + Sync {
    fn name(&self) -> &str;
    fn full_name(&self) -> &str;
    fn provider(&self) -> DataProviderName;
    fn source(&self) -> ChartSource;
    fn data_type(&self) -> Option<DataType>;
    fn history_type(&self) -> Option<HistoryType>;
    fn is_active(&self) -> bool;
    /// Stable for the item's whole life.
    fn dataset(&self) -> Dataset;

    fn set_sources(&self, source: ChartSource);
    fn set_data_provider(&self, provider: DataProviderName);
    fn set_data_type(&self, data_type: Option<DataType>);
    fn set_history_type(&self, history_type: Option<HistoryType>, recompute: bool);
    fn set_active(&self, active: bool);

    /// Pulls new samples. Returns `Ok(false)` when nothing was fetched
    /// because the item is inactive or the pass was cancelled.
    fn refresh(&self, observer: &dyn RefreshObserver) -> Result<bool, MetricError>;
    fn clear(&self);
    /// Same configuration, fresh dataset, inactive.
    fn copy(&self) -> Arc<dyn MetricItem>;
}
