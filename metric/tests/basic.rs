use identity::{ChartSource, DataProviderName, DataType, HistoryType};
use metric::{
    CancelToken, DataFeed, FeedRequest, MetricError, MetricItem, PolledItem, RefreshObserver,
    RefreshWindow, Sample,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RampFeed {
    calls: AtomicUsize,
    requests: Mutex<Vec<FeedRequest>>,
}

impl DataFeed for RampFeed {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Sample>, MetricError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
        self.requests.lock().unwrap().push(request.clone());
        Ok(vec![Sample::new(n, n * 2.0)])
    }
}

struct FailingFeed;

impl DataFeed for FailingFeed {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Sample>, MetricError> {
        Err(MetricError::Feed {
            item: request.item.clone(),
            message: "timeout".to_string(),
        })
    }
}

fn groups() -> ChartSource {
    ChartSource::Groups(vec!["All".to_string()])
}

fn item(feed: Arc<dyn DataFeed>) -> PolledItem {
    PolledItem::new("bw", "Bandwidth", groups(), feed, RefreshWindow::new(10, 60))
        .with_data_type(DataType::External)
}

#[test]
fn refresh_window_rounds_up_and_never_hits_zero() {
    let window = RefreshWindow::new(10, 65);
    assert_eq!(window.max_points(None), 7);
    assert_eq!(window.max_points(Some(HistoryType::Current)), 7);
    assert_eq!(window.max_points(Some(HistoryType::OneHour)), 360);
    assert_eq!(RefreshWindow::new(0, 0).max_points(None), 1);
    assert_eq!(RefreshWindow::default().max_points(None), 60);
}

#[test]
fn refresh_appends_samples_while_active() {
    let feed = Arc::new(RampFeed::default());
    let item = item(feed.clone());
    let token = CancelToken::new();

    assert!(item.refresh(&token).unwrap());
    assert!(item.refresh(&token).unwrap());
    assert_eq!(item.dataset().points(), vec![(0.0, 0.0), (1.0, 2.0)]);

    let requests = feed.requests.lock().unwrap();
    assert_eq!(requests[0].item, "bw");
    assert_eq!(requests[0].data_type, Some(DataType::External));
    assert_eq!(requests[0].provider, DataProviderName::Group);
    assert_eq!(requests[0].max_points, 6);
}

#[test]
fn inactive_item_ignores_refresh() {
    let feed = Arc::new(RampFeed::default());
    let item = item(feed.clone());
    item.set_active(false);
    assert!(!item.refresh(&CancelToken::new()).unwrap());
    assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    assert!(item.dataset().is_empty());
}

#[test]
fn cancelled_observer_skips_fetch() {
    let feed = Arc::new(RampFeed::default());
    let item = item(feed.clone());
    let token = CancelToken::new();
    token.cancel();
    assert!(!item.refresh(&token).unwrap());
    assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    assert!(token.is_cancelled());
}

#[test]
fn feed_errors_surface_to_caller() {
    let item = item(Arc::new(FailingFeed));
    let err = item.refresh(&CancelToken::new()).unwrap_err();
    assert_eq!(err.to_string(), "feed failed for 'bw': timeout");
}

#[test]
fn copy_is_independent_and_starts_inactive() {
    let feed = Arc::new(RampFeed::default());
    let original = item(feed.clone());
    original.refresh(&CancelToken::new()).unwrap();

    let copy = original.copy();
    assert!(!copy.is_active());
    assert!(copy.dataset().is_empty());
    assert!(!copy.dataset().ptr_eq(&original.dataset()));
    assert_eq!(copy.data_type(), Some(DataType::External));
    assert_eq!(copy.source(), groups());

    original.set_data_type(Some(DataType::Internal));
    original.set_sources(ChartSource::Groups(vec!["SWs".to_string()]));
    assert_eq!(copy.data_type(), Some(DataType::External));
    assert_eq!(copy.source(), groups());

    copy.set_active(true);
    assert!(!original.dataset().ptr_eq(&copy.dataset()));
    assert!(original.is_active());
}

#[test]
fn history_change_resizes_dataset_when_recomputing() {
    let feed = Arc::new(RampFeed::default());
    let item = item(feed);
    item.refresh(&CancelToken::new()).unwrap();
    let dataset = item.dataset();

    item.set_history_type(Some(HistoryType::OneHour), false);
    assert_eq!(dataset.capacity(), 6);
    assert_eq!(dataset.len(), 1);

    item.set_history_type(Some(HistoryType::OneHour), true);
    assert_eq!(dataset.capacity(), 360);
    assert!(dataset.is_empty());
    assert!(item.dataset().ptr_eq(&dataset));
}

#[test]
fn history_refresh_replaces_series() {
    let feed = Arc::new(RampFeed::default());
    let item = item(feed).with_history_type(HistoryType::TwoHours);
    let token = CancelToken::new();
    item.refresh(&token).unwrap();
    item.refresh(&token).unwrap();
    assert_eq!(item.dataset().points(), vec![(1.0, 2.0)]);
}

#[test]
fn window_change_resizes_dataset() {
    let item = item(Arc::new(RampFeed::default()));
    item.set_window(RefreshWindow::new(5, 60));
    assert_eq!(item.dataset().capacity(), 12);
    assert_eq!(item.window(), RefreshWindow::new(5, 60));
}

#[test]
fn cancel_token_counts_finishes() {
    let token = CancelToken::new();
    token.on_finish();
    token.on_finish();
    assert_eq!(token.finish_count(), 2);
    token.cancel();
    assert!(token.is_cancelled());
    token.reset();
    assert!(!token.is_cancelled());
}
