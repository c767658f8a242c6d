use identity::{ChartIdentity, ChartSource, PinDescription, PropertyBag};
use metric::{DataFeed, FeedRequest, MetricError, MetricItem, PolledItem, RefreshWindow, Sample};
use perf_core::{
    ChartView, CoreError, Dashboard, GroupController, GroupSource, HeadlessChart,
    HeadlessChartFactory, MemoryPinBoard, PerfSettings, PinBoard, PinCard, PinProvider,
};
use std::sync::{Arc, Mutex, Weak};

struct FlatFeed;

impl DataFeed for FlatFeed {
    fn fetch(&self, _request: &FeedRequest) -> Result<Vec<Sample>, MetricError> {
        Ok(vec![Sample::new(0.0, 1.0)])
    }
}

fn polled(name: &str) -> Arc<dyn MetricItem> {
    Arc::new(PolledItem::new(
        name,
        name,
        ChartSource::Groups(vec!["All".to_string()]),
        Arc::new(FlatFeed),
        RefreshWindow::default(),
    ))
}

#[derive(Default)]
struct RecordingProvider {
    created: Mutex<Vec<String>>,
    unpinned: Mutex<Vec<String>>,
}

impl PinProvider for RecordingProvider {
    fn create_pin(&self, identity: &ChartIdentity) -> Result<Arc<PinCard>, CoreError> {
        if identity.name() == "broken" {
            return Err(CoreError::ItemNotFound("broken".to_string()));
        }
        self.created.lock().unwrap().push(identity.name().to_string());
        let item = polled(identity.name());
        let chart: Arc<dyn ChartView> = Arc::new(HeadlessChart::new(identity.name()));
        Ok(Arc::new(PinCard::new(identity.clone(), item, chart, None)))
    }

    fn unpin(&self, identity: &ChartIdentity) -> Result<(), CoreError> {
        self.unpinned.lock().unwrap().push(identity.name().to_string());
        Ok(())
    }
}

fn register(board: &MemoryPinBoard, id: &str, provider: &Arc<RecordingProvider>) {
    let weak: Weak<RecordingProvider> = Arc::downgrade(provider);
    let weak: Weak<dyn PinProvider> = weak;
    board.register_pin_provider(id, weak);
}

fn description(provider: &str, name: &str, full_name: &str) -> PinDescription {
    PinDescription::from_identity(provider, &ChartIdentity::groups(name, full_name, ["All"]))
        .unwrap()
}

#[test]
fn add_pin_stores_and_materializes() {
    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);

    let card = board.add_pin(description("summary", "bw", "Bandwidth")).unwrap();
    assert_eq!(card.identity().name(), "bw");
    assert_eq!(board.pins().len(), 1);
    assert!(board.card("summary", "bw").is_some());
    assert_eq!(*provider.created.lock().unwrap(), vec!["bw".to_string()]);
}

#[test]
fn add_pin_replaces_same_slot() {
    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);

    board.add_pin(description("summary", "bw", "Bandwidth")).unwrap();
    board.add_pin(description("summary", "bw", "Bandwidth (all)")).unwrap();
    board.add_pin(description("ports", "bw", "Bandwidth")).unwrap_err();

    let pins = board.pins();
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].name, "Bandwidth (all)");
}

#[test]
fn failed_materialization_rolls_back_description() {
    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);

    let err = board
        .add_pin(description("summary", "broken", "Broken"))
        .unwrap_err();
    assert!(matches!(err, CoreError::ItemNotFound(_)));
    assert!(board.pins().is_empty());
    assert_eq!(board.card_count(), 0);
}

#[test]
fn undecodable_description_is_rejected() {
    let board = MemoryPinBoard::new("main");
    let mut arguments = PropertyBag::new();
    arguments.insert("name", "orphan");
    let err = board
        .add_pin(PinDescription {
            provider: "summary".to_string(),
            name: "orphan".to_string(),
            description: String::new(),
            arguments,
        })
        .unwrap_err();
    assert!(err.to_string().contains("unsupported chart identity encoding"));
    assert!(board.pins().is_empty());
}

#[test]
fn remove_pin_notifies_provider() {
    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);
    board.add_pin(description("summary", "bw", "Bandwidth")).unwrap();

    board.remove_pin("summary", "bw").unwrap();
    assert!(board.pins().is_empty());
    assert!(board.card("summary", "bw").is_none());
    assert_eq!(*provider.unpinned.lock().unwrap(), vec!["bw".to_string()]);

    let err = board.remove_pin("summary", "bw").unwrap_err();
    assert!(matches!(err, CoreError::UnknownPin { .. }));
}

#[test]
fn dropped_provider_counts_as_unregistered() {
    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);
    assert!(board.has_provider("summary"));
    drop(provider);
    assert!(!board.has_provider("summary"));

    let err = board
        .add_pin(description("summary", "bw", "Bandwidth"))
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownProvider(id) if id == "summary"));
}

#[test]
fn board_round_trips_through_file_and_restores() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("board.json");

    let board = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&board, "summary", &provider);
    board.add_pin(description("summary", "bw", "Bandwidth")).unwrap();
    board.add_pin(description("summary", "pkts", "Packets")).unwrap();
    board.save_to_file(&path).expect("save board");

    let loaded = MemoryPinBoard::load_from_file(&path).expect("load board");
    assert_eq!(loaded.name(), "main");
    assert_eq!(loaded.pins(), board.pins());
    assert_eq!(loaded.card_count(), 0);

    // nothing registered yet: every pin fails but stays stored
    let results = loaded.restore();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, result)| result.is_err()));
    assert_eq!(loaded.pins().len(), 2);

    let fresh = Arc::new(RecordingProvider::default());
    register(&loaded, "summary", &fresh);
    let results = loaded.restore();
    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(loaded.card_count(), 2);
}

#[test]
fn dashboard_restores_pins_into_controllers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("board.json");
    let saved = MemoryPinBoard::new("main");
    let provider = Arc::new(RecordingProvider::default());
    register(&saved, "summary", &provider);
    saved
        .add_pin(description("summary", "bw", "Bandwidth"))
        .unwrap();
    saved.save_to_file(&path).unwrap();

    let factory = Arc::new(HeadlessChartFactory::new());
    let dashboard = Dashboard::new(PerfSettings::default(), factory)
        .with_pin_board(MemoryPinBoard::load_from_file(&path).unwrap());
    let controller = GroupController::new(
        "summary",
        GroupSource::groups(["All"]),
        vec![polled("bw"), polled("pkts")],
        dashboard.factory(),
        dashboard.scales().clone(),
    )
    .unwrap()
    .with_pin_id("summary");
    let controller = dashboard.add_controller(controller).unwrap();

    let results = dashboard.restore_pins();
    assert_eq!(results.len(), 1);
    let card = results[0].1.as_ref().unwrap();
    assert_eq!(card.identity().full_name(), "Bandwidth");
    assert_eq!(controller.pin_count(), 1);
    assert!(!controller.view("bw").unwrap().is_pin_enabled("bw"));
}
