use identity::{ChartSource, HistoryType};
use metric::{DataFeed, FeedRequest, MetricError, MetricItem, Sample};
use perf_core::settings::{load_settings_file, normalize_settings, save_settings_file};
use perf_core::{
    Dashboard, HeadlessChartFactory, PerfSettings, UndoHistory, UndoStack, UndoableAction,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[test]
fn defaults_match_refresh_window() {
    let settings = PerfSettings::default();
    assert_eq!(settings.refresh_rate_secs, 10);
    assert_eq!(settings.time_window_secs, 600);
    assert_eq!(settings.window().max_points(None), 60);
    assert!(settings.include_zero);
}

#[test]
fn normalize_clamps_rate_and_window() {
    let settings = normalize_settings(PerfSettings {
        refresh_rate_secs: 0,
        time_window_secs: 0,
        undo_limit: 0,
        ..PerfSettings::default()
    });
    assert_eq!(settings.refresh_rate_secs, 1);
    assert_eq!(settings.time_window_secs, 1);
    assert_eq!(settings.undo_limit, 1);
}

#[test]
fn patch_applies_known_keys() {
    let mut settings = PerfSettings::default();
    settings
        .apply_patch(&json!({
            "refresh_rate_secs": 5,
            "default_history": "one_hour",
            "sleep_when_hidden": false
        }))
        .expect("apply patch");
    assert_eq!(settings.refresh_rate_secs, 5);
    assert_eq!(settings.default_history, HistoryType::OneHour);
    assert!(!settings.sleep_when_hidden);
    assert_eq!(settings.time_window_secs, 600);
}

#[test]
fn invalid_patch_leaves_settings_untouched() {
    let mut settings = PerfSettings::default();
    let err = settings
        .apply_patch(&json!({"refresh_rate_secs": 3, "default_history": "forever"}))
        .unwrap_err();
    assert!(err.contains("forever"));
    assert_eq!(settings, PerfSettings::default());

    let err = settings.apply_json("[1, 2]").unwrap_err();
    assert_eq!(err, "Settings patch must be a JSON object");
}

#[test]
fn settings_round_trip_as_toml_and_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = PerfSettings {
        refresh_rate_secs: 30,
        time_window_secs: 1800,
        default_history: HistoryType::SixHours,
        ..PerfSettings::default()
    };

    for file in ["perf.toml", "perf.json"] {
        let path = dir.path().join(file);
        save_settings_file(&path, &settings).expect("save settings");
        let loaded = load_settings_file(&path).expect("load settings");
        assert_eq!(loaded, settings);
    }
}

#[test]
fn partial_toml_uses_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("perf.toml");
    std::fs::write(&path, "refresh_rate_secs = 20\ntime_window_secs = 5\n").unwrap();
    let loaded = load_settings_file(&path).expect("load settings");
    assert_eq!(loaded.refresh_rate_secs, 20);
    assert_eq!(loaded.time_window_secs, 20);
    assert_eq!(loaded.default_history, HistoryType::Current);
}

#[test]
fn missing_settings_file_reports_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let err = load_settings_file(&path).unwrap_err();
    assert!(err.contains("absent.json"));
}

struct Push {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl UndoableAction for Push {
    fn description(&self) -> String {
        self.label.clone()
    }

    fn undo(&self) {
        self.log.lock().unwrap().push(format!("undo {}", self.label));
    }

    fn redo(&self) {
        self.log.lock().unwrap().push(format!("redo {}", self.label));
    }
}

#[test]
fn undo_history_is_bounded_and_redo_resets() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let history = UndoHistory::new(2);
    for label in ["a", "b", "c"] {
        history.add_undo_action(Box::new(Push {
            label: label.to_string(),
            log: log.clone(),
        }));
    }
    assert_eq!(history.len(), 2);

    assert_eq!(history.undo().as_deref(), Some("c"));
    assert_eq!(history.undo().as_deref(), Some("b"));
    assert_eq!(history.undo(), None);
    assert!(history.can_redo());
    assert_eq!(history.redo().as_deref(), Some("b"));

    history.add_undo_action(Box::new(Push {
        label: "d".to_string(),
        log: log.clone(),
    }));
    assert!(!history.can_redo());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["undo c".to_string(), "undo b".to_string(), "redo b".to_string()]
    );
}

struct FlatFeed;

impl DataFeed for FlatFeed {
    fn fetch(&self, _request: &FeedRequest) -> Result<Vec<Sample>, MetricError> {
        Ok(vec![Sample::new(0.0, 1.0)])
    }
}

#[test]
fn dashboard_items_start_on_default_history() {
    let settings = PerfSettings {
        default_history: HistoryType::OneHour,
        ..PerfSettings::default()
    };
    let dashboard = Dashboard::new(settings, Arc::new(HeadlessChartFactory::new()));
    let item = dashboard.polled_item(
        "bw",
        "Bandwidth",
        ChartSource::Groups(vec!["All".to_string()]),
        Arc::new(FlatFeed),
    );
    assert_eq!(item.history_type(), Some(HistoryType::OneHour));
    assert_eq!(item.dataset().capacity(), 360);
    assert_eq!(item.window(), dashboard.window());

    let dashboard = Dashboard::new(PerfSettings::default(), Arc::new(HeadlessChartFactory::new()));
    let item = dashboard.polled_item(
        "bw",
        "Bandwidth",
        ChartSource::Groups(vec!["All".to_string()]),
        Arc::new(FlatFeed),
    );
    assert_eq!(item.history_type(), Some(HistoryType::Current));
    assert_eq!(item.dataset().capacity(), 60);
}
