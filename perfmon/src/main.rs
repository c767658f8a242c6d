mod commands;
mod feed;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use feed::SimulatedFeed;
use identity::{ChartSource, DataType, PortSource};
use metric::{DataFeed, MetricItem};
use perf_core::settings::load_settings_file;
use perf_core::{
    Dashboard, GroupController, GroupSource, HeadlessChartFactory, MemoryPinBoard, PerfSettings,
    PortCounterKind, PortKind, ScaleFamily,
};
use perf_runtime::{SchedulerService, SchedulerSettings};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SUMMARY_PIN_ID: &str = "summary";
const PORT_PIN_ID: &str = "port";
const COUNTER_PIN_ID: &str = "counters";
const COUNTER_FIELDS: [&str; 4] = ["xmit_data", "rcv_data", "xmit_pkts", "rcv_pkts"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            settings,
            board,
            cycles,
            period_ms,
            pins,
        } => run(settings.as_deref(), board.as_deref(), cycles, period_ms, &pins),
        Commands::Pins { board, json } => list_pins(&board, json),
    };

    if let Err(err) = result {
        output::print_error(&err);
        std::process::exit(1);
    }
    Ok(())
}

fn list_pins(board: &Path, json: bool) -> Result<(), String> {
    let board = MemoryPinBoard::load_from_file(board)
        .map_err(|e| format!("Failed to load pin board '{}': {e}", board.display()))?;
    if json {
        output::print_pin_json(&board.pins())
    } else {
        output::print_pin_list(board.name(), &board.pins());
        Ok(())
    }
}

fn load_board(path: Option<&Path>) -> Result<MemoryPinBoard, String> {
    match path {
        Some(path) if path.exists() => MemoryPinBoard::load_from_file(path)
            .map_err(|e| format!("Failed to load pin board '{}': {e}", path.display())),
        _ => Ok(MemoryPinBoard::new("default")),
    }
}

fn item(
    dashboard: &Dashboard,
    name: &str,
    full_name: &str,
    source: ChartSource,
    feed: &Arc<dyn DataFeed>,
) -> Arc<dyn MetricItem> {
    Arc::new(dashboard.polled_item(name, full_name, source, feed.clone()))
}

/// Builds the summary, port and counter controllers on `dashboard`.
fn build_controllers(
    dashboard: &Dashboard,
    feed: &Arc<dyn DataFeed>,
) -> Result<Arc<GroupController<GroupSource>>, String> {
    let all = ChartSource::Groups(vec!["All".to_string()]);
    let summary_items = vec![
        Arc::new(
            dashboard
                .polled_item("bandwidth", "Bandwidth", all.clone(), feed.clone())
                .with_data_type(DataType::External),
        ) as Arc<dyn MetricItem>,
        item(dashboard, "packet_rate", "Packet Rate", all, feed),
    ];
    let summary = GroupController::new(
        "summary",
        GroupSource::groups(["All"]),
        summary_items,
        dashboard.factory(),
        dashboard.scales().clone(),
    )
    .map_err(|e| e.to_string())?
    .with_pin_id(SUMMARY_PIN_ID)
    .with_scale_family("bandwidth", ScaleFamily::DataRate)
    .with_scale_family("packet_rate", ScaleFamily::PacketRate);
    let summary = dashboard
        .add_controller(summary)
        .map_err(|e| e.to_string())?;

    let port = PortSource::new("switch-0", 1, 1);
    let port_source = ChartSource::Port(port.clone());
    let port_items = vec![
        item(dashboard, "port_bandwidth", "Port Bandwidth", port_source.clone(), feed),
        item(dashboard, "port_packet_rate", "Port Packet Rate", port_source, feed),
    ];
    let port_controller = GroupController::new(
        "port",
        PortKind::new(port.clone()),
        port_items,
        dashboard.factory(),
        dashboard.scales().clone(),
    )
    .map_err(|e| e.to_string())?
    .with_pin_id(PORT_PIN_ID)
    .with_scale_family("port_bandwidth", ScaleFamily::DataRate)
    .with_scale_family("port_packet_rate", ScaleFamily::PacketRate);
    dashboard
        .add_controller(port_controller)
        .map_err(|e| e.to_string())?;

    let counter_items = COUNTER_FIELDS
        .iter()
        .map(|field| {
            let source = ChartSource::PortCounter {
                port: port.clone(),
                field: field.to_string(),
            };
            item(dashboard, field, field, source, feed)
        })
        .collect();
    let counters = GroupController::new(
        "counters",
        PortCounterKind::new(port),
        counter_items,
        dashboard.factory(),
        dashboard.scales().clone(),
    )
    .map_err(|e| e.to_string())?
    .with_pin_id(COUNTER_PIN_ID);
    dashboard
        .add_controller(counters)
        .map_err(|e| e.to_string())?;

    Ok(summary)
}

fn run(
    settings_path: Option<&Path>,
    board_path: Option<&Path>,
    cycles: u64,
    period_ms: Option<u64>,
    pins: &[String],
) -> Result<(), String> {
    let settings = match settings_path {
        Some(path) => load_settings_file(path)?,
        None => PerfSettings::default(),
    };
    let board = load_board(board_path)?;
    let factory = Arc::new(HeadlessChartFactory::new());
    let dashboard = Dashboard::new(settings, factory).with_pin_board(board);
    let feed: Arc<dyn DataFeed> = Arc::new(SimulatedFeed::new(dashboard.settings().refresh_rate_secs));

    let summary = build_controllers(&dashboard, &feed)?;
    for (pin, result) in dashboard.restore_pins() {
        match result {
            Ok(_) => output::print_info(&format!("Restored pin '{}'", pin.name)),
            Err(err) => log::warn!("Pin '{}' not restored: {err}", pin.name),
        }
    }
    for name in pins {
        let card = summary.request_pin(name).map_err(|e| e.to_string())?;
        output::print_info(&format!("Pinned '{}'", card.identity().full_name()));
    }

    let mut scheduler_settings = SchedulerSettings::from(dashboard.settings());
    if let Some(ms) = period_ms {
        scheduler_settings.refresh_period = Duration::from_millis(ms.max(1));
    }
    let timeout = scheduler_settings.refresh_period + Duration::from_secs(5);
    let service = SchedulerService::new(scheduler_settings)?;
    for group in dashboard.groups() {
        service.add_group(group);
    }
    service.refresh_now();

    let mut seen = 0;
    let mut failure = None;
    while seen < cycles {
        match service.wait_for_cycles(seen + 1, timeout) {
            Ok(state) => {
                output::print_cycle(&state);
                seen = state.cycle;
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    service.shutdown()?;

    if let Some(path) = board_path {
        save_board(&dashboard, path)?;
    }
    dashboard.shutdown();
    failure.map_or(Ok(()), Err)
}

fn save_board(dashboard: &Dashboard, path: &Path) -> Result<(), String> {
    dashboard
        .pin_board()
        .save_to_file(path)
        .map_err(|e| format!("Failed to save pin board '{}': {e}", path.display()))?;
    output::print_info(&format!(
        "Saved {} pin(s) to {}",
        dashboard.pin_board().pins().len(),
        path.display()
    ));
    Ok(())
}
