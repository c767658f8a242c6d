use identity::PinDescription;
use perf_core::RefreshSummary;
use perf_runtime::SchedulerState;

pub fn print_info(message: &str) {
    println!("[perfmon][INFO] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[perfmon][ERROR]: {message}");
}

pub fn print_pin_list(board: &str, pins: &[PinDescription]) {
    if pins.is_empty() {
        print_info(&format!("No pins on board '{board}'"));
        return;
    }
    print_info(&format!("Pins on board '{board}':"));
    for pin in pins {
        println!(
            "{} [{}] {} - {}",
            pin.chart_name(),
            pin.provider,
            pin.name,
            pin.description
        );
    }
}

pub fn print_pin_json(pins: &[PinDescription]) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(pins).map_err(|e| format!("Failed to encode pins: {e}"))?;
    println!("{json}");
    Ok(())
}

fn format_summary(name: &str, summary: &RefreshSummary) -> String {
    let mut line = format!(
        "\t{name}: {} refreshed, {} skipped, {} failed",
        summary.refreshed, summary.skipped, summary.failed
    );
    if summary.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}

pub fn print_cycle(state: &SchedulerState) {
    print_info(&format!("Cycle {}", state.cycle));
    for (name, summary) in &state.summaries {
        println!("{}", format_summary(name, summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_marks_cancellation() {
        let summary = RefreshSummary {
            refreshed: 2,
            skipped: 1,
            failed: 0,
            cancelled: true,
        };
        assert_eq!(
            format_summary("summary", &summary),
            "\tsummary: 2 refreshed, 1 skipped, 0 failed (cancelled)"
        );
    }
}
