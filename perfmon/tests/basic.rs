use std::process::Command;

const EXE: &str = env!("CARGO_BIN_EXE_perfmon");

#[test]
fn run_refreshes_and_saves_pins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let board = dir.path().join("board.json");

    let output = Command::new(EXE)
        .args(["run", "--cycles", "2", "--period-ms", "10", "--pin", "bandwidth", "--board"])
        .arg(&board)
        .output()
        .expect("run perfmon");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("[perfmon][INFO] Pinned 'Bandwidth'"));
    assert!(stdout.contains("[perfmon][INFO] Cycle 2"));
    assert!(stdout.contains("summary: 3 refreshed"));
    assert!(board.exists());

    let output = Command::new(EXE)
        .args(["pins", "--board"])
        .arg(&board)
        .output()
        .expect("list pins");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("bandwidth [summary] Bandwidth"));
}

#[test]
fn saved_pins_are_restored_on_the_next_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let board = dir.path().join("board.json");

    let status = Command::new(EXE)
        .args(["run", "--cycles", "1", "--period-ms", "10", "--pin", "packet_rate", "--board"])
        .arg(&board)
        .status()
        .expect("run perfmon");
    assert!(status.success());

    let output = Command::new(EXE)
        .args(["run", "--cycles", "1", "--period-ms", "10", "--board"])
        .arg(&board)
        .output()
        .expect("run perfmon again");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Restored pin 'Packet Rate'"));

    let output = Command::new(EXE)
        .args(["pins", "--json", "--board"])
        .arg(&board)
        .output()
        .expect("list pins");
    let pins: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("pin json");
    assert_eq!(pins.as_array().map(Vec::len), Some(1));
    assert_eq!(pins[0]["provider"], "summary");
}

#[test]
fn unknown_item_reports_error() {
    let output = Command::new(EXE)
        .args(["run", "--cycles", "1", "--period-ms", "10", "--pin", "latency"])
        .output()
        .expect("run perfmon");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[perfmon][ERROR]: cannot find performance item 'latency'"));
}

#[test]
fn missing_board_file_is_an_error_for_pins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = Command::new(EXE)
        .args(["pins", "--board"])
        .arg(dir.path().join("missing.json"))
        .output()
        .expect("list pins");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load pin board"));
}
