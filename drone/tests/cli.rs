use std::process::Command;

#[test]
fn test_missing_model_exits_with_status_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_drone"))
        .args(["--model", "does/not/exist.xml", "--headless", "--duration", "0.1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Starting simulation"), "{stderr}");
}

#[test]
fn test_headless_run_stops_after_duration() {
    let model = concat!(env!("CARGO_MANIFEST_DIR"), "/../models/drone.xml");
    let output = Command::new(env!("CARGO_BIN_EXE_drone"))
        .args(["--model", model, "--headless", "--duration", "0.05"])
        .output()
        .unwrap();

    assert!(output.status.success());
}
