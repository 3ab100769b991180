use std::process::Command;

#[test]
fn test_headless_missing_model_exits_with_status_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_rover_headless"))
        .args(["--model", "does/not/exist.xml", "--steps", "5"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Time:"), "state was stepped: {stdout}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load model"), "{stderr}");
}

#[test]
fn test_viewer_bin_missing_model_exits_with_status_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_rover"))
        .args(["--model", "does/not/exist.xml", "--headless", "--duration", "0.1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Simulation State"));
}

#[test]
fn test_headless_runs_requested_steps() {
    let model = concat!(env!("CARGO_MANIFEST_DIR"), "/../models/tb3.xml");
    let output = Command::new(env!("CARGO_BIN_EXE_rover_headless"))
        .args(["--model", model, "--steps", "3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().filter(|l| l.starts_with("Time:")).count(), 3);
}
