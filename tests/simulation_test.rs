use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_intersection_sim"))
        .args(args)
        .env("RUST_LOG", "warn,intersection_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that every preset runs headless and the run is reported complete
#[test]
fn test_headless_simulation_runs() {
    let output = run_cli(&["--ticks", "400"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    for scenario in ["light", "moderate", "rush-hour", "asymmetric"] {
        assert!(
            stdout.contains(&format!("=== Scenario: {} ===", scenario)),
            "Missing comparison for {}",
            scenario
        );
    }
}

/// Test that both strategies are compared for a selected scenario
#[test]
fn test_comparison_table_lists_both_strategies() {
    let output = run_cli(&["--scenarios", "light", "--ticks", "300", "--verbose"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Scenario: light ==="));
    assert!(!stdout.contains("=== Scenario: moderate ==="));
    assert!(stdout.lines().any(|line| line.starts_with("fixed")));
    assert!(stdout.lines().any(|line| line.starts_with("adaptive")));
    assert!(stdout.contains("Adaptive wait change vs fixed:"));
    assert!(stdout.contains("Average wait:"), "Verbose metrics missing");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("served="),
        "Per-run summary was not logged. stderr: {}",
        stderr
    );
}

/// Test that seeded random arrivals can run on parallel threads
#[test]
fn test_seeded_parallel_run() {
    let output = run_cli(&[
        "--scenarios",
        "moderate,rush-hour",
        "--ticks",
        "300",
        "--seed",
        "7",
        "--parallel",
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Scenario: moderate ==="));
    assert!(stdout.contains("=== Scenario: rush-hour ==="));
}

/// Test that invalid arguments are rejected
#[test]
fn test_invalid_arguments_fail() {
    let unknown = run_cli(&["--scenarios", "gridlock"]);
    assert!(!unknown.status.success(), "Unknown scenario was accepted");

    let empty = run_cli(&["--ticks", "0"]);
    assert!(!empty.status.success(), "Zero ticks was accepted");
}
