//! Integration tests for acoubeam-cli.
//!
//! Each test writes a study into a temporary directory, simulates its
//! recording with the binary and runs the analysis commands on it.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `acoubeam` binary built by cargo.
fn acoubeam_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_acoubeam"))
}

fn run(args: &[&str]) -> Output {
    acoubeam_bin().args(args).output().expect("failed to run acoubeam")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Six microphones on a ring plus one in the centre, grid around the axis.
const STUDY: &str = r#"
[time_data]
path = "run.wav"

[microphones]
positions = [
    [0.3, 0.0, 0.0],
    [0.15, 0.26, 0.0],
    [-0.15, 0.26, 0.0],
    [-0.3, 0.0, 0.0],
    [-0.15, -0.26, 0.0],
    [0.15, -0.26, 0.0],
    [0.0, 0.0, 0.0],
]

[grid]
x_min = -0.4
x_max = 0.4
y_min = -0.4
y_max = 0.4
z = 0.8
increment = 0.1

[spectra]
block_size = 512
window = "hanning"
overlap = "50%"

[beamformer]
algorithm = "base"
c = 343.0

[cache]
dir = "cache"
"#;

/// Write the study and simulate a 2 kHz source at (0.2, -0.1, 0.8).
fn setup() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let study = tmp.path().join("study.toml");
    std::fs::write(&study, STUDY).unwrap();
    let study = study.to_string_lossy().into_owned();

    let output = run(&[
        "simulate",
        "--study",
        &study,
        "--source",
        "0.2,-0.1,0.8",
        "--freq",
        "2000",
        "--duration",
        "0.5",
        "--sample-rate",
        "16000",
    ]);
    assert!(output.status.success(), "simulate failed: {:?}", output);
    assert!(tmp.path().join("run.wav").is_file());
    (tmp, study)
}

fn cache_files(dir: &Path) -> usize {
    std::fs::read_dir(dir.join("cache"))
        .map(|d| d.filter_map(Result::ok).count())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// acoubeam map
// ---------------------------------------------------------------------------

#[test]
fn map_reports_peak_at_simulated_source() {
    let (tmp, study) = setup();
    let csv = tmp.path().join("map.csv");
    let output = run(&[
        "map",
        "--study",
        &study,
        "--freq",
        "2000",
        "--csv",
        csv.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "map failed: {:?}", output);
    let out = stdout(&output);
    assert!(out.contains("Peak at (0.200, -0.100, 0.800)"), "got: {out}");

    let text = std::fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x,y,z,power,level_db"));
    assert_eq!(lines.count(), 81);

    // cross-spectral matrix and map persisted next to the study
    assert_eq!(cache_files(tmp.path()), 2);
}

#[test]
fn map_without_cache_writes_nothing() {
    let (tmp, study) = setup();
    let output = run(&["map", "--study", &study, "--freq", "2000", "--band", "3", "--no-cache"]);
    assert!(output.status.success(), "map failed: {:?}", output);
    assert_eq!(cache_files(tmp.path()), 0);
}

#[test]
fn map_rejects_invalid_study() {
    let tmp = TempDir::new().unwrap();
    let study = tmp.path().join("bad.toml");
    std::fs::write(&study, STUDY.replace("block_size = 512", "block_size = 500")).unwrap();
    let output = run(&["map", "--study", study.to_str().unwrap(), "--freq", "2000"]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("spectra.block_size"), "got: {err}");
}

#[test]
fn single_point_grid_reports_out_of_range_band() {
    let (tmp, _) = setup();
    let study = tmp.path().join("point.toml");
    let single = STUDY
        .replace("x_min = -0.4", "x_min = 0.2")
        .replace("x_max = 0.4", "x_max = 0.2")
        .replace("y_min = -0.4", "y_min = -0.1")
        .replace("y_max = 0.4", "y_max = -0.1");
    std::fs::write(&study, single).unwrap();
    let study = study.to_string_lossy().into_owned();

    let output = run(&["map", "--study", &study, "--freq", "2000", "--no-cache"]);
    assert!(output.status.success(), "map failed: {:?}", output);
    assert!(stdout(&output).contains("Peak at (0.200, -0.100, 0.800)"));

    // 16 kHz sampling: nothing analysed at 20 kHz
    let output = run(&["map", "--study", &study, "--freq", "20000", "--no-cache"]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("No frequency lines near 20000 Hz"), "got: {err}");
}

#[test]
fn missing_study_is_an_error() {
    let output = run(&["map", "--study", "nonexistent_study_12345", "--freq", "1000"]);
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// acoubeam spectra
// ---------------------------------------------------------------------------

#[test]
fn spectra_lists_eigenvalues() {
    let (_tmp, study) = setup();
    let output = run(&["spectra", "--study", &study, "--freq", "2000", "--band", "1"]);
    assert!(output.status.success(), "spectra failed: {:?}", output);
    let out = stdout(&output);
    // 8000 samples, 512 block, 50% overlap: 2 * 15 - 1 blocks
    assert!(out.contains("Blocks: 29 x 512"), "got: {out}");
    assert!(out.contains("hanning window"), "got: {out}");
    let rows = out.lines().filter(|l| l.trim_end().ends_with("dB")).count();
    assert_eq!(rows, 7);
}

// ---------------------------------------------------------------------------
// acoubeam cache
// ---------------------------------------------------------------------------

#[test]
fn cache_list_and_clear() {
    let (tmp, study) = setup();
    let output = run(&["map", "--study", &study, "--freq", "2000"]);
    assert!(output.status.success());

    let output = run(&["cache", "list", "--study", &study]);
    assert!(output.status.success(), "cache list failed: {:?}", output);
    let out = stdout(&output);
    assert!(out.contains("cross-spectral matrix"), "got: {out}");
    assert!(out.contains("delay-and-sum"), "got: {out}");
    assert!(out.contains("2 artifact(s)"), "got: {out}");

    let dir = tmp.path().join("cache");
    let output = run(&["cache", "clear", "--dir", dir.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Removed 2 artifact(s)"));
    assert_eq!(cache_files(tmp.path()), 0);
}

#[test]
fn cache_list_of_missing_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("none");
    let output = run(&["cache", "list", "--dir", dir.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No cache at"));
}
