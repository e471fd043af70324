// Runs the dscan binary and checks exit codes and log output per failure class.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const RECORD_BODY: &str = r#"{"registrar":{"name":"ACME"},"registrant":{"country":"US"}}"#;

/// Command with a clean `DSCAN_*` environment pointing at `dir`. The working
/// directory is `dir` as well, so no stray `.dScan` file is picked up.
fn dscan(dir: &Path, endpoint: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dscan"));
    cmd.current_dir(dir);
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("DSCAN_") {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG")
        .env("DSCAN_JSON_FILE_NAME", "whois")
        .env("DSCAN_JSON_EXTENSION", "json")
        .env("DSCAN_JSON_SIZE_LIMIT", "1048576")
        .env("DSCAN_OUTPUT_DIR", dir)
        .env("DSCAN_LOG_FILE_NAME", dir.join("dscan.log"))
        .env("DSCAN_DOMAIN_FILE", dir.join("domains.txt"))
        .env("DSCAN_WHOIS_API_URL", endpoint)
        .env("DSCAN_WHOIS_API_TOKEN", "test-token")
        .env("DSCAN_WHOIS_TIMEOUT_SECS", "5");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run dscan")
}

fn log_of(dir: &Path) -> String {
    fs::read_to_string(dir.join("dscan.log")).unwrap_or_default()
}

#[test]
fn test_successful_scan_exits_zero() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1/www.example.com")
        .match_header("authorization", "test-token")
        .with_status(200)
        .with_body(RECORD_BODY)
        .create();

    let output = run(&mut dscan(dir.path(), &server.url()));

    mock.assert();
    assert_eq!(output.status.code(), Some(0), "{}", log_of(dir.path()));
    let log = log_of(dir.path());
    assert!(log.contains("INFO: Reached end of domain file after 1 lines"), "{}", log);
    assert!(!log.contains("ERROR:"), "{}", log);
    let written = fs::read_to_string(dir.path().join("whois-1.json")).unwrap();
    assert_eq!(written.lines().count(), 1);
}

#[test]
fn test_missing_setting_exits_two_and_reports_on_stderr() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();

    let output = run(dscan(dir.path(), "http://127.0.0.1:1").env_remove("DSCAN_WHOIS_API_TOKEN"));

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR:"), "{}", stderr);
    assert!(stderr.contains("lookup_api_token"), "{}", stderr);
    assert!(!dir.path().join("dscan.log").exists());
}

#[test]
fn test_empty_domain_file_exits_three() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "").unwrap();

    let output = run(&mut dscan(dir.path(), "http://127.0.0.1:1"));

    assert_eq!(output.status.code(), Some(3));
    assert!(log_of(dir.path()).contains("ERROR:"));
    assert!(!dir.path().join("whois-1.json").exists());
}

#[test]
fn test_malformed_output_name_exits_five() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();
    fs::write(dir.path().join("whois-backup.json"), "").unwrap();

    let output = run(&mut dscan(dir.path(), "http://127.0.0.1:1"));

    assert_eq!(output.status.code(), Some(5));
    assert!(log_of(dir.path()).contains("whois-backup.json"));
}

#[test]
fn test_unreachable_api_exits_six_without_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();

    let output = run(&mut dscan(dir.path(), "http://127.0.0.1:1"));

    assert_eq!(output.status.code(), Some(6));
    assert!(log_of(dir.path()).contains("ERROR:"));
    assert!(!dir.path().join("whois-1.json").exists());
}

#[test]
fn test_undecodable_response_exits_seven() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v1/www.example.com")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let output = run(&mut dscan(dir.path(), &server.url()));

    assert_eq!(output.status.code(), Some(7));
    let log = log_of(dir.path());
    assert!(log.contains("ERROR:"), "{}", log);
    assert!(log.contains("example.com"), "{}", log);
}
