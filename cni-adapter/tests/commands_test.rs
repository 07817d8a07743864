use clap::Parser;
use std::ffi::OsString;
use std::fs;
use tempfile::TempDir;

use cni_adapter::commands::{
    parse_state, resolve_config, resolve_network_spec, run_hook, wants_usage, Action, Cli,
};
use cni_adapter::error::StateError;
use cni_adapter::AdapterConfig;

fn args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

#[test]
fn test_usage_requests() {
    assert!(wants_usage(&args(&["cni-adapter"])));
    assert!(wants_usage(&args(&["cni-adapter", "-h"])));
    assert!(wants_usage(&args(&["cni-adapter", "--help"])));
    assert!(!wants_usage(&args(&["cni-adapter", "--action", "up"])));
}

#[test]
fn test_cli_parses_flags() {
    let cli = Cli::try_parse_from([
        "cni-adapter",
        "--action=up",
        "--handle=some-container-handle",
        "--network=10.0.0.0/24",
        "--configFile=/etc/cni-adapter.json",
    ])
    .unwrap();

    assert_eq!(cli.action, Action::Up);
    assert_eq!(cli.handle, "some-container-handle");
    assert_eq!(cli.network.as_deref(), Some("10.0.0.0/24"));
    assert_eq!(
        cli.config_file.as_deref().and_then(|p| p.to_str()),
        Some("/etc/cni-adapter.json")
    );
}

#[test]
fn test_cli_rejects_bad_input() {
    assert!(Cli::try_parse_from(["cni-adapter", "--action=sideways", "--handle=h"]).is_err());
    assert!(Cli::try_parse_from(["cni-adapter", "--action=up"]).is_err());
    assert!(Cli::try_parse_from(["cni-adapter", "--action=up", "--handle=h", "something-else"]).is_err());
}

#[test]
fn test_flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("adapter.json");
    fs::write(
        &path,
        r#"{"cni_plugin_dir": "/opt/cni/bin", "cni_config_dir": "/etc/cni/net.d", "bind_mount_dir": "/from/file"}"#,
    )
    .unwrap();
    let path = path.to_str().unwrap();

    let cli = Cli::try_parse_from([
        "cni-adapter",
        "--action=down",
        "--handle=h",
        "--config-file",
        path,
        "--bind-mount-dir=/from/flag",
        "--log-dir=/tmp/logs",
    ])
    .unwrap();
    let config = resolve_config(&cli).unwrap();

    assert_eq!(config.cni_plugin_dir.to_str(), Some("/opt/cni/bin"));
    assert_eq!(config.bind_mount_dir.to_str(), Some("/from/flag"));
    assert_eq!(config.log_dir.as_deref().and_then(|p| p.to_str()), Some("/tmp/logs"));
}

#[test]
fn test_missing_directories_are_reported() {
    let cli = Cli::try_parse_from(["cni-adapter", "--action=up", "--handle=h", "--cni-plugin-dir=/bin"]).unwrap();
    let err = resolve_config(&cli).unwrap_err();
    assert_eq!(err.to_string(), "missing required config 'cni_config_dir'");
}

#[test]
fn test_state_parsing() {
    assert_eq!(parse_state(br#"{ "pid": 1234 }"#).unwrap().require_pid().unwrap(), 1234);

    // Extra OCI state fields are ignored
    let state = parse_state(br#"{"ociVersion":"1.0.2","id":"c","status":"created","pid":7,"bundle":"/b"}"#).unwrap();
    assert_eq!(state.pid, Some(7));
}

#[test]
fn test_state_errors() {
    let err = parse_state(b"{{{bad").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("json"), "{}", msg);
    assert!(msg.contains("{{{bad"), "{}", msg);

    let state = parse_state(br#"{ "something": 12 }"#).unwrap();
    let err = state.require_pid().unwrap_err();
    assert!(matches!(err, StateError::MissingPid(_)));
    assert!(err.to_string().contains("missing pid"));

    assert!(parse_state(br#"{ "pid": "not-a-number" }"#).is_err());
}

#[test]
fn test_network_flag_wins() {
    let cli = Cli::try_parse_from(["cni-adapter", "--action=up", "--handle=h", "--network", r#"{"a":"b"}"#]).unwrap();
    let spec = resolve_network_spec(&cli, &AdapterConfig::default()).unwrap();
    assert_eq!(spec, r#"{"a":"b"}"#);

    let cli = Cli::try_parse_from(["cni-adapter", "--action=up", "--handle=h"]).unwrap();
    let spec = resolve_network_spec(&cli, &AdapterConfig::default()).unwrap();
    assert_eq!(spec, "");
}

#[test]
fn test_up_without_pid_fails_before_mounting() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("netns");
    let cli = Cli::try_parse_from(["cni-adapter", "--action=up", "--handle=h"]).unwrap();
    let config = AdapterConfig {
        cni_plugin_dir: dir.path().join("bin"),
        cni_config_dir: dir.path().join("net.d"),
        bind_mount_dir: root.clone(),
        ..AdapterConfig::default()
    };

    let err = run_hook(&cli, &config, br#"{ "something": 12 }"#).unwrap_err();

    assert!(format!("{:#}", err).contains("missing pid"));
    assert!(!root.exists());
}

#[test]
fn test_down_of_unknown_handle_succeeds() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("net.d");
    fs::create_dir_all(&config_dir).unwrap();
    let cli = Cli::try_parse_from(["cni-adapter", "--action=down", "--handle=h"]).unwrap();
    let config = AdapterConfig {
        cni_plugin_dir: dir.path().join("bin"),
        cni_config_dir: config_dir,
        bind_mount_dir: dir.path().join("netns"),
        ..AdapterConfig::default()
    };

    run_hook(&cli, &config, b"{}").unwrap();
}
