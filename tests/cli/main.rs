use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const P2P_DONE: &str = "let socket: UdpSocket = bind_broadcast(); // peer_registry heartbeat ping pong\n";
const TOR_DONE: &str = "// SOCKS5 proxy integration, one circuit per peer\n";
const QR_DONE: &str = "// qr_code: generate, parse, join_network\n";

fn agent(root: &Path, args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_brezn-agent"))
    .args(args)
    .current_dir(root)
    .env("RUST_LOG", "warn")
    .output()
    .expect("run brezn-agent")
}

fn repo(files: &[(&str, &str)]) -> tempfile::TempDir {
  let dir = tempfile::tempdir().unwrap();
  let src = dir.path().join("brezn/src");
  std::fs::create_dir_all(&src).unwrap();
  for (name, content) in files {
    std::fs::write(src.join(name), content).unwrap();
  }
  dir
}

fn stdout_json(output: &Output) -> Value {
  serde_json::from_slice(&output.stdout).expect("stdout is a JSON report")
}

#[test]
fn all_features_completed_exits_zero() {
  let dir = repo(&[
    ("network.rs", P2P_DONE),
    ("tor.rs", TOR_DONE),
    ("discovery.rs", QR_DONE),
  ]);

  let output = agent(dir.path(), &[]);
  assert_eq!(output.status.code(), Some(0));

  let report = stdout_json(&output);
  assert_eq!(report["next_feature"], "none");
  assert_eq!(report["mvp_progress"], 100);
  assert_eq!(report["completed_features"], 3);
  assert_eq!(report["implementation_success"], true);
  assert!(report.get("last_implementation").is_none());
}

#[test]
fn missing_target_file_exits_one() {
  let dir = repo(&[]);

  let output = agent(dir.path(), &["run"]);
  assert_eq!(output.status.code(), Some(1));

  let report = stdout_json(&output);
  assert_eq!(report["mvp_progress"], 0);
  assert_eq!(report["next_feature"], "p2p-peer-discovery");
  assert_eq!(report["last_implementation"], "p2p-peer-discovery");
  assert_eq!(report["implementation_success"], false);
  assert_eq!(report["features"]["p2p-peer-discovery"]["status"], "pending");
}

#[test]
fn no_insertion_point_leaves_file_and_exits_one() {
  let original = "// placeholder without any item bodies\n";
  let dir = repo(&[("network.rs", P2P_DONE), ("tor.rs", original)]);

  let output = agent(dir.path(), &[]);
  assert_eq!(output.status.code(), Some(1));
  assert_eq!(stdout_json(&output)["next_feature"], "tor-integration");
  assert_eq!(
    std::fs::read_to_string(dir.path().join("brezn/src/tor.rs")).unwrap(),
    original
  );
}

#[test]
fn status_reports_without_modifying() {
  let network = "pub struct P2PNetworkManager {}\n";
  let dir = repo(&[("network.rs", network)]);

  let output = agent(dir.path(), &["status"]);
  assert_eq!(output.status.code(), Some(0));

  let status = stdout_json(&output);
  assert_eq!(status["next_feature"], "p2p-peer-discovery");
  assert_eq!(status["total_features"], 3);
  assert!(status.get("implementation_success").is_none());
  assert_eq!(
    std::fs::read_to_string(dir.path().join("brezn/src/network.rs")).unwrap(),
    network
  );
}

#[test]
fn output_flag_writes_report_file() {
  let dir = repo(&[
    ("network.rs", P2P_DONE),
    ("tor.rs", TOR_DONE),
    ("discovery.rs", QR_DONE),
  ]);

  let output = agent(dir.path(), &["run", "--output", "agent-report.json"]);
  assert_eq!(output.status.code(), Some(0));

  let written: Value =
    serde_json::from_str(&std::fs::read_to_string(dir.path().join("agent-report.json")).unwrap())
      .unwrap();
  assert_eq!(written, stdout_json(&output));
}

#[test]
fn config_file_overrides_source_dir() {
  let dir = tempfile::tempdir().unwrap();
  let src = dir.path().join("crates/app/src");
  std::fs::create_dir_all(&src).unwrap();
  std::fs::write(src.join("network.rs"), P2P_DONE).unwrap();
  std::fs::write(
    dir.path().join("brezn-agent.yaml"),
    "src_dir: crates/app/src\nbuild_dir: crates/app\n",
  )
  .unwrap();

  let output = agent(dir.path(), &["status"]);
  assert_eq!(output.status.code(), Some(0));
  let status = stdout_json(&output);
  assert_eq!(status["completed_features"], 1);
  assert_eq!(status["mvp_progress"], 33);
}

#[test]
fn explicit_missing_config_is_fatal() {
  let dir = repo(&[]);

  let output = agent(dir.path(), &["--config", "missing.yaml", "status"]);
  assert_eq!(output.status.code(), Some(1));
  assert!(output.stdout.is_empty());
  assert!(String::from_utf8_lossy(&output.stderr).contains("config file not found"));
}
