#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn falcon(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("falcon").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("FALCON_URL")
        .env_remove("FALCON_ANON_KEY")
        .env_remove("FALCON_ACCESS_TOKEN")
        .env_remove("RUST_LOG")
        .env("FALCON_CONFIG", dir.path().join("config.yaml"));
    cmd
}

fn connected(dir: &TempDir, url: &str) -> Command {
    let mut cmd = falcon(dir);
    cmd.args(["--url", url, "--anon-key", "anon-key"]);
    cmd
}

// ---------------------------------------------------------------------------
// falcon views
// ---------------------------------------------------------------------------

#[test]
fn views_encode_prints_query_string() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args([
            "views",
            "encode",
            "--status",
            "new",
            "--status",
            "in_review",
            "--assignee",
            "unassigned",
            "--q",
            "elm st",
            "--page",
            "2",
        ])
        .assert()
        .success()
        .stdout("status=new&status=in_review&assigneeId=unassigned&q=elm+st&page=2\n");
}

#[test]
fn views_decode_json() {
    let dir = TempDir::new().unwrap();
    let output = falcon(&dir)
        .args(["--json", "views", "decode", "?status=completed&pageSize=50&bogus=1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], serde_json::json!(["completed"]));
    assert_eq!(value["page_size"], 50);
    assert_eq!(value["page"], 1);
}

#[test]
fn views_save_list_delete() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["views", "save", "mine", "--query", "status=new", "--q", "oak"])
        .assert()
        .success()
        .stdout(predicate::str::contains("?status=new&q=oak"));
    assert!(dir.path().join("views.yaml").exists());

    falcon(&dir)
        .args(["views", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mine"))
        .stdout(predicate::str::contains("status=new&q=oak"));

    falcon(&dir)
        .args(["views", "delete", "mine"])
        .assert()
        .success();

    falcon(&dir)
        .args(["views", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved views."));
}

#[test]
fn views_delete_unknown_fails() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["views", "delete", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

// ---------------------------------------------------------------------------
// falcon config
// ---------------------------------------------------------------------------

#[test]
fn config_init_then_validate() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["--url", "https://db.example.co", "--anon-key", "k", "config", "init"])
        .assert()
        .success();
    let written = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(written.contains("https://db.example.co"));

    // Settings now come from the file alone.
    falcon(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no access_token"));
}

#[test]
fn config_validate_fails_without_url() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("url is not set"))
        .stderr(predicate::str::contains("error(s)"));
}

#[test]
fn config_show_redacts_token() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["--token", "secret-jwt", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("secret-jwt").not());
}

// ---------------------------------------------------------------------------
// Remote commands
// ---------------------------------------------------------------------------

#[test]
fn remote_command_without_url_fails() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["clients", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("url is not set"));
}

#[test]
fn clients_list_against_backend() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/rest/v1/clients")
        .match_header("apikey", "anon-key")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[{"id":"6f1c1b1e-0000-4000-8000-0000000000c1","display_name":"Acme Lending"}]"#,
        )
        .create();

    connected(&dir, &server.url())
        .args(["clients", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Lending"));
    mock.assert();
}

#[test]
fn users_list_json() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", mockito::Matcher::Regex("^/rest/v1/".into()))
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id":"6f1c1b1e-0000-4000-8000-0000000000a1","full_name":null}]"#)
        .create();

    let output = connected(&dir, &server.url())
        .args(["--json", "users", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["id"], "6f1c1b1e-0000-4000-8000-0000000000a1");
}

#[test]
fn backend_error_message_reaches_stderr() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/rest/v1/clients")
        .match_query(mockito::Matcher::Any)
        .with_status(403)
        .with_body(r#"{"code":"42501","message":"permission denied for table clients"}"#)
        .create();

    connected(&dir, &server.url())
        .args(["clients", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied for table clients"));
}

#[test]
fn prefs_set_without_flags_is_rejected() {
    let dir = TempDir::new().unwrap();
    connected(&dir, "http://127.0.0.1:9")
        .args(["prefs", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

#[test]
fn kanban_wip_flag_is_validated() {
    let dir = TempDir::new().unwrap();
    falcon(&dir)
        .args(["kanban", "set", "--wip", "done=3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--wip"));
}
