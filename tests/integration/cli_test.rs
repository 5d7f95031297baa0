use std::path::Path;
use std::process::{Output, Stdio};

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHORUS_BIN: &str = env!("CARGO_BIN_EXE_chorus");

/// Builds a `chorus` invocation isolated from the developer's own config files
/// and environment.
fn chorus_command(home: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(CHORUS_BIN);
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("CHORUS_API_BASE")
        .env_remove("VITE_API_BASE")
        .env_remove("CHORUS_LOG_LEVEL")
        .env_remove("CHORUS_POLL_INTERVAL_MS")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null());
    cmd
}

async fn run_chorus(args: &[&str]) -> Output {
    let home = tempfile::tempdir().unwrap();
    chorus_command(home.path(), args)
        .output()
        .await
        .expect("Failed to execute chorus command")
}

async fn run_against(server: &MockServer, args: &[&str]) -> Output {
    let uri = server.uri();
    let mut full = vec!["--base-url", uri.as_str()];
    full.extend_from_slice(args);
    run_chorus(&full).await
}

fn output_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn room_json(id: i64, name: &str, scenario: &str) -> Value {
    json!({"id": id, "name": name, "scenario": scenario, "created_at": "2025-03-01T12:00:00"})
}

async fn mount_rooms(server: &MockServer, rooms: Value) {
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms))
        .mount(server)
        .await;
}

async fn mount_room_one(server: &MockServer) {
    mount_rooms(server, json!([room_json(1, "Lunch debate", "debate")])).await;
    Mock::given(method("GET"))
        .and(path("/agents/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "room_id": 1, "name": "Alex", "role": "Pro side", "goal": "Argue in favor."}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/messages/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

mod version_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_version_command_basic() {
        let output = run_chorus(&["version"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "version command should succeed");
        assert!(stdout.contains("chorus"), "output should contain 'chorus'");
        assert!(stdout.contains("0.1.0"), "output should contain version number");
    }

    #[tokio::test]
    async fn test_version_command_detailed() {
        let output = run_chorus(&["version", "--detailed"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("Version"));
        assert!(stdout.contains("Apache-2.0"));
    }

    #[tokio::test]
    async fn test_version_ignores_broken_base_url() {
        let output = run_chorus(&["--base-url", "not a url", "version"]).await;
        assert!(output.status.success(), "version must not load configuration");
    }
}

mod help_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_help_lists_commands() {
        let output = run_chorus(&["--help"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        for command in ["status", "rooms", "agents", "say", "turn", "judge", "topic", "reset", "export", "watch"] {
            assert!(stdout.contains(command), "help should mention {command}");
        }
    }

    #[tokio::test]
    async fn test_unknown_command_fails() {
        let output = run_chorus(&["dance"]).await;
        assert!(!output.status.success());
    }
}

mod config_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_base_url_is_rejected() {
        let output = run_chorus(&["--base-url", "ftp://example.com", "rooms", "list"]).await;
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("[E2002]"), "stderr was: {stderr}");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_network_failure() {
        let output = run_chorus(&["--base-url", "http://127.0.0.1:1", "rooms", "list"]).await;
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("[E3001]"), "stderr was: {stderr}");
        assert!(stderr.contains("Suggestion"));
    }
}

mod rooms_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_rooms_list_json() {
        let server = MockServer::start().await;
        mount_rooms(
            &server,
            json!([room_json(2, "Standup", "planning"), room_json(1, "Lunch debate", "debate")]),
        )
        .await;

        let output = run_against(&server, &["rooms", "list", "--format", "json"]).await;
        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));

        let rooms: Value = serde_json::from_str(&output_to_string(&output)).unwrap();
        let names: Vec<&str> = rooms
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Standup", "Lunch debate"]);
    }

    #[tokio::test]
    async fn test_rooms_list_table() {
        let server = MockServer::start().await;
        mount_rooms(&server, json!([room_json(1, "Lunch debate", "debate")])).await;

        let output = run_against(&server, &["rooms"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("Lunch debate"));
        assert!(stdout.contains("debate"));
    }

    #[tokio::test]
    async fn test_rooms_create_blank_name_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let output = run_against(&server, &["rooms", "create", "   "]).await;
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("[E1001]"), "stderr was: {stderr}");
    }

    #[tokio::test]
    async fn test_rooms_create_posts_scenario() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(body_json(json!({"name": "Standup", "scenario": "planning"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(room_json(5, "Standup", "planning")))
            .expect(1)
            .mount(&server)
            .await;

        let output =
            run_against(&server, &["rooms", "create", "Standup", "--scenario", "planning"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(stdout.contains("Standup"));
        assert!(stdout.contains("#5"));
    }

    #[tokio::test]
    async fn test_rooms_create_custom_scenario_warns_and_sends_name_as_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(body_json(json!({"name": " Roundtable ", "scenario": "roundtable"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(room_json(6, " Roundtable ", "roundtable")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let output = run_against(
            &server,
            &["rooms", "create", " Roundtable ", "--scenario", "roundtable"],
        )
        .await;
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(stdout.contains("'roundtable' is not a built-in scenario"));
    }

    #[tokio::test]
    async fn test_rooms_templates_work_offline() {
        let output = run_chorus(&["--base-url", "http://127.0.0.1:1", "rooms", "templates"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("debate"));
        assert!(stdout.contains("planning"));
    }

    #[tokio::test]
    async fn test_rooms_delete_missing_room_fails() {
        let server = MockServer::start().await;
        mount_rooms(&server, json!([])).await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/42"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Room not found"))
            .mount(&server)
            .await;

        let output = run_against(&server, &["rooms", "delete", "42", "--yes"]).await;
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("[E4001] Room not found"), "stderr was: {stderr}");
    }

    #[tokio::test]
    async fn test_rooms_delete_declined_sends_nothing() {
        let server = MockServer::start().await;
        mount_rooms(&server, json!([room_json(1, "Lunch debate", "debate")])).await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let home = tempfile::tempdir().unwrap();
        let uri = server.uri();
        let mut child = chorus_command(home.path(), &["--base-url", &uri, "rooms", "delete", "1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"n\n").await.unwrap();
        drop(stdin);

        let output = child.wait_with_output().await.unwrap();
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("'Lunch debate' (#1)"));
        assert!(stdout.contains("Cancelled"));
    }
}

mod conversation_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_say_posts_human_message() {
        let server = MockServer::start().await;
        mount_room_one(&server).await;
        Mock::given(method("POST"))
            .and(path("/messages/human/1"))
            .and(body_json(json!({"content": "Pizza or tacos?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 9, "room_id": 1, "agent_id": null,
                "content": "Pizza or tacos?", "created_at": "2025-03-01T12:05:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = run_against(&server, &["say", "1", "Pizza or tacos?"]).await;

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(output_to_string(&output).contains("#9"));
    }

    #[tokio::test]
    async fn test_say_empty_content_sends_nothing() {
        let server = MockServer::start().await;
        mount_room_one(&server).await;
        Mock::given(method("POST"))
            .and(path("/messages/human/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let output = run_against(&server, &["say", "1", "  "]).await;
        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("[E1001]"));
    }

    #[tokio::test]
    async fn test_turn_prints_speaker() {
        let server = MockServer::start().await;
        mount_room_one(&server).await;
        Mock::given(method("POST"))
            .and(path("/simulate/turn/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 10, "room_id": 1, "agent_id": 4,
                "content": "Pizza, obviously.", "created_at": "2025-03-01T12:06:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = run_against(&server, &["turn", "1"]).await;
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(stdout.contains("Alex"));
        assert!(stdout.contains("Pizza, obviously."));
    }

    #[tokio::test]
    async fn test_unknown_room_is_reported() {
        let server = MockServer::start().await;
        mount_rooms(&server, json!([room_json(1, "Lunch debate", "debate")])).await;

        let output = run_against(&server, &["turn", "99"]).await;
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("[E5002]"), "stderr was: {stderr}");
    }

    #[tokio::test]
    async fn test_reset_all_uses_wipe_query() {
        let server = MockServer::start().await;
        mount_room_one(&server).await;
        Mock::given(method("POST"))
            .and(path("/rooms/1/reset"))
            .and(query_param("wipe", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let output = run_against(&server, &["reset", "1", "--all", "--yes"]).await;

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(output_to_string(&output).contains("Room wiped"));
    }

    #[tokio::test]
    async fn test_reset_declined_sends_nothing() {
        let server = MockServer::start().await;
        mount_room_one(&server).await;
        Mock::given(method("POST"))
            .and(path("/rooms/1/reset"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let home = tempfile::tempdir().unwrap();
        let uri = server.uri();
        let mut child = chorus_command(home.path(), &["--base-url", &uri, "reset", "1", "--all"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"no\n").await.unwrap();
        drop(stdin);

        let output = child.wait_with_output().await.unwrap();
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        assert!(stdout.contains("wipe all of its memory? [y/N]"));
        assert!(stdout.contains("Cancelled"));
    }

    #[tokio::test]
    async fn test_export_writes_transcript_file() {
        let server = MockServer::start().await;
        mount_rooms(&server, json!([room_json(1, "Lunch debate", "debate")])).await;
        Mock::given(method("GET"))
            .and(path("/rooms/1/export.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Lunch debate\n"))
            .expect(1)
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let out_dir = out.path().to_string_lossy().into_owned();
        let output = run_against(&server, &["export", "1", "--out", &out_dir]).await;

        assert!(output.status.success(), "stderr: {}", stderr_to_string(&output));
        let written = out.path().join("Lunch_debate_transcript.md");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "# Lunch debate\n");
    }
}
