use std::sync::Arc;
use std::time::Duration;

use chorus_core::{
    AlwaysConfirm, ApiConfig, ChorusError, ExportConfig, HttpRoomApi, RoomApi, RoomRegistry,
    RoomSession, Scenario, SessionOptions, SessionStatus, TranscriptExporter,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> Arc<dyn RoomApi> {
    Arc::new(HttpRoomApi::new(&ApiConfig::new(server.uri())).unwrap())
}

fn room_json(id: i64, name: &str, scenario: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "scenario": scenario,
        "created_at": "2025-03-01T12:00:00.000000"
    })
}

fn message_json(id: i64, agent_id: Option<i64>, content: &str) -> Value {
    json!({
        "id": id,
        "room_id": 1,
        "agent_id": agent_id,
        "content": content,
        "created_at": format!("2025-03-01T12:00:{:02}", id % 60)
    })
}

fn agents_json() -> Value {
    json!([
        {"id": 1, "room_id": 1, "name": "Alex", "role": "Pro side", "goal": "Argue in favor of the topic."},
        {"id": 2, "room_id": 1, "name": "Blake", "role": "Con side", "goal": "Argue against the topic."}
    ])
}

async fn mount_messages(server: &MockServer, messages: Value) {
    Mock::given(method("GET"))
        .and(path("/messages/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn live_options() -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::from_millis(50),
        live: true,
        poll_failure_warn_threshold: 5,
    }
}

mod registry_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_create_build_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([room_json(1, "Old room", "freeplay")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(body_json(json!({"name": "Standup", "scenario": "planning"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(room_json(2, "Standup", "planning")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rooms/build/debate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "room": room_json(3, "Debate", "debate"),
                "agents": agents_json()
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut registry = RoomRegistry::new(api_for(&server));
        assert_eq!(registry.list().await.unwrap().len(), 1);

        let created = registry.create("Standup", Scenario::Planning).await.unwrap();
        let built = registry.build_from_template("debate").await.unwrap();
        assert_eq!(built.agents.len(), 2);

        let ids: Vec<i64> = registry.rooms().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        assert!(registry.delete(created.id, &AlwaysConfirm).await.unwrap());
        let ids: Vec<i64> = registry.rooms().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_create_with_blank_name_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut registry = RoomRegistry::new(api_for(&server));
        let err = registry.create("  ", Scenario::Freeplay).await.unwrap_err();
        assert!(matches!(err, ChorusError::ValidationFailed(_)));
        assert!(registry.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_room_keeps_local_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([room_json(1, "Only", "freeplay")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/9"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Room not found"))
            .mount(&server)
            .await;

        let mut registry = RoomRegistry::new(api_for(&server));
        registry.list().await.unwrap();

        let err = registry.delete(9, &AlwaysConfirm).await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.detail(), "Room not found");
        assert_eq!(registry.rooms().len(), 1);
    }
}

mod session_flow_tests {
    use super::*;
    use chorus_core::Room;

    fn debate_room() -> Room {
        Room::new(1, "Debate", Scenario::Debate)
    }

    #[tokio::test]
    async fn test_live_session_follows_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agents/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agents_json()))
            .mount(&server)
            .await;
        mount_messages(&server, json!([message_json(1, None, "TOPIC: remote work")])).await;

        let session = RoomSession::open(debate_room(), api_for(&server), live_options()).await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Polling);
        assert_eq!(snapshot.agents.len(), 2);
        assert_eq!(snapshot.topic.as_deref(), Some("remote work"));

        // The server appends a turn; the next poll picks it up.
        server.reset().await;
        mount_messages(
            &server,
            json!([
                message_json(1, None, "TOPIC: remote work"),
                message_json(2, Some(1), "Remote work saves hours of commuting.")
            ]),
        )
        .await;

        let session_ref = &session;
        assert!(wait_until(|| async move { session_ref.messages().await.len() == 2 }).await);
        session.close().await;
    }

    #[tokio::test]
    async fn test_no_requests_after_live_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agents/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        mount_messages(&server, json!([])).await;

        let session = RoomSession::open(debate_room(), api_for(&server), live_options()).await;
        let server_ref = &server;
        assert!(
            wait_until(|| async move { count_requests(server_ref, "/messages/1").await >= 3 }).await
        );

        session.set_live(false).await.unwrap();
        let before = count_requests(&server, "/messages/1").await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count_requests(&server, "/messages/1").await, before);
        assert_eq!(session.snapshot().await.status, SessionStatus::Loaded);
    }

    #[tokio::test]
    async fn test_writes_hit_expected_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agents/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agents_json()))
            .mount(&server)
            .await;
        mount_messages(&server, json!([message_json(1, None, "hello")])).await;
        Mock::given(method("POST"))
            .and(path("/messages/human/1"))
            .and(body_json(json!({"content": "What about onboarding?"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(message_json(2, None, "What about onboarding?")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/simulate/turn/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_json(3, Some(2), "It suffers.")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rooms/1/topic"))
            .and(body_json(json!({"topic": "onboarding"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rooms/1/reset"))
            .and(query_param("wipe", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let options = SessionOptions {
            live: false,
            ..live_options()
        };
        let session = RoomSession::open(debate_room(), api_for(&server), options).await;

        session.send_human_message("What about onboarding?").await.unwrap();
        let turn = session.simulate_turn().await.unwrap();
        assert_eq!(turn.agent_id, Some(2));
        // Writes never splice into the local list.
        assert_eq!(session.messages().await.len(), 1);

        session.set_topic("onboarding").await.unwrap();
        assert!(session.reset(true, &AlwaysConfirm).await.unwrap());
        assert!(session.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_body_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agents/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        mount_messages(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/simulate/judge/1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Room needs at least two agents"))
            .mount(&server)
            .await;

        let options = SessionOptions {
            live: false,
            ..live_options()
        };
        let session = RoomSession::open(debate_room(), api_for(&server), options).await;

        let err = session.judge_turn().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            session.snapshot().await.last_error.as_deref(),
            Some("Room needs at least two agents")
        );
        assert!(!session.is_busy());
    }
}

mod export_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_export_writes_named_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms/1/export.md"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("# Lunch debate\n\n**Alex**: hi\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            directory: dir.path().join("exports").to_string_lossy().into_owned(),
            ..ExportConfig::default()
        };
        let exporter = TranscriptExporter::new(api_for(&server), config);

        let written = exporter.export_transcript(1, "Lunch  debate").await.unwrap();
        assert_eq!(
            written.file_name().and_then(|n| n.to_str()),
            Some("Lunch_debate_transcript.md")
        );
        let text = std::fs::read_to_string(&written).unwrap();
        assert!(text.starts_with("# Lunch debate"));
    }

    #[tokio::test]
    async fn test_export_failure_surfaces_body_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms/7/export.md"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Room not found"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            directory: dir.path().to_string_lossy().into_owned(),
            ..ExportConfig::default()
        };
        let exporter = TranscriptExporter::new(api_for(&server), config);

        let err = exporter.export_transcript(7, "gone").await.unwrap_err();
        assert_eq!(err.detail(), "Room not found");
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
