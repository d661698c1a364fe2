//! Runs `SlackTransport` against a local server that mimics the Slack Web API
//! methods the bot uses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use inspirebot::config::SlackConfig;
use inspirebot::platform::slack::SlackTransport;
use inspirebot::platform::{BotEvent, ChatTransport};

const TOKEN: &str = "xoxb-test";

#[derive(Clone, Default)]
struct MockSlack {
    posts: Arc<Mutex<Vec<Value>>>,
    history_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    fail_history: Arc<AtomicBool>,
    hang_history: Arc<AtomicBool>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn auth_test(headers: HeaderMap) -> Json<Value> {
    if !authorized(&headers) {
        return Json(json!({"ok": false, "error": "invalid_auth"}));
    }
    Json(json!({
        "ok": true,
        "url": "https://example.slack.com/",
        "user_id": "UBOT",
        "bot_id": "BBOT"
    }))
}

async fn conversations_list(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    match query.get("cursor").map(String::as_str) {
        None => Json(json!({
            "ok": true,
            "channels": [{"id": "C0GEN", "name": "general"}],
            "response_metadata": {"next_cursor": "page2"}
        })),
        Some("page2") => Json(json!({
            "ok": true,
            "channels": [{"id": "C0RAND", "name": "random"}],
            "response_metadata": {"next_cursor": ""}
        })),
        Some(_) => Json(json!({"ok": false, "error": "invalid_cursor"})),
    }
}

async fn conversations_history(
    State(state): State<MockSlack>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    if state.hang_history.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if state.fail_history.load(Ordering::SeqCst) {
        return Json(json!({"ok": false, "error": "ratelimited"}));
    }
    state.history_queries.lock().await.push(query);
    // Slack returns newest first
    Json(json!({
        "ok": true,
        "has_more": false,
        "messages": [
            {
                "type": "message",
                "subtype": "bot_message",
                "bot_id": "BBOT",
                "text": "a random joke from the bot itself",
                "ts": "1700000003.000000"
            },
            {
                "type": "message",
                "subtype": "channel_join",
                "user": "U2",
                "text": "<@U2> has joined the channel",
                "ts": "1700000002.000000"
            },
            {
                "type": "message",
                "user": "U1",
                "text": "<@UBOT> inspire me",
                "ts": "1700000001.000000"
            }
        ]
    }))
}

async fn post_message(State(state): State<MockSlack>, Json(body): Json<Value>) -> Json<Value> {
    if body["channel"] == "CFAIL" {
        return Json(json!({"ok": false, "error": "channel_not_found"}));
    }
    state.posts.lock().await.push(body);
    Json(json!({"ok": true, "ts": "1700000009.000000"}))
}

async fn spawn_mock() -> (String, MockSlack) {
    let state = MockSlack::default();
    let app = Router::new()
        .route("/api/auth.test", post(auth_test))
        .route("/api/conversations.list", get(conversations_list))
        .route("/api/conversations.history", get(conversations_history))
        .route("/api/chat.postMessage", post(post_message))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), state)
}

fn config(api_base_url: &str, channel: &str, token: &str) -> SlackConfig {
    SlackConfig {
        bot_token: token.to_string(),
        channel: channel.to_string(),
        bot_name: "inspire bot".to_string(),
        api_base_url: api_base_url.to_string(),
        poll_interval_secs: 1,
        timeout_secs: 1,
    }
}

#[tokio::test]
async fn test_connect_resolves_channel_across_pages() {
    let (base, _) = spawn_mock().await;
    let transport = SlackTransport::connect(&config(&base, "#random", TOKEN))
        .await
        .unwrap();

    assert_eq!(transport.channel_id(), "C0RAND");
    assert_eq!(transport.bot_user_id(), "UBOT");
}

#[tokio::test]
async fn test_connect_accepts_channel_id() {
    let (base, _) = spawn_mock().await;
    let transport = SlackTransport::connect(&config(&base, "C0GEN", TOKEN))
        .await
        .unwrap();
    assert_eq!(transport.channel_id(), "C0GEN");
}

#[tokio::test]
async fn test_connect_with_bad_token_fails() {
    let (base, _) = spawn_mock().await;
    let err = SlackTransport::connect(&config(&base, "random", "xoxb-wrong"))
        .await
        .err()
        .unwrap();
    assert!(format!("{:#}", err).contains("invalid_auth"));
}

#[tokio::test]
async fn test_connect_unknown_channel_fails() {
    let (base, _) = spawn_mock().await;
    let result = SlackTransport::connect(&config(&base, "nowhere", TOKEN)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_post_message_sends_icon_and_name() {
    let (base, state) = spawn_mock().await;
    let transport = SlackTransport::connect(&config(&base, "random", TOKEN))
        .await
        .unwrap();

    transport
        .post_message("C0RAND", ":zap: Stay hungry - *X*", ":male-technologist:")
        .await
        .unwrap();

    let posts = state.posts.lock().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["channel"], "C0RAND");
    assert_eq!(posts[0]["text"], ":zap: Stay hungry - *X*");
    assert_eq!(posts[0]["icon_emoji"], ":male-technologist:");
    assert_eq!(posts[0]["username"], "inspire bot");
}

#[tokio::test]
async fn test_post_message_surfaces_slack_error() {
    let (base, _) = spawn_mock().await;
    let transport = SlackTransport::connect(&config(&base, "random", TOKEN))
        .await
        .unwrap();

    let err = transport
        .post_message("CFAIL", "hello", ":smile:")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("channel_not_found"));
}

#[tokio::test]
async fn test_fetch_new_messages_orders_and_filters() {
    let (base, state) = spawn_mock().await;
    let transport = SlackTransport::connect(&config(&base, "random", TOKEN))
        .await
        .unwrap();

    let batch = transport
        .fetch_new_messages("1700000000.000000")
        .await
        .unwrap();

    assert_eq!(batch.messages.len(), 2);
    assert_eq!(batch.messages[0].text, "<@UBOT> inspire me");
    assert!(batch.messages[0].is_ordinary());
    assert_eq!(batch.messages[1].kind, "channel_join");
    assert_eq!(batch.latest_ts.as_deref(), Some("1700000003.000000"));

    let queries = state.history_queries.lock().await;
    assert_eq!(queries[0]["channel"], "C0RAND");
    assert_eq!(queries[0]["oldest"], "1700000000.000000");
}

#[tokio::test]
async fn test_listen_emits_start_then_messages() {
    let (base, state) = spawn_mock().await;
    let transport = Arc::new(
        SlackTransport::connect(&config(&base, "random", TOKEN))
            .await
            .unwrap(),
    );

    let (tx, mut rx) = mpsc::channel(16);
    let listener = tokio::spawn({
        let transport = transport.clone();
        async move { transport.listen(tx).await }
    });

    // Start, two messages from the first poll, two more from the second
    let mut events = Vec::new();
    for _ in 0..5 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        events.push(event);
    }

    assert!(matches!(events[0], BotEvent::Start));
    match &events[1] {
        BotEvent::Message(m) => assert_eq!(m.text, "<@UBOT> inspire me"),
        other => panic!("unexpected event: {:?}", other),
    }
    match &events[2] {
        BotEvent::Message(m) => assert_eq!(m.kind, "channel_join"),
        other => panic!("unexpected event: {:?}", other),
    }

    drop(rx);
    listener.abort();

    // The second poll resumes after the newest message of the first batch,
    // including the skipped bot post
    let queries = state.history_queries.lock().await;
    assert!(queries.len() >= 2);
    assert_ne!(queries[0]["oldest"], "1700000003.000000");
    assert_eq!(queries[1]["oldest"], "1700000003.000000");
}

#[tokio::test]
async fn test_listen_reports_poll_errors() {
    let (base, state) = spawn_mock().await;
    let transport = Arc::new(
        SlackTransport::connect(&config(&base, "random", TOKEN))
            .await
            .unwrap(),
    );
    state.fail_history.store(true, Ordering::SeqCst);

    let (tx, mut rx) = mpsc::channel(16);
    let listener = tokio::spawn({
        let transport = transport.clone();
        async move { transport.listen(tx).await }
    });

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, BotEvent::Start));

    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match second {
        BotEvent::Error(e) => assert!(e.contains("ratelimited")),
        other => panic!("unexpected event: {:?}", other),
    }

    drop(rx);
    listener.abort();
}

#[tokio::test]
async fn test_hung_history_request_times_out() {
    let (base, state) = spawn_mock().await;
    let transport = Arc::new(
        SlackTransport::connect(&config(&base, "random", TOKEN))
            .await
            .unwrap(),
    );
    state.hang_history.store(true, Ordering::SeqCst);

    let (tx, mut rx) = mpsc::channel(16);
    let listener = tokio::spawn({
        let transport = transport.clone();
        async move { transport.listen(tx).await }
    });

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, BotEvent::Start));

    // The 1 s client timeout turns the stuck poll into an error event
    let second = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("listener stalled on a hung request")
        .unwrap();
    assert!(matches!(second, BotEvent::Error(_)));

    // Polling keeps going once the endpoint recovers
    state.hang_history.store(false, Ordering::SeqCst);
    let next = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Some(BotEvent::Message(m)) => return m,
                Some(_) => continue,
                None => panic!("listener stopped"),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(next.text, "<@UBOT> inspire me");

    drop(rx);
    listener.abort();
}
