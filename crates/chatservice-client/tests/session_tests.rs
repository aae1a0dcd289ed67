use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::oneshot;

use chatservice_client::{
    ChatClient, ClientError, JsonFileTrustPersistence, RequestTransport, SessionConfig,
    TransportError,
};
use chatservice_shared::{Message, OutgoingMessage, User};

#[derive(Default)]
struct MockServer {
    messages: Mutex<Vec<(String, Message)>>,
    queries: Mutex<Vec<(String, u32, u32)>>,
    online: Mutex<Vec<User>>,
}

#[derive(Deserialize)]
struct Paging {
    limit: u32,
    offset: u32,
}

async fn post_message(
    State(server): State<Arc<MockServer>>,
    Path(channel): Path<String>,
    Json(outgoing): Json<OutgoingMessage>,
) -> Response {
    if outgoing.text == "reject me" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "Error": "Message rejected" })),
        )
            .into_response();
    }

    let mut messages = server.messages.lock().unwrap();
    let message = Message {
        id: format!("msg-{}", messages.len() + 1),
        creator_name: outgoing.creator_name,
        text: outgoing.text,
        created_at: 1_700_000_000 + messages.len() as i64,
        signature: outgoing.signature,
    };
    messages.push((channel, message.clone()));
    Json(message).into_response()
}

async fn get_messages(
    State(server): State<Arc<MockServer>>,
    Path(channel): Path<String>,
    Query(paging): Query<Paging>,
) -> Json<Vec<Message>> {
    server
        .queries
        .lock()
        .unwrap()
        .push((channel.clone(), paging.limit, paging.offset));

    let messages = server
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|(c, _)| *c == channel)
        .map(|(_, m)| m.clone())
        .skip(paging.offset as usize)
        .take(paging.limit as usize)
        .collect();
    Json(messages)
}

async fn get_online(State(server): State<Arc<MockServer>>) -> Json<Vec<User>> {
    Json(server.online.lock().unwrap().clone())
}

async fn start_server() -> (String, Arc<MockServer>, oneshot::Sender<()>) {
    let server = Arc::new(MockServer::default());
    let app = Router::new()
        .route("/channel/:channel", get(get_messages).post(post_message))
        .route("/online", get(get_online))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });
    tokio::spawn(async move {
        let _ = serve.await;
    });

    (format!("http://{addr}"), server, shutdown_tx)
}

/// An address on which nothing is listening.
async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    addr.to_string()
}

fn session(server_url: &str, username: &str, dir: &tempfile::TempDir) -> ChatClient {
    let config = SessionConfig::new(username, server_url, "127.0.0.1:1").with_live_updates(false);
    let transport = Arc::new(chatservice_client::HttpTransport::new(
        server_url.trim_start_matches("http://"),
    ));
    let persistence = Arc::new(JsonFileTrustPersistence::new(
        dir.path().join("trustedusers.json"),
    ));
    ChatClient::with_collaborators(config, "general", transport, persistence)
        .expect("session should build")
}

#[tokio::test]
async fn test_connect_send_and_fetch_history() {
    let (url, server, _shutdown) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = session(&url, "alice", &dir);

    client.connect().await.expect("connect should succeed");
    assert!(client.is_connected());

    let sent = client.send_message("hello, world").await.unwrap();
    assert_eq!(sent.id, "msg-1");
    assert_eq!(sent.creator_name, "alice");
    assert!(sent.verify_signature(&client.public_key()));
    assert!(client.is_own_message(&sent));

    client.send_message("second").await.unwrap();

    let history = client.get_recent_messages().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text, "hello, world");

    let page = client.get_messages(1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "second");

    let queries = server.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![("general".to_string(), 10, 0), ("general".to_string(), 1, 1)]
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_error_body_is_reported() {
    let (url, server, _shutdown) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let client = session(&url, "alice", &dir);

    let err = client.send_message("reject me").await.unwrap_err();
    match err {
        ClientError::Transport(TransportError::Server(reason)) => {
            assert_eq!(reason, "Message rejected")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(server.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let (url, _server, _shutdown) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = session(&url, "alice", &dir);

    client.connect().await.unwrap();
    assert!(matches!(
        client.connect().await,
        Err(ClientError::AlreadyConnected)
    ));
}

#[tokio::test]
async fn test_connect_to_unreachable_server_fails() {
    let addr = closed_address().await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = session(&format!("http://{addr}"), "alice", &dir);

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionFailed(_)));
    assert!(err
        .to_string()
        .starts_with("Failed to connect to chat service: "));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_online_users() {
    let (url, server, _shutdown) = start_server().await;
    server
        .online
        .lock()
        .unwrap()
        .extend([User::new("bob", "key-b"), User::new("carol", "key-c")]);
    let dir = tempfile::tempdir().unwrap();
    let client = session(&url, "alice", &dir);

    let users = client.get_online_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1], User::new("carol", "key-c"));
}

#[tokio::test]
async fn test_trust_survives_restart() {
    let (url, _server, _shutdown) = start_server().await;
    let dir = tempfile::tempdir().unwrap();

    let mut bob = session(&url, "bob", &dir);
    let from_bob = bob.send_message("trust me").await.unwrap();
    let bob_key = bob.public_key();
    bob.shutdown().await.unwrap();

    let mut alice = session(&url, "alice", &dir);
    assert!(!alice.is_message_trusted(&from_bob));
    alice
        .trusted_users_mut()
        .trust_user(User::new("bob", bob_key.clone()));
    assert!(alice.is_message_trusted(&from_bob));
    alice.shutdown().await.unwrap();

    let restarted = session(&url, "alice", &dir);
    assert!(restarted.trusted_users().is_trusted_parts("bob", &bob_key));
    assert!(restarted.is_message_trusted(&from_bob));
}

#[tokio::test]
async fn test_scheme_is_stripped_from_addresses() {
    let config = SessionConfig::new("alice", "https://chat.example.net/", "http://chat.example.net:9435");
    let client = ChatClient::new(config, "general").unwrap();
    assert_eq!(client.config().server_address, "chat.example.net");
    assert_eq!(client.config().live_update_address, "chat.example.net:9435");
}

#[tokio::test]
async fn test_transport_is_usable_directly() {
    let (url, _server, _shutdown) = start_server().await;
    let transport = chatservice_client::HttpTransport::new(url.trim_start_matches("http://"));

    let messages = transport.get_messages("empty", 10, 0).await.unwrap();
    assert!(messages.is_empty());
}
