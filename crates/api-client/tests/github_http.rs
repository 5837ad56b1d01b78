use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autopush_api_client::{ApiError, GitDataApi, GitHubClient, Repository, TreeEntry};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Value,
}

#[derive(Default)]
struct Fake {
    routes: Mutex<HashMap<(Method, String), (u16, String)>>,
    requests: Mutex<Vec<Recorded>>,
}

impl Fake {
    fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(fake): State<Arc<Fake>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    fake.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    match fake.routes.lock().unwrap().get(&(method, path)) {
        Some((status, body)) => (StatusCode::from_u16(*status).unwrap(), body.clone()),
        None => (StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#.to_string()),
    }
}

async fn start() -> (Arc<Fake>, GitHubClient) {
    let fake = Arc::new(Fake::default());
    let app = Router::new()
        .fallback(handle)
        .with_state(Arc::clone(&fake));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GitHubClient::new(
        &format!("http://{addr}/"),
        Repository::new("octo", "site"),
        "secret-token",
        Duration::from_secs(5),
    )
    .unwrap();
    (fake, client)
}

#[tokio::test]
async fn branch_head_reads_object_sha_and_sends_fixed_headers() {
    let (fake, client) = start().await;
    fake.respond(
        Method::GET,
        "/repos/octo/site/git/refs/heads/master",
        200,
        json!({"ref": "refs/heads/master", "object": {"sha": "S1", "type": "commit"}}),
    );

    let sha = client.branch_head("master").await.unwrap();
    assert_eq!(sha, "S1");

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(headers["authorization"], "Bearer secret-token");
    assert_eq!(headers["accept"], "application/vnd.github.v3+json");
    assert!(
        headers["user-agent"]
            .to_str()
            .unwrap()
            .starts_with("autopush/")
    );
}

#[tokio::test]
async fn missing_branch_is_a_status_error() {
    let (_fake, client) = start().await;
    let err = client.branch_head("master").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    let msg = err.to_string();
    assert!(msg.contains("master"), "{msg}");
    assert!(msg.contains("404"), "{msg}");
    assert!(msg.contains("Not Found"), "{msg}");
}

#[tokio::test]
async fn create_blob_posts_base64_content() {
    let (fake, client) = start().await;
    fake.respond(
        Method::POST,
        "/repos/octo/site/git/blobs",
        201,
        json!({"sha": "B1", "url": "https://example.invalid/blob"}),
    );

    let sha = client.create_blob(b"hello world").await.unwrap();
    assert_eq!(sha, "B1");

    let requests = fake.requests();
    assert_eq!(
        requests[0].body,
        json!({"content": "aGVsbG8gd29ybGQ=", "encoding": "base64"})
    );
}

#[tokio::test]
async fn create_blob_rejects_ok_instead_of_created() {
    let (fake, client) = start().await;
    fake.respond(
        Method::POST,
        "/repos/octo/site/git/blobs",
        200,
        json!({"sha": "B1"}),
    );

    let err = client.create_blob(b"x").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 200, .. }));
}

#[tokio::test]
async fn created_response_without_sha_is_missing_field() {
    let (fake, client) = start().await;
    fake.respond(
        Method::POST,
        "/repos/octo/site/git/trees",
        201,
        json!({"url": "no sha here"}),
    );

    let err = client
        .create_tree("BASE", &[TreeEntry::blob("a.txt", "B1")])
        .await
        .unwrap_err();
    match err {
        ApiError::MissingField { field, body, .. } => {
            assert_eq!(field, "sha");
            assert!(body.contains("no sha here"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn tree_commit_and_ref_bodies_match_wire_format() {
    let (fake, client) = start().await;
    fake.respond(Method::POST, "/repos/octo/site/git/trees", 201, json!({"sha": "T1"}));
    fake.respond(Method::POST, "/repos/octo/site/git/commits", 201, json!({"sha": "C1"}));
    fake.respond(
        Method::POST,
        "/repos/octo/site/git/refs/heads/main",
        200,
        json!({"ref": "refs/heads/main"}),
    );

    let tree = client
        .create_tree("BASE", &[TreeEntry::blob("a/b/c.txt", "B1")])
        .await
        .unwrap();
    let commit = client.create_commit("snapshot", &tree, "P1").await.unwrap();
    client.update_ref("main", &commit).await.unwrap();

    let requests = fake.requests();
    assert_eq!(
        requests[0].body,
        json!({
            "base_tree": "BASE",
            "tree": [{"path": "a/b/c.txt", "mode": "100644", "type": "blob", "sha": "B1"}],
        })
    );
    assert_eq!(
        requests[1].body,
        json!({"message": "snapshot", "tree": "T1", "parents": ["P1"]})
    );
    assert_eq!(requests[2].method, Method::POST);
    assert_eq!(requests[2].body, json!({"sha": "C1", "force": true}));
}

#[tokio::test]
async fn rate_limit_reads_core_resource() {
    let (fake, client) = start().await;
    let reset = chrono::Utc::now().timestamp() + 600;
    fake.respond(
        Method::GET,
        "/rate_limit",
        200,
        json!({"resources": {"core": {"limit": 5000, "remaining": 0, "reset": reset}}}),
    );

    let status = client.rate_limit().await.unwrap();
    assert_eq!(status.remaining, 0);
    assert!(status.reset_in_secs > 590 && status.reset_in_secs <= 600);
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GitHubClient::new(
        &format!("http://{addr}"),
        Repository::new("octo", "site"),
        "t",
        Duration::from_secs(2),
    )
    .unwrap();
    let err = client.branch_head("master").await.unwrap_err();
    assert!(err.is_network(), "{err}");
}
