//! End-to-end pushes through the real HTTP client against a scripted server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autopush_api_client::{GitHubClient, Repository};
use autopush_core::{ErrorKind, PushOptions, Pusher};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use serde_json::{Value, json};

/// Scripted responses keyed by `METHOD path`. Blob creations pop from a queue.
#[derive(Default)]
struct Script {
    fixed: HashMap<String, (u16, Value)>,
    blobs: Vec<(u16, Value)>,
    seen: Vec<(String, Value)>,
}

async fn handle(
    State(script): State<Arc<Mutex<Script>>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, String) {
    let key = format!("{method} {}", uri.path());
    let mut script = script.lock().unwrap();
    script.seen.push((
        key.clone(),
        serde_json::from_slice(&body).unwrap_or(Value::Null),
    ));

    let (status, body) = if key == "POST /repos/octo/site/git/blobs" && !script.blobs.is_empty() {
        script.blobs.remove(0)
    } else {
        script
            .fixed
            .get(&key)
            .cloned()
            .unwrap_or((404, json!({"message": "Not Found"})))
    };
    (StatusCode::from_u16(status).unwrap(), body.to_string())
}

async fn serve(script: Script) -> (Arc<Mutex<Script>>, GitHubClient) {
    let script = Arc::new(Mutex::new(script));
    let app = Router::new()
        .fallback(handle)
        .with_state(Arc::clone(&script));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = GitHubClient::new(
        &format!("http://{addr}"),
        Repository::new("octo", "site"),
        "token",
        Duration::from_secs(5),
    )
    .unwrap();
    (script, client)
}

fn stubbed(branch: &str) -> Script {
    let mut fixed = HashMap::new();
    let reset = reset_in_an_hour();
    fixed.insert(
        "GET /rate_limit".to_string(),
        (200, json!({"resources": {"core": {"remaining": 4999, "reset": reset}}})),
    );
    fixed.insert(
        format!("GET /repos/octo/site/git/refs/heads/{branch}"),
        (200, json!({"object": {"sha": "S1"}})),
    );
    fixed.insert(
        "GET /repos/octo/site/git/commits/S1".to_string(),
        (200, json!({"sha": "S1", "tree": {"sha": "S2"}})),
    );
    fixed.insert(
        "POST /repos/octo/site/git/trees".to_string(),
        (201, json!({"sha": "S_t"})),
    );
    fixed.insert(
        "POST /repos/octo/site/git/commits".to_string(),
        (201, json!({"sha": "S_c"})),
    );
    fixed.insert(
        format!("POST /repos/octo/site/git/refs/heads/{branch}"),
        (200, json!({"object": {"sha": "S_c"}})),
    );
    Script {
        fixed,
        blobs: vec![(201, json!({"sha": "S3"})), (201, json!({"sha": "S4"}))],
        seen: Vec::new(),
    }
}

/// A reset time far enough ahead that it never matters.
fn reset_in_an_hour() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 3_600
}

fn two_file_site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/b/c.txt"), "nested").unwrap();
    std::fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
    dir
}

#[tokio::test]
async fn stubbed_push_records_final_commit() {
    let dir = two_file_site();
    let (script, client) = serve(stubbed("master")).await;

    let report = Pusher::new(&client, PushOptions::default())
        .run(dir.path())
        .await;
    assert!(report.succeeded(), "{:?}", report.last_error());
    let outcome = report.outcome().unwrap();
    assert_eq!(outcome.commit_sha, "S_c");
    assert_eq!(outcome.parent_sha, "S1");
    assert_eq!(outcome.base_tree_sha, "S2");
    assert_eq!(outcome.tree_sha, "S_t");

    let seen = script.lock().unwrap().seen.clone();
    let tree_body = &seen
        .iter()
        .find(|(k, _)| k == "POST /repos/octo/site/git/trees")
        .unwrap()
        .1;
    assert_eq!(tree_body["base_tree"], "S2");
    assert_eq!(
        tree_body["tree"],
        json!([
            {"path": "a/b/c.txt", "mode": "100644", "type": "blob", "sha": "S3"},
            {"path": "index.html", "mode": "100644", "type": "blob", "sha": "S4"},
        ])
    );
    let commit_body = &seen
        .iter()
        .find(|(k, _)| k == "POST /repos/octo/site/git/commits")
        .unwrap()
        .1;
    assert_eq!(commit_body["parents"], json!(["S1"]));
    assert_eq!(commit_body["tree"], "S_t");
    let ref_body = &seen.last().unwrap().1;
    assert_eq!(ref_body, &json!({"sha": "S_c", "force": true}));
}

#[tokio::test]
async fn falls_back_to_main_over_http() {
    let dir = two_file_site();
    let (script, client) = serve(stubbed("main")).await;

    let outcome = Pusher::new(&client, PushOptions::default())
        .push(dir.path())
        .await
        .unwrap();
    assert_eq!(outcome.branch, "main");

    let seen = script.lock().unwrap().seen.clone();
    assert_eq!(seen[1].0, "GET /repos/octo/site/git/refs/heads/master");
    assert_eq!(seen[2].0, "GET /repos/octo/site/git/refs/heads/main");
    assert_eq!(seen.last().unwrap().0, "POST /repos/octo/site/git/refs/heads/main");
}

#[tokio::test]
async fn rejected_blob_ends_the_push() {
    let dir = two_file_site();
    let mut script = stubbed("master");
    script.blobs = vec![(403, json!({"message": "Resource not accessible"}))];
    let (script, client) = serve(script).await;

    let report = Pusher::new(&client, PushOptions::default())
        .run(dir.path())
        .await;
    assert!(!report.succeeded());
    assert_eq!(report.error().unwrap().kind(), ErrorKind::Api);
    let last_error = report.last_error().unwrap();
    assert!(last_error.contains("403"), "{last_error}");
    assert!(last_error.contains("Resource not accessible"), "{last_error}");

    let seen = script.lock().unwrap().seen.clone();
    let blob_calls = seen
        .iter()
        .filter(|(k, _)| k == "POST /repos/octo/site/git/blobs")
        .count();
    assert_eq!(blob_calls, 1);
    assert!(!seen.iter().any(|(k, _)| {
        k == "POST /repos/octo/site/git/trees"
            || k == "POST /repos/octo/site/git/commits"
            || k.starts_with("POST /repos/octo/site/git/refs/")
    }));
}

#[tokio::test]
async fn unreadable_rate_limit_does_not_block_the_push() {
    let dir = two_file_site();
    let mut script = stubbed("master");
    script.fixed.remove("GET /rate_limit");
    let (_script, client) = serve(script).await;

    let outcome = Pusher::new(&client, PushOptions::default())
        .push(dir.path())
        .await
        .unwrap();
    assert_eq!(outcome.commit_sha, "S_c");
}
