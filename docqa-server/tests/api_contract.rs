use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docqa_model::{ChatModel, MockChatModel, Role};
use docqa_rag::{
    FixedSizeChunker, HashEmbeddingProvider, InMemoryVectorStore, RagConfig, ReconcilerConfig,
};
use docqa_server::{AppState, app_router};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

const DOC: &str = "Milvus is an open-source vector database built for similarity search.";

fn state(model: Option<MockChatModel>, upload_dir: &Path) -> AppState {
    let chat_model = model.map(|m| Arc::new(m) as Arc<dyn ChatModel>);
    AppState::assemble(
        RagConfig::default(),
        ReconcilerConfig::new("docs"),
        Arc::new(HashEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(FixedSizeChunker::new(1000, 200)),
        chat_model,
    )
    .expect("assemble state")
    .with_upload_dir(upload_dir)
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{}", addr), handle)
}

/// `(event name, parsed data)` for every frame of an SSE body.
fn parse_sse(body: &str) -> Vec<(String, Value)> {
    let mut frames = Vec::new();
    for frame in body.split("\n\n") {
        let mut event = String::from("message");
        let mut data_lines = Vec::new();
        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim_start().to_string());
            }
        }
        if !data_lines.is_empty() {
            let data = serde_json::from_str(&data_lines.join("\n")).expect("sse json");
            frames.push((event, data));
        }
    }
    frames
}

async fn upload(client: &reqwest::Client, base: &str, name: &str, content: &str) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(content.as_bytes().to_vec()).file_name(name.to_string()));
    client
        .post(format!("{}/api/rag/insert", base))
        .multipart(form)
        .send()
        .await
        .expect("upload response")
}

async fn post_sse(client: &reqwest::Client, url: String, body: Value) -> (reqwest::header::HeaderMap, Vec<(String, Value)>) {
    let response = tokio::time::timeout(Duration::from_secs(5), client.post(url).json(&body).send())
        .await
        .expect("stream timeout")
        .expect("stream response");
    assert!(response.status().is_success());
    let headers = response.headers().clone();
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    assert!(content_type.contains("text/event-stream"));
    let text = response.text().await.expect("stream body");
    (headers, parse_sse(&text))
}

#[tokio::test]
async fn upload_indexes_and_removes_temporary_file() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &base, "notes.txt", DOC).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("insert json");
    assert_eq!(body["success"], json!(true));
    let ids = body["document_ids"].as_array().expect("document ids");
    assert_eq!(body["chunk_count"], json!(ids.len()));
    assert_eq!(ids.len(), 1);
    assert!(ids[0].as_str().expect("id").ends_with("_notes.txt_0"));

    let leftovers = std::fs::read_dir(uploads.path()).expect("upload dir").count();
    assert_eq!(leftovers, 0);

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], json!("ok"));
    assert_eq!(health["collection"], json!("docs"));
    assert_eq!(health["dimensions"], json!(256));

    handle.abort();
}

#[tokio::test]
async fn long_upload_names_still_fit_the_chunk_id() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    let name = format!("{}.txt", "long".repeat(60));
    let response = upload(&client, &base, &name, DOC).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("insert json");
    let id = body["document_ids"][0].as_str().expect("id");
    assert!(id.len() <= 255, "{} bytes", id.len());
    assert!(id.ends_with(".txt_0"));

    handle.abort();
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    let form = Form::new().text("comment", "no file here");
    let response = client
        .post(format!("{}/api/document/insert", base))
        .multipart(form)
        .send()
        .await
        .expect("insert response");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("insert json");
    assert_eq!(body["success"], json!(false));

    handle.abort();
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) =
        spawn_server(state(None, uploads.path()).with_max_upload_bytes(16)).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &base, "big.txt", DOC).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("insert json");
    assert!(body["message"].as_str().expect("message").contains("upload limit"));

    handle.abort();
}

#[tokio::test]
async fn ask_on_empty_collection_abstains() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default();
    let (base, handle) = spawn_server(state(Some(model.clone()), uploads.path())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/rag/ask", base))
        .json(&json!({"query": "what is milvus?"}))
        .send()
        .await
        .expect("ask response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("ask json");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["retrieved_docs"], json!(0));
    assert_eq!(body["below_threshold"], json!(true));
    assert_eq!(body["message"], json!("no relevant information found in the knowledge base"));
    assert!(model.requests().is_empty());

    handle.abort();
}

#[tokio::test]
async fn ask_answers_from_uploaded_document() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default().with_fragments(["A vector ", "database."]);
    let (base, handle) = spawn_server(state(Some(model.clone()), uploads.path())).await;
    let client = reqwest::Client::new();

    assert!(upload(&client, &base, "milvus.md", DOC).await.status().is_success());

    let response = client
        .post(format!("{}/api/rag/ask", base))
        .json(&json!({"query": DOC}))
        .send()
        .await
        .expect("ask response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("ask json");
    assert_eq!(body["answer"], json!("A vector database."));
    assert_eq!(body["retrieved_docs"], json!(1));
    assert_eq!(body["below_threshold"], json!(false));
    assert!(body["max_score"].as_f64().expect("max score") > 0.99);

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0][0].role, Role::System);
    assert!(requests[0][0].content.contains("Document 1 (similarity:"));
    assert_eq!(requests[0][1].content, DOC);

    handle.abort();
}

#[tokio::test]
async fn ask_with_blank_query_is_bad_request() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    for body in [json!({"query": "   "}), json!({})] {
        let response = client
            .post(format!("{}/api/rag/ask", base))
            .json(&body)
            .send()
            .await
            .expect("ask response");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("ask json");
        assert_eq!(body["success"], json!(false));
    }

    handle.abort();
}

#[tokio::test]
async fn ask_stream_sends_summary_headers_and_events() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default().with_fragments(["a", "", "bc"]);
    let (base, handle) = spawn_server(state(Some(model), uploads.path())).await;
    let client = reqwest::Client::new();

    assert!(upload(&client, &base, "milvus.md", DOC).await.status().is_success());

    let (headers, frames) =
        post_sse(&client, format!("{}/api/rag/ask/stream", base), json!({"query": DOC})).await;
    assert_eq!(headers.get("x-retrieved-docs").and_then(|v| v.to_str().ok()), Some("1"));
    assert_eq!(headers.get("x-below-threshold").and_then(|v| v.to_str().ok()), Some("false"));

    let expected = vec![
        ("message".to_string(), json!({"type": "start", "content": ""})),
        ("message".to_string(), json!({"type": "data", "content": "a"})),
        ("message".to_string(), json!({"type": "data", "content": "bc"})),
        ("message".to_string(), json!({"type": "end", "content": ""})),
    ];
    assert_eq!(frames, expected);

    handle.abort();
}

#[tokio::test]
async fn ask_stream_abstains_without_calling_the_model() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default();
    let (base, handle) = spawn_server(state(Some(model.clone()), uploads.path())).await;
    let client = reqwest::Client::new();

    let (headers, frames) = post_sse(
        &client,
        format!("{}/api/rag/ask/stream", base),
        json!({"query": "what is milvus?"}),
    )
    .await;
    assert_eq!(headers.get("x-below-threshold").and_then(|v| v.to_str().ok()), Some("true"));
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1].1["type"], json!("data"));
    assert!(frames[1].1["content"].as_str().expect("content").starts_with("Sorry"));
    assert!(model.requests().is_empty());

    handle.abort();
}

#[tokio::test]
async fn chat_stream_forwards_history_and_fragments() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default().with_fragments(["Hel", "lo"]);
    let (base, handle) = spawn_server(state(Some(model.clone()), uploads.path())).await;
    let client = reqwest::Client::new();

    let body = json!({
        "question": "and now?",
        "history": [
            {"role": "user", "content": "hi"},
            {"role": "tool", "content": "ignored"},
            {"role": "assistant", "content": "hello"}
        ]
    });
    let (_, frames) = post_sse(&client, format!("{}/api/chat/test/stream", base), body).await;
    let kinds: Vec<Value> = frames.iter().map(|(_, data)| data["type"].clone()).collect();
    assert_eq!(kinds, vec![json!("start"), json!("data"), json!("data"), json!("end")]);

    let requests = model.requests();
    let roles: Vec<Role> = requests[0].iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(requests[0][0].content, "You are a helpful AI assistant.");
    assert_eq!(requests[0][3].content, "and now?");

    handle.abort();
}

#[tokio::test]
async fn chat_stream_failure_is_one_error_event() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = MockChatModel::default().with_fragments(["partial"]).failing_after("upstream reset");
    let (base, handle) = spawn_server(state(Some(model), uploads.path())).await;
    let client = reqwest::Client::new();

    let (_, frames) =
        post_sse(&client, format!("{}/api/chat/test/stream", base), json!({"question": "hi"})).await;
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].1["type"], json!("start"));
    assert_eq!(frames[1].1["content"], json!("partial"));
    assert_eq!(frames[2].0, "error");
    assert!(frames[2].1["error"].as_str().expect("error").contains("upstream reset"));

    handle.abort();
}

#[tokio::test]
async fn chat_without_model_is_server_error() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat/test", base))
        .json(&json!({"question": "hi"}))
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.expect("chat json");
    assert!(body["error"].is_string());

    handle.abort();
}

#[tokio::test]
async fn chat_returns_question_and_answer() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(Some(MockChatModel::default()), uploads.path())).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/chat/test", base))
        .json(&json!({"question": "echo me"}))
        .send()
        .await
        .expect("chat response")
        .json()
        .await
        .expect("chat json");
    assert_eq!(body, json!({"question": "echo me", "answer": "echo me"}));

    handle.abort();
}

#[tokio::test]
async fn collections_can_be_listed_and_dropped() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(state(None, uploads.path())).await;
    let client = reqwest::Client::new();

    assert!(upload(&client, &base, "notes.txt", DOC).await.status().is_success());

    let listed: Value = client
        .get(format!("{}/api/milvus/collections", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed["collections"], json!(["docs"]));

    for _ in 0..2 {
        let response = client
            .delete(format!("{}/api/milvus/collections/docs", base))
            .send()
            .await
            .expect("drop response");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("drop json");
        assert_eq!(body["success"], json!(true));
    }

    let listed: Value = client
        .get(format!("{}/api/milvus/collections", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed["collections"], json!([]));

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert!(health.get("dimensions").is_none());

    let asked: Value = client
        .post(format!("{}/api/rag/ask", base))
        .json(&json!({"query": "what is milvus?"}))
        .send()
        .await
        .expect("ask response")
        .json()
        .await
        .expect("ask json");
    assert_eq!(asked["retrieved_docs"], json!(0));
    assert_eq!(asked["below_threshold"], json!(true));

    let listed: Value = client
        .get(format!("{}/api/milvus/collections", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed["collections"], json!([]));

    handle.abort();
}
