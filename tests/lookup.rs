//! End-to-end: Gemini wire format + GitHub tool, both against local mocks.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use github_lookup_agent::{
    load_credential, Agent, AgentConfig, AgentError, GeminiProvider, GitHubUserTool,
    StaticSecretStore, ToolRegistry, GEMINI_KEY_SECRET,
};
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn github_user(Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    match name.as_str() {
        "google" => (
            StatusCode::OK,
            Json(json!({
                "login": "google",
                "name": "Google",
                "bio": "Google ❤️ Open Source",
                "public_repos": 2700,
                "followers": 50000
            })),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))),
    }
}

/// Asks for the tool on the first turn, then summarizes the function response.
async fn gemini(Json(body): Json<Value>) -> Json<Value> {
    let contents = body["contents"].as_array().cloned().unwrap_or_default();
    let last = contents.last().cloned().unwrap_or(Value::Null);

    if let Some(response) = last["parts"][0].get("functionResponse") {
        let r = &response["response"];
        let text = match r.get("error") {
            Some(err) => format!("Lookup failed ({}): {}", r["status_code"], err.as_str().unwrap_or("")),
            None => format!("{} has {} public repos.", r["name"].as_str().unwrap_or("?"), r["public_repos"]),
        };
        return Json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        }));
    }

    let prompt = contents[0]["parts"][0]["text"].as_str().unwrap_or("");
    if let Some(username) = prompt.strip_prefix("lookup ") {
        let tool = if username == "!bogus" { "format_disk" } else { "fetch_user_info" };
        return Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "functionCall": { "name": tool, "args": { "username": username } } }] },
                "finishReason": "STOP"
            }]
        }));
    }

    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": "I only look up GitHub users." }] }, "finishReason": "STOP" }]
    }))
}

async fn agent() -> Agent {
    let github = serve(Router::new().route("/users/{name}", get(github_user))).await;
    let model = serve(Router::new().route("/v1beta/models/{*rest}", post(gemini))).await;

    let secrets = StaticSecretStore::new().with(GEMINI_KEY_SECRET, "test-key");
    let key = load_credential(&secrets, GEMINI_KEY_SECRET).unwrap();

    let tools = ToolRegistry::new().add(
        GitHubUserTool::descriptor(),
        GitHubUserTool::new().with_base_url(github),
    );
    Agent::new(
        GeminiProvider::new(key).with_base_url(model),
        tools,
        AgentConfig::default(),
    )
}

#[tokio::test]
async fn answers_from_tool_result() {
    let result = agent().await.invoke("lookup google").await.unwrap();
    assert_eq!(result.text, "Google has 2700 public repos.");
    assert_eq!(result.model_calls, 2);
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].call.arguments, json!({ "username": "google" }));
}

#[tokio::test]
async fn not_found_is_explained_not_raised() {
    let result = agent().await.invoke("lookup no-such-user-zz").await.unwrap();
    assert_eq!(result.text, "Lookup failed (404): Not Found");
    assert!(result.tool_calls[0].result.is_error());
}

#[tokio::test]
async fn plain_answer_needs_no_tool() {
    let result = agent().await.invoke("what's the weather?").await.unwrap();
    assert_eq!(result.text, "I only look up GitHub users.");
    assert_eq!(result.model_calls, 1);
    assert!(result.tool_calls.is_empty());
}

#[tokio::test]
async fn unknown_tool_is_surfaced() {
    let err = agent().await.invoke("lookup !bogus").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool { ref name, .. } if name == "format_disk"));
}

// Live GitHub API. Run with `cargo test -- --ignored`.

#[tokio::test]
#[ignore]
async fn live_known_user_has_profile_fields() {
    let payload = GitHubUserTool::new().fetch_user_info("google").await.to_payload();
    for key in ["name", "bio", "public_repos", "followers"] {
        assert!(payload.get(key).is_some(), "missing {key} in {payload}");
    }
    assert!(payload.get("error").is_none());
}

#[tokio::test]
#[ignore]
async fn live_invalid_handle_is_404() {
    let payload = GitHubUserTool::new()
        .fetch_user_info("this-user-should-not-exist-9f3a7c1e2b")
        .await
        .to_payload();
    assert!(payload.get("error").is_some());
    assert_eq!(payload["status_code"], 404);
}
