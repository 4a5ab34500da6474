//! Integration tests for the RPC client session state machine.
//!
//! A fake transport launcher stands in for the server subprocess, so the
//! lifecycle and the four operations are exercised without spawning
//! anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use code_assistant::{
    AssistantError, ChatRequest, ClientConfig, RpcClient, SearchRequest, SessionState,
    ToolContent, ToolReply, ToolTransport, TransportLauncher,
};

/// Shared observation point for everything the fake transport sees.
#[derive(Default)]
struct FakeState {
    launches: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeState {
    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn recorded_args(&self, tool: &str) -> Option<Value> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, args)| args.clone())
    }
}

struct FakeLauncher {
    state: Arc<FakeState>,
    replies: HashMap<String, ToolReply>,
}

impl FakeLauncher {
    fn new(replies: HashMap<String, ToolReply>) -> (Self, Arc<FakeState>) {
        let state = Arc::new(FakeState::default());
        (
            Self {
                state: Arc::clone(&state),
                replies,
            },
            state,
        )
    }
}

#[async_trait]
impl TransportLauncher for FakeLauncher {
    async fn launch(
        &self,
        _config: &ClientConfig,
    ) -> code_assistant::Result<Box<dyn ToolTransport>> {
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTransport {
            state: Arc::clone(&self.state),
            replies: self.replies.clone(),
        }))
    }
}

struct FakeTransport {
    state: Arc<FakeState>,
    replies: HashMap<String, ToolReply>,
}

#[async_trait]
impl ToolTransport for FakeTransport {
    async fn call_tool(&self, name: &str, arguments: Value) -> code_assistant::Result<ToolReply> {
        self.state
            .calls
            .lock()
            .expect("calls lock")
            .push((name.to_string(), arguments));
        Ok(self.replies.get(name).cloned().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> code_assistant::Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher whose every launch attempt fails.
struct FailingLauncher {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TransportLauncher for FailingLauncher {
    async fn launch(
        &self,
        _config: &ClientConfig,
    ) -> code_assistant::Result<Box<dyn ToolTransport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AssistantError::Rpc("spawn failed".to_string()))
    }
}

fn client_with(replies: HashMap<String, ToolReply>) -> (RpcClient, Arc<FakeState>) {
    let (launcher, state) = FakeLauncher::new(replies);
    (
        RpcClient::with_launcher(ClientConfig::default(), Box::new(launcher)),
        state,
    )
}

fn text_reply(tool: &str, text: &str) -> HashMap<String, ToolReply> {
    HashMap::from([(tool.to_string(), ToolReply::text(text))])
}

fn shapeless_reply(tool: &str) -> HashMap<String, ToolReply> {
    HashMap::from([(
        tool.to_string(),
        ToolReply {
            content: vec![ToolContent::Other],
        },
    )])
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn connect_twice_spawns_once() {
    let (mut client, state) = client_with(HashMap::new());

    client.connect().await.expect("first connect");
    client.connect().await.expect("second connect");

    assert_eq!(state.launches(), 1);
    assert_eq!(client.state(), SessionState::Connected);
}

#[tokio::test]
async fn operations_before_connect_fail_without_spawning() {
    let (client, state) = client_with(HashMap::new());

    let search = client.search(&SearchRequest::default()).await;
    assert!(matches!(search, Err(AssistantError::NotConnected)));

    let chat = client.chat(&ChatRequest::default()).await;
    assert!(matches!(chat, Err(AssistantError::NotConnected)));

    let stats = client.stats().await;
    assert!(matches!(stats, Err(AssistantError::NotConnected)));

    let ingest = client.ingest("demo", false).await;
    assert!(matches!(ingest, Err(AssistantError::NotConnected)));

    assert_eq!(state.launches(), 0);
}

#[tokio::test]
async fn disconnect_before_connect_is_safe() {
    let (mut client, state) = client_with(HashMap::new());

    client.disconnect().await.expect("teardown is unconditional");
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(state.closes(), 0);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let (mut client, state) = client_with(HashMap::new());

    client.connect().await.expect("connect");
    client.disconnect().await.expect("first disconnect");
    client.disconnect().await.expect("second disconnect");

    assert_eq!(state.closes(), 1);
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn failed_connect_leaves_session_disconnected() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut client = RpcClient::with_launcher(
        ClientConfig::default(),
        Box::new(FailingLauncher {
            attempts: Arc::clone(&attempts),
        }),
    );

    assert!(client.connect().await.is_err());
    assert_eq!(client.state(), SessionState::Disconnected);

    // A later connect attempt is not a no-op after a failure
    assert!(client.connect().await.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn operations_after_disconnect_fail_again() {
    let (mut client, _state) = client_with(HashMap::new());

    client.connect().await.expect("connect");
    client.disconnect().await.expect("disconnect");

    let search = client.search(&SearchRequest::default()).await;
    assert!(matches!(search, Err(AssistantError::NotConnected)));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_parses_payload_and_applies_default_top_k() {
    let payload = "## Result 1\nScore: 0.812\n**File**: a/b.py (lines 10-20)\n**Repository**: demo\n**Language**: python\n```python\nprint(1)\n```\n";
    let (mut client, state) = client_with(text_reply("search_code", payload));

    client.connect().await.expect("connect");
    let results = client
        .search(&SearchRequest {
            query: "auth".to_string(),
            ..Default::default()
        })
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.file_path, "a/b.py");

    let args = state.recorded_args("search_code").expect("recorded call");
    assert_eq!(args["query"], "auth");
    assert_eq!(args["top_k"], 5);
    // Unset filters are omitted from the payload, not sent as null
    assert!(args.get("repo_names").is_none());
    assert!(args.get("languages").is_none());
}

#[tokio::test]
async fn search_with_unusable_shape_degrades_to_empty() {
    let (mut client, _state) = client_with(shapeless_reply("search_code"));

    client.connect().await.expect("connect");
    let results = client
        .search(&SearchRequest {
            query: "anything".to_string(),
            ..Default::default()
        })
        .await
        .expect("shape degradation is not an error for search");

    assert!(results.is_empty());
}

#[tokio::test]
async fn search_forwards_explicit_filters_and_top_k() {
    let (mut client, state) = client_with(text_reply("search_code", "no blocks"));

    client.connect().await.expect("connect");
    client
        .search(&SearchRequest {
            query: "retry".to_string(),
            repo_names: Some(vec!["backend".to_string()]),
            languages: Some(vec!["rust".to_string()]),
            top_k: Some(12),
        })
        .await
        .expect("search");

    let args = state.recorded_args("search_code").expect("recorded call");
    assert_eq!(args["repo_names"], serde_json::json!(["backend"]));
    assert_eq!(args["languages"], serde_json::json!(["rust"]));
    assert_eq!(args["top_k"], 12);
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn chat_applies_config_model_and_parses_answer() {
    let payload = "**Assistant**:\nUse the session store.\n\n**Sources**:\n1. store.py (lines 1-9) - Score: 0.8\n";
    let (mut client, state) = client_with(text_reply("chat_with_code", payload));

    client.connect().await.expect("connect");
    let answer = client
        .chat(&ChatRequest {
            message: "where are sessions?".to_string(),
            ..Default::default()
        })
        .await
        .expect("chat");

    assert_eq!(answer.response, "Use the session store.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.model_used, "claude-sonnet-4-5");

    let args = state.recorded_args("chat_with_code").expect("recorded call");
    assert_eq!(args["message"], "where are sessions?");
    assert_eq!(args["max_context_chunks"], 5);
    assert_eq!(args["model"], "claude-sonnet-4-5");
}

#[tokio::test]
async fn chat_request_model_overrides_config_default() {
    let (mut client, state) = client_with(text_reply("chat_with_code", "ok"));

    client.connect().await.expect("connect");
    let answer = client
        .chat(&ChatRequest {
            message: "hi".to_string(),
            model: Some("claude-opus-4-5".to_string()),
            ..Default::default()
        })
        .await
        .expect("chat");

    assert_eq!(answer.model_used, "claude-opus-4-5");
    let args = state.recorded_args("chat_with_code").expect("recorded call");
    assert_eq!(args["model"], "claude-opus-4-5");
}

#[tokio::test]
async fn chat_with_unusable_shape_is_an_error() {
    let (mut client, _state) = client_with(shapeless_reply("chat_with_code"));

    client.connect().await.expect("connect");
    let result = client
        .chat(&ChatRequest {
            message: "hi".to_string(),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(AssistantError::InvalidResponse(_))));
}

// ============================================================================
// Stats and Ingest
// ============================================================================

#[tokio::test]
async fn stats_parses_counters() {
    let payload = "Total chunks: 10\nTotal files: 2\nTotal repositories: 1\nLanguages: rust\nLast updated: now\n";
    let (mut client, _state) = client_with(text_reply("get_repository_stats", payload));

    client.connect().await.expect("connect");
    let stats = client.stats().await.expect("stats");

    assert_eq!(stats.total_chunks, 10);
    assert_eq!(stats.languages, vec!["rust"]);
}

#[tokio::test]
async fn stats_with_unusable_shape_is_an_error() {
    let (mut client, _state) = client_with(shapeless_reply("get_repository_stats"));

    client.connect().await.expect("connect");
    assert!(matches!(
        client.stats().await,
        Err(AssistantError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn ingest_returns_raw_text_and_forwards_force() {
    let (mut client, state) = client_with(text_reply("ingest_repository", "Ingested 42 chunks"));

    client.connect().await.expect("connect");
    let status = client.ingest("backend", true).await.expect("ingest");

    assert_eq!(status, "Ingested 42 chunks");
    let args = state.recorded_args("ingest_repository").expect("recorded call");
    assert_eq!(args["repo_name"], "backend");
    assert_eq!(args["force"], true);
}

#[tokio::test]
async fn ingest_with_unusable_shape_falls_back_to_default_status() {
    let (mut client, _state) = client_with(shapeless_reply("ingest_repository"));

    client.connect().await.expect("connect");
    let status = client.ingest("backend", false).await.expect("ingest");

    assert_eq!(status, "Ingestion completed");
}
