//! MCP client session: lifecycle and the four remote operations.

pub mod transport;

pub use transport::{StdioLauncher, ToolContent, ToolReply, ToolTransport, TransportLauncher};

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{AssistantError, Result};
use crate::extract;
use crate::model::{ChatAnswer, ChatRequest, RepositoryStats, ScoredMatch, SearchRequest};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client for one session against the code search server.
///
/// One logical session, one in-flight call at a time; operations are
/// sequential awaits with no pipelining and no timeout. The subprocess
/// behind the transport is owned exclusively by this client: only
/// [`RpcClient::disconnect`] terminates it, so callers must run it on every
/// exit path, including after an error.
pub struct RpcClient {
    config: ClientConfig,
    launcher: Box<dyn TransportLauncher>,
    transport: Option<Box<dyn ToolTransport>>,
    state: SessionState,
}

impl RpcClient {
    /// Client with the production stdio transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_launcher(config, Box::new(StdioLauncher))
    }

    /// Client with a custom transport launcher. Tests use this to drive the
    /// session state machine without spawning processes.
    pub fn with_launcher(config: ClientConfig, launcher: Box<dyn TransportLauncher>) -> Self {
        Self {
            config,
            launcher,
            transport: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Establishes the session: launches the server process, wires its stdio
    /// as the RPC transport, and performs the handshake. No-op when already
    /// connected. On failure the session stays disconnected and the error
    /// surfaces to the caller.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Ok(());
        }

        self.state = SessionState::Connecting;
        match self.launcher.launch(&self.config).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = SessionState::Connected;
                info!("connected to code search server");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Tears the session down: closes the transport and terminates the
    /// subprocess when one is running. Unconditionally leaves the session
    /// disconnected; safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
            info!("disconnected from code search server");
        }
        Ok(())
    }

    /// Semantic search over the indexed corpus. A response without a usable
    /// text item degrades to an empty result set; absence of matches is not
    /// an error.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredMatch>> {
        let transport = self.transport()?;

        let mut args = Map::new();
        args.insert("query".to_string(), json!(request.query));
        if let Some(repos) = &request.repo_names {
            args.insert("repo_names".to_string(), json!(repos));
        }
        if let Some(languages) = &request.languages {
            args.insert("languages".to_string(), json!(languages));
        }
        args.insert(
            "top_k".to_string(),
            json!(request.top_k.unwrap_or(self.config.default_top_k)),
        );

        let reply = transport.call_tool("search_code", Value::Object(args)).await?;
        match reply.first_text() {
            Some(text) => Ok(extract::extract_matches(text)),
            None => {
                debug!("search response carried no text content");
                Ok(Vec::new())
            }
        }
    }

    /// Asks a question about the codebase, answered with retrieved context.
    /// A missing answer is always an error, never silently empty.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatAnswer> {
        let transport = self.transport()?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut args = Map::new();
        args.insert("message".to_string(), json!(request.message));
        if let Some(repos) = &request.repo_names {
            args.insert("repo_names".to_string(), json!(repos));
        }
        if let Some(languages) = &request.languages {
            args.insert("languages".to_string(), json!(languages));
        }
        args.insert(
            "max_context_chunks".to_string(),
            json!(request
                .max_context_chunks
                .unwrap_or(self.config.default_max_context)),
        );
        args.insert("model".to_string(), json!(model));

        let reply = transport
            .call_tool("chat_with_code", Value::Object(args))
            .await?;
        let text = reply.first_text().ok_or_else(|| {
            AssistantError::InvalidResponse("chat response carried no text content".to_string())
        })?;
        Ok(extract::extract_chat_answer(text, &model))
    }

    /// Aggregate counters for the indexed corpus. A missing report is always
    /// an error.
    pub async fn stats(&self) -> Result<RepositoryStats> {
        let transport = self.transport()?;

        let reply = transport
            .call_tool("get_repository_stats", json!({}))
            .await?;
        let text = reply.first_text().ok_or_else(|| {
            AssistantError::InvalidResponse("stats response carried no text content".to_string())
        })?;
        Ok(extract::extract_stats(text))
    }

    /// Triggers ingestion of one repository and returns the server's status
    /// text verbatim; no structured extraction.
    pub async fn ingest(&self, repo_name: &str, force: bool) -> Result<String> {
        let transport = self.transport()?;

        let args = json!({ "repo_name": repo_name, "force": force });
        let reply = transport.call_tool("ingest_repository", args).await?;
        Ok(reply
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| "Ingestion completed".to_string()))
    }

    fn transport(&self) -> Result<&dyn ToolTransport> {
        if self.state != SessionState::Connected {
            return Err(AssistantError::NotConnected);
        }
        self.transport.as_deref().ok_or(AssistantError::NotConnected)
    }
}
