//! Transport abstraction for the MCP session.
//!
//! The session state machine needs exactly two capabilities from a
//! transport: issue one named tool call, and close. The production
//! implementation spawns the server subprocess and speaks MCP over its
//! stdio; tests substitute an in-memory fake through [`TransportLauncher`].

use async_trait::async_trait;
use rmcp::model::CallToolRequestParams;
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Command;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AssistantError, Result};

/// One content item from a tool response.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    Text(String),
    /// Image, resource, or any other item kind the client does not consume.
    Other,
}

/// The content list of a single tool invocation's response.
#[derive(Debug, Clone, Default)]
pub struct ToolReply {
    pub content: Vec<ToolContent>,
}

impl ToolReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text(text.into())],
        }
    }

    /// First content item, when it is text. The extractors consume only
    /// this; a reply whose first item is anything else is an unusable shape.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ToolContent::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// A connected RPC channel able to issue tool calls, one at a time.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolReply>;

    /// Closes the channel and releases the underlying resources.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Capability to establish a transport; `connect()` runs this once per
/// session.
#[async_trait]
pub trait TransportLauncher: Send + Sync {
    async fn launch(&self, config: &ClientConfig) -> Result<Box<dyn ToolTransport>>;
}

/// Production launcher: spawns the configured server command in the
/// configured working directory and performs the MCP handshake over the
/// child's stdio.
pub struct StdioLauncher;

#[async_trait]
impl TransportLauncher for StdioLauncher {
    async fn launch(&self, config: &ClientConfig) -> Result<Box<dyn ToolTransport>> {
        let mut command = Command::new(&config.server_command);
        command
            .args(&config.server_args)
            .current_dir(&config.server_path);
        debug!(
            command = %config.server_command,
            cwd = %config.server_path.display(),
            "spawning MCP server"
        );

        let child = TokioChildProcess::new(command)
            .map_err(|e| AssistantError::Rpc(format!("failed to spawn server process: {e}")))?;
        let service = ()
            .serve(child)
            .await
            .map_err(|e| AssistantError::Rpc(format!("MCP handshake failed: {e}")))?;

        Ok(Box::new(StdioTransport { service }))
    }
}

struct StdioTransport {
    service: RunningService<RoleClient, ()>,
}

#[async_trait]
impl ToolTransport for StdioTransport {
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolReply> {
        let result = self
            .service
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
                task: None,
            })
            .await
            .map_err(|e| AssistantError::Rpc(format!("{name} call failed: {e}")))?;

        let content = result
            .content
            .into_iter()
            .map(|item| match item.as_text() {
                Some(text) => ToolContent::Text(text.text.clone()),
                None => ToolContent::Other,
            })
            .collect();

        Ok(ToolReply { content })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.service
            .cancel()
            .await
            .map_err(|e| AssistantError::Rpc(format!("failed to stop server process: {e}")))?;
        Ok(())
    }
}
