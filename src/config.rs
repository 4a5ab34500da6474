//! Client configuration.
//!
//! Every knob resolves with the same precedence: explicit CLI argument,
//! then `CODE_ASSISTANT_*` environment variable, then built-in default.
//! The built-ins mirror the server's standard deployment layout.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_SERVER_COMMAND: &str = "python";
pub const DEFAULT_SERVER_PATH: &str = "../code-rag";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_CONTEXT: usize = 5;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Command used to launch the MCP server process
    pub server_command: String,
    pub server_args: Vec<String>,
    /// Working directory the server process is spawned in
    pub server_path: PathBuf,
    pub default_model: String,
    pub default_top_k: usize,
    pub default_max_context: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_command: DEFAULT_SERVER_COMMAND.to_string(),
            server_args: vec!["-m".to_string(), "src.mcp_server".to_string()],
            server_path: PathBuf::from(DEFAULT_SERVER_PATH),
            default_model: DEFAULT_MODEL.to_string(),
            default_top_k: DEFAULT_TOP_K,
            default_max_context: DEFAULT_MAX_CONTEXT,
        }
    }
}

impl ClientConfig {
    /// Built-in defaults overlaid with environment variables. Unparseable
    /// numeric values keep the built-in.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = env::var("CODE_ASSISTANT_SERVER_PATH") {
            config.server_path = PathBuf::from(path);
        }
        if let Ok(command) = env::var("CODE_ASSISTANT_SERVER_COMMAND") {
            config.server_command = command;
        }
        if let Ok(model) = env::var("CODE_ASSISTANT_MODEL") {
            config.default_model = model;
        }
        if let Ok(top_k) = env::var("CODE_ASSISTANT_TOP_K") {
            if let Ok(value) = top_k.parse() {
                config.default_top_k = value;
            }
        }
        if let Ok(max_context) = env::var("CODE_ASSISTANT_MAX_CONTEXT") {
            if let Ok(value) = max_context.parse() {
                config.default_max_context = value;
            }
        }
        config
    }

    /// Applies an explicit `--server-path` argument over whatever the
    /// environment or defaults resolved.
    pub fn with_server_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.server_path = path;
        }
        self
    }
}
