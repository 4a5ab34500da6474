pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod render;

pub use client::{
    RpcClient, SessionState, StdioLauncher, ToolContent, ToolReply, ToolTransport,
    TransportLauncher,
};
pub use config::ClientConfig;
pub use error::{AssistantError, Result};
pub use extract::{extract_chat_answer, extract_matches, extract_stats};
pub use model::{
    ChatAnswer, ChatRequest, CodeChunk, RepositoryStats, ScoredMatch, SearchRequest,
};
