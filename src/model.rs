//! Typed results reconstructed from server response payloads.
//!
//! Everything here is transient: built fresh from one response, handed to the
//! renderer or caller, then dropped. Chunk ids are per-response sequence
//! numbers, not stable keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key for a chunk's optional display name.
pub const METADATA_NAME: &str = "name";

/// A contiguous slice of source code with location and classification metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Locally assigned id (`chunk_0`, `chunk_1`, ...), dense over the
    /// accepted result set
    pub id: String,
    pub repo_name: String,
    pub file_path: String,
    pub language: String,
    pub content: String,
    /// 1-based, inclusive
    pub start_line: u32,
    /// 1-based, inclusive; always >= start_line
    pub end_line: u32,
    /// Classification tag, e.g. "code_block" or "reference"
    pub chunk_type: String,
    /// Open metadata mapping; currently only an optional display name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl CodeChunk {
    /// Display name from metadata, when the server provided one.
    pub fn name(&self) -> Option<&str> {
        self.metadata.get(METADATA_NAME).map(String::as_str)
    }
}

/// A chunk paired with its relevance score.
///
/// Scores are conventionally in [0, 1] but not clamped; result-set order is
/// whatever order the server emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub chunk: CodeChunk,
    pub score: f64,
}

/// A chat answer with its supporting citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub response: String,
    /// Citations in server order; may be empty
    pub sources: Vec<ScoredMatch>,
    pub model_used: String,
}

/// Aggregate counters for the indexed corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub total_chunks: u64,
    pub total_files: u64,
    pub total_repositories: u64,
    /// First-seen order from the response text
    pub languages: Vec<String>,
    /// Opaque timestamp string; "Unknown" when the server omitted it
    pub last_updated: String,
}

impl Default for RepositoryStats {
    fn default() -> Self {
        Self {
            total_chunks: 0,
            total_files: 0,
            total_repositories: 0,
            languages: Vec::new(),
            last_updated: "Unknown".to_string(),
        }
    }
}

/// Options for one search call.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub repo_names: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    /// Number of results to request; the client default applies when unset
    pub top_k: Option<usize>,
}

/// Options for one chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub repo_names: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    /// Maximum retrieved chunks to hand the model; client default when unset
    pub max_context_chunks: Option<usize>,
    /// Model identifier; the configured default applies when unset
    pub model: Option<String>,
}
