//! Reconstruction of typed results from the server's human-readable payloads.
//!
//! The server's tool responses are markdown-flavored reports, not a
//! machine-parseable schema. The stable labels (`Score:`, `**File**:`,
//! `Total chunks:`, ...) are the only contract; formatting outside the
//! labeled fields carries no meaning. Every function here is total: a
//! fragment that fails its pattern is dropped or defaulted, never raised.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{ChatAnswer, CodeChunk, RepositoryStats, ScoredMatch, METADATA_NAME};

/// Chunk kind assigned to full match blocks.
pub const CHUNK_TYPE_CODE: &str = "code_block";
/// Chunk kind assigned to citations, which carry location and score only.
pub const CHUNK_TYPE_REFERENCE: &str = "reference";

/// Section delimiter preceding each match block.
const RESULT_DELIMITER: &str = "## Result ";

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Score: ([\d.]+)").expect("score pattern"));
static FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*File\*\*: ([^\n]+)").expect("file pattern"));
static REPO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Repository\*\*: ([^\n]+)").expect("repository pattern"));
static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Language\*\*: ([^\n]+)").expect("language pattern"));
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Type\*\*: ([^\n]+)").expect("type pattern"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Name\*\*: ([^\n]+)").expect("name pattern"));
static LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(lines (\d+)-(\d+)\)").expect("line range pattern"));
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\w*\n(.*?)\n```").expect("code fence pattern"));
static ASSISTANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\*\*Assistant[^:]*\*\*:\n(.*?)(?:\n\n\*\*Sources\*\*|$)")
        .expect("assistant pattern")
});
static SOURCES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\*\*Sources\*\*[^:]*:\n(.*)$").expect("sources pattern"));
static SOURCE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\.\s+([^(]+)\s+\(lines\s+(\d+)-(\d+)\)\s+-\s+Score:\s+([\d.]+)")
        .expect("source line pattern")
});
static TOTAL_CHUNKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total chunks:\s*(\d+)").expect("total chunks pattern"));
static TOTAL_FILES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total files:\s*(\d+)").expect("total files pattern"));
static TOTAL_REPOS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total repositories:\s*(\d+)").expect("total repositories pattern"));
static LANGUAGES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Languages:\s*([^\n]+)").expect("languages pattern"));
static LAST_UPDATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Last updated:\s*([^\n]+)").expect("last updated pattern"));

/// Recovers scored matches from a search response payload.
///
/// The payload is divided into blocks by the `## Result N` delimiter; the
/// preamble before the first delimiter is discarded. A block contributes a
/// match only when score, file path, repository, and a fenced code body are
/// all present; anything else (a trailing summary section, a partial block)
/// is dropped silently. Ids are assigned densely over the accepted set, in
/// input order.
pub fn extract_matches(text: &str) -> Vec<ScoredMatch> {
    let mut matches = Vec::new();

    let mut blocks = text.split(RESULT_DELIMITER);
    blocks.next();

    for block in blocks {
        // The labeled header is everything before the fenced code body. A
        // block with no fence cannot produce a match, and keeping label
        // scanning out of the fence interior avoids false hits on code that
        // happens to contain a label.
        let Some(fence) = CODE_RE.captures(block) else {
            continue;
        };
        let fence_start = fence.get(0).map(|m| m.start()).unwrap_or(0);
        let header = &block[..fence_start];
        let content = fence[1].trim().to_string();

        let score = SCORE_RE
            .captures(header)
            .and_then(|c| c[1].parse::<f64>().ok());
        let file_value = FILE_RE.captures(header).map(|c| c[1].to_string());
        let repo_name = REPO_RE.captures(header).map(|c| c[1].trim().to_string());

        let (Some(score), Some(file_value), Some(repo_name)) = (score, file_value, repo_name)
        else {
            continue;
        };

        let (file_path, start_line, end_line) = split_file_value(&file_value);
        let language = capture_trimmed(&LANGUAGE_RE, header).unwrap_or_else(|| "unknown".into());
        let chunk_type = capture_trimmed(&TYPE_RE, header).unwrap_or_else(|| CHUNK_TYPE_CODE.into());

        let mut metadata = HashMap::new();
        if let Some(name) = capture_trimmed(&NAME_RE, header) {
            metadata.insert(METADATA_NAME.to_string(), name);
        }

        matches.push(ScoredMatch {
            chunk: CodeChunk {
                id: format!("chunk_{}", matches.len()),
                repo_name,
                file_path,
                language,
                content,
                start_line,
                end_line,
                chunk_type,
                metadata,
            },
            score,
        });
    }

    matches
}

/// Recovers a chat answer and its citations from a chat response payload.
///
/// The answer body lies between the `**Assistant...**:` label and a
/// following `**Sources**` label (or end of input); when the label is absent
/// the whole trimmed payload is the answer. Citation lines that do not match
/// the `N. path (lines A-B) - Score: X` shape are skipped. The payload never
/// echoes the model, so the caller supplies the identifier it requested.
pub fn extract_chat_answer(text: &str, model: &str) -> ChatAnswer {
    let response = ASSISTANT_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| text.trim().to_string());

    let mut sources = Vec::new();
    if let Some(caps) = SOURCES_RE.captures(text) {
        for line in caps[1].lines() {
            let Some(m) = SOURCE_LINE_RE.captures(line) else {
                continue;
            };
            let start_line: u32 = m[2].parse().unwrap_or(1);
            let end_line: u32 = m[3].parse().unwrap_or(start_line + 9);
            // The source text carries no repository, language, or content for
            // citations; only path, line range, and score are recoverable.
            sources.push(ScoredMatch {
                chunk: CodeChunk {
                    id: format!("source_{}", sources.len()),
                    repo_name: "unknown".to_string(),
                    file_path: m[1].trim().to_string(),
                    language: "unknown".to_string(),
                    content: String::new(),
                    start_line,
                    end_line: end_line.max(start_line),
                    chunk_type: CHUNK_TYPE_REFERENCE.to_string(),
                    metadata: HashMap::new(),
                },
                score: m[4].parse().unwrap_or(0.0),
            });
        }
    }

    ChatAnswer {
        response,
        sources,
        model_used: model.to_string(),
    }
}

/// Recovers aggregate counters from a stats response payload.
///
/// Each field is extracted independently by its own label; a missing or
/// unparseable field yields its documented default (0, empty list, or
/// "Unknown").
pub fn extract_stats(text: &str) -> RepositoryStats {
    let counter = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c[1].parse::<u64>().ok())
            .unwrap_or(0)
    };

    let languages = LANGUAGES_RE
        .captures(text)
        .map(|c| {
            c[1].split(',')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect()
        })
        .unwrap_or_default();

    RepositoryStats {
        total_chunks: counter(&TOTAL_CHUNKS_RE),
        total_files: counter(&TOTAL_FILES_RE),
        total_repositories: counter(&TOTAL_REPOS_RE),
        languages,
        last_updated: LAST_UPDATED_RE
            .captures(text)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

fn capture_trimmed(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].trim().to_string())
}

/// Splits a `**File**` value into path and line range. A trailing
/// `(lines A-B)` annotation supplies the range; without one the range
/// defaults to 1..10 (ten lines starting at the top).
fn split_file_value(value: &str) -> (String, u32, u32) {
    let path = value
        .split(" (")
        .next()
        .unwrap_or(value)
        .trim()
        .to_string();

    match LINES_RE.captures(value) {
        Some(caps) => {
            let start: u32 = caps[1].parse().unwrap_or(1);
            let end: u32 = caps[2].parse().unwrap_or(start + 9);
            (path, start, end.max(start))
        }
        None => (path, 1, 10),
    }
}
