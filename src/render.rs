//! Plain-text rendering of typed results for the terminal.
//!
//! Rendering functions are pure (`-> String`) so the layout is
//! unit-testable; the command layer just prints what they return.

use crate::model::{ChatAnswer, RepositoryStats, ScoredMatch};

/// Code lines shown per match before truncation.
const MAX_CODE_LINES: usize = 10;

pub fn render_matches(matches: &[ScoredMatch]) -> String {
    if matches.is_empty() {
        return "No results found.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("Found {} results:\n\n", matches.len()));

    for (index, result) in matches.iter().enumerate() {
        let chunk = &result.chunk;
        out.push_str(&format!("{}. {}\n", index + 1, chunk.file_path));
        out.push_str(&format!("   Repository: {}\n", chunk.repo_name));
        out.push_str(&format!(
            "   Lines: {}-{}\n",
            chunk.start_line, chunk.end_line
        ));
        out.push_str(&format!("   Language: {}\n", chunk.language));
        out.push_str(&format!("   Score: {:.3}\n", result.score));
        if let Some(name) = chunk.name() {
            out.push_str(&format!("   Name: {name}\n"));
        }

        let lines: Vec<&str> = chunk.content.lines().collect();
        out.push_str("   Code:\n");
        for line in lines.iter().take(MAX_CODE_LINES) {
            out.push_str(&format!("   | {line}\n"));
        }
        if lines.len() > MAX_CODE_LINES {
            out.push_str(&format!(
                "   | ... ({} more lines)\n",
                lines.len() - MAX_CODE_LINES
            ));
        }
        out.push('\n');
    }

    out
}

pub fn render_chat_answer(answer: &ChatAnswer) -> String {
    let mut out = String::new();
    out.push_str("Assistant:\n");
    out.push_str(&answer.response);
    out.push('\n');

    if !answer.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (index, source) in answer.sources.iter().enumerate() {
            let chunk = &source.chunk;
            out.push_str(&format!(
                "{}. {} (lines {}-{}) Score: {:.3}\n",
                index + 1,
                chunk.file_path,
                chunk.start_line,
                chunk.end_line,
                source.score
            ));
        }
    }

    out.push_str(&format!("\nModel: {}\n", answer.model_used));
    out
}

pub fn render_stats(stats: &RepositoryStats) -> String {
    let mut out = String::new();
    out.push_str("Repository statistics:\n\n");
    out.push_str(&format!("Total chunks: {}\n", stats.total_chunks));
    out.push_str(&format!("Total files: {}\n", stats.total_files));
    out.push_str(&format!(
        "Total repositories: {}\n",
        stats.total_repositories
    ));
    if !stats.languages.is_empty() {
        out.push_str(&format!("Languages: {}\n", stats.languages.join(", ")));
    }
    out.push_str(&format!("Last updated: {}\n", stats.last_updated));
    out
}
