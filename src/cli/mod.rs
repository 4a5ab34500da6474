mod commands;

pub use commands::{run_chat, run_ingest, run_search, run_stats, Cli, Commands};
