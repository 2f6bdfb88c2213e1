use clap::Parser;
use std::path::PathBuf;

use pocketchat_types::{
    DEFAULT_BASE_URL, DEFAULT_COMPACT_THRESHOLD, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE,
};

/// Terminal front-end for the pocketchat agent
#[derive(Debug, Parser)]
#[command(name = "pocketchat", version, about)]
pub struct Cli {
    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "POCKETCHAT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Model id requested from the endpoint
    #[arg(long, env = "POCKETCHAT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Default sampling temperature
    #[arg(long, env = "POCKETCHAT_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Completion token cap per request
    #[arg(long, env = "POCKETCHAT_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// User/assistant exchanges between history compactions
    #[arg(
        long,
        env = "POCKETCHAT_COMPACT_THRESHOLD",
        default_value_t = DEFAULT_COMPACT_THRESHOLD
    )]
    pub compact_threshold: u32,

    /// Workspace directory for history, snapshots, and logs
    #[arg(long, env = "POCKETCHAT_WORKSPACE", default_value = ".pocketchat")]
    pub workspace: PathBuf,

    /// Dump every outbound request body to the workspace logs directory
    #[arg(long)]
    pub log_requests: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["pocketchat"]);
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.model, DEFAULT_MODEL);
        assert_eq!(cli.compact_threshold, DEFAULT_COMPACT_THRESHOLD);
        assert!(!cli.log_requests);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "pocketchat",
            "--base-url",
            "http://localhost:8080",
            "--compact-threshold",
            "3",
        ]);
        assert_eq!(cli.base_url, "http://localhost:8080");
        assert_eq!(cli.compact_threshold, 3);
    }
}
