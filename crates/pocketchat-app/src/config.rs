use std::env;

use pocketchat_types::{ApiKeyProvider, ChatConfig, ChatError};

use crate::cli::Cli;

/// Environment-backed key retrieval. `POCKETCHAT_API_KEY` wins; the
/// conventional `OPENAI_API_KEY` works as a fallback.
pub struct EnvKeyProvider;

impl ApiKeyProvider for EnvKeyProvider {
    fn api_key(&self) -> Option<String> {
        env::var("POCKETCHAT_API_KEY")
            .ok()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Assemble the explicit configuration value object from CLI flags and the
/// injected key provider. Done once at startup.
pub fn build_config(cli: &Cli, keys: &dyn ApiKeyProvider) -> Result<ChatConfig, ChatError> {
    let api_key = keys.api_key().ok_or(ChatError::NotConfigured)?;
    let mut config = ChatConfig::new(api_key);
    config.base_url = cli.base_url.clone();
    config.model = cli.model.clone();
    config.temperature = cli.temperature;
    config.max_tokens = cli.max_tokens;
    config.compact_threshold = cli.compact_threshold;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    struct FixedKey(Option<String>);

    impl ApiKeyProvider for FixedKey {
        fn api_key(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let cli = Cli::parse_from(["pocketchat"]);
        let err = build_config(&cli, &FixedKey(None)).unwrap_err();
        assert!(matches!(err, ChatError::NotConfigured));
    }

    #[test]
    fn test_config_carries_cli_overrides() {
        let cli = Cli::parse_from(["pocketchat", "--model", "test-model", "--compact-threshold", "3"]);
        let config = build_config(&cli, &FixedKey(Some("sk-test".into()))).unwrap();
        assert_eq!(config.model, "test-model");
        assert_eq!(config.compact_threshold, 3);
        assert_eq!(config.api_key, "sk-test");
    }
}
