use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Dump one outbound request to a timestamped file for persistent
/// debugging. The API key is redacted to a short prefix.
pub fn log_request_to_file(
    dir: &Path,
    url: &str,
    model: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create request log dir {}", dir.display()))?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let model_name = model.replace('/', "-");
    let filename = dir.join(format!("req-{}-{}.txt", timestamp, model_name));

    let key_prefix: String = api_key.chars().take(10).collect();

    let mut log_content = String::new();
    log_content.push_str("HTTP REQUEST LOG\n");
    log_content.push_str("================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp));
    log_content.push_str(&format!("Model: {}\n", model));
    log_content.push_str(&format!("URL: {}\n\n", url));
    log_content.push_str("Headers:\n");
    log_content.push_str("  Content-Type: application/json\n");
    log_content.push_str(&format!("  Authorization: Bearer {}***\n\n", key_prefix));
    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(body) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => {
            log_content.push_str(&format!("Error serializing request: {}\n", e));
        }
    }

    fs::write(&filename, log_content)
        .with_context(|| format!("failed to write request log to {}", filename.display()))?;

    Ok(filename)
}
