use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use pocketchat_agents::AgentFacade;
use pocketchat_api::HttpChatTransport;
use pocketchat_chat::{ChatSession, JsonlLog};
use pocketchat_logging::ConversationLogger;
use pocketchat_types::ChatError;

mod cli;
mod config;
mod repl;

use cli::Cli;
use config::{build_config, EnvKeyProvider};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let chat_config = match build_config(&cli, &EnvKeyProvider) {
        Ok(config) => config,
        Err(ChatError::NotConfigured) => {
            eprintln!(
                "{} No API key found. Set POCKETCHAT_API_KEY (or OPENAI_API_KEY) and retry.",
                "⚠️".red()
            );
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mut transport =
        HttpChatTransport::new(&chat_config.base_url, chat_config.api_key.clone())?;
    if cli.log_requests {
        transport = transport.with_request_log_dir(cli.workspace.join("logs"));
    }
    println!(
        "{} Using {} at {}",
        "🚀".cyan(),
        chat_config.model.cyan(),
        transport.api_url()
    );

    let facade = AgentFacade::new(chat_config, Arc::new(transport))?;
    let log = JsonlLog::new(cli.workspace.join("history.jsonl"));

    let mut session = ChatSession::new(facade, Box::new(log))
        .context("failed to rehydrate conversation history")?;
    match ConversationLogger::new(&cli.workspace).await {
        Ok(logger) => session = session.with_conversation_logger(logger),
        Err(e) => eprintln!("{} conversation logging disabled: {}", "⚠️".yellow(), e),
    }

    repl::run(&mut session, &cli.workspace).await
}
