use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use pocketchat_agents::Persona;
use pocketchat_chat::ChatSession;

const JSON_SCHEMA_SENTENCE: &str = "Always reply with a single JSON object of the form \
    {\"agentMessage\": \"<your reply>\"} and nothing else.";

/// The built-in consultation panel for `/personas`.
fn default_personas() -> Vec<Persona> {
    vec![
        Persona::new(
            "optimist",
            format!("You are a relentless optimist highlighting upsides and opportunities. {JSON_SCHEMA_SENTENCE}"),
        ),
        Persona::new(
            "skeptic",
            format!("You are a careful skeptic probing for risks and weak assumptions. {JSON_SCHEMA_SENTENCE}"),
        ),
        Persona::new(
            "pragmatist",
            format!("You are a pragmatist focused on what can actually be done next. {JSON_SCHEMA_SENTENCE}"),
        ),
    ]
}

pub async fn run(session: &mut ChatSession, workspace: &Path) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!(
        "{} pocketchat ready. Type a message, or /help for commands.",
        "💬".cyan()
    );

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        if let Some(command) = input.strip_prefix('/') {
            let mut parts = command.splitn(2, ' ');
            let name = parts.next().unwrap_or_default();
            let rest = parts.next().unwrap_or("").trim();
            match name {
                "quit" | "exit" => break,
                "help" => print_help(),
                "clear" => {
                    session.clear().await?;
                    println!("{} Conversation cleared.", "🧹".yellow());
                }
                "save" => {
                    let path = snapshot_path(workspace, rest);
                    match session.save_state(&path).await {
                        Ok(msg) => println!("{} {}", "💾".green(), msg),
                        Err(e) => eprintln!("{} {}", "⚠️".red(), e),
                    }
                }
                "load" => {
                    let path = snapshot_path(workspace, rest);
                    match session.load_state(&path).await {
                        Ok(msg) => println!("{} {}", "📂".green(), msg),
                        Err(e) => eprintln!("{} {}", "⚠️".red(), e),
                    }
                }
                "spread" => {
                    if rest.is_empty() {
                        eprintln!("{} usage: /spread <question>", "⚠️".yellow());
                        continue;
                    }
                    run_spread(session, rest).await;
                }
                "personas" => {
                    if rest.is_empty() {
                        eprintln!("{} usage: /personas <question>", "⚠️".yellow());
                        continue;
                    }
                    run_personas(session, rest).await;
                }
                _ => eprintln!("{} unknown command: /{}", "⚠️".yellow(), name),
            }
            continue;
        }

        match session.send(input).await {
            Ok(outcome) => {
                println!("{} {}", "assistant>".green().bold(), outcome.text);
                print_usage(session);
            }
            Err(e) => eprintln!("{} {}", "⚠️".red(), e.user_message()),
        }
    }

    println!("{} bye", "👋".cyan());
    Ok(())
}

async fn run_spread(session: &mut ChatSession, question: &str) {
    match session.send_spread(question).await {
        Ok(outcome) => {
            for reply in &outcome.replies {
                let label = format!("t={:.1}", reply.temperature);
                match &reply.result {
                    Ok(r) => {
                        let marker = if reply.is_canonical() { "*" } else { " " };
                        println!("{}{} {}", label.cyan(), marker, r.text);
                    }
                    Err(e) => eprintln!("{}  {}", label.cyan(), e.user_message().red()),
                }
            }
            println!("{}", "(* retained in history)".bright_black());
            print_usage(session);
        }
        Err(e) => eprintln!("{} {}", "⚠️".red(), e.user_message()),
    }
}

async fn run_personas(session: &mut ChatSession, question: &str) {
    let personas = default_personas();
    match session.consult(question, &personas).await {
        Ok(outcome) => {
            for reply in &outcome.replies {
                match &reply.result {
                    Ok(r) => println!("{} {}", format!("[{}]", reply.persona).cyan(), r.text),
                    Err(e) => eprintln!(
                        "{} {}",
                        format!("[{}]", reply.persona).cyan(),
                        e.user_message().red()
                    ),
                }
            }
            println!("{} {}", "synthesis>".green().bold(), outcome.synthesis.text);
            print_usage(session);
        }
        Err(e) => eprintln!("{} {}", "⚠️".red(), e.user_message()),
    }
}

fn print_usage(session: &ChatSession) {
    let state = session.store().snapshot();
    println!(
        "{}",
        format!("📊 session tokens: {}", state.total_tokens).bright_black()
    );
}

fn snapshot_path(workspace: &Path, rest: &str) -> PathBuf {
    if rest.is_empty() {
        workspace.join("snapshot.json")
    } else {
        PathBuf::from(rest)
    }
}

fn print_help() {
    println!("  /clear             reset the conversation and wipe the log");
    println!("  /save [path]       save the conversation snapshot");
    println!("  /load [path]       load a conversation snapshot");
    println!("  /spread <q>        ask at temperatures 0.0 / 0.7 / 1.0");
    println!("  /personas <q>      consult the persona panel and synthesize");
    println!("  /quit              exit");
}
