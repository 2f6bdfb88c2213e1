use std::path::Path;
use std::sync::{Arc, Mutex};

use colored::Colorize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use pocketchat_agents::{AgentFacade, AgentReply, Persona, PersonaReply, SpreadReply};
use pocketchat_api::TokenUsage;
use pocketchat_logging::ConversationLogger;
use pocketchat_types::{ChatError, Turn};

use crate::context::{ConversationContext, SUMMARIZER_PROMPT};
use crate::log::MessageLog;
use crate::snapshot::SessionSnapshot;
use crate::store::{project, SessionPhase, StateStore};

/// Result of one primary turn. `compaction` carries the handle of the
/// fire-and-forget summarization task when this turn crossed the threshold;
/// the caller is free to drop it (the task keeps running) or await it.
#[derive(Debug)]
pub struct SendOutcome {
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub compaction: Option<JoinHandle<()>>,
}

/// Result of a temperature-spread turn: every completion, with the 0.7
/// result already retained in history as canonical.
#[derive(Debug)]
pub struct SpreadOutcome {
    pub replies: Vec<SpreadReply>,
    pub compaction: Option<JoinHandle<()>>,
}

/// Result of a persona consultation: every persona reply (successes and
/// failures both surfaced) plus the synthesis retained in history.
#[derive(Debug)]
pub struct ConsultOutcome {
    pub replies: Vec<PersonaReply>,
    pub synthesis: AgentReply,
    pub compaction: Option<JoinHandle<()>>,
}

/// Drives one conversation: owns the context under a single lock, persists
/// completed exchanges to the message log, publishes view snapshots, and
/// spawns background compaction when the exchange counter crosses the
/// threshold.
///
/// Sends take `&mut self`, so the compiler enforces the one-in-flight-
/// request rule for the primary path; the spawned compaction task is the
/// only concurrent writer and goes through the same context lock. Every
/// log write is nested inside the context lock, so the durable log always
/// reflects the context state of a single writer.
pub struct ChatSession {
    facade: AgentFacade,
    context: Arc<tokio::sync::Mutex<ConversationContext>>,
    log: Arc<Mutex<Box<dyn MessageLog>>>,
    store: Arc<StateStore>,
    logger: Option<Arc<tokio::sync::Mutex<ConversationLogger>>>,
    session_id: Uuid,
}

impl ChatSession {
    /// Create a session, rehydrating history from the message log.
    pub fn new(facade: AgentFacade, log: Box<dyn MessageLog>) -> anyhow::Result<Self> {
        let existing = log.get_all()?;
        let context =
            ConversationContext::rehydrate(existing, facade.config().compact_threshold);
        let store = Arc::new(StateStore::new());
        store.update(|s| s.turns = project(&context.compose_outbound()));

        Ok(Self {
            facade,
            context: Arc::new(tokio::sync::Mutex::new(context)),
            log: Arc::new(Mutex::new(log)),
            store,
            logger: None,
            session_id: Uuid::new_v4(),
        })
    }

    pub fn with_conversation_logger(mut self, logger: ConversationLogger) -> Self {
        self.logger = Some(Arc::new(tokio::sync::Mutex::new(logger)));
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<crate::store::ChatViewState> {
        self.store.subscribe()
    }

    /// Current outbound history: `[summary?] ++ unsummarized`.
    pub async fn history(&self) -> Vec<Turn> {
        self.context.lock().await.compose_outbound()
    }

    pub async fn summary(&self) -> Option<Turn> {
        self.context.lock().await.summary_turn().cloned()
    }

    pub async fn exchanges_since_compaction(&self) -> u32 {
        self.context.lock().await.exchanges_since_compaction()
    }

    /// Read back the durable message log.
    pub fn log_snapshot(&self) -> anyhow::Result<Vec<Turn>> {
        self.log.lock().unwrap().get_all()
    }

    /// One primary turn: append the user turn, call the endpoint, reconcile.
    /// On failure the user turn is rolled back and history is exactly what
    /// it was before this call.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome, ChatError> {
        let outbound = self.begin_turn(text).await?;

        match self.facade.ask_with_history(&outbound).await {
            Ok(reply) => {
                let compaction = self.complete_turn(text, &reply).await;
                Ok(SendOutcome {
                    text: reply.text,
                    usage: reply.usage,
                    compaction,
                })
            }
            Err(e) => {
                self.fail_turn(e.user_message()).await;
                Err(e)
            }
        }
    }

    /// One turn completed at each spread temperature. All three completions
    /// are surfaced; only the canonical (0.7) result is retained in history.
    /// A failed canonical completion fails the turn and rolls back.
    pub async fn send_spread(&mut self, text: &str) -> Result<SpreadOutcome, ChatError> {
        let outbound = self.begin_turn(text).await?;
        let replies = self.facade.temperature_spread(&outbound).await;

        let canonical = replies
            .iter()
            .find(|r| r.is_canonical())
            .map(|r| r.result.clone())
            .unwrap_or_else(|| Err(ChatError::Network("no canonical completion".into())));

        match canonical {
            Ok(reply) => {
                let compaction = self.complete_turn(text, &reply).await;
                Ok(SpreadOutcome {
                    replies,
                    compaction,
                })
            }
            Err(e) => {
                self.fail_turn(e.user_message()).await;
                Err(e)
            }
        }
    }

    /// Persona consultation: sequential fan-out, every reply surfaced, then
    /// a synthesis call over the successes. The synthesis is what history
    /// retains. If every persona failed, synthesis is skipped, the user
    /// turn is rolled back exactly once, and an aggregate failure is
    /// reported.
    pub async fn consult(
        &mut self,
        text: &str,
        personas: &[Persona],
    ) -> Result<ConsultOutcome, ChatError> {
        if personas.is_empty() {
            return Err(ChatError::invalid_argument("no personas to consult"));
        }
        let outbound = self.begin_turn(text).await?;
        let replies = self.facade.consult_multiple(&outbound, personas).await;

        if replies.iter().all(|r| !r.is_success()) {
            let detail: Vec<String> = replies
                .iter()
                .filter_map(|r| {
                    r.result
                        .as_ref()
                        .err()
                        .map(|e| format!("{}: {}", r.persona, e.user_message()))
                })
                .collect();
            self.fail_turn(format!(
                "all {} personas failed ({})",
                replies.len(),
                detail.join("; ")
            ))
            .await;
            let first = replies
                .into_iter()
                .find_map(|r| r.result.err())
                .unwrap_or_else(|| ChatError::Network("persona fan-out failed".into()));
            return Err(first);
        }

        match self.facade.synthesize(&outbound, &replies).await {
            Ok(synthesis) => {
                let compaction = self.complete_turn(text, &synthesis).await;
                Ok(ConsultOutcome {
                    replies,
                    synthesis,
                    compaction,
                })
            }
            Err(e) => {
                self.fail_turn(e.user_message()).await;
                Err(e)
            }
        }
    }

    /// Reset the conversation and wipe the durable log in one operation.
    pub async fn clear(&mut self) -> anyhow::Result<()> {
        {
            let mut ctx = self.context.lock().await;
            ctx.clear();
            self.log.lock().unwrap().delete_all()?;
        }
        self.store.update(|s| {
            s.turns.clear();
            s.phase = SessionPhase::Idle;
            s.busy = false;
            s.last_error = None;
        });
        Ok(())
    }

    /// Save the conversation to a snapshot file.
    pub async fn save_state(&self, path: &Path) -> anyhow::Result<String> {
        let snapshot = {
            let ctx = self.context.lock().await;
            SessionSnapshot::capture(&ctx, self.store.snapshot().total_tokens)
        };
        snapshot.save(path)
    }

    /// Replace the conversation with a saved snapshot and rewrite the log
    /// to match.
    pub async fn load_state(&mut self, path: &Path) -> anyhow::Result<String> {
        let snapshot = SessionSnapshot::load(path)?;
        let total_tokens = snapshot.total_tokens;
        let log_turns = snapshot.log_turns();
        let restored = snapshot.into_context(self.facade.config().compact_threshold);
        let view = project(&restored.compose_outbound());
        let turn_count = log_turns.len();

        {
            let mut ctx = self.context.lock().await;
            *ctx = restored;
            let mut log = self.log.lock().unwrap();
            log.delete_all()?;
            for turn in &log_turns {
                log.insert(turn)?;
            }
        }
        self.store.update(|s| {
            s.turns = view;
            s.total_tokens = total_tokens;
            s.phase = SessionPhase::Idle;
            s.busy = false;
            s.last_error = None;
        });
        Ok(format!(
            "Loaded conversation from {} ({} turns)",
            path.display(),
            turn_count
        ))
    }

    async fn begin_turn(&self, text: &str) -> Result<Vec<Turn>, ChatError> {
        let outbound = {
            let mut ctx = self.context.lock().await;
            ctx.append_user_turn(text)?;
            ctx.compose_outbound()
        };
        self.store.update(|s| {
            s.phase = SessionPhase::AwaitingReply;
            s.busy = true;
            s.last_error = None;
            s.turns = project(&outbound);
        });
        Ok(outbound)
    }

    async fn complete_turn(&self, user_text: &str, reply: &AgentReply) -> Option<JoinHandle<()>> {
        let (due, view) = {
            let mut ctx = self.context.lock().await;
            let due = ctx.on_success(&reply.text);
            let assistant = ctx.unsummarized().last().cloned();

            // The completed exchange is persisted as a pair while the
            // context lock is still held (context lock, then log lock),
            // so a rolled-back turn never reaches the log and a compaction
            // rewrite running concurrently sees either the whole pair or
            // none of it.
            let mut log = self.log.lock().unwrap();
            if let Err(e) = log.insert(&Turn::user(user_text.trim())) {
                eprintln!("{} failed to persist user turn: {}", "⚠️".yellow(), e);
            }
            if let Some(turn) = &assistant {
                if let Err(e) = log.insert(turn) {
                    eprintln!("{} failed to persist assistant turn: {}", "⚠️".yellow(), e);
                }
            }
            drop(log);
            (due, project(&ctx.compose_outbound()))
        };
        self.log_conversation("user", user_text.trim()).await;
        self.log_conversation("assistant", &reply.text).await;

        let turn_tokens = reply.usage.map(|u| u.total_tokens as u64).unwrap_or(0);
        self.store.update(|s| {
            s.busy = false;
            s.turns = view;
            s.total_tokens += turn_tokens;
            s.phase = if due {
                SessionPhase::AwaitingSummary
            } else {
                SessionPhase::Idle
            };
        });

        if due {
            Some(self.spawn_compaction())
        } else {
            None
        }
    }

    async fn fail_turn(&self, message: String) {
        let view = {
            let mut ctx = self.context.lock().await;
            ctx.on_failure();
            project(&ctx.compose_outbound())
        };
        self.store.update(|s| {
            s.busy = false;
            s.phase = SessionPhase::Idle;
            s.turns = view;
            s.last_error = Some(message);
        });
    }

    /// Fire-and-forget compaction. Runs as a continuation of the successful
    /// turn; its failure is logged and never surfaces as the turn's error.
    fn spawn_compaction(&self) -> JoinHandle<()> {
        let context = Arc::clone(&self.context);
        let log = Arc::clone(&self.log);
        let store = Arc::clone(&self.store);
        let facade = self.facade.clone();
        let logger = self.logger.clone();

        tokio::spawn(async move {
            let request = { context.lock().await.build_compaction_request() };
            let Some(turns) = request else {
                store.update(|s| s.phase = SessionPhase::Idle);
                return;
            };
            // Turns covered by this request: everything but the optional
            // leading summary and the trailing instruction.
            let summarized_len = turns.len() - 1 - usize::from(turns[0].is_summary());

            match facade.ask_with_custom_prompt(&turns, SUMMARIZER_PROMPT).await {
                Ok(reply) => {
                    let summary_turn = {
                        let mut ctx = context.lock().await;
                        ctx.apply_summary(&reply.text, summarized_len);
                        let summary_turn = ctx.summary_turn().cloned();

                        // Rewrite the log while the context lock is still
                        // held (same context-then-log order as a completing
                        // turn), so an exchange that finishes around the
                        // rewrite is neither duplicated nor dropped.
                        if let Some(summary) = &summary_turn {
                            let mut log = log.lock().unwrap();
                            if let Err(e) = log.delete_all() {
                                eprintln!("{} failed to rewrite message log: {}", "⚠️".yellow(), e);
                            } else {
                                let _ = log.insert(summary);
                                for turn in ctx.unsummarized() {
                                    let _ = log.insert(turn);
                                }
                            }
                        }
                        summary_turn
                    };

                    if let (Some(logger), Some(summary)) = (&logger, &summary_turn) {
                        logger.lock().await.log("system", &summary.content, None).await;
                    }
                    store.update(|s| s.phase = SessionPhase::Idle);
                }
                Err(e) => {
                    // Best effort: old summary and unsummarized turns are
                    // retained; the next threshold crossing retries.
                    eprintln!("{} summarization failed, keeping full history: {}", "⚠️".yellow(), e);
                    store.update(|s| s.phase = SessionPhase::Idle);
                }
            }
        })
    }

    async fn log_conversation(&self, role: &str, content: &str) {
        if let Some(logger) = &self.logger {
            let model = self.facade.config().model.clone();
            logger.lock().await.log(role, content, Some(&model)).await;
        }
    }
}
