use std::sync::Arc;

use pocketchat_api::{decode_reply, ChatRequest, ChatTransport, TokenUsage, WireMessage};
use pocketchat_types::{ChatConfig, ChatError, Role, Turn};

use crate::outcome::AskOutcome;
use crate::persona::{Persona, PersonaReply};

/// Default system instruction prepended to every outbound request at send
/// time. It pins the single-field JSON reply schema.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant in a mobile chat app. \
    Always reply with a single JSON object of the form {\"agentMessage\": \"<your reply>\"} \
    and nothing else. Do not wrap the JSON in markdown fences.";

/// System instruction for the synthesis call that consolidates persona replies.
pub const SYNTHESIS_PROMPT: &str = "You are an editor consolidating several expert answers \
    to the same question into one coherent reply. Merge the perspectives, resolve \
    disagreements explicitly, and keep it concise. Always reply with a single JSON object \
    of the form {\"agentMessage\": \"<your reply>\"} and nothing else.";

/// Temperatures used to obtain stylistically distinct completions for the
/// same prompt.
pub const SPREAD_TEMPERATURES: [f32; 3] = [0.0, 0.7, 1.0];

/// The spread result retained in history as canonical.
pub const CANONICAL_SPREAD_TEMPERATURE: f32 = 0.7;

/// A parsed reply: the agent message text plus optional usage metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// One completion from a temperature spread.
#[derive(Debug, Clone)]
pub struct SpreadReply {
    pub temperature: f32,
    pub result: Result<AgentReply, ChatError>,
}

impl SpreadReply {
    pub fn is_canonical(&self) -> bool {
        self.temperature == CANONICAL_SPREAD_TEMPERATURE
    }
}

/// Validated front door to the chat-completion endpoint. Holds the explicit
/// configuration value object and an injected transport; owns no history.
#[derive(Clone)]
pub struct AgentFacade {
    config: ChatConfig,
    transport: Arc<dyn ChatTransport>,
}

impl AgentFacade {
    /// Construct the facade. The configuration is validated here, before
    /// first use; a missing API key surfaces as `NotConfigured` now rather
    /// than on an arbitrary later turn.
    pub fn new(config: ChatConfig, transport: Arc<dyn ChatTransport>) -> Result<Self, ChatError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Single-turn ask with the default system prompt. No history.
    pub async fn ask(&self, question: &str) -> Result<AgentReply, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::invalid_argument("question must not be blank"));
        }
        let turns = [Turn::user(question)];
        self.dispatch(DEFAULT_SYSTEM_PROMPT, &turns, self.config.temperature)
            .await
    }

    /// Outcome-returning variant of [`ask`](Self::ask); never returns `Err`.
    pub async fn ask_safe(&self, question: &str) -> AskOutcome {
        self.ask(question).await.into()
    }

    /// Multi-turn ask; the default system prompt is prepended at send time.
    pub async fn ask_with_history(&self, turns: &[Turn]) -> Result<AgentReply, ChatError> {
        self.ask_with_temperature(turns, self.config.temperature)
            .await
    }

    /// Outcome-returning variant of [`ask_with_history`](Self::ask_with_history).
    pub async fn ask_with_history_safe(&self, turns: &[Turn]) -> AskOutcome {
        self.ask_with_history(turns).await.into()
    }

    /// Multi-turn ask with a per-call sampling temperature override.
    pub async fn ask_with_temperature(
        &self,
        turns: &[Turn],
        temperature: f32,
    ) -> Result<AgentReply, ChatError> {
        if turns.is_empty() {
            return Err(ChatError::invalid_argument("history must not be empty"));
        }
        self.dispatch(DEFAULT_SYSTEM_PROMPT, turns, temperature).await
    }

    /// Run the same prompt at each spread temperature, sequentially. Each
    /// failure is isolated; remaining calls still run.
    pub async fn temperature_spread(&self, turns: &[Turn]) -> Vec<SpreadReply> {
        let mut replies = Vec::with_capacity(SPREAD_TEMPERATURES.len());
        for temperature in SPREAD_TEMPERATURES {
            let result = self.ask_with_temperature(turns, temperature).await;
            replies.push(SpreadReply {
                temperature,
                result,
            });
        }
        replies
    }

    /// Multi-turn ask with a substituted system instruction (persona replies).
    pub async fn ask_with_custom_prompt(
        &self,
        turns: &[Turn],
        prompt: &str,
    ) -> Result<AgentReply, ChatError> {
        if turns.is_empty() {
            return Err(ChatError::invalid_argument("history must not be empty"));
        }
        if prompt.trim().is_empty() {
            return Err(ChatError::invalid_argument("prompt must not be blank"));
        }
        self.dispatch(prompt, turns, self.config.temperature).await
    }

    /// Sequential persona fan-out, in the given order. A later failure never
    /// cancels earlier successes; every reply is tagged with its persona.
    pub async fn consult_multiple(
        &self,
        turns: &[Turn],
        personas: &[Persona],
    ) -> Vec<PersonaReply> {
        let mut replies = Vec::with_capacity(personas.len());
        for persona in personas {
            let result = self.ask_with_custom_prompt(turns, &persona.prompt).await;
            replies.push(PersonaReply {
                persona: persona.name.clone(),
                result,
            });
        }
        replies
    }

    /// Consolidate successful persona replies into one answer. The request
    /// carries only the latest user question plus a digest of the replies.
    pub async fn synthesize(
        &self,
        turns: &[Turn],
        persona_replies: &[PersonaReply],
    ) -> Result<AgentReply, ChatError> {
        let successes: Vec<(&str, &AgentReply)> = persona_replies
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|reply| (r.persona.as_str(), reply)))
            .collect();
        if successes.is_empty() {
            return Err(ChatError::invalid_argument(
                "no successful persona replies to synthesize",
            ));
        }

        let question = turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .ok_or_else(|| ChatError::invalid_argument("no prior user turn to synthesize for"))?;

        let mut digest = format!("Question: {}\n\nExpert answers:\n", question.content);
        for (persona, reply) in &successes {
            digest.push_str(&format!("\n### {}\n{}\n", persona, reply.text));
        }
        digest.push_str("\nProduce one consolidated answer.");

        let request_turns = [Turn::user(digest)];
        self.dispatch(SYNTHESIS_PROMPT, &request_turns, self.config.temperature)
            .await
    }

    fn build_request(&self, system_prompt: &str, turns: &[Turn], temperature: f32) -> ChatRequest {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(WireMessage {
            role: Role::System.as_str().to_string(),
            content: system_prompt.to_string(),
        });
        messages.extend(turns.iter().map(WireMessage::from));
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn dispatch(
        &self,
        system_prompt: &str,
        turns: &[Turn],
        temperature: f32,
    ) -> Result<AgentReply, ChatError> {
        let request = self.build_request(system_prompt, turns, temperature);
        let completion = self.transport.complete(request).await?;
        let reply = decode_reply(&completion.content)?;
        Ok(AgentReply {
            text: reply.agent_message,
            usage: completion.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pocketchat_api::Completion;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport stub that replays scripted results and records every
    /// request it saw.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Completion, ChatError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Completion, ChatError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn reply(text: &str) -> Result<Completion, ChatError> {
            Ok(Completion {
                content: format!(r#"{{"agentMessage": "{}"}}"#, text),
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request_at(&self, index: usize) -> ChatRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn complete(&self, request: ChatRequest) -> Result<Completion, ChatError> {
            self.requests.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Network("script exhausted".into())))
        }
    }

    fn facade_with(script: Vec<Result<Completion, ChatError>>) -> (AgentFacade, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let facade = AgentFacade::new(ChatConfig::new("test-key"), transport.clone()).unwrap();
        (facade, transport)
    }

    #[tokio::test]
    async fn test_ask_single_turn() {
        let (facade, transport) = facade_with(vec![ScriptedTransport::reply("X is ...")]);
        let outcome = facade.ask_safe("What is X?").await;
        assert!(outcome.success);
        assert_eq!(outcome.content, "X is ...");

        // System prompt prepended, question carried as the only user turn
        let request = transport.request_at(0);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "What is X?");
    }

    #[tokio::test]
    async fn test_blank_question_never_reaches_transport() {
        let (facade, transport) = facade_with(vec![]);
        let err = facade.ask("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_history_rejected() {
        let (facade, transport) = facade_with(vec![]);
        let err = facade.ask_with_history(&[]).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_distinct_error() {
        let (facade, _) = facade_with(vec![Ok(Completion {
            content: "not json".to_string(),
            usage: None,
        })]);
        let err = facade.ask("What is X?").await.unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_temperature_spread_requests_all_temperatures() {
        let (facade, transport) = facade_with(vec![
            ScriptedTransport::reply("cold"),
            ScriptedTransport::reply("warm"),
            ScriptedTransport::reply("hot"),
        ]);
        let turns = [Turn::user("Q")];
        let replies = facade.temperature_spread(&turns).await;

        assert_eq!(replies.len(), 3);
        let temps: Vec<f32> = (0..3).map(|i| transport.request_at(i).temperature).collect();
        assert_eq!(temps, vec![0.0, 0.7, 1.0]);
        assert!(replies[1].is_canonical());
        assert_eq!(replies[1].result.as_ref().unwrap().text, "warm");
    }

    #[tokio::test]
    async fn test_spread_failure_does_not_abort_remaining_calls() {
        let (facade, transport) = facade_with(vec![
            Err(ChatError::Timeout),
            ScriptedTransport::reply("warm"),
            ScriptedTransport::reply("hot"),
        ]);
        let turns = [Turn::user("Q")];
        let replies = facade.temperature_spread(&turns).await;

        assert_eq!(transport.request_count(), 3);
        assert!(replies[0].result.is_err());
        assert!(replies[1].result.is_ok());
        assert!(replies[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_custom_prompt_substitutes_system_instruction() {
        let (facade, transport) = facade_with(vec![ScriptedTransport::reply("as a lawyer...")]);
        let turns = [Turn::user("Q")];
        facade
            .ask_with_custom_prompt(&turns, "You are a contract lawyer.")
            .await
            .unwrap();
        assert_eq!(
            transport.request_at(0).messages[0].content,
            "You are a contract lawyer."
        );
    }

    #[tokio::test]
    async fn test_persona_fanout_isolates_failures_and_synthesizes() {
        // Persona #2 fails; the other two succeed, then synthesis runs.
        let (facade, transport) = facade_with(vec![
            ScriptedTransport::reply("optimist view"),
            Err(ChatError::Api {
                status: 500,
                message: "boom".into(),
            }),
            ScriptedTransport::reply("skeptic view"),
            ScriptedTransport::reply("consolidated"),
        ]);
        let personas = vec![
            Persona::new("optimist", "You are an optimist."),
            Persona::new("pessimist", "You are a pessimist."),
            Persona::new("skeptic", "You are a skeptic."),
        ];
        let turns = [Turn::user("Should we ship?")];

        let replies = facade.consult_multiple(&turns, &personas).await;
        assert_eq!(replies.len(), 3);
        assert!(replies[0].is_success());
        assert!(!replies[1].is_success());
        assert_eq!(replies[1].persona, "pessimist");
        assert!(replies[2].is_success());

        let synthesis = facade.synthesize(&turns, &replies).await.unwrap();
        assert_eq!(synthesis.text, "consolidated");

        // The synthesis request digests only the two successes
        let request = transport.request_at(3);
        assert_eq!(request.messages[0].content, SYNTHESIS_PROMPT);
        let digest = &request.messages[1].content;
        assert!(digest.contains("optimist view"));
        assert!(digest.contains("skeptic view"));
        assert!(!digest.contains("boom"));
    }

    #[tokio::test]
    async fn test_synthesize_requires_successes_and_user_turn() {
        let (facade, _) = facade_with(vec![]);
        let all_failed = vec![PersonaReply {
            persona: "optimist".to_string(),
            result: Err(ChatError::Timeout),
        }];
        let turns = [Turn::user("Q")];
        let err = facade.synthesize(&turns, &all_failed).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));

        let ok_reply = vec![PersonaReply {
            persona: "optimist".to_string(),
            result: Ok(AgentReply {
                text: "view".to_string(),
                usage: None,
            }),
        }];
        let no_user = [Turn::system("just a prompt")];
        let err = facade.synthesize(&no_user, &ok_reply).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }
}
