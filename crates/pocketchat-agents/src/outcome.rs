use serde::{Deserialize, Serialize};

use pocketchat_types::ChatError;

use crate::facade::AgentReply;

/// Result shape consumed by view layers: either the reply text or an error
/// description, never a propagated error. The `*_safe` facade variants
/// return this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskOutcome {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

impl AskOutcome {
    pub fn success(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
        }
    }
}

impl From<Result<AgentReply, ChatError>> for AskOutcome {
    fn from(result: Result<AgentReply, ChatError>) -> Self {
        match result {
            Ok(reply) => AskOutcome::success(reply.text),
            Err(e) => AskOutcome::error(e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: AskOutcome = Ok(AgentReply {
            text: "hi".to_string(),
            usage: None,
        })
        .into();
        assert!(ok.success);
        assert_eq!(ok.content, "hi");
        assert!(ok.error.is_none());

        let err: AskOutcome = Err(ChatError::Timeout).into();
        assert!(!err.success);
        assert!(err.error.is_some());
    }
}
