use pocketchat_types::{ChatError, StructuredReply};

/// Decode the assistant's raw completion text as the fixed single-field
/// JSON schema. Decode failure is `MalformedResponse`, which callers must
/// report separately from transport errors.
pub fn decode_reply(content: &str) -> Result<StructuredReply, ChatError> {
    serde_json::from_str::<StructuredReply>(content).map_err(|e| {
        let preview: String = content.chars().take(120).collect();
        ChatError::MalformedResponse(format!("expected {{\"agentMessage\": ...}}, got '{preview}': {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_reply() {
        let reply = decode_reply(r#"{"agentMessage": "X is a thing."}"#).unwrap();
        assert_eq!(reply.agent_message, "X is a thing.");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_reply("not json").unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let err = decode_reply(r#"{"message": "wrong shape"}"#).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let reply =
            decode_reply(r#"{"agentMessage": "ok", "confidence": 0.9}"#).unwrap();
        assert_eq!(reply.agent_message, "ok");
    }
}
