use math_assistant_model::{ModelMessage, ModelRequest};
use serde::{Deserialize, Serialize};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extracts the human-readable message from an error payload, either a
/// non-2xx response body or an error event in the middle of a stream.
pub fn error_message(payload: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(payload)
        .ok()
        .map(|e| e.error.message)
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        stop: req.stop.clone(),
        temperature: config.temperature,
        stream: true,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(content) => Message::Assistant {
            content: content.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are a math tutor.".to_owned()),
                ModelMessage::User("What is 2 + 2?".to_owned()),
            ],
            stop: vec!["\nObservation:".to_owned()],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .with_temperature(0.0)
            .build();
        let value =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "custom",
                "messages": [
                    { "role": "system", "content": "You are a math tutor." },
                    { "role": "user", "content": "What is 2 + 2?" }
                ],
                "stop": ["\nObservation:"],
                "temperature": 0.0,
                "stream": true
            })
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let request = ModelRequest::from_prompt("hi");
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let value =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert!(value.get("stop").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("Invalid API Key"));
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }
}
