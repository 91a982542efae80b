//! Provider response normalization
//!
//! Collapses the heterogeneous provider response shapes into one canonical
//! result. This module never panics and never returns `Err`: every
//! extraction failure is converted into the error variant of [`AiResponse`]
//! so the orchestrator decides uniformly whether it becomes a call failure.

use serde_json::Value;

use crate::providers::ProviderKind;

/// Canonical normalizer output
///
/// Exactly one of `content` or `error` is meaningful; `content` is the
/// empty string whenever `error` is present. Extracted text is trimmed of
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiResponse {
    pub content: String,
    pub error: Option<String>,
}

impl AiResponse {
    fn text(content: &str) -> Self {
        Self {
            content: content.trim().to_string(),
            error: None,
        }
    }

    fn failure(detail: &str) -> Self {
        Self {
            content: String::new(),
            error: Some(format!("Failed to parse response: {detail}")),
        }
    }
}

fn openai_content(body: &Value) -> Option<&str> {
    body.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|t| t.as_str())
}

fn anthropic_content(body: &Value) -> Option<&str> {
    body.get("content")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|block| block.get("text"))
        .and_then(|t| t.as_str())
}

fn google_content(body: &Value) -> Option<&str> {
    body.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|arr| arr.first())
        .and_then(|part| part.get("text"))
        .and_then(|t| t.as_str())
}

fn cohere_content(body: &Value) -> Option<&str> {
    body.get("generations")
        .and_then(|g| g.as_array())
        .and_then(|arr| arr.first())
        .and_then(|gen| gen.get("text"))
        .and_then(|t| t.as_str())
}

fn qwen_content(body: &Value) -> Option<&str> {
    body.get("output")
        .and_then(|o| o.get("text"))
        .and_then(|t| t.as_str())
}

fn ollama_message_content(body: &Value) -> Option<&str> {
    body.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
}

fn koboldai_content(body: &Value) -> Option<&str> {
    body.get("results")
        .and_then(|r| r.as_array())
        .and_then(|arr| arr.first())
        .and_then(|result| result.get("text"))
        .and_then(|t| t.as_str())
}

fn top_level_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(|t| t.as_str())
}

fn first_choice_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get(key))
        .and_then(|t| t.as_str())
}

/// Best-effort probe for custom and unmatched providers
///
/// An ordered list of candidate shapes, first present wins. Kept as a flat
/// sequence deliberately: real custom endpoints vary, so this must not be
/// collapsed into a single schema.
fn probe_content(body: &Value) -> Option<&str> {
    openai_content(body)
        .or_else(|| qwen_content(body))
        .or_else(|| top_level_str(body, "response"))
        .or_else(|| ollama_message_content(body))
        .or_else(|| top_level_str(body, "text"))
        .or_else(|| top_level_str(body, "content"))
        .or_else(|| first_choice_str(body, "content"))
        .or_else(|| first_choice_str(body, "text"))
}

/// Normalize a decoded provider response into a canonical result
pub fn parse_response(provider: ProviderKind, body: &Value) -> AiResponse {
    match provider {
        // OpenAI response shape is shared well beyond OpenAI itself
        ProviderKind::OpenAi
        | ProviderKind::Meta
        | ProviderKind::Mistral
        | ProviderKind::DeepSeek
        | ProviderKind::Perplexity
        | ProviderKind::LmStudio
        | ProviderKind::LocalAi => match openai_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `choices[0].message.content`"),
        },
        ProviderKind::Anthropic => match anthropic_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `content[0].text`"),
        },
        ProviderKind::Google => match google_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `candidates[0].content.parts[0].text`"),
        },
        ProviderKind::Cohere => match cohere_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `generations[0].text`"),
        },
        ProviderKind::Qwen => match qwen_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `output.text`"),
        },
        // Ollama alone tolerates a missing field rather than erroring
        ProviderKind::Ollama => {
            let text = ollama_message_content(body)
                .or_else(|| top_level_str(body, "response"))
                .unwrap_or("");
            AiResponse::text(text)
        }
        ProviderKind::KoboldAi => match koboldai_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("missing field `results[0].text`"),
        },
        // Custom and azure (no dedicated arm) get the multi-shape probe
        ProviderKind::Azure | ProviderKind::Custom => match probe_content(body) {
            Some(text) => AiResponse::text(text),
            None => AiResponse::failure("Unable to parse response format"),
        },
    }
}
