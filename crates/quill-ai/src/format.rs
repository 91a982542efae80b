//! Provider request formatting
//!
//! Builds the provider-specific request body for a call. Pure and total:
//! every provider tag, including unmatched/custom ones, produces a
//! well-formed body. Field names and nesting are part of each provider's
//! wire contract and must track upstream API revisions.

use serde_json::{json, Value};

use crate::providers::ProviderKind;

/// System + user chat turns, shared by every chat-shaped dialect
fn chat_messages(system_prompt: &str, prompt: &str) -> Value {
    json!([
        { "role": "system", "content": system_prompt },
        { "role": "user", "content": prompt }
    ])
}

/// Build the request body for a provider
///
/// Providers diverge on message framing (chat-turn arrays vs. flat prompt
/// strings), parameter naming (`max_tokens` / `maxOutputTokens` /
/// `num_predict` / `max_length`), and nesting depth. Anything without a
/// dedicated arm, `azure` included, gets the OpenAI chat shape.
pub fn build_request_body(
    provider: ProviderKind,
    model: &str,
    prompt: &str,
    system_prompt: &str,
    temperature: f64,
    max_tokens: u32,
) -> Value {
    match provider {
        ProviderKind::Anthropic => json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "system": system_prompt,
            "max_tokens": max_tokens,
            "temperature": temperature
        }),
        ProviderKind::Google => json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens
            },
            "safetySettings": []
        }),
        ProviderKind::Cohere => json!({
            "model": model,
            "prompt": prompt,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "return_likelihoods": "NONE"
        }),
        ProviderKind::Qwen => json!({
            "model": model,
            "input": { "messages": chat_messages(system_prompt, prompt) },
            "parameters": {
                "temperature": temperature,
                "max_tokens": max_tokens
            }
        }),
        ProviderKind::Ollama => json!({
            "model": model,
            "messages": chat_messages(system_prompt, prompt),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens
            }
        }),
        ProviderKind::KoboldAi => json!({
            "prompt": format!("{system_prompt}\n\nUser: {prompt}\nAssistant:"),
            "max_length": max_tokens,
            "temperature": temperature,
            "stop_sequence": ["\nUser:", "\nHuman:"],
            "max_context_length": 4096
        }),
        // OpenAI chat shape: openai, meta, mistral, deepseek, perplexity,
        // lmstudio, localai, azure (OpenAI-compatible), custom
        _ => json!({
            "model": model,
            "messages": chat_messages(system_prompt, prompt),
            "temperature": temperature,
            "max_tokens": max_tokens
        }),
    }
}
