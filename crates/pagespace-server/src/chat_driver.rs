//! HTTP-speaking [`ChatDriver`] (C4/C11), dispatching on
//! [`Provider`] to one of three wire families: OpenAI-compatible chat
//! completions, Anthropic messages, and Google generateContent. Every
//! provider in the fixed enumeration fits one of the three.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use pagespace_ai::driver::{ChatDriver, DriverChunk, DriverRequest};
use pagespace_ai::provider_factory::{Provider, ProviderCredential};
use pagespace_catalog::{ParamSchema, Property, ToolDef};
use secrecy::ExposeSecret;
use serde_json::{json, Value};

/// Drives every provider in the fixed enumeration over `reqwest`.
pub struct HttpChatDriver {
    client: reqwest::Client,
    local_base_urls: LocalBaseUrls,
}

/// Base URLs for the two self-hosted providers, which have no fixed
/// public endpoint.
#[derive(Debug, Clone)]
pub struct LocalBaseUrls {
    /// Override for `Provider::Pagespace`'s upstream (GLM/Google-backed).
    pub pagespace_api_base: String,
    /// OpenRouter's fixed endpoint.
    pub openrouter_base: String,
    /// OpenAI's fixed endpoint.
    pub openai_base: String,
    /// xAI's fixed endpoint.
    pub xai_base: String,
    /// Zhipu GLM's fixed endpoint.
    pub glm_base: String,
    /// MiniMax's Anthropic-compatible endpoint.
    pub minimax_base: String,
    /// Anthropic's fixed endpoint.
    pub anthropic_base: String,
    /// Google's fixed endpoint.
    pub google_base: String,
}

impl LocalBaseUrls {
    /// The well-known public endpoints for every non-local-server
    /// provider in the fixed enumeration. `pagespace_api_base` defaults to
    /// the GLM endpoint, matching `Provider::Pagespace`'s GLM-backed
    /// default credential.
    #[must_use]
    pub fn well_known() -> Self {
        Self {
            pagespace_api_base: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            openrouter_base: "https://openrouter.ai/api/v1".to_string(),
            openai_base: "https://api.openai.com/v1".to_string(),
            xai_base: "https://api.x.ai/v1".to_string(),
            glm_base: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            minimax_base: "https://api.minimax.chat/v1".to_string(),
            anthropic_base: "https://api.anthropic.com/v1".to_string(),
            google_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl HttpChatDriver {
    /// Construct a driver over `client`, using `local_base_urls` for
    /// providers with a fixed endpoint and the caller-resolved base URL
    /// (carried in [`ProviderCredential::BaseUrl`]) for local-server ones.
    #[must_use]
    pub fn new(client: reqwest::Client, local_base_urls: LocalBaseUrls) -> Self {
        Self { client, local_base_urls }
    }

    fn endpoint(&self, provider: Provider, credential: &ProviderCredential) -> String {
        if provider.is_local_server() {
            let base = match credential {
                ProviderCredential::BaseUrl(url) => url.as_str(),
                ProviderCredential::ApiKey(_) => "http://localhost:11434",
            };
            return match provider {
                Provider::LmStudio => format!("{base}/v1/chat/completions"),
                _ => format!("{base}/api/chat"),
            };
        }
        match provider {
            Provider::Pagespace => format!("{}/v1/chat/completions", self.local_base_urls.pagespace_api_base),
            Provider::OpenRouter | Provider::OpenRouterFree => {
                format!("{}/chat/completions", self.local_base_urls.openrouter_base)
            }
            Provider::OpenAi => format!("{}/chat/completions", self.local_base_urls.openai_base),
            Provider::Xai => format!("{}/chat/completions", self.local_base_urls.xai_base),
            Provider::Glm => format!("{}/chat/completions", self.local_base_urls.glm_base),
            Provider::MiniMax => format!("{}/messages", self.local_base_urls.minimax_base),
            Provider::Anthropic => format!("{}/messages", self.local_base_urls.anthropic_base),
            Provider::Google => {
                format!("{}/models/{}:streamGenerateContent?alt=sse", self.local_base_urls.google_base, "PLACEHOLDER")
            }
            Provider::Ollama | Provider::LmStudio => unreachable!("handled by is_local_server above"),
        }
    }
}

#[async_trait]
impl ChatDriver for HttpChatDriver {
    async fn stream(&self, request: DriverRequest) -> BoxStream<'static, DriverChunk> {
        let provider = request.provider.provider;
        let is_anthropic_family = matches!(provider, Provider::Anthropic | Provider::MiniMax);
        let is_google = matches!(provider, Provider::Google);

        let mut url = self.endpoint(provider, &request.provider.credential);
        if is_google {
            url = url.replace("PLACEHOLDER", &request.provider.model);
        }

        let body = if is_anthropic_family {
            anthropic_request_body(&request)
        } else if is_google {
            google_request_body(&request)
        } else {
            openai_request_body(&request)
        };

        let mut builder = self.client.post(&url).json(&body);
        builder = match &request.provider.credential {
            ProviderCredential::ApiKey(key) if is_anthropic_family => {
                builder.header("x-api-key", key.expose_secret()).header("anthropic-version", "2023-06-01")
            }
            ProviderCredential::ApiKey(key) if is_google => builder.header("x-goog-api-key", key.expose_secret()),
            ProviderCredential::ApiKey(key) => builder.bearer_auth(key.expose_secret()),
            ProviderCredential::BaseUrl(_) => builder,
        };

        let response = match builder.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let status = r.status();
                let text = r.text().await.unwrap_or_default();
                return stream::iter(vec![
                    DriverChunk::Error(format!("provider responded with {status}: {text}")),
                    DriverChunk::Finished,
                ])
                .boxed();
            }
            Err(e) => {
                return stream::iter(vec![DriverChunk::Error(e.to_string()), DriverChunk::Finished]).boxed();
            }
        };

        sse_chunks(response, if is_anthropic_family { parse_anthropic_event } else if is_google { parse_google_event } else { parse_openai_event })
    }
}

fn openai_request_body(request: &DriverRequest) -> Value {
    json!({
        "model": request.provider.model,
        "stream": true,
        "messages": request.messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
        "tools": request.tools.iter().map(tool_def_to_openai).collect::<Vec<_>>(),
    })
}

fn anthropic_request_body(request: &DriverRequest) -> Value {
    let system = request.messages.iter().find(|m| m.role == "system").map(|m| m.content.clone()).unwrap_or_default();
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    json!({
        "model": request.provider.model,
        "stream": true,
        "max_tokens": 8192,
        "system": system,
        "messages": messages,
        "tools": request.tools.iter().map(tool_def_to_anthropic).collect::<Vec<_>>(),
    })
}

fn google_request_body(request: &DriverRequest) -> Value {
    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": if m.role == "assistant" { "model" } else { "user" }, "parts": [{"text": m.content}]}))
        .collect();
    let system = request.messages.iter().find(|m| m.role == "system").map(|m| m.content.clone());
    json!({
        "contents": contents,
        "systemInstruction": system.map(|s| json!({"parts": [{"text": s}]})),
        "tools": [{"functionDeclarations": request.tools.iter().map(tool_def_to_google).collect::<Vec<_>>()}],
    })
}

fn tool_def_to_openai(tool: &ToolDef) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": param_schema_to_json(&tool.parameters),
        },
    })
}

fn tool_def_to_anthropic(tool: &ToolDef) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": param_schema_to_json(&tool.parameters),
    })
}

fn tool_def_to_google(tool: &ToolDef) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": param_schema_to_json(&tool.parameters),
    })
}

/// Renders the internal parameter AST as standard JSON Schema, the
/// inverse direction of the MCP converter's JSON-Schema-to-AST pass.
fn param_schema_to_json(schema: &ParamSchema) -> Value {
    match schema {
        ParamSchema::String => json!({"type": "string"}),
        ParamSchema::Number => json!({"type": "number"}),
        ParamSchema::Boolean => json!({"type": "boolean"}),
        ParamSchema::Object { properties } => {
            let mut props = serde_json::Map::new();
            let mut required = Vec::new();
            for (name, prop) in properties {
                props.insert(name.clone(), property_to_json(prop));
                if prop.required {
                    required.push(Value::String(name.clone()));
                }
            }
            json!({"type": "object", "properties": Value::Object(props), "required": required})
        }
        ParamSchema::Array { items } => json!({"type": "array", "items": param_schema_to_json(items)}),
        ParamSchema::Enum { values } => json!({"enum": values}),
        ParamSchema::Union { arms } => json!({"anyOf": arms.iter().map(param_schema_to_json).collect::<Vec<_>>()}),
        ParamSchema::Unknown { declared_type } => match declared_type {
            Some(t) => json!({"type": t}),
            None => json!({}),
        },
    }
}

fn property_to_json(prop: &Property) -> Value {
    let mut object = param_schema_to_json(&prop.schema);
    if let (Some(description), Value::Object(map)) = (&prop.description, &mut object) {
        map.insert("description".to_string(), Value::String(description.clone()));
    }
    object
}

/// Turns a streaming HTTP response's SSE body into a [`DriverChunk`]
/// stream, dispatching each parsed `data:` payload to `parse_event`.
fn sse_chunks(
    response: reqwest::Response,
    parse_event: fn(&Value) -> Option<DriverChunk>,
) -> BoxStream<'static, DriverChunk> {
    let byte_stream = response.bytes_stream();
    let state = (byte_stream, Vec::<u8>::new(), false);

    stream::unfold(state, move |(mut bytes, mut buffer, done)| async move {
        if done {
            return None;
        }
        loop {
            if let Some(pos) = find_line_end(&buffer) {
                let line = buffer.drain(..=pos).collect::<Vec<u8>>();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim_end();
                let Some(payload) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                    continue;
                };
                let payload = payload.trim();
                if payload == "[DONE]" {
                    return Some((DriverChunk::Finished, (bytes, buffer, true)));
                }
                if payload.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(payload) {
                    Ok(value) => match parse_event(&value) {
                        Some(chunk) => return Some((chunk, (bytes, buffer, false))),
                        None => continue,
                    },
                    Err(e) => return Some((DriverChunk::Error(format!("malformed event: {e}")), (bytes, buffer, false))),
                }
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Some((DriverChunk::Error(e.to_string()), (bytes, buffer, true))),
                None => return Some((DriverChunk::Finished, (bytes, buffer, true))),
            }
        }
    })
    .boxed()
}

fn find_line_end(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == b'\n')
}

fn parse_openai_event(value: &Value) -> Option<DriverChunk> {
    let delta = value.get("choices")?.get(0)?.get("delta")?;
    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            return Some(DriverChunk::Text(text.to_string()));
        }
    }
    if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
        if let Some(call) = calls.first() {
            let tool_call_id = call.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            let tool_name = call.get("function")?.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let raw_args = call.get("function")?.get("arguments").and_then(Value::as_str).unwrap_or("{}");
            let arguments = serde_json::from_str(raw_args).unwrap_or(Value::Null);
            return Some(DriverChunk::ToolCall { tool_call_id, tool_name, arguments });
        }
    }
    None
}

fn parse_anthropic_event(value: &Value) -> Option<DriverChunk> {
    match value.get("type").and_then(Value::as_str)? {
        "content_block_delta" => {
            let text = value.get("delta")?.get("text").and_then(Value::as_str)?;
            Some(DriverChunk::Text(text.to_string()))
        }
        "content_block_start" => {
            let block = value.get("content_block")?;
            if block.get("type").and_then(Value::as_str)? != "tool_use" {
                return None;
            }
            Some(DriverChunk::ToolCall {
                tool_call_id: block.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                tool_name: block.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                arguments: block.get("input").cloned().unwrap_or(Value::Null),
            })
        }
        "message_stop" => Some(DriverChunk::Finished),
        _ => None,
    }
}

fn parse_google_event(value: &Value) -> Option<DriverChunk> {
    let part = value.get("candidates")?.get(0)?.get("content")?.get("parts")?.get(0)?;
    if let Some(text) = part.get("text").and_then(Value::as_str) {
        return Some(DriverChunk::Text(text.to_string()));
    }
    if let Some(call) = part.get("functionCall") {
        return Some(DriverChunk::ToolCall {
            tool_call_id: call.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            tool_name: call.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            arguments: call.get("args").cloned().unwrap_or(Value::Null),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_schema_roundtrips_object_shape() {
        let mut properties = std::collections::BTreeMap::new();
        properties.insert(
            "name".to_string(),
            Property { schema: ParamSchema::String, required: true, description: Some("the name".to_string()) },
        );
        let schema = ParamSchema::Object { properties };
        let json = param_schema_to_json(&schema);
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"][0], "name");
        assert_eq!(json["properties"]["name"]["type"], "string");
        assert_eq!(json["properties"]["name"]["description"], "the name");
    }

    #[test]
    fn parse_openai_event_extracts_text_delta() {
        let value = json!({"choices": [{"delta": {"content": "hello"}}]});
        assert!(matches!(parse_openai_event(&value), Some(DriverChunk::Text(t)) if t == "hello"));
    }

    #[test]
    fn parse_anthropic_event_extracts_tool_use_start() {
        let value = json!({
            "type": "content_block_start",
            "content_block": {"type": "tool_use", "id": "call_1", "name": "search", "input": {"q": "x"}},
        });
        assert!(matches!(parse_anthropic_event(&value), Some(DriverChunk::ToolCall { tool_call_id, .. }) if tool_call_id == "call_1"));
    }

    #[test]
    fn parse_google_event_extracts_function_call() {
        let value = json!({"candidates": [{"content": {"parts": [{"functionCall": {"name": "search", "args": {}}}]}}]});
        assert!(matches!(parse_google_event(&value), Some(DriverChunk::ToolCall { tool_name, .. }) if tool_name == "search"));
    }
}
