//! OpenAI-compatible client implementation using the async-openai library.
//!
//! Works against api.openai.com and any proxy or local server speaking the
//! same chat-completions protocol; the base URL comes from configuration.

use crate::config::LlmSettings;
use crate::error::{LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageContent,
    MessageRole, ToolDefinition, Usage,
};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{timeout, Duration};

/// OpenAI-compatible chat client
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    /// Create a new client from resolved LLM settings
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(crate::error::Error::Llm(LlmError::Authentication {
                message: "No API key configured".to_string(),
            }));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model: settings.model.clone(),
        })
    }

    /// Convert our internal message format to async-openai format
    fn convert_messages(
        &self,
        messages: Vec<LlmMessage>,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut converted = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => {
                    let content = extract_text(&message.content);
                    converted.push(ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessage {
                            content: content.into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::User => {
                    let content = extract_text(&message.content);
                    converted.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage {
                            content: content.into(),
                            name: None,
                        },
                    ));
                }
                MessageRole::Assistant => {
                    let (content, tool_calls) = match &message.content {
                        MessageContent::Text(text) => (text.clone(), Vec::new()),
                        MessageContent::Blocks(blocks) => {
                            let mut text = String::new();
                            let mut calls = Vec::new();
                            for block in blocks {
                                match block {
                                    ContentBlock::Text { text: t } => {
                                        if !text.is_empty() {
                                            text.push('\n');
                                        }
                                        text.push_str(t);
                                    }
                                    ContentBlock::ToolUse { id, name, input } => {
                                        calls.push(ChatCompletionMessageToolCall {
                                            id: id.clone(),
                                            r#type: ChatCompletionToolType::Function,
                                            function: async_openai::types::FunctionCall {
                                                name: name.clone(),
                                                arguments: input.to_string(),
                                            },
                                        });
                                    }
                                    ContentBlock::ToolResult { .. } => {}
                                }
                            }
                            (text, calls)
                        }
                    };

                    converted.push(ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: if content.is_empty() {
                                None
                            } else {
                                Some(ChatCompletionRequestAssistantMessageContent::Text(content))
                            },
                            name: None,
                            tool_calls: if tool_calls.is_empty() {
                                None
                            } else {
                                Some(tool_calls)
                            },
                            audio: None,
                            refusal: None,
                            ..Default::default()
                        },
                    ));
                }
                MessageRole::Tool => {
                    // Push tool result message(s) without dropping other context
                    let mut pushed_any = false;
                    if let MessageContent::Blocks(blocks) = &message.content {
                        for block in blocks {
                            if let ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                                ..
                            } = block
                            {
                                converted.push(ChatCompletionRequestMessage::Tool(
                                    ChatCompletionRequestToolMessage {
                                        content: ChatCompletionRequestToolMessageContent::Text(
                                            content.clone(),
                                        ),
                                        tool_call_id: tool_use_id.clone(),
                                    },
                                ));
                                pushed_any = true;
                            }
                        }
                    }
                    if !pushed_any {
                        return Err((LlmError::InvalidRequest {
                            message: "Tool message must contain a ToolResult block".to_string(),
                        })
                        .into());
                    }
                }
            }
        }

        Ok(converted)
    }

    /// Convert our tool definitions to async-openai format
    fn convert_tools(&self, tools: Vec<ToolDefinition>) -> Vec<ChatCompletionTool> {
        tools
            .into_iter()
            .map(|tool| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: tool.function.name,
                    description: Some(tool.function.description),
                    parameters: Some(tool.function.parameters),
                    strict: None,
                },
            })
            .collect()
    }

    /// Convert async-openai response to our internal format
    fn convert_response(
        &self,
        response: async_openai::types::CreateChatCompletionResponse,
    ) -> Result<LlmResponse> {
        let choice =
            response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::InvalidRequest {
                    message: "No choices in response".to_string(),
                })?;

        let mut blocks = Vec::new();
        if let Some(content) = choice.message.content {
            if !content.is_empty() {
                blocks.push(ContentBlock::Text { text: content });
            }
        }
        if let Some(tool_calls) = choice.message.tool_calls {
            for tool_call in tool_calls {
                let function = &tool_call.function;
                let args: Value = serde_json::from_str(&function.arguments)
                    .unwrap_or_else(|_| Value::String(function.arguments.clone()));

                blocks.push(ContentBlock::ToolUse {
                    id: tool_call.id,
                    name: function.name.clone(),
                    input: args,
                });
            }
        }

        let message_content = if blocks.len() == 1 {
            match blocks.pop() {
                Some(ContentBlock::Text { text }) => MessageContent::Text(text),
                Some(other) => MessageContent::Blocks(vec![other]),
                None => MessageContent::Text(String::new()),
            }
        } else if blocks.is_empty() {
            MessageContent::Text(String::new())
        } else {
            MessageContent::Blocks(blocks)
        };

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let finish_reason = choice.finish_reason.map(|reason| match reason {
            async_openai::types::FinishReason::Stop => FinishReason::Stop,
            async_openai::types::FinishReason::Length => FinishReason::Length,
            async_openai::types::FinishReason::ToolCalls => FinishReason::ToolCalls,
            async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
            async_openai::types::FinishReason::FunctionCall => FinishReason::ToolCalls,
        });

        Ok(LlmResponse {
            message: LlmMessage {
                role: MessageRole::Assistant,
                content: message_content,
            },
            usage,
            model: response.model,
            finish_reason,
        })
    }
}

fn extract_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let options = options.unwrap_or_default();
        let converted_messages = self.convert_messages(messages)?;
        let converted_tools = tools.map(|t| self.convert_tools(t));

        if let Some(ref tools) = converted_tools {
            tracing::debug!("chat request with {} tools enabled", tools.len());
        }

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model);
        request_builder.messages(converted_messages);

        if let Some(tools) = converted_tools {
            request_builder.tools(tools);
        }
        if let Some(max_tokens) = options.max_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            request_builder.top_p(top_p);
        }

        let request = request_builder
            .build()
            .map_err(|e| LlmError::InvalidRequest {
                message: format!("Failed to build request: {}", e),
            })?;

        let timeout_secs = options.timeout_secs.unwrap_or(120);
        let response = timeout(
            Duration::from_secs(timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            seconds: timeout_secs,
        })?
        .map_err(|e| {
            tracing::error!("chat completion failed: {}", e);
            LlmError::ApiError {
                status: 500,
                message: e.to_string(),
            }
        })?;

        self.convert_response(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai_compat"
    }
}
