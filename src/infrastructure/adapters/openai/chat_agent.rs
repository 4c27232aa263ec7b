//! Chat Completion Agent - `/chat/completions` 客户端
//!
//! 每次交换构造一个新代理：系统提示词 + 历史记忆 + 本轮输入，
//! 成功回复后把这一轮追加到记忆

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::client::OpenAiClientConfig;
use crate::application::ports::{AgentConfig, AgentError, AgentFactoryPort, AgentPort};
use crate::domain::conversation::{ConversationMemory, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 代理工厂，持有共享的 HTTP 客户端
pub struct ChatCompletionAgentFactory {
    client: Client,
    config: OpenAiClientConfig,
}

impl ChatCompletionAgentFactory {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, AgentError> {
        let client = config
            .build_client()
            .map_err(|e| AgentError::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }
}

impl AgentFactoryPort for ChatCompletionAgentFactory {
    fn create(&self, config: AgentConfig, memory: ConversationMemory) -> Box<dyn AgentPort> {
        Box::new(ChatCompletionAgent {
            client: self.client.clone(),
            endpoint: self.config.endpoint("chat/completions"),
            api_key: self.config.api_key.clone(),
            agent: config,
            memory,
        })
    }
}

/// 单次交换的对话代理
pub struct ChatCompletionAgent {
    client: Client,
    endpoint: String,
    api_key: String,
    agent: AgentConfig,
    memory: ConversationMemory,
}

impl ChatCompletionAgent {
    fn build_messages(&self, input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.memory.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: self.agent.system_prompt.clone(),
        });
        for turn in self.memory.turns() {
            let role = match turn.role {
                Role::Human => "user",
                Role::Ai => "assistant",
            };
            messages.push(ChatMessage {
                role,
                content: turn.text.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: input.to_string(),
        });
        messages
    }
}

fn extract_reply(response: ChatCompletionResponse) -> Result<String, AgentError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AgentError::InvalidResponse("No choices in response".to_string()))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl AgentPort for ChatCompletionAgent {
    async fn respond(&mut self, input: &str) -> Result<String, AgentError> {
        let request = ChatCompletionRequest {
            model: &self.agent.model,
            messages: self.build_messages(input),
            max_tokens: self.agent.max_tokens,
        };

        tracing::debug!(
            model = %self.agent.model,
            history_turns = self.memory.len(),
            input_len = input.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout
                } else {
                    AgentError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ServiceError(format!("HTTP {}: {}", status, body)));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        let reply = extract_reply(body)?;

        self.memory.push_human(input);
        self.memory.push_ai(reply.clone());

        tracing::info!(reply_len = reply.len(), "Agent responded");
        Ok(reply)
    }

    fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}
