use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};

use counsel_types::{ClientError, Outcome, Result};

use crate::http::ApiClient;
use crate::stream::ReplyStream;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub conversation_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_state: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Payload as the service returned it
    pub raw: Value,
}

impl AiReply {
    /// Reply text is found under `reply`, `message` or `content`, in that order.
    pub fn from_payload(raw: Value) -> Result<Self> {
        let reply = ["reply", "message", "content"]
            .iter()
            .find_map(|field| raw.get(*field).and_then(Value::as_str))
            .or_else(|| raw.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Serialization {
                message: "AI response has no reply text".to_string(),
            })?;
        let conversation_id = match raw.get("conversationId") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        Ok(Self {
            reply,
            conversation_id,
            raw,
        })
    }
}

/// Direct calls to the AI service under the AI prefix. Nothing here is
/// persisted server-side; use [`MessageApi::ai_reply`](super::MessageApi::ai_reply)
/// for replies that belong to a conversation.
pub struct AiApi {
    client: Rc<ApiClient>,
}

impl AiApi {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn chat(&self, req: &ChatRequest) -> Outcome<AiReply> {
        Outcome::from_result(self.try_chat(req).await, "", "AI对话失败")
    }

    /// Fetch the reply, then hand it back as a cancellable typed-out stream.
    pub async fn chat_stream(&self, req: &ChatRequest) -> Outcome<ReplyStream> {
        let result = self.try_chat(req).await.map(|reply| {
            ReplyStream::new(
                &reply.reply,
                self.client.timer().clone(),
                self.client.config().mock.typing_delay_ms,
            )
        });
        Outcome::from_result(result, "", "流式AI对话失败")
    }

    pub async fn health(&self) -> Outcome<Value> {
        Outcome::from_result(self.client.ai_get("health").await, "", "获取AI服务状态失败")
    }

    pub async fn stats(&self) -> Outcome<Value> {
        Outcome::from_result(self.client.ai_get("stats").await, "", "获取AI统计信息失败")
    }

    pub async fn config(&self) -> Outcome<Value> {
        Outcome::from_result(self.client.ai_get("config").await, "", "获取AI配置失败")
    }

    async fn try_chat(&self, req: &ChatRequest) -> Result<AiReply> {
        let payload = self
            .client
            .ai_post("chat", serde_json::to_value(req)?)
            .await?;
        AiReply::from_payload(payload)
    }
}
