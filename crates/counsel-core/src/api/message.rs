use std::rc::Rc;

use serde_json::json;

use counsel_types::{
    Outcome, Result,
    conversation::MessageRecord,
};

use crate::http::{decode, ApiClient};
use crate::listing::{decode_list, Page};

#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    pub page: u32,
    pub size: u32,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

/// Messages inside a server-side conversation.
pub struct MessageApi {
    client: Rc<ApiClient>,
}

impl MessageApi {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    /// The returned page reports which wrapper the items arrived in.
    pub async fn list(&self, conversation_id: i64, query: &MessageQuery) -> Outcome<Page<MessageRecord>> {
        let path = messages_path(conversation_id);
        let params = [
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
        ];
        let result: Result<Page<MessageRecord>> =
            async { decode_list(self.client.get(&path, &params).await?) }.await;
        Outcome::from_result(result, "", "获取消息列表失败")
    }

    pub async fn send(&self, conversation_id: i64, content: &str) -> Outcome<MessageRecord> {
        let body = json!({
            "content": content,
            "role": "USER",
            "contentType": "TEXT",
        });
        let path = messages_path(conversation_id);
        let result: Result<MessageRecord> =
            async { decode(self.client.post(&path, Some(body)).await?) }.await;
        Outcome::from_result(result, "", "发送消息失败")
    }

    pub async fn get(&self, conversation_id: i64, message_id: i64) -> Outcome<MessageRecord> {
        let path = format!("{}/{}", messages_path(conversation_id), message_id);
        let result: Result<MessageRecord> = async { decode(self.client.get(&path, &[]).await?) }.await;
        Outcome::from_result(result, "", "获取消息失败")
    }

    pub async fn delete(&self, conversation_id: i64, message_id: i64) -> Outcome<()> {
        let path = format!("{}/{}", messages_path(conversation_id), message_id);
        let result = self.client.delete(&path).await.map(|_| ());
        Outcome::from_result(result, "消息删除成功", "删除消息失败")
    }

    /// Ask the backend to generate and store the assistant's reply.
    pub async fn ai_reply(&self, conversation_id: i64, message: &str) -> Outcome<MessageRecord> {
        let path = format!("{}/ai-reply", messages_path(conversation_id));
        let body = json!({ "message": message });
        let result: Result<MessageRecord> =
            async { decode(self.client.post(&path, Some(body)).await?) }.await;
        Outcome::from_result(result, "", "生成AI回复失败")
    }
}

fn messages_path(conversation_id: i64) -> String {
    format!("conversations/{}/messages", conversation_id)
}
