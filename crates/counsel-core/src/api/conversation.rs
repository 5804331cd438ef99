use std::rc::Rc;

use serde::Serialize;
use serde_json::json;

use counsel_types::{
    Outcome, Result,
    conversation::{ConversationRecord, ConversationStatus},
};

use crate::http::{decode, ApiClient};
use crate::keys;
use crate::listing::{decode_list, Page};
use crate::persist::{read_json, write_json};
use crate::ports::StoragePort;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationQuery {
    pub current: u32,
    pub size: u32,
    pub status: Option<ConversationStatus>,
}

impl Default for ConversationQuery {
    fn default() -> Self {
        Self {
            current: 1,
            size: 10,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
}

/// Server-side conversations. The last fetched page is cached under
/// `chat_history` so a reload can render something before the network answers.
pub struct ConversationApi {
    client: Rc<ApiClient>,
    storage: Rc<dyn StoragePort>,
}

impl ConversationApi {
    pub fn new(client: Rc<ApiClient>, storage: Rc<dyn StoragePort>) -> Self {
        Self { client, storage }
    }

    pub async fn list(&self, query: &ConversationQuery) -> Outcome<Page<ConversationRecord>> {
        Outcome::from_result(self.try_list(query).await, "", "获取对话列表失败")
    }

    pub async fn create(&self, title: &str) -> Outcome<ConversationRecord> {
        let result: Result<ConversationRecord> = async {
            decode(
                self.client
                    .post("conversations", Some(json!({ "title": title })))
                    .await?,
            )
        }
        .await;
        Outcome::from_result(result, "对话创建成功", "创建对话失败")
    }

    pub async fn get(&self, id: i64) -> Outcome<ConversationRecord> {
        let path = format!("conversations/{}", id);
        let result: Result<ConversationRecord> =
            async { decode(self.client.get(&path, &[]).await?) }.await;
        Outcome::from_result(result, "", "获取对话详情失败")
    }

    pub async fn update(&self, id: i64, update: &ConversationUpdate) -> Outcome<ConversationRecord> {
        let result: Result<ConversationRecord> = async {
            let body = serde_json::to_value(update)?;
            decode(
                self.client
                    .put(&format!("conversations/{}", id), Some(body))
                    .await?,
            )
        }
        .await;
        Outcome::from_result(result, "对话更新成功", "更新对话失败")
    }

    pub async fn delete(&self, id: i64) -> Outcome<()> {
        let result = self
            .client
            .delete(&format!("conversations/{}", id))
            .await
            .map(|_| ());
        Outcome::from_result(result, "对话删除成功", "删除对话失败")
    }

    pub async fn archive(&self, id: i64) -> Outcome<()> {
        let result = self
            .client
            .put(&format!("conversations/{}/archive", id), None)
            .await
            .map(|_| ());
        Outcome::from_result(result, "对话已归档", "归档对话失败")
    }

    pub async fn activate(&self, id: i64) -> Outcome<()> {
        let result = self
            .client
            .put(&format!("conversations/{}/activate", id), None)
            .await
            .map(|_| ());
        Outcome::from_result(result, "对话已激活", "激活对话失败")
    }

    /// Last list fetched from the server, if any.
    pub fn cached(&self) -> Vec<ConversationRecord> {
        read_json(&*self.storage, keys::CHAT_HISTORY).unwrap_or_default()
    }

    async fn try_list(&self, query: &ConversationQuery) -> Result<Page<ConversationRecord>> {
        let pagination = [
            ("current", query.current.to_string()),
            ("size", query.size.to_string()),
        ];
        let payload = match query.status {
            Some(status) => {
                let status = serde_json::to_value(status)?;
                let status = status.as_str().unwrap_or_default().to_string();
                self.client
                    .get(&format!("conversations/status/{}", status), &pagination)
                    .await?
            }
            None => self.client.get("conversations", &pagination).await?,
        };

        let page: Page<ConversationRecord> = decode_list(payload)?;
        if let Err(e) = write_json(&*self.storage, keys::CHAT_HISTORY, &page.items) {
            log::warn!("Failed to cache conversation list: {}", e);
        }
        Ok(page)
    }
}
