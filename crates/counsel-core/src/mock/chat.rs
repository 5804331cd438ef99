//! Mock chat backend over durable storage.
//!
//! The whole conversation list is read and rewritten under
//! `conversations` on every mutation. Newest conversations come first.

use std::rc::Rc;

use serde::Serialize;
use uuid::Uuid;

use counsel_types::{
    ClientError, Outcome, Result,
    config::MockConfig,
    conversation::{derive_title, ChatMessage, Conversation, ConversationSummary, Role, DEFAULT_TITLE},
    envelope::codes,
    event::ClientEvent,
};

use crate::event_bus::EventBus;
use crate::keys;
use crate::mock::responder::KeywordResponder;
use crate::persist::{discard, read_json, write_json};
use crate::ports::{StoragePort, TimerPort};

/// A user message and the reply generated for it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user_message: ChatMessage,
    pub ai_message: ChatMessage,
}

pub struct MockChatService {
    storage: Rc<dyn StoragePort>,
    timer: Rc<dyn TimerPort>,
    events: EventBus,
    responder: KeywordResponder,
    config: MockConfig,
}

impl MockChatService {
    pub fn new(
        storage: Rc<dyn StoragePort>,
        timer: Rc<dyn TimerPort>,
        events: EventBus,
        config: MockConfig,
    ) -> Self {
        Self {
            storage,
            timer,
            events,
            responder: KeywordResponder::new(),
            config,
        }
    }

    pub fn with_responder(mut self, responder: KeywordResponder) -> Self {
        self.responder = responder;
        self
    }

    pub fn responder(&self) -> &KeywordResponder {
        &self.responder
    }

    pub async fn list(&self) -> Outcome<Vec<Conversation>> {
        self.timer.sleep(self.config.io_delay_ms).await;
        Outcome::ok(self.load())
    }

    pub async fn summaries(&self) -> Outcome<Vec<ConversationSummary>> {
        self.list()
            .await
            .map(|conversations| conversations.iter().map(Conversation::summary).collect())
    }

    pub async fn get(&self, id: &str) -> Outcome<Conversation> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let result = self
            .load()
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(missing);
        Outcome::from_result(result, "", "获取对话失败")
    }

    /// New empty conversation at the front of the list. `None` uses the default title.
    pub async fn create(&self, title: Option<&str>) -> Outcome<Conversation> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_TITLE);
        let conversation = Conversation::new(new_id(), title);

        let mut conversations = self.load();
        conversations.insert(0, conversation.clone());
        let result = self.save(&conversations).map(|_| conversation);
        Outcome::from_result(result, "", "创建对话失败")
    }

    /// Append the user's message and a generated reply. The reply lands after
    /// a random delay; the first user message also becomes the title.
    pub async fn send_message(&self, id: &str, text: &str) -> Outcome<Exchange> {
        if text.trim().is_empty() {
            return Outcome::fail(ClientError::validation("content", "消息内容不能为空"));
        }

        self.timer.sleep(self.config.io_delay_ms).await;
        if !self.load().iter().any(|c| c.id == id) {
            return Outcome::fail(missing());
        }

        let user_message = ChatMessage::new(new_id(), Role::User, text);
        let reply = self.responder.respond(text);
        log::debug!("Mock reply drawn from {:?}", reply.source);

        let delay = self
            .responder
            .jitter(self.config.min_reply_delay_ms, self.config.max_reply_delay_ms);
        self.timer.sleep(delay).await;

        let ai_message = ChatMessage::new(new_id(), Role::Assistant, reply.text);
        let result = self.append(id, text, &user_message, &ai_message).map(|_| Exchange {
            user_message,
            ai_message,
        });
        Outcome::from_result(result, "", "发送消息失败")
    }

    /// Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> Outcome<bool> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let mut conversations = self.load();
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        let removed = conversations.len() != before;

        if removed && self.current().as_deref() == Some(id) {
            self.set_current(None);
        }
        let result = self.save(&conversations).map(|_| removed);
        Outcome::from_result(result, "", "删除对话失败")
    }

    pub async fn clear_all(&self) -> Outcome<()> {
        self.timer.sleep(self.config.io_delay_ms).await;
        self.set_current(None);
        Outcome::from_result(self.save(&[]), "", "清空对话失败")
    }

    /// Id of the conversation the user has open.
    pub fn current(&self) -> Option<String> {
        read_json(&*self.storage, keys::CURRENT_CHAT)
    }

    pub fn set_current(&self, id: Option<&str>) {
        match id {
            Some(id) => {
                if let Err(e) = write_json(&*self.storage, keys::CURRENT_CHAT, id) {
                    log::warn!("Failed to remember current conversation: {}", e);
                }
            }
            None => discard(&*self.storage, keys::CURRENT_CHAT),
        }
    }

    // ─── Storage ─────────────────────────────────────────────

    fn load(&self) -> Vec<Conversation> {
        read_json(&*self.storage, keys::CONVERSATIONS).unwrap_or_default()
    }

    fn save(&self, conversations: &[Conversation]) -> Result<()> {
        write_json(&*self.storage, keys::CONVERSATIONS, conversations)?;
        self.events.emit(ClientEvent::ConversationsChanged);
        Ok(())
    }

    // Re-read before writing so changes made during the reply delay survive.
    fn append(&self, id: &str, text: &str, user: &ChatMessage, ai: &ChatMessage) -> Result<()> {
        let mut conversations = self.load();
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(missing)?;

        conversation.push(user.clone());
        conversation.push(ai.clone());
        if conversation.user_message_count() == 1 {
            conversation.title = derive_title(text);
        }
        self.save(&conversations)
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn missing() -> ClientError {
    ClientError::business(codes::NOT_FOUND, "对话不存在")
}
