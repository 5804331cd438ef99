//! JavaScript-facing facade over the app context.
//!
//! Async operations return a `Promise` that resolves to a serialized
//! `Outcome` (`{success, data, message, error}`); they never reject on a
//! failed request. Rejection is reserved for values that cannot cross the
//! JS boundary.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::stream::{AbortHandle, StreamExt};
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use counsel_core::api::{
    ChatRequest, ConversationQuery, LoginRequest, MessageQuery, PasswordChange, RegisterRequest,
};
use counsel_core::guard::{post_login_target, Navigation};
use counsel_core::ports::FilePart;
use counsel_core::AppContext;
use counsel_platform::{auto_detect_storage, FetchTransport, GlooTimer};
use counsel_types::{
    ClientError, Outcome,
    config::ClientConfig,
    envelope::codes,
    user::UserUpdate,
};

#[wasm_bindgen]
pub struct CounselApp {
    ctx: Rc<AppContext>,
    reply_abort: Rc<RefCell<Option<AbortHandle>>>,
}

#[wasm_bindgen]
impl CounselApp {
    /// `config` is a partial `ClientConfig` object; `undefined` uses the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<CounselApp, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            ClientConfig::default()
        } else {
            config.into_serde::<ClientConfig>().map_err(js_error)?
        };

        let ctx = AppContext::init(
            config,
            Rc::new(FetchTransport::new()),
            auto_detect_storage(),
            Rc::new(GlooTimer),
        );
        Ok(Self {
            ctx: Rc::new(ctx),
            reply_abort: Rc::new(RefCell::new(None)),
        })
    }

    // ─── Session ─────────────────────────────────────────────

    #[wasm_bindgen(js_name = isAuthenticated)]
    pub fn is_authenticated(&self) -> bool {
        self.ctx.session.is_authenticated()
    }

    #[wasm_bindgen(js_name = currentUser)]
    pub fn current_user(&self) -> Result<JsValue, JsValue> {
        to_js(&self.ctx.session.current_user())
    }

    pub fn login(&self, username_or_email: String, password: String, remember_me: bool) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let req = LoginRequest {
                username_or_email,
                password,
                remember_me,
            };
            if let Err(e) = req.validate() {
                return Outcome::fail(e);
            }
            ctx.auth.login(&req).await
        })
    }

    pub fn register(
        &self,
        email: String,
        nickname: String,
        password: String,
        confirm_password: String,
    ) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let req = RegisterRequest {
                username: email.clone(),
                email,
                password,
                confirm_password,
                nickname,
            };
            if let Err(e) = req.validate() {
                return Outcome::fail(e);
            }
            ctx.auth.register(&req).await
        })
    }

    pub fn logout(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.auth.logout().await })
    }

    #[wasm_bindgen(js_name = validateToken)]
    pub fn validate_token(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.auth.validate().await })
    }

    #[wasm_bindgen(js_name = refreshToken)]
    pub fn refresh_token(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.auth.refresh().await })
    }

    // ─── Navigation ──────────────────────────────────────────

    /// `{proceed: true}` or `{proceed: false, redirect: "/login?redirect=..."}`
    pub fn navigate(&self, target: &str) -> Result<JsValue, JsValue> {
        let decision = match self.ctx.navigate(target) {
            Navigation::Proceed => json!({ "proceed": true }),
            Navigation::Redirect { to } => json!({ "proceed": false, "redirect": to }),
        };
        to_js(&decision)
    }

    #[wasm_bindgen(js_name = postLoginTarget)]
    pub fn post_login_target(&self, redirect: Option<String>) -> String {
        post_login_target(redirect.as_deref())
    }

    // ─── Profile ─────────────────────────────────────────────

    pub fn profile(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.profile.profile().await })
    }

    #[wasm_bindgen(js_name = updateProfile)]
    pub fn update_profile(&self, update: JsValue) -> Promise {
        let ctx = self.ctx.clone();
        let update = update.into_serde::<UserUpdate>();
        respond(async move {
            match update {
                Ok(update) => ctx.profile.update_profile(&update).await,
                Err(e) => Outcome::fail(e.into()),
            }
        })
    }

    #[wasm_bindgen(js_name = changePassword)]
    pub fn change_password(
        &self,
        old_password: String,
        new_password: String,
        confirm_password: String,
    ) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let change = PasswordChange {
                old_password,
                new_password,
                confirm_password,
            };
            if let Err(e) = change.validate() {
                return Outcome::fail(e);
            }
            ctx.profile.change_password(&change).await
        })
    }

    #[wasm_bindgen(js_name = uploadAvatar)]
    pub fn upload_avatar(&self, file_name: String, mime: String, bytes: Vec<u8>) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let file = FilePart {
                field: "file".to_string(),
                file_name,
                mime,
                bytes,
            };
            ctx.profile.upload_avatar(file).await
        })
    }

    /// Absolute URL for an avatar path returned by the server.
    #[wasm_bindgen(js_name = assetUrl)]
    pub fn asset_url(&self, path: &str) -> String {
        self.ctx.config.asset_url(path)
    }

    // ─── Conversations & messages ────────────────────────────

    #[wasm_bindgen(js_name = listConversations)]
    pub fn list_conversations(&self, current: u32, size: u32) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let query = ConversationQuery {
                current,
                size,
                ..ConversationQuery::default()
            };
            ctx.conversations.list(&query).await
        })
    }

    #[wasm_bindgen(js_name = cachedConversations)]
    pub fn cached_conversations(&self) -> Result<JsValue, JsValue> {
        to_js(&self.ctx.conversations.cached())
    }

    #[wasm_bindgen(js_name = createConversation)]
    pub fn create_conversation(&self, title: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.conversations.create(&title).await })
    }

    #[wasm_bindgen(js_name = deleteConversation)]
    pub fn delete_conversation(&self, id: f64) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.conversations.delete(id as i64).await })
    }

    #[wasm_bindgen(js_name = archiveConversation)]
    pub fn archive_conversation(&self, id: f64) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.conversations.archive(id as i64).await })
    }

    #[wasm_bindgen(js_name = listMessages)]
    pub fn list_messages(&self, conversation_id: f64, page: u32, size: u32) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            let query = MessageQuery { page, size };
            ctx.messages.list(conversation_id as i64, &query).await
        })
    }

    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, conversation_id: f64, content: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.messages.send(conversation_id as i64, &content).await })
    }

    #[wasm_bindgen(js_name = aiReply)]
    pub fn ai_reply(&self, conversation_id: f64, message: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.messages.ai_reply(conversation_id as i64, &message).await })
    }

    // ─── AI service ──────────────────────────────────────────

    #[wasm_bindgen(js_name = aiChat)]
    pub fn ai_chat(&self, conversation_id: String, message: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.ai.chat(&ChatRequest::new(conversation_id, message)).await })
    }

    /// Types the reply out through `on_chunk({content, isComplete})`. The
    /// promise resolves with the full text once the last chunk is delivered.
    #[wasm_bindgen(js_name = aiChatStream)]
    pub fn ai_chat_stream(&self, conversation_id: String, message: String, on_chunk: Function) -> Promise {
        let ctx = self.ctx.clone();
        let slot = self.reply_abort.clone();
        future_to_promise(async move {
            let outcome = ctx.ai.chat_stream(&ChatRequest::new(conversation_id, message)).await;
            let mut stream = match outcome.into_result() {
                Ok(stream) => stream,
                Err(e) => return to_js(&Outcome::<String>::fail(e)),
            };
            *slot.borrow_mut() = Some(stream.abort_handle());

            let mut full = None;
            while let Some(chunk) = stream.next().await {
                on_chunk.call1(&JsValue::NULL, &to_js(&chunk)?)?;
                if chunk.is_complete {
                    full = Some(chunk.content);
                }
            }
            slot.borrow_mut().take();

            match full {
                Some(text) => to_js(&Outcome::ok(text)),
                None => to_js(&Outcome::<String> {
                    success: false,
                    data: None,
                    message: Some("回复已停止".to_string()),
                    error: None,
                }),
            }
        })
    }

    /// Stop the reply currently being typed out, if any.
    #[wasm_bindgen(js_name = stopReply)]
    pub fn stop_reply(&self) {
        if let Some(handle) = self.reply_abort.borrow_mut().take() {
            handle.abort();
        }
    }

    #[wasm_bindgen(js_name = aiHealth)]
    pub fn ai_health(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.ai.health().await })
    }

    #[wasm_bindgen(js_name = aiStats)]
    pub fn ai_stats(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.ai.stats().await })
    }

    // ─── System ──────────────────────────────────────────────

    pub fn health(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.system.health().await })
    }

    pub fn version(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move { ctx.system.version().await })
    }

    // ─── Mock chat ───────────────────────────────────────────

    #[wasm_bindgen(js_name = mockConversations)]
    pub fn mock_conversations(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.summaries().await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = mockConversation)]
    pub fn mock_conversation(&self, id: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.get(&id).await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = mockCreate)]
    pub fn mock_create(&self, title: Option<String>) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.create(title.as_deref()).await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = mockSend)]
    pub fn mock_send(&self, id: String, text: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.send_message(&id, &text).await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = mockDelete)]
    pub fn mock_delete(&self, id: String) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.delete(&id).await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = mockClear)]
    pub fn mock_clear(&self) -> Promise {
        let ctx = self.ctx.clone();
        respond(async move {
            match ctx.mock {
                Some(ref mock) => mock.chat.clear_all().await,
                None => mock_only(),
            }
        })
    }

    #[wasm_bindgen(js_name = currentConversation)]
    pub fn current_conversation(&self) -> Option<String> {
        self.ctx.mock.as_ref().and_then(|mock| mock.chat.current())
    }

    #[wasm_bindgen(js_name = setCurrentConversation)]
    pub fn set_current_conversation(&self, id: Option<String>) {
        if let Some(ref mock) = self.ctx.mock {
            mock.chat.set_current(id.as_deref());
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Events queued since the last call, oldest first.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&self) -> Result<JsValue, JsValue> {
        to_js(&self.ctx.events.drain())
    }

    /// Persist settings; they take effect on the next start.
    #[wasm_bindgen(js_name = saveConfig)]
    pub fn save_config(&self, config: JsValue) -> Result<(), JsValue> {
        let config = config.into_serde::<ClientConfig>().map_err(js_error)?;
        self.ctx.save_config(&config).map_err(js_error)
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(&self.ctx.config)
    }

    pub fn teardown(&self) -> Result<JsValue, JsValue> {
        self.stop_reply();
        to_js(&self.ctx.teardown())
    }
}

fn respond<T, F>(operation: F) -> Promise
where
    T: Serialize,
    F: Future<Output = Outcome<T>> + 'static,
{
    future_to_promise(async move { to_js(&operation.await) })
}

fn mock_only<T>() -> Outcome<T> {
    Outcome::fail(ClientError::business(codes::BAD_REQUEST, "仅在模拟模式下可用"))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(js_error)
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
