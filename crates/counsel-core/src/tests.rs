use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::executor::block_on;
use futures::StreamExt;
use serde_json::{json, Value};

use counsel_types::config::{BackendMode, ClientConfig, MockConfig};
use counsel_types::conversation::{ConversationRecord, MessageRecord, Role, DEFAULT_TITLE};
use counsel_types::event::ClientEvent;
use counsel_types::session::Credential;
use counsel_types::user::{UserProfile, UserUpdate};
use counsel_types::{ClientError, ErrorKind, Result};

use crate::api::*;
use crate::event_bus::EventBus;
use crate::guard::*;
use crate::http::ApiClient;
use crate::keys::{self, legacy};
use crate::listing::{decode_list, ListShape, Page};
use crate::mock::responder::{self, Category, KeywordResponder, Source};
use crate::mock::*;
use crate::persist::{read_timed, write_timed};
use crate::ports::*;
use crate::session::SessionStore;
use crate::stream::{reply_stream, ReplyStream};
use crate::validation::*;
use crate::AppContext;

// ─── Fakes ───────────────────────────────────────────────

#[derive(Default)]
struct MemStore {
    data: RefCell<BTreeMap<String, String>>,
    fail_writes: Cell<bool>,
    fail_removes: Cell<bool>,
}

impl MemStore {
    fn raw(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }
}

impl StoragePort for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.get() {
            return Err(ClientError::storage("quota exceeded"));
        }
        self.data.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_removes.get() {
            return Err(ClientError::storage("storage locked"));
        }
        self.data.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.borrow().keys().cloned().collect())
    }

    fn backend_name(&self) -> &str {
        "test"
    }
}

/// Replays queued responses and records every request.
#[derive(Default)]
struct FakeHttp {
    responses: RefCell<VecDeque<Result<HttpResponse>>>,
    requests: RefCell<Vec<HttpRequest>>,
    hang: Cell<bool>,
}

impl FakeHttp {
    fn push(&self, response: Result<HttpResponse>) {
        self.responses.borrow_mut().push_back(response);
    }

    fn push_ok(&self, data: Value) {
        self.push(Ok(HttpResponse::json(
            200,
            &json!({ "code": 0, "message": "success", "data": data }),
        )));
    }

    fn last(&self) -> HttpRequest {
        self.requests.borrow().last().cloned().expect("no request sent")
    }

    fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl HttpPort for FakeHttp {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(req);
        if self.hang.get() {
            futures::future::pending::<()>().await;
        }
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("connection refused")))
    }
}

/// Resolves immediately, remembering what it was asked to wait.
#[derive(Default)]
struct FakeTimer {
    sleeps: RefCell<Vec<u64>>,
}

#[async_trait(?Send)]
impl TimerPort for FakeTimer {
    async fn sleep(&self, ms: u64) {
        self.sleeps.borrow_mut().push(ms);
    }
}

struct Harness {
    storage: Rc<MemStore>,
    http: Rc<FakeHttp>,
    timer: Rc<FakeTimer>,
    events: EventBus,
    session: Rc<SessionStore>,
    client: Rc<ApiClient>,
}

fn harness() -> Harness {
    let storage = Rc::new(MemStore::default());
    let http = Rc::new(FakeHttp::default());
    let timer = Rc::new(FakeTimer::default());
    let events = EventBus::new();
    let session = Rc::new(SessionStore::new(storage.clone(), events.clone()));
    let config = ClientConfig {
        mock: MockConfig::instant(),
        ..ClientConfig::default()
    };
    let client = Rc::new(ApiClient::new(
        config,
        http.clone(),
        timer.clone(),
        session.clone(),
    ));
    Harness {
        storage,
        http,
        timer,
        events,
        session,
        client,
    }
}

fn alice() -> UserProfile {
    UserProfile::new(7, "alice@example.com", "阿丽")
}

fn sign_in(h: &Harness) {
    h.session
        .login(alice(), Credential::bearer("tok-123"))
        .expect("login");
    h.events.drain();
}

fn grant_json() -> Value {
    json!({
        "accessToken": "jwt-abc",
        "tokenType": "Bearer",
        "expiresIn": 86400,
        "userInfo": {
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "nickname": "阿丽",
            "avatarUrl": "",
            "status": "ACTIVE"
        }
    })
}

fn three_messages() -> Value {
    json!([
        { "id": 1, "role": "USER", "content": "一" },
        { "id": 2, "role": "ASSISTANT", "content": "二" },
        { "id": 3, "role": "USER", "content": "三" }
    ])
}

// ─── EventBus Tests ──────────────────────────────────────

#[test]
fn test_event_bus_clone_shares_queue() {
    let bus = EventBus::new();
    let other = bus.clone();
    bus.emit(ClientEvent::LoggedOut);
    assert!(other.has_pending());
    assert_eq!(other.drain(), vec![ClientEvent::LoggedOut]);
    assert!(bus.is_empty());
}

// ─── Persist Tests ───────────────────────────────────────

#[test]
fn test_timed_entry_roundtrip_and_expiry() {
    let store = MemStore::default();
    let now = Utc::now();
    write_timed(&store, "k", &"v".to_string(), Some(now + Duration::minutes(5))).unwrap();

    let raw: Value = serde_json::from_str(&store.raw("k").unwrap()).unwrap();
    assert_eq!(raw["value"], "v");
    assert!(raw["timestamp"].is_i64());
    assert!(raw["expireTime"].is_i64());

    let read = read_timed::<String>(&store, "k", now).unwrap();
    assert_eq!(read.value, "v");

    assert!(read_timed::<String>(&store, "k", now + Duration::minutes(6)).is_none());
    assert!(store.raw("k").is_none(), "expired entry should be removed");
}

#[test]
fn test_malformed_timed_entry_is_discarded() {
    let store = MemStore::default();
    store.set("k", "not json").unwrap();
    assert!(read_timed::<String>(&store, "k", Utc::now()).is_none());
    assert!(store.raw("k").is_none());
}

// ─── Session Tests ───────────────────────────────────────

#[test]
fn test_login_sets_user_and_token() {
    let h = harness();
    h.session.login(alice(), Credential::bearer("tok-123")).unwrap();

    assert!(h.session.is_authenticated());
    assert_eq!(h.session.current_user(), Some(alice()));
    assert_eq!(h.session.token().as_deref(), Some("tok-123"));
    assert_eq!(h.session.authorization().as_deref(), Some("Bearer tok-123"));
    assert_eq!(h.events.drain(), vec![ClientEvent::LoggedIn { user_id: 7 }]);
}

#[test]
fn test_login_writes_current_and_legacy_keys() {
    let h = harness();
    h.session.login(alice(), Credential::bearer("tok-123")).unwrap();

    assert!(h.storage.raw(keys::AUTH_TOKEN).unwrap().contains("tok-123"));
    assert!(h.storage.raw(keys::USER_INFO).unwrap().contains("alice@example.com"));
    assert_eq!(h.storage.raw(legacy::TOKEN).as_deref(), Some("tok-123"));
    assert_eq!(h.storage.raw(legacy::IS_LOGGED_IN).as_deref(), Some("true"));
}

#[test]
fn test_login_then_restore_after_reload() {
    let h = harness();
    let expires = Utc::now() + Duration::hours(1);
    h.session
        .login(alice(), Credential::bearer("tok-123").expiring_at(expires))
        .unwrap();

    // Fresh store over the same storage simulates a page reload.
    let reloaded = SessionStore::new(h.storage.clone(), EventBus::new());
    assert!(reloaded.restore(Utc::now()));
    assert_eq!(reloaded.current_user(), Some(alice()));
    assert_eq!(reloaded.token().as_deref(), Some("tok-123"));
}

#[test]
fn test_restore_with_nothing_stored_stays_logged_out() {
    let h = harness();
    assert!(!h.session.restore(Utc::now()));
    assert!(!h.session.is_authenticated());
    assert_eq!(
        h.events.drain(),
        vec![ClientEvent::Restored { authenticated: false }]
    );
}

#[test]
fn test_restore_with_expired_token_purges_storage() {
    let h = harness();
    let past = Utc::now() - Duration::hours(1);
    h.session
        .login(alice(), Credential::bearer("old").expiring_at(past))
        .unwrap();

    let reloaded = SessionStore::new(h.storage.clone(), EventBus::new());
    assert!(!reloaded.restore(Utc::now()));
    assert!(h.storage.raw(keys::AUTH_TOKEN).is_none());
    assert!(h.storage.raw(keys::USER_INFO).is_none());
    assert_eq!(h.storage.raw(legacy::IS_LOGGED_IN).as_deref(), Some("false"));
}

#[test]
fn test_restore_with_malformed_token_stays_logged_out() {
    let h = harness();
    h.storage.set(keys::AUTH_TOKEN, "{broken").unwrap();
    h.storage.set(keys::USER_INFO, &json!({"value": alice(), "timestamp": 0}).to_string()).unwrap();

    assert!(!h.session.restore(Utc::now()));
    assert_eq!(h.session.current_user(), None);
}

#[test]
fn test_restore_falls_back_to_legacy_keys() {
    let h = harness();
    h.storage.set(legacy::TOKEN, "legacy-tok").unwrap();
    h.storage.set(legacy::USER, &serde_json::to_string(&alice()).unwrap()).unwrap();
    h.storage.set(legacy::IS_LOGGED_IN, "true").unwrap();

    assert!(h.session.restore(Utc::now()));
    assert_eq!(h.session.token().as_deref(), Some("legacy-tok"));
    assert_eq!(h.session.current_user().map(|u| u.id), Some(7));
}

#[test]
fn test_logout_twice_is_idempotent() {
    let h = harness();
    sign_in(&h);

    h.session.logout();
    let after_once = (h.session.snapshot(), h.storage.keys().unwrap());
    h.session.logout();
    let after_twice = (h.session.snapshot(), h.storage.keys().unwrap());

    assert_eq!(after_once, after_twice);
    assert!(!h.session.is_authenticated());
    assert_eq!(h.events.drain(), vec![ClientEvent::LoggedOut]);
}

#[test]
fn test_update_user_is_noop_when_logged_out() {
    let h = harness();
    let update = UserUpdate {
        nickname: Some("新名字".into()),
        ..UserUpdate::default()
    };
    assert!(!h.session.update_user(&update).unwrap());
    assert!(h.session.current_user().is_none());
    assert!(h.events.is_empty());
}

#[test]
fn test_update_user_merges_and_persists() {
    let h = harness();
    sign_in(&h);
    let update = UserUpdate {
        nickname: Some("新名字".into()),
        ..UserUpdate::default()
    };
    assert!(h.session.update_user(&update).unwrap());

    let user = h.session.current_user().unwrap();
    assert_eq!(user.nickname, "新名字");
    assert_eq!(user.email, "alice@example.com");
    assert!(h.storage.raw(keys::USER_INFO).unwrap().contains("新名字"));
    assert!(h.storage.raw(legacy::USER).unwrap().contains("新名字"));
}

#[test]
fn test_login_storage_failure_leaves_state_unchanged() {
    let h = harness();
    h.storage.fail_writes.set(true);
    let err = h.session.login(alice(), Credential::bearer("tok")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(!h.session.is_authenticated());
    assert!(h.events.is_empty());
}

#[test]
fn test_check_expiry_tears_down_expired_session() {
    let h = harness();
    let expires = Utc::now() + Duration::minutes(1);
    h.session
        .login(alice(), Credential::bearer("tok").expiring_at(expires))
        .unwrap();
    h.events.drain();

    assert!(!h.session.check_expiry(Utc::now()));
    assert!(h.session.check_expiry(expires + Duration::seconds(1)));
    assert!(!h.session.is_authenticated());
    assert_eq!(h.events.drain(), vec![ClientEvent::SessionExpired]);
}

#[test]
fn test_refresh_keeps_previous_refresh_token() {
    let h = harness();
    let mut credential = Credential::bearer("tok-1");
    credential.refresh_token = Some("r-1".into());
    h.session.login(alice(), credential).unwrap();

    assert!(h.session.refresh(Credential::bearer("tok-2")).unwrap());
    assert_eq!(h.session.token().as_deref(), Some("tok-2"));
    assert_eq!(h.session.refresh_token().as_deref(), Some("r-1"));
    assert_eq!(h.session.current_user(), Some(alice()));
}

#[test]
fn test_refresh_is_noop_when_logged_out() {
    let h = harness();
    assert!(!h.session.refresh(Credential::bearer("tok")).unwrap());
    assert!(h.session.token().is_none());
}

#[test]
fn test_restore_keeps_token_type() {
    let h = harness();
    let credential = Credential {
        token_type: "JWT".into(),
        ..Credential::bearer("tok-9")
    };
    h.session.login(alice(), credential).unwrap();
    assert_eq!(h.session.authorization().as_deref(), Some("JWT tok-9"));

    let reloaded = SessionStore::new(h.storage.clone(), EventBus::new());
    assert!(reloaded.restore(Utc::now()));
    assert_eq!(reloaded.authorization().as_deref(), Some("JWT tok-9"));
}

#[test]
fn test_update_user_storage_failure_keeps_old_profile() {
    let h = harness();
    sign_in(&h);
    h.storage.fail_writes.set(true);
    let update = UserUpdate {
        nickname: Some("新名".into()),
        ..UserUpdate::default()
    };

    let err = h.session.update_user(&update).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(h.session.current_user(), Some(alice()));
    assert!(h.events.is_empty());

    let reloaded = SessionStore::new(h.storage.clone(), EventBus::new());
    assert!(reloaded.restore(Utc::now()));
    assert_eq!(reloaded.current_user(), h.session.current_user());
}

#[test]
fn test_refresh_storage_failure_keeps_old_credential() {
    let h = harness();
    sign_in(&h);
    h.storage.fail_writes.set(true);

    assert!(h.session.refresh(Credential::bearer("tok-new")).is_err());
    assert_eq!(h.session.token().as_deref(), Some("tok-123"));
    assert!(h.events.is_empty());
}

#[test]
fn test_logout_with_failed_removal_stays_logged_out_after_reload() {
    let h = harness();
    sign_in(&h);
    h.storage.fail_removes.set(true);

    h.session.logout();
    assert!(!h.session.is_authenticated());
    assert!(h.storage.raw(keys::AUTH_TOKEN).is_some());
    assert_eq!(h.storage.raw(legacy::IS_LOGGED_IN).as_deref(), Some("false"));

    let reloaded = SessionStore::new(h.storage.clone(), EventBus::new());
    assert!(!reloaded.restore(Utc::now()));
    assert!(reloaded.token().is_none());
}

// ─── HTTP Adapter Tests ──────────────────────────────────

#[test]
fn test_bearer_header_attached_only_when_signed_in() {
    let h = harness();
    h.http.push_ok(json!({}));
    block_on(h.client.get("health", &[])).unwrap();
    assert_eq!(h.http.last().header_value("Authorization"), None);

    sign_in(&h);
    h.http.push_ok(json!({}));
    block_on(h.client.get("health", &[])).unwrap();
    assert_eq!(
        h.http.last().header_value("authorization"),
        Some("Bearer tok-123")
    );
}

#[test]
fn test_request_url_query_and_json_body() {
    let h = harness();
    h.http.push_ok(json!(null));
    block_on(h.client.get("conversations", &[("current", "2".to_string())])).unwrap();
    let req = h.http.last();
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.url, "http://localhost:8080/api/v1/conversations");
    assert_eq!(req.query, vec![("current".to_string(), "2".to_string())]);

    h.http.push_ok(json!(null));
    block_on(h.client.ai_post("chat", json!({"message": "hi"}))).unwrap();
    let req = h.http.last();
    assert_eq!(req.url, "http://localhost:8080/api/ai/chat");
    assert_eq!(req.header_value("Content-Type"), Some("application/json"));
    assert_eq!(req.body, RequestBody::Json(json!({"message": "hi"})));
}

#[test]
fn test_success_envelope_resolves_with_data() {
    let h = harness();
    h.http.push_ok(json!({"version": "1.0.0"}));
    let data = block_on(h.client.get("health/version", &[])).unwrap();
    assert_eq!(data, json!({"version": "1.0.0"}));
}

#[test]
fn test_success_envelope_without_data_resolves_with_body() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(200, &json!({"code": 0, "message": "ok"}))));
    let data = block_on(h.client.post("auth/logout", None)).unwrap();
    assert_eq!(data, json!({"code": 0, "message": "ok"}));
}

#[test]
fn test_plain_json_passes_through() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(200, &json!({"status": "UP"}))));
    let data = block_on(h.client.get("health", &[])).unwrap();
    assert_eq!(data["status"], "UP");
}

#[test]
fn test_business_code_rejects_with_code_message_details() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(
        200,
        &json!({"code": 10005, "message": "该邮箱已被注册", "details": {"field": "email"}}),
    )));
    let err = block_on(h.client.post("auth/register", Some(json!({})))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Business);
    assert_eq!(err.code(), Some(10005));
    assert_eq!(err.message(), "该邮箱已被注册");
    assert_eq!(err.details(), Some(&json!({"field": "email"})));
}

#[test]
fn test_401_clears_session_and_rejects() {
    let h = harness();
    sign_in(&h);
    h.http.push(Ok(HttpResponse::json(
        401,
        &json!({"code": 10002, "message": "未授权"}),
    )));

    let err = block_on(h.client.get("users/profile", &[])).unwrap_err();
    assert!(err.is_unauthorized());
    assert!(h.session.token().is_none());
    assert!(!h.session.is_authenticated());
    assert!(h.storage.raw(keys::AUTH_TOKEN).is_none());
    assert_eq!(h.events.drain(), vec![ClientEvent::SessionExpired]);
}

#[test]
fn test_error_status_defaults_message() {
    let h = harness();
    h.http.push(Ok(HttpResponse::new(404, "")));
    let err = block_on(h.client.get("conversations/9", &[])).unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), "请求的资源不存在");

    h.http.push(Ok(HttpResponse::new(403, "")));
    let err = block_on(h.client.get("users/list", &[])).unwrap_err();
    assert_eq!(err.message(), "访问被拒绝");
}

#[test]
fn test_error_status_keeps_server_message_and_details() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(
        500,
        &json!({
            "code": 50001,
            "message": "数据库不可用",
            "details": {"trace": "x"},
            "timestamp": "2024-01-01T00:00:00",
            "path": "/api/v1/conversations"
        }),
    )));
    let err = block_on(h.client.get("conversations", &[])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), "数据库不可用");
    assert_eq!(err.details(), Some(&json!({"trace": "x"})));
}

#[test]
fn test_transport_failure_is_network_error() {
    let h = harness();
    let err = block_on(h.client.get("health", &[])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.message(), "网络错误，请检查网络连接");
}

#[test]
fn test_hung_request_times_out() {
    let h = harness();
    h.http.hang.set(true);
    let err = block_on(h.client.get("health", &[])).unwrap_err();
    assert_eq!(err, ClientError::Timeout { ms: 10_000 });
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(*h.timer.sleeps.borrow(), vec![10_000]);
}

#[test]
fn test_no_retry_after_failure() {
    let h = harness();
    h.http.push(Ok(HttpResponse::new(500, "")));
    let _ = block_on(h.client.get("health", &[]));
    assert_eq!(h.http.count(), 1);
}

// ─── List Decoder Tests ──────────────────────────────────

#[test]
fn test_message_list_extracts_same_items_from_every_shape() {
    let bodies = [
        (json!({"records": three_messages(), "total": 3}), ListShape::Records),
        (json!({"content": three_messages(), "totalElements": 3}), ListShape::Content),
        (three_messages(), ListShape::Bare),
    ];

    for (body, expected_shape) in bodies {
        let h = harness();
        h.http.push_ok(body);
        let api = MessageApi::new(h.client.clone());
        let outcome = block_on(api.list(5, &MessageQuery::default()));

        let page = outcome.data.expect("page");
        assert_eq!(page.shape, expected_shape);
        let contents: Vec<&str> = page.items.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["一", "二", "三"]);
        assert_eq!(page.total, Some(3));
    }
}

#[test]
fn test_records_win_over_content() {
    let page: Page<MessageRecord> = decode_list(json!({
        "records": three_messages(),
        "content": [],
    }))
    .unwrap();
    assert_eq!(page.shape, ListShape::Records);
    assert_eq!(page.len(), 3);
}

#[test]
fn test_list_nested_under_data() {
    let page: Page<MessageRecord> = decode_list(json!({"data": three_messages()})).unwrap();
    assert_eq!(page.shape, ListShape::Data);
    assert_eq!(page.len(), 3);
}

#[test]
fn test_null_list_is_empty() {
    let page: Page<MessageRecord> = decode_list(Value::Null).unwrap();
    assert_eq!(page.shape, ListShape::Empty);
    assert!(page.is_empty());
}

#[test]
fn test_lone_object_is_a_single_item_page() {
    let page: Page<MessageRecord> =
        decode_list(json!({ "id": 9, "role": "USER", "content": "唯一" })).unwrap();
    assert_eq!(page.shape, ListShape::Bare);
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].content, "唯一");
    assert_eq!(page.total, Some(1));
}

#[test]
fn test_unrecognised_list_shape_is_an_error() {
    let err = decode_list::<MessageRecord>(json!({"items": []})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
}

#[test]
fn test_page_has_next() {
    let page: Page<MessageRecord> = decode_list(json!({
        "records": three_messages(),
        "current": 1,
        "pages": 2,
    }))
    .unwrap();
    assert_eq!(page.has_next, Some(true));

    let page: Page<MessageRecord> =
        decode_list(json!({"content": three_messages(), "last": true})).unwrap();
    assert_eq!(page.has_next, Some(false));
}

// ─── Auth API Tests ──────────────────────────────────────

#[test]
fn test_remote_login_establishes_session() {
    let h = harness();
    h.http.push_ok(grant_json());
    let auth = RemoteAuth::new(h.client.clone());

    let outcome = block_on(auth.login(&LoginRequest::new("alice@example.com", "Secret123")));
    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("登录成功"));

    let returned = outcome.data.unwrap();
    assert!(h.session.is_authenticated());
    assert_eq!(h.session.current_user(), Some(returned));
    assert_eq!(h.session.token().as_deref(), Some("jwt-abc"));

    let req = h.http.last();
    assert_eq!(req.url, "http://localhost:8080/api/v1/auth/login");
    assert_eq!(
        req.body,
        RequestBody::Json(json!({
            "usernameOrEmail": "alice@example.com",
            "password": "Secret123",
            "rememberMe": false
        }))
    );
}

#[test]
fn test_remote_login_with_out_of_range_expiry_never_expires() {
    let h = harness();
    let mut grant = grant_json();
    grant["expiresIn"] = json!(10_000_000_000_000_i64);
    h.http.push_ok(grant);
    let auth = RemoteAuth::new(h.client.clone());

    let outcome = block_on(auth.login(&LoginRequest::new("alice@example.com", "Secret123")));
    assert!(outcome.success);
    assert!(h.session.is_authenticated());
    assert!(!h.session.check_expiry(Utc::now() + Duration::days(36_500)));
}

#[test]
fn test_remote_login_failure_is_outcome_not_err() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(
        200,
        &json!({"code": 10002, "message": "用户名或密码错误"}),
    )));
    let auth = RemoteAuth::new(h.client.clone());
    let outcome = block_on(auth.login(&LoginRequest::new("alice", "bad")));

    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("用户名或密码错误"));
    assert!(!h.session.is_authenticated());
}

#[test]
fn test_remote_register_with_token_signs_in() {
    let h = harness();
    h.http.push_ok(grant_json());
    let auth = RemoteAuth::new(h.client.clone());
    let req = RegisterRequest {
        email: "alice@example.com".into(),
        nickname: "阿丽".into(),
        ..RegisterRequest::default()
    };
    let outcome = block_on(auth.register(&req));
    assert!(outcome.success);
    assert!(h.session.is_authenticated());
}

#[test]
fn test_remote_logout_ends_session_even_when_server_fails() {
    let h = harness();
    sign_in(&h);
    h.http.push(Ok(HttpResponse::new(500, "")));
    let auth = RemoteAuth::new(h.client.clone());

    let outcome = block_on(auth.logout());
    assert!(outcome.success);
    assert!(!h.session.is_authenticated());
}

#[test]
fn test_remote_refresh_swaps_token() {
    let h = harness();
    let mut credential = Credential::bearer("tok-1");
    credential.refresh_token = Some("r-1".into());
    h.session.login(alice(), credential).unwrap();
    h.http.push_ok(json!({"accessToken": "tok-2", "expiresIn": 60}));

    let auth = RemoteAuth::new(h.client.clone());
    assert!(block_on(auth.refresh()).success);
    assert_eq!(h.session.token().as_deref(), Some("tok-2"));
    assert_eq!(
        h.http.last().body,
        RequestBody::Json(json!({"refreshToken": "r-1"}))
    );
}

#[test]
fn test_remote_refresh_without_refresh_token_fails_locally() {
    let h = harness();
    sign_in(&h);
    let auth = RemoteAuth::new(h.client.clone());
    let outcome = block_on(auth.refresh());
    assert!(!outcome.success);
    assert_eq!(h.http.count(), 0);
}

#[test]
fn test_remote_validate_refreshes_cached_user() {
    let h = harness();
    sign_in(&h);
    h.http.push_ok(json!({
        "id": 7,
        "email": "alice@example.com",
        "nickname": "新阿丽",
    }));
    let auth = RemoteAuth::new(h.client.clone());
    let outcome = block_on(auth.validate());
    assert!(outcome.success);
    assert_eq!(h.session.current_user().unwrap().nickname, "新阿丽");
}

// ─── User API Tests ──────────────────────────────────────

#[test]
fn test_update_profile_merges_into_session() {
    let h = harness();
    sign_in(&h);
    h.http.push_ok(json!({"nickname": "小丽", "updatedTime": "2024-05-01T10:00:00"}));
    let api = UserApi::new(h.client.clone());

    let update = UserUpdate {
        nickname: Some("小丽".into()),
        ..UserUpdate::default()
    };
    let outcome = block_on(api.update_profile(&update));
    assert!(outcome.success);

    let user = h.session.current_user().unwrap();
    assert_eq!(user.nickname, "小丽");
    assert_eq!(user.updated_at.as_deref(), Some("2024-05-01T10:00:00"));
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(h.http.last().method, Method::Put);
}

#[test]
fn test_upload_avatar_sends_multipart_and_merges_url() {
    let h = harness();
    sign_in(&h);
    h.http.push_ok(json!({"avatarUrl": "/uploads/avatars/7/a.jpg"}));
    let api = UserApi::new(h.client.clone());

    let file = FilePart {
        field: "file".into(),
        file_name: "a.jpg".into(),
        mime: "image/jpeg".into(),
        bytes: vec![0xff, 0xd8],
    };
    let outcome = block_on(api.upload_avatar(file.clone()));
    assert_eq!(outcome.data.as_deref(), Some("/uploads/avatars/7/a.jpg"));
    assert_eq!(
        h.session.current_user().unwrap().avatar_url,
        "/uploads/avatars/7/a.jpg"
    );

    let req = h.http.last();
    assert_eq!(req.url, "http://localhost:8080/api/v1/users/avatar");
    assert_eq!(req.body, RequestBody::Multipart(file));
    assert_eq!(req.header_value("Content-Type"), None);
}

#[test]
fn test_change_password_failure_message() {
    let h = harness();
    sign_in(&h);
    h.http.push(Ok(HttpResponse::json(
        400,
        &json!({"code": 10001, "message": "原密码错误"}),
    )));
    let api = UserApi::new(h.client.clone());
    let outcome = block_on(api.change_password(&PasswordChange::default()));
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("原密码错误"));
}

// ─── Conversation / Message API Tests ────────────────────

#[test]
fn test_conversation_list_caches_items() {
    let h = harness();
    h.http.push_ok(json!({
        "records": [{"id": 1, "title": "健康咨询", "status": "ACTIVE"}],
        "total": 1
    }));
    let api = ConversationApi::new(h.client.clone(), h.storage.clone());
    let page = block_on(api.list(&ConversationQuery::default())).data.unwrap();

    assert_eq!(page.items[0].title, "健康咨询");
    assert_eq!(api.cached(), page.items);
    let req = h.http.last();
    assert!(req.query.contains(&("size".to_string(), "10".to_string())));
}

#[test]
fn test_conversation_list_by_status_uses_status_path() {
    let h = harness();
    h.http.push_ok(json!([]));
    let api = ConversationApi::new(h.client.clone(), h.storage.clone());
    let query = ConversationQuery {
        status: Some(counsel_types::conversation::ConversationStatus::Archived),
        ..ConversationQuery::default()
    };
    assert!(block_on(api.list(&query)).success);
    assert!(h.http.last().url.ends_with("/conversations/status/ARCHIVED"));
}

#[test]
fn test_conversation_archive_and_delete_paths() {
    let h = harness();
    h.http.push_ok(json!(null));
    h.http.push_ok(json!(null));
    let api = ConversationApi::new(h.client.clone(), h.storage.clone());

    assert!(block_on(api.archive(3)).success);
    assert_eq!(h.http.last().method, Method::Put);
    assert!(h.http.last().url.ends_with("/conversations/3/archive"));

    assert!(block_on(api.delete(3)).success);
    assert_eq!(h.http.last().method, Method::Delete);
}

#[test]
fn test_conversation_create_decodes_record() {
    let h = harness();
    h.http.push_ok(json!({"id": 11, "title": "新对话", "status": "ACTIVE"}));
    let api = ConversationApi::new(h.client.clone(), h.storage.clone());
    let record: ConversationRecord = block_on(api.create("新对话")).data.unwrap();
    assert_eq!(record.id, 11);
    assert_eq!(h.http.last().body, RequestBody::Json(json!({"title": "新对话"})));
}

#[test]
fn test_message_send_body() {
    let h = harness();
    h.http.push_ok(json!({"id": 4, "role": "USER", "content": "你好"}));
    let api = MessageApi::new(h.client.clone());
    let outcome = block_on(api.send(2, "你好"));
    assert_eq!(outcome.data.unwrap().id, 4);
    assert_eq!(
        h.http.last().body,
        RequestBody::Json(json!({"content": "你好", "role": "USER", "contentType": "TEXT"}))
    );
    assert!(h.http.last().url.ends_with("/conversations/2/messages"));
}

// ─── AI / System API Tests ───────────────────────────────

#[test]
fn test_ai_reply_field_priority() {
    let raw = json!({"message": "m", "content": "c"});
    assert_eq!(AiReply::from_payload(raw).unwrap().reply, "m");
    let raw = json!({"reply": "r", "message": "m"});
    assert_eq!(AiReply::from_payload(raw).unwrap().reply, "r");
    let raw = json!({"content": "c", "conversationId": 9});
    let reply = AiReply::from_payload(raw).unwrap();
    assert_eq!(reply.reply, "c");
    assert_eq!(reply.conversation_id.as_deref(), Some("9"));
}

#[test]
fn test_ai_chat_failure_outcome() {
    let h = harness();
    h.http.push(Ok(HttpResponse::json(200, &json!({"code": 99999, "message": "服务不健康"}))));
    let api = AiApi::new(h.client.clone());
    let outcome = block_on(api.chat(&ChatRequest::new("c1", "hi")));
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("服务不健康"));
}

#[test]
fn test_ai_chat_stream_types_out_reply() {
    let h = harness();
    h.http.push_ok(json!({"reply": "你好呀"}));
    let api = AiApi::new(h.client.clone());
    let stream = block_on(api.chat_stream(&ChatRequest::new("c1", "hi"))).data.unwrap();

    let chunks: Vec<_> = block_on(stream.collect::<Vec<_>>());
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["你", "你好", "你好呀"]);
    assert!(chunks.last().unwrap().is_complete);
    assert!(chunks[..2].iter().all(|c| !c.is_complete));
}

#[test]
fn test_system_health_and_version() {
    let h = harness();
    h.http.push_ok(json!({"status": "UP", "service": "backend"}));
    h.http.push_ok(json!({"version": "1.0.0"}));
    let api = SystemApi::new(h.client.clone());

    let health = block_on(api.health()).data.unwrap();
    assert!(health.healthy);
    assert_eq!(health.status, "UP");
    assert_eq!(block_on(api.version()).data.as_deref(), Some("1.0.0"));
}

#[test]
fn test_health_status_variants() {
    assert!(HealthStatus::from_payload(json!({"healthy": true})).healthy);
    assert!(HealthStatus::from_payload(json!({"status": "healthy"})).healthy);
    assert!(!HealthStatus::from_payload(json!({"status": "DOWN"})).healthy);
    assert!(!HealthStatus::from_payload(json!({})).healthy);
}

// ─── Reply Stream Tests ──────────────────────────────────

#[test]
fn test_reply_stream_waits_between_characters() {
    let timer = Rc::new(FakeTimer::default());
    let chunks = block_on(reply_stream("abc", timer.clone(), 50).collect::<Vec<_>>());
    assert_eq!(chunks.len(), 3);
    assert_eq!(*timer.sleeps.borrow(), vec![50, 50]);
}

#[test]
fn test_reply_stream_empty_text_completes_once() {
    let timer = Rc::new(FakeTimer::default());
    let chunks = block_on(reply_stream("", timer, 50).collect::<Vec<_>>());
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_complete);
    assert!(chunks[0].content.is_empty());
}

#[test]
fn test_reply_stream_drain_publishes_events() {
    let events = EventBus::new();
    let stream = ReplyStream::new("好的", Rc::new(FakeTimer::default()), 0);
    let full = block_on(stream.drain_into(&events));
    assert_eq!(full.as_deref(), Some("好的"));
    assert_eq!(
        events.drain(),
        vec![
            ClientEvent::ReplyDelta { content: "好".into() },
            ClientEvent::ReplyComplete { content: "好的".into() },
        ]
    );
}

#[test]
fn test_reply_stream_abort_stops_delivery() {
    let events = EventBus::new();
    let mut stream = ReplyStream::new("abcdef", Rc::new(FakeTimer::default()), 0);
    let first = block_on(stream.next()).unwrap();
    assert_eq!(first.content, "a");

    stream.abort_handle().abort();
    assert!(block_on(stream.next()).is_none());

    let aborted = ReplyStream::new("xyz", Rc::new(FakeTimer::default()), 0);
    aborted.abort();
    assert_eq!(block_on(aborted.drain_into(&events)), None);
    assert!(events.is_empty());
}

// ─── Responder Tests ─────────────────────────────────────

#[test]
fn test_anxiety_keyword_always_uses_anxiety_pool() {
    for seed in 0..50 {
        let responder = KeywordResponder::seeded(seed);
        for message in ["我最近很焦虑", "你好，我很焦虑", "焦虑到睡不着", "ANXIOUS 焦虑"] {
            let reply = responder.respond(message);
            assert_eq!(reply.source, Source::Category(Category::Anxiety), "{}", message);
            assert!(responder::ANXIETY.contains(&reply.text));
            assert!(!responder::GENERAL.contains(&reply.text));
        }
    }
}

#[test]
fn test_classify_categories() {
    let responder = KeywordResponder::seeded(1);
    assert_eq!(responder.classify("我和朋友吵架了"), Some(Category::Relationships));
    assert_eq!(responder.classify("晚上失眠"), Some(Category::Sleep));
    assert_eq!(responder.classify("工作压力好大"), Some(Category::Stress));
    assert_eq!(responder.classify("Hello there"), Some(Category::Greetings));
    assert_eq!(responder.classify("今天天气不错"), None);
}

#[test]
fn test_unmatched_message_uses_fallback_pools() {
    for seed in 0..20 {
        let responder = KeywordResponder::seeded(seed);
        let reply = responder.respond("今天天气不错");
        match reply.source {
            Source::General => assert!(responder::GENERAL.contains(&reply.text)),
            Source::Suggestions => assert!(responder::SUGGESTIONS.contains(&reply.text)),
            Source::Category(c) => panic!("unexpected category {:?}", c),
        }
    }
}

#[test]
fn test_jitter_stays_in_range() {
    let responder = KeywordResponder::seeded(3);
    for _ in 0..100 {
        let ms = responder.jitter(1000, 3000);
        assert!((1000..=3000).contains(&ms));
    }
    assert_eq!(responder.jitter(0, 0), 0);
}

// ─── Mock Directory / Auth Tests ─────────────────────────

#[test]
fn test_directory_login_errors() {
    let dir = MockUserDirectory::seeded();
    let err = dir.login("nobody@example.com", "x").unwrap_err();
    assert_eq!(err.message(), "用户不存在");
    let err = dir.login("admin@example.com", "wrong").unwrap_err();
    assert_eq!(err.message(), "密码错误");

    let (user, token) = dir.login("admin@example.com", "Admin123").unwrap();
    assert_eq!(user.nickname, "管理员");
    assert!(token.starts_with("mock_token_1_"));
}

#[test]
fn test_directory_validate_token() {
    let dir = MockUserDirectory::seeded();
    assert_eq!(dir.validate_token("jwt").unwrap_err().message(), "无效的token");
    assert_eq!(
        dir.validate_token("mock_token_1").unwrap_err().message(),
        "无效的token格式"
    );
    assert_eq!(
        dir.validate_token("mock_token_99_1").unwrap_err().message(),
        "用户不存在"
    );
    assert_eq!(dir.validate_token("mock_token_2_1700000000000").unwrap().id, 2);
}

#[test]
fn test_directory_update_uniqueness() {
    let dir = MockUserDirectory::seeded();
    let update = UserUpdate {
        email: Some("admin@example.com".into()),
        ..UserUpdate::default()
    };
    assert_eq!(dir.update(2, &update).unwrap_err().message(), "该邮箱已被使用");

    let update = UserUpdate {
        nickname: Some("管理员".into()),
        ..UserUpdate::default()
    };
    assert_eq!(dir.update(2, &update).unwrap_err().message(), "该昵称已被使用");

    let update = UserUpdate {
        nickname: Some("测试用户".into()),
        ..UserUpdate::default()
    };
    assert!(dir.update(2, &update).is_ok(), "keeping your own nickname is allowed");
}

#[test]
fn test_directory_change_password_and_availability() {
    let dir = MockUserDirectory::seeded();
    assert_eq!(
        dir.change_password(2, "nope", "New12345").unwrap_err().message(),
        "原密码错误"
    );
    dir.change_password(2, "Test123", "New12345").unwrap();
    assert!(dir.login("test@example.com", "New12345").is_ok());

    assert!(!dir.check_email_available("test@example.com"));
    assert!(dir.check_email_available("new@example.com"));
    assert!(!dir.check_nickname_available("测试用户"));
}

fn mock_auth(h: &Harness, dir: Rc<MockUserDirectory>) -> MockAuth {
    MockAuth::new(
        dir,
        h.session.clone(),
        h.timer.clone(),
        MockConfig::instant(),
        ClientConfig::default().token_ttl_ms,
    )
}

#[test]
fn test_mock_register_duplicate_email() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    dir.register("dup@x.com", "Secret1", "原来的").unwrap();
    let before = dir.len();

    let auth = mock_auth(&h, dir.clone());
    let req = RegisterRequest {
        email: "dup@x.com".into(),
        nickname: "n".into(),
        ..RegisterRequest::default()
    };
    let outcome = block_on(auth.register(&req));

    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("该邮箱已被注册"));
    assert_eq!(dir.len(), before);
    assert!(dir.check_nickname_available("n"));
}

#[test]
fn test_mock_register_duplicate_nickname() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    let auth = mock_auth(&h, dir.clone());
    let req = RegisterRequest {
        email: "new@x.com".into(),
        nickname: "管理员".into(),
        ..RegisterRequest::default()
    };
    let outcome = block_on(auth.register(&req));
    assert_eq!(outcome.message.as_deref(), Some("该昵称已被使用"));
    assert_eq!(dir.len(), 2);
}

#[test]
fn test_mock_register_does_not_sign_in() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    let auth = mock_auth(&h, dir.clone());
    let req = RegisterRequest {
        email: "new@x.com".into(),
        nickname: "新人".into(),
        password: "Secret1".into(),
        ..RegisterRequest::default()
    };
    let outcome = block_on(auth.register(&req));
    assert!(outcome.success);
    assert_eq!(outcome.data.unwrap().id, 3);
    assert!(!h.session.is_authenticated());
}

#[test]
fn test_mock_login_validate_logout() {
    let h = harness();
    let auth = mock_auth(&h, Rc::new(MockUserDirectory::seeded()));

    let outcome = block_on(auth.login(&LoginRequest::new("test@example.com", "Test123")));
    assert!(outcome.success);
    assert_eq!(h.session.current_user(), outcome.data);
    assert!(h.session.token().unwrap().starts_with("mock_token_2_"));

    assert_eq!(block_on(auth.validate()).data.unwrap().nickname, "测试用户");

    assert!(block_on(auth.logout()).success);
    assert!(!h.session.is_authenticated());
}

#[test]
fn test_mock_login_wrong_password() {
    let h = harness();
    let auth = mock_auth(&h, Rc::new(MockUserDirectory::seeded()));
    let outcome = block_on(auth.login(&LoginRequest::new("test@example.com", "nope")));
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("密码错误"));
    assert!(!h.session.is_authenticated());
}

#[test]
fn test_mock_profile_update_syncs_session() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    let auth = mock_auth(&h, dir.clone());
    block_on(auth.login(&LoginRequest::new("test@example.com", "Test123")));

    let profile = MockProfile::new(dir.clone(), h.session.clone(), h.timer.clone(), MockConfig::instant());
    let update = UserUpdate {
        nickname: Some("改名了".into()),
        ..UserUpdate::default()
    };
    assert!(block_on(profile.update_profile(&update)).success);
    assert_eq!(h.session.current_user().unwrap().nickname, "改名了");
    assert_eq!(dir.get(2).unwrap().nickname, "改名了");
}

#[test]
fn test_mock_upload_avatar_merges_url() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    let auth = mock_auth(&h, dir.clone());
    block_on(auth.login(&LoginRequest::new("test@example.com", "Test123")));

    let profile = MockProfile::new(dir.clone(), h.session.clone(), h.timer.clone(), MockConfig::instant());
    let file = FilePart {
        field: "file".into(),
        file_name: "me.png".into(),
        mime: "image/png".into(),
        bytes: vec![1, 2, 3],
    };
    let outcome = block_on(profile.upload_avatar(file));

    assert!(outcome.success);
    let url = outcome.data.unwrap();
    assert!(url.starts_with("/uploads/avatars/mock_2_"));
    assert!(url.ends_with("me.png"));
    assert_eq!(h.session.current_user().unwrap().avatar_url, url);
    assert_eq!(dir.get(2).unwrap().avatar_url, url);
}

#[test]
fn test_mock_upload_avatar_requires_login() {
    let h = harness();
    let dir = Rc::new(MockUserDirectory::seeded());
    let profile = MockProfile::new(dir, h.session.clone(), h.timer.clone(), MockConfig::instant());
    let file = FilePart {
        field: "file".into(),
        file_name: "me.png".into(),
        mime: "image/png".into(),
        bytes: Vec::new(),
    };
    let outcome = block_on(profile.upload_avatar(file));
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("用户未登录"));
}

#[test]
fn test_mock_login_with_huge_ttl_does_not_expire() {
    let h = harness();
    let auth = MockAuth::new(
        Rc::new(MockUserDirectory::seeded()),
        h.session.clone(),
        h.timer.clone(),
        MockConfig::instant(),
        u64::MAX,
    );
    assert!(block_on(auth.login(&LoginRequest::new("test@example.com", "Test123"))).success);
    assert!(!h.session.check_expiry(Utc::now() + Duration::days(36_500)));
}

// ─── Mock Chat Tests ─────────────────────────────────────

fn chat_service(h: &Harness, config: MockConfig) -> MockChatService {
    MockChatService::new(h.storage.clone(), h.timer.clone(), h.events.clone(), config)
        .with_responder(KeywordResponder::seeded(42))
}

#[test]
fn test_mock_chat_create_newest_first() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let first = block_on(chat.create(None)).data.unwrap();
    let second = block_on(chat.create(Some("睡眠问题"))).data.unwrap();

    assert_eq!(first.title, DEFAULT_TITLE);
    let list = block_on(chat.list()).data.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, second.id);
    assert_eq!(list[1].id, first.id);
    assert!(h.storage.raw(keys::CONVERSATIONS).is_some());
}

#[test]
fn test_mock_chat_send_appends_and_retitles() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let conversation = block_on(chat.create(None)).data.unwrap();

    let long = "最近工作上的事情让我整晚都睡不好觉，怎么办才好呢";
    let exchange = block_on(chat.send_message(&conversation.id, long)).data.unwrap();
    assert_eq!(exchange.user_message.role, Role::User);
    assert_eq!(exchange.ai_message.role, Role::Assistant);

    block_on(chat.send_message(&conversation.id, "第二条")).data.unwrap();

    let stored = block_on(chat.get(&conversation.id)).data.unwrap();
    assert_eq!(stored.messages.len(), 4);
    assert_eq!(stored.messages[0].content, long);
    assert_eq!(stored.messages[2].content, "第二条");
    let expected: String = long.chars().take(20).collect::<String>() + "...";
    assert_eq!(stored.title, expected);
}

#[test]
fn test_mock_chat_short_first_message_is_title() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let conversation = block_on(chat.create(None)).data.unwrap();
    block_on(chat.send_message(&conversation.id, "你好"));
    assert_eq!(block_on(chat.get(&conversation.id)).data.unwrap().title, "你好");
}

#[test]
fn test_mock_chat_reply_delay_in_range() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::default());
    let conversation = block_on(chat.create(None)).data.unwrap();
    h.timer.sleeps.borrow_mut().clear();

    block_on(chat.send_message(&conversation.id, "你好"));
    let sleeps = h.timer.sleeps.borrow();
    assert_eq!(sleeps.len(), 2);
    assert_eq!(sleeps[0], 100);
    assert!((1000..=3000).contains(&sleeps[1]));
}

#[test]
fn test_mock_chat_unknown_conversation() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let outcome = block_on(chat.send_message("missing", "hi"));
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("对话不存在"));
    assert_eq!(
        block_on(chat.get("missing")).message.as_deref(),
        Some("对话不存在")
    );
}

#[test]
fn test_mock_chat_rejects_blank_message() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let conversation = block_on(chat.create(None)).data.unwrap();
    let outcome = block_on(chat.send_message(&conversation.id, "   "));
    assert_eq!(outcome.error.unwrap().kind(), ErrorKind::Validation);
}

#[test]
fn test_mock_chat_delete_clear_and_current() {
    let h = harness();
    let chat = chat_service(&h, MockConfig::instant());
    let a = block_on(chat.create(None)).data.unwrap();
    let b = block_on(chat.create(None)).data.unwrap();

    chat.set_current(Some(a.id.as_str()));
    assert_eq!(chat.current().as_deref(), Some(a.id.as_str()));

    assert_eq!(block_on(chat.delete(&a.id)).data, Some(true));
    assert_eq!(block_on(chat.delete(&a.id)).data, Some(false));
    assert_eq!(chat.current(), None);

    let list = block_on(chat.list()).data.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, b.id);

    assert!(block_on(chat.clear_all()).success);
    assert!(block_on(chat.list()).data.unwrap().is_empty());
    assert!(h.events.drain().contains(&ClientEvent::ConversationsChanged));
}

// ─── Route Guard Tests ───────────────────────────────────

#[test]
fn test_guard_redirects_to_login_with_original_path() {
    let routes = RouteTable::default();
    assert_eq!(
        routes.guard("/profile", false),
        Navigation::Redirect {
            to: "/login?redirect=/profile".into()
        }
    );
    assert_eq!(
        routes.guard("/ai-assistant", false),
        Navigation::Redirect {
            to: "/login?redirect=/ai-assistant".into()
        }
    );
}

#[test]
fn test_guard_keeps_query_in_redirect() {
    let routes = RouteTable::default();
    assert_eq!(
        routes.guard("/profile?tab=security", false),
        Navigation::Redirect {
            to: "/login?redirect=/profile?tab%3Dsecurity".into()
        }
    );
}

#[test]
fn test_guard_sends_signed_in_user_home_from_guest_pages() {
    let routes = RouteTable::default();
    let home = Navigation::Redirect { to: "/".into() };
    assert_eq!(routes.guard("/login", true), home);
    assert_eq!(routes.guard("/register?from=nav", true), home);
}

#[test]
fn test_guard_proceeds_otherwise() {
    let routes = RouteTable::default();
    assert_eq!(routes.guard("/profile", true), Navigation::Proceed);
    assert_eq!(routes.guard("/login", false), Navigation::Proceed);
    assert_eq!(routes.guard("/", false), Navigation::Proceed);
    assert_eq!(routes.guard("/nowhere", false), Navigation::Proceed);
}

#[test]
fn test_post_login_target() {
    assert_eq!(post_login_target(Some("/profile")), "/profile");
    assert_eq!(post_login_target(None), "/");
    assert_eq!(post_login_target(Some("//evil.example")), "/");
    assert_eq!(post_login_target(Some("https://evil.example")), "/");
}

// ─── Validation Tests ────────────────────────────────────

fn field_of(result: Result<()>) -> String {
    match result.unwrap_err() {
        ClientError::Validation { field, .. } => field,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_validate_email() {
    assert!(validate_email("a@b.co").is_ok());
    assert_eq!(validate_email("").unwrap_err().message(), "请输入邮箱");
    assert_eq!(validate_email("a@b").unwrap_err().message(), "请输入有效的邮箱地址");
    assert_eq!(field_of(validate_email("x")), "email");
}

#[test]
fn test_validate_password() {
    assert!(validate_password("Admin123").is_ok());
    assert_eq!(validate_password("Ab1").unwrap_err().message(), "密码长度不能少于6位");
    assert_eq!(
        validate_password("Abcdefghij1234567890x").unwrap_err().message(),
        "密码长度不能超过20位"
    );
    assert_eq!(
        validate_password("admin123").unwrap_err().message(),
        "密码必须包含大小写字母和数字"
    );
}

#[test]
fn test_validate_nickname() {
    assert!(validate_nickname("小明_01").is_ok());
    assert_eq!(validate_nickname("a").unwrap_err().message(), "昵称长度不能少于2位");
    assert_eq!(
        validate_nickname("bad name").unwrap_err().message(),
        "昵称只能包含中文、英文、数字和下划线"
    );
}

#[test]
fn test_validate_phone_code_required() {
    assert!(validate_phone("13812345678").is_ok());
    assert!(validate_phone("12812345678").is_err());
    assert!(validate_code("123456").is_ok());
    assert_eq!(validate_code("12345").unwrap_err().message(), "验证码必须是6位数字");
    assert_eq!(
        validate_required("title", "  ", None).unwrap_err().message(),
        "此项为必填项"
    );
}

#[test]
fn test_register_request_validate() {
    let mut req = RegisterRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password: "Secret123".into(),
        confirm_password: "Secret123".into(),
        nickname: "阿丽".into(),
    };
    assert!(req.validate().is_ok());

    req.confirm_password = "Secret124".into();
    assert_eq!(field_of(req.validate()), "confirmPassword");

    req.nickname = "n".into();
    assert_eq!(field_of(req.validate()), "nickname");
}

#[test]
fn test_password_change_validate() {
    let change = PasswordChange {
        old_password: "Old12345".into(),
        new_password: "weak".into(),
        confirm_password: "weak".into(),
    };
    assert_eq!(field_of(change.validate()), "newPassword");
    assert!(LoginRequest::new("", "x").validate().is_err());
}

// ─── AppContext Tests ────────────────────────────────────

fn mock_context(storage: Rc<MemStore>) -> AppContext {
    let config = ClientConfig {
        backend: BackendMode::Mock,
        mock: MockConfig::instant(),
        ..ClientConfig::default()
    };
    AppContext::init(
        config,
        Rc::new(FakeHttp::default()),
        storage,
        Rc::new(FakeTimer::default()),
    )
}

#[test]
fn test_context_mock_mode_full_flow() {
    let storage = Rc::new(MemStore::default());
    let ctx = mock_context(storage.clone());
    assert_eq!(ctx.auth.name(), "mock");
    assert!(ctx.mock.is_some());

    assert_eq!(
        ctx.navigate("/profile"),
        Navigation::Redirect {
            to: "/login?redirect=/profile".into()
        }
    );

    let outcome = block_on(ctx.auth.login(&LoginRequest::new("admin@example.com", "Admin123")));
    assert!(outcome.success);
    assert_eq!(ctx.navigate("/profile"), Navigation::Proceed);

    // A second context over the same storage picks the session back up.
    let reloaded = mock_context(storage);
    assert!(reloaded.session.is_authenticated());
    assert_eq!(reloaded.session.current_user().unwrap().nickname, "管理员");

    let events = reloaded.teardown();
    assert!(events.contains(&ClientEvent::LoggedOut));
    assert!(!reloaded.session.is_authenticated());
}

#[test]
fn test_context_remote_mode_by_default() {
    let ctx = AppContext::init(
        ClientConfig::default(),
        Rc::new(FakeHttp::default()),
        Rc::new(MemStore::default()),
        Rc::new(FakeTimer::default()),
    );
    assert_eq!(ctx.auth.name(), "remote");
    assert!(ctx.mock.is_none());
    assert_eq!(
        ctx.events.drain(),
        vec![ClientEvent::Restored { authenticated: false }]
    );
}

#[test]
fn test_context_prefers_saved_config() {
    let storage = Rc::new(MemStore::default());
    let first = AppContext::init(
        ClientConfig::default(),
        Rc::new(FakeHttp::default()),
        storage.clone(),
        Rc::new(FakeTimer::default()),
    );
    let saved = ClientConfig {
        backend: BackendMode::Mock,
        api_base_url: "https://api.example.com".into(),
        ..ClientConfig::default()
    };
    first.save_config(&saved).unwrap();

    let second = AppContext::init(
        ClientConfig::default(),
        Rc::new(FakeHttp::default()),
        storage,
        Rc::new(FakeTimer::default()),
    );
    assert_eq!(second.config, saved);
    assert_eq!(second.auth.name(), "mock");
}
