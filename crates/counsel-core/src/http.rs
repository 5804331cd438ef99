//! HTTP client adapter: the one place a request is shaped, sent and its
//! response normalised.
//!
//! - `Authorization` is attached whenever the session holds a token.
//! - A 2xx envelope with code `0` resolves to its `data` (or the whole body
//!   when `data` is absent); any other code is a `Business` error.
//! - A 401 tears the session down before the error is returned.
//! - Every failure is logged. Nothing is retried.

use std::rc::Rc;

use futures::future::{self, Either};
use serde::de::DeserializeOwned;
use serde_json::Value;

use counsel_types::{
    ClientError, Result,
    config::ClientConfig,
    envelope::Envelope,
};

use crate::ports::{FilePart, HttpPort, HttpRequest, HttpResponse, Method, RequestBody, TimerPort};
use crate::session::SessionStore;

pub const NETWORK_ERROR: &str = "网络错误，请检查网络连接";

/// Message used when an error response carries none of its own.
pub fn default_status_message(status: u16) -> &'static str {
    match status {
        400 => "请求参数错误",
        401 => "未授权，请重新登录",
        403 => "访问被拒绝",
        404 => "请求的资源不存在",
        409 => "资源冲突",
        500 => "服务器内部错误",
        _ => "请求失败",
    }
}

pub struct ApiClient {
    config: ClientConfig,
    http: Rc<dyn HttpPort>,
    timer: Rc<dyn TimerPort>,
    session: Rc<SessionStore>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        http: Rc<dyn HttpPort>,
        timer: Rc<dyn TimerPort>,
        session: Rc<SessionStore>,
    ) -> Self {
        Self {
            config,
            http,
            timer,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Rc<SessionStore> {
        &self.session
    }

    pub fn timer(&self) -> &Rc<dyn TimerPort> {
        &self.timer
    }

    // ─── REST prefix ─────────────────────────────────────────

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut req = HttpRequest::new(Method::Get, self.config.api_url(path));
        for (name, value) in query {
            req = req.query(*name, value.clone());
        }
        self.execute(req).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        self.execute(with_json(
            HttpRequest::new(Method::Post, self.config.api_url(path)),
            body,
        ))
        .await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Value> {
        self.execute(with_json(
            HttpRequest::new(Method::Put, self.config.api_url(path)),
            body,
        ))
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.execute(HttpRequest::new(Method::Delete, self.config.api_url(path)))
            .await
    }

    /// `multipart/form-data` POST with a single file part.
    pub async fn upload(&self, path: &str, file: FilePart) -> Result<Value> {
        let req = HttpRequest::new(Method::Post, self.config.api_url(path))
            .body(RequestBody::Multipart(file));
        self.execute(req).await
    }

    // ─── AI prefix ───────────────────────────────────────────

    pub async fn ai_get(&self, path: &str) -> Result<Value> {
        self.execute(HttpRequest::new(Method::Get, self.config.ai_url(path)))
            .await
    }

    pub async fn ai_post(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(with_json(
            HttpRequest::new(Method::Post, self.config.ai_url(path)),
            Some(body),
        ))
        .await
    }

    // ─── Core ────────────────────────────────────────────────

    /// Send a fully built request through the adapter pipeline.
    pub async fn execute(&self, req: HttpRequest) -> Result<Value> {
        let req = self.decorate(req);
        let label = format!("{} {}", req.method, req.url);
        log::debug!("→ {}", label);

        let response = match self.send_with_timeout(req).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("{} failed: {}", label, e);
                return Err(match e {
                    ClientError::Transport { .. } => ClientError::transport(NETWORK_ERROR),
                    other => other,
                });
            }
        };

        log::debug!("← {} {}", response.status, label);
        self.normalize(&label, response)
    }

    fn decorate(&self, mut req: HttpRequest) -> HttpRequest {
        if req.header_value("Accept").is_none() {
            req = req.header("Accept", "application/json");
        }
        if matches!(req.body, RequestBody::Json(_)) && req.header_value("Content-Type").is_none() {
            req = req.header("Content-Type", "application/json");
        }
        if let Some(auth) = self.session.authorization() {
            req = req.header("Authorization", auth);
        }
        req
    }

    async fn send_with_timeout(&self, req: HttpRequest) -> Result<HttpResponse> {
        let ms = self.config.timeout_ms;
        if ms == 0 {
            return self.http.send(req).await;
        }

        let send = self.http.send(req);
        let deadline = self.timer.sleep(ms);
        match future::select(send, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(ClientError::Timeout { ms }),
        }
    }

    fn normalize(&self, label: &str, response: HttpResponse) -> Result<Value> {
        let parsed = response.parsed();

        if response.is_success() {
            let body = match parsed {
                Some(body) => body,
                None if response.body.trim().is_empty() => Value::Null,
                None => Value::String(response.body),
            };
            return match Envelope::sniff(&body) {
                Some(envelope) if envelope.is_success() => Ok(envelope.data.unwrap_or(body)),
                Some(envelope) => {
                    let message = envelope
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| default_status_message(0).to_string());
                    log::warn!("{} rejected with code {}: {}", label, envelope.code, message);
                    Err(ClientError::Business {
                        code: envelope.code,
                        message,
                        details: envelope.details,
                    })
                }
                None => Ok(body),
            };
        }

        let status = response.status;
        if status == 401 {
            log::warn!("{} returned 401, ending session", label);
            self.session.expire();
        }

        let message = parsed
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_status_message(status).to_string());
        let details = parsed.and_then(|mut body| body.get_mut("details").map(Value::take));

        log::error!("{} failed with HTTP {}: {}", label, status, message);
        Err(ClientError::HttpStatus {
            status,
            message,
            details,
        })
    }
}

fn with_json(req: HttpRequest, body: Option<Value>) -> HttpRequest {
    match body {
        Some(body) => req.body(RequestBody::Json(body)),
        None => req,
    }
}

/// Deserialize a normalised payload into a typed value.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
    Ok(serde_json::from_value(payload)?)
}
