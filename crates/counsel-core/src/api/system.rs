use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use counsel_types::{Outcome, Result};

use crate::http::ApiClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub healthy: bool,
    pub raw: Value,
}

impl HealthStatus {
    /// `UP` and `healthy` statuses count as healthy, as does `healthy: true`.
    pub fn from_payload(raw: Value) -> Self {
        let reported = raw.get("status").and_then(Value::as_str);
        let healthy = matches!(reported, Some(s) if s.eq_ignore_ascii_case("up") || s == "healthy")
            || raw.get("healthy").and_then(Value::as_bool) == Some(true);
        Self {
            status: reported.unwrap_or(if healthy { "healthy" } else { "unknown" }).to_string(),
            healthy,
            raw,
        }
    }
}

pub struct SystemApi {
    client: Rc<ApiClient>,
}

impl SystemApi {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn health(&self) -> Outcome<HealthStatus> {
        let result = self.client.get("health", &[]).await.map(HealthStatus::from_payload);
        Outcome::from_result(result, "", "健康检查失败")
    }

    pub async fn version(&self) -> Outcome<String> {
        let result: Result<String> = self.client.get("health/version", &[]).await.map(|payload| {
            match payload.get("version").and_then(Value::as_str) {
                Some(version) => version.to_string(),
                None => match payload {
                    Value::String(version) => version,
                    other => other.to_string(),
                },
            }
        });
        Outcome::from_result(result, "", "获取系统版本信息失败")
    }
}
