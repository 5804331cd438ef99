use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Coarse classification of a [`ClientError`], for callers that only branch
/// on the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No response reached us (offline, DNS, CORS, timeout)
    Transport,
    /// The server answered with a 4xx/5xx status
    HttpStatus,
    /// 2xx transport, non-zero application code
    Business,
    /// Rejected on the client before any request was sent
    Validation,
    Storage,
    Serialization,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClientError {
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("Timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: u16,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    #[error("{message} (code {code})")]
    Business {
        code: i64,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport { message: message.into() }
    }

    pub fn business(code: i64, message: impl Into<String>) -> Self {
        ClientError::Business {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ClientError::Storage { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport { .. } | ClientError::Timeout { .. } => ErrorKind::Transport,
            ClientError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ClientError::Business { .. } => ErrorKind::Business,
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::Storage { .. } => ErrorKind::Storage,
            ClientError::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ClientError::Business { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to the user.
    pub fn message(&self) -> String {
        match self {
            ClientError::Transport { message }
            | ClientError::HttpStatus { message, .. }
            | ClientError::Business { message, .. }
            | ClientError::Validation { message, .. }
            | ClientError::Storage { message }
            | ClientError::Serialization { message } => message.clone(),
            ClientError::Timeout { ms } => format!("请求超时（{}ms）", ms),
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            ClientError::HttpStatus { details, .. } | ClientError::Business { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization { message: e.to_string() }
    }
}
