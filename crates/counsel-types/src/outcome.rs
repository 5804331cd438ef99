//! Uniform result shape handed across the domain API boundary.
//!
//! Domain modules never return `Err`; every failure is folded into an
//! `Outcome` with `success: false` so the UI has one shape to branch on.

use serde::Serialize;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClientError>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_with(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn fail(error: ClientError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(error.message()),
            error: Some(error),
        }
    }

    /// Failure with a caller-chosen message when the error carries none.
    pub fn fail_or(error: ClientError, fallback: &str) -> Self {
        let mut outcome = Self::fail(error);
        if outcome.message.as_deref().map_or(true, str::is_empty) {
            outcome.message = Some(fallback.to_string());
        }
        outcome
    }

    pub fn from_result(result: Result<T, ClientError>, success_message: &str, failure_message: &str) -> Self {
        match result {
            Ok(data) if success_message.is_empty() => Self::ok(data),
            Ok(data) => Self::ok_with(data, success_message),
            Err(e) => Self::fail_or(e, failure_message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
        }
    }

    pub fn into_result(self) -> Result<T, ClientError> {
        match (self.data, self.error) {
            (Some(data), None) if self.success => Ok(data),
            (_, Some(e)) => Err(e),
            (_, None) => Err(ClientError::Business {
                code: crate::envelope::codes::GENERIC,
                message: self.message.unwrap_or_default(),
                details: None,
            }),
        }
    }
}

impl<T> From<Result<T, ClientError>> for Outcome<T> {
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e),
        }
    }
}
