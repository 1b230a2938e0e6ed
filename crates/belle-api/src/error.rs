// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Failure taxonomy for calls against the salon API.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server could not be reached or the connection broke.
    #[error("cannot reach {base_url}: {source}")]
    Transport {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status. The message is the server's `detail` when
    /// it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A success response whose body did not have the expected shape.
    #[error("unexpected {what} response: {detail}")]
    Decode { what: &'static str, detail: String },

    #[error("invalid API url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = server_detail(body)
            .unwrap_or_else(|| format!("request failed with HTTP status {}", status.as_u16()));
        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    pub(crate) fn decode(what: &'static str, detail: impl ToString) -> Self {
        Self::Decode {
            what,
            detail: detail.to_string(),
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    detail: Option<Value>,
}

/// Extracts `detail` from an error body. FastAPI sends a string for
/// handled errors and a list of `{loc, msg}` objects for validation errors.
fn server_detail(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let message = match envelope.detail? {
        Value::String(text) => text,
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use reqwest::StatusCode;

    #[test]
    fn status_error_displays_server_detail() {
        let error = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Incorrect username or password"}"#,
        );
        assert_eq!(error.to_string(), "Incorrect username or password");
        assert_eq!(error.status(), Some(401));
    }

    #[test]
    fn status_error_falls_back_to_generic_message() {
        for body in ["", "<html>bad gateway</html>", r#"{"detail":""}"#, r#"{"other":1}"#] {
            let error = ApiError::from_status(StatusCode::BAD_GATEWAY, body);
            assert_eq!(
                error.to_string(),
                "request failed with HTTP status 502",
                "body {body:?}"
            );
        }
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"},{"loc":["body","password"],"msg":"field required"}]}"#;
        let error = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            error.to_string(),
            "value is not a valid email address; field required"
        );
    }
}
