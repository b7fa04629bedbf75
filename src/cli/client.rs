use std::time::Duration;

use anyhow::Context;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cli::config::{load_environment_config, EnvironmentConfig};

/// Thin JSON client for the Rezollo API that unwraps the response envelope
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &EnvironmentConfig) -> anyhow::Result<Self> {
        Self::new(config.server_url(), config.token.clone())
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_config(&load_environment_config()?)
    }

    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn get_query<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> anyhow::Result<Value> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    /// Send and unwrap `{ success, data }`; failures become errors carrying
    /// the server's message and code.
    pub async fn send(&self, request: RequestBuilder) -> anyhow::Result<Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.base_url))?;
        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("server answered {} with a non-JSON body", status))?;
        unwrap_envelope(status.as_u16(), body)
    }
}

/// Error envelope returned by the server, kept typed so callers can branch
/// on the status without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({}HTTP {status})", .code.as_deref().map(|c| format!("{}, ", c)).unwrap_or_default())]
pub struct ApiFailure {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl ApiFailure {
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

/// True when `err` is a 409 answered by the server.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiFailure>().is_some_and(ApiFailure::is_conflict)
}

pub fn unwrap_envelope(status: u16, body: Value) -> anyhow::Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body.get("data").cloned().unwrap_or(Value::Null));
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    let code = body.get("code").and_then(Value::as_str).map(str::to_string);
    Err(ApiFailure { status, code, message }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_yields_data() {
        let data = unwrap_envelope(200, json!({ "success": true, "data": { "id": 1 } })).unwrap();
        assert_eq!(data, json!({ "id": 1 }));
    }

    #[test]
    fn error_envelope_yields_message_and_code() {
        let err = unwrap_envelope(409, json!({ "success": false, "error": "Duplicate", "code": "CONFLICT" }))
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate (CONFLICT, HTTP 409)");
        assert!(is_conflict(&err));
    }

    #[test]
    fn error_without_code_keeps_status() {
        let err = unwrap_envelope(500, json!({ "success": false, "error": "Boom" })).unwrap_err();
        assert_eq!(err.to_string(), "Boom (HTTP 500)");
        assert!(!is_conflict(&err));
        assert_eq!(err.downcast_ref::<ApiFailure>().map(|f| f.status), Some(500));
    }
}
