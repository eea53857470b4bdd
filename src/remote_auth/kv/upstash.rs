use super::retry::{RetryConfig, retry_transient};
use super::{KvBackend, KvResult};
use crate::error::SessionStoreError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const BACKEND: &str = "upstash";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Upstash Redis over its REST protocol: every command is a JSON array
/// `POST`ed to the database URL, answered with `{"result": ...}` or
/// `{"error": "..."}`.
pub struct UpstashRestBackend {
    base_url: String,
    /// Pre-computed `"Bearer <token>"` header value.
    auth_header: String,
    client: Client,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

impl UpstashRestBackend {
    pub fn new(base_url: &str, token: &str, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {token}"),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout.min(Duration::from_secs(10)))
                .pool_max_idle_per_host(4)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            retry,
        }
    }

    fn connectivity(op: &str, message: impl Into<String>) -> SessionStoreError {
        SessionStoreError::Connectivity {
            backend: BACKEND.into(),
            op: op.into(),
            message: message.into(),
        }
    }

    fn rejected(op: &str, message: impl Into<String>) -> SessionStoreError {
        SessionStoreError::Backend {
            backend: BACKEND.into(),
            op: op.into(),
            message: message.into(),
        }
    }

    async fn command(&self, op: &str, args: &[&str]) -> KvResult<Value> {
        retry_transient(&self.retry, op, BACKEND, || self.command_once(op, args)).await
    }

    async fn command_once(&self, op: &str, args: &[&str]) -> KvResult<Value> {
        let mut body = Vec::with_capacity(args.len() + 1);
        body.push(op);
        body.extend_from_slice(args);

        let resp = self
            .client
            .post(&self.base_url)
            .header(AUTHORIZATION, &self.auth_header)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::connectivity(op, e.to_string()))?;

        let status = resp.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SessionStoreError::Auth {
                backend: BACKEND.into(),
                status: status.as_u16(),
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Self::connectivity(op, e.to_string()))?;

        if status.is_server_error()
            || matches!(
                status,
                StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
            )
        {
            return Err(Self::connectivity(
                op,
                format!("HTTP {status}: {}", truncate_body(&text)),
            ));
        }

        let reply: Reply = serde_json::from_str(&text).map_err(|e| {
            Self::rejected(
                op,
                format!(
                    "HTTP {status}: unparseable reply ({e}): {}",
                    truncate_body(&text)
                ),
            )
        })?;

        if let Some(error) = reply.error {
            return Err(Self::rejected(op, error));
        }
        if !status.is_success() {
            return Err(Self::rejected(op, format!("HTTP {status}")));
        }

        Ok(reply.result)
    }

    fn expect_count(op: &str, value: &Value) -> KvResult<u64> {
        value
            .as_u64()
            .ok_or_else(|| Self::rejected(op, format!("expected integer reply, got {value}")))
    }
}

#[async_trait]
impl KvBackend for UpstashRestBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        match self.command("GET", &[key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(Self::rejected("GET", format!("expected string reply, got {other}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.command("SET", &[key, value]).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let args: Vec<&str> = keys.iter().map(String::as_str).collect();
        let value = self.command("DEL", &args).await?;
        Self::expect_count("DEL", &value)
    }

    async fn exists(&self, keys: &[String]) -> KvResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let args: Vec<&str> = keys.iter().map(String::as_str).collect();
        let value = self.command("EXISTS", &args).await?;
        Self::expect_count("EXISTS", &value)
    }

    async fn keys(&self, pattern: &str) -> KvResult<Option<Vec<String>>> {
        match self.command("KEYS", &[pattern]).await? {
            Value::Array(items) => Ok(Some(
                items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(ToOwned::to_owned))
                    .collect(),
            )),
            other => Err(Self::rejected("KEYS", format!("expected array reply, got {other}"))),
        }
    }

    async fn ping(&self) -> KvResult<()> {
        match self.command("PING", &[]).await? {
            Value::String(s) if s.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(Self::rejected("PING", format!("unexpected reply {other}"))),
        }
    }
}
