use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Header the server reads the tenant from (server default)
pub const TENANT_HEADER: &str = "tenantId";

/// Thin reqwest wrapper that speaks the `{success, data}` / `{error, code}` envelopes
pub struct ApiClient {
    base_url: url::Url,
    token: Option<String>,
    tenant: Option<i32>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>, tenant: Option<i32>) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            token,
            tenant,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.send(Method::GET, path, None::<&()>, &[]).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        self.send(Method::GET, path, None::<&()>, query).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.send(Method::PUT, path, Some(body), &[]).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> anyhow::Result<Value> {
        let url = self.base_url.join(path).with_context(|| format!("invalid API path '{}'", path))?;

        let mut request = self.http.request(method, url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(tenant) = self.tenant {
            request = request.header(TENANT_HEADER, tenant.to_string());
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status();
        let text = response.text().await.context("failed to read response body")?;
        let payload: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        unwrap_envelope(status, payload)
    }
}

/// Return `data` from a success envelope, or turn an error envelope into an error
pub fn unwrap_envelope(status: StatusCode, payload: Value) -> anyhow::Result<Value> {
    if status.is_success() {
        return Ok(match payload {
            Value::Object(mut map) if map.get("success") == Some(&Value::Bool(true)) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        });
    }

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.as_str().map(str::to_string).unwrap_or_else(|| payload.to_string()));
    match payload.get("code").and_then(Value::as_str) {
        Some(code) => Err(anyhow!("{} ({}, HTTP {})", message, code, status.as_u16())),
        None => Err(anyhow!("{} (HTTP {})", message, status.as_u16())),
    }
}
