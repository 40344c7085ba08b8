//! HTTP implementation of the gateway over the backend's JSON surface.
//!
//! The backend answers option endpoints with HTTP 200 and either
//! `{ "result", "timestamp" }` or `{ "error" }`, so payload errors have to be
//! detected in the body, not the status line.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ControlIntent, Gateway, MetricReading, OptionOp};
use crate::error::{HedgewatchError, Result};

#[derive(Debug, Deserialize)]
struct OptionEnvelope {
    result: Option<Value>,
    timestamp: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolbarEnvelope {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent("hedgewatch/0.1")
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                HedgewatchError::Internal(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport(e: reqwest::Error) -> HedgewatchError {
    if e.is_timeout() {
        HedgewatchError::Transport(format!("request timed out: {}", e))
    } else {
        HedgewatchError::Transport(e.to_string())
    }
}

/// The backend pre-formats numeric results as strings; anything else is
/// rendered compactly.
fn render_result(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_trades(&self) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(self.url("/trades"))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HedgewatchError::Transport(format!("HTTP status {}", status)));
        }

        let body: Value = response.json().await.map_err(transport)?;
        match body {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "fetched trade feed");
                Ok(rows)
            }
            Value::Object(map) => {
                let reason = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unexpected trades payload")
                    .to_string();
                Err(HedgewatchError::Remote(reason))
            }
            _ => Err(HedgewatchError::Transport(
                "unexpected trades payload shape".to_string(),
            )),
        }
    }

    async fn call_option(&self, op: OptionOp) -> Result<MetricReading> {
        let url = self.url(op.path());
        let request = if op.is_post() {
            self.http.post(&url)
        } else {
            self.http.get(&url)
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HedgewatchError::Transport(format!("HTTP status {}", status)));
        }

        let envelope: OptionEnvelope = response.json().await.map_err(transport)?;
        if let Some(error) = envelope.error {
            return Err(HedgewatchError::Remote(error));
        }

        match envelope.result {
            Some(result) => Ok(MetricReading {
                value: render_result(result),
                reported_at: envelope.timestamp.unwrap_or_default(),
            }),
            None => Err(HedgewatchError::Transport(format!(
                "{}: response carried neither result nor error",
                op.path()
            ))),
        }
    }

    async fn send_control(&self, intent: ControlIntent) -> Result<String> {
        let response = self
            .http
            .post(self.url(intent.path()))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HedgewatchError::Transport(format!("HTTP status {}", status)));
        }

        let envelope: ToolbarEnvelope = response.json().await.map_err(transport)?;
        if let Some(error) = envelope.error {
            return Err(HedgewatchError::Remote(error));
        }

        envelope.message.ok_or_else(|| {
            HedgewatchError::Transport(format!(
                "{}: response carried neither message nor error",
                intent.path()
            ))
        })
    }
}
