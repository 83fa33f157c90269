//! Rename Executor
//!
//! TigerStyle: One POST to NapCat's `set_group_name`, no retries.
//!
//! Success is exactly `HTTP 200` with a JSON body where `status == "ok"` and
//! `retcode == 0`. Everything else is a failure of one of three kinds.

use crate::config::RenameApiConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Request body expected by NapCat
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetGroupNameRequest {
    pub group_id: String,
    pub group_name: String,
}

/// Why the rename call failed
#[derive(Debug, thiserror::Error)]
pub enum RenameApiError {
    /// Connection failure, timeout, or a 200 body that is not JSON
    #[error("Napcat API请求异常: {0}")]
    Transport(String),

    #[error("Napcat API请求失败: HTTP {status}")]
    Http { status: u16 },

    /// 200 but the body did not report success
    #[error("Napcat API返回失败: {body}")]
    Rejected { body: serde_json::Value },
}

/// Performs the actual group rename
#[async_trait]
pub trait GroupRenamer: Send + Sync {
    async fn set_group_name(&self, group_id: &str, group_name: &str)
        -> Result<(), RenameApiError>;
}

/// `true` iff the body reports `status == "ok"` and `retcode == 0`
pub fn is_success_body(body: &serde_json::Value) -> bool {
    let status_ok = body.get("status").and_then(|v| v.as_str()) == Some("ok");
    let retcode_zero = body
        .get("retcode")
        .and_then(|v| v.as_f64())
        .map(|code| code == 0.0)
        .unwrap_or(false);
    status_ok && retcode_zero
}

// =============================================================================
// NapCat Client
// =============================================================================

/// `GroupRenamer` backed by the NapCat HTTP API
#[derive(Debug, Clone)]
pub struct NapcatClient {
    url: String,
    client: reqwest::Client,
}

impl NapcatClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RenameApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RenameApiError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn from_config(config: &RenameApiConfig) -> Result<Self, RenameApiError> {
        Self::new(config.url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GroupRenamer for NapcatClient {
    async fn set_group_name(
        &self,
        group_id: &str,
        group_name: &str,
    ) -> Result<(), RenameApiError> {
        let payload = SetGroupNameRequest {
            group_id: group_id.to_string(),
            group_name: group_name.to_string(),
        };

        tracing::info!(url = %self.url, ?payload, "Napcat set_group_name request");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RenameApiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RenameApiError::Transport(e.to_string()))?;

        tracing::info!(status = status.as_u16(), body = %text, "Napcat set_group_name response");

        if status != reqwest::StatusCode::OK {
            return Err(RenameApiError::Http {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| RenameApiError::Transport(format!("invalid JSON response: {}", e)))?;

        if !is_success_body(&body) {
            return Err(RenameApiError::Rejected { body });
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
