//! 流式图 HTTP 下游
//!
//! 把每帧负载 POST 到 `<server>/workspace0?operation=updateGraph`。
//! 稳态运行中的网络故障不终止播放：重试 `max_retries` 次后丢弃该帧并计数。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cg_core::{CographError, Result};

use super::Sink;
use crate::event::EventBuffer;

/// HTTP 下游配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSinkConfig {
    /// 服务器地址，例如 `http://localhost:8080`
    pub server: String,
    /// 工作区路径
    pub workspace: String,
    /// 单帧最大重试次数
    pub max_retries: u32,
    /// 重试间隔 (毫秒)
    pub retry_delay_ms: u64,
    /// 单次请求超时 (毫秒)
    pub timeout_ms: u64,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            workspace: "workspace0".to_string(),
            max_retries: 2,
            retry_delay_ms: 200,
            timeout_ms: 5_000,
        }
    }
}

impl HttpSinkConfig {
    /// 完整的推送地址
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}?operation=updateGraph",
            self.server.trim_end_matches('/'),
            self.workspace
        )
    }
}

pub struct HttpSink {
    config: HttpSinkConfig,
    endpoint: String,
    client: reqwest::Client,
    buffer: EventBuffer,
    delivered: u64,
    dropped: u64,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CographError::Sink(format!("http client: {}", e)))?;
        Ok(Self {
            endpoint: config.endpoint(),
            config,
            client,
            buffer: EventBuffer::new(),
            delivered: 0,
            dropped: 0,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 成功送达的帧数
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// 因网络故障丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    async fn post(&self, payload: &str) -> std::result::Result<(), String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("endpoint answered {}", status))
        }
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.buffer
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let payload = self.buffer.take_payload()?;

        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            match self.post(&payload).await {
                Ok(()) => {
                    self.delivered += 1;
                    debug!(bytes = payload.len(), attempt, "frame delivered");
                    return Ok(());
                }
                Err(reason) if attempt < attempts => {
                    debug!(attempt, %reason, "frame delivery failed, retrying");
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(reason) => {
                    self.dropped += 1;
                    warn!(
                        endpoint = %self.endpoint,
                        attempts,
                        dropped = self.dropped,
                        %reason,
                        "frame dropped"
                    );
                }
            }
        }
        Ok(())
    }
}
