//! HTTP relay speaking the ntfy publish/subscribe protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Delivery, Relay, RelayError, Since, Subscription};

/// Connection settings of an ntfy-compatible server.
#[derive(Clone, Debug)]
pub struct NtfyConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Timeout of publish and poll requests.
    pub request_timeout: Duration,
    /// Pause before a dropped stream is reopened.
    pub reconnect_delay: Duration,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ntfy.sh".to_owned(),
            request_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    id: String,
    time: u64,
    event: String,
    topic: String,
    #[serde(default)]
    message: Option<String>,
}

/// Parses one line of an NDJSON response; keepalives and malformed lines yield `None`.
fn parse_line(line: &str) -> Option<Delivery> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let event: WireEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(error) => {
            debug!(%error, "skipping malformed relay line");
            return None;
        }
    };
    if event.event != "message" {
        return None;
    }
    Some(Delivery {
        id: event.id,
        time: event.time,
        topic: event.topic,
        payload: event.message.unwrap_or_default(),
    })
}

/// Relay backed by an ntfy server.
#[derive(Clone, Debug)]
pub struct NtfyRelay {
    http: reqwest::Client,
    streaming: reqwest::Client,
    config: NtfyConfig,
}

impl NtfyRelay {
    /// Builds a relay client for `config`.
    pub fn new(config: NtfyConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        // Streams stay open indefinitely and must not inherit the request timeout.
        let streaming = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            streaming,
            config,
        })
    }

    fn url(&self, topic: &str) -> String {
        format!("{}/{topic}", self.config.base_url.trim_end_matches('/'))
    }

    fn json_url(&self, topic: &str, since: &Since, poll: bool) -> String {
        let mut url = format!("{}/json", self.url(topic));
        let mut query = Vec::new();
        if poll {
            query.push("poll=1".to_owned());
        }
        if let Some(value) = since.query_value() {
            query.push(format!("since={value}"));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

#[async_trait]
impl Relay for NtfyRelay {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError> {
        let response = self
            .http
            .post(self.url(topic))
            .body(payload.to_owned())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RelayError::Status {
                topic: topic.to_owned(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn poll(&self, topic: &str, since: Since) -> Result<Vec<Delivery>, RelayError> {
        let response = self
            .http
            .get(self.json_url(topic, &since, true))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RelayError::Status {
                topic: topic.to_owned(),
                status: response.status().as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(body.lines().filter_map(parse_line).collect())
    }

    fn subscribe(
        &self,
        topic: &str,
        since: Since,
        sink: mpsc::UnboundedSender<Delivery>,
    ) -> Subscription {
        let closed = Arc::new(AtomicBool::new(false));
        let stream = StreamTask {
            relay: self.clone(),
            topic: topic.to_owned(),
            since,
            sink,
            closed: Arc::clone(&closed),
        };
        let task = tokio::spawn(stream.run());
        Subscription::new(topic, closed, Some(task))
    }
}

struct StreamTask {
    relay: NtfyRelay,
    topic: String,
    since: Since,
    sink: mpsc::UnboundedSender<Delivery>,
    closed: Arc<AtomicBool>,
}

impl StreamTask {
    fn is_done(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.sink.is_closed()
    }

    async fn run(mut self) {
        while !self.is_done() {
            if let Err(error) = self.stream_once().await {
                warn!(topic = %self.topic, %error, "relay stream dropped; reconnecting");
            }
            if self.is_done() {
                break;
            }
            tokio::time::sleep(self.relay.config.reconnect_delay).await;
        }
    }

    /// Streams until the connection ends. Resumes after the last delivered id.
    async fn stream_once(&mut self) -> Result<(), RelayError> {
        let response = self
            .relay
            .streaming
            .get(self.relay.json_url(&self.topic, &self.since, false))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RelayError::Status {
                topic: self.topic.clone(),
                status: response.status().as_u16(),
            });
        }

        let mut body = response.bytes_stream();
        let mut buffer = Vec::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(end) = buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                let Some(delivery) = parse_line(&String::from_utf8_lossy(&line)) else {
                    continue;
                };
                self.since = Since::After(delivery.id.clone());
                if self.sink.send(delivery).is_err() {
                    return Ok(());
                }
            }
        }
        debug!(topic = %self.topic, "relay stream ended");
        Ok(())
    }
}
