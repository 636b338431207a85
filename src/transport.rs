use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::logger::MessageLogger;
use crate::protocol::{redact, redact_body};
use crate::{Error, Result};

pub(crate) const DEFAULT_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub(crate) struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// HTTP GET with a fixed retry budget. Any status other than 200 and any
/// network failure count as a failed attempt.
pub(crate) struct Transport {
    http: reqwest::Client,
    attempts: u32,
    retry_delay: Duration,
    logger: Option<MessageLogger>,
}

impl Transport {
    pub fn new(
        http: reqwest::Client,
        attempts: u32,
        retry_delay: Duration,
        logger: Option<MessageLogger>,
    ) -> Self {
        Self {
            http,
            attempts: attempts.max(1),
            retry_delay,
            logger,
        }
    }

    /// Single attempt, no status check.
    pub async fn get(
        &mut self,
        url: &str,
        operation: &'static str,
    ) -> std::result::Result<Response, reqwest::Error> {
        let shown = redact(url);
        debug!(op = operation, url = %shown, "GET");
        if let Some(ref mut logger) = self.logger {
            logger.log_request(operation, &shown);
        }

        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let shown_body = redact_body(&body);
        trace!(op = operation, status, body = %shown_body, "response");

        if let Some(ref mut logger) = self.logger {
            logger.log_response(operation, status, &shown_body);
        }
        Ok(Response { status, body })
    }

    pub async fn fetch(&mut self, url: &str, operation: &'static str) -> Result<String> {
        let mut last_status = None;
        for attempt in 1..=self.attempts {
            match self.get(url, operation).await {
                Ok(resp) if resp.is_success() => return Ok(resp.body),
                Ok(resp) => {
                    warn!(op = operation, status = resp.status, attempt, "unexpected status; retrying");
                    last_status = Some(resp.status);
                }
                Err(e) => {
                    error!(op = operation, attempt, error = %e, "request failed");
                }
            }
            if attempt < self.attempts {
                self.backoff().await;
            }
        }

        error!(op = operation, attempts = self.attempts, "retry budget exhausted");
        Err(Error::Transport {
            url: redact(url),
            attempts: self.attempts,
            status: last_status,
        })
    }

    pub async fn backoff(&self) {
        if !self.retry_delay.is_zero() {
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    pub fn logger(&mut self) -> Option<&mut MessageLogger> {
        self.logger.as_mut()
    }
}
