use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::mapper;
use crate::protocol::{NonceClock, Operation, operation_url, redact};
use crate::session::Session;
use crate::transport::{DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY, Transport};
use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_GATEWAY_NAME: &str = "JG-Gateway";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AuraClientBuilder {
    host: String,
    email: String,
    password: String,
    retry_attempts: u32,
    auth_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
    accept_invalid_certs: bool,
    revision: ProtocolRevision,
    gateway_name: String,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl AuraClientBuilder {
    pub fn new(host: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            email: email.into(),
            password: password.into(),
            retry_attempts: DEFAULT_ATTEMPTS,
            auth_attempts: DEFAULT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            revision: ProtocolRevision::default(),
            gateway_name: DEFAULT_GATEWAY_NAME.to_string(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Attempts per unauthenticated GET (login, device list).
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Attempts per authenticated call; each failed one forces a re-login.
    pub fn auth_attempts(mut self, attempts: u32) -> Self {
        self.auth_attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn revision(mut self, revision: ProtocolRevision) -> Self {
        self.revision = revision;
        self
    }

    pub fn gateway_name(mut self, name: impl Into<String>) -> Self {
        self.gateway_name = name.into();
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<AuraClient> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .timeout(self.timeout)
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(AuraClient {
            session: Session::new(&self.host, self.email, &self.password),
            transport: Transport::new(http, self.retry_attempts, self.retry_delay, logger),
            nonce: NonceClock::default(),
            auth_attempts: self.auth_attempts.max(1),
            revision: self.revision,
            gateway_name: self.gateway_name,
            hot_water_id: None,
        })
    }
}

/// Polling client for one gateway. All calls take `&mut self`, so one client
/// never has two requests racing on the same security token.
pub struct AuraClient {
    session: Session,
    transport: Transport,
    nonce: NonceClock,
    auth_attempts: u32,
    revision: ProtocolRevision,
    gateway_name: String,
    hot_water_id: Option<String>,
}

impl AuraClient {
    pub fn builder(
        host: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> AuraClientBuilder {
        AuraClientBuilder::new(host, email, password)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn gateway_device_id(&self) -> Option<&str> {
        self.session.gateway_device_id()
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.revision
    }

    /// Drop the session; the next call logs in again.
    pub fn logout(&mut self) {
        self.session.clear();
    }

    pub async fn login(&mut self) -> Result<()> {
        self.session
            .ensure_logged_in(&mut self.transport, &mut self.nonce)
            .await
    }

    pub async fn get_thermostats(&mut self) -> Result<Gateway> {
        let body = self.read_attributes().await?;
        let gateway_id = self.session.gateway_device_id().unwrap_or_default();
        let gateway =
            mapper::gateway_from_attributes(&body, gateway_id, &self.gateway_name, self.revision)
                .inspect_err(|e| error!(error = %e, response = %body, "failed to decode thermostats"))?;

        if let Some(logger) = self.transport.logger()
            && let Ok(state) = serde_json::to_value(&gateway)
        {
            logger.log_snapshot("gateway", state);
        }
        Ok(gateway)
    }

    pub async fn get_hot_water(&mut self) -> Result<HotWater> {
        let body = self.read_attributes().await?;
        let hot_water = mapper::hot_water_from_attributes(&body)
            .inspect_err(|e| error!(error = %e, response = %body, "failed to decode hot water"))?;
        self.hot_water_id = Some(hot_water.id.clone());

        if let Some(logger) = self.transport.logger()
            && let Ok(state) = serde_json::to_value(&hot_water)
        {
            logger.log_snapshot("hot_water", state);
        }
        Ok(hot_water)
    }

    /// Select a preset by name; timed presets run for one unit.
    pub async fn set_preset(&mut self, thermostat_id: &str, preset_name: &str) -> Result<()> {
        let op = mapper::preset_write(self.revision, thermostat_id, preset_name, None)?;
        self.write("set_preset", thermostat_id, op).await
    }

    /// Like [`set_preset`](Self::set_preset) with an explicit 1..=99 duration
    /// for timed presets (Party, Away). Ignored for the others.
    pub async fn set_preset_with_duration(
        &mut self,
        thermostat_id: &str,
        preset_name: &str,
        duration: u8,
    ) -> Result<()> {
        let op = mapper::preset_write(self.revision, thermostat_id, preset_name, Some(duration))?;
        self.write("set_preset", thermostat_id, op).await
    }

    pub async fn set_temperature(&mut self, thermostat_id: &str, celsius: f64) -> Result<()> {
        let op = mapper::temperature_write(thermostat_id, celsius)?;
        self.write("set_temperature", thermostat_id, op).await
    }

    /// Switch the hot-water relay, polling once first if its id is not known yet.
    pub async fn set_hot_water(&mut self, on: bool) -> Result<()> {
        let relay_id = match self.hot_water_id.clone() {
            Some(id) => id,
            None => self.get_hot_water().await?.id,
        };
        let op = mapper::hot_water_write(&relay_id, on);
        self.write("set_hot_water", &relay_id, op).await
    }

    async fn read_attributes(&mut self) -> Result<String> {
        self.call(&Operation::PrimeRead).await?;
        self.call(&Operation::ReadAttributes).await
    }

    async fn write(&mut self, action: &str, device: &str, op: Operation) -> Result<()> {
        if let Operation::WriteAttribute { ref value, .. } = op {
            debug!(action, device, payload = %value, "sending command");
            if let Some(logger) = self.transport.logger() {
                logger.log_command(action, device, value);
            }
        }
        let body = self.call(&op).await?;
        mapper::validate_write_response(&body)
            .inspect_err(|e| warn!(action, device, error = %e, "command rejected"))?;
        info!(action, device, "command accepted");
        Ok(())
    }

    /// Run an authenticated call. The gateway expires tokens without saying
    /// so, so any non-200 drops the session and the call is retried after a
    /// fresh login with a rebuilt URL.
    async fn call(&mut self, op: &Operation) -> Result<String> {
        let mut last_url = String::new();
        for attempt in 1..=self.auth_attempts {
            self.session
                .ensure_logged_in(&mut self.transport, &mut self.nonce)
                .await?;
            let url = operation_url(&self.session, op, &self.nonce.next())?;
            last_url = redact(&url);

            match self.transport.get(&url, op.label()).await {
                Ok(resp) if resp.is_success() => return Ok(resp.body),
                Ok(resp) => {
                    warn!(
                        op = op.label(),
                        status = resp.status,
                        attempt,
                        "request not accepted; logging in again"
                    );
                    self.session.invalidate();
                }
                Err(e) => {
                    error!(op = op.label(), attempt, error = %e, "request failed");
                    if attempt < self.auth_attempts {
                        self.transport.backoff().await;
                    }
                }
            }
        }

        error!(op = op.label(), url = %last_url, "giving up");
        Err(Error::Request {
            url: last_url,
            attempts: self.auth_attempts,
        })
    }
}
