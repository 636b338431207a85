use tracing::{debug, info, warn};

use crate::protocol::{NonceClock, device_list_url, login_url};
use crate::transport::Transport;
use crate::xml::Document;
use crate::{Error, Result};

/// Login state for one gateway account. Only this module mutates it.
#[derive(Debug)]
pub(crate) struct Session {
    host: String,
    email: String,
    password_hash: String,
    security_token: Option<String>,
    user_id: Option<String>,
    gateway_device_id: Option<String>,
    logged_in: bool,
}

pub(crate) fn hash_password(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

fn required_text(doc: &Document, path: &str, what: &str) -> Result<String> {
    match doc.text(path).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(Error::authentication(format!("response has no {what} ({path})"))),
    }
}

fn request_failed(what: &str, e: Error) -> Error {
    Error::Authentication {
        reason: format!("{what} request failed"),
        source: Some(Box::new(e)),
    }
}

fn parse(body: &str) -> Result<Document> {
    Document::parse(body).map_err(|e| Error::Authentication {
        reason: "unreadable response".to_string(),
        source: Some(Box::new(e)),
    })
}

impl Session {
    pub fn new(host: &str, email: impl Into<String>, password: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            email: email.into(),
            password_hash: hash_password(password),
            security_token: None,
            user_id: None,
            gateway_device_id: None,
            logged_in: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn security_token(&self) -> Option<&str> {
        self.security_token.as_deref()
    }

    pub fn gateway_device_id(&self) -> Option<&str> {
        self.gateway_device_id.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Force a fresh login before the next authenticated call.
    pub fn invalidate(&mut self) {
        self.logged_in = false;
    }

    pub fn clear(&mut self) {
        self.security_token = None;
        self.user_id = None;
        self.gateway_device_id = None;
        self.logged_in = false;
    }

    pub async fn ensure_logged_in(
        &mut self,
        transport: &mut Transport,
        nonce: &mut NonceClock,
    ) -> Result<()> {
        if self.logged_in {
            return Ok(());
        }
        info!(email = %self.email, "attempting login");
        match self.login(transport, nonce).await {
            Ok(()) => {
                info!(
                    device = self.gateway_device_id.as_deref().unwrap_or_default(),
                    "connected to gateway"
                );
                Ok(())
            }
            Err(e) => {
                self.clear();
                warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    async fn login(&mut self, transport: &mut Transport, nonce: &mut NonceClock) -> Result<()> {
        let url = login_url(&self.host, &self.email, &self.password_hash, &nonce.next());
        let body = transport
            .fetch(&url, "login")
            .await
            .map_err(|e| request_failed("login", e))?;
        self.apply_login(&body)?;

        let (Some(token), Some(user_id)) = (&self.security_token, &self.user_id) else {
            return Err(Error::authentication("login did not yield a token"));
        };
        let url = device_list_url(&self.host, token, user_id, &nonce.next());
        let body = transport
            .fetch(&url, "device_list")
            .await
            .map_err(|e| request_failed("device list", e))?;
        self.apply_device_list(&body)
    }

    pub fn apply_login(&mut self, body: &str) -> Result<()> {
        let doc = parse(body)?;
        let token = required_text(&doc, "securityToken", "security token")?;
        let user_id = required_text(&doc, "userId", "user id")?;
        debug!(user_id = %user_id, "login accepted");
        self.security_token = Some(token);
        self.user_id = Some(user_id);
        Ok(())
    }

    pub fn apply_device_list(&mut self, body: &str) -> Result<()> {
        let doc = parse(body)?;
        self.gateway_device_id = Some(required_text(&doc, "devList/devId", "gateway device id")?);
        self.logged_in = true;
        Ok(())
    }
}
