#![forbid(unsafe_code)]

use serde::Serialize;
use serde_json::Value;

use crate::{build_http_agent, provider_error_from_ureq, ProviderCallError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub endpoint: String,
    pub timeout_ms: u32,
    pub user_agent: String,
}

impl WebhookConfig {
    pub fn mvp_v1(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: 5_000,
            user_agent: "league_webhook/0.1".to_string(),
        }
    }
}

/// Outbound registration notice. Field names are the collector's wire
/// contract; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationNotice {
    pub email: String,
    pub referred_by: Option<String>,
    pub generated_ref_code: String,
    pub referral_link: String,
    pub timestamp: u64,
}

/// Best-effort POST of each registration to the configured collector.
/// One fallback attempt after a transport failure, then give up.
#[derive(Debug, Clone)]
pub struct RegistrationWebhookEngine {
    config: WebhookConfig,
}

impl RegistrationWebhookEngine {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    pub fn deliver(&self, notice: &RegistrationNotice) -> Result<(), ProviderCallError> {
        let payload = serde_json::to_value(notice)
            .map_err(|_| ProviderCallError::new("webhook", "json_encode", None))?;
        match self.post_once(&payload) {
            Ok(()) => Ok(()),
            Err(err) if err.is_transport() => self.post_once(&payload),
            Err(err) => Err(err),
        }
    }

    fn post_once(&self, payload: &Value) -> Result<(), ProviderCallError> {
        let agent = build_http_agent(self.config.timeout_ms, &self.config.user_agent);
        agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_json(payload.clone())
            .map_err(|e| provider_error_from_ureq("webhook", e))?;
        Ok(())
    }
}
