#![forbid(unsafe_code)]

use serde_json::Value;

use league_contracts::lead::{EmailAddress, ReferralCode};

use crate::{build_http_agent, provider_error_from_ureq, ProviderCallError};

pub const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeEmailConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
    pub timeout_ms: u32,
    pub user_agent: String,
}

impl WelcomeEmailConfig {
    pub fn mvp_v1(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_EMAIL_ENDPOINT.to_string(),
            api_key: api_key.into(),
            from: from.into(),
            timeout_ms: 8_000,
            user_agent: "league_welcome_email/0.1".to_string(),
        }
    }
}

/// Welcome email dispatch via a Resend-style provider. Best-effort: one
/// fallback attempt after a transport failure. Callers verify the
/// (email, code) pair against the lead store before invoking this.
#[derive(Debug, Clone)]
pub struct WelcomeEmailEngine {
    config: WelcomeEmailConfig,
}

impl WelcomeEmailEngine {
    pub fn new(config: WelcomeEmailConfig) -> Self {
        Self { config }
    }

    pub fn send(
        &self,
        email: &EmailAddress,
        referral_code: &ReferralCode,
        referral_link: &str,
    ) -> Result<(), ProviderCallError> {
        let payload = serde_json::json!({
            "from": self.config.from,
            "to": [email.as_str()],
            "subject": "Welcome to Gains League!",
            "html": welcome_html(referral_code, referral_link),
        });
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
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .set("Accept", "application/json")
            .send_json(payload.clone())
            .map_err(|e| provider_error_from_ureq("welcome_email", e))?;
        Ok(())
    }
}

fn welcome_html(referral_code: &ReferralCode, referral_link: &str) -> String {
    format!(
        concat!(
            "<h1>Welcome to the League!</h1>",
            "<p>You're on the waitlist. Your referral code:</p>",
            "<p><strong>{code}</strong></p>",
            "<p>Invite 5 friends with your link to skip the waitlist and ",
            "unlock priority access:</p>",
            "<p><a href=\"{link}\">{link}</a></p>",
        ),
        code = referral_code.as_str(),
        link = referral_link,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_html_carries_code_and_link() {
        let code = ReferralCode::new("REFABC123").unwrap();
        let html = welcome_html(&code, "https://x.com?ref=REFABC123");
        assert!(html.contains("REFABC123"));
        assert!(html.contains("https://x.com?ref=REFABC123"));
    }
}
