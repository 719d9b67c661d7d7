#![forbid(unsafe_code)]

use std::time::Duration;

pub mod webhook;
pub mod welcome_email;

/// Failure of one outbound provider call. Side channels are best-effort:
/// callers log these, they never propagate into the registration flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallError {
    pub provider: &'static str,
    pub kind: &'static str,
    pub status: Option<u16>,
}

impl ProviderCallError {
    pub fn new(provider: &'static str, kind: &'static str, status: Option<u16>) -> Self {
        Self {
            provider,
            kind,
            status,
        }
    }

    /// Transport-level failures get exactly one fallback attempt.
    pub fn is_transport(&self) -> bool {
        self.kind == "transport"
    }
}

impl std::fmt::Display for ProviderCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: {} (status {status})", self.provider, self.kind),
            None => write!(f, "{}: {}", self.provider, self.kind),
        }
    }
}

impl std::error::Error for ProviderCallError {}

pub(crate) fn build_http_agent(timeout_ms: u32, user_agent: &str) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_millis(u64::from(timeout_ms)))
        .user_agent(user_agent)
        .build()
}

pub(crate) fn provider_error_from_ureq(provider: &'static str, err: ureq::Error) -> ProviderCallError {
    match err {
        ureq::Error::Status(status, _) => ProviderCallError::new(provider, "status", Some(status)),
        ureq::Error::Transport(_) => ProviderCallError::new(provider, "transport", None),
    }
}
