#![forbid(unsafe_code)]

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use league_contracts::lead::{EmailAddress, ReferralCode};
use league_contracts::registration::{RegistrationRequest, RegistrationResponse};
use league_contracts::tier::TierEvaluation;
use league_contracts::{CorrelationId, MonotonicTimeNs};
use league_core::admin::{AdminLeadsAccess, AdminReadRuntime};
use league_core::notify::{record_registration_notice, registration_notice};
use league_core::registration::{
    referral_link, RandomCodeGenerator, RegistrationConfig, RegistrationRuntime,
};
use league_core::tier_policy::TierPolicy;
use league_core::welcome::{
    WelcomeDispatchOutcome, WelcomeNotificationConfig, WelcomeNotificationRuntime,
};
use league_engines::webhook::{RegistrationNotice, RegistrationWebhookEngine, WebhookConfig};
use league_engines::welcome_email::{WelcomeEmailConfig, WelcomeEmailEngine};
use league_engines::ProviderCallError;
use league_storage::lead_store::LeadStore;

pub const DEFAULT_SITE_ORIGIN: &str = "https://gainsleague.app";
pub const DEFAULT_EMAIL_FROM: &str = "Gains League <onboarding@resend.dev>";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterAdapterRequest {
    pub email: String,
    pub ref_code: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub referral_code: Option<String>,
    pub referral_link: Option<String>,
    pub referral_count: Option<u64>,
    pub tiers: Option<TierEvaluation>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LeadLookupAdapterResponse {
    pub email: String,
    pub referral_code: String,
    pub referral_count: u64,
    pub referral_link: String,
    pub tiers: TierEvaluation,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WelcomeEmailAdapterRequest {
    pub email: String,
    pub referral_code: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WelcomeEmailAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdminLeadRowDto {
    pub email: String,
    pub referral_code: String,
    pub referral_count: u64,
    pub referred_by: Option<String>,
    pub created_at_ns: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdminLeadsAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub total_leads: u64,
    pub total_referrals: u64,
    pub rows: Vec<AdminLeadRowDto>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub lead_count: u64,
    pub audit_rows: u64,
    pub reason: Option<String>,
}

/// Deferred provider calls for one fresh registration. `register` hands
/// this back instead of running the HTTP work itself so the caller can
/// dispatch without holding the runtime; the report then goes back in
/// through `record_side_channels` under a short lock.
#[derive(Debug, Clone)]
pub struct SideChannelJob {
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
    email: EmailAddress,
    webhook: Option<(RegistrationWebhookEngine, RegistrationNotice)>,
    welcome: Option<(WelcomeEmailEngine, ReferralCode, String)>,
}

impl SideChannelJob {
    /// Provider calls only. No store access, no lock required.
    pub fn dispatch(self) -> SideChannelReport {
        let webhook = self
            .webhook
            .map(|(engine, notice)| engine.deliver(&notice));
        let welcome = self
            .welcome
            .map(|(engine, code, link)| engine.send(&self.email, &code, &link));
        SideChannelReport {
            correlation_id: self.correlation_id,
            now: self.now,
            email: self.email,
            webhook,
            welcome,
        }
    }
}

/// Outcomes of a dispatched [`SideChannelJob`], ready to be appended to
/// the audit ledger.
#[derive(Debug, Clone)]
pub struct SideChannelReport {
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
    email: EmailAddress,
    webhook: Option<Result<(), ProviderCallError>>,
    welcome: Option<Result<(), ProviderCallError>>,
}

/// Deferred dispatch for the explicit welcome-email endpoint: the pair was
/// already verified under the lock, only the provider call is left.
#[derive(Debug, Clone)]
pub struct WelcomeEmailJob {
    mailer: WelcomeEmailEngine,
    email: EmailAddress,
    referral_code: ReferralCode,
    referral_link: String,
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
}

impl WelcomeEmailJob {
    pub fn dispatch(self) -> WelcomeEmailReport {
        let outcome = self
            .mailer
            .send(&self.email, &self.referral_code, &self.referral_link);
        WelcomeEmailReport {
            email: self.email,
            outcome,
            correlation_id: self.correlation_id,
            now: self.now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WelcomeEmailReport {
    email: EmailAddress,
    outcome: Result<(), ProviderCallError>,
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
}

/// Plan for one welcome-email request: either refused outright (recorded
/// already) or a dispatch job to run off the lock.
pub enum WelcomeEmailPlan {
    Refused(WelcomeEmailAdapterResponse),
    Dispatch(WelcomeEmailJob),
}

/// One process-wide runtime: the authoritative store plus the core
/// runtimes and optional outbound engines. HTTP handlers serialize access
/// behind a mutex; store-side uniqueness and the atomic txn keep the
/// invariants independent of that. Slow provider calls never run under
/// that mutex: they come back as jobs the handler dispatches after the
/// response is built.
pub struct AdapterRuntime {
    store: LeadStore,
    registration: RegistrationRuntime,
    codegen: RandomCodeGenerator,
    tier_policy: TierPolicy,
    welcome: WelcomeNotificationRuntime,
    admin: AdminReadRuntime,
    webhook: Option<RegistrationWebhookEngine>,
    mailer: Option<WelcomeEmailEngine>,
    next_correlation: u64,
}

impl AdapterRuntime {
    pub fn default_from_env() -> Result<Self, String> {
        let site_origin =
            env::var("LEAGUE_SITE_ORIGIN").unwrap_or_else(|_| DEFAULT_SITE_ORIGIN.to_string());
        let webhook = env::var("LEAGUE_WEBHOOK_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .map(|endpoint| RegistrationWebhookEngine::new(WebhookConfig::mvp_v1(endpoint)));
        let mailer = env::var("LEAGUE_EMAIL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                let from = env::var("LEAGUE_EMAIL_FROM")
                    .unwrap_or_else(|_| DEFAULT_EMAIL_FROM.to_string());
                WelcomeEmailEngine::new(WelcomeEmailConfig::mvp_v1(key, from))
            });

        let mut runtime = Self::new(site_origin, webhook, mailer)?;
        if let Ok(admins) = env::var("LEAGUE_ADMIN_USERS") {
            for user in admins.split(',') {
                let user = user.trim();
                if !user.is_empty() {
                    runtime.store.admin_role_grant(user.to_string());
                }
            }
        }
        Ok(runtime)
    }

    pub fn new(
        site_origin: String,
        webhook: Option<RegistrationWebhookEngine>,
        mailer: Option<WelcomeEmailEngine>,
    ) -> Result<Self, String> {
        let tier_policy =
            TierPolicy::mvp_v1().map_err(|_| "invalid tier configuration".to_string())?;
        Ok(Self {
            store: LeadStore::new_in_memory(),
            registration: RegistrationRuntime::new(RegistrationConfig::mvp_v1(
                site_origin.clone(),
            )),
            codegen: RandomCodeGenerator,
            tier_policy,
            welcome: WelcomeNotificationRuntime::new(WelcomeNotificationConfig { site_origin }),
            admin: AdminReadRuntime::new(),
            webhook,
            mailer,
            next_correlation: 0,
        })
    }

    pub fn grant_admin(&mut self, user_id: impl Into<String>) {
        self.store.admin_role_grant(user_id.into());
    }

    fn next_correlation(&mut self) -> CorrelationId {
        self.next_correlation += 1;
        CorrelationId(self.next_correlation)
    }

    fn now_ns() -> MonotonicTimeNs {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        MonotonicTimeNs(ns)
    }

    pub fn register(
        &mut self,
        req: RegisterAdapterRequest,
    ) -> Result<(RegisterAdapterResponse, Option<SideChannelJob>), String> {
        let email = match EmailAddress::new(req.email) {
            Ok(email) => email,
            Err(_) => {
                return Ok((
                    RegisterAdapterResponse {
                        status: "error".to_string(),
                        outcome: "REFUSED_INVALID_EMAIL".to_string(),
                        referral_code: None,
                        referral_link: None,
                        referral_count: None,
                        tiers: None,
                        reason: Some("email failed the syntactic check".to_string()),
                    },
                    None,
                ));
            }
        };
        // A malformed inbound code is ignored, same as an unknown one.
        let referred_by = req.ref_code.and_then(|code| ReferralCode::new(code).ok());

        let correlation_id = self.next_correlation();
        let now = Self::now_ns();
        let request = RegistrationRequest::v1(correlation_id, now, email, referred_by)
            .map_err(|v| format!("registration contract violation: {v:?}"))?;

        let response = self
            .registration
            .run(&mut self.store, &mut self.codegen, &request)
            .map_err(|e| format!("registration failed: {e:?}"))?;

        match response {
            RegistrationResponse::Registered(ok) => {
                let job =
                    self.side_channel_job(&ok.referral_code, request.email.clone(), correlation_id, now);
                Ok((
                    RegisterAdapterResponse {
                        status: "ok".to_string(),
                        outcome: "REGISTERED".to_string(),
                        referral_code: Some(ok.referral_code.as_str().to_string()),
                        referral_link: Some(ok.referral_link),
                        referral_count: Some(ok.referral_count),
                        tiers: Some(self.tier_policy.evaluate(ok.referral_count)),
                        reason: None,
                    },
                    job,
                ))
            }
            RegistrationResponse::AlreadyRegistered(ok) => Ok((
                RegisterAdapterResponse {
                    status: "ok".to_string(),
                    outcome: "ALREADY_REGISTERED".to_string(),
                    referral_code: Some(ok.referral_code.as_str().to_string()),
                    referral_link: Some(referral_link(
                        &self.registration.config().site_origin,
                        &ok.referral_code,
                    )),
                    referral_count: Some(ok.referral_count),
                    tiers: Some(self.tier_policy.evaluate(ok.referral_count)),
                    reason: None,
                },
                None,
            )),
            RegistrationResponse::Refuse(refuse) => Ok((
                RegisterAdapterResponse {
                    status: "error".to_string(),
                    outcome: "REFUSED_CODE_SPACE_EXHAUSTED".to_string(),
                    referral_code: None,
                    referral_link: None,
                    referral_count: None,
                    tiers: None,
                    reason: Some(refuse.detail),
                },
                None,
            )),
        }
    }

    /// Snapshot everything the post-registration side channels need so the
    /// provider calls can run after the response is returned and the lock
    /// released.
    fn side_channel_job(
        &self,
        code: &ReferralCode,
        email: EmailAddress,
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
    ) -> Option<SideChannelJob> {
        if self.webhook.is_none() && self.mailer.is_none() {
            return None;
        }
        let link = referral_link(&self.registration.config().site_origin, code);
        let webhook = match (&self.webhook, self.store.find_by_code(code)) {
            (Some(engine), Some(lead)) => {
                Some((engine.clone(), registration_notice(lead, &link, now)))
            }
            _ => None,
        };
        let welcome = self
            .mailer
            .as_ref()
            .map(|engine| (engine.clone(), code.clone(), link));
        Some(SideChannelJob {
            correlation_id,
            now,
            email,
            webhook,
            welcome,
        })
    }

    /// Append the audit rows for a completed side-channel job. Failures in
    /// the providers were already swallowed; this is store-only.
    pub fn record_side_channels(&mut self, report: SideChannelReport) -> Result<(), String> {
        if let Some(outcome) = &report.webhook {
            record_registration_notice(&mut self.store, outcome, report.correlation_id, report.now)
                .map_err(|e| format!("webhook audit append failed: {e:?}"))?;
        }
        if let Some(outcome) = &report.welcome {
            self.welcome
                .record_dispatch(
                    &mut self.store,
                    &report.email,
                    outcome,
                    report.correlation_id,
                    report.now,
                )
                .map_err(|e| format!("welcome audit append failed: {e:?}"))?;
        }
        Ok(())
    }

    pub fn lead_lookup(&self, email_raw: &str) -> Option<LeadLookupAdapterResponse> {
        let email = EmailAddress::new(email_raw).ok()?;
        let lead = self.store.find_by_email(&email)?;
        Some(LeadLookupAdapterResponse {
            email: lead.email.as_str().to_string(),
            referral_code: lead.referral_code.as_str().to_string(),
            referral_count: lead.referral_count,
            referral_link: referral_link(
                &self.registration.config().site_origin,
                &lead.referral_code,
            ),
            tiers: self.tier_policy.evaluate(lead.referral_count),
        })
    }

    /// Validate and pair-check a welcome-email request. Refusals are final
    /// (and audited); a verified pair becomes a dispatch job the caller
    /// runs without holding the runtime.
    pub fn plan_welcome_email(
        &mut self,
        req: WelcomeEmailAdapterRequest,
    ) -> Result<WelcomeEmailPlan, String> {
        let (email, code) = match (
            EmailAddress::new(req.email),
            ReferralCode::new(req.referral_code),
        ) {
            (Ok(email), Ok(code)) => (email, code),
            _ => {
                return Ok(WelcomeEmailPlan::Refused(WelcomeEmailAdapterResponse {
                    status: "error".to_string(),
                    outcome: "REFUSED_INVALID_INPUT".to_string(),
                    reason: Some("email or referral code failed validation".to_string()),
                }));
            }
        };
        let Some(mailer) = self.mailer.clone() else {
            return Ok(WelcomeEmailPlan::Refused(WelcomeEmailAdapterResponse {
                status: "error".to_string(),
                outcome: "REFUSED_NOT_CONFIGURED".to_string(),
                reason: Some("no email provider configured".to_string()),
            }));
        };

        let correlation_id = self.next_correlation();
        let now = Self::now_ns();
        let link = self
            .welcome
            .verify_pair(&mut self.store, &email, &code, correlation_id, now)
            .map_err(|e| format!("welcome pair check failed: {e:?}"))?;
        Ok(match link {
            None => WelcomeEmailPlan::Refused(WelcomeEmailAdapterResponse {
                status: "error".to_string(),
                outcome: "PAIR_NOT_FOUND".to_string(),
                reason: Some("no lead matches that email and referral code".to_string()),
            }),
            Some(referral_link) => WelcomeEmailPlan::Dispatch(WelcomeEmailJob {
                mailer,
                email,
                referral_code: code,
                referral_link,
                correlation_id,
                now,
            }),
        })
    }

    /// Record a dispatched welcome email and map the outcome for the wire.
    pub fn record_welcome_email(
        &mut self,
        report: WelcomeEmailReport,
    ) -> Result<WelcomeEmailAdapterResponse, String> {
        let outcome = self
            .welcome
            .record_dispatch(
                &mut self.store,
                &report.email,
                &report.outcome,
                report.correlation_id,
                report.now,
            )
            .map_err(|e| format!("welcome audit append failed: {e:?}"))?;

        Ok(match outcome {
            WelcomeDispatchOutcome::Dispatched { .. } => WelcomeEmailAdapterResponse {
                status: "ok".to_string(),
                outcome: "DISPATCHED".to_string(),
                reason: None,
            },
            WelcomeDispatchOutcome::PairNotFound { .. } => WelcomeEmailAdapterResponse {
                status: "error".to_string(),
                outcome: "PAIR_NOT_FOUND".to_string(),
                reason: Some("no lead matches that email and referral code".to_string()),
            },
            WelcomeDispatchOutcome::ProviderFailed { .. } => WelcomeEmailAdapterResponse {
                status: "error".to_string(),
                outcome: "PROVIDER_FAILED".to_string(),
                reason: Some("email provider rejected the dispatch".to_string()),
            },
        })
    }

    pub fn admin_leads(&mut self, admin_user_id: &str) -> Result<AdminLeadsAdapterResponse, String> {
        let correlation_id = self.next_correlation();
        let now = Self::now_ns();
        let access = self
            .admin
            .list_leads(&mut self.store, admin_user_id, correlation_id, now)
            .map_err(|e| format!("admin read failed: {e:?}"))?;

        Ok(match access {
            AdminLeadsAccess::Granted(page) => AdminLeadsAdapterResponse {
                status: "ok".to_string(),
                outcome: "GRANTED".to_string(),
                total_leads: page.total_leads,
                total_referrals: page.total_referrals,
                rows: page
                    .rows
                    .into_iter()
                    .map(|row| AdminLeadRowDto {
                        email: row.email,
                        referral_code: row.referral_code,
                        referral_count: row.referral_count,
                        referred_by: row.referred_by,
                        created_at_ns: row.created_at.0,
                    })
                    .collect(),
                reason: None,
            },
            AdminLeadsAccess::Refused { .. } => AdminLeadsAdapterResponse {
                status: "error".to_string(),
                outcome: "REFUSED_NOT_AUTHORIZED".to_string(),
                total_leads: 0,
                total_referrals: 0,
                rows: Vec::new(),
                reason: Some("admin role required".to_string()),
            },
        })
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            lead_count: self.store.lead_count(),
            audit_rows: self.store.audit_rows().len() as u64,
            reason: None,
        }
    }
}
