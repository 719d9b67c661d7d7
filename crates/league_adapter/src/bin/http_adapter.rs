#![forbid(unsafe_code)]

use std::{
    collections::HashMap,
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use league_adapter::{
    AdapterHealthResponse, AdapterRuntime, AdminLeadsAdapterResponse, LeadLookupAdapterResponse,
    RegisterAdapterRequest, RegisterAdapterResponse, SideChannelJob, WelcomeEmailAdapterRequest,
    WelcomeEmailAdapterResponse, WelcomeEmailPlan,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("LEAGUE_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let runtime = Arc::new(Mutex::new(AdapterRuntime::default_from_env()?));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/waitlist/register", post(register))
        .route("/v1/waitlist/lead", get(lead_lookup))
        .route("/v1/waitlist/welcome-email", post(welcome_email))
        .route("/v1/admin/leads", get(admin_leads))
        .with_state(runtime);

    println!("league_adapter_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdapterHealthResponse {
                    status: "error".to_string(),
                    outcome: "UNHEALTHY".to_string(),
                    lead_count: 0,
                    audit_rows: 0,
                    reason: Some("adapter runtime lock poisoned".to_string()),
                }),
            );
        }
    };
    (StatusCode::OK, Json(runtime.health_report()))
}

async fn register(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Json(request): Json<RegisterAdapterRequest>,
) -> (StatusCode, Json<RegisterAdapterResponse>) {
    // Hold the lock only for the store mutation; provider calls run after
    // the response is built, off this request.
    let registered = {
        let mut runtime = match runtime.lock() {
            Ok(runtime) => runtime,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(register_error_response(
                        "adapter runtime lock poisoned".to_string(),
                    )),
                );
            }
        };
        runtime.register(request)
    };
    match registered {
        Ok((response, job)) => {
            if let Some(job) = job {
                spawn_side_channel_dispatch(runtime, job);
            }
            let code = match response.outcome.as_str() {
                "REGISTERED" | "ALREADY_REGISTERED" => StatusCode::OK,
                "REFUSED_INVALID_EMAIL" => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (code, Json(response))
        }
        Err(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(register_error_response(reason)),
        ),
    }
}

fn spawn_side_channel_dispatch(runtime: Arc<Mutex<AdapterRuntime>>, job: SideChannelJob) {
    tokio::task::spawn_blocking(move || {
        let report = job.dispatch();
        match runtime.lock() {
            Ok(mut runtime) => {
                if let Err(err) = runtime.record_side_channels(report) {
                    eprintln!("league_adapter_http side channel audit failed: {err}");
                }
            }
            Err(_) => eprintln!("league_adapter_http adapter runtime lock poisoned"),
        }
    });
}

fn register_error_response(reason: String) -> RegisterAdapterResponse {
    RegisterAdapterResponse {
        status: "error".to_string(),
        outcome: "REJECTED".to_string(),
        referral_code: None,
        referral_link: None,
        referral_count: None,
        tiers: None,
        reason: Some(reason),
    }
}

async fn lead_lookup(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<LeadLookupAdapterResponse>, StatusCode> {
    let email = params.get("email").ok_or(StatusCode::BAD_REQUEST)?;
    let runtime = runtime
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    runtime
        .lead_lookup(email)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn welcome_email(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Json(request): Json<WelcomeEmailAdapterRequest>,
) -> (StatusCode, Json<WelcomeEmailAdapterResponse>) {
    // Pair check under the lock, provider call outside it, then a second
    // short lock to record the outcome.
    let plan = {
        let mut runtime = match runtime.lock() {
            Ok(runtime) => runtime,
            Err(_) => return welcome_error("adapter runtime lock poisoned".to_string()),
        };
        runtime.plan_welcome_email(request)
    };
    let job = match plan {
        Ok(WelcomeEmailPlan::Refused(response)) => return welcome_status(response),
        Ok(WelcomeEmailPlan::Dispatch(job)) => job,
        Err(reason) => return welcome_error(reason),
    };

    let report = match tokio::task::spawn_blocking(move || job.dispatch()).await {
        Ok(report) => report,
        Err(_) => return welcome_error("welcome dispatch task failed".to_string()),
    };

    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return welcome_error("adapter runtime lock poisoned".to_string()),
    };
    match runtime.record_welcome_email(report) {
        Ok(response) => welcome_status(response),
        Err(reason) => welcome_error(reason),
    }
}

fn welcome_status(
    response: WelcomeEmailAdapterResponse,
) -> (StatusCode, Json<WelcomeEmailAdapterResponse>) {
    let code = match response.outcome.as_str() {
        "DISPATCHED" => StatusCode::OK,
        "PAIR_NOT_FOUND" => StatusCode::NOT_FOUND,
        "REFUSED_INVALID_INPUT" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(response))
}

fn welcome_error(reason: String) -> (StatusCode, Json<WelcomeEmailAdapterResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(WelcomeEmailAdapterResponse {
            status: "error".to_string(),
            outcome: "REJECTED".to_string(),
            reason: Some(reason),
        }),
    )
}

async fn admin_leads(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    headers: HeaderMap,
) -> (StatusCode, Json<AdminLeadsAdapterResponse>) {
    let admin_user = headers
        .get("x-admin-user")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(admin_error_response(
                    "REJECTED",
                    "adapter runtime lock poisoned".to_string(),
                )),
            );
        }
    };
    match runtime.admin_leads(&admin_user) {
        Ok(response) => {
            let code = match response.outcome.as_str() {
                "GRANTED" => StatusCode::OK,
                "REFUSED_NOT_AUTHORIZED" => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (code, Json(response))
        }
        Err(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(admin_error_response("REJECTED", reason)),
        ),
    }
}

fn admin_error_response(outcome: &str, reason: String) -> AdminLeadsAdapterResponse {
    AdminLeadsAdapterResponse {
        status: "error".to_string(),
        outcome: outcome.to_string(),
        total_leads: 0,
        total_referrals: 0,
        rows: Vec::new(),
        reason: Some(reason),
    }
}
