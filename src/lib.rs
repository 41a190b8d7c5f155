//! OpenSASE Monetization Gateway
//!
//! Admission control in front of an internal API: API key authentication,
//! tiered rate limiting and usage metering for billing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 MONETIZATION GATEWAY (per request)              │
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  X-Api-Key   │─▶│ Tier Resolver│─▶│  Admission   │           │
//! │  │  SHA-256     │  │  (TTL cache) │  │ req/s + quota│           │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘           │
//! │                                             │                   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────▼───────┐           │
//! │  │ Usage facts  │◀─│    Usage     │◀─│  Internal    │           │
//! │  │ + quota ++   │  │   Recorder   │  │  API proxy   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │                                                                 │
//! │  Counter store: Redis sorted sets + counters                    │
//! │  Durable store: customers, tiers, usage facts                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod counter;
pub mod error;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod store;
pub mod tier;
pub mod usage;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::constants::paths;
use crate::counter::CounterStore;
use crate::error::{GatewayError, GatewayResult};
use crate::ratelimit::AdmissionController;
use crate::routes::proxy::Upstream;
use crate::store::{CustomerStore, UsageSink};
use crate::tier::TierResolver;
use crate::usage::UsageRecorder;

pub use context::RequestContext;
pub use models::*;

/// Shared gateway state
#[derive(Clone)]
pub struct GatewayState {
    pub customers: Arc<dyn CustomerStore>,
    pub tiers: Arc<TierResolver>,
    pub admission: Arc<AdmissionController>,
    pub usage: Arc<UsageRecorder>,
    pub upstream: Arc<Upstream>,
}

impl GatewayState {
    /// Wire the pipeline components around a store and a counter store
    pub fn new<S>(
        config: &GatewayConfig,
        store: Arc<S>,
        counters: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> GatewayResult<Self>
    where
        S: CustomerStore + UsageSink + 'static,
    {
        let customers: Arc<dyn CustomerStore> = store.clone();
        let sink: Arc<dyn UsageSink> = store;

        let tiers = Arc::new(TierResolver::new(customers.clone(), &config.tier_resolver));
        let admission = Arc::new(AdmissionController::new(counters, clock.clone(), &config.rate_limiting));
        let usage = Arc::new(UsageRecorder::new(sink, admission.clone(), clock));
        let upstream = Upstream::new(&config.internal_api)
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream client: {}", e)))?;

        Ok(Self {
            customers,
            tiers,
            admission,
            usage,
            upstream: Arc::new(upstream),
        })
    }
}

/// Build the gateway router: every unmatched path is proxied upstream
pub fn build_router(state: GatewayState) -> Router {
    with_gateway(Router::new().fallback(routes::proxy::forward), state)
}

/// Put `protected` behind the admission pipeline and add the gateway's own
/// routes (health, internal stub)
pub fn with_gateway(protected: Router<GatewayState>, state: GatewayState) -> Router {
    protected
        .route(paths::HEALTH, get(routes::health::health_check))
        .route(paths::INTERNAL_STUB, get(routes::proxy::internal_stub))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gateway_pipeline,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(middleware::error_boundary::panic_response))
        .with_state(state)
}
