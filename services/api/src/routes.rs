use crate::infra::{ApiEngine, AppState, InMemoryCampaignStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use creatorlift::engine::{
    engine_router, AccountFlags, Campaign, CampaignId, CampaignStatus, CampaignStore,
    InfluencerId, InfluencerProfile, InfluencerDirectory, RewardType, ScoreReason, StoreError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateCampaignRequest {
    pub(crate) campaign_id: String,
    pub(crate) title: String,
    pub(crate) inventory: u32,
    pub(crate) application_deadline: DateTime<Utc>,
    pub(crate) upload_deadline: DateTime<Utc>,
    #[serde(default = "default_reward")]
    pub(crate) reward: RewardType,
}

fn default_reward() -> RewardType {
    RewardType::Gift
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterInfluencerRequest {
    pub(crate) influencer_id: String,
    #[serde(default = "default_true")]
    pub(crate) profile_completed: bool,
}

fn default_true() -> bool {
    true
}

pub(crate) fn with_engine_routes(engine: Arc<ApiEngine>) -> axum::Router {
    engine_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/campaigns",
            axum::routing::post(create_campaign_endpoint),
        )
        .route(
            "/api/v1/influencers",
            axum::routing::post(register_influencer_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn create_campaign_endpoint(
    Extension(campaigns): Extension<Arc<InMemoryCampaignStore>>,
    Json(request): Json<CreateCampaignRequest>,
) -> impl IntoResponse {
    let campaign = Campaign {
        id: CampaignId(request.campaign_id),
        title: request.title,
        inventory: request.inventory,
        approved_count: 0,
        application_deadline: request.application_deadline,
        upload_deadline: request.upload_deadline,
        status: CampaignStatus::Active,
        reward: request.reward,
    };
    match campaigns.insert(campaign) {
        Ok(stored) => (StatusCode::CREATED, Json(json!(stored))).into_response(),
        Err(StoreError::Conflict) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "campaign already exists" })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

/// Onboard an influencer: register the profile and credit the signup bonus.
pub(crate) async fn register_influencer_endpoint(
    Extension(engine): Extension<Arc<ApiEngine>>,
    Json(request): Json<RegisterInfluencerRequest>,
) -> impl IntoResponse {
    let influencer_id = InfluencerId(request.influencer_id);
    let profile = InfluencerProfile {
        id: influencer_id.clone(),
        profile_completed: request.profile_completed,
        flags: AccountFlags::default(),
    };
    if let Err(err) = engine.directory().register(profile) {
        let status = match err {
            StoreError::Conflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        return (status, Json(json!({ "error": err.to_string() }))).into_response();
    }

    match engine.grant(&influencer_id, ScoreReason::SignupBonus, Utc::now()) {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({
                "influencer_id": influencer_id.0,
                "score": outcome.score_after,
                "tier": outcome.tier_after.label(),
            })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
