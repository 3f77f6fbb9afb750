use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Application, ApplicationId, CampaignId, InfluencerId, ShippingAddress};
use super::lifecycle::{LifecycleEngine, LifecycleError, ShipmentDetails};
use super::notify::EventSink;
use super::repository::{
    ApplicationStore, CampaignStore, InfluencerDirectory, LedgerStore, StoreError,
};

/// Router builder exposing the engine operations over HTTP.
pub fn engine_router<C, A, L, D, E>(engine: Arc<LifecycleEngine<C, A, L, D, E>>) -> Router
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(apply_handler::<C, A, L, D, E>))
        .route(
            "/api/v1/applications/bulk-approve",
            post(bulk_approve_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/ship",
            post(ship_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/delivered",
            post(delivered_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/uploaded",
            post(uploaded_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/missed",
            post(missed_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/applications/:application_id/finalize",
            post(finalize_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/influencers/:influencer_id/score-adjustments",
            post(adjust_score_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/influencers/:influencer_id/reputation",
            get(reputation_handler::<C, A, L, D, E>),
        )
        .route(
            "/api/v1/maintenance/deadline-sweep",
            post(sweep_handler::<C, A, L, D, E>),
        )
        .with_state(engine)
}

/// Sanitized representation of an application for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub campaign_id: CampaignId,
    pub influencer_id: InfluencerId,
    pub status: &'static str,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
}

impl ApplicationView {
    pub fn from_application(application: &Application) -> Self {
        Self {
            application_id: application.id.clone(),
            campaign_id: application.campaign_id.clone(),
            influencer_id: application.influencer_id.clone(),
            status: application.status.label(),
            applied_at: application.applied_at,
            approved_at: application.approved_at,
            shipped_at: application.shipped_at,
            delivered_at: application.delivered_at,
            points_awarded: application.points_awarded,
            tracking_number: application
                .shipping
                .as_ref()
                .map(|shipping| shipping.tracking_number.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) influencer_id: String,
    pub(crate) campaign_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkApproveRequest {
    pub(crate) application_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShipRequest {
    pub(crate) courier: String,
    pub(crate) tracking_number: String,
    #[serde(default)]
    pub(crate) tracking_url: Option<String>,
    pub(crate) address: ShippingAddress,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadedRequest {
    #[serde(default)]
    pub(crate) quality: bool,
    #[serde(default)]
    pub(crate) link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdjustScoreRequest {
    pub(crate) delta: i32,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

fn error_response(error: LifecycleError) -> Response {
    let status = match &error {
        LifecycleError::Admission(_)
        | LifecycleError::MissingFields
        | LifecycleError::UploadWindowClosed
        | LifecycleError::DeadlineNotReached
        | LifecycleError::UnsupportedGrant(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // A repeat of an already-settled transition is not an error for the
        // caller; report the record's quiescence instead.
        LifecycleError::AlreadySettled => {
            let payload = json!({ "status": "already_settled" });
            return (StatusCode::OK, axum::Json(payload)).into_response();
        }
        LifecycleError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LifecycleError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        LifecycleError::Store(StoreError::Conflict)
        | LifecycleError::Store(StoreError::StatusConflict) => StatusCode::CONFLICT,
        LifecycleError::Store(StoreError::Timeout) => StatusCode::SERVICE_UNAVAILABLE,
        LifecycleError::Store(StoreError::Unavailable(_)) | LifecycleError::Notify(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn application_response(status: StatusCode, application: &Application) -> Response {
    (
        status,
        axum::Json(ApplicationView::from_application(application)),
    )
        .into_response()
}

pub(crate) async fn apply_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    let influencer_id = InfluencerId(request.influencer_id);
    let campaign_id = CampaignId(request.campaign_id);
    match engine.apply(&influencer_id, &campaign_id, Utc::now()) {
        Ok(application) => application_response(StatusCode::CREATED, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.get(&ApplicationId(application_id)) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.approve(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bulk_approve_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    axum::Json(request): axum::Json<BulkApproveRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    let ids: Vec<ApplicationId> = request
        .application_ids
        .into_iter()
        .map(ApplicationId)
        .collect();
    let outcome = engine.bulk_approve(&ids, Utc::now());
    let payload = json!({
        "approved_count": outcome.approved.len(),
        "failed_count": outcome.failed.len(),
        "approved": outcome.approved,
        "failed": outcome.failed,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn reject_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.reject(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ship_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ShipRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    let details = ShipmentDetails {
        courier: request.courier,
        tracking_number: request.tracking_number,
        tracking_url: request.tracking_url,
        address: request.address,
    };
    match engine.ship(&ApplicationId(application_id), details, Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delivered_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.mark_delivered(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn uploaded_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<UploadedRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.mark_uploaded(
        &ApplicationId(application_id),
        request.quality,
        request.link,
        Utc::now(),
    ) {
        Ok(points) => {
            let payload = json!({ "points_awarded": points });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn missed_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.mark_missed(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn finalize_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(application_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.finalize(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => application_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn adjust_score_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(influencer_id): Path<String>,
    axum::Json(request): axum::Json<AdjustScoreRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    let influencer_id = InfluencerId(influencer_id);
    match engine.adjust_score(&influencer_id, request.delta, request.note, Utc::now()) {
        Ok(outcome) => {
            let payload = json!({
                "influencer_id": influencer_id.0,
                "score": outcome.score_after,
                "tier": outcome.tier_after.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reputation_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
    Path(influencer_id): Path<String>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    let influencer_id = InfluencerId(influencer_id);
    let state = match engine.reputation().state(&influencer_id) {
        Ok(state) => state,
        Err(error) => return error_response(LifecycleError::Store(error)),
    };
    let tier = match engine.reputation().tier(&influencer_id) {
        Ok(tier) => tier,
        Err(error) => return error_response(LifecycleError::Store(error)),
    };
    let profile = match engine.directory().profile(&influencer_id) {
        Ok(Some(profile)) => profile,
        Ok(None) => return error_response(LifecycleError::Store(StoreError::NotFound)),
        Err(error) => return error_response(LifecycleError::Store(error)),
    };
    let payload = json!({
        "influencer_id": influencer_id.0,
        "score": state.score,
        "penalty": state.penalty,
        "completed_campaigns": state.completed_campaigns,
        "tier": tier.label(),
        "standing": profile.flags.standing().label(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn sweep_handler<C, A, L, D, E>(
    State(engine): State<Arc<LifecycleEngine<C, A, L, D, E>>>,
) -> Response
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    match engine.sweep(Utc::now()) {
        Ok(actions) => {
            let payload = json!({
                "applied_count": actions.len(),
                "actions": actions,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
