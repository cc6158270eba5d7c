//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use mystery_core::domain::{Attempt, Difficulty, DomainType, PublicCase, Solution, Submission};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_mystery_handler,
        daily_mystery_handler,
        get_mystery_handler,
        start_handler,
        hint_handler,
        submit_handler,
        player_history_handler,
    ),
    components(
        schemas(
            CreateMysteryRequest,
            StartRequest,
            HintRequest,
            SubmitRequest,
            CaseResponse,
            AttemptResponse,
            HintResponse,
            SubmitResponse,
            HistoryResponse,
        )
    ),
    tags(
        (name = "Mystery API", description = "Daily deduction puzzles: generation, hints, and grading.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMysteryRequest {
    /// One of: homicide, theft, disappearance, fraud, espionage.
    #[schema(value_type = String, example = "theft")]
    pub domain_type: DomainType,
    /// One of: easy, medium, hard, expert.
    #[schema(value_type = String, example = "medium")]
    pub difficulty: Difficulty,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub user_id: Uuid,
    /// Index into the hint ladder; clamped to the last rung.
    pub level: u32,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub user_id: Uuid,
    pub culprit_id: String,
    pub motive: String,
    /// At most three evidence ids.
    #[serde(default)]
    pub key_evidence: Vec<String>,
}

/// A case as seen by players: solution always stripped.
#[derive(Serialize, ToSchema)]
pub struct CaseResponse {
    #[schema(value_type = Object)]
    pub mystery: PublicCase,
}

#[derive(Serialize, ToSchema)]
pub struct AttemptResponse {
    #[schema(value_type = Object)]
    pub attempt: Attempt,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HintResponse {
    pub hint: String,
    pub hints_used: i32,
}

/// The grading outcome. `solution` is present only when the accusation was
/// wrong.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[schema(value_type = Object)]
    pub attempt: Attempt,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub solution: Option<Solution>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub attempts: Vec<Attempt>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate and persist a new mystery.
#[utoipa::path(
    post,
    path = "/mysteries",
    request_body = CreateMysteryRequest,
    responses(
        (status = 201, description = "Mystery generated and stored", body = CaseResponse),
        (status = 500, description = "Generation failed; safe to retry")
    )
)]
pub async fn create_mystery_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMysteryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rng = SmallRng::from_entropy();
    let case = state
        .cases
        .create_case(req.domain_type, req.difficulty, None, &mut rng)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CaseResponse {
            mystery: case.into_public(),
        }),
    ))
}

/// Today's canonical mystery, created on first call.
#[utoipa::path(
    get,
    path = "/mysteries/daily",
    responses(
        (status = 200, description = "Today's mystery, without its solution", body = CaseResponse),
        (status = 500, description = "Generation failed; safe to retry")
    )
)]
pub async fn daily_mystery_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rng = SmallRng::from_entropy();
    let mystery = state.cases.daily_case(&mut rng).await?;
    Ok(Json(CaseResponse { mystery }))
}

/// Fetch a mystery by id.
#[utoipa::path(
    get,
    path = "/mysteries/{id}",
    params(("id" = Uuid, Path, description = "The mystery id")),
    responses(
        (status = 200, description = "The mystery, without its solution", body = CaseResponse),
        (status = 404, description = "No such mystery")
    )
)]
pub async fn get_mystery_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mystery = state.cases.public_case(id).await?;
    Ok(Json(CaseResponse { mystery }))
}

/// Start (or resume) an attempt on a mystery.
#[utoipa::path(
    post,
    path = "/mysteries/{id}/start",
    params(("id" = Uuid, Path, description = "The mystery id")),
    request_body = StartRequest,
    responses(
        (status = 200, description = "The in-progress attempt (idempotent)", body = AttemptResponse),
        (status = 404, description = "No such mystery"),
        (status = 409, description = "Attempt already completed")
    )
)]
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let attempt = state.attempts.start(req.user_id, id).await?;
    Ok(Json(AttemptResponse { attempt }))
}

/// Request a hint. Costs one hint regardless of the requested level.
#[utoipa::path(
    post,
    path = "/mysteries/{id}/hint",
    params(("id" = Uuid, Path, description = "The mystery id")),
    request_body = HintRequest,
    responses(
        (status = 200, description = "One hint from the ladder", body = HintResponse),
        (status = 404, description = "No such mystery"),
        (status = 409, description = "Attempt not in progress")
    )
)]
pub async fn hint_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<HintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.attempts.hint(req.user_id, id, req.level).await?;
    Ok(Json(HintResponse {
        hint: outcome.hint,
        hints_used: outcome.hints_used,
    }))
}

/// Submit an accusation and complete the attempt.
#[utoipa::path(
    post,
    path = "/mysteries/{id}/submit",
    params(("id" = Uuid, Path, description = "The mystery id")),
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Graded outcome; solution included only when wrong", body = SubmitResponse),
        (status = 404, description = "No such mystery"),
        (status = 409, description = "Attempt not in progress or already completed"),
        (status = 500, description = "Data integrity problem")
    )
)]
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .attempts
        .submit(
            req.user_id,
            id,
            Submission {
                culprit_id: req.culprit_id,
                motive: req.motive,
                key_evidence: req.key_evidence,
            },
        )
        .await?;
    Ok(Json(SubmitResponse {
        attempt: outcome.attempt,
        solution: outcome.solution,
    }))
}

/// A player's recent attempts, newest first.
#[utoipa::path(
    get,
    path = "/players/{user_id}/attempts",
    params(("user_id" = Uuid, Path, description = "The player id")),
    responses(
        (status = 200, description = "Recent attempts", body = HistoryResponse)
    )
)]
pub async fn player_history_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let attempts = state.attempts.history(user_id).await?;
    Ok(Json(HistoryResponse { attempts }))
}
