// src/handlers/stage.rs

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderName},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::STAGE_QUESTIONS,
    diagnosis::{score, validation},
    error::{DiagnosisError, DiagnosisErrorCode},
    handlers::{SESSION_HEADER, resolve_session_id},
    models::stage::{StageRecord, StageResponse, SubmitStageRequest},
    session::{self, SessionRegistry, StageKey},
};

/// Handles one stage's form submission.
///
/// * Accumulates the stage score from the submitted answers.
/// * Stage 2 records the route flag; stage 3 re-reads the earlier records
///   and embeds their scores plus the flag for the later integrity check.
/// * The raw record is validated strictly, then sanitized, then persisted.
pub async fn submit_stage(
    State(registry): State<SessionRegistry>,
    Path(stage): Path<u8>,
    headers: HeaderMap,
    Json(req): Json<SubmitStageRequest>,
) -> Result<impl IntoResponse, DiagnosisError> {
    let key = StageKey::from_stage(stage).ok_or_else(|| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::ValidationFailed,
            "Unknown diagnosis stage",
            json!({ "stage": stage }),
        )
    })?;

    req.validate().map_err(|err| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::ValidationFailed,
            "Malformed stage submission",
            json!({ "errors": err.to_string() }),
        )
    })?;

    let session_id = resolve_session_id(&headers);
    let store = registry.get_or_create(&session_id);

    let stage_score = score::accumulate_score(&req.answers, &STAGE_QUESTIONS);

    let mut record = StageRecord {
        score: stage_score,
        answers: req.answers,
        is_general: None,
        stage1_score: None,
        stage2_score: None,
    };

    match key {
        StageKey::Stage1 => {}
        StageKey::Stage2 => {
            let is_general = req.is_general.ok_or_else(|| {
                DiagnosisError::with_context(
                    DiagnosisErrorCode::ValidationFailed,
                    "Stage 2 requires the route flag",
                    json!({ "field": "isGeneral" }),
                )
            })?;
            record.is_general = Some(is_general);
        }
        StageKey::Stage3 => {
            let stage1 = session::get_validated_stage_data(store.as_ref(), StageKey::Stage1)
                .ok_or_else(|| missing_stage(StageKey::Stage1))?;
            let stage2 = session::get_validated_stage_data(store.as_ref(), StageKey::Stage2)
                .ok_or_else(|| missing_stage(StageKey::Stage2))?;
            let is_general = stage2.is_general.ok_or_else(|| {
                DiagnosisError::with_context(
                    DiagnosisErrorCode::InvalidSessionData,
                    "Stage 2 record has no route flag",
                    json!({ "field": "isGeneral" }),
                )
            })?;

            record.is_general = Some(is_general);
            record.stage1_score = Some(stage1.score);
            record.stage2_score = Some(stage2.score);
        }
    }

    // Strict validation on the wire shape, then canonicalization before the
    // record hits the store.
    let raw = serde_json::to_value(&record)?;
    validation::validate_stage_data(key.stage(), &raw).map_err(|err| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::ValidationFailed,
            err.message.clone(),
            json!({ "field": err.field, "value": err.value }),
        )
    })?;
    let record = validation::sanitize_stage_data(&raw);

    session::save_stage_data(store.as_ref(), key, &record)?;

    tracing::info!(session = %session_id, stage, score = record.score, "Stage submitted");

    Ok((
        [(HeaderName::from_static(SESSION_HEADER), session_id)],
        Json(StageResponse {
            stage,
            score: record.score,
        }),
    ))
}

fn missing_stage(key: StageKey) -> DiagnosisError {
    DiagnosisError::with_context(
        DiagnosisErrorCode::MissingStageData,
        format!("Stage {} data not found", key.stage()),
        json!({ "stage": key.stage() }),
    )
}
