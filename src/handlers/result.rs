// src/handlers/result.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderName},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    diagnosis::{engine, validation},
    error::{DiagnosisError, DiagnosisErrorCode},
    handlers::{SESSION_HEADER, resolve_session_id},
    models::{
        author::find_author,
        stage::{DiagnosisResponse, Stage3Answers},
    },
    session::{self, SessionRegistry},
};

/// Computes the final diagnosis.
///
/// * Reads back all three records strictly and re-validates cross-stage
///   integrity.
/// * Runs the final input gate, then the classification engine.
/// * Returns the full author record along with the echoed scores.
pub async fn get_result(
    State(registry): State<SessionRegistry>,
    State(config): State<Config>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, DiagnosisError> {
    let session_id = resolve_session_id(&headers);

    // Read-only path: an unknown session must not allocate registry state.
    let store = registry.get(&session_id).ok_or_else(|| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::MissingStageData,
            "Diagnosis session not found",
            json!({ "session": session_id.clone() }),
        )
    })?;

    let (stage1, stage2, stage3) = session::check_session_integrity(store.as_ref())?;
    let is_general = stage3.is_general.unwrap_or(false);

    if !config.is_production() {
        tracing::debug!(?stage1, ?stage2, ?stage3, "Validated diagnosis inputs");
    }

    // The gate runs over the typed slots the engine reads, not the raw
    // persisted map, which may carry extra form keys.
    let answers = Stage3Answers::from_map(&stage3.answers);

    if !validation::validate_diagnosis_inputs(
        stage1.score,
        stage2.score,
        stage3.score,
        Some(&answers),
    ) {
        return Err(DiagnosisError::with_context(
            DiagnosisErrorCode::DiagnosisCalculationFailed,
            "Diagnosis inputs failed the final gate",
            json!({
                "stage1Score": stage1.score,
                "stage2Score": stage2.score,
                "stage3Score": stage3.score,
            }),
        ));
    }

    let author_id = engine::classify(
        stage1.score,
        stage2.score,
        stage3.score,
        is_general,
        Some(&answers),
    );

    let author = find_author(author_id).ok_or_else(|| {
        DiagnosisError::with_context(
            DiagnosisErrorCode::DiagnosisCalculationFailed,
            "Classification produced an unknown author",
            json!({ "author": author_id }),
        )
    })?;

    tracing::info!(session = %session_id, author = author_id, "Diagnosis computed");

    Ok((
        [(HeaderName::from_static(SESSION_HEADER), session_id)],
        Json(DiagnosisResponse {
            author,
            stage1_score: stage1.score,
            stage2_score: stage2.score,
            stage3_score: stage3.score,
            is_general,
        }),
    ))
}

/// Clears the whole session: all three stage records plus the registry
/// entry itself.
pub async fn reset_session(
    State(registry): State<SessionRegistry>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, DiagnosisError> {
    let session_id = resolve_session_id(&headers);

    if let Some(store) = registry.get(&session_id) {
        session::clear_diagnosis_data(store.as_ref());
    }
    if let Some(age) = registry.remove(&session_id) {
        tracing::info!(
            session = %session_id,
            lived_secs = age.num_seconds(),
            "Session reset"
        );
    }

    Ok(Json(json!({ "message": "Diagnosis data cleared" })))
}
