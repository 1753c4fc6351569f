// src/diagnosis/validation.rs

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::config::{MAX_STAGE_SCORE, MIN_STAGE_SCORE, STAGE_QUESTIONS, VALID_ANSWER_VALUES};
use crate::models::stage::{Stage3Answers, StageRecord};

/// Typed validation failure: which field broke and what it held.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub field: String,
    pub value: Value,
}

impl ValidationError {
    fn new(message: impl Into<String>, field: impl Into<String>, value: &Value) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
            value: value.clone(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (field: {}, value: {})", self.message, self.field, self.value)
    }
}

impl std::error::Error for ValidationError {}

fn is_valid_answer_value(value: &str) -> bool {
    VALID_ANSWER_VALUES.contains(&value)
}

/// Strict stage-record validation.
///
/// Checks run in a fixed order and the first violation wins: the data must
/// be an object, the score a number in [0,50], the answers an object.
/// Stage 3 additionally requires all five questions answered from the fixed
/// domain, numeric embedded stage-1/2 scores in range, and a boolean route
/// flag. On success the record is handed back in typed form.
pub fn validate_stage_data(stage: u8, data: &Value) -> Result<StageRecord, ValidationError> {
    let Some(obj) = data.as_object() else {
        return Err(ValidationError::new("Invalid stage data format", "data", data));
    };

    let score_value = obj.get("score").cloned().unwrap_or(Value::Null);
    let Some(score) = score_value.as_f64() else {
        return Err(ValidationError::new("Invalid score value", "score", &score_value));
    };
    if score < MIN_STAGE_SCORE as f64 || score > MAX_STAGE_SCORE as f64 {
        return Err(ValidationError::new(
            "Score out of valid range (0-50)",
            "score",
            &score_value,
        ));
    }

    let answers_value = obj.get("answers").cloned().unwrap_or(Value::Null);
    let Some(answers) = answers_value.as_object() else {
        return Err(ValidationError::new("Invalid answers format", "answers", &answers_value));
    };

    if stage == 3 {
        for question in STAGE_QUESTIONS {
            let Some(answer_value) = answers.get(question) else {
                return Err(ValidationError::new(
                    format!("Missing required question: {question}"),
                    "answers",
                    &answers_value,
                ));
            };
            let Some(answer) = answer_value.as_str() else {
                return Err(ValidationError::new(
                    format!("Invalid answer type for {question}"),
                    question,
                    answer_value,
                ));
            };
            if !is_valid_answer_value(answer) {
                return Err(ValidationError::new(
                    format!("Invalid answer value for {question}"),
                    question,
                    answer_value,
                ));
            }
        }

        // Type checks on the embedded prior-stage fields come before the
        // range checks, matching the legacy validation order.
        let stage1_value = obj.get("stage1Score").cloned().unwrap_or(Value::Null);
        if stage1_value.as_f64().is_none() {
            return Err(ValidationError::new("Invalid stage1Score", "stage1Score", &stage1_value));
        }
        let stage2_value = obj.get("stage2Score").cloned().unwrap_or(Value::Null);
        if stage2_value.as_f64().is_none() {
            return Err(ValidationError::new("Invalid stage2Score", "stage2Score", &stage2_value));
        }
        let general_value = obj.get("isGeneral").cloned().unwrap_or(Value::Null);
        if general_value.as_bool().is_none() {
            return Err(ValidationError::new("Invalid isGeneral value", "isGeneral", &general_value));
        }

        let stage1_score = stage1_value.as_f64().unwrap_or(0.0);
        if stage1_score < MIN_STAGE_SCORE as f64 || stage1_score > MAX_STAGE_SCORE as f64 {
            return Err(ValidationError::new(
                "Stage1 score out of valid range",
                "stage1Score",
                &stage1_value,
            ));
        }
        let stage2_score = stage2_value.as_f64().unwrap_or(0.0);
        if stage2_score < MIN_STAGE_SCORE as f64 || stage2_score > MAX_STAGE_SCORE as f64 {
            return Err(ValidationError::new(
                "Stage2 score out of valid range",
                "stage2Score",
                &stage2_value,
            ));
        }
    }

    Ok(build_record(obj, score, answers))
}

/// Builds the typed record from validated JSON. Records are written through
/// the sanitizer, so scores are integral by the time they are read back;
/// non-string answer values on stages 1 and 2 are carried through as raw
/// JSON text (only stage 3 enforces the answer domain).
fn build_record(
    obj: &serde_json::Map<String, Value>,
    score: f64,
    answers: &serde_json::Map<String, Value>,
) -> StageRecord {
    let answers = answers
        .iter()
        .map(|(key, value)| {
            let value = value
                .as_str()
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| value.to_string());
            (key.clone(), value)
        })
        .collect();

    StageRecord {
        score: score as i64,
        answers,
        is_general: obj.get("isGeneral").and_then(Value::as_bool),
        stage1_score: obj.get("stage1Score").and_then(Value::as_f64).map(|s| s as i64),
        stage2_score: obj.get("stage2Score").and_then(Value::as_f64).map(|s| s as i64),
    }
}

/// Lenient answer-set check used when scoring with partial data.
///
/// Any subset of `ques*` keys is acceptable; every present value must come
/// from the answer domain, and any foreign key invalidates the whole set.
/// Returns a plain boolean rather than a reason, by contract.
pub fn validate_stage3_answers(answers: &HashMap<String, String>) -> bool {
    answers
        .iter()
        .all(|(key, value)| key.starts_with("ques") && is_valid_answer_value(value))
}

static ANSWER_KEY_SANITIZER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]").expect("static pattern"));

/// Total sanitizer: always yields a canonical record, whatever comes in.
///
/// Scores are floored then clamped to [0,50]; answer keys are stripped to
/// `[a-zA-Z0-9]`; answer values outside the domain collapse to "0"; the
/// route flag is coerced through truthiness.
///
/// Known quirk kept from the legacy client: the embedded stage-1/2 scores
/// survive only when truthy, so a legitimate 0 is indistinguishable from
/// absent.
pub fn sanitize_stage_data(data: &Value) -> StageRecord {
    static EMPTY: LazyLock<serde_json::Map<String, Value>> = LazyLock::new(serde_json::Map::new);
    let obj = data.as_object().unwrap_or(&EMPTY);

    let answers = obj
        .get("answers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(key, value)| {
                    let key = ANSWER_KEY_SANITIZER.replace_all(key, "").into_owned();
                    let value = value
                        .as_str()
                        .filter(|v| is_valid_answer_value(v))
                        .unwrap_or("0")
                        .to_string();
                    (key, value)
                })
                .collect()
        })
        .unwrap_or_default();

    StageRecord {
        score: clamp_score(obj.get("score")),
        answers,
        is_general: Some(truthy(obj.get("isGeneral"))),
        stage1_score: optional_truthy_score(obj.get("stage1Score")),
        stage2_score: optional_truthy_score(obj.get("stage2Score")),
    }
}

fn clamp_score(value: Option<&Value>) -> i64 {
    let raw = value.and_then(Value::as_f64).unwrap_or(0.0);
    (raw.floor() as i64).clamp(MIN_STAGE_SCORE, MAX_STAGE_SCORE)
}

/// JavaScript truthiness: false, 0, "" and null are falsy.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn optional_truthy_score(value: Option<&Value>) -> Option<i64> {
    if truthy(value) {
        Some(clamp_score(value))
    } else {
        None
    }
}

/// Final gate before classification: every score in range and, when an
/// answer set is supplied, every present slot value from the answer domain.
///
/// The gate takes the typed answer slots rather than the raw persisted map:
/// persisted stage-3 records may carry extra form keys the engine never
/// reads, and those must not block a diagnosis.
pub fn validate_diagnosis_inputs(
    stage1_score: i64,
    stage2_score: i64,
    stage3_score: i64,
    answers: Option<&Stage3Answers>,
) -> bool {
    let in_range =
        |score: i64| (MIN_STAGE_SCORE..=MAX_STAGE_SCORE).contains(&score);

    if !in_range(stage1_score) || !in_range(stage2_score) || !in_range(stage3_score) {
        return false;
    }

    if let Some(answers) = answers {
        if !validate_stage3_answers(&answers.to_map()) {
            return false;
        }
    }

    true
}
