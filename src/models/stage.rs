// src/models/stage.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::config::STAGE_QUESTIONS;
use crate::models::author::Author;

/// One stage's persisted record.
///
/// Serialized into the session store with the legacy wire keys (`score`,
/// `answers`, `isGeneral`, `stage1Score`, `stage2Score`). Stage 3's record
/// embeds the prior two stages' scores and the route flag so they can be
/// cross-checked at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub score: i64,

    pub answers: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_general: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1_score: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage2_score: Option<i64>,
}

/// The five stage-3 answer slots.
///
/// Any subset may be present when scoring; persisting stage 3 requires all
/// five. Values are drawn from the fixed answer domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage3Answers {
    pub ques1: Option<String>,
    pub ques2: Option<String>,
    pub ques3: Option<String>,
    pub ques4: Option<String>,
    pub ques5: Option<String>,
}

impl Stage3Answers {
    /// Builds the answer set from a raw answer map, taking only the five
    /// known slots.
    pub fn from_map(answers: &HashMap<String, String>) -> Self {
        Self {
            ques1: answers.get("ques1").cloned(),
            ques2: answers.get("ques2").cloned(),
            ques3: answers.get("ques3").cloned(),
            ques4: answers.get("ques4").cloned(),
            ques5: answers.get("ques5").cloned(),
        }
    }

    /// Collects the present slots back into a question-id map.
    pub fn to_map(&self) -> HashMap<String, String> {
        STAGE_QUESTIONS
            .iter()
            .filter_map(|question| {
                self.get(question)
                    .map(|value| (question.to_string(), value.to_string()))
            })
            .collect()
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        match question {
            "ques1" => self.ques1.as_deref(),
            "ques2" => self.ques2.as_deref(),
            "ques3" => self.ques3.as_deref(),
            "ques4" => self.ques4.as_deref(),
            "ques5" => self.ques5.as_deref(),
            _ => None,
        }
    }
}

/// DTO for submitting one stage's form answers.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitStageRequest {
    /// Flat question-id to value map, as the form posts it.
    #[validate(custom(function = validate_answer_map))]
    pub answers: HashMap<String, String>,

    /// Route flag; authoritative only on stage 2.
    #[serde(default, rename = "isGeneral")]
    pub is_general: Option<bool>,
}

fn validate_answer_map(
    answers: &HashMap<String, String>,
) -> Result<(), validator::ValidationError> {
    if answers.len() > 20 {
        return Err(validator::ValidationError::new("too_many_answers"));
    }
    for (key, value) in answers {
        if key.len() > 32 {
            return Err(validator::ValidationError::new("answer_key_too_long"));
        }
        if value.len() > 8 {
            return Err(validator::ValidationError::new("answer_value_too_long"));
        }
    }
    Ok(())
}

/// DTO returned after a stage submission.
#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub stage: u8,
    pub score: i64,
}

/// DTO returned by the result endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResponse {
    pub author: &'static Author,
    pub stage1_score: i64,
    pub stage2_score: i64,
    pub stage3_score: i64,
    pub is_general: bool,
}
