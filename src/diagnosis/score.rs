// src/diagnosis/score.rs

use std::collections::HashMap;

use crate::config::{MAX_QUESTION_SCORE, MAX_STAGE_SCORE, MIN_STAGE_SCORE};

/// Accumulates one stage's score from a flat form map.
///
/// Each listed question contributes its integer value. Missing or
/// unparsable entries count as 0, and per-question values outside [0,10]
/// are rejected per-question (counted as 0) rather than summed. The total
/// is clamped to the stage score range.
pub fn accumulate_score(form: &HashMap<String, String>, questions: &[&str]) -> i64 {
    let total: i64 = questions
        .iter()
        .map(|question| {
            form.get(*question)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .filter(|value| (0..=MAX_QUESTION_SCORE).contains(value))
                .unwrap_or(0)
        })
        .sum();

    total.clamp(MIN_STAGE_SCORE, MAX_STAGE_SCORE)
}
