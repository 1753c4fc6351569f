// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Inclusive bounds for a single stage's aggregate score.
pub const MIN_STAGE_SCORE: i64 = 0;
pub const MAX_STAGE_SCORE: i64 = 50;

/// Highest value a single question may contribute to a stage score.
pub const MAX_QUESTION_SCORE: i64 = 10;

/// The only answer values a question form is allowed to submit.
pub const VALID_ANSWER_VALUES: [&str; 5] = ["0", "3", "5", "7", "10"];

/// Question ids read from every stage form.
pub const STAGE_QUESTIONS: [&str; 5] = ["ques1", "ques2", "ques3", "ques4", "ques5"];

#[derive(Debug, Clone)]
pub struct Config {
    pub rust_log: String,
    pub environment: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            rust_log,
            environment,
            port,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
