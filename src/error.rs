// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use url::Url;

/// Closed error taxonomy for the diagnosis flow.
///
/// Every failure that reaches the surface is classified as one of these
/// kinds; each kind carries a fixed user-facing message and recovery hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisErrorCode {
    InvalidSessionData,
    MissingStageData,
    ValidationFailed,
    IntegrityCheckFailed,
    DiagnosisCalculationFailed,
    UnknownError,
}

impl DiagnosisErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSessionData => "INVALID_SESSION_DATA",
            Self::MissingStageData => "MISSING_STAGE_DATA",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::IntegrityCheckFailed => "INTEGRITY_CHECK_FAILED",
            Self::DiagnosisCalculationFailed => "DIAGNOSIS_CALCULATION_FAILED",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// Central application error.
///
/// The context payload (field names, offending values) is meant for
/// diagnostics: it ends up in the logs, never in a response body.
#[derive(Debug)]
pub struct DiagnosisError {
    pub code: DiagnosisErrorCode,
    pub message: String,
    pub context: Option<serde_json::Value>,
}

impl DiagnosisError {
    pub fn new(code: DiagnosisErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(
        code: DiagnosisErrorCode,
        message: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            context: Some(context),
        }
    }
}

impl fmt::Display for DiagnosisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for DiagnosisError {}

/// Recovery hints handed to the presentation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecoveryOptions {
    pub can_retry: bool,
    pub suggested_action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<&'static str>,
}

/// Fixed user-facing message per error kind.
pub fn user_message(code: DiagnosisErrorCode) -> &'static str {
    match code {
        DiagnosisErrorCode::InvalidSessionData => {
            "診断データに問題があります。最初からやり直してください。"
        }
        DiagnosisErrorCode::MissingStageData => {
            "診断の進行状況が見つかりません。最初からやり直してください。"
        }
        DiagnosisErrorCode::ValidationFailed => {
            "入力データに不正な値が含まれています。正しく回答してください。"
        }
        DiagnosisErrorCode::IntegrityCheckFailed => {
            "診断データの整合性に問題があります。最初からやり直してください。"
        }
        DiagnosisErrorCode::DiagnosisCalculationFailed => {
            "診断結果の計算中にエラーが発生しました。もう一度お試しください。"
        }
        DiagnosisErrorCode::UnknownError => {
            "予期しないエラーが発生しました。しばらく待ってからもう一度お試しください。"
        }
    }
}

/// Recovery options per error kind. Non-retryable kinds send the user back
/// to the start of the quiz.
pub fn recovery_options(code: DiagnosisErrorCode) -> ErrorRecoveryOptions {
    match code {
        DiagnosisErrorCode::InvalidSessionData
        | DiagnosisErrorCode::MissingStageData
        | DiagnosisErrorCode::IntegrityCheckFailed => ErrorRecoveryOptions {
            can_retry: false,
            suggested_action: "最初から診断をやり直してください",
            redirect_url: Some("/test"),
        },
        DiagnosisErrorCode::ValidationFailed => ErrorRecoveryOptions {
            can_retry: true,
            suggested_action: "回答を確認して再度送信してください",
            redirect_url: Some("/test3"),
        },
        DiagnosisErrorCode::DiagnosisCalculationFailed => ErrorRecoveryOptions {
            can_retry: true,
            suggested_action: "ページを再読み込みしてください",
            redirect_url: None,
        },
        DiagnosisErrorCode::UnknownError => ErrorRecoveryOptions {
            can_retry: true,
            suggested_action: "しばらく待ってからもう一度お試しください",
            redirect_url: Some("/"),
        },
    }
}

/// Validates a redirect target before it reaches the client.
///
/// Same-origin paths pass as-is; absolute URLs must parse as http(s).
/// Anything else (protocol-relative, javascript:, garbage) falls back.
pub fn safe_redirect_target(target: &str, fallback: &str) -> String {
    if target.starts_with('/') && !target.starts_with("//") {
        return target.to_string();
    }

    match Url::parse(target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => target.to_string(),
        _ => fallback.to_string(),
    }
}

/// Implements `IntoResponse` for `DiagnosisError`.
///
/// The single point where caught failures become HTTP responses: the body
/// carries the fixed user message plus recovery hints, the raw context goes
/// to the logs only.
impl IntoResponse for DiagnosisError {
    fn into_response(self) -> Response {
        let status = match self.code {
            DiagnosisErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            DiagnosisErrorCode::MissingStageData => StatusCode::NOT_FOUND,
            DiagnosisErrorCode::InvalidSessionData | DiagnosisErrorCode::IntegrityCheckFailed => {
                StatusCode::CONFLICT
            }
            DiagnosisErrorCode::DiagnosisCalculationFailed | DiagnosisErrorCode::UnknownError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(
                code = self.code.as_str(),
                context = ?self.context,
                at = %chrono::Utc::now().to_rfc3339(),
                "{}",
                self.message
            );
        } else {
            tracing::warn!(
                code = self.code.as_str(),
                context = ?self.context,
                at = %chrono::Utc::now().to_rfc3339(),
                "{}",
                self.message
            );
        }

        let recovery = recovery_options(self.code);
        let redirect_url = recovery
            .redirect_url
            .map(|url| safe_redirect_target(url, "/"));

        let body = Json(json!({
            "error": user_message(self.code),
            "code": self.code.as_str(),
            "canRetry": recovery.can_retry,
            "suggestedAction": recovery.suggested_action,
            "redirectUrl": redirect_url,
        }));

        (status, body).into_response()
    }
}

/// Converts `serde_json::Error` into an invalid-session-data error.
/// Allows using `?` on (de)serialization of stage records.
impl From<serde_json::Error> for DiagnosisError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosisError::with_context(
            DiagnosisErrorCode::InvalidSessionData,
            "Invalid session data format",
            json!({ "originalError": err.to_string() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds_redirect_to_start() {
        for code in [
            DiagnosisErrorCode::InvalidSessionData,
            DiagnosisErrorCode::MissingStageData,
            DiagnosisErrorCode::IntegrityCheckFailed,
        ] {
            let recovery = recovery_options(code);
            assert!(!recovery.can_retry);
            assert_eq!(recovery.redirect_url, Some("/test"));
        }
    }

    #[test]
    fn test_validation_failure_returns_to_stage3_form() {
        let recovery = recovery_options(DiagnosisErrorCode::ValidationFailed);
        assert!(recovery.can_retry);
        assert_eq!(recovery.redirect_url, Some("/test3"));
    }

    #[test]
    fn test_calculation_failure_suggests_reload_without_redirect() {
        let recovery = recovery_options(DiagnosisErrorCode::DiagnosisCalculationFailed);
        assert!(recovery.can_retry);
        assert_eq!(recovery.redirect_url, None);
    }

    #[test]
    fn test_safe_redirect_accepts_paths_and_https() {
        assert_eq!(safe_redirect_target("/test", "/"), "/test");
        assert_eq!(
            safe_redirect_target("https://example.com/done", "/"),
            "https://example.com/done"
        );
    }

    #[test]
    fn test_safe_redirect_rejects_unsafe_targets() {
        assert_eq!(safe_redirect_target("//evil.example", "/"), "/");
        assert_eq!(safe_redirect_target("javascript:alert(1)", "/"), "/");
        assert_eq!(safe_redirect_target("not a url", "/"), "/");
    }
}
