use log::error;
use serde_json::Value as JsonValue;

use crate::api::SisterApi;

pub const DEFAULT_REVIEW_LANGUAGE: &str = "python";
pub const CODE_REVIEW_FALLBACK_TEXT: &str =
    "お兄ちゃん、コードレビューでエラーが発生しちゃった...ごめんね。";
pub const SUGGESTION_FALLBACK_TEXT: &str =
    "お兄ちゃん、提案を考えるのにちょっと時間がかかっちゃう...待ってて。";

/// Asks the backend to review `code`. Any failure yields the fixed apology.
pub async fn request_code_review(api: &dyn SisterApi, code: &str, language: Option<&str>) -> String {
    let language = language.unwrap_or(DEFAULT_REVIEW_LANGUAGE);
    match api.code_review(code, language).await {
        Ok(review) => review,
        Err(e) => {
            error!("Code review error: {}", e);
            CODE_REVIEW_FALLBACK_TEXT.to_string()
        }
    }
}

pub async fn request_suggestion(api: &dyn SisterApi, project_info: &JsonValue) -> String {
    match api.suggestion(project_info).await {
        Ok(suggestion) => suggestion,
        Err(e) => {
            error!("Suggestion error: {}", e);
            SUGGESTION_FALLBACK_TEXT.to_string()
        }
    }
}
