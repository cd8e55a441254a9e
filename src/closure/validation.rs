//! Step validators
//!
//! Run synchronously before any store call. A final review must carry a
//! whole-number completion within 0..=100 and enumerated weather/progress
//! values; an evaluation is always accepted, including with no content.

use crate::domain::{EvaluationData, FinalReviewData, FinalReviewInput, Progress, Weather};
use crate::error::{ClosureError, Result};

/// Upper bound of `completion`
pub const MAX_COMPLETION: u8 = 100;

/// Trim free text, dropping it entirely when nothing is left.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate_completion(completion: f64) -> Result<u8> {
    if !completion.is_finite() || completion.fract() != 0.0 {
        return Err(ClosureError::Validation(format!(
            "completion must be a whole number (got {})",
            completion
        )));
    }
    if !(0.0..=f64::from(MAX_COMPLETION)).contains(&completion) {
        return Err(ClosureError::Validation(format!(
            "completion must be between 0 and {} (got {})",
            MAX_COMPLETION, completion
        )));
    }
    Ok(completion as u8)
}

/// Validate a raw final review into its typed form.
pub fn validate_final_review(input: &FinalReviewInput) -> Result<FinalReviewData> {
    let completion = validate_completion(input.completion)?;
    let weather: Weather = input.weather.parse()?;
    let progress: Progress = input.progress.parse()?;

    Ok(FinalReviewData {
        weather,
        progress,
        completion,
        comment: normalize_text(input.comment.as_deref()),
        difficulties: normalize_text(input.difficulties.as_deref()),
    })
}

/// Normalize an evaluation. Never fails: an all-empty evaluation is valid.
pub fn validate_evaluation(data: &EvaluationData) -> EvaluationData {
    EvaluationData {
        what_worked: normalize_text(data.what_worked.as_deref()),
        what_was_missing: normalize_text(data.what_was_missing.as_deref()),
        improvements: normalize_text(data.improvements.as_deref()),
        lessons_learned: normalize_text(data.lessons_learned.as_deref()),
    }
}
