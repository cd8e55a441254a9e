//! Retrospective data captured while closing a project
//!
//! The final review is the level-1 retrospective (outcome summary); the method
//! evaluation is the level-2 retrospective (process feedback) and may be
//! deferred to a later session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClosureError;

/// Overall mood of the project at closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Sunny,
    Cloudy,
    Stormy,
}

/// Trend of the project over its last period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Better,
    Stable,
    Worse,
}

impl Weather {
    pub const ALL: [Weather; 3] = [Weather::Sunny, Weather::Cloudy, Weather::Stormy];

    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Cloudy => "cloudy",
            Weather::Stormy => "stormy",
        }
    }
}

impl Progress {
    pub const ALL: [Progress; 3] = [Progress::Better, Progress::Stable, Progress::Worse];

    pub fn as_str(self) -> &'static str {
        match self {
            Progress::Better => "better",
            Progress::Stable => "stable",
            Progress::Worse => "worse",
        }
    }
}

impl FromStr for Weather {
    type Err = ClosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weather::ALL
            .into_iter()
            .find(|w| w.as_str() == s.trim())
            .ok_or_else(|| {
                ClosureError::Validation(format!(
                    "weather must be one of sunny, cloudy, stormy (got '{}')",
                    s
                ))
            })
    }
}

impl FromStr for Progress {
    type Err = ClosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Progress::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                ClosureError::Validation(format!(
                    "progress must be one of better, stable, worse (got '{}')",
                    s
                ))
            })
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw final review as entered on the form, before validation.
///
/// `completion` is a float so fractional input can be detected and rejected
/// instead of silently truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReviewInput {
    pub weather: String,
    pub progress: String,
    pub completion: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub difficulties: Option<String>,
}

impl FinalReviewInput {
    pub fn new(weather: &str, progress: &str, completion: f64) -> Self {
        Self {
            weather: weather.to_string(),
            progress: progress.to_string(),
            completion,
            comment: None,
            difficulties: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn with_difficulties(mut self, difficulties: &str) -> Self {
        self.difficulties = Some(difficulties.to_string());
        self
    }
}

/// Validated level-1 retrospective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReviewData {
    pub weather: Weather,
    pub progress: Progress,
    /// Percentage of the scope delivered, 0..=100
    pub completion: u8,
    pub comment: Option<String>,
    pub difficulties: Option<String>,
}

/// Level-2 retrospective. Every field is optional, an all-empty evaluation is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationData {
    pub what_worked: Option<String>,
    pub what_was_missing: Option<String>,
    pub improvements: Option<String>,
    pub lessons_learned: Option<String>,
}

impl EvaluationData {
    /// True when no field carries any text
    pub fn is_empty(&self) -> bool {
        [
            &self.what_worked,
            &self.what_was_missing,
            &self.improvements,
            &self.lessons_learned,
        ]
        .iter()
        .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Persisted final review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReviewRecord {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub data: FinalReviewData,
    pub created_at: DateTime<Utc>,
}

/// Persisted method evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub data: EvaluationData,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_parse() {
        assert_eq!("sunny".parse::<Weather>().unwrap(), Weather::Sunny);
        assert_eq!(" stormy ".parse::<Weather>().unwrap(), Weather::Stormy);
        assert!(matches!(
            "rainy".parse::<Weather>(),
            Err(ClosureError::Validation(_))
        ));
    }

    #[test]
    fn test_progress_parse() {
        assert_eq!("worse".parse::<Progress>().unwrap(), Progress::Worse);
        assert!("Better".parse::<Progress>().is_err());
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Weather::Cloudy).unwrap(), "\"cloudy\"");
        assert_eq!(serde_json::to_string(&Progress::Stable).unwrap(), "\"stable\"");
    }

    #[test]
    fn test_evaluation_is_empty() {
        assert!(EvaluationData::default().is_empty());

        let blank = EvaluationData {
            what_worked: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.is_empty());

        let filled = EvaluationData {
            lessons_learned: Some("Plan the migration earlier".to_string()),
            ..Default::default()
        };
        assert!(!filled.is_empty());
    }

    #[test]
    fn test_review_record_flattens_data() {
        let record = FinalReviewRecord {
            id: "rev-1".to_string(),
            project_id: "prj-1".to_string(),
            data: FinalReviewData {
                weather: Weather::Sunny,
                progress: Progress::Better,
                completion: 100,
                comment: None,
                difficulties: None,
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["weather"], "sunny");
        assert_eq!(json["completion"], 100);

        let parsed: FinalReviewRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
