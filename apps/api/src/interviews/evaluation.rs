//! Interview scoring and lifecycle rules.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

const HIRE_THRESHOLD: f64 = 4.0;
const CONSIDER_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Hire,
    Consider,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Hire => "hire",
            Recommendation::Consider => "consider",
            Recommendation::Reject => "reject",
        }
    }

    pub fn for_score(overall: f64) -> Self {
        if overall >= HIRE_THRESHOLD {
            Recommendation::Hire
        } else if overall >= CONSIDER_THRESHOLD {
            Recommendation::Consider
        } else {
            Recommendation::Reject
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub overall_score: f64,
    pub recommendation: Recommendation,
}

/// Mean of the criterion scores, rounded to two decimals.
pub fn evaluate(scores: &[CriterionScore]) -> Result<Evaluation, AppError> {
    if scores.is_empty() {
        return Err(AppError::Validation(
            "At least one criterion score is required".to_string(),
        ));
    }
    for s in scores {
        if s.criterion.trim().is_empty() {
            return Err(AppError::Validation("Criterion names cannot be empty".to_string()));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&s.score) {
            return Err(AppError::Validation(format!(
                "Score for '{}' must be between {MIN_SCORE} and {MAX_SCORE}",
                s.criterion
            )));
        }
    }
    let total: u32 = scores.iter().map(|s| u32::from(s.score)).sum();
    let mean = f64::from(total) / scores.len() as f64;
    let overall_score = (mean * 100.0).round() / 100.0;
    Ok(Evaluation {
        overall_score,
        recommendation: Recommendation::for_score(overall_score),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::NoShow => "no_show",
        }
    }

    /// Only a scheduled interview can change state, and never back to scheduled.
    pub fn transition_to(&self, next: InterviewStatus) -> Result<InterviewStatus, AppError> {
        if *self != InterviewStatus::Scheduled || next == InterviewStatus::Scheduled {
            return Err(AppError::Conflict(format!(
                "Cannot move interview from {} to {}",
                self.as_str(),
                next.as_str()
            )));
        }
        Ok(next)
    }
}

impl FromStr for InterviewStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(InterviewStatus::Scheduled),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            "no_show" => Ok(InterviewStatus::NoShow),
            other => Err(AppError::Validation(format!(
                "Unknown interview status '{other}'"
            ))),
        }
    }
}

pub fn validate_duration(minutes: i32) -> Result<(), AppError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(())
}

/// Half-open slots `[start, start + duration)`; back-to-back slots do not overlap.
pub fn slots_overlap(
    a_start: DateTime<Utc>,
    a_minutes: i32,
    b_start: DateTime<Utc>,
    b_minutes: i32,
) -> bool {
    let a_end = a_start + Duration::minutes(a_minutes.into());
    let b_end = b_start + Duration::minutes(b_minutes.into());
    a_start < b_end && b_start < a_end
}
