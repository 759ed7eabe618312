//! Attendance time arithmetic.
//!
//! Everything here is pure: timestamps and a policy in, durations and a
//! status out. Handlers load a record, apply one clock action to a
//! [`Shift`], evaluate it and persist the result.

use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq)]
pub enum TimeCalcError {
    #[error("check-out must not be earlier than check-in")]
    CheckOutBeforeCheckIn,

    #[error("a break cannot end before it starts")]
    BreakEndsBeforeStart,

    #[error("a break is already in progress")]
    BreakAlreadyOpen,

    #[error("no break is in progress")]
    NoOpenBreak,

    #[error("not checked in yet")]
    NotCheckedIn,

    #[error("already checked in")]
    AlreadyCheckedIn,

    #[error("already checked out")]
    AlreadyCheckedOut,

    #[error("timestamp is earlier than the shift start")]
    BeforeShiftStart,

    #[error("check-in falls on {actual}, but the record is for {expected}")]
    WrongWorkDate {
        expected: NaiveDate,
        actual: NaiveDate,
    },

    #[error("the shift of {0} is still open; check out first")]
    OpenShiftElsewhere(NaiveDate),

    #[error("invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),

    #[error("invalid attendance policy: {0}")]
    InvalidPolicy(String),
}

impl From<TimeCalcError> for AppError {
    fn from(err: TimeCalcError) -> Self {
        match err {
            TimeCalcError::AlreadyCheckedIn
            | TimeCalcError::AlreadyCheckedOut
            | TimeCalcError::OpenShiftElsewhere(_) => {
                AppError::Conflict(err.to_string())
            }
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Company rules used to classify a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePolicy {
    pub work_start: NaiveTime,
    pub late_grace_minutes: i64,
    pub half_day_minutes: i64,
    pub full_day_minutes: i64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            late_grace_minutes: 15,
            half_day_minutes: 240,
            full_day_minutes: 480,
        }
    }
}

impl AttendancePolicy {
    pub fn validate(&self) -> Result<(), TimeCalcError> {
        if self.late_grace_minutes < 0 {
            return Err(TimeCalcError::InvalidPolicy(
                "late grace must not be negative".to_string(),
            ));
        }
        if self.half_day_minutes <= 0 || self.full_day_minutes <= 0 {
            return Err(TimeCalcError::InvalidPolicy(
                "day thresholds must be positive".to_string(),
            ));
        }
        if self.half_day_minutes >= self.full_day_minutes {
            return Err(TimeCalcError::InvalidPolicy(
                "half-day threshold must be below the full-day threshold".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
    InProgress,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::HalfDay,
        AttendanceStatus::Absent,
        AttendanceStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::HalfDay => "half_day",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::InProgress => "in_progress",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown attendance status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPeriod {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl BreakPeriod {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkedTime {
    pub gross_minutes: i64,
    pub break_minutes: i64,
    pub worked_minutes: i64,
    pub overtime_minutes: i64,
    pub total_hours: f64,
}

impl WorkedTime {
    pub const ZERO: WorkedTime = WorkedTime {
        gross_minutes: 0,
        break_minutes: 0,
        worked_minutes: 0,
        overtime_minutes: 0,
        total_hours: 0.0,
    };
}

/// Seconds of break time inside `[window_start, window_end]`.
///
/// Breaks are clipped to the window, open breaks run until `window_end`,
/// and overlapping breaks are merged so no second is counted twice.
pub fn break_seconds(
    breaks: &[BreakPeriod],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> i64 {
    let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = breaks
        .iter()
        .map(|b| {
            let start = b.start.max(window_start);
            let end = b.end.unwrap_or(window_end).min(window_end);
            (start, end)
        })
        .filter(|(start, end)| end > start)
        .collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut total = 0;
    let mut current: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for (start, end) in spans {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                total += (cur_end - cur_start).num_seconds();
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cur_start, cur_end)) = current {
        total += (cur_end - cur_start).num_seconds();
    }
    total
}

/// Minutes of break time inside the window. See [`break_seconds`].
pub fn break_minutes(
    breaks: &[BreakPeriod],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> i64 {
    break_seconds(breaks, window_start, window_end) / 60
}

pub fn compute_worked_time(
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    breaks: &[BreakPeriod],
    policy: &AttendancePolicy,
) -> Result<WorkedTime, TimeCalcError> {
    if check_out < check_in {
        return Err(TimeCalcError::CheckOutBeforeCheckIn);
    }
    let gross_seconds = (check_out - check_in).num_seconds();
    let break_secs = break_seconds(breaks, check_in, check_out);
    let worked_seconds = (gross_seconds - break_secs).max(0);
    let worked_minutes = worked_seconds / 60;

    Ok(WorkedTime {
        gross_minutes: gross_seconds / 60,
        break_minutes: break_secs / 60,
        worked_minutes,
        overtime_minutes: (worked_minutes - policy.full_day_minutes).max(0),
        total_hours: round_hours(worked_minutes),
    })
}

fn round_hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

fn offset(utc_offset_minutes: i32) -> Result<FixedOffset, TimeCalcError> {
    FixedOffset::east_opt(utc_offset_minutes * 60)
        .ok_or(TimeCalcError::InvalidOffset(utc_offset_minutes))
}

/// The company-local calendar day an instant falls on.
pub fn local_work_date(
    at: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> Result<NaiveDate, TimeCalcError> {
    Ok(at.with_timezone(&offset(utc_offset_minutes)?).date_naive())
}

/// A new check-in on `work_date` is refused while a shift from another day
/// is still open.
pub fn ensure_no_other_open_shift(
    open_shift_date: Option<NaiveDate>,
    work_date: NaiveDate,
) -> Result<(), TimeCalcError> {
    match open_shift_date {
        Some(open) if open != work_date => Err(TimeCalcError::OpenShiftElsewhere(open)),
        _ => Ok(()),
    }
}

/// True when the local check-in is strictly after work start plus grace.
pub fn is_late(
    check_in: DateTime<Utc>,
    policy: &AttendancePolicy,
    utc_offset_minutes: i32,
) -> Result<bool, TimeCalcError> {
    let local = check_in
        .with_timezone(&offset(utc_offset_minutes)?)
        .naive_local();
    let deadline =
        local.date().and_time(policy.work_start) + Duration::minutes(policy.late_grace_minutes);
    Ok(local > deadline)
}

pub fn classify(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    worked_minutes: i64,
    late: bool,
    policy: &AttendancePolicy,
) -> AttendanceStatus {
    match (check_in, check_out) {
        (None, _) => AttendanceStatus::Absent,
        (Some(_), None) => AttendanceStatus::InProgress,
        (Some(_), Some(_)) if worked_minutes < policy.half_day_minutes => AttendanceStatus::HalfDay,
        (Some(_), Some(_)) if late => AttendanceStatus::Late,
        _ => AttendanceStatus::Present,
    }
}

/// Derived fields of one attendance day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayEvaluation {
    pub status: AttendanceStatus,
    pub worked: WorkedTime,
}

/// The clock state of one employee-day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shift {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub breaks: Vec<BreakPeriod>,
}

impl Shift {
    pub fn check_in(&mut self, at: DateTime<Utc>) -> Result<(), TimeCalcError> {
        if self.check_in.is_some() {
            return Err(TimeCalcError::AlreadyCheckedIn);
        }
        self.check_in = Some(at);
        Ok(())
    }

    pub fn start_break(&mut self, at: DateTime<Utc>) -> Result<(), TimeCalcError> {
        let check_in = self.ensure_open()?;
        if at < check_in {
            return Err(TimeCalcError::BeforeShiftStart);
        }
        if self.open_break().is_some() {
            return Err(TimeCalcError::BreakAlreadyOpen);
        }
        self.breaks.push(BreakPeriod {
            start: at,
            end: None,
        });
        Ok(())
    }

    pub fn end_break(&mut self, at: DateTime<Utc>) -> Result<(), TimeCalcError> {
        self.ensure_open()?;
        let open = self
            .breaks
            .iter_mut()
            .find(|b| b.is_open())
            .ok_or(TimeCalcError::NoOpenBreak)?;
        if at < open.start {
            return Err(TimeCalcError::BreakEndsBeforeStart);
        }
        open.end = Some(at);
        Ok(())
    }

    /// Checks out, closing any open break at the same instant.
    pub fn check_out(&mut self, at: DateTime<Utc>) -> Result<(), TimeCalcError> {
        let check_in = self.ensure_open()?;
        if at < check_in {
            return Err(TimeCalcError::CheckOutBeforeCheckIn);
        }
        for b in self.breaks.iter_mut().filter(|b| b.is_open()) {
            b.end = Some(at.max(b.start));
        }
        self.check_out = Some(at);
        Ok(())
    }

    /// Checks a manually corrected shift for consistency.
    pub fn validate(&self) -> Result<(), TimeCalcError> {
        if self.check_in.is_none() && (self.check_out.is_some() || !self.breaks.is_empty()) {
            return Err(TimeCalcError::NotCheckedIn);
        }
        if let (Some(check_in), Some(check_out)) = (self.check_in, self.check_out) {
            if check_out < check_in {
                return Err(TimeCalcError::CheckOutBeforeCheckIn);
            }
        }
        let mut open_breaks = 0;
        for b in &self.breaks {
            if let Some(end) = b.end {
                if end < b.start {
                    return Err(TimeCalcError::BreakEndsBeforeStart);
                }
            } else {
                open_breaks += 1;
            }
            if self.check_in.is_some_and(|check_in| b.start < check_in) {
                return Err(TimeCalcError::BeforeShiftStart);
            }
        }
        if open_breaks > 1 || (open_breaks == 1 && self.check_out.is_some()) {
            return Err(TimeCalcError::BreakAlreadyOpen);
        }
        Ok(())
    }

    /// The check-in, if any, must fall on the record's local work date.
    pub fn ensure_work_date(
        &self,
        work_date: NaiveDate,
        utc_offset_minutes: i32,
    ) -> Result<(), TimeCalcError> {
        if let Some(check_in) = self.check_in {
            let actual = local_work_date(check_in, utc_offset_minutes)?;
            if actual != work_date {
                return Err(TimeCalcError::WrongWorkDate {
                    expected: work_date,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn open_break(&self) -> Option<&BreakPeriod> {
        self.breaks.iter().find(|b| b.is_open())
    }

    pub fn evaluate(
        &self,
        policy: &AttendancePolicy,
        utc_offset_minutes: i32,
    ) -> Result<DayEvaluation, TimeCalcError> {
        let worked = match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                compute_worked_time(check_in, check_out, &self.breaks, policy)?
            }
            _ => WorkedTime::ZERO,
        };
        let late = match self.check_in {
            Some(check_in) => is_late(check_in, policy, utc_offset_minutes)?,
            None => false,
        };
        Ok(DayEvaluation {
            status: classify(
                self.check_in,
                self.check_out,
                worked.worked_minutes,
                late,
                policy,
            ),
            worked,
        })
    }

    fn ensure_open(&self) -> Result<DateTime<Utc>, TimeCalcError> {
        if self.check_out.is_some() {
            return Err(TimeCalcError::AlreadyCheckedOut);
        }
        self.check_in.ok_or(TimeCalcError::NotCheckedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> BreakPeriod {
        BreakPeriod {
            start,
            end: Some(end),
        }
    }

    #[test]
    fn test_worked_time_subtracts_breaks() {
        let policy = AttendancePolicy::default();
        let breaks = [closed(at(13, 0), at(14, 0))];
        let worked = compute_worked_time(at(9, 0), at(18, 0), &breaks, &policy).unwrap();
        assert_eq!(worked.gross_minutes, 540);
        assert_eq!(worked.break_minutes, 60);
        assert_eq!(worked.worked_minutes, 480);
        assert_eq!(worked.overtime_minutes, 0);
        assert!((worked.total_hours - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overtime_beyond_full_day() {
        let policy = AttendancePolicy::default();
        let worked = compute_worked_time(at(8, 0), at(18, 30), &[], &policy).unwrap();
        assert_eq!(worked.worked_minutes, 630);
        assert_eq!(worked.overtime_minutes, 150);
        assert!((worked.total_hours - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_total_hours_rounded_to_two_decimals() {
        let policy = AttendancePolicy::default();
        let worked = compute_worked_time(at(9, 0), at(9, 20), &[], &policy).unwrap();
        assert!((worked.total_hours - 0.33).abs() < f64::EPSILON);
    }

    #[test]
    fn test_check_out_before_check_in_rejected() {
        let policy = AttendancePolicy::default();
        assert_eq!(
            compute_worked_time(at(10, 0), at(9, 0), &[], &policy),
            Err(TimeCalcError::CheckOutBeforeCheckIn)
        );
    }

    #[test]
    fn test_overlapping_breaks_counted_once() {
        let breaks = [
            closed(at(12, 0), at(13, 0)),
            closed(at(12, 30), at(13, 30)),
            closed(at(15, 0), at(15, 10)),
        ];
        assert_eq!(break_minutes(&breaks, at(9, 0), at(18, 0)), 100);
    }

    #[test]
    fn test_breaks_clipped_to_window() {
        let breaks = [closed(at(8, 0), at(9, 30)), closed(at(17, 45), at(19, 0))];
        assert_eq!(break_minutes(&breaks, at(9, 0), at(18, 0)), 45);
    }

    #[test]
    fn test_open_break_runs_until_window_end() {
        let breaks = [BreakPeriod {
            start: at(17, 0),
            end: None,
        }];
        assert_eq!(break_minutes(&breaks, at(9, 0), at(18, 0)), 60);
    }

    #[test]
    fn test_breaks_longer_than_shift_floor_at_zero() {
        let policy = AttendancePolicy::default();
        let breaks = [closed(at(8, 0), at(20, 0))];
        let worked = compute_worked_time(at(9, 0), at(10, 0), &breaks, &policy).unwrap();
        assert_eq!(worked.worked_minutes, 0);
    }

    #[test]
    fn test_late_after_grace() {
        let policy = AttendancePolicy::default();
        assert!(!is_late(at(9, 15), &policy, 0).unwrap());
        assert!(is_late(at(9, 16), &policy, 0).unwrap());
    }

    #[test]
    fn test_late_uses_company_offset() {
        let policy = AttendancePolicy::default();
        // 14:30 UTC is 09:30 at UTC-5.
        assert!(is_late(at(14, 30), &policy, -300).unwrap());
        // 14:30 UTC is 08:30 at UTC-6.
        assert!(!is_late(at(14, 30), &policy, -360).unwrap());
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let policy = AttendancePolicy::default();
        assert_eq!(
            is_late(at(9, 0), &policy, 24 * 60),
            Err(TimeCalcError::InvalidOffset(1440))
        );
    }

    #[test]
    fn test_local_work_date_crosses_midnight() {
        let late_evening = Utc.with_ymd_and_hms(2024, 3, 4, 23, 30, 0).unwrap();
        assert_eq!(
            local_work_date(late_evening, 60).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            local_work_date(late_evening, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
    }

    #[test]
    fn test_classify_matrix() {
        let p = AttendancePolicy::default();
        assert_eq!(classify(None, None, 0, false, &p), AttendanceStatus::Absent);
        assert_eq!(
            classify(Some(at(9, 0)), None, 0, true, &p),
            AttendanceStatus::InProgress
        );
        assert_eq!(
            classify(Some(at(9, 0)), Some(at(12, 0)), 180, false, &p),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            classify(Some(at(9, 0)), Some(at(12, 0)), 180, true, &p),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            classify(Some(at(10, 0)), Some(at(18, 0)), 480, true, &p),
            AttendanceStatus::Late
        );
        assert_eq!(
            classify(Some(at(9, 0)), Some(at(17, 0)), 480, false, &p),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn test_half_day_threshold_is_exclusive() {
        let p = AttendancePolicy::default();
        assert_eq!(
            classify(Some(at(9, 0)), Some(at(13, 0)), 240, false, &p),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn test_shift_full_day_flow() {
        let policy = AttendancePolicy::default();
        let mut shift = Shift::default();
        shift.check_in(at(9, 5)).unwrap();
        shift.start_break(at(13, 0)).unwrap();
        shift.end_break(at(13, 45)).unwrap();
        shift.check_out(at(17, 50)).unwrap();

        let day = shift.evaluate(&policy, 0).unwrap();
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.worked.worked_minutes, 480);
        assert_eq!(day.worked.break_minutes, 45);
    }

    #[test]
    fn test_shift_check_out_closes_open_break() {
        let mut shift = Shift::default();
        shift.check_in(at(9, 0)).unwrap();
        shift.start_break(at(16, 0)).unwrap();
        shift.check_out(at(17, 0)).unwrap();
        assert!(shift.open_break().is_none());
        assert_eq!(shift.breaks[0].end, Some(at(17, 0)));
        let day = shift.evaluate(&AttendancePolicy::default(), 0).unwrap();
        assert_eq!(day.worked.worked_minutes, 420);
    }

    #[test]
    fn test_shift_rejects_out_of_order_actions() {
        let mut shift = Shift::default();
        assert_eq!(shift.start_break(at(9, 0)), Err(TimeCalcError::NotCheckedIn));
        assert_eq!(shift.check_out(at(9, 0)), Err(TimeCalcError::NotCheckedIn));

        shift.check_in(at(9, 0)).unwrap();
        assert_eq!(shift.check_in(at(9, 1)), Err(TimeCalcError::AlreadyCheckedIn));
        assert_eq!(shift.end_break(at(10, 0)), Err(TimeCalcError::NoOpenBreak));
        assert_eq!(
            shift.start_break(at(8, 0)),
            Err(TimeCalcError::BeforeShiftStart)
        );

        shift.start_break(at(12, 0)).unwrap();
        assert_eq!(
            shift.start_break(at(12, 5)),
            Err(TimeCalcError::BreakAlreadyOpen)
        );
        assert_eq!(
            shift.end_break(at(11, 0)),
            Err(TimeCalcError::BreakEndsBeforeStart)
        );

        shift.check_out(at(17, 0)).unwrap();
        assert_eq!(
            shift.start_break(at(17, 30)),
            Err(TimeCalcError::AlreadyCheckedOut)
        );
    }

    #[test]
    fn test_in_progress_shift_has_no_worked_time() {
        let mut shift = Shift::default();
        shift.check_in(at(9, 30)).unwrap();
        let day = shift.evaluate(&AttendancePolicy::default(), 0).unwrap();
        assert_eq!(day.status, AttendanceStatus::InProgress);
        assert_eq!(day.worked, WorkedTime::ZERO);
    }

    #[test]
    fn test_validate_corrected_shift() {
        let mut shift = Shift {
            check_in: Some(at(9, 0)),
            check_out: Some(at(17, 0)),
            breaks: vec![BreakPeriod {
                start: at(12, 0),
                end: None,
            }],
        };
        assert_eq!(shift.validate(), Err(TimeCalcError::BreakAlreadyOpen));

        shift.breaks[0].end = Some(at(12, 30));
        assert!(shift.validate().is_ok());

        shift.check_in = None;
        assert_eq!(shift.validate(), Err(TimeCalcError::NotCheckedIn));
    }

    #[test]
    fn test_policy_validation() {
        assert!(AttendancePolicy::default().validate().is_ok());
        let bad = AttendancePolicy {
            half_day_minutes: 480,
            ..AttendancePolicy::default()
        };
        assert!(bad.validate().is_err());
        let negative_grace = AttendancePolicy {
            late_grace_minutes: -1,
            ..AttendancePolicy::default()
        };
        assert!(negative_grace.validate().is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in AttendanceStatus::ALL {
            assert_eq!(status.as_str().parse::<AttendanceStatus>().unwrap(), status);
        }
        assert!("sick".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_corrected_check_in_must_stay_on_the_record_day() {
        let record_day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let moved = Shift {
            check_in: Some(Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap()),
            ..Shift::default()
        };
        assert_eq!(
            moved.ensure_work_date(record_day, 0),
            Err(TimeCalcError::WrongWorkDate {
                expected: record_day,
                actual: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            })
        );

        let same_day = Shift {
            check_in: Some(at(9, 0)),
            ..Shift::default()
        };
        assert!(same_day.ensure_work_date(record_day, 0).is_ok());
        assert!(Shift::default().ensure_work_date(record_day, 0).is_ok());
    }

    #[test]
    fn test_work_date_check_uses_company_offset() {
        // 23:30 UTC on the 3rd is already the 4th at UTC+1.
        let late_utc = Shift {
            check_in: Some(Utc.with_ymd_and_hms(2024, 3, 3, 23, 30, 0).unwrap()),
            ..Shift::default()
        };
        let record_day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(late_utc.ensure_work_date(record_day, 60).is_ok());
        assert!(late_utc.ensure_work_date(record_day, 0).is_err());
    }

    #[test]
    fn test_check_in_refused_while_another_day_is_open() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            ensure_no_other_open_shift(Some(yesterday), today),
            Err(TimeCalcError::OpenShiftElsewhere(yesterday))
        );
        assert!(ensure_no_other_open_shift(Some(today), today).is_ok());
        assert!(ensure_no_other_open_shift(None, today).is_ok());
        assert!(matches!(
            AppError::from(TimeCalcError::OpenShiftElsewhere(yesterday)),
            AppError::Conflict(_)
        ));
    }
}
