use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::attendance::time_calc::AttendanceStatus;
use crate::models::attendance::AttendanceRecordRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub days: usize,
    pub present: usize,
    pub late: usize,
    pub half_day: usize,
    pub absent: usize,
    pub in_progress: usize,
    pub worked_minutes: i64,
    pub overtime_minutes: i64,
    pub total_hours: f64,
}

impl AttendanceSummary {
    fn add(&mut self, status: AttendanceStatus, worked_minutes: i64, overtime_minutes: i64) {
        self.days += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::HalfDay => self.half_day += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::InProgress => self.in_progress += 1,
        }
        self.worked_minutes += worked_minutes;
        self.overtime_minutes += overtime_minutes;
        self.total_hours = (self.worked_minutes as f64 / 60.0 * 100.0).round() / 100.0;
    }
}

/// Folds attendance rows into status counts and worked totals.
/// Rows with an unrecognised status are skipped.
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a AttendanceRecordRow>) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    for record in records {
        if let Ok(status) = record.status.parse::<AttendanceStatus>() {
            summary.add(status, record.worked_minutes, record.overtime_minutes);
        }
    }
    summary
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeAttendanceSummary {
    pub employee_id: Uuid,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

/// One summary per employee, ordered by employee id. Everyone in `roster`
/// is listed even without records; employees with records but no longer on
/// the roster are kept too.
pub fn summarize_by_employee(
    roster: impl IntoIterator<Item = Uuid>,
    records: &[AttendanceRecordRow],
) -> Vec<EmployeeAttendanceSummary> {
    let mut grouped: BTreeMap<Uuid, Vec<&AttendanceRecordRow>> =
        roster.into_iter().map(|id| (id, Vec::new())).collect();
    for record in records {
        grouped.entry(record.employee_id).or_default().push(record);
    }
    grouped
        .into_iter()
        .map(|(employee_id, rows)| EmployeeAttendanceSummary {
            employee_id,
            summary: summarize(rows),
        })
        .collect()
}
