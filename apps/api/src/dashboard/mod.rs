//! Role-specific dashboards and company reports.

pub mod handlers;

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::payroll::PayrollRow;
use crate::payroll::calc::PayrollError;

/// First and last day of a `YYYY-MM` month.
pub fn parse_month(month: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let invalid = || AppError::Validation(format!("Invalid month '{month}', expected YYYY-MM"));
    let (year, mon) = month.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let mon: u32 = mon.parse().map_err(|_| invalid())?;
    let first = NaiveDate::from_ymd_opt(year, mon, 1).ok_or_else(invalid)?;
    Ok((first, last_day_of_month(first)))
}

pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    (first, last_day_of_month(first))
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayrollAggregate {
    pub payrolls: usize,
    pub base_cents: i64,
    pub bonus_cents: i64,
    pub deduction_cents: i64,
    pub gross_cents: i64,
    pub net_cents: i64,
}

impl PayrollAggregate {
    fn add(&mut self, row: &PayrollRow) -> Result<(), PayrollError> {
        let sum = |total: i64, amount: i64| total.checked_add(amount).ok_or(PayrollError::Overflow);
        self.payrolls += 1;
        self.base_cents = sum(self.base_cents, row.base_cents)?;
        self.bonus_cents = sum(self.bonus_cents, row.bonus_cents)?;
        self.deduction_cents = sum(self.deduction_cents, row.deduction_cents)?;
        self.gross_cents = sum(self.gross_cents, row.gross_cents)?;
        self.net_cents = sum(self.net_cents, row.net_cents)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayrollReport {
    pub by_status: BTreeMap<String, PayrollAggregate>,
    pub total: PayrollAggregate,
}

/// Totals per status and overall. Overflow is an error, never a clamp.
pub fn aggregate_payrolls<'a>(
    rows: impl IntoIterator<Item = &'a PayrollRow>,
) -> Result<PayrollReport, PayrollError> {
    let mut report = PayrollReport::default();
    for row in rows {
        report.by_status.entry(row.status.clone()).or_default().add(row)?;
        report.total.add(row)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn payroll(status: &str, gross_cents: i64, net_cents: i64) -> PayrollRow {
        PayrollRow {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            employee_id: Uuid::new_v4(),
            period_start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            base_cents: gross_cents,
            line_items: Json(vec![]),
            bonus_cents: 0,
            deduction_cents: gross_cents - net_cents,
            gross_cents,
            net_cents,
            status: status.to_string(),
            payslip_s3_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_month() {
        let (first, last) = parse_month("2024-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let (_, december_end) = parse_month("2023-12").unwrap();
        assert_eq!(december_end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("2024").is_err());
        assert!(parse_month("may-2024").is_err());
    }

    #[test]
    fn test_month_bounds_mid_month() {
        let (first, last) = month_bounds(NaiveDate::from_ymd_opt(2024, 4, 17).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }

    #[test]
    fn test_aggregate_payrolls_by_status() {
        let rows = [
            payroll("draft", 100_000, 90_000),
            payroll("approved", 200_000, 180_000),
            payroll("approved", 50_000, 50_000),
        ];
        let report = aggregate_payrolls(&rows).unwrap();
        assert_eq!(report.total.payrolls, 3);
        assert_eq!(report.total.net_cents, 320_000);
        let approved = &report.by_status["approved"];
        assert_eq!(approved.payrolls, 2);
        assert_eq!(approved.gross_cents, 250_000);
        assert_eq!(approved.deduction_cents, 20_000);
        assert!(!report.by_status.contains_key("paid"));
    }

    #[test]
    fn test_aggregate_payrolls_reports_overflow() {
        let rows = [payroll("paid", i64::MAX, i64::MAX), payroll("paid", 1, 1)];
        assert_eq!(aggregate_payrolls(&rows), Err(PayrollError::Overflow));
    }
}
