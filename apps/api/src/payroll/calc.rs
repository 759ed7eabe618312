//! Payroll totals. Amounts are integer cents throughout.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq)]
pub enum PayrollError {
    #[error("base salary must not be negative")]
    NegativeBase,

    #[error("line item '{0}' has a negative amount")]
    NegativeAmount(String),

    #[error("line items need a label")]
    EmptyLabel,

    #[error("payroll amounts overflow")]
    Overflow,

    #[error("deductions ({deductions}) exceed gross pay ({gross})")]
    DeductionsExceedGross { gross: i64, deductions: i64 },

    #[error("cannot move payroll from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("only draft payrolls can be edited")]
    NotEditable,
}

impl From<PayrollError> for AppError {
    fn from(err: PayrollError) -> Self {
        match err {
            PayrollError::InvalidTransition { .. } | PayrollError::NotEditable => {
                AppError::Conflict(err.to_string())
            }
            other => AppError::Validation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Bonus,
    Deduction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub label: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PayrollTotals {
    pub base_cents: i64,
    pub bonus_cents: i64,
    pub deduction_cents: i64,
    pub gross_cents: i64,
    pub net_cents: i64,
}

/// gross = base + Σ bonuses, net = gross − Σ deductions.
pub fn compute_totals(base_cents: i64, items: &[LineItem]) -> Result<PayrollTotals, PayrollError> {
    if base_cents < 0 {
        return Err(PayrollError::NegativeBase);
    }

    let mut bonus_cents: i64 = 0;
    let mut deduction_cents: i64 = 0;
    for item in items {
        if item.label.trim().is_empty() {
            return Err(PayrollError::EmptyLabel);
        }
        if item.amount_cents < 0 {
            return Err(PayrollError::NegativeAmount(item.label.clone()));
        }
        let bucket = match item.kind {
            LineItemKind::Bonus => &mut bonus_cents,
            LineItemKind::Deduction => &mut deduction_cents,
        };
        *bucket = bucket
            .checked_add(item.amount_cents)
            .ok_or(PayrollError::Overflow)?;
    }

    let gross_cents = base_cents
        .checked_add(bonus_cents)
        .ok_or(PayrollError::Overflow)?;
    if deduction_cents > gross_cents {
        return Err(PayrollError::DeductionsExceedGross {
            gross: gross_cents,
            deductions: deduction_cents,
        });
    }

    Ok(PayrollTotals {
        base_cents,
        bonus_cents,
        deduction_cents,
        gross_cents,
        net_cents: gross_cents - deduction_cents,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Approved,
    Paid,
}

impl PayrollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Draft => "draft",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Paid => "paid",
        }
    }

    /// draft → approved → paid, and approved → draft to reopen.
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (PayrollStatus::Draft, PayrollStatus::Approved)
                | (PayrollStatus::Approved, PayrollStatus::Paid)
                | (PayrollStatus::Approved, PayrollStatus::Draft)
        )
    }

    pub fn transition_to(&self, next: PayrollStatus) -> Result<PayrollStatus, PayrollError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PayrollError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// Whether employees may see a payroll in this state.
    pub fn is_released(&self) -> bool {
        !matches!(self, PayrollStatus::Draft)
    }
}

impl FromStr for PayrollStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PayrollStatus::Draft),
            "approved" => Ok(PayrollStatus::Approved),
            "paid" => Ok(PayrollStatus::Paid),
            other => Err(AppError::Validation(format!(
                "Unknown payroll status '{other}'"
            ))),
        }
    }
}

/// Formats cents as `1,234.56`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = (abs / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{:02}", abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonus(label: &str, amount_cents: i64) -> LineItem {
        LineItem {
            kind: LineItemKind::Bonus,
            label: label.to_string(),
            amount_cents,
        }
    }

    fn deduction(label: &str, amount_cents: i64) -> LineItem {
        LineItem {
            kind: LineItemKind::Deduction,
            label: label.to_string(),
            amount_cents,
        }
    }

    #[test]
    fn test_totals_with_bonuses_and_deductions() {
        let items = vec![
            bonus("Productividad", 50_000),
            bonus("Horas extra", 12_500),
            deduction("Seguridad social", 45_000),
            deduction("Retención", 30_000),
        ];
        let t = compute_totals(1_500_000, &items).unwrap();
        assert_eq!(t.bonus_cents, 62_500);
        assert_eq!(t.deduction_cents, 75_000);
        assert_eq!(t.gross_cents, 1_562_500);
        assert_eq!(t.net_cents, 1_487_500);
    }

    #[test]
    fn test_totals_without_items() {
        let t = compute_totals(100_000, &[]).unwrap();
        assert_eq!(t.gross_cents, 100_000);
        assert_eq!(t.net_cents, 100_000);
    }

    #[test]
    fn test_net_can_reach_zero() {
        let t = compute_totals(1_000, &[deduction("Anticipo", 1_000)]).unwrap();
        assert_eq!(t.net_cents, 0);
    }

    #[test]
    fn test_deductions_exceeding_gross_rejected() {
        assert_eq!(
            compute_totals(1_000, &[deduction("Anticipo", 1_001)]),
            Err(PayrollError::DeductionsExceedGross {
                gross: 1_000,
                deductions: 1_001
            })
        );
    }

    #[test]
    fn test_negative_amounts_rejected() {
        assert_eq!(compute_totals(-1, &[]), Err(PayrollError::NegativeBase));
        assert_eq!(
            compute_totals(100, &[bonus("x", -5)]),
            Err(PayrollError::NegativeAmount("x".to_string()))
        );
    }

    #[test]
    fn test_blank_label_rejected() {
        assert_eq!(
            compute_totals(100, &[bonus("  ", 5)]),
            Err(PayrollError::EmptyLabel)
        );
    }

    #[test]
    fn test_overflow_detected() {
        assert_eq!(
            compute_totals(i64::MAX, &[bonus("x", 1)]),
            Err(PayrollError::Overflow)
        );
        assert_eq!(
            compute_totals(0, &[bonus("a", i64::MAX), bonus("b", 1)]),
            Err(PayrollError::Overflow)
        );
    }

    #[test]
    fn test_status_transitions() {
        use PayrollStatus::*;
        assert!(Draft.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Paid));
        assert!(Approved.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Draft));
        assert!(!Paid.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(Draft));
        assert_eq!(
            Paid.transition_to(Draft),
            Err(PayrollError::InvalidTransition {
                from: "paid",
                to: "draft"
            })
        );
    }

    #[test]
    fn test_released_states() {
        assert!(!PayrollStatus::Draft.is_released());
        assert!(PayrollStatus::Approved.is_released());
        assert!(PayrollStatus::Paid.is_released());
    }

    #[test]
    fn test_line_item_json_shape() {
        let item: LineItem =
            serde_json::from_str(r#"{"kind":"deduction","label":"IRPF","amount_cents":2500}"#)
                .unwrap();
        assert_eq!(item, deduction("IRPF", 2500));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(123_456), "1,234.56");
        assert_eq!(format_cents(100_000_000), "1,000,000.00");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
