use crate::models::company::CompanyRow;
use crate::models::employee::EmployeeRow;
use crate::models::payroll::PayrollRow;
use crate::payroll::calc::{format_cents, LineItemKind};

pub fn payslip_key(payroll: &PayrollRow) -> String {
    format!("payslips/{}/{}.md", payroll.company_id, payroll.id)
}

/// Renders a payroll as a Markdown payslip.
pub fn render_payslip(company: &CompanyRow, employee: &EmployeeRow, payroll: &PayrollRow) -> String {
    let mut md = format!("# Payslip: {}\n\n", company.name);
    md.push_str(&format!("- **Employee:** {}\n", employee.full_name));
    if !employee.position.is_empty() {
        md.push_str(&format!("- **Position:** {}\n", employee.position));
    }
    md.push_str(&format!(
        "- **Period:** {} to {}\n",
        payroll.period_start, payroll.period_end
    ));
    md.push_str(&format!("- **Status:** {}\n\n", payroll.status));

    md.push_str("| Concept | Amount |\n|---|---:|\n");
    md.push_str(&format!(
        "| Base salary | {} |\n",
        format_cents(payroll.base_cents)
    ));
    for kind in [LineItemKind::Bonus, LineItemKind::Deduction] {
        for item in payroll.line_items.0.iter().filter(|i| i.kind == kind) {
            let amount = match kind {
                LineItemKind::Bonus => format_cents(item.amount_cents),
                LineItemKind::Deduction => format!("-{}", format_cents(item.amount_cents)),
            };
            md.push_str(&format!("| {} | {amount} |\n", item.label));
        }
    }

    md.push_str(&format!(
        "\n**Gross:** {}  \n**Deductions:** {}  \n**Net pay:** {}\n",
        format_cents(payroll.gross_cents),
        format_cents(payroll.deduction_cents),
        format_cents(payroll.net_cents)
    ));
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::calc::LineItem;
    use chrono::{NaiveDate, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn fixtures() -> (CompanyRow, EmployeeRow, PayrollRow) {
        let company_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let company = CompanyRow {
            id: company_id,
            name: "Verde S.A.".to_string(),
            utc_offset_minutes: -300,
            work_start: "09:00".to_string(),
            late_grace_minutes: 15,
            half_day_minutes: 240,
            full_day_minutes: 480,
            created_at: Utc::now(),
        };
        let employee = EmployeeRow {
            id: employee_id,
            company_id,
            full_name: "Ana Ruiz".to_string(),
            email: "ana@verde.test".to_string(),
            position: "Analyst".to_string(),
            department: "Finance".to_string(),
            base_salary_cents: 250_000,
            hire_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payroll = PayrollRow {
            id: Uuid::new_v4(),
            company_id,
            employee_id,
            period_start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            base_cents: 250_000,
            line_items: Json(vec![
                LineItem {
                    kind: LineItemKind::Deduction,
                    label: "Health insurance".to_string(),
                    amount_cents: 12_050,
                },
                LineItem {
                    kind: LineItemKind::Bonus,
                    label: "Overtime".to_string(),
                    amount_cents: 30_000,
                },
            ]),
            bonus_cents: 30_000,
            deduction_cents: 12_050,
            gross_cents: 280_000,
            net_cents: 267_950,
            status: "approved".to_string(),
            payslip_s3_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        (company, employee, payroll)
    }

    #[test]
    fn test_payslip_lists_items_bonuses_first() {
        let (company, employee, payroll) = fixtures();
        let md = render_payslip(&company, &employee, &payroll);
        assert!(md.starts_with("# Payslip: Verde S.A."));
        assert!(md.contains("| Base salary | 2,500.00 |"));
        let overtime = md.find("| Overtime | 300.00 |").unwrap();
        let insurance = md.find("| Health insurance | -120.50 |").unwrap();
        assert!(overtime < insurance);
        assert!(md.contains("**Net pay:** 2,679.50"));
    }

    #[test]
    fn test_payslip_key_is_tenant_scoped() {
        let (_, _, payroll) = fixtures();
        assert_eq!(
            payslip_key(&payroll),
            format!("payslips/{}/{}.md", payroll.company_id, payroll.id)
        );
    }
}
