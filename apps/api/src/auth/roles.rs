//! Role-based access gating and tenant scoping.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform-level HR consultant; works across every company.
    Consultant,
    Employer,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consultant => "consultant",
            Role::Employer => "employer",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Consultant => true,
            Role::Employer => !matches!(permission, ManageCompanies),
            Role::Manager => matches!(
                permission,
                ManageJobs
                    | ManageInterviews
                    | EvaluateInterviews
                    | ViewTeamAttendance
                    | ViewOwnPayroll
                    | ReadManual
                    | UseAssistant
                    | ViewReports
            ),
            Role::Employee => matches!(permission, ViewOwnPayroll | ReadManual | UseAssistant),
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultant" => Ok(Role::Consultant),
            "employer" => Ok(Role::Employer),
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            other => Err(AppError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ManageCompanies,
    ManageUsers,
    ManageEmployees,
    ManageJobs,
    ManageInterviews,
    EvaluateInterviews,
    ViewTeamAttendance,
    EditTeamAttendance,
    ManagePayroll,
    ViewOwnPayroll,
    EditManual,
    ReadManual,
    UseAssistant,
    ViewReports,
}

/// The authenticated caller, as stored in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::debug!(
                "User {} ({}) denied {:?}",
                self.user_id,
                self.role.as_str(),
                permission
            );
            Err(AppError::Forbidden)
        }
    }

    /// The company a request operates on.
    ///
    /// Consultants must name one and may name any. Everyone else is pinned
    /// to their own company.
    pub fn resolve_company(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        match (self.role, requested, self.company_id) {
            (Role::Consultant, Some(id), _) => Ok(id),
            (Role::Consultant, None, Some(own)) => Ok(own),
            (Role::Consultant, None, None) => Err(AppError::Validation(
                "company_id is required for consultants".to_string(),
            )),
            (_, _, None) => Err(AppError::Forbidden),
            (_, Some(id), Some(own)) if id != own => Err(AppError::Forbidden),
            (_, _, Some(own)) => Ok(own),
        }
    }

    /// Checks that a loaded entity belongs to a company the caller may see.
    pub fn ensure_company(&self, company_id: Uuid) -> Result<(), AppError> {
        match self.role {
            Role::Consultant => Ok(()),
            _ if self.company_id == Some(company_id) => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }

    pub fn is_self(&self, employee_id: Uuid) -> bool {
        self.employee_id == Some(employee_id)
    }

    /// Employees may act on their own record; anything else needs `permission`.
    pub fn require_self_or(&self, employee_id: Uuid, permission: Permission) -> Result<(), AppError> {
        if self.is_self(employee_id) {
            Ok(())
        } else {
            self.require(permission)
        }
    }

    /// The employee a request targets: an explicit id, else the caller's own.
    pub fn target_employee(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        requested.or(self.employee_id).ok_or_else(|| {
            AppError::Validation("employee_id is required for users without an employee profile".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PERMISSIONS: [Permission; 14] = [
        Permission::ManageCompanies,
        Permission::ManageUsers,
        Permission::ManageEmployees,
        Permission::ManageJobs,
        Permission::ManageInterviews,
        Permission::EvaluateInterviews,
        Permission::ViewTeamAttendance,
        Permission::EditTeamAttendance,
        Permission::ManagePayroll,
        Permission::ViewOwnPayroll,
        Permission::EditManual,
        Permission::ReadManual,
        Permission::UseAssistant,
        Permission::ViewReports,
    ];

    fn user(role: Role, company: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            user_id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            display_name: "Ana".to_string(),
            role,
            company_id: company,
            employee_id: Some(Uuid::from_u128(7)),
        }
    }

    #[test]
    fn test_consultant_has_every_permission() {
        assert!(ALL_PERMISSIONS.iter().all(|p| Role::Consultant.allows(*p)));
    }

    #[test]
    fn test_employer_cannot_manage_companies() {
        assert!(!Role::Employer.allows(Permission::ManageCompanies));
        assert!(Role::Employer.allows(Permission::ManagePayroll));
        assert!(Role::Employer.allows(Permission::EditManual));
    }

    #[test]
    fn test_manager_permissions() {
        assert!(Role::Manager.allows(Permission::ManageInterviews));
        assert!(Role::Manager.allows(Permission::ViewTeamAttendance));
        assert!(!Role::Manager.allows(Permission::EditTeamAttendance));
        assert!(!Role::Manager.allows(Permission::ManagePayroll));
        assert!(!Role::Manager.allows(Permission::EditManual));
    }

    #[test]
    fn test_employee_permissions_are_minimal() {
        let allowed: Vec<_> = ALL_PERMISSIONS
            .iter()
            .filter(|p| Role::Employee.allows(**p))
            .collect();
        assert_eq!(
            allowed,
            vec![
                &Permission::ViewOwnPayroll,
                &Permission::ReadManual,
                &Permission::UseAssistant
            ]
        );
    }

    #[test]
    fn test_require_returns_forbidden() {
        let u = user(Role::Employee, Some(Uuid::new_v4()));
        assert!(matches!(
            u.require(Permission::ManagePayroll),
            Err(AppError::Forbidden)
        ));
        assert!(u.require(Permission::ReadManual).is_ok());
    }

    #[test]
    fn test_resolve_company_pins_non_consultants() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let employer = user(Role::Employer, Some(own));
        assert_eq!(employer.resolve_company(None).unwrap(), own);
        assert_eq!(employer.resolve_company(Some(own)).unwrap(), own);
        assert!(matches!(
            employer.resolve_company(Some(other)),
            Err(AppError::Forbidden)
        ));

        let orphan = user(Role::Manager, None);
        assert!(matches!(orphan.resolve_company(None), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_resolve_company_for_consultant() {
        let consultant = user(Role::Consultant, None);
        let any = Uuid::new_v4();
        assert_eq!(consultant.resolve_company(Some(any)).unwrap(), any);
        assert!(matches!(
            consultant.resolve_company(None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_ensure_company() {
        let own = Uuid::new_v4();
        let manager = user(Role::Manager, Some(own));
        assert!(manager.ensure_company(own).is_ok());
        assert!(manager.ensure_company(Uuid::new_v4()).is_err());
        assert!(user(Role::Consultant, None)
            .ensure_company(Uuid::new_v4())
            .is_ok());
    }

    #[test]
    fn test_require_self_or() {
        let employee = user(Role::Employee, Some(Uuid::new_v4()));
        assert!(employee
            .require_self_or(Uuid::from_u128(7), Permission::ViewTeamAttendance)
            .is_ok());
        assert!(employee
            .require_self_or(Uuid::from_u128(8), Permission::ViewTeamAttendance)
            .is_err());
    }

    #[test]
    fn test_target_employee_defaults_to_self() {
        let employee = user(Role::Employee, Some(Uuid::new_v4()));
        assert_eq!(employee.target_employee(None).unwrap(), Uuid::from_u128(7));
        let other = Uuid::new_v4();
        assert_eq!(employee.target_employee(Some(other)).unwrap(), other);

        let mut consultant = user(Role::Consultant, None);
        consultant.employee_id = None;
        assert!(consultant.target_employee(None).is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Employer).unwrap(), "\"employer\"");
    }
}
