//! Persistence seams for the leave workflow.
//!
//! `MySqlRepository` backs the running service; `memory::InMemoryRepository`
//! backs the unit tests. Both implement the same two traits so the workflow
//! never touches sqlx directly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::leave_request::{Approvers, LeaveListing, LeaveRequest, LeaveState};
use crate::model::leave_type::LeaveType;
use crate::model::user::User;

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlRepository;

#[derive(Debug, Display)]
pub enum RepositoryError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "decode error: {}", _0)]
    Decode(String),
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Database(e)
    }
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub department_id: Option<u64>,
    pub manager_id: Option<u64>,
    pub user_id: Option<u64>,
    pub work_email: Option<String>,
    pub personal_email: Option<String>,
    pub hr_officer_ids: Vec<u64>,
}

/// Partial employee update. The outer `Option` means "leave untouched",
/// an inner `None` clears the column.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub department_id: Option<Option<u64>>,
    pub manager_id: Option<Option<u64>>,
    pub user_id: Option<Option<u64>>,
    pub work_email: Option<Option<String>>,
    pub personal_email: Option<Option<String>>,
    pub hr_officer_ids: Option<Vec<u64>>,
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.department_id.is_none()
            && self.manager_id.is_none()
            && self.user_id.is_none()
            && self.work_email.is_none()
            && self.personal_email.is_none()
            && self.hr_officer_ids.is_none()
    }

    /// Whether derived approver fields depend on anything this update changes.
    pub fn touches_approvers(&self) -> bool {
        self.manager_id.is_some() || self.user_id.is_some() || self.hr_officer_ids.is_some()
    }

    pub fn apply_to(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(v) = self.department_id {
            employee.department_id = v;
        }
        if let Some(v) = self.manager_id {
            employee.manager_id = v;
        }
        if let Some(v) = self.user_id {
            employee.user_id = v;
        }
        if let Some(v) = self.work_email {
            employee.work_email = v;
        }
        if let Some(v) = self.personal_email {
            employee.personal_email = v;
        }
        if let Some(v) = self.hr_officer_ids {
            employee.hr_officer_ids = v;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLeaveRecord {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub number_of_days: f64,
    pub description: Option<String>,
    pub approval_token: String,
    pub approvers: Approvers,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub state: Option<LeaveState>,
    pub page: u64,
    pub per_page: u64,
}

impl LeaveFilter {
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// Users, employees and the reference data they point at.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_user(&self, id: u64) -> Result<Option<User>, RepositoryError>;

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, RepositoryError>;

    /// Returns `false` when the user does not exist.
    async fn set_user_active(&self, id: u64, active: bool) -> Result<bool, RepositoryError>;

    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, RepositoryError>;

    async fn find_employees(&self, ids: &[u64]) -> Result<Vec<Employee>, RepositoryError>;

    async fn list_employees(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Employee>, u64), RepositoryError>;

    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, RepositoryError>;

    /// Returns `false` when the employee does not exist.
    async fn update_employee(
        &self,
        id: u64,
        update: EmployeeUpdate,
    ) -> Result<bool, RepositoryError>;

    async fn delete_employee(&self, id: u64) -> Result<bool, RepositoryError>;

    /// The employee itself plus every employee whose manager or HR officer it is.
    async fn employees_affected_by(&self, employee_id: u64) -> Result<Vec<u64>, RepositoryError>;

    /// Employees linked to the given login account.
    async fn employees_linked_to_user(&self, user_id: u64) -> Result<Vec<u64>, RepositoryError>;

    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, RepositoryError>;

    async fn find_department(&self, id: u64) -> Result<Option<Department>, RepositoryError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// Stores the leave and its approvers atomically.
    async fn insert_leave(&self, new: NewLeaveRecord) -> Result<LeaveRequest, RepositoryError>;

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, RepositoryError>;

    async fn list_leaves(
        &self,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, u64), RepositoryError>;

    /// `(leave_id, employee_id)` pairs for every leave of the given employees.
    async fn leaves_of_employees(
        &self,
        employee_ids: &[u64],
    ) -> Result<Vec<(u64, u64)>, RepositoryError>;

    async fn save_approvers(
        &self,
        leave_id: u64,
        approvers: &Approvers,
    ) -> Result<(), RepositoryError>;

    /// Conditional write: only moves the leave when it is still in `expected`.
    /// Returns whether a row changed.
    async fn update_state(
        &self,
        id: u64,
        expected: LeaveState,
        next: LeaveState,
    ) -> Result<bool, RepositoryError>;

    /// Leaves where the user is the first approver or one of the second approvers.
    async fn listings_for_approver(
        &self,
        user_id: u64,
    ) -> Result<Vec<LeaveListing>, RepositoryError>;
}
