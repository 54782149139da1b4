use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    DirectoryRepository, EmployeeUpdate, LeaveFilter, LeaveRepository, NewEmployee,
    NewLeaveRecord, RepositoryError,
};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::leave_request::{Approvers, LeaveListing, LeaveRequest, LeaveState};
use crate::model::leave_type::LeaveType;
use crate::model::user::User;

#[derive(Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    departments: BTreeMap<u64, Department>,
    leave_types: BTreeMap<u64, LeaveType>,
    employees: BTreeMap<u64, Employee>,
    leaves: BTreeMap<u64, LeaveRequest>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Test double with the same semantics as `MySqlRepository`.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn add_user(&self, id: u64, name: &str, email: Option<&str>, active: bool) -> User {
        let user = User {
            id,
            login: name.to_lowercase(),
            name: name.to_string(),
            email: email.map(Into::into),
            role_id: 3,
            is_active: active,
        };
        self.tables
            .write()
            .expect("tables poisoned")
            .users
            .insert(id, user.clone());
        user
    }

    pub fn add_department(&self, id: u64, name: &str) {
        self.tables.write().expect("tables poisoned").departments.insert(
            id,
            Department {
                id,
                name: name.to_string(),
            },
        );
    }

    pub fn add_leave_type(&self, id: u64, name: &str) {
        self.tables.write().expect("tables poisoned").leave_types.insert(
            id,
            LeaveType {
                id,
                name: name.to_string(),
            },
        );
    }

    /// Backdates a leave so listing order can be asserted.
    pub fn set_created_at(&self, leave_id: u64, created_at: chrono::DateTime<chrono::Utc>) {
        if let Some(leave) = self
            .tables
            .write()
            .expect("tables poisoned")
            .leaves
            .get_mut(&leave_id)
        {
            leave.created_at = created_at;
        }
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryRepository {
    async fn find_user(&self, id: u64) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().expect("tables poisoned").users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        Ok(tables
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn set_user_active(&self, id: u64, active: bool) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.tables.read().expect("tables poisoned").employees.get(&id).cloned())
    }

    async fn find_employees(&self, ids: &[u64]) -> Result<Vec<Employee>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        Ok(tables
            .employees
            .values()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn list_employees(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Employee>, u64), RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        let offset = (page.max(1) - 1).saturating_mul(per_page) as usize;
        let data = tables
            .employees
            .values()
            .rev()
            .skip(offset)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok((data, tables.employees.len() as u64))
    }

    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        let id = tables.next_id();
        let mut officers = new.hr_officer_ids;
        officers.sort_unstable();
        officers.dedup();
        let employee = Employee {
            id,
            name: new.name,
            department_id: new.department_id,
            manager_id: new.manager_id,
            user_id: new.user_id,
            work_email: new.work_email,
            personal_email: new.personal_email,
            hr_officer_ids: officers,
        };
        tables.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(
        &self,
        id: u64,
        mut update: EmployeeUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        let Some(employee) = tables.employees.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(officers) = update.hr_officer_ids.as_mut() {
            officers.sort_unstable();
            officers.dedup();
        }
        update.apply_to(employee);
        Ok(true)
    }

    async fn delete_employee(&self, id: u64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        let removed = tables.employees.remove(&id).is_some();
        if removed {
            tables.leaves.retain(|_, l| l.employee_id != id);
            for employee in tables.employees.values_mut() {
                if employee.manager_id == Some(id) {
                    employee.manager_id = None;
                }
                employee.hr_officer_ids.retain(|o| *o != id);
            }
        }
        Ok(removed)
    }

    async fn employees_affected_by(&self, employee_id: u64) -> Result<Vec<u64>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        Ok(tables
            .employees
            .values()
            .filter(|e| {
                e.id == employee_id
                    || e.manager_id == Some(employee_id)
                    || e.hr_officer_ids.contains(&employee_id)
            })
            .map(|e| e.id)
            .collect())
    }

    async fn employees_linked_to_user(&self, user_id: u64) -> Result<Vec<u64>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        Ok(tables
            .employees
            .values()
            .filter(|e| e.user_id == Some(user_id))
            .map(|e| e.id)
            .collect())
    }

    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, RepositoryError> {
        Ok(self.tables.read().expect("tables poisoned").leave_types.get(&id).cloned())
    }

    async fn find_department(&self, id: u64) -> Result<Option<Department>, RepositoryError> {
        Ok(self.tables.read().expect("tables poisoned").departments.get(&id).cloned())
    }
}

#[async_trait]
impl LeaveRepository for InMemoryRepository {
    async fn insert_leave(&self, new: NewLeaveRecord) -> Result<LeaveRequest, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        let id = tables.next_id();
        let leave = LeaveRequest {
            id,
            employee_id: new.employee_id,
            leave_type_id: new.leave_type_id,
            date_from: new.date_from,
            date_to: new.date_to,
            number_of_days: new.number_of_days,
            description: new.description,
            state: LeaveState::ToSubmit,
            first_approver_id: new.approvers.first,
            second_approver_ids: new.approvers.second,
            approval_token: new.approval_token,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        tables.leaves.insert(id, leave.clone());
        Ok(leave)
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, RepositoryError> {
        Ok(self.tables.read().expect("tables poisoned").leaves.get(&id).cloned())
    }

    async fn list_leaves(
        &self,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, u64), RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        let mut matching: Vec<LeaveRequest> = tables
            .leaves
            .values()
            .filter(|l| filter.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| filter.state.is_none_or(|s| l.state == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok((data, total))
    }

    async fn leaves_of_employees(
        &self,
        employee_ids: &[u64],
    ) -> Result<Vec<(u64, u64)>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        Ok(tables
            .leaves
            .values()
            .filter(|l| employee_ids.contains(&l.employee_id))
            .map(|l| (l.id, l.employee_id))
            .collect())
    }

    async fn save_approvers(
        &self,
        leave_id: u64,
        approvers: &Approvers,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        if let Some(leave) = tables.leaves.get_mut(&leave_id) {
            leave.first_approver_id = approvers.first;
            leave.second_approver_ids = approvers.second.clone();
        }
        Ok(())
    }

    async fn update_state(
        &self,
        id: u64,
        expected: LeaveState,
        next: LeaveState,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().expect("tables poisoned");
        match tables.leaves.get_mut(&id) {
            Some(leave) if leave.state == expected => {
                leave.state = next;
                leave.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn listings_for_approver(
        &self,
        user_id: u64,
    ) -> Result<Vec<LeaveListing>, RepositoryError> {
        let tables = self.tables.read().expect("tables poisoned");
        let mut listings: Vec<LeaveListing> = tables
            .leaves
            .values()
            .filter(|l| l.is_approver(user_id))
            .filter_map(|l| {
                let employee = tables.employees.get(&l.employee_id)?;
                let leave_type = tables.leave_types.get(&l.leave_type_id)?;
                let department = employee
                    .department_id
                    .and_then(|d| tables.departments.get(&d))
                    .map(|d| d.name.clone());
                Some(LeaveListing {
                    id: l.id,
                    employee_name: employee.name.clone(),
                    department,
                    leave_type: leave_type.name.clone(),
                    description: l.description.clone(),
                    date_from: l.date_from,
                    date_to: l.date_to,
                    number_of_days: l.number_of_days,
                    state: l.state,
                    created_at: l.created_at,
                })
            })
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listings)
    }
}
