use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::model::employee::Employee;
use crate::model::leave_request::{Approvers, LeaveRequest, LeaveState};
use crate::report::{ViewError, ViewPage, ViewParams, build_page};
use crate::repository::{
    DirectoryRepository, EmployeeUpdate, LeaveFilter, LeaveRepository, NewEmployee,
    NewLeaveRecord,
};
use crate::utils::token::TokenSigner;

use super::approvers::approvers_for_employee;
use super::error::LeaveError;
use super::guard::{self, Actor};
use super::notifier::Notifier;

/// Input of a new leave request.
#[derive(Debug, Clone)]
pub struct NewLeave {
    /// Defaults to the caller's own employee record.
    pub employee_id: Option<u64>,
    pub leave_type_id: u64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Defaults to the inclusive calendar-day count.
    pub number_of_days: Option<f64>,
    pub description: Option<String>,
}

pub struct LeaveService {
    directory: Arc<dyn DirectoryRepository>,
    leaves: Arc<dyn LeaveRepository>,
    notifier: Notifier,
    signer: TokenSigner,
}

fn require_hr(actor: &Actor) -> Result<(), LeaveError> {
    if actor.role.is_hr_or_admin() {
        Ok(())
    } else {
        Err(LeaveError::Unauthorized("HR/Admin only".into()))
    }
}

impl LeaveService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        leaves: Arc<dyn LeaveRepository>,
        notifier: Notifier,
        signer: TokenSigner,
    ) -> Self {
        Self {
            directory,
            leaves,
            notifier,
            signer,
        }
    }

    /* ---------- leave requests ---------- */

    pub async fn create_leave(&self, actor: &Actor, new: NewLeave) -> Result<LeaveRequest, LeaveError> {
        let employee_id = new
            .employee_id
            .or(actor.employee_id)
            .ok_or_else(|| LeaveError::Validation("No employee profile".into()))?;
        if actor.employee_id != Some(employee_id) {
            require_hr(actor)?;
        }

        if new.date_from > new.date_to {
            return Err(LeaveError::Validation(
                "date_from cannot be after date_to".into(),
            ));
        }
        let number_of_days = match new.number_of_days {
            Some(days) if days <= 0.0 || !days.is_finite() => {
                return Err(LeaveError::Validation(
                    "number_of_days must be positive".into(),
                ));
            }
            Some(days) => days,
            None => ((new.date_to - new.date_from).num_days() + 1) as f64,
        };

        if self.directory.find_employee(employee_id).await?.is_none() {
            return Err(LeaveError::NotFound("Employee"));
        }
        if self.directory.find_leave_type(new.leave_type_id).await?.is_none() {
            return Err(LeaveError::NotFound("Leave type"));
        }

        let approvers = approvers_for_employee(self.directory.as_ref(), employee_id).await?;
        let created_at = Utc::now();
        let leave = self
            .leaves
            .insert_leave(NewLeaveRecord {
                employee_id,
                leave_type_id: new.leave_type_id,
                date_from: new.date_from,
                date_to: new.date_to,
                number_of_days,
                description: new.description.filter(|d| !d.trim().is_empty()),
                approval_token: self.signer.approval_token(employee_id, created_at),
                approvers,
                created_at,
            })
            .await?;

        info!(
            leave_id = leave.id,
            employee_id,
            first_approver = ?leave.first_approver_id,
            second_approvers = ?leave.second_approver_ids,
            "Leave request created"
        );
        Ok(leave)
    }

    async fn load_leave(&self, id: u64) -> Result<LeaveRequest, LeaveError> {
        self.leaves
            .find_leave(id)
            .await?
            .ok_or(LeaveError::NotFound("Leave request"))
    }

    /// Owner, approvers and HR may read a leave.
    pub async fn get_leave(&self, actor: &Actor, id: u64) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(id).await?;
        let is_owner = actor.employee_id == Some(leave.employee_id);
        if !is_owner && !leave.is_approver(actor.user_id) {
            require_hr(actor)?;
        }
        Ok(leave)
    }

    /// HR sees every leave; other callers only their own.
    pub async fn list_leaves(
        &self,
        actor: &Actor,
        mut filter: LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, u64), LeaveError> {
        if !actor.role.is_hr_or_admin() {
            let own = actor
                .employee_id
                .ok_or_else(|| LeaveError::Unauthorized("No employee profile".into()))?;
            filter.employee_id = Some(own);
        }
        Ok(self.leaves.list_leaves(&filter).await?)
    }

    pub async fn submit(&self, actor: &Actor, id: u64) -> Result<LeaveRequest, LeaveError> {
        self.transition(actor, id, LeaveState::ToApprove).await
    }

    /// First approval from `to_approve`, final approval from `second_approval`.
    pub async fn approve(&self, actor: &Actor, id: u64) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(id).await?;
        let target = guard::approve_target(leave.state)?;
        self.apply(actor, leave, target).await
    }

    pub async fn refuse(&self, actor: &Actor, id: u64) -> Result<LeaveRequest, LeaveError> {
        self.transition(actor, id, LeaveState::Refused).await
    }

    pub async fn cancel(&self, actor: &Actor, id: u64) -> Result<LeaveRequest, LeaveError> {
        self.transition(actor, id, LeaveState::Cancelled).await
    }

    /// Moves a leave to `target`. Direct state writes go through here too,
    /// so they get the same checks and notifications as the actions.
    pub async fn transition(
        &self,
        actor: &Actor,
        id: u64,
        target: LeaveState,
    ) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(id).await?;
        self.apply(actor, leave, target).await
    }

    async fn apply(
        &self,
        actor: &Actor,
        mut leave: LeaveRequest,
        target: LeaveState,
    ) -> Result<LeaveRequest, LeaveError> {
        let owner_user_id = self
            .directory
            .find_employee(leave.employee_id)
            .await?
            .and_then(|e| e.user_id);

        if let Err(e) = guard::check(&leave, owner_user_id, actor, target) {
            warn!(
                leave_id = leave.id,
                user_id = actor.user_id,
                from = %leave.state,
                to = %target,
                error = %e,
                "Leave transition rejected"
            );
            return Err(e);
        }

        let from = leave.state;
        if !self.leaves.update_state(leave.id, from, target).await? {
            warn!(leave_id = leave.id, from = %from, to = %target, "Leave changed concurrently");
            return Err(LeaveError::Conflict(leave.id));
        }
        leave.state = target;
        leave.updated_at = Utc::now();

        info!(leave_id = leave.id, user_id = actor.user_id, from = %from, to = %target, "Leave transitioned");
        self.notifier.dispatch(&leave, actor).await;
        Ok(leave)
    }

    /* ---------- derived approvers ---------- */

    /// Recomputes the approvers of every leave of the given employees.
    /// Returns the number of leaves rewritten.
    pub async fn recompute_for_employees(&self, employee_ids: &[u64]) -> Result<usize, LeaveError> {
        let ids: Vec<u64> = employee_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let mut by_employee: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        for (leave_id, employee_id) in self.leaves.leaves_of_employees(&ids).await? {
            by_employee.entry(employee_id).or_default().push(leave_id);
        }

        let mut updated = 0;
        for (employee_id, leave_ids) in by_employee {
            let approvers: Approvers =
                approvers_for_employee(self.directory.as_ref(), employee_id).await?;
            for leave_id in leave_ids {
                self.leaves.save_approvers(leave_id, &approvers).await?;
                updated += 1;
            }
        }

        info!(employees = ids.len(), leaves = updated, "Leave approvers recomputed");
        Ok(updated)
    }

    /* ---------- directory ---------- */

    pub async fn create_employee(&self, actor: &Actor, new: NewEmployee) -> Result<Employee, LeaveError> {
        require_hr(actor)?;
        if new.name.trim().is_empty() {
            return Err(LeaveError::Validation("name is required".into()));
        }
        self.check_department(new.department_id).await?;
        self.check_references(None, new.manager_id, &new.hr_officer_ids)
            .await?;

        let employee = self.directory.insert_employee(new).await?;
        info!(employee_id = employee.id, "Employee created");
        Ok(employee)
    }

    pub async fn get_employee(&self, actor: &Actor, id: u64) -> Result<Employee, LeaveError> {
        if actor.employee_id != Some(id) {
            require_hr(actor)?;
        }
        self.directory
            .find_employee(id)
            .await?
            .ok_or(LeaveError::NotFound("Employee"))
    }

    pub async fn list_employees(
        &self,
        actor: &Actor,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Employee>, u64), LeaveError> {
        require_hr(actor)?;
        Ok(self.directory.list_employees(page, per_page).await?)
    }

    /// Applies a partial update; approver-relevant changes trigger a recompute
    /// for the employee and everyone it manages or is HR officer of.
    pub async fn update_employee(
        &self,
        actor: &Actor,
        id: u64,
        update: EmployeeUpdate,
    ) -> Result<Employee, LeaveError> {
        require_hr(actor)?;
        if update.is_empty() {
            return Err(LeaveError::Validation("No fields to update".into()));
        }
        if matches!(&update.name, Some(name) if name.trim().is_empty()) {
            return Err(LeaveError::Validation("name is required".into()));
        }
        let manager_id = update.manager_id.flatten();
        let officers = update.hr_officer_ids.clone().unwrap_or_default();
        self.check_department(update.department_id.flatten()).await?;
        self.check_references(Some(id), manager_id, &officers).await?;

        let touches_approvers = update.touches_approvers();
        if !self.directory.update_employee(id, update).await? {
            return Err(LeaveError::NotFound("Employee"));
        }

        if touches_approvers {
            let affected = self.directory.employees_affected_by(id).await?;
            self.recompute_for_employees(&affected).await?;
        }

        info!(employee_id = id, touches_approvers, "Employee updated");
        self.directory
            .find_employee(id)
            .await?
            .ok_or(LeaveError::NotFound("Employee"))
    }

    pub async fn delete_employee(&self, actor: &Actor, id: u64) -> Result<(), LeaveError> {
        require_hr(actor)?;
        let affected: Vec<u64> = self
            .directory
            .employees_affected_by(id)
            .await?
            .into_iter()
            .filter(|e| *e != id)
            .collect();

        if !self.directory.delete_employee(id).await? {
            return Err(LeaveError::NotFound("Employee"));
        }
        self.recompute_for_employees(&affected).await?;

        info!(employee_id = id, "Employee deleted");
        Ok(())
    }

    /// Activating or deactivating a login changes who can approve for the
    /// employees managed by it.
    pub async fn set_user_active(&self, actor: &Actor, user_id: u64, active: bool) -> Result<(), LeaveError> {
        require_hr(actor)?;
        if !self.directory.set_user_active(user_id, active).await? {
            return Err(LeaveError::NotFound("User"));
        }

        let mut affected = BTreeSet::new();
        for employee_id in self.directory.employees_linked_to_user(user_id).await? {
            affected.extend(self.directory.employees_affected_by(employee_id).await?);
        }
        let affected: Vec<u64> = affected.into_iter().collect();
        self.recompute_for_employees(&affected).await?;

        info!(user_id, active, "User active flag changed");
        Ok(())
    }

    async fn check_department(&self, department_id: Option<u64>) -> Result<(), LeaveError> {
        if let Some(id) = department_id {
            if self.directory.find_department(id).await?.is_none() {
                return Err(LeaveError::Validation(format!(
                    "Department {id} does not exist"
                )));
            }
        }
        Ok(())
    }

    async fn check_references(
        &self,
        self_id: Option<u64>,
        manager_id: Option<u64>,
        officer_ids: &[u64],
    ) -> Result<(), LeaveError> {
        if let Some(manager_id) = manager_id {
            if Some(manager_id) == self_id {
                return Err(LeaveError::Validation(
                    "An employee cannot be their own manager".into(),
                ));
            }
            if self.directory.find_employee(manager_id).await?.is_none() {
                return Err(LeaveError::Validation(format!(
                    "Manager {manager_id} does not exist"
                )));
            }
        }
        if !officer_ids.is_empty() {
            let found = self.directory.find_employees(officer_ids).await?;
            if let Some(missing) = officer_ids
                .iter()
                .find(|id| !found.iter().any(|e| e.id == **id))
            {
                return Err(LeaveError::Validation(format!(
                    "HR officer {missing} does not exist"
                )));
            }
        }
        Ok(())
    }

    /* ---------- reporting ---------- */

    /// Signed link to the caller's own "view requests" page.
    pub fn view_link(&self, actor: &Actor) -> String {
        self.notifier.view_url(actor.user_id)
    }

    pub async fn view_requests(&self, params: &ViewParams) -> Result<ViewPage, ViewError> {
        if !self
            .signer
            .verify_view_token(params.approver_id, &params.token)
        {
            warn!(approver_id = params.approver_id, "Invalid view token");
            return Err(ViewError::InvalidLink);
        }

        let approver = match self.directory.find_user(params.approver_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(ViewError::ApproverNotFound),
            Err(e) => {
                error!(approver_id = params.approver_id, error = %e, "Failed to load approver");
                return Err(ViewError::Internal);
            }
        };

        let listings = self
            .leaves
            .listings_for_approver(approver.id)
            .await
            .map_err(|e| {
                error!(approver_id = approver.id, error = %e, "Failed to load leave requests");
                ViewError::Internal
            })?;

        Ok(build_page(listings, params, &approver.name))
    }
}
