use crate::model::leave_request::{LeaveRequest, LeaveState};
use crate::model::role::Role;

use super::error::LeaveError;

/// Explicit caller identity threaded into every guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    pub employee_id: Option<u64>,
}

impl Actor {
    fn is_hr_or_admin(&self) -> bool {
        self.role.is_hr_or_admin()
    }
}

/// Target of the "approve" action for the current state.
pub fn approve_target(state: LeaveState) -> Result<LeaveState, LeaveError> {
    match state {
        LeaveState::ToApprove => Ok(LeaveState::SecondApproval),
        LeaveState::SecondApproval => Ok(LeaveState::Approved),
        other => Err(LeaveError::InvalidTransition {
            from: other,
            to: LeaveState::Approved,
        }),
    }
}

/// Decides whether `actor` may move `leave` to `target`.
///
/// `owner_user_id` is the login account linked to the leave's employee, if any.
pub fn check(
    leave: &LeaveRequest,
    owner_user_id: Option<u64>,
    actor: &Actor,
    target: LeaveState,
) -> Result<(), LeaveError> {
    use LeaveState::*;

    let from = leave.state;
    match (from, target) {
        (ToSubmit, ToApprove) => Ok(()),

        (ToApprove, SecondApproval) => {
            let first = leave.first_approver_id.ok_or_else(|| {
                LeaveError::Configuration("No first approver configured for this employee".into())
            })?;
            if actor.user_id != first {
                return Err(LeaveError::Unauthorized(
                    "Only the first approver can approve at this stage".into(),
                ));
            }
            Ok(())
        }

        (SecondApproval, Approved) => {
            if leave.second_approver_ids.is_empty() {
                let first = leave.first_approver_id.ok_or_else(|| {
                    LeaveError::Configuration("No approver configured for final approval".into())
                })?;
                if actor.user_id != first {
                    return Err(LeaveError::Unauthorized(
                        "Only the first approver can give final approval".into(),
                    ));
                }
                return Ok(());
            }

            let is_second = leave.second_approver_ids.contains(&actor.user_id);
            let is_first = leave.first_approver_id == Some(actor.user_id);
            if !is_second || is_first {
                return Err(LeaveError::Unauthorized(
                    "Only a second approver can give final approval".into(),
                ));
            }
            Ok(())
        }

        (ToApprove | SecondApproval, Refused) => {
            if leave.is_approver(actor.user_id) || actor.is_hr_or_admin() {
                Ok(())
            } else {
                Err(LeaveError::Unauthorized(
                    "Only an approver or HR can refuse this leave".into(),
                ))
            }
        }

        (ToSubmit | ToApprove | SecondApproval, Cancelled) => {
            let is_owner = owner_user_id == Some(actor.user_id);
            if is_owner || actor.is_hr_or_admin() {
                Ok(())
            } else {
                Err(LeaveError::Unauthorized(
                    "Only the employee or HR can cancel this leave".into(),
                ))
            }
        }

        _ => Err(LeaveError::InvalidTransition { from, to: target }),
    }
}
