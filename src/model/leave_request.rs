use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Lifecycle of a leave request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveState {
    ToSubmit,
    ToApprove,
    SecondApproval,
    Approved,
    Refused,
    Cancelled,
}

impl LeaveState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LeaveState::Approved | LeaveState::Refused | LeaveState::Cancelled
        )
    }

    /// Waiting on an approver.
    pub fn is_pending(self) -> bool {
        matches!(self, LeaveState::ToApprove | LeaveState::SecondApproval)
    }

    pub fn label(self) -> &'static str {
        match self {
            LeaveState::ToSubmit => "To Submit",
            LeaveState::ToApprove => "To Approve",
            LeaveState::SecondApproval => "Second Approval",
            LeaveState::Approved => "Approved",
            LeaveState::Refused => "Refused",
            LeaveState::Cancelled => "Cancelled",
        }
    }
}

/// Derived approver fields of a leave request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Approvers {
    pub first: Option<u64>,
    /// Sorted, no duplicates.
    pub second: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 7,
    "leave_type_id": 2,
    "date_from": "2026-01-05",
    "date_to": "2026-01-07",
    "number_of_days": 3.0,
    "description": "Family trip",
    "state": "to_approve",
    "first_approver_id": 3,
    "second_approver_ids": [4, 5],
    "created_at": "2026-01-01T00:00:00Z",
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = 2)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date_from: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub date_to: NaiveDate,
    #[schema(example = 3.0)]
    pub number_of_days: f64,
    pub description: Option<String>,
    pub state: LeaveState,
    pub first_approver_id: Option<u64>,
    pub second_approver_ids: Vec<u64>,
    #[serde(skip_serializing)]
    pub approval_token: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn is_approver(&self, user_id: u64) -> bool {
        self.first_approver_id == Some(user_id) || self.second_approver_ids.contains(&user_id)
    }
}

/// Read-only row of the approver's "view requests" page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveListing {
    pub id: u64,
    pub employee_name: String,
    pub department: Option<String>,
    pub leave_type: String,
    pub description: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub number_of_days: f64,
    pub state: LeaveState,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn state_names_round_trip_through_storage_form() {
        for state in LeaveState::iter() {
            assert_eq!(LeaveState::from_str(state.as_ref()).unwrap(), state);
        }
        assert_eq!(LeaveState::SecondApproval.as_ref(), "second_approval");
        assert!(LeaveState::from_str("validate1").is_err());
    }

    #[test]
    fn terminal_and_pending_partition() {
        let terminal: Vec<_> = LeaveState::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![LeaveState::Approved, LeaveState::Refused, LeaveState::Cancelled]
        );
        assert!(!LeaveState::ToSubmit.is_pending());
        assert!(LeaveState::SecondApproval.is_pending());
    }
}
