use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "name": "John Doe",
        "department_id": 10,
        "manager_id": 3,
        "user_id": 21,
        "work_email": "john.doe@company.com",
        "personal_email": null,
        "hr_officer_ids": [4, 5]
    })
)]
pub struct Employee {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    /// Employee whose linked user becomes the first approver
    #[schema(example = 3, nullable = true)]
    pub manager_id: Option<u64>,

    /// Login account of this employee
    #[schema(example = 21, nullable = true)]
    pub user_id: Option<u64>,

    #[schema(example = "john.doe@company.com", nullable = true)]
    pub work_email: Option<String>,

    #[schema(example = "john@home.net", nullable = true)]
    pub personal_email: Option<String>,

    /// Employees whose linked users become the second approvers
    #[schema(example = json!([4, 5]))]
    pub hr_officer_ids: Vec<u64>,
}

impl Employee {
    /// Address for employee-facing notices: work email first, then personal.
    pub fn notification_email(&self) -> Option<&str> {
        self.work_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| {
                self.personal_email
                    .as_deref()
                    .filter(|e| !e.trim().is_empty())
            })
    }
}
