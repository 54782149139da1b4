use serde::{Deserialize, Serialize};

/// Kind of time off ("Paid Time Off", "Sick Leave", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveType {
    pub id: u64,
    pub name: String,
}
