use serde::{Deserialize, Serialize};

/// A login account. Approvers are always users, never employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: String,
    pub email: Option<String>,
    pub role_id: u8,
    pub is_active: bool,
}
