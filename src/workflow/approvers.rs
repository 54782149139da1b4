use std::collections::BTreeSet;

use crate::model::leave_request::Approvers;
use crate::model::user::User;
use crate::repository::{DirectoryRepository, RepositoryError};

/// First approver: the manager's user, when active.
/// Second approvers: the active users linked to the HR officers, deduplicated and sorted.
pub fn resolve_approvers(manager_user: Option<&User>, officer_users: &[User]) -> Approvers {
    let first = manager_user.filter(|u| u.is_active).map(|u| u.id);
    let second: BTreeSet<u64> = officer_users
        .iter()
        .filter(|u| u.is_active)
        .map(|u| u.id)
        .collect();

    Approvers {
        first,
        second: second.into_iter().collect(),
    }
}

/// Looks up the employee's manager and HR officers and resolves their users.
/// Missing records along the way resolve to empty approvers, never an error.
pub async fn approvers_for_employee(
    directory: &dyn DirectoryRepository,
    employee_id: u64,
) -> Result<Approvers, RepositoryError> {
    let Some(employee) = directory.find_employee(employee_id).await? else {
        return Ok(Approvers::default());
    };

    let manager_user = match employee.manager_id {
        Some(manager_id) => match directory.find_employee(manager_id).await? {
            Some(manager) => match manager.user_id {
                Some(user_id) => directory.find_user(user_id).await?,
                None => None,
            },
            None => None,
        },
        None => None,
    };

    let officer_user_ids: Vec<u64> = directory
        .find_employees(&employee.hr_officer_ids)
        .await?
        .into_iter()
        .filter_map(|officer| officer.user_id)
        .collect();
    let officer_users = directory.find_users(&officer_user_ids).await?;

    Ok(resolve_approvers(manager_user.as_ref(), &officer_users))
}
