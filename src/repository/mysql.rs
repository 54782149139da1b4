use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use tracing::debug;

use super::{
    DirectoryRepository, EmployeeUpdate, LeaveFilter, LeaveRepository, NewEmployee,
    NewLeaveRecord, RepositoryError,
};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::leave_request::{Approvers, LeaveListing, LeaveRequest, LeaveState};
use crate::model::leave_type::LeaveType;
use crate::model::user::User;

const EMPLOYEE_COLUMNS: &str =
    "id, name, department_id, manager_id, user_id, work_email, personal_email";

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type_id, date_from, date_to, number_of_days, \
     description, state, first_approver_id, approval_token, created_at, updated_at";

#[derive(Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn officers_of(&self, employee_ids: &[u64]) -> Result<HashMap<u64, Vec<u64>>, RepositoryError> {
        let mut officers: HashMap<u64, Vec<u64>> = HashMap::new();
        if employee_ids.is_empty() {
            return Ok(officers);
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT employee_id, officer_id FROM employee_hr_officers WHERE employee_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in employee_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY officer_id");

        let rows: Vec<(u64, u64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (employee_id, officer_id) in rows {
            officers.entry(employee_id).or_default().push(officer_id);
        }
        Ok(officers)
    }

    async fn second_approvers_of(&self, leave_ids: &[u64]) -> Result<HashMap<u64, Vec<u64>>, RepositoryError> {
        let mut approvers: HashMap<u64, Vec<u64>> = HashMap::new();
        if leave_ids.is_empty() {
            return Ok(approvers);
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT leave_id, user_id FROM leave_second_approvers WHERE leave_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in leave_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY user_id");

        let rows: Vec<(u64, u64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (leave_id, user_id) in rows {
            approvers.entry(leave_id).or_default().push(user_id);
        }
        Ok(approvers)
    }

    async fn with_officers(&self, rows: Vec<EmployeeRow>) -> Result<Vec<Employee>, RepositoryError> {
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        let mut officers = self.officers_of(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let hr_officer_ids = officers.remove(&row.id).unwrap_or_default();
                row.into_employee(hr_officer_ids)
            })
            .collect())
    }

    async fn with_second_approvers(&self, rows: Vec<LeaveRow>) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        let mut second = self.second_approvers_of(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let approvers = second.remove(&row.id).unwrap_or_default();
                row.into_leave(approvers)
            })
            .collect()
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    name: String,
    department_id: Option<u64>,
    manager_id: Option<u64>,
    user_id: Option<u64>,
    work_email: Option<String>,
    personal_email: Option<String>,
}

impl EmployeeRow {
    fn into_employee(self, hr_officer_ids: Vec<u64>) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            department_id: self.department_id,
            manager_id: self.manager_id,
            user_id: self.user_id,
            work_email: self.work_email,
            personal_email: self.personal_email,
            hr_officer_ids,
        }
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type_id: u64,
    date_from: NaiveDate,
    date_to: NaiveDate,
    number_of_days: f64,
    description: Option<String>,
    state: String,
    first_approver_id: Option<u64>,
    approval_token: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_state(raw: &str) -> Result<LeaveState, RepositoryError> {
    LeaveState::from_str(raw).map_err(|_| RepositoryError::Decode(format!("unknown leave state '{raw}'")))
}

impl LeaveRow {
    fn into_leave(self, second_approver_ids: Vec<u64>) -> Result<LeaveRequest, RepositoryError> {
        Ok(LeaveRequest {
            id: self.id,
            employee_id: self.employee_id,
            leave_type_id: self.leave_type_id,
            date_from: self.date_from,
            date_to: self.date_to,
            number_of_days: self.number_of_days,
            description: self.description,
            state: parse_state(&self.state)?,
            first_approver_id: self.first_approver_id,
            second_approver_ids,
            approval_token: self.approval_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ListingRow {
    id: u64,
    employee_name: String,
    department: Option<String>,
    leave_type: String,
    description: Option<String>,
    date_from: NaiveDate,
    date_to: NaiveDate,
    number_of_days: f64,
    state: String,
    created_at: DateTime<Utc>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

#[async_trait]
impl DirectoryRepository for MySqlRepository {
    async fn find_user(&self, id: u64) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, name, email, role_id, is_active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT id, login, name, email, role_id, is_active FROM users WHERE id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(") ORDER BY id");

        Ok(qb.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    async fn set_user_active(&self, id: u64, active: bool) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, RepositoryError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_officers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_employees(&self, ids: &[u64]) -> Result<Vec<Employee>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<MySql>::new(format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id IN ("
        ));
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(") ORDER BY id");

        let rows = qb.build_query_as::<EmployeeRow>().fetch_all(&self.pool).await?;
        self.with_officers(rows).await
    }

    async fn list_employees(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Employee>, u64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;

        let offset = (page.max(1) - 1).saturating_mul(per_page);
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %sql, page, per_page, offset, "Fetching employees");

        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((self.with_officers(rows).await?, total.max(0) as u64))
    }

    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO employees
                (name, department_id, manager_id, user_id, work_email, personal_email)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(new.department_id)
        .bind(new.manager_id)
        .bind(new.user_id)
        .bind(&new.work_email)
        .bind(&new.personal_email)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_id();

        let mut officers = new.hr_officer_ids.clone();
        officers.sort_unstable();
        officers.dedup();
        if !officers.is_empty() {
            let mut qb = QueryBuilder::<MySql>::new(
                "INSERT INTO employee_hr_officers (employee_id, officer_id) ",
            );
            qb.push_values(officers.iter(), |mut b, officer_id| {
                b.push_bind(id).push_bind(*officer_id);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(Employee {
            id,
            name: new.name,
            department_id: new.department_id,
            manager_id: new.manager_id,
            user_id: new.user_id,
            work_email: new.work_email,
            personal_email: new.personal_email,
            hr_officer_ids: officers,
        })
    }

    async fn update_employee(
        &self,
        id: u64,
        update: EmployeeUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Ok(false);
        }

        let EmployeeUpdate {
            name,
            department_id,
            manager_id,
            user_id,
            work_email,
            personal_email,
            hr_officer_ids,
        } = update;

        let mut qb = QueryBuilder::<MySql>::new("UPDATE employees SET ");
        let mut has_columns = false;
        {
            let mut set = qb.separated(", ");
            if let Some(v) = name {
                set.push("name = ").push_bind_unseparated(v);
                has_columns = true;
            }
            if let Some(v) = department_id {
                set.push("department_id = ").push_bind_unseparated(v);
                has_columns = true;
            }
            if let Some(v) = manager_id {
                set.push("manager_id = ").push_bind_unseparated(v);
                has_columns = true;
            }
            if let Some(v) = user_id {
                set.push("user_id = ").push_bind_unseparated(v);
                has_columns = true;
            }
            if let Some(v) = work_email {
                set.push("work_email = ").push_bind_unseparated(v);
                has_columns = true;
            }
            if let Some(v) = personal_email {
                set.push("personal_email = ").push_bind_unseparated(v);
                has_columns = true;
            }
        }
        if has_columns {
            qb.push(" WHERE id = ").push_bind(id);
            qb.build().execute(&mut *tx).await?;
        }

        if let Some(mut officers) = hr_officer_ids {
            officers.sort_unstable();
            officers.dedup();

            sqlx::query("DELETE FROM employee_hr_officers WHERE employee_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if !officers.is_empty() {
                let mut qb = QueryBuilder::<MySql>::new(
                    "INSERT INTO employee_hr_officers (employee_id, officer_id) ",
                );
                qb.push_values(officers.iter(), |mut b, officer_id| {
                    b.push_bind(id).push_bind(*officer_id);
                });
                qb.build().execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_employee(&self, id: u64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn employees_affected_by(&self, employee_id: u64) -> Result<Vec<u64>, RepositoryError> {
        let mut ids: Vec<u64> = sqlx::query_scalar(
            r#"
            SELECT id FROM employees WHERE id = ? OR manager_id = ?
            UNION
            SELECT employee_id FROM employee_hr_officers WHERE officer_id = ?
            "#,
        )
        .bind(employee_id)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn employees_linked_to_user(&self, user_id: u64) -> Result<Vec<u64>, RepositoryError> {
        let ids: Vec<u64> = sqlx::query_scalar("SELECT id FROM employees WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, RepositoryError> {
        let leave_type = sqlx::query_as::<_, LeaveType>("SELECT id, name FROM leave_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(leave_type)
    }

    async fn find_department(&self, id: u64) -> Result<Option<Department>, RepositoryError> {
        let department =
            sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(department)
    }
}

#[async_trait]
impl LeaveRepository for MySqlRepository {
    async fn insert_leave(&self, new: NewLeaveRecord) -> Result<LeaveRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type_id, date_from, date_to, number_of_days,
                 description, state, first_approver_id, approval_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.leave_type_id)
        .bind(new.date_from)
        .bind(new.date_to)
        .bind(new.number_of_days)
        .bind(&new.description)
        .bind(LeaveState::ToSubmit.as_ref())
        .bind(new.approvers.first)
        .bind(&new.approval_token)
        .bind(new.created_at)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_id();

        if !new.approvers.second.is_empty() {
            let mut qb = QueryBuilder::<MySql>::new(
                "INSERT INTO leave_second_approvers (leave_id, user_id) ",
            );
            qb.push_values(new.approvers.second.iter(), |mut b, user_id| {
                b.push_bind(id).push_bind(*user_id);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(LeaveRequest {
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
        })
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, RepositoryError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_second_approvers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_leaves(
        &self,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, u64), RepositoryError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(state) = filter.state {
            where_sql.push_str(" AND state = ?");
            args.push(FilterValue::Str(state.into()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, page = filter.page, per_page = filter.per_page, "Fetching leave list");

        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((self.with_second_approvers(rows).await?, total.max(0) as u64))
    }

    async fn leaves_of_employees(
        &self,
        employee_ids: &[u64],
    ) -> Result<Vec<(u64, u64)>, RepositoryError> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT id, employee_id FROM leave_requests WHERE employee_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in employee_ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(") ORDER BY id");

        Ok(qb.build_query_as::<(u64, u64)>().fetch_all(&self.pool).await?)
    }

    async fn save_approvers(
        &self,
        leave_id: u64,
        approvers: &Approvers,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE leave_requests SET first_approver_id = ? WHERE id = ?")
            .bind(approvers.first)
            .bind(leave_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM leave_second_approvers WHERE leave_id = ?")
            .bind(leave_id)
            .execute(&mut *tx)
            .await?;

        if !approvers.second.is_empty() {
            let mut qb = QueryBuilder::<MySql>::new(
                "INSERT INTO leave_second_approvers (leave_id, user_id) ",
            );
            qb.push_values(approvers.second.iter(), |mut b, user_id| {
                b.push_bind(leave_id).push_bind(*user_id);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_state(
        &self,
        id: u64,
        expected: LeaveState,
        next: LeaveState,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET state = ?
            WHERE id = ?
            AND state = ?
            "#,
        )
        .bind(next.as_ref())
        .bind(id)
        .bind(expected.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn listings_for_approver(
        &self,
        user_id: u64,
    ) -> Result<Vec<LeaveListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT
                l.id,
                e.name AS employee_name,
                d.name AS department,
                t.name AS leave_type,
                l.description,
                l.date_from,
                l.date_to,
                l.number_of_days,
                l.state,
                l.created_at
            FROM leave_requests l
            JOIN employees e ON e.id = l.employee_id
            JOIN leave_types t ON t.id = l.leave_type_id
            LEFT JOIN departments d ON d.id = e.department_id
            WHERE l.first_approver_id = ?
               OR EXISTS (
                    SELECT 1 FROM leave_second_approvers s
                    WHERE s.leave_id = l.id AND s.user_id = ?
               )
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LeaveListing {
                    id: row.id,
                    employee_name: row.employee_name,
                    department: row.department,
                    leave_type: row.leave_type,
                    description: row.description,
                    date_from: row.date_from,
                    date_to: row.date_to,
                    number_of_days: row.number_of_days,
                    state: parse_state(&row.state)?,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
