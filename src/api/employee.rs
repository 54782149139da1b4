use crate::api::{double_option, page_bounds};
use crate::auth::auth::AuthUser;
use crate::model::employee::Employee;
use crate::repository::{EmployeeUpdate, NewEmployee};
use crate::workflow::LeaveService;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    /// Employee whose user becomes the first approver
    #[schema(example = 3)]
    pub manager_id: Option<u64>,
    #[schema(example = 21)]
    pub user_id: Option<u64>,
    #[schema(example = "john@company.com", format = "email")]
    pub work_email: Option<String>,
    #[schema(example = "john@home.net", format = "email")]
    pub personal_email: Option<String>,
    /// Employees whose users become the second approvers
    #[serde(default)]
    #[schema(example = json!([4, 5]))]
    pub hr_officer_ids: Vec<u64>,
}

impl From<CreateEmployee> for NewEmployee {
    fn from(p: CreateEmployee) -> Self {
        NewEmployee {
            name: p.name,
            department_id: p.department_id,
            manager_id: p.manager_id,
            user_id: p.user_id,
            work_email: p.work_email,
            personal_email: p.personal_email,
            hr_officer_ids: p.hr_officer_ids,
        }
    }
}

/// Omitted fields stay untouched; `null` clears a field.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u64>, nullable = true)]
    pub department_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u64>, nullable = true)]
    pub manager_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u64>, nullable = true)]
    pub user_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable = true)]
    pub work_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable = true)]
    pub personal_email: Option<Option<String>>,
    pub hr_officer_ids: Option<Vec<u64>>,
}

impl From<UpdateEmployee> for EmployeeUpdate {
    fn from(p: UpdateEmployee) -> Self {
        EmployeeUpdate {
            name: p.name,
            department_id: p.department_id,
            manager_id: p.manager_id,
            user_id: p.user_id,
            work_email: p.work_email,
            personal_email: p.personal_email,
            hr_officer_ids: p.hr_officer_ids,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Page number (start with 1)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 10)]
    pub total: u64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload or references"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee = service
        .create_employee(&auth.actor(), payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let (page, per_page) = page_bounds(query.page, query.per_page);
    let (data, total) = service
        .list_employees(&auth.actor(), page, per_page)
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = service
        .get_employee(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee; manager, user or HR-officer changes recompute leave approvers
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Empty or invalid update"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee = service
        .update_employee(&auth.actor(), path.into_inner(), body.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    service
        .delete_employee(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
