use std::str::FromStr;

use crate::api::page_bounds;
use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveState};
use crate::repository::LeaveFilter;
use crate::workflow::service::NewLeave;
use crate::workflow::{LeaveError, LeaveService};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's employee record; other employees need HR/Admin
    #[schema(example = 7)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date_from: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub date_to: NaiveDate,
    /// Defaults to the inclusive day count
    #[schema(example = 3.0)]
    pub number_of_days: Option<f64>,
    #[schema(example = "Family trip")]
    pub description: Option<String>,
}

impl From<CreateLeave> for NewLeave {
    fn from(p: CreateLeave) -> Self {
        NewLeave {
            employee_id: p.employee_id,
            leave_type_id: p.leave_type_id,
            date_from: p.date_from,
            date_to: p.date_to,
            number_of_days: p.number_of_days,
            description: p.description,
        }
    }
}

/// Direct state write; runs the same checks as the action endpoints.
#[derive(Deserialize, ToSchema)]
pub struct WriteLeaveState {
    #[schema(example = "refused")]
    pub state: LeaveState,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveListQuery {
    /// Filter by employee ID (HR/Admin)
    pub employee_id: Option<u64>,
    /// Filter by state, e.g. to_approve
    pub state: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ViewLinkResponse {
    #[schema(example = "http://localhost:8080/leave/view_requests?token=ab12&approver_id=3")]
    pub url: String,
}

/// Create a leave request in `to_submit`; approvers are resolved immediately
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request created", body = LeaveRequest),
        (status = 400, description = "Invalid dates or missing employee profile"),
        (status = 404, description = "Unknown employee or leave type")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let leave = service
        .create_leave(&auth.actor(), payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown state")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveListQuery>,
) -> actix_web::Result<impl Responder> {
    let (page, per_page) = page_bounds(query.page, query.per_page);
    let state = query
        .state
        .as_deref()
        .map(|s| {
            LeaveState::from_str(s)
                .map_err(|_| LeaveError::Validation(format!("Unknown state: {s}")))
        })
        .transpose()?;

    let filter = LeaveFilter {
        employee_id: query.employee_id,
        state,
        page,
        per_page,
    };
    let (data, total) = service.list_leaves(&auth.actor(), filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Not the owner, an approver or HR"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = service.get_leave(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    patch,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = WriteLeaveState,
    responses(
        (status = 200, description = "State changed", body = LeaveRequest),
        (status = 403, description = "Caller may not perform this transition"),
        (status = 409, description = "Invalid transition or concurrent change"),
        (status = 422, description = "No approver configured")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn write_leave_state(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: web::Json<WriteLeaveState>,
) -> actix_web::Result<impl Responder> {
    let leave = service
        .transition(&auth.actor(), path.into_inner(), body.state)
        .await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Submit for first approval
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/submit",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to submit")
    ),
    responses(
        (status = 200, description = "Leave submitted", body = LeaveRequest),
        (status = 409, description = "Not in to_submit")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = service.submit(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// First approval (to_approve) or final approval (second_approval)
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved for the current stage", body = LeaveRequest),
        (status = 403, description = "Not the approver of this stage"),
        (status = 409, description = "Nothing to approve or concurrent change"),
        (status = 422, description = "No approver configured")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = service.approve(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/refuse",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to refuse")
    ),
    responses(
        (status = 200, description = "Leave refused", body = LeaveRequest),
        (status = 403, description = "Not an approver or HR"),
        (status = 409, description = "Not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn refuse_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = service.refuse(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 403, description = "Not the employee or HR"),
        (status = 409, description = "Already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = service.cancel(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Signed link to the caller's read-only "view requests" page
#[utoipa::path(
    get,
    path = "/api/leave/view_link",
    responses(
        (status = 200, description = "Signed link", body = ViewLinkResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn view_link(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(ViewLinkResponse {
        url: service.view_link(&auth.actor()),
    }))
}
