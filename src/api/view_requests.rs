use crate::report::render::{render_error, render_page};
use crate::report::{ViewError, ViewParams, ViewQuery};
use crate::workflow::LeaveService;
use actix_web::{HttpResponse, http::StatusCode, web};
use tracing::debug;

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Read-only listing of the leave requests an approver is responsible for.
/// Every failure renders the same error page with a short message.
#[utoipa::path(
    get,
    path = "/leave/view_requests",
    params(ViewQuery),
    responses(
        (status = 200, description = "HTML page of the approver's requests", content_type = "text/html"),
        (status = 400, description = "HTML error page: invalid parameters", content_type = "text/html"),
        (status = 403, description = "HTML error page: invalid or expired link", content_type = "text/html"),
        (status = 404, description = "HTML error page: approver not found", content_type = "text/html")
    ),
    tag = "Leave"
)]
pub async fn view_requests(
    service: web::Data<LeaveService>,
    query: web::Query<ViewQuery>,
) -> HttpResponse {
    let params = match ViewParams::from_query(query.into_inner()) {
        Ok(p) => p,
        Err(e) => return error_page(e),
    };

    match service.view_requests(&params).await {
        Ok(page) => html(StatusCode::OK, render_page(&page)),
        Err(e) => error_page(e),
    }
}

fn error_page(err: ViewError) -> HttpResponse {
    debug!(reason = %err, "View requests page rejected");
    let status = match err {
        ViewError::InvalidParameters => StatusCode::BAD_REQUEST,
        ViewError::InvalidLink => StatusCode::FORBIDDEN,
        ViewError::ApproverNotFound => StatusCode::NOT_FOUND,
        ViewError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    html(status, render_error(err))
}
