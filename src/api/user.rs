use crate::auth::auth::AuthUser;
use crate::workflow::LeaveService;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SetUserActive {
    #[schema(example = false)]
    pub active: bool,
}

/// Activate or deactivate a login; approvers of affected leaves are recomputed
#[utoipa::path(
    put,
    path = "/api/user/{user_id}/active",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body = SetUserActive,
    responses(
        (status = 200, description = "Active flag updated", body = Object, example = json!({
            "message": "User updated",
            "active": false
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn set_user_active(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: web::Json<SetUserActive>,
) -> actix_web::Result<impl Responder> {
    service
        .set_user_active(&auth.actor(), path.into_inner(), body.active)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated",
        "active": body.active
    })))
}

#[cfg(test)]
mod tests {
    use crate::testing::Fixture;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn deactivation_recomputes_first_approver() {
        let fx = Fixture::new().await;
        let leave = fx.create_leave_for_erin().await;
        let app = test::init_service(App::new().configure(|c| fx.configure(c))).await;

        let req = test::TestRequest::put()
            .uri(&format!("/api/user/{}/active", Fixture::MONA))
            .insert_header(("Authorization", fx.bearer(&fx.hr())))
            .set_json(json!({ "active": false }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = fx.service.get_leave(&fx.hr(), leave.id).await.unwrap();
        assert_eq!(stored.first_approver_id, None);
    }

    #[actix_web::test]
    async fn unknown_user_is_404() {
        let fx = Fixture::new().await;
        let app = test::init_service(App::new().configure(|c| fx.configure(c))).await;

        let req = test::TestRequest::put()
            .uri("/api/user/77777/active")
            .insert_header(("Authorization", fx.bearer(&fx.hr())))
            .set_json(json!({ "active": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
