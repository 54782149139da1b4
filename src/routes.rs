use crate::{
    api::{employee, leave_request, user, view_requests},
    auth::middleware::auth_middleware,
    config::Config,
    report::render::VIEW_PATH,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Endpoints mounted under the bearer-protected API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employee")
            // /employee
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            // /employee/{id}
            .service(
                web::resource("/{id}")
                    .route(web::put().to(employee::update_employee))
                    .route(web::get().to(employee::get_employee))
                    .route(web::delete().to(employee::delete_employee)),
            ),
    )
    .service(
        web::resource("/user/{id}/active").route(web::put().to(user::set_user_active)),
    )
    .service(
        web::scope("/leave")
            // /leave
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::leave_list))
                    .route(web::post().to(leave_request::create_leave)),
            )
            // before /{id} so it is not parsed as an id
            .service(web::resource("/view_link").route(web::get().to(leave_request::view_link)))
            // /leave/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(leave_request::get_leave))
                    .route(web::patch().to(leave_request::write_leave_state)),
            )
            .service(
                web::resource("/{id}/submit").route(web::put().to(leave_request::submit_leave)),
            )
            .service(
                web::resource("/{id}/approve")
                    .route(web::put().to(leave_request::approve_leave)),
            )
            .service(
                web::resource("/{id}/refuse").route(web::put().to(leave_request::refuse_leave)),
            )
            .service(
                web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave)),
            ),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("non-zero rate limit");
        Governor::new(&cfg)
    }

    let view_limiter = Arc::new(build_limiter(config.rate_view_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public, authorized by the signed query token
    cfg.service(
        web::resource(VIEW_PATH)
            .wrap(view_limiter)
            .route(web::get().to(view_requests::view_requests)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .configure(api_routes),
    );
}
