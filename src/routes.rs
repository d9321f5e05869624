use crate::{
    api::{attendance, dashboard, instructors, modules, profile, students},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;
use tracing::warn;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(burst)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            Default::default()
        });
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::resource("/auth/change-password")
                    .route(web::post().to(handlers::change_password)),
            )
            // /attendance
            .service(
                web::resource("/attendance").route(web::post().to(attendance::mark_attendance)),
            )
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/dashboard").route(web::get().to(dashboard::admin_dashboard)),
                    )
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(attendance::attendance_summary)),
                    )
                    // /admin/students
                    .service(
                        web::resource("/students")
                            .route(web::get().to(students::list_students))
                            .route(web::post().to(students::create_student)),
                    )
                    .service(
                        web::resource("/students/{id}")
                            .route(web::get().to(students::get_student))
                            .route(web::put().to(students::update_student))
                            .route(web::delete().to(students::delete_student)),
                    )
                    // /admin/instructors
                    .service(
                        web::resource("/instructors")
                            .route(web::get().to(instructors::list_instructors))
                            .route(web::post().to(instructors::create_instructor)),
                    )
                    .service(
                        web::resource("/instructors/{id}")
                            .route(web::get().to(instructors::get_instructor))
                            .route(web::delete().to(instructors::delete_instructor)),
                    )
                    .service(
                        web::resource("/instructors/{id}/modules")
                            .route(web::put().to(instructors::assign_modules)),
                    )
                    // /admin/modules
                    .service(
                        web::resource("/modules")
                            .route(web::get().to(modules::list_modules))
                            .route(web::post().to(modules::create_module)),
                    )
                    .service(
                        web::resource("/modules/{id}")
                            .route(web::get().to(modules::get_module))
                            .route(web::put().to(modules::update_module))
                            .route(web::delete().to(modules::delete_module)),
                    ),
            )
            .service(
                web::scope("/instructor")
                    .service(
                        web::resource("/dashboard")
                            .route(web::get().to(dashboard::instructor_dashboard)),
                    )
                    .service(
                        web::resource("/modules").route(web::get().to(dashboard::instructor_modules)),
                    )
                    .service(
                        web::resource("/module-students")
                            .route(web::get().to(dashboard::module_students)),
                    )
                    .service(
                        web::resource("/profile")
                            .route(web::get().to(profile::get_instructor_profile))
                            .route(web::put().to(profile::update_instructor_profile)),
                    ),
            )
            .service(
                web::scope("/student")
                    .service(
                        web::resource("/dashboard").route(web::get().to(dashboard::student_dashboard)),
                    )
                    .service(
                        web::resource("/profile")
                            .route(web::get().to(profile::get_student_profile))
                            .route(web::put().to(profile::update_student_profile)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn protected_scope_requires_a_token() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        for uri in ["/api/admin/dashboard", "/api/student/profile", "/api/instructor/modules"] {
            let req = actix_test::TestRequest::get()
                .uri(uri)
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    /// Status codes of `n` back-to-back requests through a limiter.
    async fn statuses(requests_per_min: u32, n: usize) -> Vec<StatusCode> {
        let app = actix_test::init_service(
            App::new().service(
                web::resource("/ping")
                    .wrap(Arc::new(build_limiter(requests_per_min)))
                    .to(|| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let req = actix_test::TestRequest::get()
                .uri("/ping")
                .peer_addr("127.0.0.1:4001".parse().unwrap())
                .to_request();
            out.push(actix_test::call_service(&app, req).await.status());
        }
        out
    }

    #[actix_web::test]
    async fn zero_rate_is_clamped_to_one_request() {
        assert_eq!(
            statuses(0, 2).await,
            vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[actix_web::test]
    async fn high_rate_allows_a_burst() {
        assert!(statuses(120_000, 5).await.iter().all(|s| *s == StatusCode::OK));
    }
}
