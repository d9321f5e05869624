use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"error": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let auth_user = match AuthUser::from_bearer(header_value, &config.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            let resp = HttpResponse::Unauthorized().json(json!({"error": e}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::model::role::Role;
    use actix_web::{App, HttpResponse, middleware::from_fn, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id)
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests()))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/me", web::get().to(whoami)),
                ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_token_reaches_the_handler() {
        let config = Config::for_tests();
        let token =
            generate_access_token(1, "ADM001".to_string(), Role::Admin, &config.jwt_secret, 60)
                .unwrap();

        let app = test::init_service(
            App::new().app_data(Data::new(config)).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "ADM001");
    }
}
