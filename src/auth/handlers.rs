use crate::utils::{user_id_cache, user_id_filter};
use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::role::Role,
    models::{AccountSql, ChangePasswordReq, Claims, LoginReqDto, LoginRole, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    #[schema(example = "instructor")]
    role: String,
    #[schema(example = "/instructor_dashboard")]
    redirect: String,
}

async fn find_account(
    pool: &MySqlPool,
    role: Role,
    user_id: &str,
) -> Result<Option<AccountSql>, sqlx::Error> {
    let sql = format!(
        "SELECT id, user_id, password FROM {} WHERE user_id = ?",
        role.table()
    );
    sqlx::query_as::<_, AccountSql>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// true  => user id AVAILABLE
/// false => user id TAKEN (in any of the account tables)
///
/// The filter and cache only short-circuit positives; "available" always
/// comes from the database, since the filter may be cold or have lost a
/// fingerprint on removal.
pub async fn is_user_id_available(user_id: &str, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    // 1️⃣ Moka cache: fast positive
    if user_id_cache::is_taken(user_id).await {
        return Ok(false);
    }

    // 2️⃣ Database: authoritative
    let hits = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT EXISTS(SELECT 1 FROM students WHERE user_id = ?)
            OR EXISTS(SELECT 1 FROM instructors WHERE user_id = ?)
            OR EXISTS(SELECT 1 FROM admins WHERE user_id = ?)
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    let exists = hits > 0;

    if exists {
        // 3️⃣ Cuckoo filter: backfill ids the warmup has not reached
        if !user_id_filter::might_exist(user_id) {
            debug!(user_id, "User id missing from filter, backfilling");
            user_id_filter::insert(user_id);
        }
        user_id_cache::mark_taken(user_id).await;
    }

    Ok(!exists)
}

/// Records a newly created account id in the filter and cache.
pub async fn remember_user_id(user_id: &str) {
    user_id_filter::insert(user_id);
    user_id_cache::mark_taken(user_id).await;
}

/// Drops a deleted account id from the filter and cache.
pub async fn forget_user_id(user_id: &str) {
    user_id_filter::remove(user_id);
    user_id_cache::forget(user_id).await;
}

/// Resolves a login id for the chosen form. Faculty ids are checked against
/// admins before instructors.
async fn resolve_account(
    pool: &MySqlPool,
    login_role: LoginRole,
    user_id: &str,
) -> Result<Option<(Role, AccountSql)>, sqlx::Error> {
    let candidates: &[Role] = match login_role {
        LoginRole::Faculty => &[Role::Admin, Role::Instructor],
        LoginRole::Student => &[Role::Student],
    };

    for role in candidates {
        if let Some(account) = find_account(pool, *role, user_id).await? {
            return Ok(Some((*role, account)));
        }
    }
    Ok(None)
}

/// Issues a token pair and records the refresh token's jti.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    account_id: u64,
    user_id: &str,
    role: Role,
) -> Result<(String, String), HttpResponse> {
    let access_token = generate_access_token(
        account_id,
        user_id.to_string(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        HttpResponse::InternalServerError().finish()
    })?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        account_id,
        user_id.to_string(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    debug!(account_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (role_id, account_id, jti, expires_at)
        VALUES (?, ?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(role.id())
    .bind(account_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    Ok((access_token, refresh_token))
}

fn bearer_refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))?;

    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|claims| claims.token_type == TokenType::Refresh)
}

/// Login for all three roles
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing user id or password"),
        (status = 401, description = "Wrong credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(user_id = %user.user_id, role = %user.role)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.user_id.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty user id or password");
        return HttpResponse::BadRequest().json(json!({"error": "Missing required fields"}));
    }

    let (role, account) = match resolve_account(pool.get_ref(), user.role, user.user_id.trim()).await
    {
        Ok(Some(found)) => {
            debug!(account_id = found.1.id, role = %found.0, "Account found");
            found
        }
        Ok(None) => {
            info!("Invalid credentials: account not found");
            return HttpResponse::Unauthorized().json(json!({"error": "Wrong credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching account");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &account.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"error": "Wrong credentials"}));
    }

    let (access_token, refresh_token) =
        match issue_tokens(pool.get_ref(), &config, account.id, &account.user_id, role).await {
            Ok(pair) => pair,
            Err(resp) => return resp,
        };

    // non-fatal
    let sql = format!("UPDATE {} SET last_login_at = NOW() WHERE id = ?", role.table());
    if let Err(e) = sqlx::query(&sql).bind(account.id).execute(pool.get_ref()).await {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        role: role.to_string(),
        redirect: role.home().to_string(),
    })
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object, example = json!({
            "access_token": "eyJ...",
            "refresh_token": "eyJ..."
        })),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match bearer_refresh_claims(&req, &config) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };

    let role = match Role::from_id(claims.role) {
        Some(r) => r,
        None => return HttpResponse::Unauthorized().finish(),
    };

    // revoke the presented token; zero rows means unknown or already revoked
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    match revoked {
        Ok(res) if res.rows_affected() == 1 => {}
        Ok(_) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    match issue_tokens(pool.get_ref(), &config, claims.account_id, &claims.sub, role).await {
        Ok((access_token, refresh_token)) => HttpResponse::Ok().json(json!({
            "access_token": access_token,
            "refresh_token": refresh_token
        })),
        Err(resp) => resp,
    }
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(claims) = bearer_refresh_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    // success even if token didn't exist
    HttpResponse::NoContent().finish()
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({"success": true})),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Current password is incorrect"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ChangePasswordReq>,
) -> actix_web::Result<impl Responder> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({"error": "Missing required fields"})));
    }

    let account = find_account(pool.get_ref(), auth.role, &auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %auth.user_id, "Failed to fetch account");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(account) = account else {
        return Ok(HttpResponse::NotFound().json(json!({"error": "User not found"})));
    };

    if verify_password(&payload.current_password, &account.password).is_err() {
        return Ok(HttpResponse::Unauthorized()
            .json(json!({"error": "Current password is incorrect"})));
    }

    let hashed = hash_password(&payload.new_password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let sql = format!("UPDATE {} SET password = ? WHERE id = ?", auth.role.table());
    sqlx::query(&sql)
        .bind(hashed)
        .bind(account.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %auth.user_id, "Failed to update password");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    info!(user_id = %auth.user_id, "Password changed");

    Ok(HttpResponse::Ok().json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::mysql::MySqlPoolOptions;
    use std::time::Duration;

    // nothing listens on port 1, so any query fails fast
    fn unreachable_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("mysql://attendance@127.0.0.1:1/attendance")
            .unwrap()
    }

    #[actix_web::test]
    async fn unseen_id_is_checked_against_the_database() {
        let pool = unreachable_pool();
        assert!(!user_id_filter::might_exist("availability-ins901"));
        assert!(is_user_id_available("availability-ins901", &pool).await.is_err());
    }

    #[actix_web::test]
    async fn cached_id_is_taken_without_a_query() {
        let pool = unreachable_pool();
        remember_user_id("availability-ins902").await;
        assert!(!is_user_id_available("Availability-INS902", &pool).await.unwrap());

        forget_user_id("availability-ins902").await;
        assert!(is_user_id_available("availability-ins902", &pool).await.is_err());
    }
}
