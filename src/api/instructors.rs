use std::collections::HashMap;

use crate::{
    auth::{
        auth::AuthUser,
        handlers::{forget_user_id, is_user_id_available, remember_user_id},
        password::hash_password,
    },
    error::{AppError, is_constraint_violation},
    model::instructor::{INSTRUCTOR_COLUMNS, Instructor, InstructorWithModules},
    utils::db_utils::placeholders,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateInstructor {
    #[schema(example = "INS001")]
    pub user_id: String,
    pub name: String,
    #[schema(example = "IT")]
    pub department: String,
    #[schema(example = "Lecturer")]
    pub faculty_role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub qualification: Option<String>,
    pub specialization: Option<String>,
    pub office_number: Option<String>,
    pub password: String,
    #[serde(default)]
    #[schema(example = json!(["IT201"]))]
    pub modules: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignModules {
    #[schema(example = json!(["IT201", "IT202"]))]
    pub modules: Vec<String>,
}

/// Trims, drops blanks and removes duplicates while keeping order.
fn normalize_codes(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if !out.iter().any(|seen| seen == code) {
            out.push(code.to_string());
        }
    }
    out
}

pub(crate) async fn fetch_instructor(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<Instructor>, sqlx::Error> {
    let sql = format!("SELECT {} FROM instructors WHERE id = ?", INSTRUCTOR_COLUMNS);
    sqlx::query_as::<_, Instructor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_instructor_by_user_id(
    pool: &MySqlPool,
    user_id: &str,
) -> Result<Option<Instructor>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM instructors WHERE user_id = ?",
        INSTRUCTOR_COLUMNS
    );
    sqlx::query_as::<_, Instructor>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Module codes assigned to an instructor, in code order.
pub(crate) async fn assigned_module_codes(
    pool: &MySqlPool,
    instructor_id: u64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT module_code FROM instructor_modules WHERE instructor_id = ? ORDER BY module_code",
    )
    .bind(instructor_id)
    .fetch_all(pool)
    .await
}

/// Returns the codes in `codes` that do not name an existing module.
async fn unknown_module_codes(
    pool: &MySqlPool,
    codes: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT code FROM modules WHERE code IN ({})",
        placeholders(codes.len())
    );
    let mut query = sqlx::query_scalar::<_, String>(&sql);
    for code in codes {
        query = query.bind(code);
    }
    let known = query.fetch_all(pool).await?;

    Ok(codes
        .iter()
        .filter(|c| !known.contains(c))
        .cloned()
        .collect())
}

async fn replace_assignments(
    tx: &mut Transaction<'static, MySql>,
    instructor_id: u64,
    codes: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM instructor_modules WHERE instructor_id = ?")
        .bind(instructor_id)
        .execute(&mut **tx)
        .await?;

    for code in codes {
        sqlx::query("INSERT INTO instructor_modules (instructor_id, module_code) VALUES (?, ?)")
            .bind(instructor_id)
            .bind(code)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn check_codes(pool: &MySqlPool, codes: &[String]) -> Result<(), AppError> {
    let unknown = unknown_module_codes(pool, codes).await?;
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Unknown module codes: {}",
            unknown.join(", ")
        )))
    }
}

/// List Instructors
#[utoipa::path(
    get,
    path = "/api/admin/instructors",
    responses(
        (status = 200, description = "All instructors with their module codes", body = [InstructorWithModules])
    ),
    tag = "Instructors",
    security(("bearer_auth" = []))
)]
pub async fn list_instructors(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let sql = format!(
        "SELECT {} FROM instructors ORDER BY user_id",
        INSTRUCTOR_COLUMNS
    );
    let instructors = sqlx::query_as::<_, Instructor>(&sql)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch instructors");
            ErrorInternalServerError("Failed to fetch instructors")
        })?;

    let assignments = sqlx::query_as::<_, (u64, String)>(
        "SELECT instructor_id, module_code FROM instructor_modules ORDER BY module_code",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    let mut by_instructor: HashMap<u64, Vec<String>> = HashMap::new();
    for (instructor_id, code) in assignments {
        by_instructor.entry(instructor_id).or_default().push(code);
    }

    let data: Vec<InstructorWithModules> = instructors
        .into_iter()
        .map(|instructor| InstructorWithModules {
            modules: by_instructor.remove(&instructor.id).unwrap_or_default(),
            instructor,
        })
        .collect();

    Ok(HttpResponse::Ok().json(data))
}

/// Create Instructor
#[utoipa::path(
    post,
    path = "/api/admin/instructors",
    request_body = CreateInstructor,
    responses(
        (status = 201, description = "Instructor created", body = InstructorWithModules),
        (status = 400, description = "Missing fields or unknown module codes"),
        (status = 409, description = "User id already taken")
    ),
    tag = "Instructors",
    security(("bearer_auth" = []))
)]
pub async fn create_instructor(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateInstructor>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = payload.user_id.trim();
    if [user_id, payload.name.trim(), payload.department.trim()]
        .iter()
        .any(|v| v.is_empty())
        || payload.password.is_empty()
    {
        return Err(AppError::bad_request("Missing required fields").into());
    }

    let codes = normalize_codes(&payload.modules);
    check_codes(pool.get_ref(), &codes).await?;

    if !is_user_id_available(user_id, pool.get_ref()).await.map_err(AppError::from)? {
        return Err(AppError::conflict("User id already taken").into());
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let result = sqlx::query(
        r#"
        INSERT INTO instructors
        (user_id, name, department, faculty_role, email, phone, address,
         qualification, specialization, office_number, password)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(payload.name.trim())
    .bind(payload.department.trim())
    .bind(&payload.faculty_role)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.qualification)
    .bind(&payload.specialization)
    .bind(&payload.office_number)
    .bind(hashed)
    .execute(&mut *tx)
    .await;

    let id = match result {
        Ok(res) => res.last_insert_id(),
        Err(e) if is_constraint_violation(&e) => {
            return Err(AppError::conflict("User id already taken").into());
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to create instructor");
            return Err(ErrorInternalServerError("Failed to create instructor"));
        }
    };

    replace_assignments(&mut tx, id, &codes)
        .await
        .map_err(AppError::from)?;
    tx.commit().await.map_err(AppError::from)?;

    remember_user_id(user_id).await;
    info!(user_id, id, modules = ?codes, "Instructor created");

    let instructor = fetch_instructor(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    Ok(HttpResponse::Created().json(InstructorWithModules {
        instructor,
        modules: codes,
    }))
}

/// Get Instructor by ID
#[utoipa::path(
    get,
    path = "/api/admin/instructors/{id}",
    params(("id", Path, description = "Instructor database id")),
    responses(
        (status = 200, description = "Instructor found", body = InstructorWithModules),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Instructors",
    security(("bearer_auth" = []))
)]
pub async fn get_instructor(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let instructor = fetch_instructor(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;
    let modules = assigned_module_codes(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(InstructorWithModules {
        instructor,
        modules,
    }))
}

/// Replace an instructor's module assignments
#[utoipa::path(
    put,
    path = "/api/admin/instructors/{id}/modules",
    params(("id", Path, description = "Instructor database id")),
    request_body = AssignModules,
    responses(
        (status = 200, description = "Assignments replaced", body = Object, example = json!({"success": true, "modules": ["IT201"]})),
        (status = 400, description = "Unknown module codes"),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Instructors",
    security(("bearer_auth" = []))
)]
pub async fn assign_modules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AssignModules>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    fetch_instructor(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    let codes = normalize_codes(&payload.modules);
    check_codes(pool.get_ref(), &codes).await?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    replace_assignments(&mut tx, id, &codes)
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to assign modules");
            ErrorInternalServerError("Failed to assign modules")
        })?;
    tx.commit().await.map_err(AppError::from)?;

    info!(id, modules = ?codes, "Instructor modules replaced");

    Ok(HttpResponse::Ok().json(json!({"success": true, "modules": codes})))
}

/// Delete Instructor
#[utoipa::path(
    delete,
    path = "/api/admin/instructors/{id}",
    params(("id", Path, description = "Instructor database id")),
    responses(
        (status = 200, description = "Deleted, together with the attendance they marked", body = Object, example = json!({"success": true})),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Instructors",
    security(("bearer_auth" = []))
)]
pub async fn delete_instructor(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let instructor = fetch_instructor(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    sqlx::query("DELETE FROM instructors WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to delete instructor");
            ErrorInternalServerError("Failed to delete instructor")
        })?;

    forget_user_id(&instructor.user_id).await;
    info!(user_id = %instructor.user_id, id, "Instructor deleted");

    Ok(HttpResponse::Ok().json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_trimmed_and_deduplicated() {
        let codes = vec![
            " IT201".to_string(),
            "IT202".to_string(),
            "".to_string(),
            "IT201 ".to_string(),
        ];
        assert_eq!(normalize_codes(&codes), vec!["IT201", "IT202"]);
    }

    #[test]
    fn assign_payload_requires_modules() {
        assert!(serde_json::from_str::<AssignModules>("{}").is_err());
        let p: AssignModules = serde_json::from_str(r#"{"modules": []}"#).unwrap();
        assert!(p.modules.is_empty());
    }
}
