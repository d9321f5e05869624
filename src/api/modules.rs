use crate::{
    auth::auth::AuthUser,
    error::{AppError, is_constraint_violation},
    model::module::{MODULE_COLUMNS, Module},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

const DEFAULT_TOTAL_CLASSES: i32 = 40;
const DEFAULT_REQUIREMENT: f64 = 90.0;

/// Payload for both create and full update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertModule {
    #[schema(example = "IT201")]
    pub code: String,
    #[schema(example = "Data Structures")]
    pub name: String,
    #[schema(example = "IT")]
    pub department: String,
    #[schema(example = "2nd")]
    pub year: String,
    #[schema(example = "3rd")]
    pub semester: String,
    #[schema(example = 12)]
    pub credits: i32,
    pub description: Option<String>,
    /// Defaults to 40
    pub total_classes: Option<i32>,
    /// Defaults to 90
    pub requirement: Option<f64>,
}

/// Validated module fields, defaults applied.
#[derive(Debug, PartialEq)]
struct ModuleFields {
    code: String,
    name: String,
    department: String,
    year: String,
    semester: String,
    credits: i32,
    description: String,
    total_classes: i32,
    requirement: f64,
}

impl UpsertModule {
    fn into_fields(self) -> Result<ModuleFields, AppError> {
        let required = [
            &self.code,
            &self.name,
            &self.department,
            &self.year,
            &self.semester,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(AppError::bad_request("Missing required fields"));
        }
        if self.credits <= 0 {
            return Err(AppError::bad_request("Credits must be positive"));
        }

        let total_classes = self.total_classes.unwrap_or(DEFAULT_TOTAL_CLASSES);
        if total_classes <= 0 {
            return Err(AppError::bad_request("total_classes must be positive"));
        }

        let requirement = self.requirement.unwrap_or(DEFAULT_REQUIREMENT);
        if !(requirement > 0.0 && requirement <= 100.0) {
            return Err(AppError::bad_request(
                "requirement must be a percentage between 0 and 100",
            ));
        }

        Ok(ModuleFields {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            department: self.department.trim().to_string(),
            year: self.year.trim().to_string(),
            semester: self.semester.trim().to_string(),
            credits: self.credits,
            description: self.description.unwrap_or_default(),
            total_classes,
            requirement,
        })
    }
}

pub(crate) async fn fetch_module(pool: &MySqlPool, id: u64) -> Result<Option<Module>, sqlx::Error> {
    let sql = format!("SELECT {} FROM modules WHERE id = ?", MODULE_COLUMNS);
    sqlx::query_as::<_, Module>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_module_by_code(
    pool: &MySqlPool,
    code: &str,
) -> Result<Option<Module>, sqlx::Error> {
    let sql = format!("SELECT {} FROM modules WHERE code = ?", MODULE_COLUMNS);
    sqlx::query_as::<_, Module>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// List Modules
#[utoipa::path(
    get,
    path = "/api/admin/modules",
    responses(
        (status = 200, description = "Modules ordered by department, year, semester and code", body = [Module])
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
pub async fn list_modules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let sql = format!(
        "SELECT {} FROM modules ORDER BY department, year, semester, code",
        MODULE_COLUMNS
    );
    let modules = sqlx::query_as::<_, Module>(&sql)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch modules");
            ErrorInternalServerError("Failed to fetch modules")
        })?;

    Ok(HttpResponse::Ok().json(modules))
}

/// Create Module
#[utoipa::path(
    post,
    path = "/api/admin/modules",
    request_body = UpsertModule,
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Module code already exists")
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
pub async fn create_module(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpsertModule>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let fields = payload.into_inner().into_fields()?;

    if fetch_module_by_code(pool.get_ref(), &fields.code)
        .await
        .map_err(AppError::from)?
        .is_some()
    {
        return Err(AppError::conflict("Module code already exists").into());
    }

    let result = sqlx::query(
        r#"
        INSERT INTO modules
        (code, name, department, year, semester, credits, description, total_classes, requirement)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fields.code)
    .bind(&fields.name)
    .bind(&fields.department)
    .bind(&fields.year)
    .bind(&fields.semester)
    .bind(fields.credits)
    .bind(&fields.description)
    .bind(fields.total_classes)
    .bind(fields.requirement)
    .execute(pool.get_ref())
    .await;

    let id = match result {
        Ok(res) => res.last_insert_id(),
        Err(e) if is_constraint_violation(&e) => {
            return Err(AppError::conflict("Module code already exists").into());
        }
        Err(e) => {
            error!(error = %e, code = %fields.code, "Failed to create module");
            return Err(ErrorInternalServerError("Failed to create module"));
        }
    };

    info!(code = %fields.code, id, "Module created");

    let module = fetch_module(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    Ok(HttpResponse::Created().json(module))
}

/// Get Module by ID
#[utoipa::path(
    get,
    path = "/api/admin/modules/{id}",
    params(("id", Path, description = "Module database id")),
    responses(
        (status = 200, description = "Module found", body = Module),
        (status = 404, description = "Module not found")
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
pub async fn get_module(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let module = fetch_module(pool.get_ref(), path.into_inner())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    Ok(HttpResponse::Ok().json(module))
}

/// Update Module
///
/// Renaming a module code also renames it in every instructor's assignment.
#[utoipa::path(
    put,
    path = "/api/admin/modules/{id}",
    params(("id", Path, description = "Module database id")),
    request_body = UpsertModule,
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Module not found"),
        (status = 409, description = "Module code already exists")
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
pub async fn update_module(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpsertModule>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();
    let fields = payload.into_inner().into_fields()?;

    let existing = fetch_module(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    if let Some(other) = fetch_module_by_code(pool.get_ref(), &fields.code)
        .await
        .map_err(AppError::from)?
    {
        if other.id != id {
            return Err(AppError::conflict("Module code already exists").into());
        }
    }

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let updated = sqlx::query(
        r#"
        UPDATE modules
        SET code = ?, name = ?, department = ?, year = ?, semester = ?,
            credits = ?, description = ?, total_classes = ?, requirement = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.code)
    .bind(&fields.name)
    .bind(&fields.department)
    .bind(&fields.year)
    .bind(&fields.semester)
    .bind(fields.credits)
    .bind(&fields.description)
    .bind(fields.total_classes)
    .bind(fields.requirement)
    .bind(id)
    .execute(&mut *tx)
    .await;

    if let Err(e) = updated {
        if is_constraint_violation(&e) {
            return Err(AppError::conflict("Module code already exists").into());
        }
        error!(error = %e, id, "Failed to update module");
        return Err(ErrorInternalServerError("Failed to update module"));
    }

    if existing.code != fields.code {
        sqlx::query("UPDATE instructor_modules SET module_code = ? WHERE module_code = ?")
            .bind(&fields.code)
            .bind(&existing.code)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
    }

    tx.commit().await.map_err(AppError::from)?;

    let module = fetch_module(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    Ok(HttpResponse::Ok().json(module))
}

/// Delete Module
#[utoipa::path(
    delete,
    path = "/api/admin/modules/{id}",
    params(("id", Path, description = "Module database id")),
    responses(
        (status = 200, description = "Deleted, together with its attendance and assignments", body = Object, example = json!({"success": true})),
        (status = 404, description = "Module not found")
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
pub async fn delete_module(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let module = fetch_module(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    sqlx::query("DELETE FROM instructor_modules WHERE module_code = ?")
        .bind(&module.code)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

    sqlx::query("DELETE FROM modules WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to delete module");
            ErrorInternalServerError("Failed to delete module")
        })?;

    tx.commit().await.map_err(AppError::from)?;

    info!(code = %module.code, id, "Module deleted");

    Ok(HttpResponse::Ok().json(json!({"success": true})))
}
