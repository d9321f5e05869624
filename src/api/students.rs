use crate::{
    auth::{
        auth::AuthUser,
        handlers::{forget_user_id, is_user_id_available, remember_user_id},
        password::hash_password,
    },
    error::{AppError, is_constraint_violation},
    model::student::{STUDENT_COLUMNS, Student},
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns an admin may change through `PUT /admin/students/{id}`.
pub const STUDENT_UPDATABLE: &[&str] = &[
    "name",
    "department",
    "year",
    "semester",
    "program",
    "email",
    "phone",
    "address",
    "emergency_contact",
    "profile_picture",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateStudent {
    #[schema(example = "02230001")]
    pub user_id: String,
    #[schema(example = "Karma Wangmo")]
    pub name: String,
    #[schema(example = "IT")]
    pub department: String,
    #[schema(example = "2nd")]
    pub year: String,
    #[schema(example = "3rd")]
    pub semester: Option<String>,
    pub program: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub password: String,
}

impl CreateStudent {
    fn validate(&self) -> Result<(), AppError> {
        let required = [
            &self.user_id,
            &self.name,
            &self.department,
            &self.year,
            &self.password,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(AppError::bad_request("Missing required fields"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct StudentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by department
    pub department: Option<String>,
    /// Filter by year label, e.g. `2nd`
    pub year: Option<String>,
    /// Search by user id or name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<Student>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
}

pub(crate) async fn fetch_student(pool: &MySqlPool, id: u64) -> Result<Option<Student>, sqlx::Error> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Create Student
#[utoipa::path(
    post,
    path = "/api/admin/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "User id already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStudent>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    payload.validate()?;

    let user_id = payload.user_id.trim();
    if !is_user_id_available(user_id, pool.get_ref()).await.map_err(AppError::from)? {
        return Err(AppError::conflict("User id already taken").into());
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO students
        (user_id, name, department, year, semester, program, email, phone, address, emergency_contact, password)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(payload.name.trim())
    .bind(payload.department.trim())
    .bind(payload.year.trim())
    .bind(&payload.semester)
    .bind(&payload.program)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.emergency_contact)
    .bind(hashed)
    .execute(pool.get_ref())
    .await;

    let id = match result {
        Ok(res) => res.last_insert_id(),
        Err(e) if is_constraint_violation(&e) => {
            return Err(AppError::conflict("User id already taken").into());
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to create student");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    remember_user_id(user_id).await;
    info!(user_id, id, "Student created");

    let student = fetch_student(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Student"))?;

    Ok(HttpResponse::Created().json(student))
}

/// List Students
#[utoipa::path(
    get,
    path = "/api/admin/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Paginated student list ordered by user id", body = StudentListResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn list_students(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 500);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(department) = query.department.as_deref().filter(|v| !v.trim().is_empty()) {
        conditions.push("department = ?");
        bindings.push(department.trim().to_string());
    }

    if let Some(year) = query.year.as_deref().filter(|v| !v.trim().is_empty()) {
        conditions.push("year = ?");
        bindings.push(year.trim().to_string());
    }

    if let Some(search) = query.search.as_deref().filter(|v| !v.trim().is_empty()) {
        conditions.push("(user_id LIKE ? OR name LIKE ?)");
        let like = format!("%{}%", search.trim());
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM students {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting students");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count students");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM students {} ORDER BY user_id ASC LIMIT ? OFFSET ?",
        STUDENT_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching students");

    let mut data_query = sqlx::query_as::<_, Student>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let students = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch students");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(StudentListResponse {
        data: students,
        page,
        per_page,
        total,
    }))
}

/// Get Student by ID
#[utoipa::path(
    get,
    path = "/api/admin/students/{id}",
    params(("id", Path, description = "Student database id")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let student = fetch_student(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Student"))?;

    Ok(HttpResponse::Ok().json(student))
}

/// Update Student
#[utoipa::path(
    put,
    path = "/api/admin/students/{id}",
    params(("id", Path, description = "Student database id")),
    request_body(content = Object, description = "Any subset of the updatable student fields"),
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Empty payload or non-updatable field"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let update = build_update_sql("students", &body, STUDENT_UPDATABLE, "id", id)?;

    execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, id, "Failed to update student");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // rows_affected is 0 for a no-op update, so existence is checked by reading back
    let student = fetch_student(pool.get_ref(), id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Student"))?;

    Ok(HttpResponse::Ok().json(student))
}

/// Delete Student
#[utoipa::path(
    delete,
    path = "/api/admin/students/{id}",
    params(("id", Path, description = "Student database id")),
    responses(
        (status = 200, description = "Deleted, together with the student's attendance", body = Object, example = json!({"success": true})),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let Some(student) = fetch_student(pool.get_ref(), id).await.map_err(AppError::from)? else {
        return Err(AppError::NotFound("Student").into());
    };

    sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to delete student");
            ErrorInternalServerError("Internal Server Error")
        })?;

    forget_user_id(&student.user_id).await;
    info!(user_id = %student.user_id, id, "Student deleted");

    Ok(HttpResponse::Ok().json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateStudent {
        CreateStudent {
            user_id: "02230001".to_string(),
            name: "Karma".to_string(),
            department: "IT".to_string(),
            year: "2nd".to_string(),
            semester: None,
            program: None,
            email: None,
            phone: None,
            address: None,
            emergency_contact: None,
            password: "pw".to_string(),
        }
    }

    #[test]
    fn complete_payload_is_valid() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut p = payload();
        p.department = "  ".to_string();
        assert!(matches!(p.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn password_and_user_id_are_not_updatable() {
        assert!(!STUDENT_UPDATABLE.contains(&"password"));
        assert!(!STUDENT_UPDATABLE.contains(&"user_id"));
    }
}
