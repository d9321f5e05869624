use crate::{
    api::dashboard::{InstructorQuery, acting_instructor},
    api::instructors::fetch_instructor,
    api::students::fetch_student,
    auth::auth::AuthUser,
    error::AppError,
    model::{instructor::Instructor, student::Student},
    utils::db_utils::{build_update_sql, execute_update, strip_blank_fields},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

const NOT_PROVIDED: &str = "Not Provided";
const NOT_SPECIFIED: &str = "Not Specified";
const DEFAULT_STUDENT_PICTURE: &str = "/default-student.png";
const DEFAULT_FACULTY_PICTURE: &str = "/default-faculty.png";

/// Columns a student may change on their own profile.
pub const STUDENT_PROFILE_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "address",
    "profile_picture",
    "emergency_contact",
    "semester",
    "program",
];

/// Columns an instructor may change on their own profile.
pub const INSTRUCTOR_PROFILE_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "address",
    "profile_picture",
    "qualification",
    "specialization",
    "office_number",
];

fn or_default(value: Option<String>, default: impl FnOnce() -> String) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(default)
}

fn default_email(user_id: &str) -> String {
    format!("{}@example.com", user_id.to_lowercase())
}

/// `+975` followed by the last eight characters of the user id.
fn default_phone(user_id: &str) -> String {
    let start = user_id
        .char_indices()
        .rev()
        .nth(7)
        .map_or(0, |(i, _)| i);
    format!("+975 {}", &user_id[start..])
}

/// `profilePicture` → `profile_picture`
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Accepts camelCase or snake_case keys and drops blank values, so an empty
/// field leaves the stored value unchanged.
fn normalize_profile_payload(body: Value) -> Value {
    let mut normalized = match body {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| (snake_case(&k), v))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    };
    strip_blank_fields(&mut normalized);
    normalized
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.is_empty())
}

// ---------- student ----------

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub semester: String,
    pub program: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub emergency_contact: String,
    pub profile_picture: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Student> for StudentProfile {
    fn from(s: Student) -> Self {
        let email = or_default(s.email, || default_email(&s.user_id));
        let phone = or_default(s.phone, || default_phone(&s.user_id));
        let program = or_default(s.program, || s.department.clone());
        StudentProfile {
            id: s.id,
            email,
            phone,
            program,
            semester: or_default(s.semester, || NOT_SPECIFIED.to_string()),
            address: or_default(s.address, || NOT_PROVIDED.to_string()),
            emergency_contact: or_default(s.emergency_contact, || NOT_PROVIDED.to_string()),
            profile_picture: or_default(s.profile_picture, || DEFAULT_STUDENT_PICTURE.to_string()),
            year: if s.year.trim().is_empty() {
                NOT_SPECIFIED.to_string()
            } else {
                s.year
            },
            user_id: s.user_id,
            name: s.name,
            department: s.department,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentProfileResponse {
    pub profile: StudentProfile,
}

async fn load_student_profile(pool: &MySqlPool, id: u64) -> actix_web::Result<StudentProfile> {
    let student = fetch_student(pool, id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Student"))?;
    Ok(student.into())
}

/// Student Profile
#[utoipa::path(
    get,
    path = "/api/student/profile",
    responses(
        (status = 200, description = "Profile with defaults filled in", body = StudentProfileResponse),
        (status = 403, description = "Student only"),
        (status = 404, description = "Student not found")
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn get_student_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;
    let profile = load_student_profile(pool.get_ref(), auth.account_id).await?;
    Ok(HttpResponse::Ok().json(StudentProfileResponse { profile }))
}

/// Update Student Profile
#[utoipa::path(
    put,
    path = "/api/student/profile",
    request_body(content = Object, description = "Any of name, email, phone, address, profilePicture, emergencyContact, semester, program"),
    responses(
        (status = 200, description = "Updated profile", body = StudentProfileResponse),
        (status = 400, description = "Field cannot be updated"),
        (status = 403, description = "Student only")
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn update_student_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;
    let payload = normalize_profile_payload(body.into_inner());

    if !is_empty_object(&payload) {
        let update = build_update_sql(
            "students",
            &payload,
            STUDENT_PROFILE_FIELDS,
            "id",
            auth.account_id,
        )?;
        execute_update(pool.get_ref(), update).await.map_err(|e| {
            error!(error = %e, user_id = %auth.user_id, "Failed to update student profile");
            ErrorInternalServerError("Failed to update profile")
        })?;
        info!(user_id = %auth.user_id, "Student profile updated");
    }

    let profile = load_student_profile(pool.get_ref(), auth.account_id).await?;
    Ok(HttpResponse::Ok().json(StudentProfileResponse { profile }))
}

// ---------- instructor ----------

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetail {
    pub code: String,
    pub name: String,
    pub department: String,
    pub total_classes: i32,
    pub requirement: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorProfile {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub department: String,
    pub faculty_role: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub profile_picture: String,
    pub qualification: String,
    pub specialization: String,
    pub office_number: String,
    pub modules: Vec<ModuleDetail>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl InstructorProfile {
    fn new(i: Instructor, modules: Vec<ModuleDetail>) -> Self {
        let not_provided = || NOT_PROVIDED.to_string();
        InstructorProfile {
            id: i.id,
            email: or_default(i.email, || default_email(&i.user_id)),
            phone: or_default(i.phone, not_provided),
            address: or_default(i.address, not_provided),
            profile_picture: or_default(i.profile_picture, || DEFAULT_FACULTY_PICTURE.to_string()),
            qualification: or_default(i.qualification, not_provided),
            specialization: or_default(i.specialization, not_provided),
            office_number: or_default(i.office_number, not_provided),
            user_id: i.user_id,
            name: i.name,
            department: i.department,
            faculty_role: i.faculty_role,
            modules,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct InstructorProfileResponse {
    pub profile: InstructorProfile,
}

async fn load_instructor_profile(pool: &MySqlPool, id: u64) -> actix_web::Result<InstructorProfile> {
    let instructor = fetch_instructor(pool, id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    let modules = sqlx::query_as::<_, ModuleDetail>(
        r#"
        SELECT m.code, m.name, m.department, m.total_classes, m.requirement
        FROM modules m
        JOIN instructor_modules im ON im.module_code = m.code
        WHERE im.instructor_id = ?
        ORDER BY m.code ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, instructor = id, "Failed to fetch module details");
        ErrorInternalServerError("Failed to fetch profile data")
    })?;

    Ok(InstructorProfile::new(instructor, modules))
}

/// Instructor Profile
#[utoipa::path(
    get,
    path = "/api/instructor/profile",
    params(InstructorQuery),
    responses(
        (status = 200, description = "Profile with defaults and assigned module details", body = InstructorProfileResponse),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn get_instructor_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<InstructorQuery>,
) -> actix_web::Result<impl Responder> {
    let instructor = acting_instructor(&auth, query.instructor_id.as_deref(), pool.get_ref()).await?;
    let profile = load_instructor_profile(pool.get_ref(), instructor.id).await?;
    Ok(HttpResponse::Ok().json(InstructorProfileResponse { profile }))
}

/// Update Instructor Profile
#[utoipa::path(
    put,
    path = "/api/instructor/profile",
    params(InstructorQuery),
    request_body(content = Object, description = "Any of name, email, phone, address, profilePicture, qualification, specialization, officeNumber"),
    responses(
        (status = 200, description = "Updated profile", body = InstructorProfileResponse),
        (status = 400, description = "Field cannot be updated"),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn update_instructor_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<InstructorQuery>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let instructor = acting_instructor(&auth, query.instructor_id.as_deref(), pool.get_ref()).await?;
    let payload = normalize_profile_payload(body.into_inner());

    if !is_empty_object(&payload) {
        let update = build_update_sql(
            "instructors",
            &payload,
            INSTRUCTOR_PROFILE_FIELDS,
            "id",
            instructor.id,
        )?;
        execute_update(pool.get_ref(), update).await.map_err(|e| {
            error!(error = %e, instructor = %instructor.user_id, "Failed to update instructor profile");
            ErrorInternalServerError("Failed to update profile")
        })?;
        info!(instructor = %instructor.user_id, by = %auth.user_id, "Instructor profile updated");
    }

    let profile = load_instructor_profile(pool.get_ref(), instructor.id).await?;
    Ok(HttpResponse::Ok().json(InstructorProfileResponse { profile }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn student() -> Student {
        Student {
            id: 1,
            user_id: "STU02230001".to_string(),
            name: "Karma Wangmo".to_string(),
            department: "IT".to_string(),
            year: "2nd".to_string(),
            semester: None,
            program: None,
            email: None,
            phone: Some("  ".to_string()),
            address: None,
            emergency_contact: None,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn student_profile_fills_defaults() {
        let p = StudentProfile::from(student());
        assert_eq!(p.email, "stu02230001@example.com");
        assert_eq!(p.phone, "+975 02230001");
        assert_eq!(p.address, "Not Provided");
        assert_eq!(p.emergency_contact, "Not Provided");
        assert_eq!(p.semester, "Not Specified");
        assert_eq!(p.program, "IT");
        assert_eq!(p.profile_picture, "/default-student.png");
    }

    #[test]
    fn stored_values_win_over_defaults() {
        let mut s = student();
        s.email = Some("karma@college.bt".to_string());
        s.program = Some("BSc IT".to_string());
        let p = StudentProfile::from(s);
        assert_eq!(p.email, "karma@college.bt");
        assert_eq!(p.program, "BSc IT");
    }

    #[test]
    fn short_user_ids_keep_every_character() {
        assert_eq!(default_phone("S12"), "+975 S12");
    }

    #[test]
    fn instructor_profile_fills_defaults() {
        let i = Instructor {
            id: 3,
            user_id: "INS001".to_string(),
            name: "Sonam".to_string(),
            department: "IT".to_string(),
            faculty_role: None,
            email: None,
            phone: None,
            address: None,
            qualification: Some("PhD".to_string()),
            specialization: None,
            office_number: None,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let p = InstructorProfile::new(i, Vec::new());
        assert_eq!(p.email, "ins001@example.com");
        assert_eq!(p.phone, "Not Provided");
        assert_eq!(p.qualification, "PhD");
        assert_eq!(p.profile_picture, "/default-faculty.png");
    }

    #[test]
    fn payload_keys_are_snake_cased_and_blanks_dropped() {
        let payload = normalize_profile_payload(json!({
            "emergencyContact": "17123456",
            "office_number": "B-12",
            "address": ""
        }));
        assert_eq!(
            payload,
            json!({"emergency_contact": "17123456", "office_number": "B-12"})
        );
        assert!(is_empty_object(&normalize_profile_payload(json!({"name": " "}))));
    }

    #[test]
    fn profile_whitelists_exclude_identity_fields() {
        for fields in [STUDENT_PROFILE_FIELDS, INSTRUCTOR_PROFILE_FIELDS] {
            assert!(!fields.contains(&"user_id"));
            assert!(!fields.contains(&"password"));
            assert!(!fields.contains(&"department"));
        }
    }
}
