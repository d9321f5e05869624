use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Columns selected for an [`Instructor`]; never includes the password hash.
pub const INSTRUCTOR_COLUMNS: &str = "id, user_id, name, department, faculty_role, email, phone, \
     address, qualification, specialization, office_number, profile_picture, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Instructor {
    pub id: u64,
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
    pub profile_picture: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// An instructor together with the module codes assigned to them.
#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorWithModules {
    #[serde(flatten)]
    pub instructor: Instructor,
    #[schema(example = json!(["IT201", "IT202"]))]
    pub modules: Vec<String>,
}
