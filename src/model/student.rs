use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Columns selected for a [`Student`]; never includes the password hash.
pub const STUDENT_COLUMNS: &str = "id, user_id, name, department, year, semester, program, email, \
     phone, address, emergency_contact, profile_picture, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "user_id": "02230001",
        "name": "Karma Wangmo",
        "department": "IT",
        "year": "2nd",
        "semester": "3rd",
        "program": "BSc IT",
        "email": "02230001@example.com",
        "phone": null,
        "address": null,
        "emergency_contact": null,
        "profile_picture": null,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct Student {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub semester: Option<String>,
    pub program: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub profile_picture: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
