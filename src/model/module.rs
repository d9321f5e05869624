use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MODULE_COLUMNS: &str =
    "id, code, name, department, year, semester, credits, description, total_classes, requirement";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "code": "IT201",
        "name": "Data Structures",
        "department": "IT",
        "year": "2nd",
        "semester": "3rd",
        "credits": 12,
        "description": "",
        "total_classes": 40,
        "requirement": 90.0
    })
)]
pub struct Module {
    pub id: u64,
    pub code: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub semester: String,
    pub credits: i32,
    pub description: Option<String>,
    pub total_classes: i32,
    /// Attendance percentage students are expected to reach.
    pub requirement: f64,
}
