use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A student's attendance record as shown in their history.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub id: u64,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00 - 11:00")]
    pub time_slot: String,
    pub module_id: u64,
    pub module_code: String,
    pub module_name: String,
    pub instructor_name: Option<String>,
    pub present: Option<i32>,
    pub absent: Option<i32>,
}
