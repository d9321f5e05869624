use crate::{
    api::instructors::fetch_instructor_by_user_id,
    api::modules::fetch_module_by_code,
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, is_constraint_violation},
    model::role::Role,
    report::{AttendanceRow, ModuleSummary, SummaryFilter, summarize},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

pub const MAX_SESSION_HOURS: u8 = 8;

/// Rows for the aggregator; callers append `WHERE` / `ORDER BY` clauses.
pub(crate) const ATTENDANCE_ROW_SELECT: &str = r#"
    SELECT
        s.user_id AS student_user_id,
        s.name AS student_name,
        s.department,
        s.year,
        m.code AS module_code,
        m.name AS module_name,
        m.total_classes,
        m.requirement,
        i.name AS instructor_name,
        a.present,
        a.absent
    FROM attendance a
    JOIN students s ON s.id = a.student_id
    JOIN modules m ON m.id = a.module_id
    LEFT JOIN instructors i ON i.id = a.instructor_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendance {
    /// Student user id
    #[schema(example = "02230001")]
    pub student_id: String,
    #[schema(example = "IT201")]
    pub module_code: String,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Length of the session in hours (1-8)
    #[schema(example = 2)]
    pub hours: u8,
    pub present: bool,
    /// Hour of day the session starts (0-23)
    #[schema(example = 9)]
    pub start_hour: u8,
    /// Required when an admin marks on behalf of an instructor
    #[schema(example = "INS001")]
    pub instructor_id: Option<String>,
}

impl MarkAttendance {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.student_id.trim().is_empty() || self.module_code.trim().is_empty() {
            return Err(AppError::bad_request("Missing required fields"));
        }
        if self.hours == 0 || self.hours > MAX_SESSION_HOURS {
            return Err(AppError::bad_request(
                "Invalid hours value. Must be between 1 and 8",
            ));
        }
        if self.start_hour > 23 {
            return Err(AppError::bad_request(
                "Invalid start hour. Must be between 0 and 23",
            ));
        }
        if u16::from(self.start_hour) + u16::from(self.hours) > 24 {
            return Err(AppError::bad_request("Session must end by 24:00"));
        }
        Ok(())
    }

    /// `"HH:00 - HH:00"` label stored with the record.
    pub fn time_slot(&self) -> String {
        format!(
            "{:02}:00 - {:02}:00",
            self.start_hour,
            u16::from(self.start_hour) + u16::from(self.hours)
        )
    }

    /// (present, absent) hours; exactly one of them is non-zero.
    pub fn hour_split(&self) -> (i32, i32) {
        let hours = i32::from(self.hours);
        if self.present { (hours, 0) } else { (0, hours) }
    }

    /// User id of the instructor the record is attributed to.
    fn instructor_user_id<'a>(&'a self, auth: &'a AuthUser) -> Result<&'a str, AppError> {
        let named = self
            .instructor_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match auth.role {
            Role::Instructor => match named {
                Some(id) if id != auth.user_id => Err(AppError::forbidden(
                    "Instructors can only mark attendance as themselves",
                )),
                _ => Ok(auth.user_id.as_str()),
            },
            Role::Admin => named.ok_or_else(|| AppError::bad_request("instructor_id is required")),
            Role::Student => Err(AppError::forbidden("Instructor/Admin only")),
        }
    }
}

/// Mark attendance for one student and one session
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = Object, example = json!({
            "message": "Attendance recorded successfully"
        })),
        (status = 400, description = "Invalid hours, start hour or missing fields"),
        (status = 403, description = "Instructor is not assigned to this module"),
        (status = 404, description = "Student, module or instructor not found"),
        (status = 409, description = "Attendance record already exists for this time slot")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<MarkAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;
    payload.validate()?;
    let instructor_user_id = payload.instructor_user_id(&auth)?;

    let student_id = sqlx::query_scalar::<_, u64>("SELECT id FROM students WHERE user_id = ?")
        .bind(payload.student_id.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Student"))?;

    let module = fetch_module_by_code(pool.get_ref(), payload.module_code.trim())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    let instructor = fetch_instructor_by_user_id(pool.get_ref(), instructor_user_id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    let assigned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM instructor_modules WHERE instructor_id = ? AND module_code = ?",
    )
    .bind(instructor.id)
    .bind(&module.code)
    .fetch_one(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    if assigned == 0 {
        return Err(AppError::forbidden("Instructor is not assigned to this module").into());
    }

    let existing = sqlx::query_scalar::<_, u64>(
        r#"
        SELECT id FROM attendance
        WHERE student_id = ? AND module_id = ? AND date = ? AND start_hour = ?
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(module.id)
    .bind(payload.date)
    .bind(payload.start_hour)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    ensure_slot_free(existing)?;

    let (present, absent) = payload.hour_split();
    let time_slot = payload.time_slot();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
        (student_id, instructor_id, module_id, date, start_hour, time_slot, present, absent, marked_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(instructor.id)
    .bind(module.id)
    .bind(payload.date)
    .bind(payload.start_hour)
    .bind(&time_slot)
    .bind(present)
    .bind(absent)
    .bind(&instructor.user_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(
                student = %payload.student_id,
                module = %module.code,
                date = %payload.date,
                slot = %time_slot,
                present = payload.present,
                marked_by = %instructor.user_id,
                "Attendance recorded"
            );
            Ok(HttpResponse::Ok().json(json!({
                "message": "Attendance recorded successfully"
            })))
        }
        Err(e) => {
            if let Some(conflict) = slot_conflict(&e) {
                return Err(conflict.into());
            }
            error!(error = %e, student = %payload.student_id, "Failed to record attendance");
            Err(actix_web::error::ErrorInternalServerError(
                "Failed to record attendance",
            ))
        }
    }
}

const SLOT_TAKEN: &str = "Attendance record already exists for this time slot";

/// Rejects a slot the pre-insert lookup found already recorded.
fn ensure_slot_free(existing: Option<u64>) -> Result<(), AppError> {
    match existing {
        Some(_) => Err(AppError::conflict(SLOT_TAKEN)),
        None => Ok(()),
    }
}

/// A unique-key violation on insert means a concurrent submission for the
/// same slot won the race.
fn slot_conflict(e: &sqlx::Error) -> Option<AppError> {
    is_constraint_violation(e).then(|| AppError::conflict(SLOT_TAKEN))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Filter by student department
    pub department: Option<String>,
    /// Filter by student year, e.g. `2nd`
    pub year: Option<String>,
    /// Filter by module code
    #[serde(alias = "moduleCode")]
    pub module_code: Option<String>,
}

impl From<SummaryQuery> for SummaryFilter {
    fn from(q: SummaryQuery) -> Self {
        SummaryFilter {
            department: q.department,
            year: q.year,
            module_code: q.module_code,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: Vec<ModuleSummary>,
}

/// Attendance summary per student and module
#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(SummaryQuery),
    responses(
        (status = 200, description = "One row per (student, module) pair", body = SummaryResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let requested: SummaryFilter = query.into_inner().into();

    // an unknown module code is ignored rather than matching nothing
    let resolved = match requested.module_code() {
        Some(code) => fetch_module_by_code(pool.get_ref(), code)
            .await
            .map_err(AppError::from)?
            .map(|m| m.code),
        None => None,
    };
    if resolved.is_none() && requested.module_code().is_some() {
        debug!(module = ?requested.module_code, "Unknown module filter ignored");
    }
    let filter = requested.with_known_module(resolved);

    // the module filter narrows the scan; department/year are applied in memory
    let module_code = filter.module_code();

    let sql = match module_code {
        Some(_) => format!(
            "{} WHERE m.code = ? ORDER BY a.date DESC, a.id DESC",
            ATTENDANCE_ROW_SELECT
        ),
        None => format!("{} ORDER BY a.date DESC, a.id DESC", ATTENDANCE_ROW_SELECT),
    };

    let mut rows_query = sqlx::query_as::<_, AttendanceRow>(&sql);
    if let Some(code) = module_code {
        rows_query = rows_query.bind(code);
    }

    let rows = rows_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch attendance data");
        actix_web::error::ErrorInternalServerError("Failed to fetch attendance data")
    })?;

    let summary = summarize(filter.apply(&rows), &config.thresholds);
    debug!(rows = rows.len(), pairs = summary.len(), "Attendance summary built");

    Ok(HttpResponse::Ok().json(SummaryResponse { summary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::tests::duplicate_key_error;
    use actix_web::{ResponseError, http::StatusCode};

    fn mark(hours: u8, start_hour: u8, present: bool) -> MarkAttendance {
        MarkAttendance {
            student_id: "02230001".to_string(),
            module_code: "IT201".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            hours,
            present,
            start_hour,
            instructor_id: None,
        }
    }

    fn auth(role: Role, user_id: &str) -> AuthUser {
        AuthUser {
            account_id: 1,
            user_id: user_id.to_string(),
            role,
        }
    }

    #[test]
    fn hours_must_be_between_one_and_eight() {
        assert!(mark(0, 9, true).validate().is_err());
        assert!(mark(1, 9, true).validate().is_ok());
        assert!(mark(8, 9, true).validate().is_ok());
        assert!(mark(9, 9, true).validate().is_err());
    }

    #[test]
    fn start_hour_must_be_a_clock_hour() {
        assert!(mark(1, 0, true).validate().is_ok());
        assert!(mark(1, 23, true).validate().is_ok());
        assert!(mark(1, 24, true).validate().is_err());
    }

    #[test]
    fn session_cannot_run_past_midnight() {
        assert!(mark(2, 22, true).validate().is_ok());
        assert!(mark(3, 22, true).validate().is_err());
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let mut m = mark(2, 9, true);
        m.module_code = " ".to_string();
        assert!(matches!(m.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn time_slot_is_zero_padded() {
        assert_eq!(mark(2, 9, true).time_slot(), "09:00 - 11:00");
        assert_eq!(mark(3, 14, false).time_slot(), "14:00 - 17:00");
        assert_eq!(mark(1, 23, false).time_slot(), "23:00 - 24:00");
    }

    #[test]
    fn hours_go_entirely_to_present_or_absent() {
        assert_eq!(mark(3, 9, true).hour_split(), (3, 0));
        assert_eq!(mark(3, 9, false).hour_split(), (0, 3));
    }

    #[test]
    fn instructors_mark_as_themselves() {
        let m = mark(1, 9, true);
        let ins = auth(Role::Instructor, "INS001");
        assert_eq!(m.instructor_user_id(&ins).unwrap(), "INS001");

        let mut other = mark(1, 9, true);
        other.instructor_id = Some("INS002".to_string());
        assert!(matches!(
            other.instructor_user_id(&ins),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admins_must_name_the_instructor() {
        let admin = auth(Role::Admin, "ADM001");
        assert!(matches!(
            mark(1, 9, true).instructor_user_id(&admin),
            Err(AppError::BadRequest(_))
        ));

        let mut m = mark(1, 9, true);
        m.instructor_id = Some(" INS002 ".to_string());
        assert_eq!(m.instructor_user_id(&admin).unwrap(), "INS002");
    }

    #[test]
    fn summary_query_accepts_camel_case_module_code() {
        let q = parse_query("department=IT&moduleCode=IT201");
        let filter: SummaryFilter = q.into();
        assert_eq!(filter.department.as_deref(), Some("IT"));
        assert_eq!(filter.module_code.as_deref(), Some("IT201"));
        assert_eq!(filter.year, None);
    }

    #[test]
    fn recorded_slot_is_a_conflict() {
        assert!(ensure_slot_free(None).is_ok());
        let err = ensure_slot_free(Some(42)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), SLOT_TAKEN);
    }

    #[test]
    fn duplicate_key_on_insert_is_a_conflict() {
        let err = slot_conflict(&duplicate_key_error()).unwrap();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        assert!(slot_conflict(&sqlx::Error::RowNotFound).is_none());
    }

    fn parse_query(qs: &str) -> SummaryQuery {
        web::Query::<SummaryQuery>::from_query(qs).unwrap().into_inner()
    }
}
