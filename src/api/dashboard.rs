use std::collections::HashMap;

use crate::{
    api::attendance::ATTENDANCE_ROW_SELECT,
    api::instructors::{assigned_module_codes, fetch_instructor_by_user_id},
    api::modules::fetch_module_by_code,
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        admin::Admin,
        attendance::AttendanceEntry,
        instructor::Instructor,
        module::{MODULE_COLUMNS, Module},
        role::Role,
    },
    report::{
        AttendanceRow, ModuleSummary, StatusBand, StatusCounts, Tally, ThresholdPolicy,
        roster_status, summarize,
    },
    utils::db_utils::placeholders,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

/// Resolves the instructor a faculty read endpoint acts for: instructors act
/// for themselves, admins must name one with `instructor_id`.
pub(crate) async fn acting_instructor(
    auth: &AuthUser,
    requested: Option<&str>,
    pool: &MySqlPool,
) -> actix_web::Result<Instructor> {
    let requested = requested.map(str::trim).filter(|v| !v.is_empty());
    let user_id = match auth.role {
        Role::Instructor => auth.user_id.as_str(),
        Role::Admin => requested.ok_or_else(|| AppError::bad_request("instructor_id is required"))?,
        Role::Student => return Err(AppError::forbidden("Instructor/Admin only").into()),
    };

    let instructor = fetch_instructor_by_user_id(pool, user_id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Instructor"))?;

    Ok(instructor)
}

// ---------- admin ----------

#[derive(Serialize, ToSchema)]
pub struct EntityCounts {
    pub students: i64,
    pub instructors: i64,
    pub modules: i64,
    pub attendance_records: i64,
}

#[derive(Serialize, ToSchema)]
pub struct AdminDashboard {
    pub admin: Admin,
    pub counts: EntityCounts,
}

/// Admin Dashboard
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Admin profile and entity counts", body = AdminDashboard),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Admin not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn admin_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let admin = sqlx::query_as::<_, Admin>("SELECT id, user_id, name, email FROM admins WHERE id = ?")
        .bind(auth.account_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Admin"))?;

    let counts = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM students),
            (SELECT COUNT(*) FROM instructors),
            (SELECT COUNT(*) FROM modules),
            (SELECT COUNT(*) FROM attendance)
        "#,
    )
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count entities");
        ErrorInternalServerError("Failed to fetch dashboard")
    })?;

    Ok(HttpResponse::Ok().json(AdminDashboard {
        admin,
        counts: EntityCounts {
            students: counts.0,
            instructors: counts.1,
            modules: counts.2,
            attendance_records: counts.3,
        },
    }))
}

// ---------- instructor ----------

#[derive(Debug, Deserialize, IntoParams)]
pub struct InstructorQuery {
    /// Admins only: the instructor to act for
    #[serde(alias = "instructorId")]
    pub instructor_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorOverview {
    pub name: String,
    pub department: String,
    /// Number of (student, module) pairs with recorded attendance
    pub total_students: usize,
    pub good_attendance: usize,
    pub warning_attendance: usize,
    pub critical_attendance: usize,
    pub modules: Vec<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorDashboard {
    pub instructor: InstructorOverview,
    pub students_at_risk: Vec<ModuleSummary>,
}

impl InstructorDashboard {
    fn build(instructor: &Instructor, modules: Vec<String>, summaries: Vec<ModuleSummary>) -> Self {
        let counts: StatusCounts = summaries.iter().map(|s| &s.status).collect();
        InstructorDashboard {
            instructor: InstructorOverview {
                name: instructor.name.clone(),
                department: instructor.department.clone(),
                total_students: summaries.len(),
                good_attendance: counts.good,
                warning_attendance: counts.warning,
                critical_attendance: counts.critical,
                modules,
            },
            students_at_risk: summaries,
        }
    }
}

/// Instructor Dashboard
#[utoipa::path(
    get,
    path = "/api/instructor/dashboard",
    params(InstructorQuery),
    responses(
        (status = 200, description = "Band counts and per-pair summaries for the instructor's modules", body = InstructorDashboard),
        (status = 400, description = "Admin did not name an instructor"),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn instructor_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<InstructorQuery>,
) -> actix_web::Result<impl Responder> {
    let instructor = acting_instructor(&auth, query.instructor_id.as_deref(), pool.get_ref()).await?;

    let codes = assigned_module_codes(pool.get_ref(), instructor.id)
        .await
        .map_err(AppError::from)?;

    if codes.is_empty() {
        debug!(instructor = %instructor.user_id, "No modules assigned");
        return Ok(HttpResponse::Ok().json(InstructorDashboard::build(&instructor, codes, Vec::new())));
    }

    let sql = format!(
        "{} WHERE m.code IN ({}) ORDER BY a.date ASC, a.id ASC",
        ATTENDANCE_ROW_SELECT,
        placeholders(codes.len())
    );
    let mut rows_query = sqlx::query_as::<_, AttendanceRow>(&sql);
    for code in &codes {
        rows_query = rows_query.bind(code);
    }

    let rows = rows_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, instructor = %instructor.user_id, "Failed to fetch attendance");
        ErrorInternalServerError("Failed to fetch instructor dashboard")
    })?;

    let summaries = summarize(&rows, &config.thresholds);
    Ok(HttpResponse::Ok().json(InstructorDashboard::build(&instructor, codes, summaries)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InstructorModulesQuery {
    /// Year label, e.g. `2nd`
    pub year: Option<String>,
    /// Semester label, e.g. `3rd`
    pub semester: Option<String>,
    /// Admins only: the instructor to act for
    #[serde(alias = "instructorId")]
    pub instructor_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ModuleListResponse {
    pub modules: Vec<Module>,
}

/// Assigned modules offered in a year and semester
#[utoipa::path(
    get,
    path = "/api/instructor/modules",
    params(InstructorModulesQuery),
    responses(
        (status = 200, description = "Assigned modules in the instructor's department", body = ModuleListResponse),
        (status = 400, description = "Year and semester are required"),
        (status = 404, description = "Instructor not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn instructor_modules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<InstructorModulesQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let semester = query.semester.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let (Some(year), Some(semester)) = (year, semester) else {
        return Err(AppError::bad_request("Year and semester are required").into());
    };

    let instructor = acting_instructor(&auth, query.instructor_id.as_deref(), pool.get_ref()).await?;

    let sql = format!(
        r#"
        SELECT {} FROM modules
        JOIN instructor_modules ON instructor_modules.module_code = modules.code
        WHERE instructor_modules.instructor_id = ?
          AND department = ? AND year = ? AND semester = ?
        ORDER BY code ASC
        "#,
        MODULE_COLUMNS
    );

    let modules = sqlx::query_as::<_, Module>(&sql)
        .bind(instructor.id)
        .bind(&instructor.department)
        .bind(year)
        .bind(semester)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, instructor = %instructor.user_id, "Failed to fetch modules");
            ErrorInternalServerError("Failed to fetch modules")
        })?;

    Ok(HttpResponse::Ok().json(ModuleListResponse { modules }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ModuleStudentsQuery {
    #[serde(alias = "moduleCode")]
    pub module_code: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub department: String,
    /// Percentage rounded to one decimal
    pub attendance: f64,
    pub percent: String,
    pub status: StatusBand,
}

#[derive(Serialize, ToSchema)]
pub struct RosterResponse {
    pub students: Vec<RosterEntry>,
}

#[derive(sqlx::FromRow)]
struct RosterStudent {
    id: u64,
    user_id: String,
    name: String,
    department: String,
}

#[derive(sqlx::FromRow)]
struct HourRow {
    student_id: u64,
    present: Option<i32>,
    absent: Option<i32>,
}

fn build_roster(
    students: Vec<RosterStudent>,
    hours: &[HourRow],
    module: &Module,
    policy: &ThresholdPolicy,
) -> Vec<RosterEntry> {
    let mut tallies: HashMap<u64, Tally> = HashMap::new();
    for row in hours {
        tallies.entry(row.student_id).or_default().add(row.present, row.absent);
    }

    let thresholds = policy.for_requirement(Some(module.requirement));
    students
        .into_iter()
        .map(|s| {
            let tally = tallies.get(&s.id).copied().unwrap_or_default();
            RosterEntry {
                id: s.id,
                user_id: s.user_id,
                name: s.name,
                department: s.department,
                attendance: tally.percentage(),
                percent: tally.percent_label(),
                status: roster_status(&tally, &thresholds),
            }
        })
        .collect()
}

/// Roster of a module with each student's attendance
#[utoipa::path(
    get,
    path = "/api/instructor/module-students",
    params(ModuleStudentsQuery),
    responses(
        (status = 200, description = "Students of the module's department and year; empty when the module is not offered in that year", body = RosterResponse),
        (status = 400, description = "Module code and year are required"),
        (status = 403, description = "Instructor is not assigned to this module"),
        (status = 404, description = "Module not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn module_students(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ModuleStudentsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let code = query.module_code.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let year = query.year.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let (Some(code), Some(year)) = (code, year) else {
        return Err(AppError::bad_request("Module code and year are required").into());
    };

    let module = fetch_module_by_code(pool.get_ref(), code)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Module"))?;

    if auth.role == Role::Instructor {
        let assigned = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM instructor_modules
            WHERE instructor_id = ? AND module_code = ?
            "#,
        )
        .bind(auth.account_id)
        .bind(&module.code)
        .fetch_one(pool.get_ref())
        .await
        .map_err(AppError::from)?;

        if assigned == 0 {
            return Err(AppError::forbidden("Instructor is not assigned to this module").into());
        }
    }

    if module.year != year {
        return Ok(HttpResponse::Ok().json(RosterResponse { students: Vec::new() }));
    }

    let students = sqlx::query_as::<_, RosterStudent>(
        r#"
        SELECT id, user_id, name, department FROM students
        WHERE department = ? AND year = ?
        ORDER BY user_id ASC
        "#,
    )
    .bind(&module.department)
    .bind(year)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, module = %module.code, "Failed to fetch students");
        ErrorInternalServerError("Failed to fetch students")
    })?;

    let hours = sqlx::query_as::<_, HourRow>(
        "SELECT student_id, present, absent FROM attendance WHERE module_id = ?",
    )
    .bind(module.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, module = %module.code, "Failed to fetch attendance");
        ErrorInternalServerError("Failed to fetch students")
    })?;

    let roster = build_roster(students, &hours, &module, &config.thresholds);
    Ok(HttpResponse::Ok().json(RosterResponse { students: roster }))
}

// ---------- student ----------

#[derive(sqlx::FromRow)]
struct StudentInfo {
    id: u64,
    user_id: String,
    name: String,
    department: String,
    year: String,
    semester: Option<String>,
    program: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub user_id: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub semester: Option<String>,
    pub program: Option<String>,
    /// Present hours over recorded hours across all enrolled modules
    pub average_attendance: f64,
    pub good_modules: usize,
    pub warning_modules: usize,
    pub critical_modules: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledModule {
    pub id: u64,
    pub code: String,
    pub name: String,
    pub department: String,
    pub semester: String,
    pub teacher: String,
    pub total_classes: i32,
    /// Number of recorded sessions
    pub sessions: usize,
    pub present_sessions: usize,
    pub present: u64,
    pub absent: u64,
    pub attendance: f64,
    pub percent: String,
    pub status: StatusBand,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub date: chrono::NaiveDate,
    #[schema(example = "present")]
    pub status: String,
    pub module_name: String,
    pub module_code: String,
    pub time: String,
}

impl From<&AttendanceEntry> for HistoryEntry {
    fn from(e: &AttendanceEntry) -> Self {
        let status = if e.present.unwrap_or(0) > 0 { "present" } else { "absent" };
        HistoryEntry {
            id: e.id,
            date: e.date,
            status: status.to_string(),
            module_name: e.module_name.clone(),
            module_code: e.module_code.clone(),
            time: e.time_slot.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub student: StudentOverview,
    pub enrolled_modules: Vec<EnrolledModule>,
    pub attendance_history: Vec<HistoryEntry>,
}

fn enrolled_module(module: &Module, entries: &[&AttendanceEntry], policy: &ThresholdPolicy) -> EnrolledModule {
    let mut tally = Tally::default();
    for e in entries {
        tally.add(e.present, e.absent);
    }

    let teacher = entries
        .iter()
        .find_map(|e| e.instructor_name.clone())
        .unwrap_or_else(|| "Not Assigned".to_string());

    let status = if entries.is_empty() {
        StatusBand::Pending
    } else {
        roster_status(&tally, &policy.for_requirement(Some(module.requirement)))
    };

    EnrolledModule {
        id: module.id,
        code: module.code.clone(),
        name: module.name.clone(),
        department: module.department.clone(),
        semester: module.semester.clone(),
        teacher,
        total_classes: module.total_classes,
        sessions: entries.len(),
        present_sessions: entries.iter().filter(|e| e.present.unwrap_or(0) > 0).count(),
        present: tally.present,
        absent: tally.absent,
        attendance: tally.percentage(),
        percent: tally.percent_label(),
        status,
    }
}

fn build_student_dashboard(
    info: StudentInfo,
    modules: &[Module],
    history: &[AttendanceEntry],
    policy: &ThresholdPolicy,
) -> StudentDashboard {
    let enrolled: Vec<EnrolledModule> = modules
        .iter()
        .map(|m| {
            let entries: Vec<&AttendanceEntry> =
                history.iter().filter(|e| e.module_id == m.id).collect();
            enrolled_module(m, &entries, policy)
        })
        .collect();

    let mut overall = Tally::default();
    for e in history {
        overall.add(e.present, e.absent);
    }
    let counts: StatusCounts = enrolled.iter().map(|m| &m.status).collect();

    StudentDashboard {
        student: StudentOverview {
            user_id: info.user_id,
            name: info.name,
            department: info.department,
            year: info.year,
            semester: info.semester,
            program: info.program,
            average_attendance: overall.percentage(),
            good_modules: counts.good,
            warning_modules: counts.warning,
            critical_modules: counts.critical,
        },
        enrolled_modules: enrolled,
        attendance_history: history.iter().map(HistoryEntry::from).collect(),
    }
}

/// Student Dashboard
#[utoipa::path(
    get,
    path = "/api/student/dashboard",
    responses(
        (status = 200, description = "Attendance for the student's current modules", body = StudentDashboard),
        (status = 403, description = "Student only"),
        (status = 404, description = "Student not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn student_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;

    let info = sqlx::query_as::<_, StudentInfo>(
        "SELECT id, user_id, name, department, year, semester, program FROM students WHERE id = ?",
    )
    .bind(auth.account_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::from)?
    .ok_or(AppError::NotFound("Student"))?;

    let sql = format!(
        "SELECT {} FROM modules WHERE department = ? AND year = ? AND semester = ? ORDER BY code ASC",
        MODULE_COLUMNS
    );
    let modules = sqlx::query_as::<_, Module>(&sql)
        .bind(&info.department)
        .bind(&info.year)
        .bind(&info.semester)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, student = %info.user_id, "Failed to fetch modules");
            ErrorInternalServerError("Failed to fetch dashboard data")
        })?;

    let history = if modules.is_empty() {
        Vec::new()
    } else {
        let sql = format!(
            r#"
            SELECT a.id, a.date, a.time_slot, a.module_id, m.code AS module_code,
                   m.name AS module_name, i.name AS instructor_name, a.present, a.absent
            FROM attendance a
            JOIN modules m ON m.id = a.module_id
            LEFT JOIN instructors i ON i.id = a.instructor_id
            WHERE a.student_id = ? AND a.module_id IN ({})
            ORDER BY a.date DESC, a.start_hour DESC
            "#,
            placeholders(modules.len())
        );
        let mut history_query = sqlx::query_as::<_, AttendanceEntry>(&sql).bind(info.id);
        for m in &modules {
            history_query = history_query.bind(m.id);
        }
        history_query.fetch_all(pool.get_ref()).await.map_err(|e| {
            error!(error = %e, student = %info.user_id, "Failed to fetch attendance history");
            ErrorInternalServerError("Failed to fetch dashboard data")
        })?
    };

    let dashboard = build_student_dashboard(info, &modules, &history, &config.thresholds);
    Ok(HttpResponse::Ok().json(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn module(id: u64, code: &str, requirement: f64) -> Module {
        Module {
            id,
            code: code.to_string(),
            name: format!("Module {}", code),
            department: "IT".to_string(),
            year: "2nd".to_string(),
            semester: "3rd".to_string(),
            credits: 12,
            description: None,
            total_classes: 40,
            requirement,
        }
    }

    fn entry(id: u64, module_id: u64, present: i32, absent: i32, teacher: Option<&str>) -> AttendanceEntry {
        AttendanceEntry {
            id,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time_slot: "09:00 - 10:00".to_string(),
            module_id,
            module_code: format!("IT{}", module_id),
            module_name: format!("Module {}", module_id),
            instructor_name: teacher.map(str::to_string),
            present: Some(present),
            absent: Some(absent),
        }
    }

    fn info() -> StudentInfo {
        StudentInfo {
            id: 1,
            user_id: "02230001".to_string(),
            name: "Karma".to_string(),
            department: "IT".to_string(),
            year: "2nd".to_string(),
            semester: Some("3rd".to_string()),
            program: None,
        }
    }

    #[test]
    fn module_without_records_is_pending_and_unassigned() {
        let m = enrolled_module(&module(1, "IT201", 90.0), &[], &ThresholdPolicy::default());
        assert_eq!(m.status, StatusBand::Pending);
        assert_eq!(m.teacher, "Not Assigned");
        assert_eq!(m.percent, "0.0");
        assert_eq!(m.sessions, 0);
    }

    #[test]
    fn module_percentage_is_hours_based() {
        let a = entry(1, 1, 2, 0, Some("Sonam"));
        let b = entry(2, 1, 0, 1, Some("Sonam"));
        let m = enrolled_module(&module(1, "IT201", 90.0), &[&a, &b], &ThresholdPolicy::default());
        assert_eq!(m.present, 2);
        assert_eq!(m.absent, 1);
        assert_eq!(m.percent, "66.7");
        assert_eq!(m.sessions, 2);
        assert_eq!(m.present_sessions, 1);
        assert_eq!(m.teacher, "Sonam");
        assert_eq!(m.status, StatusBand::Critical);
    }

    #[test]
    fn pending_modules_are_left_out_of_band_counts() {
        let modules = vec![module(1, "IT201", 90.0), module(2, "IT202", 90.0)];
        let history = vec![entry(1, 1, 9, 0, None), entry(2, 1, 0, 1, None)];
        let dash = build_student_dashboard(info(), &modules, &history, &ThresholdPolicy::default());

        assert_eq!(dash.student.good_modules, 1);
        assert_eq!(dash.student.warning_modules, 0);
        assert_eq!(dash.student.critical_modules, 0);
        assert_eq!(dash.enrolled_modules[1].status, StatusBand::Pending);
        assert_eq!(dash.student.average_attendance, 90.0);
        assert_eq!(dash.attendance_history.len(), 2);
        assert_eq!(dash.attendance_history[1].status, "absent");
    }

    #[test]
    fn roster_marks_students_without_hours_pending() {
        let students = vec![
            RosterStudent { id: 1, user_id: "A".into(), name: "A".into(), department: "IT".into() },
            RosterStudent { id: 2, user_id: "B".into(), name: "B".into(), department: "IT".into() },
        ];
        let hours = vec![
            HourRow { student_id: 1, present: Some(8), absent: Some(0) },
            HourRow { student_id: 1, present: None, absent: Some(2) },
        ];
        let roster = build_roster(students, &hours, &module(1, "IT201", 90.0), &ThresholdPolicy::default());

        assert_eq!(roster[0].percent, "80.0");
        assert_eq!(roster[0].status, StatusBand::Warning);
        assert_eq!(roster[1].status, StatusBand::Pending);
        assert_eq!(roster[1].attendance, 0.0);
    }

    #[test]
    fn roster_follows_module_requirement_when_enabled() {
        let policy = ThresholdPolicy {
            use_module_requirement: true,
            ..ThresholdPolicy::default()
        };
        let students = vec![RosterStudent {
            id: 1,
            user_id: "A".into(),
            name: "A".into(),
            department: "IT".into(),
        }];
        let hours = vec![HourRow { student_id: 1, present: Some(3), absent: Some(1) }];
        let roster = build_roster(students, &hours, &module(1, "IT201", 75.0), &policy);
        assert_eq!(roster[0].status, StatusBand::Good);
    }

    #[test]
    fn instructor_dashboard_counts_bands() {
        let instructor = Instructor {
            id: 1,
            user_id: "INS001".into(),
            name: "Sonam".into(),
            department: "IT".into(),
            faculty_role: None,
            email: None,
            phone: None,
            address: None,
            qualification: None,
            specialization: None,
            office_number: None,
            profile_picture: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let summary = |status| ModuleSummary {
            student_id: "A".into(),
            student_name: "A".into(),
            department: "IT".into(),
            year: "2nd".into(),
            module_code: "IT201".into(),
            module_name: "DS".into(),
            instructor: "Sonam".into(),
            total_classes: 40,
            present: 0,
            absent: 0,
            percent: "0.0".into(),
            status,
        };
        let dash = InstructorDashboard::build(
            &instructor,
            vec!["IT201".into()],
            vec![
                summary(StatusBand::Good),
                summary(StatusBand::Critical),
                summary(StatusBand::Critical),
            ],
        );
        assert_eq!(dash.instructor.total_students, 3);
        assert_eq!(dash.instructor.good_attendance, 1);
        assert_eq!(dash.instructor.warning_attendance, 0);
        assert_eq!(dash.instructor.critical_attendance, 2);
    }
}
