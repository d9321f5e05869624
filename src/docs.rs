use crate::api::attendance::{MarkAttendance, SummaryResponse};
use crate::api::dashboard::{
    AdminDashboard, EnrolledModule, EntityCounts, HistoryEntry, InstructorDashboard,
    InstructorOverview, ModuleListResponse, RosterEntry, RosterResponse, StudentDashboard,
    StudentOverview,
};
use crate::api::instructors::{AssignModules, CreateInstructor};
use crate::api::modules::UpsertModule;
use crate::api::profile::{
    InstructorProfile, InstructorProfileResponse, ModuleDetail, StudentProfile,
    StudentProfileResponse,
};
use crate::api::students::{CreateStudent, StudentListResponse, StudentQuery};
use crate::auth::handlers::LoginResponse;
use crate::model::admin::Admin;
use crate::model::instructor::{Instructor, InstructorWithModules};
use crate::model::module::Module;
use crate::model::student::Student;
use crate::models::{ChangePasswordReq, LoginReqDto, LoginRole};
use crate::report::{ModuleSummary, StatusBand, StatusCounts};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "College Attendance API",
        version = "1.0.0",
        description = r#"
## College Attendance Tracker

Role-based attendance tracking for a college: admins manage students,
instructors and modules; instructors mark attendance per session; students
follow their own attendance.

### Key Features
- **Administration**
  - Students, instructors and modules CRUD, module assignment
  - Attendance summary per student and module with department/year/module filters
- **Instructors**
  - Mark attendance by date and hour slot
  - Dashboard with good / warning / critical counts and module rosters
- **Students**
  - Per-module attendance, overall average and history

### Status bands
A (student, module) pair is **good** at 90% or more, **warning** from 80%
and **critical** below that. Modules without any record are **pending**.

### Security
Protected endpoints require a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::change_password,

        crate::api::dashboard::admin_dashboard,
        crate::api::attendance::attendance_summary,

        crate::api::students::create_student,
        crate::api::students::list_students,
        crate::api::students::get_student,
        crate::api::students::update_student,
        crate::api::students::delete_student,

        crate::api::instructors::list_instructors,
        crate::api::instructors::create_instructor,
        crate::api::instructors::get_instructor,
        crate::api::instructors::assign_modules,
        crate::api::instructors::delete_instructor,

        crate::api::modules::list_modules,
        crate::api::modules::create_module,
        crate::api::modules::get_module,
        crate::api::modules::update_module,
        crate::api::modules::delete_module,

        crate::api::attendance::mark_attendance,
        crate::api::dashboard::instructor_dashboard,
        crate::api::dashboard::instructor_modules,
        crate::api::dashboard::module_students,
        crate::api::profile::get_instructor_profile,
        crate::api::profile::update_instructor_profile,

        crate::api::dashboard::student_dashboard,
        crate::api::profile::get_student_profile,
        crate::api::profile::update_student_profile
    ),
    components(
        schemas(
            LoginReqDto,
            LoginRole,
            LoginResponse,
            ChangePasswordReq,
            Admin,
            Student,
            CreateStudent,
            StudentQuery,
            StudentListResponse,
            Instructor,
            InstructorWithModules,
            CreateInstructor,
            AssignModules,
            Module,
            UpsertModule,
            MarkAttendance,
            ModuleSummary,
            SummaryResponse,
            StatusBand,
            StatusCounts,
            AdminDashboard,
            EntityCounts,
            InstructorDashboard,
            InstructorOverview,
            ModuleListResponse,
            RosterEntry,
            RosterResponse,
            StudentDashboard,
            StudentOverview,
            EnrolledModule,
            HistoryEntry,
            StudentProfile,
            StudentProfileResponse,
            InstructorProfile,
            InstructorProfileResponse,
            ModuleDetail
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and password change"),
        (name = "Dashboard", description = "Role dashboards and module rosters"),
        (name = "Students", description = "Student management APIs"),
        (name = "Instructors", description = "Instructor management and module assignment"),
        (name = "Modules", description = "Module catalogue APIs"),
        (name = "Attendance", description = "Attendance marking and reporting"),
        (name = "Profile", description = "Self-service profiles"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
