// ==========================================
// API integration test environment
// ==========================================
// One temporary database with every API wired through AppState, plus
// builders for the records most scenarios need.
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use college_erp::api::academic_api::{AttendanceInput, AttendanceRequest, CreateComponentRequest, MarkInput};
use college_erp::api::auth_api::RegisterUserRequest;
use college_erp::api::batch_api::CreateBatchRequest;
use college_erp::api::mapping_api::MappingRequest;
use college_erp::api::people_api::{CreateDepartmentRequest, CreateFacultyRequest, CreateStudentRequest};
use college_erp::api::subject_api::CreateSubjectRequest;
use college_erp::app::state::AppState;
use college_erp::config::AppConfig;
use college_erp::domain::batch::Batch;
use college_erp::domain::exam::ExamComponent;
use college_erp::domain::people::{Department, Faculty, Student};
use college_erp::domain::subject::Subject;
use college_erp::domain::types::{AttendanceStatus, LoginType};
use college_erp::domain::user::User;
use rusqlite::Connection;

pub use test_helpers::count_rows;

pub const ADMIN: &str = "admin";
pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test environment over a temporary database file.
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: Arc<AppState>,
    pub conn: Arc<Mutex<Connection>>,

    // Keeps the database file alive.
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, String> {
        college_erp::logging::init_test();

        let (temp_file, db_path) =
            test_helpers::create_test_db().map_err(|e| format!("cannot create test database: {}", e))?;
        let conn = test_helpers::open_test_connection(&db_path)
            .map_err(|e| format!("cannot open test database: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let mut config = AppConfig::for_database(&db_path, TEST_JWT_SECRET);
        config.password_hash_cost = 4;
        let state = AppState::from_connection(conn.clone(), &config)?;

        Ok(Self {
            db_path,
            state: Arc::new(state),
            conn,
            _temp_file: temp_file,
        })
    }

    /// Counts rows in `table` matching `filter` (empty for all).
    pub fn count(&self, table: &str, filter: &str) -> i64 {
        let conn = self.conn.lock().unwrap();
        count_rows(&conn, table, filter)
    }

    /// Runs raw SQL against the test database.
    pub fn execute(&self, sql: &str) {
        self.conn.lock().unwrap().execute_batch(sql).unwrap();
    }

    // ==========================================
    // Builders
    // ==========================================

    pub fn department(&self, code: &str) -> Department {
        self.state
            .people_api
            .create_department(
                CreateDepartmentRequest {
                    code: code.to_string(),
                    name: format!("{} Department", code),
                },
                ADMIN,
            )
            .unwrap()
    }

    pub fn batch(&self, department: &Department, id: &str, semester: i32) -> Batch {
        let year: i32 = id.parse().unwrap();
        self.state
            .batch_api
            .create_batch(
                CreateBatchRequest {
                    id: id.to_string(),
                    department_id: department.id.clone(),
                    academic_year: format!("{}-{}", year, year + 1),
                    current_semester: Some(semester),
                    auto_rollover: false,
                },
                ADMIN,
            )
            .unwrap()
    }

    pub fn student(&self, batch: &Batch, usn: &str) -> Student {
        self.state
            .people_api
            .create_student(
                CreateStudentRequest {
                    usn: usn.to_string(),
                    name: format!("Student {}", usn),
                    batch_id: batch.id.clone(),
                    semester: None,
                    section: None,
                },
                ADMIN,
            )
            .unwrap()
    }

    pub fn faculty(&self, department: &Department, employee_id: &str) -> Faculty {
        self.state
            .people_api
            .create_faculty(
                CreateFacultyRequest {
                    employee_id: employee_id.to_string(),
                    name: format!("Prof {}", employee_id),
                    department_id: department.id.clone(),
                },
                ADMIN,
            )
            .unwrap()
    }

    /// Draft subject, with a fresh category when `categorized`.
    pub fn subject(&self, department: &Department, code: &str, semester: i32, credits: i32, categorized: bool) -> Subject {
        let category_id = categorized.then(|| {
            self.state
                .subject_api
                .create_category(&format!("Core-{}", code), ADMIN)
                .unwrap()
                .id
        });
        self.state
            .subject_api
            .create_subject(
                CreateSubjectRequest {
                    code: code.to_string(),
                    name: format!("Subject {}", code),
                    semester,
                    department_id: department.id.clone(),
                    category_id,
                    credits,
                },
                ADMIN,
            )
            .unwrap()
    }

    /// Requests and approves a mapping for section A.
    pub fn approved_mapping(&self, subject: &Subject, faculty: &Faculty, batch: &Batch) {
        let mapping = self
            .state
            .mapping_api
            .request_mapping(
                &subject.id,
                MappingRequest {
                    faculty_id: faculty.id.clone(),
                    batch_id: batch.id.clone(),
                    section: "A".to_string(),
                    academic_year: batch.academic_year.clone(),
                },
                ADMIN,
            )
            .unwrap();
        self.state.mapping_api.approve_mapping(&mapping.id, ADMIN).unwrap();
    }

    pub fn component(&self, subject: &Subject, name: &str, max_marks: f64, weightage: f64) -> ExamComponent {
        self.state
            .academic_api
            .create_component(
                &subject.id,
                CreateComponentRequest {
                    name: name.to_string(),
                    max_marks,
                    weightage,
                },
                ADMIN,
            )
            .unwrap()
    }

    /// Subject moved to active with category, approved mapping and
    /// the given components.
    pub fn active_subject(
        &self,
        department: &Department,
        batch: &Batch,
        faculty: &Faculty,
        code: &str,
        credits: i32,
        components: &[(&str, f64, f64)],
    ) -> (Subject, Vec<ExamComponent>) {
        let subject = self.subject(department, code, batch.current_semester, credits, true);
        self.approved_mapping(&subject, faculty, batch);
        let created = components
            .iter()
            .map(|(name, max, weight)| self.component(&subject, name, *max, *weight))
            .collect();
        let change = self.state.lifecycle_api.activate(&subject.id, ADMIN).unwrap();
        (change.subject, created)
    }

    pub fn marks(&self, component: &ExamComponent, entries: &[(&Student, f64)]) -> usize {
        let inputs: Vec<MarkInput> = entries
            .iter()
            .map(|(student, marks)| MarkInput {
                student_id: student.id.clone(),
                marks_obtained: *marks,
            })
            .collect();
        self.state
            .academic_api
            .record_marks(&component.id, &inputs, ADMIN)
            .unwrap()
    }

    pub fn attendance(&self, subject: &Subject, date: &str, entries: &[(&Student, AttendanceStatus)]) -> usize {
        let req = AttendanceRequest {
            date: date.to_string(),
            entries: entries
                .iter()
                .map(|(student, status)| AttendanceInput {
                    student_id: student.id.clone(),
                    status: *status,
                })
                .collect(),
        };
        self.state
            .academic_api
            .record_attendance(&subject.id, &req, ADMIN)
            .unwrap()
    }

    pub fn user(&self, username: &str, login_type: LoginType) -> User {
        self.state
            .auth_api
            .register_user(
                RegisterUserRequest {
                    username: username.to_string(),
                    password: TEST_PASSWORD.to_string(),
                    login_type,
                    department_id: None,
                },
                ADMIN,
            )
            .unwrap()
    }

    /// Registers a user and returns a bearer token for it.
    pub fn token_for(&self, username: &str, login_type: LoginType) -> String {
        self.user(username, login_type);
        self.state
            .auth_api
            .login(&college_erp::api::auth_api::LoginRequest {
                username: username.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .unwrap()
            .token
    }
}
