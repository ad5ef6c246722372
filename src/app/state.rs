// ==========================================
// College ERP - Application state
// ==========================================
// Owns the shared SQLite connection and wires
// repositories -> engines -> APIs. Built once at startup and shared
// by the HTTP layer behind an Arc.
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{
    AcademicApi, AuthApi, BatchApi, ConfigApi, LifecycleApi, MappingApi, PeopleApi, ReportApi,
    SubjectApi,
};
use crate::config::{AppConfig, ConfigManager, PolicyConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{
    ActionLogRepository, AttendanceRepository, BatchRepository, DepartmentRepository,
    ExamRepository, FacultyRepository, MappingRepository, StatusLogRepository, StudentRepository,
    SubjectRepository, UserRepository,
};

pub type SharedState = Arc<AppState>;

/// All API instances plus the resources they share.
pub struct AppState {
    pub db_path: String,

    pub auth_api: Arc<AuthApi>,
    pub people_api: Arc<PeopleApi>,
    pub batch_api: Arc<BatchApi>,
    pub subject_api: Arc<SubjectApi>,
    pub lifecycle_api: Arc<LifecycleApi>,
    pub mapping_api: Arc<MappingApi>,
    pub academic_api: Arc<AcademicApi>,
    pub report_api: Arc<ReportApi>,
    pub config_api: Arc<ConfigApi>,

    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// Opens the database, creates the schema and wires every layer.
    ///
    /// Also creates the bootstrap admin when configured and no admin
    /// exists yet.
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        tracing::info!(db_path = %config.db_path, "initializing application state");

        let conn = open_sqlite_connection(&config.db_path)
            .map_err(|e| format!("cannot open database: {}", e))?;
        init_schema(&conn).map_err(|e| format!("cannot initialize schema: {}", e))?;

        let state = Self::from_connection(Arc::new(Mutex::new(conn)), config)?;

        if let Some(admin) = &config.bootstrap_admin {
            let created = state
                .auth_api
                .ensure_admin(&admin.username, &admin.password)
                .map_err(|e| format!("cannot create bootstrap admin: {}", e))?;
            if created {
                tracing::info!(username = %admin.username, "bootstrap admin created");
            }
        }

        Ok(state)
    }

    /// Wires the layers over an already initialized connection.
    pub fn from_connection(conn: Arc<Mutex<Connection>>, config: &AppConfig) -> Result<Self, String> {
        // ==========================================
        // Repositories
        // ==========================================
        let department_repo = Arc::new(DepartmentRepository::new(conn.clone()));
        let student_repo = Arc::new(StudentRepository::new(conn.clone()));
        let faculty_repo = Arc::new(FacultyRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let subject_repo = Arc::new(SubjectRepository::new(conn.clone()));
        let status_log_repo = Arc::new(StatusLogRepository::new(conn.clone()));
        let mapping_repo = Arc::new(MappingRepository::new(conn.clone()));
        let exam_repo = Arc::new(ExamRepository::new(conn.clone()));
        let attendance_repo = Arc::new(AttendanceRepository::new(conn.clone()));
        let user_repo = Arc::new(UserRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // Configuration
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let policy_reader: Arc<dyn PolicyConfigReader> = config_manager.clone();

        // ==========================================
        // APIs
        // ==========================================
        let auth_api = Arc::new(
            AuthApi::new(
                user_repo,
                department_repo.clone(),
                action_log_repo.clone(),
                policy_reader,
                config.jwt_secret.clone(),
            )
            .with_hash_cost(config.password_hash_cost),
        );
        let people_api = Arc::new(PeopleApi::new(
            department_repo.clone(),
            student_repo.clone(),
            faculty_repo.clone(),
            batch_repo.clone(),
            action_log_repo.clone(),
        ));
        let batch_api = Arc::new(BatchApi::new(
            batch_repo.clone(),
            department_repo.clone(),
            student_repo.clone(),
            mapping_repo.clone(),
            action_log_repo.clone(),
        ));
        let subject_api = Arc::new(SubjectApi::new(
            subject_repo.clone(),
            department_repo.clone(),
            action_log_repo.clone(),
        ));
        let lifecycle_api = Arc::new(LifecycleApi::new(
            subject_repo.clone(),
            mapping_repo.clone(),
            exam_repo.clone(),
            attendance_repo.clone(),
            status_log_repo,
            action_log_repo.clone(),
        ));
        let mapping_api = Arc::new(MappingApi::new(
            mapping_repo.clone(),
            faculty_repo.clone(),
            subject_repo.clone(),
            batch_repo.clone(),
            action_log_repo.clone(),
        ));
        let academic_api = Arc::new(AcademicApi::new(
            subject_repo.clone(),
            exam_repo.clone(),
            attendance_repo.clone(),
            student_repo.clone(),
            action_log_repo.clone(),
        ));
        let report_api = Arc::new(ReportApi::new(
            department_repo,
            student_repo,
            faculty_repo,
            batch_repo,
            subject_repo,
            mapping_repo,
            exam_repo,
            attendance_repo,
            action_log_repo.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager.clone(), action_log_repo));

        tracing::info!("application state ready");

        Ok(Self {
            db_path: config.db_path.clone(),
            auth_api,
            people_api,
            batch_api,
            subject_api,
            lifecycle_api,
            mapping_api,
            academic_api,
            report_api,
            config_api,
            config_manager,
        })
    }
}
