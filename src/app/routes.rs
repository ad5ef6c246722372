// ==========================================
// College ERP - HTTP routes
// ==========================================
// Thin axum handlers: extract, check role, run the API call on the
// blocking pool, wrap the result in the response envelope.
// ==========================================

mod academic;
mod auth;
mod batch;
pub mod common;
pub mod extract;
mod lifecycle;
mod mapping;
mod people;
mod report;
mod subject;
mod system;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app::state::SharedState;

pub use common::{ApiResponse, Reply};
pub use extract::{AuthUser, JsonBody};

/// Every `/api` route, bound to the shared state.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        // System
        .route("/api/health", get(system::health))
        .route("/api/config", get(system::list_configs))
        .route("/api/config/{key}", put(system::update_config))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::current_user))
        .route("/api/auth/users", post(auth::register_user))
        .route("/api/auth/users/{id}/unlock", put(auth::unlock_user))
        // People
        .route(
            "/api/departments",
            get(people::list_departments).post(people::create_department),
        )
        .route(
            "/api/students",
            get(people::list_students).post(people::create_student),
        )
        .route("/api/students/{id}/deactivate", put(people::deactivate_student))
        .route(
            "/api/faculty",
            get(people::list_faculty).post(people::create_faculty),
        )
        // Batches
        .route("/api/batches", get(batch::list_batches).post(batch::create_batch))
        .route("/api/batches/auto-rollover", post(batch::auto_rollover))
        .route(
            "/api/batches/{id}",
            get(batch::get_batch)
                .put(batch::update_batch)
                .delete(batch::delete_batch),
        )
        .route("/api/batches/{id}/rollover", put(batch::rollover))
        .route("/api/batches/{id}/archive", put(batch::archive_batch))
        // Subjects
        .route(
            "/api/categories",
            get(subject::list_categories).post(subject::create_category),
        )
        .route(
            "/api/subjects",
            get(subject::list_subjects).post(subject::create_subject),
        )
        .route(
            "/api/subjects/{id}",
            get(subject::get_subject).put(subject::update_subject),
        )
        // Mappings
        .route(
            "/api/subjects/{id}/mappings",
            get(mapping::list_for_subject).post(mapping::request_mapping),
        )
        .route("/api/mappings/pending", get(mapping::list_pending))
        .route("/api/mappings/{id}/approve", put(mapping::approve_mapping))
        .route("/api/mappings/{id}/reject", put(mapping::reject_mapping))
        .route("/api/mappings/{id}/deactivate", put(mapping::deactivate_mapping))
        // Components, marks, attendance
        .route(
            "/api/subjects/{id}/components",
            get(academic::list_components).post(academic::create_component),
        )
        .route(
            "/api/components/{id}/marks",
            get(academic::list_marks).put(academic::record_marks),
        )
        .route("/api/subjects/{id}/attendance", put(academic::record_attendance))
        // Lifecycle
        .route("/api/lifecycle/subjects/{id}/activate", put(lifecycle::activate))
        .route("/api/lifecycle/subjects/{id}/lock", put(lifecycle::lock))
        .route("/api/lifecycle/subjects/{id}/archive", put(lifecycle::archive))
        .route("/api/lifecycle/subjects/{id}/override", put(lifecycle::override_status))
        .route(
            "/api/lifecycle/subjects/{id}/validate-transition",
            post(lifecycle::validate_transition),
        )
        .route(
            "/api/lifecycle/subjects/{id}/status-history",
            get(lifecycle::status_history),
        )
        // Reports
        .route(
            "/api/reports/students/{id}/attendance",
            get(report::student_attendance),
        )
        .route(
            "/api/reports/students/{id}/semesters/{semester}",
            get(report::student_semester_summary),
        )
        .route(
            "/api/reports/subjects/{id}/attendance",
            get(report::subject_attendance),
        )
        .route(
            "/api/reports/departments/{id}/dashboard",
            get(report::department_dashboard),
        )
        .route("/api/reports/action-log", get(report::action_log))
        .route(
            "/api/reports/action-log/{entity_type}/{entity_id}",
            get(report::entity_history),
        )
        .with_state(state)
}
