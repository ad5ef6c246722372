// ==========================================
// College ERP - Domain layer
// ==========================================
// Entities, enums and value types. No data access, no engine logic.
// ==========================================

pub mod action_log;
pub mod attendance;
pub mod batch;
pub mod exam;
pub mod mapping;
pub mod people;
pub mod status_log;
pub mod subject;
pub mod types;
pub mod user;

pub use action_log::{ActionLog, ActionType};
pub use attendance::AttendanceEntry;
pub use batch::Batch;
pub use exam::{ExamComponent, StudentComponentMark};
pub use mapping::FacultySubjectMapping;
pub use people::{Department, Faculty, Student};
pub use status_log::{NewStatusLog, StatusLog};
pub use subject::{Subject, SubjectCategory};
pub use types::{AttendanceStatus, LoginType, MappingStatus, SubjectStatus, MAX_SEMESTER, MIN_SEMESTER};
pub use user::User;
