// ==========================================
// College ERP - Data repository layer
// ==========================================
// Repositories hold no business rules: they read, write and
// compare-and-set. Every query is parameterised.
// ==========================================

pub mod action_log_repo;
pub mod attendance_repo;
pub mod batch_repo;
pub mod error;
pub mod exam_repo;
pub mod mapping_repo;
pub mod people_repo;
pub mod status_log_repo;
pub mod subject_repo;
pub mod user_repo;

pub use action_log_repo::ActionLogRepository;
pub use attendance_repo::{AttendanceRepository, AttendanceTally};
pub use batch_repo::BatchRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use exam_repo::{ComponentMarkRow, ExamRepository};
pub use mapping_repo::{MappingFilter, MappingRepository};
pub use people_repo::{DepartmentRepository, FacultyRepository, StudentRepository};
pub use status_log_repo::StatusLogRepository;
pub use subject_repo::{SubjectFieldUpdate, SubjectFilter, SubjectRepository};
pub use user_repo::UserRepository;
