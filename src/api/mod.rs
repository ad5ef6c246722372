// ==========================================
// College ERP - API layer
// ==========================================
// Business operations called by the HTTP routes. Each API validates
// input, applies the engines, writes through repositories and leaves
// an ActionLog row for every mutation.
// ==========================================

pub mod academic_api;
pub mod auth_api;
pub mod batch_api;
pub mod config_api;
pub mod error;
pub mod lifecycle_api;
pub mod mapping_api;
pub mod people_api;
pub mod report_api;
pub mod subject_api;

pub use academic_api::AcademicApi;
pub use auth_api::{AuthApi, Claims, LoginRequest, LoginResponse, RegisterUserRequest};
pub use batch_api::{AutoRolloverOutcome, BatchApi};
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult};
pub use lifecycle_api::{LifecycleApi, StatusChange};
pub use mapping_api::MappingApi;
pub use people_api::PeopleApi;
pub use report_api::ReportApi;
pub use subject_api::SubjectApi;
