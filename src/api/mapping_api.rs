// ==========================================
// College ERP - Faculty-subject mapping API
// ==========================================
// pending -> approved | rejected, reviewed once.
// Approved + active mappings satisfy the subject activation guard.
// ==========================================

use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::is_valid_academic_year;
use crate::domain::mapping::FacultySubjectMapping;
use crate::domain::types::MappingStatus;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryError;
use crate::repository::mapping_repo::{MappingFilter, MappingRepository};
use crate::repository::people_repo::FacultyRepository;
use crate::repository::subject_repo::SubjectRepository;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRequest {
    pub faculty_id: String,
    pub batch_id: String,
    pub section: String,
    pub academic_year: String,
}

pub struct MappingApi {
    mapping_repo: Arc<MappingRepository>,
    faculty_repo: Arc<FacultyRepository>,
    subject_repo: Arc<SubjectRepository>,
    batch_repo: Arc<BatchRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl MappingApi {
    pub fn new(
        mapping_repo: Arc<MappingRepository>,
        faculty_repo: Arc<FacultyRepository>,
        subject_repo: Arc<SubjectRepository>,
        batch_repo: Arc<BatchRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            mapping_repo,
            faculty_repo,
            subject_repo,
            batch_repo,
            action_log_repo,
        }
    }

    pub fn get_mapping(&self, id: &str) -> ApiResult<FacultySubjectMapping> {
        self.mapping_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("Faculty mapping not found".to_string()))
    }

    pub fn list_mappings(&self, subject_id: &str) -> ApiResult<Vec<FacultySubjectMapping>> {
        Ok(self.mapping_repo.list(&MappingFilter {
            subject_id: Some(subject_id.to_string()),
            ..Default::default()
        })?)
    }

    pub fn list_pending(&self) -> ApiResult<Vec<FacultySubjectMapping>> {
        Ok(self.mapping_repo.list(&MappingFilter {
            status: Some(MappingStatus::Pending),
            ..Default::default()
        })?)
    }

    /// Files a pending mapping request for a subject.
    pub fn request_mapping(
        &self,
        subject_id: &str,
        req: MappingRequest,
        actor: &str,
    ) -> ApiResult<FacultySubjectMapping> {
        let section = req.section.trim().to_ascii_uppercase();
        if section.is_empty() {
            return Err(ApiError::InvalidInput("Section is required".to_string()));
        }
        if !is_valid_academic_year(req.academic_year.trim()) {
            return Err(ApiError::InvalidInput(
                "Academic year must look like 2022-2023".to_string(),
            ));
        }

        let subject = self
            .subject_repo
            .find_by_id(subject_id)?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;
        if subject.status.is_terminal() {
            return Err(ApiError::InvalidState("Subject is archived".to_string()));
        }
        let faculty = self
            .faculty_repo
            .find_by_id(&req.faculty_id)?
            .ok_or_else(|| ApiError::NotFound("Faculty not found".to_string()))?;
        if !faculty.active {
            return Err(ApiError::InvalidState("Faculty member is inactive".to_string()));
        }
        let batch = self
            .batch_repo
            .find_by_id(&req.batch_id)?
            .ok_or_else(|| ApiError::NotFound("Batch not found".to_string()))?;
        if batch.archived {
            return Err(ApiError::InvalidState("Batch is archived".to_string()));
        }

        if self.mapping_repo.exists_open(subject_id, &batch.id, &section)? {
            return Err(ApiError::Conflict(format!(
                "An active mapping already exists for batch {} section {}",
                batch.id, section
            )));
        }

        let mapping = FacultySubjectMapping::new_pending(
            faculty.id,
            subject.id,
            batch.id,
            section,
            req.academic_year.trim().to_string(),
            actor.to_string(),
        );
        self.mapping_repo.insert(&mapping)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RequestMapping, "mapping", &mapping.id, actor)
                .with_payload(&mapping),
        )?;
        tracing::info!(mapping_id = %mapping.id, subject_id, actor, "faculty mapping requested");
        Ok(mapping)
    }

    pub fn approve_mapping(&self, id: &str, actor: &str) -> ApiResult<FacultySubjectMapping> {
        self.review(id, MappingStatus::Approved, ActionType::ApproveMapping, actor)
    }

    pub fn reject_mapping(&self, id: &str, actor: &str) -> ApiResult<FacultySubjectMapping> {
        self.review(id, MappingStatus::Rejected, ActionType::RejectMapping, actor)
    }

    fn review(
        &self,
        id: &str,
        decision: MappingStatus,
        action: ActionType,
        actor: &str,
    ) -> ApiResult<FacultySubjectMapping> {
        match self.mapping_repo.review_if_pending(id, decision, actor) {
            Ok(()) => {}
            Err(RepositoryError::CompareAndSetFailed { .. }) => {
                let current = self.get_mapping(id)?;
                let reason = if current.active {
                    format!("Mapping is already {}", current.status)
                } else {
                    "Mapping is inactive".to_string()
                };
                return Err(ApiError::InvalidState(reason));
            }
            Err(e) => return Err(e.into()),
        }

        self.action_log_repo
            .insert(&ActionLog::new(action, "mapping", id, actor))?;
        tracing::info!(mapping_id = id, decision = %decision, actor, "faculty mapping reviewed");
        self.get_mapping(id)
    }

    pub fn deactivate_mapping(&self, id: &str, actor: &str) -> ApiResult<FacultySubjectMapping> {
        match self.mapping_repo.deactivate(id) {
            Ok(()) => {}
            Err(RepositoryError::CompareAndSetFailed { .. }) => {
                self.get_mapping(id)?;
                return Err(ApiError::InvalidState("Mapping is already inactive".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.action_log_repo
            .insert(&ActionLog::new(ActionType::DeactivateMapping, "mapping", id, actor))?;
        tracing::info!(mapping_id = id, actor, "faculty mapping deactivated");
        self.get_mapping(id)
    }
}
