// ==========================================
// College ERP - Batch API
// ==========================================
// Batch registry plus the semester rollover.
// Rollover flow: read -> RolloverEngine::check -> compare-and-set UPDATE
// (with audit row) -> on a lost race re-read and re-check to report the
// precise reason.
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::{is_valid_academic_year, is_valid_batch_id, is_valid_semester, Batch};
use crate::domain::types::{MAX_SEMESTER, MIN_SEMESTER};
use crate::engine::rollover::RolloverEngine;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryError;
use crate::repository::mapping_repo::MappingRepository;
use crate::repository::people_repo::{DepartmentRepository, StudentRepository};

// ==========================================
// Request / response types
// ==========================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub id: String,
    pub department_id: String,
    pub academic_year: String,
    #[serde(default)]
    pub current_semester: Option<i32>,
    #[serde(default)]
    pub auto_rollover: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchRequest {
    pub academic_year: Option<String>,
    pub auto_rollover: Option<bool>,
}

/// Per-batch result of an auto-rollover run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AutoRolloverOutcome {
    Advanced { batch_id: String, new_semester: i32 },
    Skipped { batch_id: String, reason: String },
}

// ==========================================
// BatchApi
// ==========================================
pub struct BatchApi {
    batch_repo: Arc<BatchRepository>,
    department_repo: Arc<DepartmentRepository>,
    student_repo: Arc<StudentRepository>,
    mapping_repo: Arc<MappingRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    engine: RolloverEngine,
}

impl BatchApi {
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        department_repo: Arc<DepartmentRepository>,
        student_repo: Arc<StudentRepository>,
        mapping_repo: Arc<MappingRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            batch_repo,
            department_repo,
            student_repo,
            mapping_repo,
            action_log_repo,
            engine: RolloverEngine::new(),
        }
    }

    pub fn get_batch(&self, id: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("Batch not found".to_string()))
    }

    pub fn list_batches(&self, department_id: Option<&str>, include_archived: bool) -> ApiResult<Vec<Batch>> {
        Ok(self.batch_repo.list(department_id, include_archived)?)
    }

    pub fn create_batch(&self, req: CreateBatchRequest, actor: &str) -> ApiResult<Batch> {
        let id = req.id.trim();
        if !is_valid_batch_id(id) {
            return Err(ApiError::InvalidInput(
                "Batch id must be a four-digit admission year".to_string(),
            ));
        }
        let academic_year = req.academic_year.trim();
        if !is_valid_academic_year(academic_year) {
            return Err(ApiError::InvalidInput(
                "Academic year must look like 2022-2023".to_string(),
            ));
        }
        let semester = req.current_semester.unwrap_or(MIN_SEMESTER);
        if !is_valid_semester(semester) {
            return Err(ApiError::InvalidInput(format!(
                "Semester must be between {} and {}",
                MIN_SEMESTER, MAX_SEMESTER
            )));
        }
        if self.department_repo.find_by_id(&req.department_id)?.is_none() {
            return Err(ApiError::NotFound("Department not found".to_string()));
        }
        if self.batch_repo.find_by_id(id)?.is_some() {
            return Err(ApiError::Conflict("Batch already exists".to_string()));
        }

        let batch = Batch::new(
            id.to_string(),
            req.department_id.clone(),
            academic_year.to_string(),
            semester,
            req.auto_rollover,
        );
        self.batch_repo.insert(&batch).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::Conflict("Batch already exists".to_string())
            }
            other => other.into(),
        })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateBatch, "batch", &batch.id, actor).with_payload(&batch),
        )?;
        tracing::info!(batch_id = %batch.id, semester, actor, "batch created");
        Ok(batch)
    }

    /// Changes academic year and/or auto-rollover. Archived batches are read-only.
    pub fn update_batch(&self, id: &str, req: UpdateBatchRequest, actor: &str) -> ApiResult<Batch> {
        let current = self.get_batch(id)?;
        if current.archived {
            return Err(ApiError::InvalidState("Archived batches cannot be modified".to_string()));
        }

        let academic_year = match req.academic_year.as_deref().map(str::trim) {
            Some(year) if !is_valid_academic_year(year) => {
                return Err(ApiError::InvalidInput(
                    "Academic year must look like 2022-2023".to_string(),
                ));
            }
            Some(year) => year.to_string(),
            None => current.academic_year.clone(),
        };
        let auto_rollover = req.auto_rollover.unwrap_or(current.auto_rollover);

        self.batch_repo
            .update_settings(id, &academic_year, auto_rollover)
            .map_err(|e| match e {
                RepositoryError::CompareAndSetFailed { .. } => {
                    ApiError::InvalidState("Archived batches cannot be modified".to_string())
                }
                other => other.into(),
            })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateBatch, "batch", id, actor).with_payload(&serde_json::json!({
                "academicYear": academic_year,
                "autoRollover": auto_rollover,
            })),
        )?;
        self.get_batch(id)
    }

    /// Advances the batch by exactly one semester.
    ///
    /// # Errors
    /// - `NotFound`: unknown batch
    /// - `InvalidState`: archived, or already in the final semester
    /// - `Conflict`: another writer changed the batch between read and write
    pub fn rollover(&self, batch_id: &str, actor: &str) -> ApiResult<Batch> {
        let batch = self.get_batch(batch_id)?;
        let step = self.engine.check(&batch).map_err(|reason| {
            tracing::warn!(batch_id, %reason, "rollover refused");
            ApiError::InvalidState(reason.to_string())
        })?;

        let audit = ActionLog::new(ActionType::BatchRollover, "batch", batch_id, actor)
            .with_payload(&step)
            .with_detail(format!(
                "semester {} -> {}",
                step.previous_semester, step.new_semester
            ));

        match self
            .batch_repo
            .rollover_if_current(batch_id, step.previous_semester, &audit)
        {
            Ok(()) => {}
            Err(RepositoryError::CompareAndSetFailed { .. }) => {
                return Err(self.explain_lost_rollover(batch_id, step.previous_semester));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            batch_id,
            previous_semester = step.previous_semester,
            new_semester = step.new_semester,
            actor,
            "batch rolled over"
        );
        self.get_batch(batch_id)
    }

    /// Re-reads a batch whose compare-and-set lost and reports why.
    fn explain_lost_rollover(&self, batch_id: &str, observed_semester: i32) -> ApiError {
        let current = match self.batch_repo.find_by_id(batch_id) {
            Ok(Some(batch)) => batch,
            Ok(None) => return ApiError::NotFound("Batch not found".to_string()),
            Err(e) => return e.into(),
        };
        match self.engine.check(&current) {
            Err(reason) => {
                tracing::warn!(batch_id, %reason, "rollover lost race");
                ApiError::InvalidState(reason.to_string())
            }
            Ok(_) => ApiError::Conflict(format!(
                "Batch was modified concurrently (semester {} -> {}); reload and retry",
                observed_semester, current.current_semester
            )),
        }
    }

    /// Runs `rollover` for every non-archived batch flagged for it.
    ///
    /// Failures are collected per batch; one bad batch does not stop the run.
    pub fn auto_rollover(&self, actor: &str) -> ApiResult<Vec<AutoRolloverOutcome>> {
        let candidates = self.batch_repo.find_auto_rollover_candidates()?;
        let mut outcomes = Vec::with_capacity(candidates.len());

        for batch in candidates {
            let outcome = match self.rollover(&batch.id, actor) {
                Ok(updated) => AutoRolloverOutcome::Advanced {
                    batch_id: updated.id,
                    new_semester: updated.current_semester,
                },
                Err(e) if e.is_internal() => return Err(e),
                Err(e) => AutoRolloverOutcome::Skipped {
                    batch_id: batch.id,
                    reason: e.to_string(),
                },
            };
            outcomes.push(outcome);
        }

        tracing::info!(processed = outcomes.len(), actor, "auto rollover finished");
        Ok(outcomes)
    }

    /// Archives a batch once nothing active references it.
    pub fn archive_batch(&self, id: &str, actor: &str) -> ApiResult<Batch> {
        let batch = self.get_batch(id)?;
        if batch.archived {
            return Err(ApiError::InvalidState("Batch is already archived".to_string()));
        }

        let students = self.student_repo.count_active_by_batch(id)?;
        let mappings = self.mapping_repo.count_active_by_batch(id)?;
        if students > 0 || mappings > 0 {
            return Err(ApiError::InvalidState(format!(
                "Cannot archive batch with {} active students and {} active faculty mappings",
                students, mappings
            )));
        }

        self.batch_repo.archive_if_unreferenced(id).map_err(|e| match e {
            RepositoryError::CompareAndSetFailed { .. } => ApiError::InvalidState(
                "Batch changed while archiving; reload and retry".to_string(),
            ),
            other => other.into(),
        })?;

        self.action_log_repo
            .insert(&ActionLog::new(ActionType::ArchiveBatch, "batch", id, actor))?;
        tracing::info!(batch_id = id, actor, "batch archived");
        self.get_batch(id)
    }

    pub fn delete_batch(&self, id: &str, actor: &str) -> ApiResult<()> {
        self.get_batch(id)?;
        let students = self.student_repo.count_by_batch(id)?;
        if students > 0 {
            return Err(ApiError::InvalidState(format!(
                "Cannot delete batch referenced by {} students",
                students
            )));
        }

        self.batch_repo.delete_if_unreferenced(id).map_err(|e| match e {
            RepositoryError::CompareAndSetFailed { .. } => {
                ApiError::InvalidState("Batch is referenced by students".to_string())
            }
            RepositoryError::ForeignKeyViolation(_) => {
                ApiError::InvalidState("Batch is still referenced by other records".to_string())
            }
            other => other.into(),
        })?;

        self.action_log_repo
            .insert(&ActionLog::new(ActionType::DeleteBatch, "batch", id, actor))?;
        tracing::info!(batch_id = id, actor, "batch deleted");
        Ok(())
    }
}
