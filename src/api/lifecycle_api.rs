// ==========================================
// College ERP - Subject lifecycle API
// ==========================================
// Flow for activate / lock / archive:
//   gather LifecycleFacts -> SubjectLifecycle::validate
//   -> compare-and-set status with the guard re-checked in SQL
//      + status_log row (one transaction)
//   -> ActionLog
// Overrides skip the guards but still go through the same
// compare-and-set and leave an is_override history row.
// ==========================================

use serde::Serialize;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::status_log::{NewStatusLog, StatusLog};
use crate::domain::subject::Subject;
use crate::domain::types::SubjectStatus;
use crate::engine::lifecycle::{find_transition, Guard, LifecycleFacts, SubjectLifecycle, TransitionValidation};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::attendance_repo::AttendanceRepository;
use crate::repository::error::RepositoryError;
use crate::repository::exam_repo::ExamRepository;
use crate::repository::mapping_repo::MappingRepository;
use crate::repository::status_log_repo::StatusLogRepository;
use crate::repository::subject_repo::SubjectRepository;

/// Outcome of a status change: the subject as stored plus its history row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub subject: Subject,
    pub log: StatusLog,
}

pub struct LifecycleApi {
    subject_repo: Arc<SubjectRepository>,
    mapping_repo: Arc<MappingRepository>,
    exam_repo: Arc<ExamRepository>,
    attendance_repo: Arc<AttendanceRepository>,
    status_log_repo: Arc<StatusLogRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    lifecycle: SubjectLifecycle,
}

impl LifecycleApi {
    pub fn new(
        subject_repo: Arc<SubjectRepository>,
        mapping_repo: Arc<MappingRepository>,
        exam_repo: Arc<ExamRepository>,
        attendance_repo: Arc<AttendanceRepository>,
        status_log_repo: Arc<StatusLogRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            subject_repo,
            mapping_repo,
            exam_repo,
            attendance_repo,
            status_log_repo,
            action_log_repo,
            lifecycle: SubjectLifecycle::new(),
        }
    }

    fn load_subject(&self, subject_id: &str) -> ApiResult<Subject> {
        self.subject_repo
            .find_by_id(subject_id)?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
    }

    fn gather_facts(&self, subject: &Subject) -> ApiResult<LifecycleFacts> {
        Ok(LifecycleFacts {
            has_category: subject.has_category(),
            approved_faculty_mappings: self.mapping_repo.count_effective_by_subject(&subject.id)?,
            exam_components: self.exam_repo.count_components(&subject.id)?,
            marks_recorded: self.exam_repo.count_marks_by_subject(&subject.id)?,
            attendance_recorded: self.attendance_repo.count_by_subject(&subject.id)?,
        })
    }

    /// Dry-run of `current -> target` with every named check.
    pub fn validate_transition(
        &self,
        subject_id: &str,
        target: SubjectStatus,
    ) -> ApiResult<TransitionValidation> {
        let subject = self.load_subject(subject_id)?;
        let facts = self.gather_facts(&subject)?;
        Ok(self.lifecycle.validate(subject.status, target, &facts))
    }

    pub fn activate(&self, subject_id: &str, actor: &str) -> ApiResult<StatusChange> {
        self.transition(subject_id, SubjectStatus::Active, actor)
    }

    pub fn lock(&self, subject_id: &str, actor: &str) -> ApiResult<StatusChange> {
        self.transition(subject_id, SubjectStatus::Locked, actor)
    }

    pub fn archive(&self, subject_id: &str, actor: &str) -> ApiResult<StatusChange> {
        self.transition(subject_id, SubjectStatus::Archived, actor)
    }

    /// Guarded forward transition.
    ///
    /// # Errors
    /// - `NotFound`: unknown subject
    /// - `TransitionRejected`: a guard failed or the step is not in the table
    /// - `Conflict`: status changed concurrently and the step is still legal
    pub fn transition(
        &self,
        subject_id: &str,
        target: SubjectStatus,
        actor: &str,
    ) -> ApiResult<StatusChange> {
        let subject = self.load_subject(subject_id)?;
        let facts = self.gather_facts(&subject)?;
        let validation = self.lifecycle.validate(subject.status, target, &facts);
        if !validation.valid {
            tracing::warn!(subject_id, from = %subject.status, to = %target, message = %validation.message, "transition refused");
            return Err(ApiError::TransitionRejected {
                message: validation.message.clone(),
                validation,
            });
        }

        let guard = find_transition(subject.status, target)
            .map(|t| t.guard)
            .ok_or_else(|| ApiError::InternalError(format!("no transition {} -> {}", subject.status, target)))?;
        let change = NewStatusLog {
            subject_id: subject_id.to_string(),
            from_status: Some(subject.status),
            status: target,
            updated_by: actor.to_string(),
            is_override: false,
            note: None,
        };
        let log = match self.subject_repo.apply_transition(&change, guard) {
            Ok(log) => log,
            Err(RepositoryError::CompareAndSetFailed { .. }) => {
                return Err(self.explain_lost_transition(subject_id, target));
            }
            Err(e) => return Err(e.into()),
        };

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::SubjectTransition, "subject", subject_id, actor)
                .with_payload(&serde_json::json!({
                    "fromStatus": subject.status,
                    "toStatus": target,
                    "checks": validation.checks,
                })),
        )?;
        tracing::info!(subject_id, from = %subject.status, to = %target, actor, "subject status changed");

        Ok(StatusChange {
            subject: self.load_subject(subject_id)?,
            log,
        })
    }

    fn explain_lost_transition(&self, subject_id: &str, target: SubjectStatus) -> ApiError {
        let subject = match self.load_subject(subject_id) {
            Ok(subject) => subject,
            Err(e) => return e,
        };
        let facts = match self.gather_facts(&subject) {
            Ok(facts) => facts,
            Err(e) => return e,
        };
        let validation = self.lifecycle.validate(subject.status, target, &facts);
        if validation.valid {
            ApiError::Conflict("Subject status changed concurrently; reload and retry".to_string())
        } else {
            ApiError::TransitionRejected {
                message: validation.message.clone(),
                validation,
            }
        }
    }

    /// Administrative override: any status, no guards, reason mandatory.
    pub fn override_status(
        &self,
        subject_id: &str,
        target: SubjectStatus,
        actor: &str,
        reason: &str,
    ) -> ApiResult<StatusChange> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::InvalidInput("A reason is required to override status".to_string()));
        }

        let subject = self.load_subject(subject_id)?;
        if subject.status == target {
            return Err(ApiError::InvalidState(format!("Subject is already {}", target)));
        }

        let change = NewStatusLog {
            subject_id: subject_id.to_string(),
            from_status: Some(subject.status),
            status: target,
            updated_by: actor.to_string(),
            is_override: true,
            note: Some(reason.to_string()),
        };
        let log = self.subject_repo.apply_transition(&change, Guard::Always).map_err(|e| match e {
            RepositoryError::CompareAndSetFailed { .. } => ApiError::Conflict(
                "Subject status changed concurrently; reload and retry".to_string(),
            ),
            other => other.into(),
        })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::SubjectStatusOverride, "subject", subject_id, actor)
                .with_payload(&serde_json::json!({
                    "fromStatus": subject.status,
                    "toStatus": target,
                }))
                .with_detail(reason),
        )?;
        tracing::warn!(subject_id, from = %subject.status, to = %target, actor, reason, "subject status overridden");

        Ok(StatusChange {
            subject: self.load_subject(subject_id)?,
            log,
        })
    }

    /// Status history, oldest first.
    pub fn status_history(&self, subject_id: &str) -> ApiResult<Vec<StatusLog>> {
        self.load_subject(subject_id)?;
        Ok(self.status_log_repo.find_by_subject(subject_id)?)
    }
}
