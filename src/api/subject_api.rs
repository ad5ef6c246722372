// ==========================================
// College ERP - Subject and category API
// ==========================================
// Subjects are created as drafts. Field edits are only accepted while
// the subject is still a draft; status moves go through LifecycleApi.
// ==========================================

use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::is_valid_semester;
use crate::domain::subject::{Subject, SubjectCategory};
use crate::domain::types::{SubjectStatus, MAX_SEMESTER, MIN_SEMESTER};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::people_repo::DepartmentRepository;
use crate::repository::subject_repo::{SubjectFieldUpdate, SubjectFilter, SubjectRepository};

/// Credits accepted for a single subject.
pub const MAX_CREDITS: i32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    pub code: String,
    pub name: String,
    pub semester: i32,
    pub department_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub credits: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub semester: Option<i32>,
    pub category_id: Option<String>,
    pub credits: Option<i32>,
}

pub struct SubjectApi {
    subject_repo: Arc<SubjectRepository>,
    department_repo: Arc<DepartmentRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl SubjectApi {
    pub fn new(
        subject_repo: Arc<SubjectRepository>,
        department_repo: Arc<DepartmentRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            subject_repo,
            department_repo,
            action_log_repo,
        }
    }

    pub fn get_subject(&self, id: &str) -> ApiResult<Subject> {
        self.subject_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
    }

    pub fn list_subjects(&self, filter: &SubjectFilter) -> ApiResult<Vec<Subject>> {
        Ok(self.subject_repo.list(filter)?)
    }

    pub fn create_subject(&self, req: CreateSubjectRequest, actor: &str) -> ApiResult<Subject> {
        let code = required(&req.code, "Subject code")?;
        let name = required(&req.name, "Subject name")?;
        validate_semester_and_credits(req.semester, req.credits)?;

        if self.department_repo.find_by_id(&req.department_id)?.is_none() {
            return Err(ApiError::NotFound("Department not found".to_string()));
        }
        let category_id = self.resolve_category(req.category_id.as_deref())?;

        let subject = Subject::new_draft(
            code,
            name,
            req.semester,
            req.department_id.clone(),
            category_id,
            req.credits,
        );
        self.subject_repo
            .insert(&subject, actor)
            .map_err(duplicate_code_conflict)?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateSubject, "subject", &subject.id, actor)
                .with_payload(&subject),
        )?;
        tracing::info!(subject_id = %subject.id, code = %subject.code, actor, "subject created");
        Ok(subject)
    }

    /// Edits a draft subject; any other status is refused.
    pub fn update_subject(&self, id: &str, req: UpdateSubjectRequest, actor: &str) -> ApiResult<Subject> {
        let current = self.get_subject(id)?;
        if !current.status.allows_field_edits() {
            return Err(ApiError::InvalidState(format!(
                "Subject is {}; only draft subjects can be edited",
                current.status
            )));
        }

        let update = SubjectFieldUpdate {
            code: match req.code.as_deref() {
                Some(code) => required(code, "Subject code")?,
                None => current.code.clone(),
            },
            name: match req.name.as_deref() {
                Some(name) => required(name, "Subject name")?,
                None => current.name.clone(),
            },
            semester: req.semester.unwrap_or(current.semester),
            category_id: match req.category_id.as_deref() {
                Some(category) => self.resolve_category(Some(category))?,
                None => current.category_id.clone(),
            },
            credits: req.credits.unwrap_or(current.credits),
        };
        validate_semester_and_credits(update.semester, update.credits)?;

        self.subject_repo
            .update_fields_if_draft(id, &update)
            .map_err(|e| match e {
                RepositoryError::CompareAndSetFailed { .. } => ApiError::InvalidState(
                    "Subject is no longer a draft; only draft subjects can be edited".to_string(),
                ),
                other => duplicate_code_conflict(other),
            })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateSubject, "subject", id, actor).with_payload(
                &serde_json::json!({
                    "code": update.code,
                    "name": update.name,
                    "semester": update.semester,
                    "categoryId": update.category_id,
                    "credits": update.credits,
                }),
            ),
        )?;
        self.get_subject(id)
    }

    // ===== Categories =====

    pub fn create_category(&self, name: &str, actor: &str) -> ApiResult<SubjectCategory> {
        let category = SubjectCategory {
            id: uuid::Uuid::new_v4().to_string(),
            name: required(name, "Category name")?,
        };
        self.subject_repo.insert_category(&category).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::Conflict("Category already exists".to_string())
            }
            other => other.into(),
        })?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateCategory, "category", &category.id, actor)
                .with_detail(category.name.clone()),
        )?;
        Ok(category)
    }

    pub fn list_categories(&self) -> ApiResult<Vec<SubjectCategory>> {
        Ok(self.subject_repo.list_categories()?)
    }

    /// Empty string clears the category; anything else must exist.
    fn resolve_category(&self, category_id: Option<&str>) -> ApiResult<Option<String>> {
        match category_id.map(str::trim) {
            None | Some("") => Ok(None),
            Some(id) => {
                if self.subject_repo.find_category(id)?.is_none() {
                    return Err(ApiError::NotFound("Subject category not found".to_string()));
                }
                Ok(Some(id.to_string()))
            }
        }
    }
}

/// Parses a status filter value from a query string.
pub fn parse_status(value: &str) -> ApiResult<SubjectStatus> {
    SubjectStatus::from_db_str(value)
        .ok_or_else(|| ApiError::InvalidInput(format!("Unknown subject status: {}", value)))
}

fn required(value: &str, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn validate_semester_and_credits(semester: i32, credits: i32) -> ApiResult<()> {
    if !is_valid_semester(semester) {
        return Err(ApiError::InvalidInput(format!(
            "Semester must be between {} and {}",
            MIN_SEMESTER, MAX_SEMESTER
        )));
    }
    if !(0..=MAX_CREDITS).contains(&credits) {
        return Err(ApiError::InvalidInput(format!(
            "Credits must be between 0 and {}",
            MAX_CREDITS
        )));
    }
    Ok(())
}

fn duplicate_code_conflict(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::UniqueConstraintViolation(_) => {
            ApiError::Conflict("Subject code already exists in this department".to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semester_and_credit_bounds() {
        assert!(validate_semester_and_credits(1, 0).is_ok());
        assert!(validate_semester_and_credits(8, 4).is_ok());
        assert!(validate_semester_and_credits(0, 4).is_err());
        assert!(validate_semester_and_credits(3, -1).is_err());
        assert!(validate_semester_and_credits(3, MAX_CREDITS + 1).is_err());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("locked").unwrap(), SubjectStatus::Locked);
        assert!(matches!(parse_status("frozen"), Err(ApiError::InvalidInput(_))));
    }
}
