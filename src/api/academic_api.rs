// ==========================================
// College ERP - Exam components, marks and attendance API
// ==========================================
// Entry gating follows the subject status:
// - components: draft or active
// - marks / attendance: active only
// A batch of marks or attendance is validated in full before anything
// is written, then stored in one transaction.
// ==========================================

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::db::{now_ts, parse_date};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::attendance::AttendanceEntry;
use crate::domain::exam::{ExamComponent, StudentComponentMark};
use crate::domain::subject::Subject;
use crate::domain::types::AttendanceStatus;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::attendance_repo::AttendanceRepository;
use crate::repository::error::RepositoryError;
use crate::repository::exam_repo::ExamRepository;
use crate::repository::people_repo::StudentRepository;
use crate::repository::subject_repo::SubjectRepository;

/// Upper bound on the summed weightage of a subject's components (percent).
pub const MAX_TOTAL_WEIGHTAGE: f64 = 100.0;

/// Validation problems listed in one error message.
const MAX_REPORTED_PROBLEMS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComponentRequest {
    pub name: String,
    pub max_marks: f64,
    pub weightage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkInput {
    pub student_id: String,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub date: String,
    pub entries: Vec<AttendanceInput>,
}

pub struct AcademicApi {
    subject_repo: Arc<SubjectRepository>,
    exam_repo: Arc<ExamRepository>,
    attendance_repo: Arc<AttendanceRepository>,
    student_repo: Arc<StudentRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl AcademicApi {
    pub fn new(
        subject_repo: Arc<SubjectRepository>,
        exam_repo: Arc<ExamRepository>,
        attendance_repo: Arc<AttendanceRepository>,
        student_repo: Arc<StudentRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            subject_repo,
            exam_repo,
            attendance_repo,
            student_repo,
            action_log_repo,
        }
    }

    fn load_subject(&self, subject_id: &str) -> ApiResult<Subject> {
        self.subject_repo
            .find_by_id(subject_id)?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
    }

    // ==========================================
    // Components
    // ==========================================

    pub fn list_components(&self, subject_id: &str) -> ApiResult<Vec<ExamComponent>> {
        self.load_subject(subject_id)?;
        Ok(self.exam_repo.list_components(subject_id)?)
    }

    pub fn create_component(
        &self,
        subject_id: &str,
        req: CreateComponentRequest,
        actor: &str,
    ) -> ApiResult<ExamComponent> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("Component name is required".to_string()));
        }
        if !req.max_marks.is_finite() || req.max_marks <= 0.0 {
            return Err(ApiError::InvalidInput("Max marks must be greater than 0".to_string()));
        }
        if !req.weightage.is_finite() || req.weightage <= 0.0 || req.weightage > MAX_TOTAL_WEIGHTAGE {
            return Err(ApiError::InvalidInput(
                "Weightage must be greater than 0 and at most 100".to_string(),
            ));
        }

        let subject = self.load_subject(subject_id)?;
        if !subject.status.allows_component_changes() {
            return Err(ApiError::InvalidState(format!(
                "Cannot add exam components to a {} subject",
                subject.status
            )));
        }

        let existing: f64 = self
            .exam_repo
            .list_components(subject_id)?
            .iter()
            .map(|c| c.weightage)
            .sum();
        if existing + req.weightage > MAX_TOTAL_WEIGHTAGE + f64::EPSILON {
            return Err(ApiError::InvalidInput(format!(
                "Total weightage would be {} (limit {})",
                existing + req.weightage,
                MAX_TOTAL_WEIGHTAGE
            )));
        }

        let component = ExamComponent::new(subject.id.clone(), name.to_string(), req.max_marks, req.weightage);
        self.exam_repo.insert_component(&component).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => ApiError::Conflict(format!(
                "Component {} already exists for this subject",
                component.name
            )),
            other => other.into(),
        })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateComponent, "subject", subject_id, actor)
                .with_payload(&component),
        )?;
        tracing::info!(subject_id, component = %component.name, actor, "exam component created");
        Ok(component)
    }

    // ==========================================
    // Marks
    // ==========================================

    pub fn list_marks(&self, component_id: &str) -> ApiResult<Vec<StudentComponentMark>> {
        self.load_component(component_id)?;
        Ok(self.exam_repo.list_marks(component_id)?)
    }

    fn load_component(&self, component_id: &str) -> ApiResult<ExamComponent> {
        self.exam_repo
            .find_component(component_id)?
            .ok_or_else(|| ApiError::NotFound("Exam component not found".to_string()))
    }

    /// Validates every entry, then upserts all of them atomically.
    ///
    /// Returns the number of marks stored.
    pub fn record_marks(&self, component_id: &str, entries: &[MarkInput], actor: &str) -> ApiResult<usize> {
        if entries.is_empty() {
            return Err(ApiError::InvalidInput("No marks supplied".to_string()));
        }
        let component = self.load_component(component_id)?;
        let subject = self.load_subject(&component.subject_id)?;
        if !subject.status.allows_entries() {
            return Err(ApiError::InvalidState(format!(
                "Marks can only be entered for active subjects (subject is {})",
                subject.status
            )));
        }

        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.student_id.as_str()) {
                problems.push(format!("{}: duplicate entry", entry.student_id));
                continue;
            }
            if !component.accepts(entry.marks_obtained) {
                problems.push(format!(
                    "{}: marks {} outside 0..={}",
                    entry.student_id, entry.marks_obtained, component.max_marks
                ));
            }
            if let Some(problem) = self.check_student(&entry.student_id, &subject)? {
                problems.push(problem);
            }
        }
        reject_if_any(problems)?;

        let now = now_ts();
        let marks: Vec<StudentComponentMark> = entries
            .iter()
            .map(|e| StudentComponentMark {
                student_id: e.student_id.clone(),
                component_id: component.id.clone(),
                marks_obtained: e.marks_obtained,
                entered_by: actor.to_string(),
                updated_at: now,
            })
            .collect();
        let stored = self.exam_repo.upsert_marks(&marks)?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RecordMarks, "component", component_id, actor)
                .with_detail(format!("{} marks recorded", stored)),
        )?;
        tracing::info!(component_id, stored, actor, "marks recorded");
        Ok(stored)
    }

    // ==========================================
    // Attendance
    // ==========================================

    /// Records one day of attendance for a subject; same-day entries are replaced.
    pub fn record_attendance(&self, subject_id: &str, req: &AttendanceRequest, actor: &str) -> ApiResult<usize> {
        let date: NaiveDate = parse_date(req.date.trim())
            .ok_or_else(|| ApiError::InvalidInput("Date must be YYYY-MM-DD".to_string()))?;
        if req.entries.is_empty() {
            return Err(ApiError::InvalidInput("No attendance entries supplied".to_string()));
        }
        let subject = self.load_subject(subject_id)?;
        if !subject.status.allows_entries() {
            return Err(ApiError::InvalidState(format!(
                "Attendance can only be recorded for active subjects (subject is {})",
                subject.status
            )));
        }

        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for entry in &req.entries {
            if !seen.insert(entry.student_id.as_str()) {
                problems.push(format!("{}: duplicate entry", entry.student_id));
                continue;
            }
            if let Some(problem) = self.check_student(&entry.student_id, &subject)? {
                problems.push(problem);
            }
        }
        reject_if_any(problems)?;

        let now = now_ts();
        let rows: Vec<AttendanceEntry> = req
            .entries
            .iter()
            .map(|e| AttendanceEntry {
                subject_id: subject.id.clone(),
                student_id: e.student_id.clone(),
                date,
                status: e.status,
                marked_by: actor.to_string(),
                updated_at: now,
            })
            .collect();
        let stored = self.attendance_repo.upsert_entries(&rows)?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RecordAttendance, "subject", subject_id, actor)
                .with_detail(format!("{} entries for {}", stored, req.date.trim())),
        )?;
        tracing::info!(subject_id, %date, stored, actor, "attendance recorded");
        Ok(stored)
    }

    /// Student must exist, be active and belong to the subject's department.
    fn check_student(&self, student_id: &str, subject: &Subject) -> ApiResult<Option<String>> {
        let problem = match self.student_repo.find_by_id(student_id)? {
            None => Some(format!("{}: student not found", student_id)),
            Some(s) if !s.active => Some(format!("{}: student is inactive", student_id)),
            Some(s) if s.department_id != subject.department_id => Some(format!(
                "{}: student is not in the subject's department",
                student_id
            )),
            Some(_) => None,
        };
        Ok(problem)
    }
}

fn reject_if_any(problems: Vec<String>) -> ApiResult<()> {
    if problems.is_empty() {
        return Ok(());
    }
    let total = problems.len();
    let mut message = problems
        .into_iter()
        .take(MAX_REPORTED_PROBLEMS)
        .collect::<Vec<_>>()
        .join("; ");
    if total > MAX_REPORTED_PROBLEMS {
        message.push_str(&format!(" (and {} more)", total - MAX_REPORTED_PROBLEMS));
    }
    Err(ApiError::InvalidInput(format!("Rejected {} entries: {}", total, message)))
}
