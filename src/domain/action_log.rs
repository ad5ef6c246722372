// ==========================================
// College ERP - Action log domain model
// ==========================================
// Every mutating operation leaves one row here.
// Subject status changes additionally go to status_log.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - audit record
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub action_id: String,
    pub entity_type: String,   // "batch" / "subject" / "mapping" / ...
    pub entity_id: String,
    pub action_type: String,   // ActionType::as_str
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateDepartment,
    CreateBatch,
    UpdateBatch,
    BatchRollover,
    ArchiveBatch,
    DeleteBatch,
    CreateStudent,
    DeactivateStudent,
    CreateFaculty,
    CreateCategory,
    CreateSubject,
    UpdateSubject,
    SubjectTransition,
    SubjectStatusOverride,
    RequestMapping,
    ApproveMapping,
    RejectMapping,
    DeactivateMapping,
    CreateComponent,
    RecordMarks,
    RecordAttendance,
    RegisterUser,
    UnlockUser,
    AccountLocked,
    UpdateConfig,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateDepartment => "CreateDepartment",
            ActionType::CreateBatch => "CreateBatch",
            ActionType::UpdateBatch => "UpdateBatch",
            ActionType::BatchRollover => "BatchRollover",
            ActionType::ArchiveBatch => "ArchiveBatch",
            ActionType::DeleteBatch => "DeleteBatch",
            ActionType::CreateStudent => "CreateStudent",
            ActionType::DeactivateStudent => "DeactivateStudent",
            ActionType::CreateFaculty => "CreateFaculty",
            ActionType::CreateCategory => "CreateCategory",
            ActionType::CreateSubject => "CreateSubject",
            ActionType::UpdateSubject => "UpdateSubject",
            ActionType::SubjectTransition => "SubjectTransition",
            ActionType::SubjectStatusOverride => "SubjectStatusOverride",
            ActionType::RequestMapping => "RequestMapping",
            ActionType::ApproveMapping => "ApproveMapping",
            ActionType::RejectMapping => "RejectMapping",
            ActionType::DeactivateMapping => "DeactivateMapping",
            ActionType::CreateComponent => "CreateComponent",
            ActionType::RecordMarks => "RecordMarks",
            ActionType::RecordAttendance => "RecordAttendance",
            ActionType::RegisterUser => "RegisterUser",
            ActionType::UnlockUser => "UnlockUser",
            ActionType::AccountLocked => "AccountLocked",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }
}

impl ActionLog {
    /// Creates a log entry stamped with the current UTC time.
    pub fn new(
        action_type: ActionType,
        entity_type: &str,
        entity_id: &str,
        actor: &str,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_payload_and_detail() {
        let log = ActionLog::new(ActionType::BatchRollover, "batch", "2022", "admin")
            .with_payload(&serde_json::json!({"previousSemester": 6, "newSemester": 7}))
            .with_detail("rollover 6 -> 7");

        assert_eq!(log.action_type, "BatchRollover");
        assert_eq!(log.entity_id, "2022");
        assert_eq!(log.payload_json.unwrap()["newSemester"], 7);
        assert_eq!(log.detail.as_deref(), Some("rollover 6 -> 7"));
    }
}
