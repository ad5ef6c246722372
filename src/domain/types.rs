// ==========================================
// College ERP - Domain type definitions
// ==========================================
// Enumerations shared by entities, engines and repositories.
// Database representation: lowercase strings (Present/Absent/Leave for
// attendance, matching the entry sheets).
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest semester a batch can reach.
pub const MAX_SEMESTER: i32 = 8;

/// Lowest semester a batch or subject can be in.
pub const MIN_SEMESTER: i32 = 1;

// ==========================================
// Subject lifecycle status
// ==========================================
// draft -> active -> locked -> archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    Draft,
    Active,
    Locked,
    Archived,
}

impl SubjectStatus {
    pub const ALL: [SubjectStatus; 4] = [
        SubjectStatus::Draft,
        SubjectStatus::Active,
        SubjectStatus::Locked,
        SubjectStatus::Archived,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SubjectStatus::Draft => "draft",
            SubjectStatus::Active => "active",
            SubjectStatus::Locked => "locked",
            SubjectStatus::Archived => "archived",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(SubjectStatus::Draft),
            "active" => Some(SubjectStatus::Active),
            "locked" => Some(SubjectStatus::Locked),
            "archived" => Some(SubjectStatus::Archived),
            _ => None,
        }
    }

    /// Field edits (code, name, semester, credits, category) are only
    /// allowed while the subject is still a draft.
    pub fn allows_field_edits(&self) -> bool {
        matches!(self, SubjectStatus::Draft)
    }

    /// Marks and attendance may only be recorded against an active subject.
    pub fn allows_entries(&self) -> bool {
        matches!(self, SubjectStatus::Active)
    }

    /// Exam components can be defined before the subject is locked.
    pub fn allows_component_changes(&self) -> bool {
        matches!(self, SubjectStatus::Draft | SubjectStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubjectStatus::Archived)
    }
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// Faculty-subject mapping approval status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Pending,
    Approved,
    Rejected,
}

impl MappingStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MappingStatus::Pending => "pending",
            MappingStatus::Approved => "approved",
            MappingStatus::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(MappingStatus::Pending),
            "approved" => Some(MappingStatus::Approved),
            "rejected" => Some(MappingStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// Attendance entry status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
}

impl AttendanceStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Leave => "Leave",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Present" | "present" => Some(AttendanceStatus::Present),
            "Absent" | "absent" => Some(AttendanceStatus::Absent),
            "Leave" | "leave" => Some(AttendanceStatus::Leave),
            _ => None,
        }
    }

    pub fn counts_as_present(&self) -> bool {
        matches!(self, AttendanceStatus::Present)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// Login type (role carried in the JWT)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    Admin,
    Faculty,
    Student,
}

impl LoginType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LoginType::Admin => "admin",
            LoginType::Faculty => "faculty",
            LoginType::Student => "student",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(LoginType::Admin),
            "faculty" => Some(LoginType::Faculty),
            "student" => Some(LoginType::Student),
            _ => None,
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_status_db_roundtrip() {
        for status in SubjectStatus::ALL {
            assert_eq!(SubjectStatus::from_db_str(status.to_db_str()), Some(status));
        }
        assert_eq!(SubjectStatus::from_db_str("ACTIVE"), Some(SubjectStatus::Active));
        assert_eq!(SubjectStatus::from_db_str("retired"), None);
    }

    #[test]
    fn test_subject_status_gates() {
        assert!(SubjectStatus::Draft.allows_field_edits());
        assert!(!SubjectStatus::Active.allows_field_edits());

        assert!(SubjectStatus::Active.allows_entries());
        assert!(!SubjectStatus::Draft.allows_entries());
        assert!(!SubjectStatus::Locked.allows_entries());

        assert!(SubjectStatus::Draft.allows_component_changes());
        assert!(SubjectStatus::Active.allows_component_changes());
        assert!(!SubjectStatus::Locked.allows_component_changes());

        assert!(SubjectStatus::Archived.is_terminal());
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&SubjectStatus::Locked).unwrap();
        assert_eq!(json, "\"locked\"");
        let parsed: MappingStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, MappingStatus::Approved);
    }

    #[test]
    fn test_only_present_counts() {
        assert!(AttendanceStatus::Present.counts_as_present());
        assert!(!AttendanceStatus::Absent.counts_as_present());
        assert!(!AttendanceStatus::Leave.counts_as_present());
    }
}
