// ==========================================
// College ERP - Subject lifecycle state machine
// ==========================================
// States: draft -> active -> locked -> archived (terminal)
// Every forward step is an entry in TRANSITIONS with its guard.
// Guards are evaluated against LifecycleFacts gathered by the caller,
// so this module never touches the database.
// ==========================================

use crate::domain::types::SubjectStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// Transition table
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// No precondition.
    Always,
    /// Category assigned and at least one approved, active faculty mapping.
    CategoryAndApprovedFaculty,
    /// At least one exam component defined.
    HasExamComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SubjectStatus,
    pub to: SubjectStatus,
    pub guard: Guard,
    pub action: &'static str,
}

pub const TRANSITIONS: &[Transition] = &[
    Transition {
        from: SubjectStatus::Draft,
        to: SubjectStatus::Active,
        guard: Guard::CategoryAndApprovedFaculty,
        action: "activate",
    },
    Transition {
        from: SubjectStatus::Active,
        to: SubjectStatus::Locked,
        guard: Guard::HasExamComponents,
        action: "lock",
    },
    Transition {
        from: SubjectStatus::Locked,
        to: SubjectStatus::Archived,
        guard: Guard::Always,
        action: "archive",
    },
];

pub fn find_transition(from: SubjectStatus, to: SubjectStatus) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.to == to)
}

/// Target status for an action name used in routes ("activate", "lock", "archive").
pub fn target_for_action(action: &str) -> Option<SubjectStatus> {
    TRANSITIONS
        .iter()
        .find(|t| t.action.eq_ignore_ascii_case(action.trim()))
        .map(|t| t.to)
}

pub fn next_status(from: SubjectStatus) -> Option<SubjectStatus> {
    TRANSITIONS.iter().find(|t| t.from == from).map(|t| t.to)
}

// ==========================================
// Facts and validation result
// ==========================================

/// Read-only counts about a subject's related rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFacts {
    pub has_category: bool,
    pub approved_faculty_mappings: i64,
    pub exam_components: i64,
    pub marks_recorded: i64,
    pub attendance_recorded: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionChecks {
    pub valid_transition: bool,
    pub category_assigned: bool,
    pub faculty_mapped: bool,
    pub has_components: bool,
    pub has_marks: bool,
    pub has_attendance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionValidation {
    pub valid: bool,
    pub message: String,
    pub current_status: SubjectStatus,
    pub target_status: SubjectStatus,
    pub checks: TransitionChecks,
}

// ==========================================
// SubjectLifecycle
// ==========================================
pub struct SubjectLifecycle {}

impl SubjectLifecycle {
    pub fn new() -> Self {
        Self {}
    }

    /// Evaluates `current -> target` against the transition table.
    ///
    /// `has_marks` / `has_attendance` are reported but never gate.
    pub fn validate(
        &self,
        current: SubjectStatus,
        target: SubjectStatus,
        facts: &LifecycleFacts,
    ) -> TransitionValidation {
        let transition = find_transition(current, target);

        let checks = TransitionChecks {
            valid_transition: transition.is_some(),
            category_assigned: facts.has_category,
            faculty_mapped: facts.approved_faculty_mappings > 0,
            has_components: facts.exam_components > 0,
            has_marks: facts.marks_recorded > 0,
            has_attendance: facts.attendance_recorded > 0,
        };

        let Some(transition) = transition else {
            return TransitionValidation {
                valid: false,
                message: Self::unsupported_message(current, target),
                current_status: current,
                target_status: target,
                checks,
            };
        };

        let failures = Self::guard_failures(transition.guard, &checks);
        let (valid, message) = if failures.is_empty() {
            (true, format!("Subject can be moved from {} to {}", current, target))
        } else {
            (
                false,
                format!("Cannot {} subject: {}", transition.action, failures.join("; ")),
            )
        };

        TransitionValidation {
            valid,
            message,
            current_status: current,
            target_status: target,
            checks,
        }
    }

    fn guard_failures(guard: Guard, checks: &TransitionChecks) -> Vec<&'static str> {
        let mut failures = Vec::new();
        match guard {
            Guard::Always => {}
            Guard::CategoryAndApprovedFaculty => {
                if !checks.category_assigned {
                    failures.push("subject category is not assigned");
                }
                if !checks.faculty_mapped {
                    failures.push("no approved and active faculty mapping exists");
                }
            }
            Guard::HasExamComponents => {
                if !checks.has_components {
                    failures.push("no exam components have been created");
                }
            }
        }
        failures
    }

    fn unsupported_message(current: SubjectStatus, target: SubjectStatus) -> String {
        if current == target {
            return format!("Subject is already {}", current);
        }
        match next_status(current) {
            Some(next) => format!(
                "Cannot move subject from {} to {}; the next allowed status is {}",
                current, target, next
            ),
            None => format!("Subject is {} and cannot change status", current),
        }
    }
}

impl Default for SubjectLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
