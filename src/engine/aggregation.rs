// ==========================================
// College ERP - Marks / attendance aggregation
// ==========================================
// Pure read-side math over entry rows. Every ratio guards division by
// zero and returns 0.
// ==========================================

use serde::{Deserialize, Serialize};

/// Obtained marks for one component, with the component's definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub weightage: f64,
}

/// Grade point and credits of one subject, for SGPA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditedGrade {
    pub grade_point: f64,
    pub credits: i32,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// present / total * 100, rounded to 2 decimals.
pub fn attendance_percentage(present: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(present.max(0) as f64 / total as f64 * 100.0)
}

/// Σ(obtained/max × weightage) / Σ weightage × 100.
///
/// Components with a non-positive max are skipped.
pub fn weighted_percentage(scores: &[ComponentScore]) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for s in scores.iter().filter(|s| s.max_marks > 0.0 && s.weightage > 0.0) {
        weighted += s.marks_obtained / s.max_marks * s.weightage;
        total_weight += s.weightage;
    }
    if total_weight <= 0.0 {
        return 0.0;
    }
    round2(weighted / total_weight * 100.0)
}

/// 10-point scale.
pub fn grade_point(percentage: f64) -> f64 {
    match percentage {
        p if p >= 90.0 => 10.0,
        p if p >= 80.0 => 9.0,
        p if p >= 70.0 => 8.0,
        p if p >= 60.0 => 7.0,
        p if p >= 55.0 => 6.0,
        p if p >= 50.0 => 5.0,
        p if p >= 40.0 => 4.0,
        _ => 0.0,
    }
}

pub fn sgpa(grades: &[CreditedGrade]) -> f64 {
    let credits: i32 = grades.iter().map(|g| g.credits.max(0)).sum();
    if credits <= 0 {
        return 0.0;
    }
    let points: f64 = grades
        .iter()
        .map(|g| g.grade_point * g.credits.max(0) as f64)
        .sum();
    round2(points / credits as f64)
}
