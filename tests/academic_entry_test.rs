// ==========================================
// Marks, attendance and report tests
// ==========================================
// All-or-nothing bulk entry, status gating, and the reports computed
// from what was entered.
// ==========================================

mod helpers;

#[cfg(test)]
mod academic_entry_test {
    use college_erp::api::academic_api::{AttendanceInput, AttendanceRequest, MarkInput};
    use college_erp::api::report_api::ActionLogQuery;
    use college_erp::api::ApiError;
    use college_erp::domain::batch::Batch;
    use college_erp::domain::exam::ExamComponent;
    use college_erp::domain::people::{Department, Student};
    use college_erp::domain::subject::Subject;
    use college_erp::domain::types::SubjectStatus;

    use crate::helpers::api_test_helper::*;

    use college_erp::domain::types::AttendanceStatus::{Absent, Leave, Present};

    struct Fixture {
        env: ApiTestEnv,
        dept: Department,
        batch: Batch,
        s1: Student,
        s2: Student,
        compilers: Subject,
        compilers_components: Vec<ExamComponent>,
        networks: Subject,
        networks_lab: ExamComponent,
        seminar: Subject,
    }

    /// CSE batch 2022 in semester 5 with two students and three active
    /// subjects (4, 3 and 2 credits) plus one draft.
    fn fixture() -> Fixture {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let s1 = env.student(&batch, "1ab22cs001");
        let s2 = env.student(&batch, "1ab22cs002");
        let faculty = env.faculty(&dept, "EMP100");

        let (compilers, compilers_components) = env.active_subject(
            &dept,
            &batch,
            &faculty,
            "CS510",
            4,
            &[("Internal", 50.0, 50.0), ("SEE", 100.0, 50.0)],
        );
        let (networks, mut lab) =
            env.active_subject(&dept, &batch, &faculty, "CS520", 3, &[("Lab", 20.0, 100.0)]);
        let (seminar, _) = env.active_subject(&dept, &batch, &faculty, "CS530", 2, &[]);
        env.subject(&dept, "CS540", 5, 3, true);

        Fixture {
            env,
            dept,
            batch,
            s1,
            s2,
            compilers,
            compilers_components,
            networks,
            networks_lab: lab.remove(0),
            seminar,
        }
    }

    #[test]
    fn test_bulk_marks_are_all_or_nothing() {
        let f = fixture();
        let internal = &f.compilers_components[0];

        let err = f
            .env
            .state
            .academic_api
            .record_marks(
                &internal.id,
                &[
                    MarkInput {
                        student_id: f.s1.id.clone(),
                        marks_obtained: 45.0,
                    },
                    MarkInput {
                        student_id: f.s2.id.clone(),
                        marks_obtained: 51.0,
                    },
                ],
                ADMIN,
            )
            .unwrap_err();
        match err {
            ApiError::InvalidInput(msg) => {
                assert!(msg.starts_with("Rejected 1 entries"), "{}", msg);
                assert!(msg.contains(&f.s2.id));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(f.env.count("student_component_mark", ""), 0);

        let stored = f.env.marks(internal, &[(&f.s1, 45.0), (&f.s2, 38.5)]);
        assert_eq!(stored, 2);

        // Re-entry replaces the previous value.
        f.env.marks(internal, &[(&f.s1, 40.0)]);
        let marks = f.env.state.academic_api.list_marks(&internal.id).unwrap();
        assert_eq!(marks.len(), 2);
        let s1_mark = marks.iter().find(|m| m.student_id == f.s1.id).unwrap();
        assert_eq!(s1_mark.marks_obtained, 40.0);
        assert_eq!(s1_mark.entered_by, ADMIN);
    }

    #[test]
    fn test_marks_reject_duplicates_and_foreign_students() {
        let f = fixture();
        let other_dept = f.env.department("ECE");
        let other_batch = f.env.batch(&other_dept, "2021", 7);
        let outsider = f.env.student(&other_batch, "1ab21ec001");
        let internal = &f.compilers_components[0];

        let entries = vec![
            MarkInput {
                student_id: f.s1.id.clone(),
                marks_obtained: 10.0,
            },
            MarkInput {
                student_id: f.s1.id.clone(),
                marks_obtained: 11.0,
            },
            MarkInput {
                student_id: outsider.id.clone(),
                marks_obtained: 12.0,
            },
            MarkInput {
                student_id: "missing".to_string(),
                marks_obtained: 13.0,
            },
        ];
        let err = f
            .env
            .state
            .academic_api
            .record_marks(&internal.id, &entries, ADMIN)
            .unwrap_err();
        match err {
            ApiError::InvalidInput(msg) => {
                assert!(msg.starts_with("Rejected 3 entries"), "{}", msg);
                assert!(msg.contains("duplicate entry"));
                assert!(msg.contains("not in the subject's department"));
                assert!(msg.contains("student not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(f.env.count("student_component_mark", ""), 0);
    }

    #[test]
    fn test_entries_only_for_active_subjects() {
        let f = fixture();
        f.env.state.lifecycle_api.lock(&f.networks.id, ADMIN).unwrap();

        let err = f
            .env
            .state
            .academic_api
            .record_marks(
                &f.networks_lab.id,
                &[MarkInput {
                    student_id: f.s1.id.clone(),
                    marks_obtained: 10.0,
                }],
                ADMIN,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        let err = f
            .env
            .state
            .academic_api
            .record_attendance(
                &f.networks.id,
                &AttendanceRequest {
                    date: "2024-08-01".to_string(),
                    entries: vec![AttendanceInput {
                        student_id: f.s1.id.clone(),
                        status: Present,
                    }],
                },
                ADMIN,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        // Components are frozen once locked.
        let err = f
            .env
            .state
            .academic_api
            .create_component(
                &f.networks.id,
                college_erp::api::academic_api::CreateComponentRequest {
                    name: "Viva".to_string(),
                    max_marks: 10.0,
                    weightage: 10.0,
                },
                ADMIN,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn test_component_weightage_capped_at_one_hundred() {
        let f = fixture();
        let err = f
            .env
            .state
            .academic_api
            .create_component(
                &f.compilers.id,
                college_erp::api::academic_api::CreateComponentRequest {
                    name: "Quiz".to_string(),
                    max_marks: 10.0,
                    weightage: 5.0,
                },
                ADMIN,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let c = f.env.component(&f.seminar, "Report", 25.0, 100.0);
        assert_eq!(c.subject_id, f.seminar.id);
    }

    #[test]
    fn test_attendance_same_day_replaces_entries() {
        let f = fixture();

        let err = f
            .env
            .state
            .academic_api
            .record_attendance(
                &f.compilers.id,
                &AttendanceRequest {
                    date: "01/08/2024".to_string(),
                    entries: vec![AttendanceInput {
                        student_id: f.s1.id.clone(),
                        status: Present,
                    }],
                },
                ADMIN,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        f.env.attendance(&f.compilers, "2024-08-01", &[(&f.s1, Present), (&f.s2, Present)]);
        f.env.attendance(&f.compilers, "2024-08-01", &[(&f.s1, Absent)]);
        assert_eq!(f.env.count("attendance_entry", ""), 2);

        let report = f.env.state.report_api.student_attendance(&f.s1.id).unwrap();
        assert_eq!(report.subjects.len(), 1);
        assert_eq!(report.subjects[0].present, 0);
        assert_eq!(report.subjects[0].total, 1);
    }

    #[test]
    fn test_attendance_reports() {
        let f = fixture();
        f.env.attendance(&f.compilers, "2024-08-01", &[(&f.s1, Present), (&f.s2, Leave)]);
        f.env.attendance(&f.compilers, "2024-08-02", &[(&f.s1, Present), (&f.s2, Present)]);
        f.env.attendance(&f.compilers, "2024-08-03", &[(&f.s1, Absent)]);
        f.env.attendance(&f.compilers, "2024-08-05", &[(&f.s1, Present)]);

        let report = f.env.state.report_api.student_attendance(&f.s1.id).unwrap();
        assert_eq!(report.usn, "1AB22CS001");
        let compilers = &report.subjects[0];
        assert_eq!(compilers.subject_code, "CS510");
        assert_eq!((compilers.present, compilers.total), (3, 4));
        assert_eq!(compilers.percentage, 75.0);

        let summary = f
            .env
            .state
            .report_api
            .subject_attendance_summary(&f.compilers.id)
            .unwrap();
        assert_eq!(summary.students.len(), 2);
        let s2_row = summary.students.iter().find(|r| r.student_id == f.s2.id).unwrap();
        assert_eq!(s2_row.percentage, 50.0);
        assert_eq!(summary.class_average, 62.5);

        let empty = f
            .env
            .state
            .report_api
            .subject_attendance_summary(&f.seminar.id)
            .unwrap();
        assert!(empty.students.is_empty());
        assert_eq!(empty.class_average, 0.0);
    }

    #[test]
    fn test_semester_summary_and_sgpa() {
        let f = fixture();
        let internal = &f.compilers_components[0];
        let see = &f.compilers_components[1];
        f.env.marks(internal, &[(&f.s1, 45.0)]);
        f.env.marks(see, &[(&f.s1, 90.0)]);
        f.env.marks(&f.networks_lab, &[(&f.s1, 12.0)]);
        f.env.state.lifecycle_api.lock(&f.networks.id, ADMIN).unwrap();

        let summary = f
            .env
            .state
            .report_api
            .student_semester_summary(&f.s1.id, 5)
            .unwrap();

        // Draft CS540 is left out.
        assert_eq!(summary.subjects.len(), 3);
        assert_eq!(summary.total_credits, 9);

        let by_code = |code: &str| summary.subjects.iter().find(|s| s.subject_code == code).unwrap();
        assert_eq!(by_code("CS510").weighted_percentage, 90.0);
        assert_eq!(by_code("CS510").grade_point, 10.0);
        assert_eq!(by_code("CS520").weighted_percentage, 60.0);
        assert_eq!(by_code("CS520").grade_point, 7.0);
        assert_eq!(by_code("CS530").components_recorded, 0);
        assert_eq!(by_code("CS530").grade_point, 0.0);

        // (10*4 + 7*3 + 0*2) / 9
        assert_eq!(summary.sgpa, 6.78);

        let err = f
            .env
            .state
            .report_api
            .student_semester_summary(&f.s1.id, 9)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_department_dashboard_and_action_log() {
        let f = fixture();
        f.env.state.lifecycle_api.lock(&f.networks.id, ADMIN).unwrap();

        let dashboard = f.env.state.report_api.department_dashboard(&f.dept.id).unwrap();
        assert_eq!(dashboard.active_students, 2);
        assert_eq!(dashboard.active_faculty, 1);
        assert_eq!(dashboard.active_batches, 1);
        assert_eq!(dashboard.pending_mappings, 0);
        assert_eq!(dashboard.subjects_by_status.get(&SubjectStatus::Active), Some(&2));
        assert_eq!(dashboard.subjects_by_status.get(&SubjectStatus::Locked), Some(&1));
        assert_eq!(dashboard.subjects_by_status.get(&SubjectStatus::Draft), Some(&1));

        let recent = f
            .env
            .state
            .report_api
            .recent_actions(&ActionLogQuery {
                limit: Some(3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 3);

        let history = f.env.state.report_api.entity_history("batch", &f.batch.id).unwrap();
        assert!(history.iter().any(|a| a.action_type == "CreateBatch"));
    }
}
