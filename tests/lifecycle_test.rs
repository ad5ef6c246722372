// ==========================================
// Subject lifecycle tests
// ==========================================
// Guarded transitions, the append-only status history, draft-only
// edits and administrative overrides.
// ==========================================

mod helpers;

#[cfg(test)]
mod lifecycle_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use college_erp::api::mapping_api::MappingRequest;
    use college_erp::api::subject_api::UpdateSubjectRequest;
    use college_erp::api::ApiError;
    use college_erp::domain::types::SubjectStatus;

    use crate::helpers::api_test_helper::*;

    fn rejection_message(err: ApiError) -> String {
        match err {
            ApiError::TransitionRejected { message, .. } => message,
            other => panic!("expected TransitionRejected, got {:?}", other),
        }
    }

    fn rename(name: &str) -> UpdateSubjectRequest {
        UpdateSubjectRequest {
            code: None,
            name: Some(name.to_string()),
            semester: None,
            category_id: None,
            credits: None,
        }
    }

    #[test]
    fn test_activation_requires_category_and_approved_faculty() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP001");
        let subject = env.subject(&dept, "CS501", 5, 4, false);

        let err = env.state.lifecycle_api.activate(&subject.id, ADMIN).unwrap_err();
        match &err {
            ApiError::TransitionRejected { validation, .. } => {
                assert!(!validation.valid);
                assert!(validation.checks.valid_transition);
                assert!(!validation.checks.category_assigned);
                assert!(!validation.checks.faculty_mapped);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            rejection_message(err),
            "Cannot activate subject: subject category is not assigned; no approved and active faculty mapping exists"
        );

        // A pending mapping does not count.
        let category = env.state.subject_api.create_category("Core", ADMIN).unwrap();
        env.state
            .subject_api
            .update_subject(
                &subject.id,
                UpdateSubjectRequest {
                    category_id: Some(category.id.clone()),
                    ..rename("Compilers")
                },
                ADMIN,
            )
            .unwrap();
        let mapping = env
            .state
            .mapping_api
            .request_mapping(
                &subject.id,
                MappingRequest {
                    faculty_id: faculty.id.clone(),
                    batch_id: batch.id.clone(),
                    section: "a".to_string(),
                    academic_year: "2022-2023".to_string(),
                },
                ADMIN,
            )
            .unwrap();
        assert_eq!(mapping.section, "A");

        let err = env.state.lifecycle_api.activate(&subject.id, ADMIN).unwrap_err();
        assert_eq!(
            rejection_message(err),
            "Cannot activate subject: no approved and active faculty mapping exists"
        );

        env.state.mapping_api.approve_mapping(&mapping.id, ADMIN).unwrap();
        let change = env.state.lifecycle_api.activate(&subject.id, ADMIN).unwrap();
        assert_eq!(change.subject.status, SubjectStatus::Active);
        assert_eq!(change.log.from_status, Some(SubjectStatus::Draft));
        assert_eq!(change.log.status, SubjectStatus::Active);
        assert!(!change.log.is_override);
    }

    #[test]
    fn test_deactivated_mapping_no_longer_satisfies_activation() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("ISE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP010");
        let subject = env.subject(&dept, "IS501", 5, 3, true);
        env.approved_mapping(&subject, &faculty, &batch);

        let mapping = &env.state.mapping_api.list_mappings(&subject.id).unwrap()[0];
        env.state.mapping_api.deactivate_mapping(&mapping.id, ADMIN).unwrap();

        let validation = env
            .state
            .lifecycle_api
            .validate_transition(&subject.id, SubjectStatus::Active)
            .unwrap();
        assert!(!validation.valid);
        assert!(validation.checks.category_assigned);
        assert!(!validation.checks.faculty_mapped);
    }

    #[test]
    fn test_lock_requires_exam_components() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP002");
        let (subject, _) = env.active_subject(&dept, &batch, &faculty, "CS502", 4, &[]);

        let err = env.state.lifecycle_api.lock(&subject.id, ADMIN).unwrap_err();
        assert_eq!(
            rejection_message(err),
            "Cannot lock subject: no exam components have been created"
        );

        env.component(&subject, "Internal", 50.0, 50.0);
        let change = env.state.lifecycle_api.lock(&subject.id, ADMIN).unwrap();
        assert_eq!(change.subject.status, SubjectStatus::Locked);

        let change = env.state.lifecycle_api.archive(&subject.id, ADMIN).unwrap();
        assert_eq!(change.subject.status, SubjectStatus::Archived);

        let err = env.state.lifecycle_api.archive(&subject.id, ADMIN).unwrap_err();
        assert_eq!(rejection_message(err), "Subject is already archived");
    }

    #[test]
    fn test_transitions_cannot_skip_or_go_back() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("ECE");
        let subject = env.subject(&dept, "EC301", 3, 4, true);

        let err = env
            .state
            .lifecycle_api
            .transition(&subject.id, SubjectStatus::Locked, ADMIN)
            .unwrap_err();
        assert_eq!(
            rejection_message(err),
            "Cannot move subject from draft to locked; the next allowed status is active"
        );

        let validation = env
            .state
            .lifecycle_api
            .validate_transition(&subject.id, SubjectStatus::Archived)
            .unwrap();
        assert!(!validation.valid);
        assert!(!validation.checks.valid_transition);
        assert_eq!(validation.current_status, SubjectStatus::Draft);
        assert_eq!(validation.target_status, SubjectStatus::Archived);

        let err = env.state.lifecycle_api.activate("missing", ADMIN).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_status_history_is_append_only() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP003");
        let (subject, _) = env.active_subject(&dept, &batch, &faculty, "CS503", 3, &[("SEE", 100.0, 100.0)]);
        env.state.lifecycle_api.lock(&subject.id, ADMIN).unwrap();

        let history = env.state.lifecycle_api.status_history(&subject.id).unwrap();
        let statuses: Vec<SubjectStatus> = history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![SubjectStatus::Draft, SubjectStatus::Active, SubjectStatus::Locked]
        );
        assert_eq!(history[0].from_status, None);
        assert!(history.iter().all(|h| h.updated_by == ADMIN));

        let conn = env.conn.lock().unwrap();
        let update = conn.execute("UPDATE status_log SET status = 'draft'", []);
        assert!(update.is_err());
        let delete = conn.execute("DELETE FROM status_log", []);
        assert!(delete.is_err());
        drop(conn);

        assert_eq!(env.state.lifecycle_api.status_history(&subject.id).unwrap().len(), 3);
    }

    #[test]
    fn test_only_draft_subjects_can_be_edited() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP004");
        let draft = env.subject(&dept, "CS504", 5, 3, true);

        let edited = env
            .state
            .subject_api
            .update_subject(&draft.id, rename("Operating Systems"), ADMIN)
            .unwrap();
        assert_eq!(edited.name, "Operating Systems");

        let (active, _) = env.active_subject(&dept, &batch, &faculty, "CS505", 4, &[]);
        let err = env
            .state
            .subject_api
            .update_subject(&active.id, rename("Renamed"), ADMIN)
            .unwrap_err();
        assert!(
            matches!(&err, ApiError::InvalidState(msg) if msg == "Subject is active; only draft subjects can be edited"),
            "unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_override_requires_reason_and_is_logged() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("ME");
        let subject = env.subject(&dept, "ME601", 6, 3, false);

        let err = env
            .state
            .lifecycle_api
            .override_status(&subject.id, SubjectStatus::Locked, ADMIN, "   ")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = env
            .state
            .lifecycle_api
            .override_status(&subject.id, SubjectStatus::Draft, ADMIN, "no-op")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        // Guards do not apply to overrides.
        let change = env
            .state
            .lifecycle_api
            .override_status(&subject.id, SubjectStatus::Locked, ADMIN, "legacy results imported")
            .unwrap();
        assert_eq!(change.subject.status, SubjectStatus::Locked);
        assert!(change.log.is_override);
        assert_eq!(change.log.note.as_deref(), Some("legacy results imported"));

        let change = env
            .state
            .lifecycle_api
            .override_status(&subject.id, SubjectStatus::Draft, ADMIN, "reopened for correction")
            .unwrap();
        assert_eq!(change.subject.status, SubjectStatus::Draft);
        assert_eq!(change.log.from_status, Some(SubjectStatus::Locked));

        assert_eq!(
            env.count(
                "action_log",
                &format!("action_type = 'SubjectStatusOverride' AND entity_id = '{}'", subject.id)
            ),
            2
        );
    }

    #[test]
    fn test_concurrent_activation_succeeds_once() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 5);
        let faculty = env.faculty(&dept, "EMP005");
        let subject = env.subject(&dept, "CS506", 5, 4, true);
        env.approved_mapping(&subject, &faculty, &batch);

        let workers = 4;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let state = env.state.clone();
                let barrier = barrier.clone();
                let subject_id = subject.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    state.lifecycle_api.activate(&subject_id, ADMIN)
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successes += 1,
                Err(ApiError::TransitionRejected { .. }) | Err(ApiError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        let history = env.state.lifecycle_api.status_history(&subject.id).unwrap();
        assert_eq!(
            history.iter().filter(|h| h.status == SubjectStatus::Active).count(),
            1
        );
    }
}
