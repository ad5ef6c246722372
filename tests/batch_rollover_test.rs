// ==========================================
// Batch rollover tests
// ==========================================
// Semester advancement, ceiling, archived batches, concurrent callers
// and auto-rollover through the full API stack.
// ==========================================

mod helpers;

#[cfg(test)]
mod batch_rollover_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use college_erp::api::batch_api::{AutoRolloverOutcome, UpdateBatchRequest};
    use college_erp::api::ApiError;

    use crate::helpers::api_test_helper::*;

    #[test]
    fn test_rollover_advances_until_final_semester() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CSE");
        let batch = env.batch(&dept, "2022", 6);

        let b = env.state.batch_api.rollover(&batch.id, ADMIN).unwrap();
        assert_eq!(b.current_semester, 7);
        let b = env.state.batch_api.rollover(&batch.id, ADMIN).unwrap();
        assert_eq!(b.current_semester, 8);

        let err = env.state.batch_api.rollover(&batch.id, ADMIN).unwrap_err();
        match err {
            ApiError::InvalidState(msg) => {
                assert_eq!(msg, "Batch is already in final semester (8/8)");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(env.state.batch_api.get_batch(&batch.id).unwrap().current_semester, 8);
        assert_eq!(
            env.count("action_log", "action_type = 'BatchRollover' AND entity_id = '2022'"),
            2
        );
    }

    #[test]
    fn test_rollover_rejected_for_archived_batch() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("ECE");
        let batch = env.batch(&dept, "2019", 4);

        env.state.batch_api.archive_batch(&batch.id, ADMIN).unwrap();

        let err = env.state.batch_api.rollover(&batch.id, ADMIN).unwrap_err();
        assert!(
            matches!(&err, ApiError::InvalidState(msg) if msg == "Cannot rollover semester for an archived batch"),
            "unexpected error: {:?}",
            err
        );
        assert_eq!(env.state.batch_api.get_batch(&batch.id).unwrap().current_semester, 4);
    }

    #[test]
    fn test_rollover_unknown_batch_is_not_found() {
        let env = ApiTestEnv::new().unwrap();
        let err = env.state.batch_api.rollover("1999", ADMIN).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_rollover_does_not_touch_students() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("ME");
        let batch = env.batch(&dept, "2023", 2);
        let student = env.student(&batch, "1ab23me001");

        env.state.batch_api.rollover(&batch.id, ADMIN).unwrap();

        let students = env.state.people_api.list_students(&batch.id).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, student.id);
        assert_eq!(students[0].semester, 2);
    }

    #[test]
    fn test_concurrent_rollovers_never_skip_a_semester() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("CIV");
        let batch = env.batch(&dept, "2021", 6);

        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let state = env.state.clone();
                let barrier = barrier.clone();
                let batch_id = batch.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    state.batch_api.rollover(&batch_id, &format!("admin-{}", i))
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successes += 1,
                Err(ApiError::Conflict(_)) | Err(ApiError::InvalidState(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert!(successes >= 1);
        assert!(successes <= 2);
        let final_batch = env.state.batch_api.get_batch(&batch.id).unwrap();
        assert_eq!(final_batch.current_semester, 6 + successes);
        assert_eq!(
            env.count("action_log", "action_type = 'BatchRollover' AND entity_id = '2021'"),
            successes as i64
        );
    }

    #[test]
    fn test_auto_rollover_only_touches_flagged_batches() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("EEE");
        let flagged = env.batch(&dept, "2022", 3);
        let at_ceiling = env.batch(&dept, "2020", 8);
        let manual = env.batch(&dept, "2023", 1);

        for id in [&flagged.id, &at_ceiling.id] {
            env.state
                .batch_api
                .update_batch(
                    id,
                    UpdateBatchRequest {
                        academic_year: None,
                        auto_rollover: Some(true),
                    },
                    ADMIN,
                )
                .unwrap();
        }

        let outcomes = env.state.batch_api.auto_rollover(ADMIN).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&AutoRolloverOutcome::Advanced {
            batch_id: "2022".to_string(),
            new_semester: 4,
        }));
        assert!(outcomes.iter().any(|o| matches!(
            o,
            AutoRolloverOutcome::Skipped { batch_id, reason }
                if batch_id == "2020" && reason.contains("final semester")
        )));

        assert_eq!(env.state.batch_api.get_batch(&manual.id).unwrap().current_semester, 1);
    }

    #[test]
    fn test_archive_requires_no_active_students() {
        let env = ApiTestEnv::new().unwrap();
        let dept = env.department("BT");
        let batch = env.batch(&dept, "2018", 8);
        let student = env.student(&batch, "1ab18bt001");

        let err = env.state.batch_api.archive_batch(&batch.id, ADMIN).unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        env.state.people_api.deactivate_student(&student.id, ADMIN).unwrap();
        let archived = env.state.batch_api.archive_batch(&batch.id, ADMIN).unwrap();
        assert!(archived.archived);

        // Archived batches drop out of the default listing.
        assert!(env.state.batch_api.list_batches(Some(&dept.id), false).unwrap().is_empty());
        assert_eq!(env.state.batch_api.list_batches(Some(&dept.id), true).unwrap().len(), 1);
    }
}
