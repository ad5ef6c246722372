// ==========================================
// Login lockout tests
// ==========================================
// Failed-attempt counting, lock window, reset on success, admin unlock
// and runtime lockout configuration.
// ==========================================

mod helpers;

#[cfg(test)]
mod auth_lockout_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::{Duration, NaiveDateTime};

    use college_erp::api::auth_api::LoginRequest;
    use college_erp::api::config_api::UpdateConfigRequest;
    use college_erp::api::ApiError;
    use college_erp::db::{now_ts, parse_ts};
    use college_erp::domain::types::LoginType;

    use crate::helpers::api_test_helper::*;

    fn request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// (failed_login_attempts, locked_until) as stored.
    fn stored_lock(env: &ApiTestEnv, username: &str) -> (i32, Option<NaiveDateTime>) {
        let conn = env.conn.lock().unwrap();
        let (attempts, locked_until): (i32, Option<String>) = conn
            .query_row(
                "SELECT failed_login_attempts, locked_until FROM app_user WHERE username = ?1",
                [username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        (attempts, locked_until.and_then(|s| parse_ts(&s)))
    }

    #[test]
    fn test_fifth_failure_locks_account_for_thirty_minutes() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty1", LoginType::Faculty);
        let t0 = now_ts();

        for attempt in 1..=4 {
            let err = env
                .state
                .auth_api
                .login_at(&request("faculty1", "wrong-password"), t0)
                .unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(_)), "attempt {}: {:?}", attempt, err);
            assert_eq!(stored_lock(&env, "faculty1"), (attempt, None));
        }

        let err = env
            .state
            .auth_api
            .login_at(&request("faculty1", "wrong-password"), t0)
            .unwrap_err();
        assert!(
            matches!(&err, ApiError::Forbidden(msg) if msg == "Too many failed attempts; account locked for 30 minutes"),
            "unexpected error: {:?}",
            err
        );

        let (attempts, locked_until) = stored_lock(&env, "faculty1");
        assert_eq!(attempts, 5);
        let locked_until = locked_until.unwrap();
        assert!((locked_until - (t0 + Duration::minutes(30))).num_seconds().abs() <= 1);

        assert_eq!(
            env.count("action_log", "action_type = 'AccountLocked'"),
            1
        );
    }

    #[test]
    fn test_correct_password_rejected_while_locked() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty2", LoginType::Faculty);
        let t0 = now_ts();

        for _ in 0..5 {
            let _ = env.state.auth_api.login_at(&request("faculty2", "nope-nope"), t0);
        }

        let err = env
            .state
            .auth_api
            .login_at(&request("faculty2", TEST_PASSWORD), t0 + Duration::minutes(10))
            .unwrap_err();
        assert!(
            matches!(&err, ApiError::Forbidden(msg) if msg.starts_with("Account is locked until")),
            "unexpected error: {:?}",
            err
        );
        // The rejected attempt while locked is not counted again.
        assert_eq!(stored_lock(&env, "faculty2").0, 5);
    }

    #[test]
    fn test_lock_expires_after_window() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty3", LoginType::Faculty);
        let t0 = now_ts();

        for _ in 0..5 {
            let _ = env.state.auth_api.login_at(&request("faculty3", "nope-nope"), t0);
        }

        let response = env
            .state
            .auth_api
            .login_at(&request("faculty3", TEST_PASSWORD), t0 + Duration::minutes(31))
            .unwrap();
        assert_eq!(response.user.failed_login_attempts, 0);
        assert!(response.user.locked_until.is_none());
    }

    #[test]
    fn test_success_before_threshold_resets_counter() {
        let env = ApiTestEnv::new().unwrap();
        env.user("student1", LoginType::Student);
        let t0 = now_ts();

        for _ in 0..4 {
            let _ = env.state.auth_api.login_at(&request("student1", "bad"), t0);
        }
        assert_eq!(stored_lock(&env, "student1").0, 4);

        let response = env
            .state
            .auth_api
            .login_at(&request("student1", TEST_PASSWORD), t0)
            .unwrap();
        assert!(!response.token.is_empty());
        assert!(response.user.last_login_at.is_some());
        assert_eq!(stored_lock(&env, "student1"), (0, None));

        // A fresh window: four more failures still do not lock.
        for _ in 0..4 {
            let err = env
                .state
                .auth_api
                .login_at(&request("student1", "bad"), t0)
                .unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(_)));
        }
    }

    #[test]
    fn test_unknown_user_and_wrong_password_look_the_same() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty4", LoginType::Faculty);

        let unknown = env.state.auth_api.login(&request("ghost", "whatever1")).unwrap_err();
        let wrong = env.state.auth_api.login(&request("faculty4", "whatever1")).unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, ApiError::Unauthorized(_)));
        assert!(matches!(wrong, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_admin_unlock_clears_lock() {
        let env = ApiTestEnv::new().unwrap();
        let user = env.user("faculty5", LoginType::Faculty);
        for _ in 0..5 {
            let _ = env.state.auth_api.login(&request("faculty5", "nope-nope"));
        }
        assert!(env.state.auth_api.login(&request("faculty5", TEST_PASSWORD)).is_err());

        let unlocked = env.state.auth_api.unlock_user(&user.id, ADMIN).unwrap();
        assert_eq!(unlocked.failed_login_attempts, 0);
        assert!(unlocked.locked_until.is_none());

        assert!(env.state.auth_api.login(&request("faculty5", TEST_PASSWORD)).is_ok());
        assert_eq!(
            env.count("action_log", &format!("action_type = 'UnlockUser' AND entity_id = '{}'", user.id)),
            1
        );
    }

    #[test]
    fn test_lockout_threshold_follows_config() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty6", LoginType::Faculty);

        env.state
            .config_api
            .update_config(
                "lockout.max_attempts",
                &UpdateConfigRequest {
                    value: "3".to_string(),
                    reason: "exam week hardening".to_string(),
                },
                ADMIN,
            )
            .unwrap();

        let t0 = now_ts();
        for _ in 0..2 {
            let err = env
                .state
                .auth_api
                .login_at(&request("faculty6", "bad"), t0)
                .unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(_)));
        }
        let err = env
            .state
            .auth_api
            .login_at(&request("faculty6", "bad"), t0)
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(stored_lock(&env, "faculty6").0, 3);
    }

    #[test]
    fn test_parallel_wrong_passwords_still_lock() {
        let env = ApiTestEnv::new().unwrap();
        env.user("faculty7", LoginType::Faculty);

        let workers = 20;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let state = env.state.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    state.auth_api.login(&request("faculty7", "wrong-guess"))
                })
            })
            .collect();

        let mut unauthorized = 0;
        let mut forbidden = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Err(ApiError::Unauthorized(_)) => unauthorized += 1,
                Err(ApiError::Forbidden(_)) => forbidden += 1,
                other => panic!("unexpected result: {:?}", other.map(|r| r.user.username)),
            }
        }

        assert_eq!(unauthorized, 4);
        assert_eq!(forbidden, workers - 4);
        let (attempts, locked_until) = stored_lock(&env, "faculty7");
        assert_eq!(attempts, 5);
        assert!(locked_until.is_some());
        assert_eq!(env.count("action_log", "action_type = 'AccountLocked'"), 1);

        let err = env.state.auth_api.login(&request("faculty7", TEST_PASSWORD)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
