// ==========================================
// College ERP - Login lockout policy
// ==========================================
// N consecutive failed password checks lock the account for a fixed
// duration. A successful login resets the counter.
// ==========================================

use crate::domain::user::User;
use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;
pub const DEFAULT_LOCK_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub lock_duration: Duration,
}

/// What the caller should persist after a failed password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Counter incremented; `remaining` attempts before lock.
    Counted { attempts: i32, remaining: i32 },
    /// Threshold reached; lock until the given time.
    Locked { attempts: i32, locked_until: NaiveDateTime },
    /// Another failure locked the account first; nothing is written.
    AlreadyLocked { locked_until: NaiveDateTime },
}

impl LockoutPolicy {
    pub fn new(max_attempts: i32, lock_minutes: i64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_duration: Duration::minutes(lock_minutes.max(1)),
        }
    }

    pub fn is_locked(&self, user: &User, now: NaiveDateTime) -> bool {
        user.is_locked_at(now)
    }

    /// Failures that still count at `now`. An expired lock starts a fresh
    /// window.
    pub fn effective_attempts(&self, user: &User, now: NaiveDateTime) -> i32 {
        match user.locked_until {
            Some(until) if until <= now => 0,
            _ => user.failed_login_attempts.max(0),
        }
    }

    /// Outcome of one more failure against the stored state of `user`.
    /// Must be evaluated on a row read under the same write lock that
    /// persists the result.
    pub fn next_failure(&self, user: &User, now: NaiveDateTime) -> FailureOutcome {
        match user.locked_until {
            Some(locked_until) if locked_until > now => FailureOutcome::AlreadyLocked { locked_until },
            _ => self.register_failure(self.effective_attempts(user, now), now),
        }
    }

    /// Outcome of one more failure on top of `previous_attempts`.
    pub fn register_failure(&self, previous_attempts: i32, now: NaiveDateTime) -> FailureOutcome {
        let attempts = previous_attempts.max(0) + 1;
        if attempts >= self.max_attempts {
            FailureOutcome::Locked {
                attempts,
                locked_until: now + self.lock_duration,
            }
        } else {
            FailureOutcome::Counted {
                attempts,
                remaining: self.max_attempts - attempts,
            }
        }
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCK_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LoginType;

    fn user(attempts: i32, locked_until: Option<NaiveDateTime>) -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            password_hash: String::new(),
            login_type: LoginType::Faculty,
            department_id: None,
            failed_login_attempts: attempts,
            locked_until,
            last_login_at: None,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_fifth_failure_locks_for_thirty_minutes() {
        let policy = LockoutPolicy::default();
        let mut attempts = 0;
        for i in 1..5 {
            match policy.register_failure(attempts, now()) {
                FailureOutcome::Counted { attempts: a, remaining } => {
                    assert_eq!(a, i);
                    assert_eq!(remaining, 5 - i);
                    attempts = a;
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        match policy.register_failure(attempts, now()) {
            FailureOutcome::Locked { attempts, locked_until } => {
                assert_eq!(attempts, 5);
                assert_eq!(locked_until, now() + Duration::minutes(30));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lock_window() {
        let policy = LockoutPolicy::default();
        let locked = user(5, Some(now() + Duration::minutes(10)));
        assert!(policy.is_locked(&locked, now()));
        assert_eq!(policy.effective_attempts(&locked, now()), 5);

        let expired = user(5, Some(now() - Duration::seconds(1)));
        assert!(!policy.is_locked(&expired, now()));
        assert_eq!(policy.effective_attempts(&expired, now()), 0);
    }

    #[test]
    fn test_next_failure_uses_stored_row() {
        let policy = LockoutPolicy::default();
        assert_eq!(
            policy.next_failure(&user(2, None), now()),
            FailureOutcome::Counted { attempts: 3, remaining: 2 }
        );

        let until = now() + Duration::minutes(5);
        assert_eq!(
            policy.next_failure(&user(5, Some(until)), now()),
            FailureOutcome::AlreadyLocked { locked_until: until }
        );

        // An expired lock starts over at one.
        let expired = user(5, Some(now() - Duration::minutes(1)));
        assert_eq!(
            policy.next_failure(&expired, now()),
            FailureOutcome::Counted { attempts: 1, remaining: 4 }
        );
    }

    #[test]
    fn test_policy_clamps_nonsense_values() {
        let policy = LockoutPolicy::new(0, 0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.lock_duration, Duration::minutes(1));
    }
}
