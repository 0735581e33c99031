//! Per-user session service.
//!
//! Constructed explicitly for one user and handed its store, so there is no
//! process-wide session manager. Rewards are applied in memory first; a store
//! failure afterwards is returned to the caller but does not roll the reward
//! back.

use chrono::{DateTime, Utc};

use super::controller::{SessionController, SessionResult};
use crate::error::Result;
use crate::events::Event;
use crate::progression::UserProgress;
use crate::storage::{NewSessionRecord, ProgressStore};
use crate::tracker::{LifecycleEvent, TrackerNotice};

pub struct SessionService<S: ProgressStore> {
    user_id: String,
    store: S,
    controller: SessionController,
    progress: UserProgress,
}

impl<S: ProgressStore> SessionService<S> {
    /// Load the user's progress (creating a default on first use) and wrap it
    /// around `controller`.
    ///
    /// # Errors
    /// Returns a persistence error if the progress cannot be loaded.
    pub fn open(
        user_id: impl Into<String>,
        store: S,
        controller: SessionController,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let progress = store.load_user_progress(&user_id)?;
        Ok(Self {
            user_id,
            store,
            controller,
            progress,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.controller.start(now)
    }

    pub fn tick(&mut self) {
        self.controller.tick();
    }

    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        self.controller.advance_to(now);
    }

    pub fn handle_lifecycle(
        &mut self,
        event: LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Option<TrackerNotice> {
        self.controller.handle_lifecycle(event, now)
    }

    pub fn reset_session(&mut self, now: DateTime<Utc>) {
        self.controller.reset_session(now);
    }

    pub fn current_suspect_secs(&self, now: DateTime<Utc>) -> f64 {
        self.controller.current_suspect_secs(now)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.controller.drain_events()
    }

    /// Stop, validate, credit and persist. A session that cannot be credited
    /// comes back rejected and is still written to history.
    ///
    /// # Errors
    /// Store failures only. The in-memory progress already holds the reward.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Option<SessionResult>> {
        let result = self.controller.stop(&mut self.progress, now);
        self.persist(result)
    }

    /// Emergency stop that credits regardless of suspect time, then persists.
    pub fn force_stop(&mut self, now: DateTime<Utc>) -> Result<Option<SessionResult>> {
        let result = self.controller.force_stop(&mut self.progress, now);
        self.persist(result)
    }

    /// Give back the store and controller, e.g. to park a running session.
    pub fn into_parts(self) -> (S, SessionController, UserProgress) {
        (self.store, self.controller, self.progress)
    }

    fn persist(&mut self, result: Option<SessionResult>) -> Result<Option<SessionResult>> {
        let Some(result) = result else {
            return Ok(None);
        };

        if !result.rejected {
            self.store.save_user_progress(&self.user_id, &self.progress)?;
        }
        self.store
            .append_session_record(&NewSessionRecord::from_result(&self.user_id, &result))?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, DatabaseError};
    use crate::progression::ProgressionConfig;
    use crate::storage::Database;
    use chrono::Duration;
    use crate::tracker::TrackerConfig;
    use std::cell::RefCell;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Store that accepts loads but fails every write.
    #[derive(Default)]
    struct ReadOnlyStore {
        attempts: RefCell<Vec<&'static str>>,
    }

    impl ProgressStore for ReadOnlyStore {
        fn load_user_progress(&self, _user_id: &str) -> Result<UserProgress, DatabaseError> {
            Ok(UserProgress::new(2, 100.0))
        }

        fn save_user_progress(
            &self,
            _user_id: &str,
            _progress: &UserProgress,
        ) -> Result<(), DatabaseError> {
            self.attempts.borrow_mut().push("save");
            Err(DatabaseError::Locked)
        }

        fn append_session_record(
            &self,
            _record: &NewSessionRecord,
        ) -> Result<i64, DatabaseError> {
            self.attempts.borrow_mut().push("append");
            Err(DatabaseError::Locked)
        }
    }

    #[test]
    fn stop_persists_progress_and_history() {
        let db = Database::open_memory().unwrap();
        let mut service = SessionService::open("ada", &db, SessionController::default()).unwrap();

        service.start(t0());
        service.advance_to(t0() + Duration::seconds(90));
        let result = service.stop(t0() + Duration::seconds(90)).unwrap().unwrap();
        assert_eq!(result.after_level, 2);

        assert_eq!(db.load_user_progress("ada").unwrap(), *service.progress());
        let history = db.recent_sessions("ada", 5).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].session_id, result.session_id);
        assert_eq!(history[0].duration_secs, 90);
    }

    #[test]
    fn rejected_session_is_logged_but_progress_not_saved() {
        let db = Database::open_memory().unwrap();
        db.save_user_progress("ada", &UserProgress::new(4, 10.0)).unwrap();
        let mut service = SessionService::open("ada", &db, SessionController::default()).unwrap();

        let start = t0();
        service.start(start);
        service.handle_lifecycle(LifecycleEvent::DidEnterBackground, start);
        service.handle_lifecycle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(21));
        service.advance_to(start + Duration::seconds(300));
        let result = service.stop(start + Duration::seconds(300)).unwrap().unwrap();

        assert!(result.rejected);
        assert_eq!(db.load_user_progress("ada").unwrap(), UserProgress::new(4, 10.0));
        let history = db.recent_sessions("ada", 5).unwrap();
        assert!(history[0].rejected);
        assert_eq!(history[0].experience_gained, 0.0);
    }

    #[test]
    fn uncreditable_session_is_kept_in_history() {
        let db = Database::open_memory().unwrap();
        let controller = SessionController::new(
            TrackerConfig::default(),
            ProgressionConfig { max_level_steps: 1 },
        );
        let mut service = SessionService::open("ada", &db, controller).unwrap();

        let end = t0() + Duration::seconds(300);
        service.start(t0());
        service.advance_to(end);
        let result = service.stop(end).unwrap().unwrap();

        assert!(result.rejected);
        assert_eq!(result.experience_gained, 0.0);
        assert!(result.message.as_deref().unwrap().contains("Session not counted"));
        assert_eq!(*service.progress(), UserProgress::default());
        assert_eq!(db.load_user_progress("ada").unwrap(), UserProgress::default());

        let history = db.recent_sessions("ada", 5).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].rejected);
        assert_eq!(history[0].duration_secs, 300);
        assert!(service
            .drain_events()
            .iter()
            .any(|e| matches!(e, Event::SessionRejected { .. })));
    }

    #[test]
    fn store_failure_keeps_in_memory_reward() {
        let store = ReadOnlyStore::default();
        let mut service =
            SessionService::open("ada", &store, SessionController::default()).unwrap();

        service.start(t0());
        service.advance_to(t0() + Duration::seconds(30));
        let err = service.stop(t0() + Duration::seconds(30)).unwrap_err();

        assert!(matches!(err, CoreError::Persistence(DatabaseError::Locked)));
        assert_eq!(*service.progress(), UserProgress::new(2, 130.0));
        assert_eq!(*store.attempts.borrow(), vec!["save"]);
        assert!(service.stop(t0() + Duration::seconds(31)).unwrap().is_none());
    }

    #[test]
    fn force_stop_persists_over_budget_session() {
        let db = Database::open_memory().unwrap();
        let mut service = SessionService::open("ada", &db, SessionController::default()).unwrap();

        let start = t0();
        service.start(start);
        service.handle_lifecycle(LifecycleEvent::DidEnterBackground, start);
        service.advance_to(start + Duration::seconds(45));
        let result = service.force_stop(start + Duration::seconds(45)).unwrap().unwrap();

        assert!(result.forced);
        assert!(!result.rejected);
        assert!((result.suspect_secs - 45.0).abs() < 1e-9);
        assert_eq!(db.load_user_progress("ada").unwrap().experience, 45.0);
        assert!(db.recent_sessions("ada", 1).unwrap()[0].forced);
    }

    #[test]
    fn idle_stop_touches_nothing() {
        let store = ReadOnlyStore::default();
        let mut service =
            SessionService::open("ada", &store, SessionController::default()).unwrap();
        assert!(service.stop(t0()).unwrap().is_none());
        assert!(service.force_stop(t0()).unwrap().is_none());
        assert!(store.attempts.borrow().is_empty());
    }
}
