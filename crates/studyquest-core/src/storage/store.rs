//! Persistence seam used by the session service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::progression::UserProgress;
use crate::session::SessionResult;

/// A finished session as it goes into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSessionRecord {
    pub user_id: String,
    pub session_id: Uuid,
    pub duration_secs: u64,
    pub experience_gained: f64,
    pub before_level: u32,
    pub after_level: u32,
    pub rejected: bool,
    pub forced: bool,
    pub suspect_secs: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl NewSessionRecord {
    pub fn from_result(user_id: &str, result: &SessionResult) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: result.session_id,
            duration_secs: result.duration_secs,
            experience_gained: result.experience_gained,
            before_level: result.before_level,
            after_level: result.after_level,
            rejected: result.rejected,
            forced: result.forced,
            suspect_secs: result.suspect_secs,
            started_at: result.started_at,
            ended_at: result.ended_at,
        }
    }
}

/// Storage collaborator for user progress and session history.
///
/// Implementations do not retry; callers decide on retry policy.
pub trait ProgressStore {
    /// Load a user's progress, or the default for a user never seen before.
    fn load_user_progress(&self, user_id: &str) -> Result<UserProgress, DatabaseError>;

    fn save_user_progress(
        &self,
        user_id: &str,
        progress: &UserProgress,
    ) -> Result<(), DatabaseError>;

    fn append_session_record(&self, record: &NewSessionRecord) -> Result<i64, DatabaseError>;
}

impl<T: ProgressStore + ?Sized> ProgressStore for &T {
    fn load_user_progress(&self, user_id: &str) -> Result<UserProgress, DatabaseError> {
        (**self).load_user_progress(user_id)
    }

    fn save_user_progress(
        &self,
        user_id: &str,
        progress: &UserProgress,
    ) -> Result<(), DatabaseError> {
        (**self).save_user_progress(user_id, progress)
    }

    fn append_session_record(&self, record: &NewSessionRecord) -> Result<i64, DatabaseError> {
        (**self).append_session_record(record)
    }
}
