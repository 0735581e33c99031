use chrono::{DateTime, Utc};
use clap::Subcommand;
use studyquest_core::{
    Config, Database, LifecycleEvent, SessionController, SessionResult, SessionService,
    SessionState,
};

use super::resolve_user;

const CONTROLLER_KEY: &str = "session_controller";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a study session
    Start,
    /// Stop the session; rejected if too much time was spent away
    Stop,
    /// Stop and credit the session regardless of time spent away
    ForceStop,
    /// Print current session state as JSON
    Status,
    /// Clear the away-time accounting of the running session
    Reset,
    /// Deliver an app lifecycle signal (e.g. "did-enter-background")
    Event {
        /// Lifecycle event name
        name: String,
    },
}

fn controller_key(user_id: &str) -> String {
    format!("{CONTROLLER_KEY}:{user_id}")
}

/// The parked controller while a session is running, otherwise a fresh one
/// built from the current config so budget changes apply to the next session.
fn load_controller(db: &Database, user_id: &str, config: &Config) -> SessionController {
    if let Ok(Some(json)) = db.kv_get(&controller_key(user_id)) {
        match serde_json::from_str::<SessionController>(&json) {
            Ok(controller) if controller.state() == SessionState::Running => return controller,
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "discarding unreadable parked session"),
        }
    }
    config.session_controller()
}

fn save_controller(
    db: &Database,
    user_id: &str,
    controller: &SessionController,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(controller)?;
    db.kv_set(&controller_key(user_id), &json)?;
    Ok(())
}

pub fn run(action: SessionAction, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user_id = resolve_user(user, &config);
    let db = Database::open()?;
    let controller = load_controller(&db, &user_id, &config);
    let mut service = SessionService::open(user_id.as_str(), &db, controller)?;

    let now = Utc::now();
    // Credit wall-clock time since the last invocation.
    service.advance_to(now);

    let outcome: Result<String, Box<dyn std::error::Error>> = match action {
        SessionAction::Start => match service.start(now) {
            Some(event) => serde_json::to_string_pretty(&event).map_err(Into::into),
            None => {
                eprintln!("a session is already running");
                snapshot_json(service.controller(), now)
            }
        },
        SessionAction::Stop => service.stop(now).map_err(Into::into).and_then(print_result),
        SessionAction::ForceStop => service
            .force_stop(now)
            .map_err(Into::into)
            .and_then(print_result),
        SessionAction::Status => snapshot_json(service.controller(), now),
        SessionAction::Reset => {
            service.reset_session(now);
            snapshot_json(service.controller(), now)
        }
        SessionAction::Event { name } => {
            let event: LifecycleEvent = name.parse()?;
            match service.handle_lifecycle(event, now) {
                Some(notice) => {
                    eprintln!("{}", notice.message());
                    serde_json::to_string_pretty(&notice).map_err(Into::into)
                }
                None => snapshot_json(service.controller(), now),
            }
        }
    };

    // Park the controller even if the command failed part-way, so a running
    // session is never lost.
    let (_, controller, _) = service.into_parts();
    save_controller(&db, &user_id, &controller)?;

    println!("{}", outcome?);
    Ok(())
}

fn snapshot_json(
    controller: &SessionController,
    now: DateTime<Utc>,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_json::to_string_pretty(&controller.snapshot(now))?)
}

fn print_result(result: Option<SessionResult>) -> Result<String, Box<dyn std::error::Error>> {
    match result {
        Some(result) => {
            if let Some(message) = &result.message {
                eprintln!("{message}");
            }
            Ok(serde_json::to_string_pretty(&result)?)
        }
        None => Ok("{\"type\": \"idle\"}".to_string()),
    }
}
