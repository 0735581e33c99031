//! Async session driver.
//!
//! Runs a [`SessionService`] on a single tokio task. The task owns the service
//! outright, so every mutation happens on one executor in the order commands
//! arrive on the channel; lifecycle signals cannot interleave. A 1 s interval
//! ticks the clock only while a session is running, and stopping the session
//! stops the ticking at once.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use super::controller::{SessionResult, SessionState};
use super::service::SessionService;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::storage::ProgressStore;
use crate::tracker::LifecycleEvent;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 64;

enum Command {
    Start(oneshot::Sender<bool>),
    Stop(oneshot::Sender<Result<Option<SessionResult>>>),
    ForceStop(oneshot::Sender<Result<Option<SessionResult>>>),
    Lifecycle(LifecycleEvent),
    ResetSession,
    SuspectTime(oneshot::Sender<f64>),
    Snapshot(oneshot::Sender<Event>),
    DrainEvents(oneshot::Sender<Vec<Event>>),
    Shutdown(oneshot::Sender<Result<Option<SessionResult>>>),
}

/// Cloneable host-side handle to a running driver.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

/// Spawn the driver task. The join handle yields the service back once every
/// handle is dropped or [`SessionHandle::shutdown`] is called.
pub fn spawn<S>(service: SessionService<S>) -> (SessionHandle, JoinHandle<SessionService<S>>)
where
    S: ProgressStore + Send + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(service, rx));
    (SessionHandle { tx }, task)
}

impl SessionHandle {
    /// Returns `false` if a session was already running.
    pub async fn start(&self) -> Result<bool> {
        self.request(Command::Start).await
    }

    pub async fn stop(&self) -> Result<Option<SessionResult>> {
        self.request(Command::Stop).await?
    }

    pub async fn force_stop(&self) -> Result<Option<SessionResult>> {
        self.request(Command::ForceStop).await?
    }

    /// Deliver a lifecycle signal. Signals are applied in send order.
    pub async fn lifecycle(&self, event: LifecycleEvent) -> Result<()> {
        self.send(Command::Lifecycle(event)).await
    }

    pub async fn reset_session(&self) -> Result<()> {
        self.send(Command::ResetSession).await
    }

    pub async fn current_suspect_secs(&self) -> Result<f64> {
        self.request(Command::SuspectTime).await
    }

    pub async fn snapshot(&self) -> Result<Event> {
        self.request(Command::Snapshot).await
    }

    pub async fn drain_events(&self) -> Result<Vec<Event>> {
        self.request(Command::DrainEvents).await
    }

    /// Force-stop any running session (app termination) and end the task.
    pub async fn shutdown(&self) -> Result<Option<SessionResult>> {
        self.request(Command::Shutdown).await?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CoreError::DriverClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply)).await?;
        response.await.map_err(|_| CoreError::DriverClosed)
    }
}

async fn run<S: ProgressStore>(
    mut service: SessionService<S>,
    mut rx: mpsc::Receiver<Command>,
) -> SessionService<S> {
    let mut ticker = time::interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let running = service.controller().state() == SessionState::Running;
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else {
                    tracing::debug!("all session handles dropped; driver exiting");
                    break;
                };
                match command {
                    Command::Start(reply) => {
                        let started = service.start(Utc::now()).is_some();
                        if started {
                            // First tick one full period after start.
                            ticker.reset();
                        }
                        let _ = reply.send(started);
                    }
                    Command::Stop(reply) => {
                        let _ = reply.send(service.stop(Utc::now()));
                    }
                    Command::ForceStop(reply) => {
                        let _ = reply.send(service.force_stop(Utc::now()));
                    }
                    Command::Lifecycle(event) => {
                        service.handle_lifecycle(event, Utc::now());
                    }
                    Command::ResetSession => service.reset_session(Utc::now()),
                    Command::SuspectTime(reply) => {
                        let _ = reply.send(service.current_suspect_secs(Utc::now()));
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(service.controller().snapshot(Utc::now()));
                    }
                    Command::DrainEvents(reply) => {
                        let _ = reply.send(service.drain_events());
                    }
                    Command::Shutdown(reply) => {
                        let _ = reply.send(service.force_stop(Utc::now()));
                        break;
                    }
                }
            }
            _ = ticker.tick(), if running => service.tick(),
        }
    }

    service
}
