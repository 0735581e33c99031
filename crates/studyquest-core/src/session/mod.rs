mod clock;
mod controller;
pub mod driver;
mod service;

pub use clock::SessionClock;
pub use controller::{SessionController, SessionResult, SessionState};
pub use driver::SessionHandle;
pub use service::SessionService;
