pub mod controller;
pub mod events;
pub mod state;

pub use controller::{MarkResult, SessionController};
pub use events::{EventEmitter, SessionEvent};
pub use state::{
    AttemptGate, AttemptOutcome, AttemptTicket, SessionError, SessionState, SkipReason,
    TickOutcome,
};
