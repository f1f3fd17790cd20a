//! Match-control core: clock, period machine, scoring ledger and the session tying them together.
//!
//! Nothing in here touches the network or the terminal; the controller feeds operator
//! intents and timer ticks in, and sends the resulting [`Step`]s out.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod period;
pub mod rules;
pub mod session;

pub use clock::{format_clock, parse_clock};
pub use error::{LiveError, LiveResult};
pub use ledger::{Action, ActionId, ActionKind, PlayerState, TeamState};
pub use period::GamePhase;
pub use rules::GameRules;
pub use session::{ActionStatus, LiveSession, Outbound, RollbackPolicy, Step};
