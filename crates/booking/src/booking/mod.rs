pub mod availability;
pub mod commit;
pub mod date_parser;
pub mod fallback;
pub mod intent;
pub mod machine;
pub mod prompts;
pub mod session;
pub mod slots;
pub mod validation;

pub use availability::{AvailabilityResolver, AvailabilitySource, SlotAvailability};
pub use commit::{CommitFailure, CommitOutcome, ConfirmationCommitter};
pub use fallback::{ChatFallback, StaticFallback};
pub use machine::{
    BookingEngine, ChatTurn, DEFAULT_CALENDAR_TIMEOUT, EngineError, EngineSettings, TurnReply,
};
pub use session::{BookingData, BookingStep, ChatSession, FlowContext};
pub use slots::SlotTime;
