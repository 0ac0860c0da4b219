//! Ladder bounded context.
//!
//! An instrument's ladder is a fixed number of descending buy levels spaced
//! by a drawdown fraction below the entry price. Each level is either
//! pending (not yet sent to the broker) or placed (a limit order exists).

mod errors;
mod level;
mod record;
pub mod scheduler;

pub use errors::LadderError;
pub use level::{LevelSlot, LevelState};
pub use record::{InstrumentRecord, InstrumentStatus, LadderPhase, MAX_LEVELS, PositionState};
pub use scheduler::compute_levels;
