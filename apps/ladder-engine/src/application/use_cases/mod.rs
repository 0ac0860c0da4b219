//! Application Use Cases

mod ask_advisor;
mod ladder_engine;
mod manage_instruments;

pub use ask_advisor::AskAdvisorUseCase;
pub use ladder_engine::{LadderEngine, LadderEngineConfig, PlaceOutcome};
pub use manage_instruments::ManageInstrumentsUseCase;
