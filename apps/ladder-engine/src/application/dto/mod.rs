//! Data Transfer Objects for the application boundary.

mod instrument_dto;
mod snapshot_dto;

pub use instrument_dto::{AddInstrumentDto, NewInstrument, SelectionItem, SelectionResult};
pub use snapshot_dto::{
    InstrumentDiagnostics, InstrumentView, LadderSnapshot, LevelView, SymbolOutcome, TickReport,
};
