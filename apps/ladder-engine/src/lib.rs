// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Ladder Engine - Rust Core Library
//!
//! Automated ladder-buying engine. For every tracked instrument it opens an
//! entry position with a market buy, then keeps one resting limit buy per
//! ladder level below the entry price. A periodic tick reconciles the
//! tracked book with the broker; the book is persisted as a JSON document.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: instrument records, level slots, the level scheduler
//!   - `ladder`: `InstrumentRecord`, `LevelSlot`, `compute_levels`
//!   - `shared`: `Symbol`
//!
//! - **Application**: use cases and orchestration
//!   - `ports`: `BrokerGateway`, `InstrumentStore`, `AdvisorPort`
//!   - `use_cases`: `LadderEngine`, `ManageInstruments`, `AskAdvisor`
//!   - `services`: `LadderDriver` timer loop
//!   - `dto`: input validation, snapshots, tick reports
//!
//! - **Infrastructure**: adapters
//!   - `broker`: Alpaca REST adapter, in-process paper broker
//!   - `persistence`: JSON file store, in-memory store
//!   - `http`: axum REST API
//!   - `advisor`: canned advisor

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{BrokerError, BrokerGateway, InstrumentBook, InstrumentStore};
pub use application::services::{LadderDriver, LadderDriverConfig};
pub use application::use_cases::{LadderEngine, LadderEngineConfig, PlaceOutcome};
pub use domain::ladder::{
    InstrumentRecord, InstrumentStatus, LadderError, LadderPhase, LevelSlot, LevelState,
    PositionState, compute_levels,
};
pub use domain::shared::Symbol;
