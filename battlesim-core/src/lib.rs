//! # Battle Simulation Core
//!
//! Deterministic round-by-round land battle resolution and a probability
//! weighted outcome analyzer built on top of it.
//!
//! Battles use fixed-point arithmetic throughout so that a given set of
//! inputs and dice always produces the same result on every platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Definitions  │────▶│ build_battle │────▶│    Battle     │
//! │ (units, etc) │     │ (deployment) │     │ (two sides)   │
//! └──────────────┘     └──────────────┘     └───────┬───────┘
//!                                                   │ advance_round
//!                      ┌──────────────┐     ┌───────▼───────┐
//!                      │  Observers   │◀────│   Analyzer    │
//!                      │  (side fx)   │     │ (branch tree) │
//!                      └──────────────┘     └───────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Battle`] | Both sides, the round counter and the outcome |
//! | [`CombatSettings`] | Every tunable combat and analysis parameter |
//! | [`advance_round`] | Resolve one round: dice, targeting, damage, defeats |
//! | [`Analyzer`] | Resumable, chunked exploration of all dice branches |
//! | [`ProgressObserver`] | Trait for consuming analysis snapshots |
//!
//! ## Observers
//!
//! Side effects are isolated to the observer layer:
//! - [`LogObserver`]: Writes progress through the `log` facade
//! - [`JsonLinesObserver`]: One JSON object per snapshot

pub mod analyze;
pub mod battle;
pub mod bounded;
pub mod cohort;
pub mod config;
pub mod defines;
pub mod deployment;
pub mod fixed;
pub mod metrics;
pub mod observer;
pub mod profiling;
pub mod side;
pub mod systems;
pub mod testing;
pub mod unit;

pub use analyze::{
    start_analysis, AllRolls, AnalysisError, AnalysisHandle, AnalysisReport, AnalysisSnapshot,
    Analyzer, BranchWeighting, ReducedRolls, WinRateProgress,
};
pub use battle::{Battle, Outcome};
pub use bounded::BoundedFixed;
pub use cohort::{Cohort, CohortId, CohortProperties, CombatPhase};
pub use config::{CombatSettings, Performance, SettingsError};
pub use deployment::{build_battle, combat_width};
pub use fixed::Fixed;
pub use metrics::AnalysisMetrics;
pub use observer::{JsonLinesObserver, LogObserver, ObserverRegistry, ProgressObserver};
pub use side::{Side, SideKind};
pub use systems::{advance_round, retreat_side, run_battle, run_until, start_battle};
pub use unit::{
    ArmyDefinition, DiceSource, GeneralDefinition, SideDefinition, Tactic, Terrain, UnitCatalog,
    UnitDefinition, UnitRole,
};
