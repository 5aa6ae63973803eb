//! deckopt engine
//!
//! Leave-one-out deck optimization against a remote battle simulator. The
//! simulator is an opaque oracle reached through the [`PageContext`] seam; this
//! crate owns deck hash slicing, retrying page loads, bounded concurrent
//! batches and win-rate aggregation, and knows nothing about browsers.

pub mod client;
pub mod codec;
pub mod naming;
pub mod optimizer;
pub mod outcome;
pub mod runner;
pub mod scenario;
pub mod stub;

// Re-export commonly used types
pub use client::{ClientConfig, OraclePage, PageContext, SimulationClient};
pub use codec::{Deck, DeckLayout, Slot, Token};
pub use naming::{ComponentName, NameResolver, NameSource};
pub use optimizer::{
    Candidate, Direction, Impact, Mode, OptimizationReport, OptimizeError, OptimizeRequest,
    Optimizer, Preference, derive_candidates,
};
pub use outcome::{Averaging, SimRecord, WinRateSummary, parse_win_rate};
pub use runner::{DEFAULT_CONCURRENCY, LogProgress, ProgressObserver, Runner, cross_pairs};
pub use scenario::{BattleMode, Scenario};
