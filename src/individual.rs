//! The capability set every optimized solution type must implement.
//!
//! `Individual` is deliberately thin: it knows how to randomize, mutate,
//! and score itself, and how to round-trip to a document for
//! checkpointing. Bookkeeping the framework itself is responsible for
//! (mutation-operator counters, "is this the new global best") is never
//! part of the trait — see [`crate::population::LocalPopulation::mutate_tracked`]
//! and [`crate::server::ServerElite::submit`].

use serde_json::Value;

use crate::error::EsError;
use crate::random::Random;

/// A problem-specific candidate solution.
///
/// Implementors must make `Clone` a true deep copy: mutating a clone must
/// never observably affect the original's `fitness` or document form.
pub trait Individual: Clone {
    /// Puts the individual into a uniformly-sampled, legal, unscored state.
    fn randomize(&mut self, rng: &mut Random);

    /// Applies one mutation of the given operator kind.
    ///
    /// Returns [`EsError::UnknownMutationOp`] if `op` is outside the set
    /// this problem declares.
    fn mutate(&mut self, op: u32, rng: &mut Random) -> Result<(), EsError>;

    /// Recomputes and returns the primary (minimized) objective.
    fn fitness(&mut self) -> f64;

    /// Recomputes and returns the secondary objective, gated by callers on
    /// `fitness() < 0.01`. The default is a sentinel that is never mistaken
    /// for a real candidate value and performs no work.
    fn fitness2(&mut self) -> f64 {
        f64::INFINITY
    }

    /// Replaces search-relevant state with a server-provided snapshot. May
    /// preserve auxiliary learning state (e.g. mutation counters) that the
    /// server snapshot does not carry.
    fn accept_from_server(&mut self, other: &Self);

    /// Human-readable fitness; defaults to the last computed primary
    /// objective.
    fn actual_fitness(&self) -> f64;

    /// Called once per genuine global-best promotion at the server. Default
    /// is a no-op.
    fn on_new_best(&self) {}

    /// Serializes to a structured document (used for checkpointing).
    fn to_document(&self) -> Value;

    /// Restores state from a structured document produced by [`Individual::to_document`].
    fn from_document(&mut self, doc: &Value) -> Result<(), EsError>;
}
