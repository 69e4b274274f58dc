//! A framework for distributed, population-based stochastic optimization.
//!
//! A single coordinator (the [`server`]) holds a small elite population of
//! candidate solutions; many worker processes (the [`node`] loop) each
//! refine individuals locally and stream improvements back. Problems plug
//! in through the [`individual::Individual`] trait; the search policy is
//! one of eleven strategies in [`strategy`].

#![allow(clippy::too_many_arguments)]

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod individual;
pub mod node;
pub mod population;
pub mod random;
pub mod server;
pub mod strategy;
pub mod transport;

pub use individual::Individual;
pub use random::Random;
