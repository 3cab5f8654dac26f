//! # mcsim Core Library
//!
//! The Metropolis Monte Carlo core of a molecular statistical-mechanics toolkit. It proposes
//! elementary perturbations to a many-particle configuration, evaluates the resulting energy
//! change incrementally, and accepts or rejects each perturbation so that the chain of
//! configurations samples the canonical ensemble.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Immutable species data (`AtomTable`), boundary-aware
//!   `Geometry`, the particle/group data model with its current/trial `Space`, and the pure
//!   pair potentials that can be evaluated without any simulation state.
//!
//! - **[`engine`]: The Logic Core.** The stateful machinery: the change-scoped `Nonbonded`
//!   evaluator, the Monte Carlo moves and their Metropolis state machine, induced dipole
//!   relaxation, the `EnergyDrift` ledger and the `McLoop` counters.
//!
//! - **[`workflows`]: The Public API.** Ties the engine together into a runnable
//!   [`workflows::simulate::Simulation`] with weighted move selection, periodic drift checks
//!   and progress reporting.

pub mod core;
pub mod engine;
pub mod workflows;
