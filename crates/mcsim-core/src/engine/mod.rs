//! # Engine Module
//!
//! The stateful Monte Carlo machinery built on top of [`crate::core`].
//!
//! ## Overview
//!
//! A simulation repeatedly selects a move, lets it perturb the trial configuration, evaluates
//! only the energy that the perturbation can have changed and decides between committing and
//! reverting. Everything needed for that cycle lives here, together with the bookkeeping that
//! verifies the incremental energies against full recomputations.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated run parameters, loadable from TOML
//! - **Energy Evaluation** ([`nonbonded`]) - Whole-system and change-scoped pair energy sums
//! - **Moves** ([`moves`]) - Translation, rotation, grand canonical exchange, polarization
//!   wrapper and the Metropolis state machine shared by all of them
//! - **Induced Dipoles** ([`polarization`]) - Self-consistent relaxation of induced moments
//! - **Energy Ledger** ([`drift`]) - Accumulated energy changes and drift checks
//! - **Loop Control** ([`mcloop`]) - Macro/micro step counters, timing and cancellation
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-level error type

pub mod config;
pub mod drift;
pub mod error;
pub mod mcloop;
pub mod moves;
pub mod nonbonded;
pub mod polarization;
pub mod progress;
pub(crate) mod utils;
