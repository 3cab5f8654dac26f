//! # Workflows Module
//!
//! High-level entry points that assemble the engine into a runnable simulation.
//!
//! ## Overview
//!
//! A workflow takes a validated configuration, a species table and an initial space, builds
//! the potential, evaluator and moves, and then drives the Monte Carlo loop while reporting
//! progress and checking the tracked energy against full recomputations.
//!
//! ## Architecture
//!
//! - **Simulation Workflow** ([`simulate`]) - Weighted move selection inside macro/micro loops
//!   with drift checks at every macro boundary

pub mod simulate;
