//! Utility functions for the engine module.
//!
//! Currently limited to weighted random selection of registered moves.

pub mod sampling;
