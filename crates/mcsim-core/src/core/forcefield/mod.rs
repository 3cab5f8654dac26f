//! # Force Field Module
//!
//! Pure pair interactions between particles, expressed in thermal units (kT).
//!
//! ## Overview
//!
//! Every potential implements [`pair::PairPotential`]: a side-effect-free function of two
//! particles and their minimum-image separation. Potentials are parameterized once from the
//! species table and the [`params::Medium`] (temperature and dielectric constant) and are
//! immutable afterwards, so they can be shared across threads and sampled without a space.
//!
//! ## Key Components
//!
//! - [`pair`] - The `PairPotential` trait, concrete potentials and their ordered composite
//! - [`params`] - Serializable potential descriptions and construction from the species table
//! - [`term`] - Before/after energy pairs produced by the change evaluator
//! - [`units`] - Physical constants and the Bjerrum length
//!
//! ## Usage
//!
//! ```ignore
//! use mcsim::core::forcefield::params::{build_potential, Medium, PotentialKind, PotentialSpec};
//!
//! let medium = Medium::new(298.15, 78.5);
//! let potential = build_potential(
//!     &[PotentialSpec::new(PotentialKind::DipoleDipole)],
//!     &table,
//!     &medium,
//! )?;
//! let curve = pair::tabulate(&potential, &a, &b, 1.0, 10.0, 0.1);
//! ```

pub mod pair;
pub mod params;
pub(crate) mod potentials;
pub mod term;
pub mod units;
