//! # Core Module
//!
//! Stateless building blocks of the Monte Carlo core.
//!
//! ## Overview
//!
//! Everything in this module is either immutable after construction (species tables,
//! potentials, geometry) or a plain value type (particles, groups, changes). The only mutable
//! aggregate is [`models::space::Space`], which owns the current and trial configurations and
//! enforces the rule that outside an in-flight move both are identical.
//!
//! ## Architecture
//!
//! - **Boundary Conditions** ([`geometry`]) - Minimum-image distances, container volume and
//!   random positions for periodic cuboids, spheres and open space
//! - **Species Data** ([`species`]) - Per-species parameters and name to id lookup
//! - **Configuration Model** ([`models`]) - Particles, groups, changes and the two-buffer space
//! - **Interactions** ([`forcefield`]) - Composable pair potentials in thermal units
//!
//! ## Units
//!
//! Lengths are in ångström, charges in elementary charges and all energies returned by the
//! pair potentials are already divided by `kT`.

pub mod forcefield;
pub mod geometry;
pub mod models;
pub mod species;
