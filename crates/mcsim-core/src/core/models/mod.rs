//! # Core Models Module
//!
//! The particle/space data model and its "current vs. trial" configuration discipline.
//!
//! ## Key Components
//!
//! - [`particle`] - Point particles with optional dipole state; also the checkpoint record
//! - [`group`] - Contiguous index ranges partitioning the particle array
//! - [`change`] - Move-scoped record of touched groups and particles
//! - [`space`] - The two-buffer configuration owner with commit/revert semantics
//!
//! ## Usage
//!
//! ```ignore
//! use mcsim::core::models::space::Space;
//!
//! let mut space = Space::builder(geometry)
//!     .add_random("salt", &table, na, 100, &mut rng)?
//!     .build(&table)?;
//!
//! space.trial_mut().group_particles_mut(0)[3].pos.x += 0.1;
//! space.accept(&change);
//! ```

pub mod change;
pub mod group;
pub mod particle;
pub mod space;
