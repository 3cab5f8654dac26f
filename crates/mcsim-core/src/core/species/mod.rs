//! # Species Module
//!
//! Per-species parameters and their lookup table.
//!
//! Each species (an atom kind or coarse-grained bead) is described once by an
//! [`atom::AtomData`] record and identified everywhere else by a compact
//! [`atom::SpeciesId`]. The [`table::AtomTable`] owns all records, resolves names (including
//! the `"*"` wildcard) and is passed explicitly to every component that needs species data.

pub mod atom;
pub mod table;

pub use atom::{AtomData, SpeciesId};
pub use table::{AtomTable, SpeciesError, WILDCARD};
