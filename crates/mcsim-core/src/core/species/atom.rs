use crate::core::geometry::Point;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer identifier of a species in an [`AtomTable`](super::table::AtomTable).
///
/// Ids are assigned in insertion order when the table is built and never change for the
/// lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(pub(crate) usize);

impl SpeciesId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable per-species parameter record.
///
/// All fields are fixed once the owning table has been built; particles refer to a record only
/// through their [`SpeciesId`].
#[derive(Debug, Clone, PartialEq)]
pub struct AtomData {
    /// Unique species name used for lookup and reporting.
    pub name: String,
    /// Id assigned by the owning table.
    pub id: SpeciesId,
    /// Charge in elementary charges.
    pub charge: f64,
    /// Molecular weight in g/mol.
    pub mass: f64,
    /// Diameter used by size-dependent potentials, in ångström.
    pub sigma: f64,
    /// Chemical activity in mol/l; a positive value enables insertion and deletion.
    pub activity: f64,
    /// Translational displacement parameter in ångström. Zero freezes the species.
    pub dp: f64,
    /// Rotational displacement parameter in degrees. Zero freezes the orientation.
    pub dprot: f64,
    /// Magnitude of the permanent dipole moment in eÅ.
    pub dipole_moment: f64,
    /// Default unit direction of the permanent dipole for newly created particles.
    pub dipole_direction: Point,
    /// Polarizability tensor in Å³ mapping a local field onto an induced moment.
    pub polarizability: Matrix3<f64>,
}

impl AtomData {
    /// Creates a record with neutral defaults; the id is assigned when added to a table.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: SpeciesId(0),
            charge: 0.0,
            mass: 1.0,
            sigma: 0.0,
            activity: 0.0,
            dp: 0.0,
            dprot: 0.0,
            dipole_moment: 0.0,
            dipole_direction: Point::x(),
            polarizability: Matrix3::zeros(),
        }
    }

    pub fn radius(&self) -> f64 {
        0.5 * self.sigma
    }

    /// Permanent dipole moment vector for the default orientation.
    pub fn permanent_dipole(&self) -> Point {
        self.dipole_direction * self.dipole_moment
    }

    pub fn is_polarizable(&self) -> bool {
        self.polarizability.iter().any(|&a| a != 0.0)
    }

    pub fn carries_dipole(&self) -> bool {
        self.dipole_moment != 0.0 || self.is_polarizable()
    }
}
