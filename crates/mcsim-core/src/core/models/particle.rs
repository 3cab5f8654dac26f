use crate::core::geometry::Point;
use crate::core::species::{AtomData, SpeciesId};
use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};

/// Orientation-dependent dipole state of a particle.
///
/// The total moment is `direction * magnitude`; `permanent` is the body-fixed permanent moment
/// expressed in the lab frame, which induced-dipole relaxation adds to `alpha * field`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dipole {
    /// Unit vector along the total moment.
    pub direction: Point,
    /// Magnitude of the total moment in eÅ.
    pub magnitude: f64,
    /// Permanent moment vector in eÅ.
    pub permanent: Point,
}

impl Dipole {
    pub fn permanent(moment: Point) -> Self {
        let magnitude = moment.norm();
        let direction = if magnitude > 0.0 {
            moment / magnitude
        } else {
            Point::x()
        };
        Self {
            direction,
            magnitude,
            permanent: moment,
        }
    }

    #[inline]
    pub fn moment(&self) -> Point {
        self.direction * self.magnitude
    }

    /// Replaces the total moment, keeping the previous direction when the moment vanishes.
    pub fn set_moment(&mut self, moment: Point) {
        let magnitude = moment.norm();
        if magnitude > 0.0 {
            self.direction = moment / magnitude;
        }
        self.magnitude = magnitude;
    }

    pub fn rotate(&mut self, rotation: &Rotation3<f64>) {
        self.direction = rotation * self.direction;
        self.permanent = rotation * self.permanent;
    }
}

/// A single point particle. Particles are plain values and never own one another.
///
/// The serialized form doubles as the checkpoint record: species id, position and the dipole
/// state when present, in the order of the owning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: SpeciesId,
    pub pos: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dipole: Option<Dipole>,
}

/// Checkpoint record of one particle.
pub type ParticleRecord = Particle;

impl Particle {
    pub fn new(id: SpeciesId, pos: Point) -> Self {
        Self {
            id,
            pos,
            dipole: None,
        }
    }

    /// Creates a particle of the given species, attaching a dipole if the species carries one.
    pub fn from_species(atom: &AtomData, pos: Point) -> Self {
        let dipole = atom
            .carries_dipole()
            .then(|| Dipole::permanent(atom.permanent_dipole()));
        Self {
            id: atom.id,
            pos,
            dipole,
        }
    }

    pub fn with_dipole(mut self, dipole: Dipole) -> Self {
        self.dipole = Some(dipole);
        self
    }

    /// Total dipole moment vector, zero for particles without a dipole.
    #[inline]
    pub fn moment(&self) -> Point {
        self.dipole.map_or_else(Point::zeros, |d| d.moment())
    }

    /// Rotates the particle about its own center; only the dipole orientation changes.
    pub fn rotate(&mut self, rotation: &Rotation3<f64>) {
        if let Some(dipole) = self.dipole.as_mut() {
            dipole.rotate(rotation);
        }
    }
}
