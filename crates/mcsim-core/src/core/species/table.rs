use super::atom::{AtomData, SpeciesId};
use crate::core::geometry::Point;
use nalgebra::Matrix3;
use serde::Deserialize;
use std::collections::HashMap;
use std::ops::Index;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Name that selects every species in [`AtomTable::ids_of`].
pub const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("Species '{0}' not found in atom table")]
    UnknownSpecies(String),
    #[error("Species '{0}' is defined more than once")]
    DuplicateSpecies(String),
    #[error("Invalid parameter '{parameter}' for species '{species}': {reason}")]
    InvalidParameter {
        species: String,
        parameter: &'static str,
        reason: String,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Read-only species table shared by every component that needs per-species parameters.
///
/// The table is built once before a run and never mutated afterwards, so it can be shared
/// across threads and replicas behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    atoms: Vec<AtomData>,
    by_name: HashMap<String, SpeciesId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawAtomTable {
    #[serde(default)]
    atom: Vec<RawAtomData>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawAtomData {
    name: String,
    #[serde(default)]
    charge: f64,
    #[serde(default = "default_mass")]
    mass: f64,
    #[serde(default)]
    sigma: f64,
    #[serde(default)]
    activity: f64,
    #[serde(default)]
    dp: f64,
    #[serde(default)]
    dprot: f64,
    #[serde(default)]
    dipole_moment: f64,
    dipole_direction: Option<[f64; 3]>,
    polarizability: Option<f64>,
    polarizability_tensor: Option<[[f64; 3]; 3]>,
}

fn default_mass() -> f64 {
    1.0
}

impl TryFrom<RawAtomData> for AtomData {
    type Error = SpeciesError;

    fn try_from(raw: RawAtomData) -> Result<Self, Self::Error> {
        let polarizability = match (raw.polarizability, raw.polarizability_tensor) {
            (Some(_), Some(_)) => {
                return Err(invalid(
                    &raw.name,
                    "polarizability",
                    "give either a scalar or a tensor, not both".to_string(),
                ));
            }
            (Some(alpha), None) => Matrix3::identity() * alpha,
            (None, Some(rows)) => Matrix3::from_fn(|i, j| rows[i][j]),
            (None, None) => Matrix3::zeros(),
        };
        let mut atom = AtomData::new(&raw.name);
        atom.charge = raw.charge;
        atom.mass = raw.mass;
        atom.sigma = raw.sigma;
        atom.activity = raw.activity;
        atom.dp = raw.dp;
        atom.dprot = raw.dprot;
        atom.dipole_moment = raw.dipole_moment;
        if let Some([x, y, z]) = raw.dipole_direction {
            atom.dipole_direction = Point::new(x, y, z);
        }
        atom.polarizability = polarizability;
        Ok(atom)
    }
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from records, assigning ids in order.
    pub fn from_atoms(atoms: impl IntoIterator<Item = AtomData>) -> Result<Self, SpeciesError> {
        let mut table = Self::new();
        for atom in atoms {
            table.push(atom)?;
        }
        Ok(table)
    }

    /// Validates and appends a record, returning its newly assigned id.
    pub fn push(&mut self, mut atom: AtomData) -> Result<SpeciesId, SpeciesError> {
        validate(&mut atom)?;
        if self.by_name.contains_key(&atom.name) {
            return Err(SpeciesError::DuplicateSpecies(atom.name));
        }
        let id = SpeciesId(self.atoms.len());
        atom.id = id;
        debug!(species = %atom.name, id = id.index(), "Registered species.");
        self.by_name.insert(atom.name.clone(), id);
        self.atoms.push(atom);
        Ok(id)
    }

    pub fn load(path: &Path) -> Result<Self, SpeciesError> {
        let content = std::fs::read_to_string(path).map_err(|e| SpeciesError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SpeciesError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, SpeciesError> {
        let raw: RawAtomTable = toml::from_str(content).map_err(|e| SpeciesError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        let atoms = raw
            .atom
            .into_iter()
            .map(AtomData::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_atoms(atoms)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&AtomData> {
        self.atoms.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtomData> {
        self.atoms.iter()
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        id.index() < self.atoms.len()
    }

    /// Exact name to id resolution.
    pub fn id_of(&self, name: &str) -> Result<SpeciesId, SpeciesError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SpeciesError::UnknownSpecies(name.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Result<&AtomData, SpeciesError> {
        self.id_of(name).map(|id| &self[id])
    }

    /// Resolves a list of names in order.
    ///
    /// Reaching the [`WILDCARD`] selects all species; names listed before it must still exist.
    pub fn ids_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<SpeciesId>, SpeciesError> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if name == WILDCARD {
                return Ok((0..self.atoms.len()).map(SpeciesId).collect());
            }
            ids.push(self.id_of(name)?);
        }
        Ok(ids)
    }
}

impl Index<SpeciesId> for AtomTable {
    type Output = AtomData;

    fn index(&self, id: SpeciesId) -> &Self::Output {
        &self.atoms[id.index()]
    }
}

fn invalid(species: &str, parameter: &'static str, reason: String) -> SpeciesError {
    SpeciesError::InvalidParameter {
        species: species.to_string(),
        parameter,
        reason,
    }
}

fn validate(atom: &mut AtomData) -> Result<(), SpeciesError> {
    if atom.name.is_empty() || atom.name == WILDCARD {
        return Err(invalid(
            &atom.name,
            "name",
            "must be non-empty and differ from the wildcard".to_string(),
        ));
    }
    let non_negative = [
        ("sigma", atom.sigma),
        ("activity", atom.activity),
        ("dp", atom.dp),
        ("dprot", atom.dprot),
        ("dipole-moment", atom.dipole_moment),
    ];
    for (parameter, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(
                &atom.name,
                parameter,
                format!("must be finite and non-negative, got {value}"),
            ));
        }
    }
    if !atom.charge.is_finite() {
        return Err(invalid(&atom.name, "charge", "must be finite".to_string()));
    }
    if !atom.mass.is_finite() || atom.mass <= 0.0 {
        return Err(invalid(
            &atom.name,
            "mass",
            format!("must be positive, got {}", atom.mass),
        ));
    }
    if atom.polarizability.iter().any(|a| !a.is_finite()) {
        return Err(invalid(
            &atom.name,
            "polarizability",
            "must be finite".to_string(),
        ));
    }
    let norm = atom.dipole_direction.norm();
    if !norm.is_finite() || norm == 0.0 {
        return Err(invalid(
            &atom.name,
            "dipole-direction",
            "must be a non-zero vector".to_string(),
        ));
    }
    atom.dipole_direction /= norm;
    Ok(())
}
