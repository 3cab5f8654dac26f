use super::nonbonded::TouchedPairPolicy;
use super::polarization::PolarizationParams;
use crate::core::forcefield::params::{Medium, PotentialError, PotentialSpec};
use crate::core::geometry::{Geometry, GeometryError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
    #[error("Invalid potential: {0}")]
    Potential(#[from] PotentialError),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.into(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GeometrySpec {
    Cuboid { len: [f64; 3] },
    Cube { side: f64 },
    Sphere { radius: f64 },
    Open,
}

impl GeometrySpec {
    pub fn build(&self) -> Result<Geometry, GeometryError> {
        match *self {
            Self::Cuboid { len: [x, y, z] } => Geometry::cuboid(x, y, z),
            Self::Cube { side } => Geometry::cube(side),
            Self::Sphere { radius } => Geometry::sphere(radius),
            Self::Open => Ok(Geometry::Open),
        }
    }
}

/// Group of identical atomic particles placed at random when no checkpoint is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    pub species: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MoveKind {
    Translate {
        /// Displacement parameter overriding the species table, in ångström.
        #[serde(default)]
        dp: Option<f64>,
        /// Per-axis mask applied to the displacement.
        #[serde(default)]
        direction: Option<[f64; 3]>,
    },
    Rotate {
        /// Maximum angle overriding the species table, in degrees.
        #[serde(default)]
        dprot: Option<f64>,
    },
    InsertDelete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSpec {
    #[serde(flatten)]
    pub kind: MoveKind,
    /// Name of the target group.
    pub group: String,
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Attempts per invocation; the target group size when absent.
    #[serde(default)]
    pub repeat: Option<usize>,
    /// Relax induced dipoles after each proposal.
    #[serde(default)]
    pub polarize: bool,
}

fn default_weight() -> f64 {
    1.0
}

impl MoveSpec {
    pub fn new(kind: MoveKind, group: &str) -> Self {
        Self {
            kind,
            group: group.to_string(),
            weight: default_weight(),
            repeat: None,
            polarize: false,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn polarized(mut self) -> Self {
        self.polarize = true;
        self
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let name = |field: &str| format!("move[{index}].{field}");
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(invalid(name("weight"), "must be finite and non-negative"));
        }
        match self.kind {
            MoveKind::Translate { dp: Some(dp), .. } if !(dp.is_finite() && dp > 0.0) => {
                Err(invalid(name("dp"), "step size must be positive"))
            }
            MoveKind::Rotate { dprot: Some(a), .. } if !(a.is_finite() && a > 0.0) => {
                Err(invalid(name("dprot"), "step size must be positive"))
            }
            MoveKind::Translate {
                direction: Some(d), ..
            } if d.iter().any(|c| !c.is_finite()) || d.iter().all(|&c| c == 0.0) => {
                Err(invalid(name("direction"), "must be finite and not all zero"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LoopConfig {
    pub macro_steps: usize,
    pub micro_steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DriftConfig {
    /// Largest tolerated absolute drift, in kT.
    #[serde(default = "default_drift_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub rebaseline: bool,
}

fn default_drift_tolerance() -> f64 {
    1e-6
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            tolerance: default_drift_tolerance(),
            rebaseline: false,
        }
    }
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub medium: Medium,
    pub geometry: GeometrySpec,
    pub potentials: Vec<PotentialSpec>,
    pub pair_policy: TouchedPairPolicy,
    pub groups: Vec<GroupSpec>,
    pub moves: Vec<MoveSpec>,
    pub mc_loop: LoopConfig,
    pub drift: DriftConfig,
    pub polarization: Option<PolarizationParams>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawConfig {
    temperature: Option<f64>,
    dielectric_constant: Option<f64>,
    geometry: Option<GeometrySpec>,
    #[serde(default)]
    potential: Vec<PotentialSpec>,
    pair_policy: Option<TouchedPairPolicy>,
    #[serde(default)]
    group: Vec<GroupSpec>,
    #[serde(default, rename = "move")]
    moves: Vec<MoveSpec>,
    #[serde(rename = "loop")]
    mc_loop: Option<LoopConfig>,
    drift: Option<DriftConfig>,
    polarization: Option<PolarizationParams>,
    seed: Option<u64>,
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut builder = SimulationConfigBuilder::new()
            .potentials(raw.potential)
            .groups(raw.group)
            .moves(raw.moves);
        if let Some(t) = raw.temperature {
            builder = builder.temperature(t);
        }
        if let Some(e) = raw.dielectric_constant {
            builder = builder.dielectric_constant(e);
        }
        if let Some(g) = raw.geometry {
            builder = builder.geometry(g);
        }
        if let Some(p) = raw.pair_policy {
            builder = builder.pair_policy(p);
        }
        if let Some(l) = raw.mc_loop {
            builder = builder.mc_loop(l.macro_steps, l.micro_steps);
        }
        if let Some(d) = raw.drift {
            builder = builder.drift(d);
        }
        if let Some(p) = raw.polarization {
            builder = builder.polarization(p);
        }
        if let Some(s) = raw.seed {
            builder = builder.seed(s);
        }
        builder.build()
    }

    /// Group layout as `(name, particle count)` pairs, used to rebuild a space from records.
    pub fn layout(&self) -> Vec<(String, usize)> {
        self.groups
            .iter()
            .map(|g| (g.name.clone(), g.count))
            .collect()
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    temperature: Option<f64>,
    dielectric_constant: Option<f64>,
    geometry: Option<GeometrySpec>,
    potentials: Vec<PotentialSpec>,
    pair_policy: TouchedPairPolicy,
    groups: Vec<GroupSpec>,
    moves: Vec<MoveSpec>,
    mc_loop: Option<LoopConfig>,
    drift: DriftConfig,
    polarization: Option<PolarizationParams>,
    seed: Option<u64>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn dielectric_constant(mut self, epsilon_r: f64) -> Self {
        self.dielectric_constant = Some(epsilon_r);
        self
    }
    pub fn geometry(mut self, geometry: GeometrySpec) -> Self {
        self.geometry = Some(geometry);
        self
    }
    pub fn potential(mut self, potential: PotentialSpec) -> Self {
        self.potentials.push(potential);
        self
    }
    pub fn potentials(mut self, potentials: Vec<PotentialSpec>) -> Self {
        self.potentials = potentials;
        self
    }
    pub fn pair_policy(mut self, policy: TouchedPairPolicy) -> Self {
        self.pair_policy = policy;
        self
    }
    pub fn group(mut self, name: &str, species: &str, count: usize) -> Self {
        self.groups.push(GroupSpec {
            name: name.to_string(),
            species: species.to_string(),
            count,
        });
        self
    }
    pub fn groups(mut self, groups: Vec<GroupSpec>) -> Self {
        self.groups = groups;
        self
    }
    pub fn add_move(mut self, spec: MoveSpec) -> Self {
        self.moves.push(spec);
        self
    }
    pub fn moves(mut self, moves: Vec<MoveSpec>) -> Self {
        self.moves = moves;
        self
    }
    pub fn mc_loop(mut self, macro_steps: usize, micro_steps: usize) -> Self {
        self.mc_loop = Some(LoopConfig {
            macro_steps,
            micro_steps,
        });
        self
    }
    pub fn drift(mut self, drift: DriftConfig) -> Self {
        self.drift = drift;
        self
    }
    pub fn polarization(mut self, params: PolarizationParams) -> Self {
        self.polarization = Some(params);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(invalid("temperature", "must be positive"));
        }
        let dielectric_constant = self
            .dielectric_constant
            .ok_or(ConfigError::MissingParameter("dielectric-constant"))?;
        if !(dielectric_constant.is_finite() && dielectric_constant > 0.0) {
            return Err(invalid("dielectric-constant", "must be positive"));
        }
        let geometry = self
            .geometry
            .ok_or(ConfigError::MissingParameter("geometry"))?;
        geometry
            .build()
            .map_err(|e| invalid("geometry", e.to_string()))?;

        if self.potentials.is_empty() {
            return Err(ConfigError::MissingParameter("potential"));
        }
        for potential in &self.potentials {
            potential.validate()?;
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(invalid(
                    format!("group.{}", group.name),
                    "group names must be unique",
                ));
            }
        }

        if self.moves.is_empty() {
            return Err(ConfigError::MissingParameter("move"));
        }
        for (i, spec) in self.moves.iter().enumerate() {
            spec.validate(i)?;
        }
        if self.moves.iter().all(|m| m.weight == 0.0) {
            return Err(invalid("move.weight", "at least one move needs a positive weight"));
        }

        let mc_loop = self.mc_loop.ok_or(ConfigError::MissingParameter("loop"))?;
        if !(self.drift.tolerance >= 0.0) {
            return Err(invalid("drift.tolerance", "must be non-negative"));
        }
        if let Some(p) = &self.polarization {
            if !(p.tolerance.is_finite() && p.tolerance > 0.0) || p.max_iterations == 0 {
                return Err(invalid(
                    "polarization",
                    "tolerance and max-iterations must be positive",
                ));
            }
        }

        Ok(SimulationConfig {
            medium: Medium::new(temperature, dielectric_constant),
            geometry,
            potentials: self.potentials,
            pair_policy: self.pair_policy,
            groups: self.groups,
            moves: self.moves,
            mc_loop,
            drift: self.drift,
            polarization: self.polarization,
            seed: self.seed,
        })
    }
}
