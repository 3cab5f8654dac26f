use super::pair::{
    CombinedPotential, Coulomb, Cutoff, DebyeHuckel, DipoleDipole, DipoleDipoleReactionField,
    HardSphere, LennardJones, PairPotential,
};
use super::units;
use crate::core::species::AtomTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PotentialError {
    #[error("Invalid parameter '{parameter}' for potential '{potential}': {value}")]
    InvalidParameter {
        potential: &'static str,
        parameter: &'static str,
        value: f64,
    },
    #[error("At least one pair potential must be configured")]
    Empty,
}

/// Global constants every electrostatic term is parameterized from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Medium {
    /// Kelvin.
    pub temperature: f64,
    /// Relative permittivity of the solvent continuum.
    pub dielectric_constant: f64,
}

impl Medium {
    pub fn new(temperature: f64, dielectric_constant: f64) -> Self {
        Self {
            temperature,
            dielectric_constant,
        }
    }

    pub fn bjerrum_length(&self) -> f64 {
        units::bjerrum_length(self.temperature, self.dielectric_constant)
    }
}

/// One constituent of the composed pair potential as written in the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PotentialKind {
    Coulomb,
    #[serde(rename_all = "kebab-case")]
    DebyeHuckel {
        debye_length: f64,
    },
    LennardJones {
        epsilon: f64,
    },
    HardSphere,
    DipoleDipole,
    #[serde(rename_all = "kebab-case")]
    DipoleDipoleRf {
        rf_cutoff: f64,
        epsilon_rf: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialSpec {
    #[serde(flatten)]
    pub kind: PotentialKind,
    /// Optional spherical cutoff applied on top of the potential.
    #[serde(default)]
    pub cutoff: Option<f64>,
}

impl PotentialSpec {
    pub fn new(kind: PotentialKind) -> Self {
        Self { kind, cutoff: None }
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            PotentialKind::Coulomb => "coulomb",
            PotentialKind::DebyeHuckel { .. } => "debye-huckel",
            PotentialKind::LennardJones { .. } => "lennard-jones",
            PotentialKind::HardSphere => "hard-sphere",
            PotentialKind::DipoleDipole => "dipole-dipole",
            PotentialKind::DipoleDipoleRf { .. } => "dipole-dipole-rf",
        }
    }

    pub fn validate(&self) -> Result<(), PotentialError> {
        let potential = self.label();
        let positive = |parameter: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PotentialError::InvalidParameter {
                    potential,
                    parameter,
                    value,
                })
            }
        };
        match self.kind {
            PotentialKind::DebyeHuckel { debye_length } => positive("debye-length", debye_length)?,
            PotentialKind::LennardJones { epsilon } => {
                if !epsilon.is_finite() || epsilon < 0.0 {
                    return Err(PotentialError::InvalidParameter {
                        potential,
                        parameter: "epsilon",
                        value: epsilon,
                    });
                }
            }
            PotentialKind::DipoleDipoleRf {
                rf_cutoff,
                epsilon_rf,
            } => {
                positive("rf-cutoff", rf_cutoff)?;
                positive("epsilon-rf", epsilon_rf)?;
            }
            PotentialKind::Coulomb | PotentialKind::HardSphere | PotentialKind::DipoleDipole => {}
        }
        if let Some(cutoff) = self.cutoff {
            positive("cutoff", cutoff)?;
        }
        Ok(())
    }

    /// Instantiates the potential with per-species tables precomputed from `table`.
    pub fn build(
        &self,
        table: &AtomTable,
        medium: &Medium,
    ) -> Result<Box<dyn PairPotential>, PotentialError> {
        self.validate()?;
        let lb = medium.bjerrum_length();
        let potential: Box<dyn PairPotential> = match self.kind {
            PotentialKind::Coulomb => Box::new(Coulomb::new(table, lb)),
            PotentialKind::DebyeHuckel { debye_length } => {
                Box::new(DebyeHuckel::new(table, lb, debye_length))
            }
            PotentialKind::LennardJones { epsilon } => Box::new(LennardJones::new(table, epsilon)),
            PotentialKind::HardSphere => Box::new(HardSphere::new(table)),
            PotentialKind::DipoleDipole => Box::new(DipoleDipole::new(lb)),
            PotentialKind::DipoleDipoleRf {
                rf_cutoff,
                epsilon_rf,
            } => Box::new(DipoleDipoleReactionField::new(lb, rf_cutoff, epsilon_rf)),
        };
        Ok(match self.cutoff {
            Some(cutoff) => Box::new(Cutoff::new(potential, cutoff)),
            None => potential,
        })
    }
}

/// Builds the ordered composite of all configured constituents.
pub fn build_potential(
    specs: &[PotentialSpec],
    table: &AtomTable,
    medium: &Medium,
) -> Result<CombinedPotential, PotentialError> {
    if specs.is_empty() {
        return Err(PotentialError::Empty);
    }
    let mut combined = CombinedPotential::new();
    for spec in specs {
        combined.push(spec.build(table, medium)?);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;
    use crate::core::models::particle::{Dipole, Particle};
    use crate::core::species::{AtomData, SpeciesId};

    #[derive(Deserialize)]
    struct Wrapper {
        potential: Vec<PotentialSpec>,
    }

    fn table() -> AtomTable {
        let mut a = AtomData::new("Na");
        a.charge = 1.0;
        a.sigma = 2.0;
        let mut b = AtomData::new("Cl");
        b.charge = -1.0;
        b.sigma = 4.0;
        AtomTable::from_atoms([a, b]).unwrap()
    }

    #[test]
    fn potentials_deserialize_from_kebab_case_toml() {
        let text = r#"
            [[potential]]
            kind = "lennard-jones"
            epsilon = 0.2

            [[potential]]
            kind = "debye-huckel"
            debye-length = 10.0
            cutoff = 30.0

            [[potential]]
            kind = "dipole-dipole-rf"
            rf-cutoff = 12.0
            epsilon-rf = 80.0
        "#;
        let parsed: Wrapper = toml::from_str(text).unwrap();
        assert_eq!(
            parsed.potential[0],
            PotentialSpec::new(PotentialKind::LennardJones { epsilon: 0.2 })
        );
        assert_eq!(parsed.potential[1].cutoff, Some(30.0));
        assert_eq!(
            parsed.potential[2].kind,
            PotentialKind::DipoleDipoleRf {
                rf_cutoff: 12.0,
                epsilon_rf: 80.0
            }
        );
    }

    #[test]
    fn build_rejects_non_positive_parameters() {
        let table = table();
        let medium = Medium::new(298.15, 78.5);
        let bad = PotentialSpec::new(PotentialKind::DebyeHuckel { debye_length: 0.0 });
        assert!(matches!(
            bad.build(&table, &medium),
            Err(PotentialError::InvalidParameter {
                parameter: "debye-length",
                ..
            })
        ));
        let bad = PotentialSpec::new(PotentialKind::Coulomb).with_cutoff(-1.0);
        assert!(bad.validate().is_err());
        assert_eq!(
            build_potential(&[], &table, &medium).unwrap_err(),
            PotentialError::Empty
        );
    }

    #[test]
    fn built_potential_uses_bjerrum_length_of_medium() {
        let table = table();
        let medium = Medium::new(298.15, 80.0);
        let combined =
            build_potential(&[PotentialSpec::new(PotentialKind::Coulomb)], &table, &medium)
                .unwrap();
        let a = Particle::new(SpeciesId::new(0), Point::zeros());
        let b = Particle::new(SpeciesId::new(1), Point::zeros());
        let u = combined.energy(&a, &b, &Point::new(medium.bjerrum_length(), 0.0, 0.0));
        assert!((u + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cutoff_spec_wraps_constituent() {
        let table = table();
        let medium = Medium::new(298.15, 80.0);
        let spec = PotentialSpec::new(PotentialKind::DipoleDipole).with_cutoff(5.0);
        let potential = spec.build(&table, &medium).unwrap();
        let p = Particle::new(SpeciesId::new(0), Point::zeros())
            .with_dipole(Dipole::permanent(Point::x()));
        assert_eq!(potential.energy(&p, &p, &Point::new(5.0, 0.0, 0.0)), 0.0);
        assert!(potential.energy(&p, &p, &Point::new(4.0, 0.0, 0.0)) < 0.0);
    }
}
