use super::potentials;
use crate::core::geometry::Point;
use crate::core::models::particle::Particle;
use crate::core::species::AtomTable;
use std::fmt::Debug;

/// A pure pair interaction in thermal units.
///
/// Implementations are parameterized once at construction from the species table and global
/// constants and are immutable afterwards. Evaluation depends only on the two particles and
/// their separation, never on simulation state, so potentials can be sampled at synthetic
/// separations without a [`Space`](crate::core::models::space::Space).
pub trait PairPotential: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Energy (in kT) of particles `a` and `b` separated by `r`.
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64;

    /// Electric field (e/Å²) at offset `r` from `source`. Potentials that do not involve
    /// electrostatics contribute nothing.
    fn field(&self, _source: &Particle, _r: &Point) -> Point {
        Point::zeros()
    }
}

/// Dense symmetric lookup over species pairs.
#[derive(Debug, Clone)]
struct PairMatrix {
    n: usize,
    values: Vec<f64>,
}

impl PairMatrix {
    fn new(table: &AtomTable, f: impl Fn(usize, usize) -> f64) -> Self {
        let n = table.len();
        let values = (0..n * n).map(|k| f(k / n, k % n)).collect();
        Self { n, values }
    }

    #[inline]
    fn get(&self, a: &Particle, b: &Particle) -> f64 {
        self.values[a.id.index() * self.n + b.id.index()]
    }
}

fn charges(table: &AtomTable) -> Vec<f64> {
    table.iter().map(|a| a.charge).collect()
}

/// Plain Coulomb interaction `lB z_a z_b / r`.
#[derive(Debug, Clone)]
pub struct Coulomb {
    bjerrum_length: f64,
    charges: Vec<f64>,
}

impl Coulomb {
    pub fn new(table: &AtomTable, bjerrum_length: f64) -> Self {
        Self {
            bjerrum_length,
            charges: charges(table),
        }
    }
}

impl PairPotential for Coulomb {
    fn name(&self) -> &str {
        "coulomb"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        let zz = self.charges[a.id.index()] * self.charges[b.id.index()];
        if zz == 0.0 {
            return 0.0;
        }
        potentials::coulomb(r.norm(), zz, self.bjerrum_length)
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        potentials::charge_field(self.charges[source.id.index()], r)
    }
}

/// Screened Coulomb interaction `lB z_a z_b exp(-r/λD) / r`.
#[derive(Debug, Clone)]
pub struct DebyeHuckel {
    bjerrum_length: f64,
    kappa: f64,
    charges: Vec<f64>,
}

impl DebyeHuckel {
    pub fn new(table: &AtomTable, bjerrum_length: f64, debye_length: f64) -> Self {
        Self {
            bjerrum_length,
            kappa: 1.0 / debye_length,
            charges: charges(table),
        }
    }

    pub fn debye_length(&self) -> f64 {
        1.0 / self.kappa
    }
}

impl PairPotential for DebyeHuckel {
    fn name(&self) -> &str {
        "debye-huckel"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        let zz = self.charges[a.id.index()] * self.charges[b.id.index()];
        if zz == 0.0 {
            return 0.0;
        }
        potentials::debye_huckel(r.norm(), zz, self.bjerrum_length, self.kappa)
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        let dist = r.norm();
        potentials::charge_field(self.charges[source.id.index()], r)
            * ((1.0 + self.kappa * dist) * (-self.kappa * dist).exp())
    }
}

/// Lennard-Jones interaction with Lorentz mixing of species diameters and a global well depth.
#[derive(Debug, Clone)]
pub struct LennardJones {
    epsilon: f64,
    sigma_sq: PairMatrix,
}

impl LennardJones {
    /// `epsilon` is the well depth in kT.
    pub fn new(table: &AtomTable, epsilon: f64) -> Self {
        let sigmas: Vec<f64> = table.iter().map(|a| a.sigma).collect();
        Self {
            epsilon,
            sigma_sq: PairMatrix::new(table, |i, j| (0.5 * (sigmas[i] + sigmas[j])).powi(2)),
        }
    }
}

impl PairPotential for LennardJones {
    fn name(&self) -> &str {
        "lennard-jones"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        let sigma_sq = self.sigma_sq.get(a, b);
        if sigma_sq == 0.0 {
            return 0.0;
        }
        potentials::lennard_jones(r.norm_squared(), sigma_sq, self.epsilon)
    }
}

/// Hard-sphere overlap: infinite below contact distance, exactly zero otherwise.
#[derive(Debug, Clone)]
pub struct HardSphere {
    contact_sq: PairMatrix,
}

impl HardSphere {
    pub fn new(table: &AtomTable) -> Self {
        let radii: Vec<f64> = table.iter().map(|a| a.radius()).collect();
        Self {
            contact_sq: PairMatrix::new(table, |i, j| (radii[i] + radii[j]).powi(2)),
        }
    }
}

impl PairPotential for HardSphere {
    fn name(&self) -> &str {
        "hard-sphere"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        potentials::hard_sphere(r.norm_squared(), self.contact_sq.get(a, b))
    }
}

/// Point dipole-dipole interaction scaled by the Bjerrum length.
#[derive(Debug, Clone)]
pub struct DipoleDipole {
    bjerrum_length: f64,
}

impl DipoleDipole {
    pub fn new(bjerrum_length: f64) -> Self {
        Self { bjerrum_length }
    }

    pub fn bjerrum_length(&self) -> f64 {
        self.bjerrum_length
    }
}

impl PairPotential for DipoleDipole {
    fn name(&self) -> &str {
        "dipole-dipole"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        match (&a.dipole, &b.dipole) {
            (Some(da), Some(db)) => {
                self.bjerrum_length
                    * potentials::dipole_dipole(
                        &da.direction,
                        &db.direction,
                        da.magnitude * db.magnitude,
                        r,
                    )
            }
            _ => 0.0,
        }
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        match &source.dipole {
            Some(d) => potentials::dipole_field(&d.moment(), r),
            None => Point::zeros(),
        }
    }
}

/// Dipole-dipole interaction with a spherical cutoff and a reaction field.
///
/// Inside the cutoff the plain dipole-dipole energy is corrected by
/// `-lB * 2(εRF-1)/(εRF+1) / rc³ * (mu_a·mu_b)`; beyond the cutoff the energy is exactly zero.
#[derive(Debug, Clone)]
pub struct DipoleDipoleReactionField {
    dipole: DipoleDipole,
    cutoff_sq: f64,
    reaction_field: f64,
}

impl DipoleDipoleReactionField {
    pub fn new(bjerrum_length: f64, cutoff: f64, epsilon_rf: f64) -> Self {
        let reaction_field = if cutoff.is_finite() {
            2.0 * (epsilon_rf - 1.0) / (epsilon_rf + 1.0) / cutoff.powi(3)
        } else {
            0.0
        };
        Self {
            dipole: DipoleDipole::new(bjerrum_length),
            cutoff_sq: cutoff * cutoff,
            reaction_field,
        }
    }
}

impl PairPotential for DipoleDipoleReactionField {
    fn name(&self) -> &str {
        "dipole-dipole-rf"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        if r.norm_squared() >= self.cutoff_sq {
            return 0.0;
        }
        match (&a.dipole, &b.dipole) {
            (Some(da), Some(db)) => {
                self.dipole.energy(a, b, r)
                    - self.dipole.bjerrum_length
                        * self.reaction_field
                        * da.direction.dot(&db.direction)
                        * da.magnitude
                        * db.magnitude
            }
            _ => 0.0,
        }
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        if r.norm_squared() >= self.cutoff_sq {
            return Point::zeros();
        }
        match &source.dipole {
            Some(d) => {
                let moment = d.moment();
                potentials::dipole_field(&moment, r) + moment * self.reaction_field
            }
            None => Point::zeros(),
        }
    }
}

/// Restricts any potential to a spherical cutoff; beyond it the energy is exactly zero.
#[derive(Debug)]
pub struct Cutoff {
    inner: Box<dyn PairPotential>,
    cutoff_sq: f64,
    name: String,
}

impl Cutoff {
    pub fn new(inner: Box<dyn PairPotential>, cutoff: f64) -> Self {
        let name = format!("{} (cutoff {})", inner.name(), cutoff);
        Self {
            inner,
            cutoff_sq: cutoff * cutoff,
            name,
        }
    }
}

impl PairPotential for Cutoff {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        if r.norm_squared() < self.cutoff_sq {
            self.inner.energy(a, b, r)
        } else {
            0.0
        }
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        if r.norm_squared() < self.cutoff_sq {
            self.inner.field(source, r)
        } else {
            Point::zeros()
        }
    }
}

/// Ordered sum of constituent potentials evaluated at the same inputs.
#[derive(Debug, Default)]
pub struct CombinedPotential {
    terms: Vec<Box<dyn PairPotential>>,
}

impl CombinedPotential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, term: impl PairPotential + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    pub fn push(&mut self, term: Box<dyn PairPotential>) {
        self.terms.push(term);
    }

    pub fn constituents(&self) -> &[Box<dyn PairPotential>] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn describe(&self) -> String {
        self.terms.iter().map(|t| t.name()).collect::<Vec<_>>().join(" + ")
    }
}

impl PairPotential for CombinedPotential {
    fn name(&self) -> &str {
        "combined"
    }

    #[inline]
    fn energy(&self, a: &Particle, b: &Particle, r: &Point) -> f64 {
        self.terms.iter().map(|t| t.energy(a, b, r)).sum()
    }

    fn field(&self, source: &Particle, r: &Point) -> Point {
        self.terms
            .iter()
            .fold(Point::zeros(), |acc, t| acc + t.field(source, r))
    }
}

/// Samples `potential` for a synthetic pair separated along the x axis.
///
/// Returns `(r, u(r))` for `r` from `r_min` up to and including `r_max` in steps of `dr`.
pub fn tabulate(
    potential: &dyn PairPotential,
    a: &Particle,
    b: &Particle,
    r_min: f64,
    r_max: f64,
    dr: f64,
) -> Vec<(f64, f64)> {
    if dr <= 0.0 || r_max < r_min {
        return Vec::new();
    }
    let steps = ((r_max - r_min) / dr + 1e-9).floor() as usize;
    (0..=steps)
        .map(|i| {
            let r = r_min + i as f64 * dr;
            (r, potential.energy(a, b, &Point::new(r, 0.0, 0.0)))
        })
        .collect()
}
