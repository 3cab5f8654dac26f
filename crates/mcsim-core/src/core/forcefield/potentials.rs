use crate::core::geometry::Point;

#[inline]
pub fn coulomb(dist: f64, charge_product: f64, bjerrum_length: f64) -> f64 {
    bjerrum_length * charge_product / dist
}

#[inline]
pub fn debye_huckel(dist: f64, charge_product: f64, bjerrum_length: f64, kappa: f64) -> f64 {
    bjerrum_length * charge_product * (-kappa * dist).exp() / dist
}

#[inline]
pub fn lennard_jones(dist_sq: f64, sigma_sq: f64, epsilon: f64) -> f64 {
    let x3 = (sigma_sq / dist_sq).powi(3);
    4.0 * epsilon * (x3 * x3 - x3)
}

#[inline]
pub fn hard_sphere(dist_sq: f64, contact_sq: f64) -> f64 {
    if dist_sq < contact_sq {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Orientation-dependent dipole-dipole energy without prefactor.
///
/// `mu_a` and `mu_b` are unit directions, `magnitude_product` the product of the moment
/// magnitudes and `r` the separation vector. The result is
/// `m_a m_b / |r|^3 * (mu_a·mu_b - 3 (mu_a·r̂)(mu_b·r̂))`.
#[inline]
pub fn dipole_dipole(mu_a: &Point, mu_b: &Point, magnitude_product: f64, r: &Point) -> f64 {
    let r2_inv = 1.0 / r.norm_squared();
    let r1_inv = r2_inv.sqrt();
    let r3_inv = r1_inv * r2_inv;
    let rhat = r * r1_inv;
    magnitude_product * r3_inv * (mu_a.dot(mu_b) - 3.0 * mu_a.dot(&rhat) * mu_b.dot(&rhat))
}

/// Field at offset `r` from a point dipole with moment vector `moment`.
#[inline]
pub fn dipole_field(moment: &Point, r: &Point) -> Point {
    let r2_inv = 1.0 / r.norm_squared();
    let r1_inv = r2_inv.sqrt();
    let r3_inv = r1_inv * r2_inv;
    let rhat = r * r1_inv;
    (3.0 * moment.dot(&rhat) * rhat - moment) * r3_inv
}

/// Field at offset `r` from a point charge.
#[inline]
pub fn charge_field(charge: f64, r: &Point) -> Point {
    let r2 = r.norm_squared();
    r * (charge / (r2 * r2.sqrt()))
}
