use std::f64::consts::PI;

pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19; // C
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12; // C²/(J·m)
pub const BOLTZMANN_CONSTANT: f64 = 1.380_649e-23; // J/K
pub const AVOGADRO_CONSTANT: f64 = 6.022_140_76e23; // 1/mol

const ANGSTROM_PER_METER: f64 = 1e10;
const CUBIC_ANGSTROM_PER_LITER: f64 = 1e27;

/// Bjerrum length in ångström: the separation at which two unit charges interact with `kT`.
pub fn bjerrum_length(temperature: f64, dielectric_constant: f64) -> f64 {
    ELEMENTARY_CHARGE * ELEMENTARY_CHARGE
        / (4.0 * PI * VACUUM_PERMITTIVITY * dielectric_constant * BOLTZMANN_CONSTANT * temperature)
        * ANGSTROM_PER_METER
}

/// Converts a concentration in mol/l to a number density in Å⁻³.
pub fn molar_to_number_density(molar: f64) -> f64 {
    molar * AVOGADRO_CONSTANT / CUBIC_ANGSTROM_PER_LITER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bjerrum_length_of_water_at_room_temperature_is_about_seven_angstrom() {
        let lb = bjerrum_length(298.15, 80.0);
        assert!((lb - 7.006).abs() < 0.01, "lB = {lb}");
    }

    #[test]
    fn bjerrum_length_scales_inversely_with_dielectric_constant() {
        let ratio = bjerrum_length(300.0, 2.0) / bjerrum_length(300.0, 4.0);
        assert!((ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn one_molar_is_about_six_ten_thousandths_per_cubic_angstrom() {
        assert!((molar_to_number_density(1.0) - 6.022_140_76e-4).abs() < 1e-15);
    }
}
