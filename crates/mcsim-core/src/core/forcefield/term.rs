use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Energies of one part of the system before and after a proposed move, in kT.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyChange {
    pub old: f64,
    pub new: f64,
}

impl EnergyChange {
    pub fn new(old: f64, new: f64) -> Self {
        Self { old, new }
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.new - self.old
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.old.is_finite() && self.new.is_finite()
    }
}

impl From<EnergyChange> for (f64, f64) {
    fn from(change: EnergyChange) -> Self {
        (change.old, change.new)
    }
}

impl Add for EnergyChange {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            old: self.old + rhs.old,
            new: self.new + rhs.new,
        }
    }
}

impl AddAssign for EnergyChange {
    fn add_assign(&mut self, rhs: Self) {
        self.old += rhs.old;
        self.new += rhs.new;
    }
}

impl Sum for EnergyChange {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_new_minus_old() {
        assert_eq!(EnergyChange::new(1.5, -0.5).delta(), -2.0);
    }

    #[test]
    fn add_and_add_assign_sum_each_side() {
        let a = EnergyChange::new(1.0, 2.0);
        let b = EnergyChange::new(3.0, 5.0);
        assert_eq!(a + b, EnergyChange::new(4.0, 7.0));
        let mut c = a;
        c += b;
        assert_eq!(c, EnergyChange::new(4.0, 7.0));
    }

    #[test]
    fn sum_of_empty_iterator_is_zero() {
        let total: EnergyChange = std::iter::empty().sum();
        assert_eq!(total, EnergyChange::default());
        let total: EnergyChange = [EnergyChange::new(1.0, 1.0), EnergyChange::new(0.5, 2.0)]
            .into_iter()
            .sum();
        assert_eq!(<(f64, f64)>::from(total), (1.5, 3.0));
    }

    #[test]
    fn non_finite_sides_are_detected() {
        assert!(EnergyChange::new(0.0, 1.0).is_finite());
        assert!(!EnergyChange::new(0.0, f64::NAN).is_finite());
        assert!(!EnergyChange::new(f64::INFINITY, 0.0).is_finite());
    }
}
