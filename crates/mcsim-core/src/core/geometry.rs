use nalgebra::Vector3;
use rand::Rng;
use std::f64::consts::PI;
use thiserror::Error;

/// Cartesian position or separation vector in ångström.
pub type Point = Vector3<f64>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Geometry dimension '{name}' must be positive and finite, got {value}")]
    InvalidDimension { name: &'static str, value: f64 },
    #[error("Open geometry has no finite volume and cannot be rescaled or sampled")]
    Unbounded,
}

/// Boundary topology of the simulation container.
///
/// A `Geometry` holds nothing but its dimensions, so every query is referentially transparent
/// and may be issued concurrently for independent particle pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Periodic box centered at the origin with side lengths `len`.
    Cuboid { len: Point },
    /// Hard spherical container centered at the origin, no periodicity.
    Sphere { radius: f64 },
    /// Infinite space without boundaries.
    Open,
}

impl Geometry {
    pub fn cuboid(lx: f64, ly: f64, lz: f64) -> Result<Self, GeometryError> {
        check_dimension("lx", lx)?;
        check_dimension("ly", ly)?;
        check_dimension("lz", lz)?;
        Ok(Self::Cuboid {
            len: Point::new(lx, ly, lz),
        })
    }

    pub fn cube(side: f64) -> Result<Self, GeometryError> {
        Self::cuboid(side, side, side)
    }

    pub fn sphere(radius: f64) -> Result<Self, GeometryError> {
        check_dimension("radius", radius)?;
        Ok(Self::Sphere { radius })
    }

    /// Separation vector `a - b`, using the minimum image convention for periodic boxes.
    #[inline]
    pub fn vdist(&self, a: &Point, b: &Point) -> Point {
        let d = a - b;
        match self {
            Self::Cuboid { len } => minimum_image(d, len),
            Self::Sphere { .. } | Self::Open => d,
        }
    }

    #[inline]
    pub fn sqdist(&self, a: &Point, b: &Point) -> f64 {
        self.vdist(a, b).norm_squared()
    }

    #[inline]
    pub fn dist(&self, a: &Point, b: &Point) -> f64 {
        self.sqdist(a, b).sqrt()
    }

    /// Accessible volume in Å³; infinite for open space.
    pub fn volume(&self) -> f64 {
        match self {
            Self::Cuboid { len } => len.x * len.y * len.z,
            Self::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Self::Open => f64::INFINITY,
        }
    }

    /// Folds a position back into the primary cell. Only periodic boxes have an effect.
    #[inline]
    pub fn boundary(&self, p: &mut Point) {
        if let Self::Cuboid { len } = self {
            *p = minimum_image(*p, len);
        }
    }

    /// Returns `true` if the position lies outside the container.
    #[inline]
    pub fn collision(&self, p: &Point) -> bool {
        match self {
            Self::Cuboid { len } => {
                let half = len * 0.5;
                p.x.abs() > half.x || p.y.abs() > half.y || p.z.abs() > half.z
            }
            Self::Sphere { radius } => p.norm_squared() > radius * radius,
            Self::Open => false,
        }
    }

    /// Draws a position uniformly from the container.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Point, GeometryError> {
        match self {
            Self::Cuboid { len } => Ok(Point::new(
                (rng.r#gen::<f64>() - 0.5) * len.x,
                (rng.r#gen::<f64>() - 0.5) * len.y,
                (rng.r#gen::<f64>() - 0.5) * len.z,
            )),
            Self::Sphere { radius } => loop {
                let p = Point::new(
                    (2.0 * rng.r#gen::<f64>() - 1.0) * radius,
                    (2.0 * rng.r#gen::<f64>() - 1.0) * radius,
                    (2.0 * rng.r#gen::<f64>() - 1.0) * radius,
                );
                if p.norm_squared() <= radius * radius {
                    return Ok(p);
                }
            },
            Self::Open => Err(GeometryError::Unbounded),
        }
    }

    /// Returns a copy isotropically rescaled to `volume`.
    ///
    /// The stored dimensions of a live [`Space`](crate::core::models::space::Space) are only
    /// ever replaced at a commit boundary, never while an energy evaluation is in flight.
    pub fn with_volume(&self, volume: f64) -> Result<Self, GeometryError> {
        check_dimension("volume", volume)?;
        match self {
            Self::Cuboid { len } => {
                let scale = (volume / self.volume()).cbrt();
                Ok(Self::Cuboid { len: len * scale })
            }
            Self::Sphere { .. } => Self::sphere((3.0 * volume / (4.0 * PI)).cbrt()),
            Self::Open => Err(GeometryError::Unbounded),
        }
    }
}

#[inline]
fn minimum_image(d: Point, len: &Point) -> Point {
    Point::new(
        d.x - len.x * (d.x / len.x).round(),
        d.y - len.y * (d.y / len.y).round(),
        d.z - len.z * (d.z / len.z).round(),
    )
}

fn check_dimension(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidDimension { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-12;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn cuboid_vdist_applies_minimum_image() {
        let geo = Geometry::cube(10.0).unwrap();
        let d = geo.vdist(&Point::new(4.5, 0.0, 0.0), &Point::new(-4.5, 0.0, 0.0));
        assert!(approx_eq(d.x, -1.0));
        assert!(approx_eq(geo.dist(&Point::new(0.0, 4.0, 0.0), &Point::new(0.0, -4.0, 0.0)), 2.0));
    }

    #[test]
    fn open_and_sphere_vdist_are_plain_differences() {
        let a = Point::new(40.0, 0.0, 0.0);
        let b = Point::new(-40.0, 0.0, 0.0);
        assert!(approx_eq(Geometry::Open.vdist(&a, &b).x, 80.0));
        assert!(approx_eq(Geometry::sphere(50.0).unwrap().vdist(&a, &b).x, 80.0));
    }

    #[test]
    fn boundary_wraps_positions_into_primary_cell() {
        let geo = Geometry::cuboid(10.0, 20.0, 30.0).unwrap();
        let mut p = Point::new(6.0, -11.0, 14.0);
        geo.boundary(&mut p);
        assert!(approx_eq(p.x, -4.0));
        assert!(approx_eq(p.y, 9.0));
        assert!(approx_eq(p.z, 14.0));
        assert!(!geo.collision(&p));
    }

    #[test]
    fn sphere_collision_detects_points_outside_radius() {
        let geo = Geometry::sphere(5.0).unwrap();
        assert!(!geo.collision(&Point::new(3.0, 3.0, 0.0)));
        assert!(geo.collision(&Point::new(4.0, 4.0, 0.0)));
    }

    #[test]
    fn volume_matches_closed_form_expressions() {
        assert!(approx_eq(Geometry::cuboid(2.0, 3.0, 4.0).unwrap().volume(), 24.0));
        let sphere = Geometry::sphere(2.0).unwrap();
        assert!((sphere.volume() - 32.0 / 3.0 * PI).abs() < 1e-9);
        assert!(Geometry::Open.volume().is_infinite());
    }

    #[test]
    fn with_volume_rescales_isotropically() {
        let geo = Geometry::cuboid(1.0, 2.0, 4.0).unwrap();
        let scaled = geo.with_volume(64.0).unwrap();
        assert!((scaled.volume() - 64.0).abs() < 1e-9);
        match scaled {
            Geometry::Cuboid { len } => assert!((len.y / len.x - 2.0).abs() < 1e-12),
            _ => panic!("expected cuboid"),
        }
        assert!(matches!(
            Geometry::Open.with_volume(1.0),
            Err(GeometryError::Unbounded)
        ));
    }

    #[test]
    fn random_positions_lie_inside_container() {
        let mut rng = StdRng::seed_from_u64(7);
        for geo in [Geometry::cube(3.0).unwrap(), Geometry::sphere(2.0).unwrap()] {
            for _ in 0..1000 {
                let p = geo.random_position(&mut rng).unwrap();
                assert!(!geo.collision(&p));
            }
        }
        assert!(Geometry::Open.random_position(&mut rng).is_err());
    }

    #[test]
    fn constructors_reject_non_positive_dimensions() {
        assert!(matches!(
            Geometry::cuboid(1.0, 0.0, 1.0),
            Err(GeometryError::InvalidDimension { name: "ly", .. })
        ));
        assert!(Geometry::sphere(f64::NAN).is_err());
    }
}
