//! WGS84 positions and their Earth-Centered, Earth-Fixed counterparts.

use crate::error::{Error, Result};
use crate::util::BoundedAngle;
use crate::{Point3, Vector3};
use std::fmt;
use std::fmt::Display;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// WGS84 ellipsoid, https://nsgreg.nga.mil/doc/view?i=4085 table 3.1
#[doc(alias = "a")]
pub(crate) const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
#[doc(alias = "b")]
const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);
#[doc(alias = "e^2")]
// e^2 = 1 - b^2/a^2 = 2f - f^2
const ECCENTRICITY_SQ: f64 = 2.0 * FLATTENING - FLATTENING * FLATTENING;

/// An Earth-bound location in the [World Geodetic System
/// '84](https://en.wikipedia.org/wiki/World_Geodetic_System#WGS_84).
///
/// This is the position type drones report over telemetry and that waypoints are exported in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Wgs84 {
    // not normalised; the accessors bound the angles on the way out.
    latitude: Angle,
    longitude: Angle,
    altitude: Length,
}

/// Argument type for [`Wgs84::build`].
#[derive(Debug, Default, Clone, Copy)]
#[must_use]
pub struct Components {
    /// Must be in [-90°,90°] % 360°.
    pub latitude: Angle,
    pub longitude: Angle,
    /// Height above the WGS84 reference ellipsoid.
    pub altitude: Length,
}

impl Wgs84 {
    /// Constructs a world location from latitude, longitude, and altitude.
    ///
    /// Fails with [`Error::InvalidArgument`] if the latitude is outside [-90°,90°] (modulo a full
    /// turn) or if any component is not finite.
    pub fn build(
        Components {
            latitude,
            longitude,
            altitude,
        }: Components,
    ) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() || !altitude.is_finite() {
            return Err(Error::invalid_argument(format!(
                "WGS84 components must be finite, got lat={:?} lon={:?} alt={:?}",
                latitude, longitude, altitude
            )));
        }
        let signed_latitude = BoundedAngle::new(latitude).to_signed_range();
        if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2).contains(&signed_latitude)
        {
            return Err(Error::invalid_argument(format!(
                "latitude {}° is outside [-90°, 90°]",
                latitude.get::<degree>()
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }

    /// Shorthand for [`Wgs84::build`] taking degrees and meters.
    pub fn from_degrees_and_meters(latitude: f64, longitude: f64, altitude: f64) -> Result<Self> {
        Self::build(Components {
            latitude: Angle::new::<degree>(latitude),
            longitude: Angle::new::<degree>(longitude),
            altitude: Length::new::<meter>(altitude),
        })
    }

    /// Always in [-90°, 90°].
    #[must_use]
    pub fn latitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.latitude).to_signed_range())
    }

    /// Always in [-180°, 180°).
    #[must_use]
    pub fn longitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.longitude).to_signed_range())
    }

    /// Height above the WGS84 ellipsoid. This is neither height above sea level nor above ground.
    #[must_use]
    pub fn altitude(&self) -> Length {
        self.altitude
    }

    /// Computes the [great-circle distance] between the two locations on the surface of the
    /// earth, treating the earth as a sphere with the WGS84 equatorial radius.
    ///
    /// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
    #[doc(alias = "great_circle_distance")]
    #[must_use]
    pub fn haversine_distance_on_surface(&self, other: &Wgs84) -> Length {
        let lat_a = self.latitude.get::<radian>();
        let lat_b = other.latitude.get::<radian>();
        let delta_lat = lat_b - lat_a;
        let delta_lon = other.longitude.get::<radian>() - self.longitude.get::<radian>();

        let inner = 1. - delta_lat.cos() + lat_a.cos() * lat_b.cos() * (1. - delta_lon.cos());
        let central_angle = 2. * (inner / 2.).sqrt().asin();

        Length::new::<meter>(central_angle * SEMI_MAJOR_AXIS)
    }

    /// Shifts this position by an earth-frame offset given as north, east and down meters.
    ///
    /// The offset is added to the ECEF coordinates as `(east, north, -down)`, i.e. read as
    /// east/north/up components laid onto the ECEF `x`/`y`/`z` axes without rotating into the local
    /// tangent plane. Recorded flight data relies on this exact mapping. The shifted ECEF point is
    /// then converted back to WGS84.
    #[must_use]
    pub fn offset_by_ned(&self, ned: &Vector3) -> Wgs84 {
        let (north, east, down) = (ned.x, ned.y, ned.z);
        let ecef = Ecef::from_wgs84(self);
        Ecef::from_nalgebra_point(ecef.point + Vector3::new(east, north, -down)).to_wgs84()
    }
}

impl Display for Wgs84 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude();
        let north = lat.is_sign_positive();
        let lat = lat.abs().get::<degree>();
        let lon = self.longitude();
        let east = lon.is_sign_positive();
        let lon = lon.abs().get::<degree>();
        let alt = self.altitude.get::<meter>();
        let ns = if north { 'N' } else { 'S' };
        let ew = if east { 'E' } else { 'W' };
        write!(f, "{lat}°{ns}, {lon}°{ew}, {alt}m")
    }
}

/// A point in the Earth-Centered, Earth-Fixed frame, in meters.
///
/// `x` points to latitude 0° longitude 0°, `y` to latitude 0° longitude 90°E, and `z` to the
/// north pole.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ecef {
    point: Point3,
}

impl Ecef {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            point: Point3::new(x, y, z),
        }
    }

    #[must_use]
    pub fn from_nalgebra_point(point: Point3) -> Self {
        Self { point }
    }

    #[must_use]
    pub fn to_nalgebra_point(self) -> Point3 {
        self.point
    }

    /// See
    /// <https://en.wikipedia.org/wiki/Geographic_coordinate_conversion#From_geodetic_to_ECEF_coordinates>
    #[must_use]
    pub fn from_wgs84(wgs84: &Wgs84) -> Self {
        let height_h = wgs84.altitude.get::<meter>();
        let lon_lambda = wgs84.longitude.get::<radian>();
        let lat_phi = wgs84.latitude.get::<radian>();

        // prime vertical radius of curvature
        let n_phi = SEMI_MAJOR_AXIS / (1. - ECCENTRICITY_SQ * lat_phi.sin().powi(2)).sqrt();

        let x = (n_phi + height_h) * lat_phi.cos() * lon_lambda.cos();
        let y = (n_phi + height_h) * lat_phi.cos() * lon_lambda.sin();
        let z = ((1. - ECCENTRICITY_SQ) * n_phi + height_h) * lat_phi.sin();

        Self::new(x, y, z)
    }

    /// Converts back to latitude, longitude, and altitude.
    ///
    /// Uses the iterative method from Shu & Li, "An iterative algorithm to compute geodetic
    /// coordinates" (Computers & Geosciences, 2010), which converges in a handful of steps and
    /// behaves well near the poles.
    #[must_use]
    pub fn to_wgs84(&self) -> Wgs84 {
        let coords = self.point.coords;
        let lon = coords.y.atan2(coords.x);

        let a = SEMI_MAJOR_AXIS;
        let b = SEMI_MINOR_AXIS;
        let a2 = a.powi(2);
        let b2 = b.powi(2);
        let z2 = coords.z.powi(2);
        let r2 = coords.x.powi(2) + coords.y.powi(2);
        let r = r2.sqrt();
        let bigr2 = r2 + z2;

        let mut k = (((a2 * z2 + b2 * r2).sqrt() - a * b) * bigr2) / (a2 * z2 + b2 * r2);
        loop {
            let p = a + b * k;
            let q = b + a * k;
            let f_k = 2. * (b * p * q.powi(2) + a * p.powi(2) * q - a * r2 * q - b * z2 * p);
            let dk = -1. / f_k;

            if !dk.is_normal() || dk.abs() < f64::EPSILON {
                break;
            }
            k += dk;
        }

        let p = a + b * k;
        let q = b + a * k;
        // atan yields [-π/2, π/2], so the latitude needs no further validation.
        let lat = ((a * p * coords.z) / (b * q * r)).atan();
        let altitude = k * ((b2 * r2 / p.powi(2)) + (a2 * z2 / q.powi(2))).sqrt();

        Wgs84 {
            latitude: Angle::new::<radian>(lat),
            longitude: Angle::new::<radian>(lon),
            altitude: Length::new::<meter>(altitude),
        }
    }
}

impl From<Ecef> for Wgs84 {
    fn from(ecef: Ecef) -> Self {
        ecef.to_wgs84()
    }
}

impl From<Wgs84> for Ecef {
    fn from(wgs84: Wgs84) -> Self {
        Self::from_wgs84(&wgs84)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Wgs84 {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // ECEF to lat/lon is inherently lossy, sub-meter is what we can promise.
        Length::new::<meter>(0.75)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.haversine_distance_on_surface(other) < epsilon
            && self
                .altitude
                .get::<meter>()
                .abs_diff_eq(&other.altitude.get::<meter>(), epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Wgs84 {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(f64::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.haversine_distance_on_surface(other)
            .get::<meter>()
            .abs_diff_eq(&0., epsilon.get::<meter>())
            && self.altitude.get::<meter>().relative_eq(
                &other.altitude.get::<meter>(),
                epsilon.get::<meter>(),
                max_relative.get::<meter>(),
            )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Ecef {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.point.abs_diff_eq(&other.point, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Ecef {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.point.relative_eq(&other.point, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::{Components, Ecef, Wgs84};
    use crate::error::Error;
    use crate::util::BoundedAngle;
    use crate::Vector3;
    use approx::{assert_relative_eq, AbsDiffEq};
    use quickcheck::quickcheck;
    use rstest::rstest;
    use uom::si::f64::{Angle, Length};
    use uom::si::{
        angle::{degree, radian},
        length::meter,
    };

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    impl quickcheck::Arbitrary for Wgs84 {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let mut normal = || loop {
                match f64::arbitrary(g) {
                    0. => break 0.,
                    f if f.is_normal() => break f,
                    _ => {}
                }
            };
            let (latitude, longitude, altitude) = (normal(), normal(), normal());
            Self {
                latitude: Angle::new::<radian>(
                    latitude.rem_euclid(std::f64::consts::PI) - std::f64::consts::FRAC_PI_2,
                ),
                longitude: Angle::new::<radian>(longitude.rem_euclid(std::f64::consts::TAU)),
                altitude: m(altitude.rem_euclid(50000.) - 10000.),
            }
        }
    }

    impl From<&nav_types::ECEF<f64>> for Ecef {
        fn from(value: &nav_types::ECEF<f64>) -> Self {
            Ecef::new(value.x(), value.y(), value.z())
        }
    }

    #[rstest]
    #[case(d(90.9948211), d(7.8211606), m(1000.))]
    #[case(d(190.112282), d(19.880389), m(0.))]
    fn rejects_latitudes_beyond_the_poles(
        #[case] latitude: Angle,
        #[case] longitude: Angle,
        #[case] altitude: Length,
    ) {
        let result = Wgs84::build(Components {
            latitude,
            longitude,
            altitude,
        });
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_non_finite_components() {
        assert!(Wgs84::from_degrees_and_meters(f64::NAN, 0., 0.).is_err());
        assert!(Wgs84::from_degrees_and_meters(0., 0., f64::INFINITY).is_err());
    }

    #[test]
    fn display_uses_hemispheres() {
        let fuji = |lat: f64, lon: f64| {
            Wgs84::from_degrees_and_meters(lat, lon, 2294.)
                .unwrap()
                .to_string()
        };
        insta::assert_snapshot!(Wgs84::from_degrees_and_meters(0., 0., 0.).unwrap(), @"0°N, 0°E, 0m");
        assert!(fuji(35.3619, 138.728).contains("°N, ") && fuji(35.3619, 138.728).contains("°E, "));
        assert!(fuji(-35.3619, 138.728).contains("°S, "));
        assert!(fuji(35.3619, -138.728).contains("°W, "));
        assert!(fuji(-35.3619, -138.728).ends_with("°W, 2294m"));
    }

    fn try_wgs_ecef_roundtrip(wgs84: Wgs84) {
        let ecef = Ecef::from_wgs84(&wgs84);

        let lat = BoundedAngle::new(wgs84.latitude).to_signed_range().to_degrees();
        let lon = BoundedAngle::new(wgs84.longitude).to_signed_range().to_degrees();
        let location =
            nav_types::WGS84::from_degrees_and_meters(lat, lon, wgs84.altitude.get::<meter>());
        let expected = Ecef::from(&nav_types::ECEF::from(location));

        // WGS84 epsilon since the reference goes through lat/lon too
        assert_relative_eq!(
            ecef,
            expected,
            epsilon = Wgs84::default_epsilon().get::<meter>()
        );

        assert_relative_eq!(Wgs84::from(ecef), wgs84);
    }

    quickcheck! {
        fn wgs_ecef_roundtrip(wgs84: Wgs84) -> () {
            try_wgs_ecef_roundtrip(wgs84);
        }
    }

    #[rstest]
    #[case(0., 0.)]
    #[case(90., 0.)]
    #[case(-90., 0.)]
    #[case(90., 180.)]
    #[case(-90., -90.)]
    #[case(89.999999, 0.)]
    #[case(-89.999999, 180.)]
    #[case(89.999999, -179.99999)]
    fn hard_wgs_to_ecef(#[case] lat: f64, #[case] lon: f64) {
        try_wgs_ecef_roundtrip(Wgs84::from_degrees_and_meters(lat, lon, 1000.).unwrap());
    }

    #[test]
    fn known_wgs_to_ecef() {
        for ((lat, lon, alt), (x, y, z)) in [
            ((0., 0., 0.), (6378137., 0., 0.)),
            (
                // Mt. Fuji
                (35.3619, 138.7280, 2294.0),
                (-3915138.118709466, 3436144.354064903, 3672011.028417511),
            ),
        ] {
            let ecef = Ecef::from_wgs84(&Wgs84::from_degrees_and_meters(lat, lon, alt).unwrap());
            assert_relative_eq!(ecef, Ecef::new(x, y, z), epsilon = 1e-6);
        }
    }

    #[test]
    fn haversine_quarter_equator() {
        let a = Wgs84::from_degrees_and_meters(0., 0., 0.).unwrap();
        let b = Wgs84::from_degrees_and_meters(0., 90., 0.).unwrap();
        assert_relative_eq!(
            a.haversine_distance_on_surface(&b).get::<meter>(),
            std::f64::consts::FRAC_PI_2 * super::SEMI_MAJOR_AXIS,
            epsilon = 1e-6
        );
    }

    #[test]
    fn ned_offset_is_laid_onto_ecef_as_east_north_up() {
        let origin = Wgs84::from_degrees_and_meters(0., 0., 0.).unwrap();
        let (n, e, down) = (1.5, -2.25, 0.75);
        let shifted = origin.offset_by_ned(&Vector3::new(n, e, down));

        let expected = Ecef::new(super::SEMI_MAJOR_AXIS + e, n, -down).to_wgs84();
        assert_relative_eq!(shifted, expected, epsilon = m(1e-6));
        assert_relative_eq!(
            Ecef::from_wgs84(&shifted),
            Ecef::new(super::SEMI_MAJOR_AXIS + e, n, -down),
            epsilon = 1e-6
        );
        // x is up at 0°N 0°E, so east ends up as height; y is east, z is north
        assert_relative_eq!(shifted.altitude().get::<meter>(), e, epsilon = 1e-5);
        assert!(shifted.longitude().get::<degree>() > 0.);
        assert!(shifted.latitude().get::<degree>() < 0.);
    }

    #[test]
    fn pure_north_offset_moves_along_ecef_y() {
        let origin = Wgs84::from_degrees_and_meters(0., 0., 0.).unwrap();
        let shifted = Ecef::from_wgs84(&origin.offset_by_ned(&Vector3::x()));
        let delta = shifted.to_nalgebra_point() - Ecef::from_wgs84(&origin).to_nalgebra_point();
        assert_relative_eq!(delta, Vector3::y(), epsilon = 1e-6);
    }
}
