//! Terrain lookup and camera-ray intersection.
//!
//! Flight planning only needs two things from terrain: the ground height under a horizontal
//! position ([`ElevationModel`]) and the point where a camera ray first hits the ground
//! ([`ElevationHelper`]). Both work in the local Cartesian frame of the flight plan (meters, `z`
//! up).

use crate::error::{Error, Result};
use crate::Vector3;
use tracing::{trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ground height lookup.
pub trait ElevationModel {
    /// Terrain height at the horizontal position `(x, y)`, or `None` if the model has no data
    /// there.
    fn elevation_at(&self, x: f64, y: f64) -> Option<f64>;
}

impl<M: ElevationModel + ?Sized> ElevationModel for &M {
    fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        (**self).elevation_at(x, y)
    }
}

/// Intersects rays with an [`ElevationModel`].
pub trait ElevationHelper {
    /// The first point along the ray from `position` in `direction` that lies on (or below) the
    /// terrain, or `None` if the ray never reaches it.
    fn intersection_with_terrain(
        &self,
        model: &dyn ElevationModel,
        position: &Vector3,
        direction: &Vector3,
    ) -> Option<Vector3>;
}

/// Terrain at a single constant height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatTerrain {
    pub elevation: f64,
}

impl FlatTerrain {
    #[must_use]
    pub fn new(elevation: f64) -> Self {
        Self { elevation }
    }
}

impl ElevationModel for FlatTerrain {
    fn elevation_at(&self, _x: f64, _y: f64) -> Option<f64> {
        Some(self.elevation)
    }
}

/// Heights sampled on a regular grid, bilinearly interpolated in between.
///
/// Sample `(column, row)` lies at `(origin_x + column * spacing, origin_y + row * spacing)`;
/// `heights` is stored row by row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridElevationModel {
    origin_x: f64,
    origin_y: f64,
    spacing: f64,
    columns: usize,
    rows: usize,
    heights: Vec<f64>,
}

impl GridElevationModel {
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        spacing: f64,
        columns: usize,
        heights: Vec<f64>,
    ) -> Result<Self> {
        if !(spacing.is_finite() && spacing > 0.) {
            return Err(Error::invalid_argument(format!(
                "grid spacing must be positive, got {spacing}"
            )));
        }
        if columns < 2 || heights.len() % columns != 0 || heights.len() / columns < 2 {
            return Err(Error::invalid_argument(format!(
                "{} heights do not form a grid of at least 2x2 samples with {columns} columns",
                heights.len()
            )));
        }
        if !origin_x.is_finite() || !origin_y.is_finite() || heights.iter().any(|h| !h.is_finite())
        {
            return Err(Error::invalid_argument("grid origin and heights must be finite"));
        }
        let rows = heights.len() / columns;
        Ok(Self {
            origin_x,
            origin_y,
            spacing,
            columns,
            rows,
            heights,
        })
    }

    fn sample(&self, column: usize, row: usize) -> f64 {
        self.heights[row * self.columns + column]
    }
}

impl ElevationModel for GridElevationModel {
    fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        let u = (x - self.origin_x) / self.spacing;
        let v = (y - self.origin_y) / self.spacing;
        let max_u = (self.columns - 1) as f64;
        let max_v = (self.rows - 1) as f64;
        if !(0.0..=max_u).contains(&u) || !(0.0..=max_v).contains(&v) {
            return None;
        }

        // the last row/column has no cell of its own, so interpolate within the one before it
        let column = (u.floor() as usize).min(self.columns - 2);
        let row = (v.floor() as usize).min(self.rows - 2);
        let fu = u - column as f64;
        let fv = v - row as f64;

        let south = self.sample(column, row) * (1. - fu) + self.sample(column + 1, row) * fu;
        let north =
            self.sample(column, row + 1) * (1. - fu) + self.sample(column + 1, row + 1) * fu;
        Some(south * (1. - fv) + north * fv)
    }
}

// upper bound on samples along one ray, whatever `max_range / step` asks for
const MAX_SAMPLES: u32 = 1_000_000;

/// Finds terrain intersections by stepping along the ray and refining the first crossing by
/// bisection.
///
/// Features narrower than `step` may be stepped over. `step` and `max_range` must be finite and
/// positive, otherwise no intersection is ever found. At most a million samples are taken per
/// ray.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RayMarchingHelper {
    /// Distance between samples along the ray, in meters.
    pub step: f64,
    /// How far along the ray to look before giving up, in meters.
    pub max_range: f64,
    /// Bisection steps once a crossing has been bracketed.
    pub refinement_iterations: u32,
}

impl Default for RayMarchingHelper {
    fn default() -> Self {
        Self {
            step: 1.0,
            max_range: 10_000.0,
            refinement_iterations: 32,
        }
    }
}

impl RayMarchingHelper {
    // height of the ray above terrain at distance `t`
    fn clearance(
        model: &dyn ElevationModel,
        position: &Vector3,
        direction: &Vector3,
        t: f64,
    ) -> Option<f64> {
        let p = position + direction * t;
        model.elevation_at(p.x, p.y).map(|ground| p.z - ground)
    }
}

impl ElevationHelper for RayMarchingHelper {
    fn intersection_with_terrain(
        &self,
        model: &dyn ElevationModel,
        position: &Vector3,
        direction: &Vector3,
    ) -> Option<Vector3> {
        let usable = |v: f64| v.is_finite() && v > 0.;
        if !usable(self.step) || !usable(self.max_range) {
            warn!(
                step = self.step,
                max_range = self.max_range,
                "ray marching needs a finite, positive step and range"
            );
            return None;
        }
        if !position.iter().all(|c| c.is_finite()) {
            return None;
        }
        let direction = direction.try_normalize(f64::EPSILON)?;

        let mut below = 0.;
        if Self::clearance(model, position, &direction, below)? <= 0. {
            return Some(*position);
        }

        let mut above = below;
        for _ in 0..MAX_SAMPLES {
            below = (above + self.step).min(self.max_range);
            // the step vanished next to the distance already covered
            if below <= above {
                return None;
            }
            match Self::clearance(model, position, &direction, below) {
                Some(h) if h <= 0. => break,
                // left the model's coverage
                None => return None,
                Some(_) if below >= self.max_range => return None,
                Some(_) => above = below,
            }
        }
        if above == below {
            trace!(distance = above, "gave up marching along the ray");
            return None;
        }

        for _ in 0..self.refinement_iterations {
            let mid = (above + below) / 2.;
            match Self::clearance(model, position, &direction, mid) {
                Some(h) if h > 0. => above = mid,
                _ => below = mid,
            }
        }
        trace!(distance = below, "ray reached terrain");
        Some(position + direction * below)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ElevationHelper, ElevationModel, FlatTerrain, GridElevationModel, RayMarchingHelper,
    };
    use crate::Vector3;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn slope() -> GridElevationModel {
        // z = x over [0, 100] x [0, 100], sampled every 50m
        GridElevationModel::new(
            0.,
            0.,
            50.,
            3,
            vec![0., 50., 100., 0., 50., 100., 0., 50., 100.],
        )
        .unwrap()
    }

    #[rstest]
    #[case(0., 0., Some(0.))]
    #[case(25., 75., Some(25.))]
    #[case(100., 100., Some(100.))]
    #[case(-0.1, 50., None)]
    #[case(50., 100.1, None)]
    fn grid_interpolates_inside_and_rejects_outside(
        #[case] x: f64,
        #[case] y: f64,
        #[case] expected: Option<f64>,
    ) {
        let h = slope().elevation_at(x, y);
        match (h, expected) {
            (Some(h), Some(e)) => assert_relative_eq!(h, e, epsilon = 1e-12),
            (h, e) => assert_eq!(h, e),
        }
    }

    #[test]
    fn grid_rejects_ragged_heights() {
        assert!(GridElevationModel::new(0., 0., 1., 3, vec![0.; 7]).is_err());
        assert!(GridElevationModel::new(0., 0., 0., 2, vec![0.; 4]).is_err());
        assert!(GridElevationModel::new(0., 0., 1., 2, vec![0., 0., f64::NAN, 0.]).is_err());
    }

    #[test]
    fn straight_down_onto_flat_ground() {
        let hit = RayMarchingHelper::default()
            .intersection_with_terrain(
                &FlatTerrain::new(12.5),
                &Vector3::new(3., 4., 100.),
                &Vector3::new(0., 0., -2.),
            )
            .unwrap();
        assert_relative_eq!(hit, Vector3::new(3., 4., 12.5), epsilon = 1e-6);
    }

    #[test]
    fn oblique_ray_onto_slope() {
        // ray z = 60 - t/sqrt(2), x = 10 + t/sqrt(2); meets z = x at x = 35
        let hit = RayMarchingHelper::default()
            .intersection_with_terrain(
                &slope(),
                &Vector3::new(10., 50., 60.),
                &Vector3::new(1., 0., -1.),
            )
            .unwrap();
        assert_relative_eq!(hit, Vector3::new(35., 50., 35.), epsilon = 1e-6);
    }

    #[test]
    fn ray_pointing_up_misses() {
        let helper = RayMarchingHelper {
            max_range: 500.,
            ..RayMarchingHelper::default()
        };
        assert_eq!(
            helper.intersection_with_terrain(
                &FlatTerrain::new(0.),
                &Vector3::new(0., 0., 10.),
                &Vector3::z(),
            ),
            None
        );
    }

    #[rstest]
    #[case::infinite_range(1., f64::INFINITY)]
    #[case::nan_range(1., f64::NAN)]
    #[case::zero_range(1., 0.)]
    #[case::infinite_step(f64::INFINITY, 100.)]
    #[case::nan_step(f64::NAN, 100.)]
    fn unusable_marching_settings_find_nothing(#[case] step: f64, #[case] max_range: f64) {
        let helper = RayMarchingHelper {
            step,
            max_range,
            ..RayMarchingHelper::default()
        };
        for direction in [Vector3::z(), Vector3::x(), -Vector3::z()] {
            assert_eq!(
                helper.intersection_with_terrain(
                    &FlatTerrain::new(0.),
                    &Vector3::new(0., 0., 10.),
                    &direction,
                ),
                None
            );
        }
    }

    #[test]
    fn huge_range_gives_up_instead_of_marching_forever() {
        let helper = RayMarchingHelper {
            max_range: 1e300,
            ..RayMarchingHelper::default()
        };
        assert_eq!(
            helper.intersection_with_terrain(
                &FlatTerrain::new(0.),
                &Vector3::new(0., 0., 10.),
                &Vector3::new(1., 0., 0.1),
            ),
            None
        );
        // a reachable crossing is still found
        assert!(helper
            .intersection_with_terrain(
                &FlatTerrain::new(0.),
                &Vector3::new(0., 0., 10.),
                &Vector3::new(1., 0., -0.1),
            )
            .is_some());
    }

    #[test]
    fn starting_underground_returns_the_start() {
        let start = Vector3::new(0., 0., -1.);
        assert_eq!(
            RayMarchingHelper::default().intersection_with_terrain(
                &FlatTerrain::new(0.),
                &start,
                &Vector3::x()
            ),
            Some(start)
        );
    }

    #[test]
    fn helper_config_fills_in_defaults() {
        let helper: RayMarchingHelper = serde_yaml::from_str("step: 0.5").unwrap();
        assert_eq!(helper.step, 0.5);
        assert_eq!(helper.max_range, RayMarchingHelper::default().max_range);

        let unbounded: RayMarchingHelper = serde_yaml::from_str("max_range: .inf").unwrap();
        assert_eq!(unbounded.max_range, f64::INFINITY);
        assert_eq!(
            unbounded.intersection_with_terrain(
                &FlatTerrain::new(0.),
                &Vector3::new(0., 0., 10.),
                &Vector3::z()
            ),
            None
        );
    }
}
