//! Flight lines: the legs a drone flies while triggering its camera.

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::pose::Pose;
use crate::terrain::{ElevationHelper, ElevationModel};
use crate::{Vector2, Vector3};
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered run of waypoints plus its start, end, and heading.
///
/// Waypoints are shared with whoever else holds them (the flight plan, exporters, ...). The
/// derived `starting_point`, `direction` and `ending_point` are copies taken at construction; if
/// the waypoints change, call [`FlightLine::recompute`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightLine {
    waypoints: Vec<Arc<Pose>>,
    starting_point: Vector3,
    direction: Vector3,
    ending_point: Vector3,
    id: u32,
    dist_to_target: Option<f64>,
}

impl FlightLine {
    /// Builds a line through the given waypoints. There must be at least one.
    pub fn new(waypoints: Vec<Arc<Pose>>, id: u32) -> Result<Self> {
        let (Some(first), Some(last)) = (waypoints.first(), waypoints.last()) else {
            return Err(Error::invalid_argument(format!(
                "flight line {id} needs at least one waypoint"
            )));
        };
        let (start, end) = (*first.position(), *last.position());
        Ok(Self {
            starting_point: start,
            direction: heading(&start, &end),
            ending_point: end,
            waypoints,
            id,
            dist_to_target: None,
        })
    }

    /// Builds a line between two points that has no waypoints (yet).
    pub fn from_endpoints(starting_point: Vector3, ending_point: Vector3, id: u32) -> Result<Self> {
        if !starting_point.iter().chain(ending_point.iter()).all(|c| c.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "flight line {id} endpoints must be finite"
            )));
        }
        Ok(Self {
            waypoints: Vec::new(),
            starting_point,
            direction: heading(&starting_point, &ending_point),
            ending_point,
            id,
            dist_to_target: None,
        })
    }

    #[must_use]
    pub fn with_dist_to_target(mut self, dist_to_target: f64) -> Self {
        self.dist_to_target = Some(dist_to_target);
        self
    }

    /// Re-derives start, end and heading from the current waypoints.
    ///
    /// Lines without waypoints keep their explicit endpoints.
    pub fn recompute(&mut self) {
        if let (Some(first), Some(last)) = (self.waypoints.first(), self.waypoints.last()) {
            self.starting_point = *first.position();
            self.ending_point = *last.position();
            self.direction = heading(&self.starting_point, &self.ending_point);
        }
    }

    #[must_use]
    pub fn waypoints(&self) -> &[Arc<Pose>] {
        &self.waypoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    #[must_use]
    pub fn starting_point(&self) -> &Vector3 {
        &self.starting_point
    }

    /// Unit vector from start to end; zero if they coincide.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    #[must_use]
    pub fn ending_point(&self) -> &Vector3 {
        &self.ending_point
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        (self.ending_point - self.starting_point).norm()
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Camera-to-ground distance the line was planned (or adapted) for, if known.
    #[must_use]
    pub fn dist_to_target(&self) -> Option<f64> {
        self.dist_to_target
    }

    /// Pushes the first and last corner of a polyline outwards.
    ///
    /// The first corner moves `enlarge_start_m` further away from the second, and the last corner
    /// moves `enlarge_end_m` further away from the one before it. Interior corners are untouched.
    ///
    /// ```rust
    /// use flightplan_kinematics::FlightLine;
    /// use nalgebra::Vector3;
    ///
    /// let corners = [Vector3::zeros(), Vector3::x(), Vector3::x() * 2.];
    /// let enlarged = FlightLine::enlarge(&corners, 1., 1.).unwrap();
    /// assert_eq!(enlarged[0], Vector3::new(-1., 0., 0.));
    /// assert_eq!(enlarged[2], Vector3::new(3., 0., 0.));
    /// ```
    pub fn enlarge(
        corners: &[Vector3],
        enlarge_start_m: f64,
        enlarge_end_m: f64,
    ) -> Result<Vec<Vector3>> {
        if corners.len() < 3 {
            return Err(Error::invalid_argument(format!(
                "need at least 3 corners to enlarge, got {}",
                corners.len()
            )));
        }
        // also catches NaN
        if !(enlarge_start_m > 0. && enlarge_end_m > 0.) {
            return Err(Error::invalid_argument(format!(
                "enlarge distances must be positive, got {enlarge_start_m} and {enlarge_end_m}"
            )));
        }

        let outwards = |from: &Vector3, to: &Vector3| {
            (to - from).try_normalize(f64::EPSILON).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "consecutive corners {from:?} and {to:?} coincide"
                ))
            })
        };

        let mut enlarged = corners.to_vec();
        let n = enlarged.len();
        let start_dir = outwards(&corners[1], &corners[0])?;
        let end_dir = outwards(&corners[n - 2], &corners[n - 1])?;
        enlarged[0] += start_dir * enlarge_start_m;
        enlarged[n - 1] += end_dir * enlarge_end_m;
        Ok(enlarged)
    }

    /// Scan-line intersection of polygons with the horizontal line at `y`.
    ///
    /// Every polygon edge (including the closing one) that crosses the line contributes its
    /// crossing `x`; with `sweep_width > 0` crossings of the lines at `y - sweep_width` and
    /// `y + sweep_width` are included too. An edge lying on a scan line contributes both of its
    /// endpoints.
    ///
    /// All crossings of all polygons are folded into a single [`Interval`], which is invalid if
    /// nothing crossed. Separate polygons (or concave parts) are not kept apart.
    #[must_use]
    pub fn intersect_with_polygons_horizontal(
        polygons: &[Vec<Vector2>],
        y: f64,
        sweep_width: f64,
    ) -> Interval {
        let mut scan_lines = vec![y];
        if sweep_width > 0. {
            scan_lines.extend([y - sweep_width, y + sweep_width]);
        }

        let mut interval = Interval::default();
        for polygon in polygons {
            let n = polygon.len();
            for i in 0..n {
                let (p, q) = (polygon[i], polygon[(i + 1) % n]);
                // upper end first
                let (upper, lower) = if p.y >= q.y { (p, q) } else { (q, p) };
                for &line in &scan_lines {
                    if line > upper.y || line < lower.y {
                        continue;
                    }
                    if upper.y == lower.y {
                        interval.update(upper.x);
                        interval.update(lower.x);
                    } else {
                        let s = (line - lower.y) / (upper.y - lower.y);
                        interval.update(lower.x + s * (upper.x - lower.x));
                    }
                }
            }
        }
        interval
    }

    /// Moves every camera along its own viewing ray so that it sits `dist_to_target` meters in
    /// front of the terrain.
    ///
    /// Returns a new line with the same id; `flight_line` is left untouched. Fails if the line has
    /// no waypoints, if `dist_to_target` is not positive, or if some waypoint's ray never meets
    /// the terrain.
    pub fn adapt_to_terrain(
        flight_line: &FlightLine,
        elevation_model: &dyn ElevationModel,
        elevation_helper: &dyn ElevationHelper,
        dist_to_target: f64,
    ) -> Result<FlightLine> {
        if !(dist_to_target.is_finite() && dist_to_target > 0.) {
            return Err(Error::invalid_argument(format!(
                "distance to target must be positive, got {dist_to_target}"
            )));
        }

        let waypoints = flight_line
            .waypoints
            .iter()
            .enumerate()
            .map(|(i, waypoint)| {
                let direction = waypoint.direction();
                let intersection = elevation_helper
                    .intersection_with_terrain(elevation_model, waypoint.position(), direction)
                    .ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "camera ray of waypoint {i} on flight line {} does not hit the terrain",
                            flight_line.id
                        ))
                    })?;
                let position = intersection - direction * dist_to_target;
                Pose::from_target(position, intersection, waypoint.roll()).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            flight_line = flight_line.id,
            waypoints = waypoints.len(),
            dist_to_target,
            "adapted flight line to terrain"
        );
        Ok(FlightLine::new(waypoints, flight_line.id)?.with_dist_to_target(dist_to_target))
    }
}

fn heading(start: &Vector3, end: &Vector3) -> Vector3 {
    (end - start)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
