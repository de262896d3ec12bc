//! Common traits defining the seams between maps, planners and controllers

use std::sync::Arc;

use crate::common::error::{RoboticsError, RoboticsResult};
use crate::common::types::*;
use crate::mapping::Obstacle;

/// Read-only grid/obstacle map shared by the planner, every controller and
/// the benchmark harness.
///
/// Implementors only supply the dimensions and the obstacle sequence; index
/// mapping and collision predicates are derived from those.
pub trait MapProvider {
    /// Map width in grid cells
    fn width(&self) -> usize;

    /// Map height in grid cells
    fn height(&self) -> usize;

    /// Obstacles in construction order
    fn obstacles(&self) -> &[Obstacle];

    fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    fn check_bounds(&self, x: i32, y: i32) -> RoboticsResult<()> {
        if self.in_bounds(x, y) {
            Ok(())
        } else {
            Err(RoboticsError::OutOfRange {
                x: x as i64,
                y: y as i64,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Row-major index `y * width + x`, unique for every in-bounds cell
    fn get_grid_index(&self, x: i32, y: i32) -> RoboticsResult<usize> {
        self.check_bounds(x, y)?;
        Ok(y as usize * self.width() + x as usize)
    }

    /// True iff the straight move between two cells crosses no obstacle
    fn is_not_crossed_obstacle(&self, from: (i32, i32), to: (i32, i32)) -> RoboticsResult<bool> {
        self.check_bounds(from.0, from.1)?;
        self.check_bounds(to.0, to.1)?;
        let a = Point2D::new(from.0 as f64, from.1 as f64);
        let b = Point2D::new(to.0 as f64, to.1 as f64);
        Ok(!self.obstacles().iter().any(|o| o.intersects_segment(a, b)))
    }

    /// Continuous workspace check: each cell covers a unit square around its
    /// coordinate, so the map spans `[-0.5, width - 0.5] x [-0.5, height - 0.5]`.
    fn is_free_point(&self, p: Point2D) -> bool {
        let inside = p.x >= -0.5
            && p.y >= -0.5
            && p.x <= self.width() as f64 - 0.5
            && p.y <= self.height() as f64 - 0.5;
        inside && !self.obstacles().iter().any(|o| o.contains_point(p))
    }

    fn is_segment_free(&self, a: Point2D, b: Point2D) -> bool {
        self.is_free_point(a)
            && self.is_free_point(b)
            && !self.obstacles().iter().any(|o| o.intersects_segment(a, b))
    }

    /// Distance from `p` to the nearest obstacle, `f64::INFINITY` on an empty map
    fn clearance(&self, p: Point2D) -> f64 {
        self.obstacles()
            .iter()
            .map(|o| o.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Map handle shared read-only across planner, controllers and harness
pub type SharedMap = Arc<dyn MapProvider>;

/// Outcome of one route search
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub reached: bool,
    pub total_distance: f64,
    pub trajectory: Path2D,
}

impl PlanOutcome {
    pub fn found(trajectory: Path2D) -> Self {
        let total_distance = trajectory.total_length();
        Self { reached: true, total_distance, trajectory }
    }

    /// Sentinel result for an exhausted or capped search
    pub fn not_found() -> Self {
        Self { reached: false, total_distance: 0.0, trajectory: Path2D::new() }
    }
}

/// Trait for route planning algorithms
pub trait RoutePlanner {
    /// Plan a route between two poses. Errors are reserved for contract
    /// violations such as an off-map start; an unreachable goal is reported
    /// through `PlanOutcome::reached`.
    fn search_route(
        &self,
        start: Pose2D,
        goal: Pose2D,
        map: &dyn MapProvider,
    ) -> RoboticsResult<PlanOutcome>;
}

/// Outcome of one closed-loop tracking run
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOutcome {
    pub reached: bool,
    pub distance_traveled: f64,
    pub trajectory: Path2D,
}

impl TrackingOutcome {
    pub fn new(reached: bool, trajectory: Path2D) -> Self {
        let distance_traveled = trajectory.total_length();
        Self { reached, distance_traveled, trajectory }
    }
}

/// Uniform contract of every trajectory-tracking control policy
pub trait ControllerPolicy {
    /// Registry name of the policy
    fn name(&self) -> &str;

    /// Goal tolerance used to decide arrival
    fn goal_tolerance(&self) -> f64;

    /// Simulate the vehicle from `start` along `reference` until it arrives
    /// within the goal tolerance of `goal` or its budget runs out.
    fn follow_trajectory(&self, start: Pose2D, reference: &[Pose2D], goal: Point2D) -> TrackingOutcome;
}

/// A policy together with the name it is registered and reported under
pub type NamedController = (String, Box<dyn ControllerPolicy>);

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyMap;

    impl MapProvider for EmptyMap {
        fn width(&self) -> usize {
            4
        }
        fn height(&self) -> usize {
            3
        }
        fn obstacles(&self) -> &[Obstacle] {
            &[]
        }
    }

    #[test]
    fn test_default_grid_index() {
        let map = EmptyMap;
        assert_eq!(map.get_grid_index(0, 0).unwrap(), 0);
        assert_eq!(map.get_grid_index(3, 2).unwrap(), 11);
        assert!(matches!(map.get_grid_index(4, 0), Err(RoboticsError::OutOfRange { .. })));
        assert!(map.get_grid_index(0, -1).is_err());
    }

    #[test]
    fn test_plan_outcome_not_found() {
        let outcome = PlanOutcome::not_found();
        assert!(!outcome.reached);
        assert_eq!(outcome.total_distance, 0.0);
        assert!(outcome.trajectory.is_empty());
    }

    #[test]
    fn test_empty_map_clearance_is_infinite() {
        assert!(EmptyMap.clearance(Point2D::new(1.0, 1.0)).is_infinite());
        assert!(EmptyMap.is_free_point(Point2D::new(-0.4, 2.4)));
        assert!(!EmptyMap.is_free_point(Point2D::new(3.6, 1.0)));
    }
}
