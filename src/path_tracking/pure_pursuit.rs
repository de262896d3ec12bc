// Path tracking with pure pursuit steering and P speed control.
//
// The target point lies a speed-dependent lookahead distance ahead of the
// nearest reference point, measured along the reference.

use crate::common::{ControllerPolicy, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::path_tracking::tracking::{
    proportional_control, run_tracking_loop, ControlCommand, ControlLaw, TrackingConfig,
    TrackingContext, VehicleState,
};
use crate::utils::ReferencePath;

#[derive(Debug, Clone)]
pub struct PurePursuitConfig {
    pub tracking: TrackingConfig,
    /// Lookahead distance at standstill [m]
    pub lookahead_distance: f64,
    /// Lookahead growth per m/s of speed
    pub lookahead_gain: f64,
}

impl Default for PurePursuitConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            lookahead_distance: 3.0,
            lookahead_gain: 0.1,
        }
    }
}

/// Steering angle towards the reference point `lookahead` metres past `station`
pub(crate) fn pure_pursuit_steer_control(
    state: &VehicleState,
    reference: &ReferencePath,
    station: f64,
    lookahead: f64,
) -> f64 {
    let target = reference.sample(station + lookahead);
    let alpha = (target.y - state.y).atan2(target.x - state.x) - state.yaw;
    // near the end of the path the target can be closer than the lookahead
    let lf = lookahead.min(state.position().distance(&target.position())).max(1e-3);
    (2.0 * state.wheelbase * alpha.sin() / lf).atan2(1.0)
}

pub struct PurePursuitController {
    config: PurePursuitConfig,
    map: SharedMap,
}

impl PurePursuitController {
    pub fn new(config: PurePursuitConfig, map: SharedMap) -> Self {
        PurePursuitController { config, map }
    }

    pub fn config(&self) -> &PurePursuitConfig {
        &self.config
    }

    pub fn lookahead(&self, v: f64) -> f64 {
        self.config.lookahead_gain * v + self.config.lookahead_distance
    }
}

impl ControlLaw for PurePursuitController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        let accel = proportional_control(ctx.desired_speed(state), state.v, ctx.config.speed_gain);
        let steer = pure_pursuit_steer_control(state, ctx.reference, ctx.station(), self.lookahead(state.v));
        ControlCommand::new(accel, steer)
    }
}

impl ControllerPolicy for PurePursuitController {
    fn name(&self) -> &str {
        "pure_pursuit"
    }

    fn goal_tolerance(&self) -> f64 {
        self.config.tracking.goal_tolerance
    }

    fn follow_trajectory(&self, start: Pose2D, reference: &[Pose2D], goal: Point2D) -> TrackingOutcome {
        run_tracking_loop(self, &self.config.tracking, self.map.as_ref(), start, reference, goal, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ObstacleGridMap;
    use crate::utils::{transform_trajectory, transform_trajectory_with_angles};
    use std::sync::Arc;

    fn l_shaped() -> Vec<Pose2D> {
        let mut xs: Vec<f64> = (2..=20).map(|x| x as f64).collect();
        let mut ys = vec![2.0; xs.len()];
        for y in 3..=20 {
            xs.push(20.0);
            ys.push(y as f64);
        }
        transform_trajectory_with_angles(&transform_trajectory(&xs, &ys))
    }

    #[test]
    fn test_steer_sign() {
        let reference = ReferencePath::new(&l_shaped());
        // target ahead and to the left
        let state = VehicleState::new(2.0, 0.5, 0.0, 1.0, 2.5);
        assert!(pure_pursuit_steer_control(&state, &reference, 0.0, 3.0) > 0.0);
        let state = VehicleState::new(2.0, 3.5, 0.0, 1.0, 2.5);
        assert!(pure_pursuit_steer_control(&state, &reference, 0.0, 3.0) < 0.0);
    }

    #[test]
    fn test_follows_corner() {
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(30, 30).unwrap());
        let controller = PurePursuitController::new(PurePursuitConfig::default(), map);
        let goal = Point2D::new(20.0, 20.0);
        let outcome = controller.follow_trajectory(Pose2D::new(2.0, 2.0, 0.0), &l_shaped(), goal);
        assert!(outcome.reached);
        assert!(outcome.trajectory.last().unwrap().distance(&goal) <= controller.goal_tolerance());
        assert!((outcome.distance_traveled - outcome.trajectory.total_length()).abs() < 1e-9);
        // cutting the corner keeps it below the reference length
        assert!(outcome.distance_traveled < 37.0);
    }

    #[test]
    fn test_name_and_tolerance() {
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(5, 5).unwrap());
        let mut config = PurePursuitConfig::default();
        config.tracking.goal_tolerance = 0.5;
        let controller = PurePursuitController::new(config, map);
        assert_eq!(controller.name(), "pure_pursuit");
        assert_eq!(controller.goal_tolerance(), 0.5);
        assert!((controller.lookahead(2.0) - 3.2).abs() < 1e-12);
    }
}
