//
// Path tracking with Stanley steering control and P speed control.
//
// Ref:
//     - [Stanley: The robot that won the DARPA grand challenge](http://isl.ecst.csuchico.edu/DOCS/darpa2005/DARPA%202005%20Stanley.pdf)
//     - [Autonomous Automobile Path Tracking](https://www.ri.cmu.edu/pub_files/2009/2/Automatic_Steering_Methods_for_Autonomous_Automobile_Path_Tracking.pdf)

use std::f64::consts::FRAC_PI_2;

use crate::common::{normalize_angle, ControllerPolicy, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::path_tracking::tracking::{
    proportional_control, run_tracking_loop, ControlCommand, ControlLaw, TrackingConfig,
    TrackingContext, VehicleState,
};

#[derive(Debug, Clone)]
pub struct StanleyConfig {
    pub tracking: TrackingConfig,
    /// Cross-track error gain
    pub k: f64,
    /// Added to the speed in the cross-track term so it stays bounded at standstill [m/s]
    pub softening: f64,
}

impl Default for StanleyConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            k: 0.5,
            softening: 1.0,
        }
    }
}

/// Stanley steering angle: heading error plus the cross-track term at the
/// front axle.
pub(crate) fn stanley_steer_control(
    state: &VehicleState,
    ctx: &TrackingContext<'_>,
    k: f64,
    softening: f64,
) -> f64 {
    let front = state.front_axle();
    let window = state.wheelbase + ctx.config.max_deviation;
    let (target_idx, _) = ctx.reference.nearest_index(front, ctx.nearest_index, window);
    let target = ctx.reference.pose(target_idx);

    let dx = front.x - target.x;
    let dy = front.y - target.y;
    let error_front_axle = -(state.yaw + FRAC_PI_2).cos() * dx - (state.yaw + FRAC_PI_2).sin() * dy;

    let theta_e = normalize_angle(target.yaw - state.yaw);
    let theta_d = (k * error_front_axle).atan2(softening + state.v);
    theta_e + theta_d
}

pub struct StanleyController {
    config: StanleyConfig,
    map: SharedMap,
}

impl StanleyController {
    pub fn new(config: StanleyConfig, map: SharedMap) -> Self {
        StanleyController { config, map }
    }

    pub fn config(&self) -> &StanleyConfig {
        &self.config
    }
}

impl ControlLaw for StanleyController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        let accel = proportional_control(ctx.desired_speed(state), state.v, ctx.config.speed_gain);
        let steer = stanley_steer_control(state, ctx, self.config.k, self.config.softening);
        ControlCommand::new(accel, steer)
    }
}

impl ControllerPolicy for StanleyController {
    fn name(&self) -> &str {
        "stanley"
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
    use crate::utils::{transform_trajectory, transform_trajectory_with_angles, ReferencePath};
    use std::sync::Arc;

    fn straight(y: f64, n: usize) -> Vec<Pose2D> {
        let xs: Vec<f64> = (0..n).map(|x| x as f64).collect();
        transform_trajectory_with_angles(&transform_trajectory(&xs, &vec![y; n]))
    }

    #[test]
    fn test_cross_track_term_steers_back() {
        let map = ObstacleGridMap::empty(20, 20).unwrap();
        let config = TrackingConfig::default();
        let reference = ReferencePath::new(&straight(5.0, 15));
        let ctx = TrackingContext {
            reference: &reference,
            goal: Point2D::new(14.0, 5.0),
            map: &map,
            config: &config,
            nearest_index: 0,
            tracking_error: 1.0,
        };
        // vehicle right of the path steers left and vice versa
        let below = VehicleState::new(0.0, 4.0, 0.0, 1.0, 2.5);
        assert!(stanley_steer_control(&below, &ctx, 0.5, 1.0) > 0.0);
        let above = VehicleState::new(0.0, 6.0, 0.0, 1.0, 2.5);
        assert!(stanley_steer_control(&above, &ctx, 0.5, 1.0) < 0.0);
        let on_path = VehicleState::new(0.0, 5.0, 0.0, 1.0, 2.5);
        assert!(stanley_steer_control(&on_path, &ctx, 0.5, 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_converges_onto_offset_line() {
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(40, 12).unwrap());
        let controller = StanleyController::new(StanleyConfig::default(), map);
        let goal = Point2D::new(35.0, 5.0);
        let outcome = controller.follow_trajectory(Pose2D::new(0.0, 3.5, 0.0), &straight(5.0, 36), goal);
        assert!(outcome.reached);
        assert!(outcome.trajectory.last().unwrap().distance(&goal) <= controller.goal_tolerance());
        assert_eq!(controller.name(), "stanley");
    }
}
