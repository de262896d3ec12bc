// MPC whose reference speed and lateral weights follow the situation: slower
// into curves, stiffer position tracking when the vehicle has drifted.

use crate::common::{ControllerPolicy, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::path_tracking::mpc::{first_command, MpcConfig, MpcController};
use crate::path_tracking::tracking::{run_tracking_loop, ControlCommand, ControlLaw, TrackingContext, VehicleState};

#[derive(Debug, Clone)]
pub struct AdaptiveMpcConfig {
    pub mpc: MpcConfig,
    /// Speed reduction per rad/m of heading change ahead
    pub curvature_gain: f64,
    /// Arc length over which curvature is measured [m]
    pub curvature_window: f64,
    /// Position weight growth per metre of tracking error
    pub error_gain: f64,
    /// Lower bound of the adapted speed as a fraction of the desired speed
    pub min_speed_ratio: f64,
}

impl Default for AdaptiveMpcConfig {
    fn default() -> Self {
        Self {
            mpc: MpcConfig::default(),
            curvature_gain: 2.0,
            curvature_window: 5.0,
            error_gain: 1.0,
            min_speed_ratio: 0.4,
        }
    }
}

pub struct AdaptiveMpcController {
    config: AdaptiveMpcConfig,
    mpc: MpcController,
}

impl AdaptiveMpcController {
    pub fn new(config: AdaptiveMpcConfig, map: SharedMap) -> Self {
        let mpc = MpcController::new(config.mpc.clone(), map);
        AdaptiveMpcController { config, mpc }
    }

    pub fn config(&self) -> &AdaptiveMpcConfig {
        &self.config
    }

    /// Desired speed scaled down by the curvature ahead
    pub(crate) fn adapted_speed(&self, desired: f64, curvature: f64) -> f64 {
        let scaled = desired / (1.0 + self.config.curvature_gain * curvature.max(0.0));
        scaled.max(self.config.min_speed_ratio * desired)
    }
}

impl ControlLaw for AdaptiveMpcController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        let curvature = ctx.reference.curvature_ahead(ctx.station(), self.config.curvature_window);
        let v_ref = self.adapted_speed(ctx.desired_speed(state), curvature);

        let mut q = self.mpc.base_weights();
        let stiffening = 1.0 + self.config.error_gain * ctx.tracking_error;
        q[0] *= stiffening;
        q[1] *= stiffening;

        let problem = self.mpc.problem(state, ctx, v_ref, q, None);
        first_command(&self.mpc.optimize(&problem, state, ctx))
    }
}

impl ControllerPolicy for AdaptiveMpcController {
    fn name(&self) -> &str {
        "adaptive_mpc"
    }

    fn goal_tolerance(&self) -> f64 {
        self.config.mpc.tracking.goal_tolerance
    }

    fn follow_trajectory(&self, start: Pose2D, reference: &[Pose2D], goal: Point2D) -> TrackingOutcome {
        let tracking = &self.config.mpc.tracking;
        run_tracking_loop(self, tracking, self.mpc.map(), start, reference, goal, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ObstacleGridMap;
    use crate::utils::{transform_trajectory, transform_trajectory_with_angles};
    use std::sync::Arc;

    #[test]
    fn test_adapted_speed() {
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(5, 5).unwrap());
        let controller = AdaptiveMpcController::new(AdaptiveMpcConfig::default(), map);
        assert!((controller.adapted_speed(2.0, 0.0) - 2.0).abs() < 1e-12);
        assert!(controller.adapted_speed(2.0, 0.2) < 2.0);
        assert!((controller.adapted_speed(2.0, 100.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_follows_corner() {
        let mut xs: Vec<f64> = (2..=16).map(|x| x as f64).collect();
        let mut ys = vec![2.0; xs.len()];
        for y in 3..=16 {
            xs.push(16.0);
            ys.push(y as f64);
        }
        let reference = transform_trajectory_with_angles(&transform_trajectory(&xs, &ys));
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(25, 25).unwrap());
        let controller = AdaptiveMpcController::new(AdaptiveMpcConfig::default(), map);
        let goal = Point2D::new(16.0, 16.0);
        let outcome = controller.follow_trajectory(Pose2D::new(2.0, 2.0, 0.0), &reference, goal);
        assert!(outcome.reached);
        assert!(outcome.trajectory.last().unwrap().distance(&goal) <= controller.goal_tolerance());
        assert_eq!(controller.name(), "adaptive_mpc");
    }
}
