// MPC that trades tracking accuracy against obstacle clearance. Every
// predicted state closer than the influence distance to an obstacle pays a
// quadratic penalty, which bends the rollout away from nearby obstacles.

use nalgebra::Vector4;

use crate::common::{ControllerPolicy, MapProvider, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::mapping::Obstacle;
use crate::path_tracking::mpc::{first_command, MpcConfig, MpcController};
use crate::path_tracking::tracking::{run_tracking_loop, ControlCommand, ControlLaw, TrackingContext, VehicleState};

#[derive(Debug, Clone)]
pub struct MultiPurposeMpcConfig {
    pub mpc: MpcConfig,
    /// Clearance penalty weight
    pub obstacle_weight: f64,
    /// Clearance below which the penalty applies [m]
    pub influence_distance: f64,
}

impl Default for MultiPurposeMpcConfig {
    fn default() -> Self {
        Self {
            mpc: MpcConfig::default(),
            obstacle_weight: 2.0,
            influence_distance: 1.5,
        }
    }
}

/// `w * (d0 - d)^2` summed over obstacles closer than `d0`, and its gradient
/// with respect to the state [x, y, v, yaw].
pub fn obstacle_cost(obstacles: &[Obstacle], weight: f64, influence: f64, x: &Vector4<f64>) -> (f64, Vector4<f64>) {
    let p = Point2D::new(x[0], x[1]);
    let mut cost = 0.0;
    let mut grad = Vector4::zeros();
    for obstacle in obstacles {
        let closest = obstacle.closest_point(p);
        let d = p.distance(&closest);
        if d >= influence {
            continue;
        }
        let gap = influence - d;
        cost += weight * gap * gap;
        // no direction inside the obstacle
        if d > 1e-9 {
            let scale = -2.0 * weight * gap / d;
            grad[0] += scale * (p.x - closest.x);
            grad[1] += scale * (p.y - closest.y);
        }
    }
    (cost, grad)
}

pub struct MultiPurposeMpcController {
    config: MultiPurposeMpcConfig,
    mpc: MpcController,
}

impl MultiPurposeMpcController {
    pub fn new(config: MultiPurposeMpcConfig, map: SharedMap) -> Self {
        let mpc = MpcController::new(config.mpc.clone(), map);
        MultiPurposeMpcController { config, mpc }
    }

    pub fn config(&self) -> &MultiPurposeMpcConfig {
        &self.config
    }
}

impl ControlLaw for MultiPurposeMpcController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        let obstacles = ctx.map.obstacles();
        let (weight, influence) = (self.config.obstacle_weight, self.config.influence_distance);
        let clearance = move |x: &Vector4<f64>| obstacle_cost(obstacles, weight, influence, x);

        let problem = self.mpc.problem(state, ctx, ctx.desired_speed(state), self.mpc.base_weights(), Some(&clearance));
        first_command(&self.mpc.optimize(&problem, state, ctx))
    }
}

impl ControllerPolicy for MultiPurposeMpcController {
    fn name(&self) -> &str {
        "multi_purpose_mpc"
    }

    fn goal_tolerance(&self) -> f64 {
        self.config.mpc.tracking.goal_tolerance
    }

    fn follow_trajectory(&self, start: Pose2D, reference: &[Pose2D], goal: Point2D) -> TrackingOutcome {
        run_tracking_loop(self, &self.config.mpc.tracking, self.mpc.map(), start, reference, goal, self.name())
    }
}
