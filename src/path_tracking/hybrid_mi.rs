// Hybrid controller with a discrete mode choice.
//
// Each step picks one of a small set of driving modes, the integer part of
// a mixed-integer problem, by rolling every mode out over the horizon and
// scoring it with the MPC cost. The continuous part is whatever the winning
// mode computes.

use log::trace;

use crate::common::{ControllerPolicy, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::path_tracking::mpc::{first_command, rollout_commands, MpcConfig, MpcController};
use crate::path_tracking::pure_pursuit::pure_pursuit_steer_control;
use crate::path_tracking::stanley_controller::stanley_steer_control;
use crate::path_tracking::tracking::{
    proportional_control, run_tracking_loop, ControlCommand, ControlLaw, TrackingContext, VehicleState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivingMode {
    Mpc,
    Stanley,
    PurePursuit,
}

#[derive(Debug, Clone)]
pub struct HybridMiConfig {
    pub mpc: MpcConfig,
    pub stanley_gain: f64,
    pub stanley_softening: f64,
    /// Lookahead of the pure pursuit mode [m]
    pub lookahead_distance: f64,
    /// Cost multiplier applied to every mode except the MPC mode, >= 1 biases
    /// the choice towards the optimiser
    pub feedback_penalty: f64,
}

impl Default for HybridMiConfig {
    fn default() -> Self {
        Self {
            mpc: MpcConfig::default(),
            stanley_gain: 0.5,
            stanley_softening: 1.0,
            lookahead_distance: 2.0,
            feedback_penalty: 1.0,
        }
    }
}

pub struct HybridMiController {
    config: HybridMiConfig,
    mpc: MpcController,
}

impl HybridMiController {
    pub fn new(config: HybridMiConfig, map: SharedMap) -> Self {
        let mpc = MpcController::new(config.mpc.clone(), map);
        HybridMiController { config, mpc }
    }

    pub fn config(&self) -> &HybridMiConfig {
        &self.config
    }

    /// Mode with the cheapest horizon rollout and its command
    pub fn select_mode(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> (DrivingMode, ControlCommand) {
        let v_ref = ctx.desired_speed(state);
        let problem = self.mpc.problem(state, ctx, v_ref, self.mpc.base_weights(), None);
        let horizon = problem.horizon();

        let (k, softening, lookahead) =
            (self.config.stanley_gain, self.config.stanley_softening, self.config.lookahead_distance);
        let stanley = rollout_commands(state, ctx, horizon, |s, c| {
            ControlCommand::new(
                proportional_control(c.desired_speed(s), s.v, c.config.speed_gain),
                stanley_steer_control(s, c, k, softening),
            )
        });
        let pursuit = rollout_commands(state, ctx, horizon, |s, c| {
            ControlCommand::new(
                proportional_control(c.desired_speed(s), s.v, c.config.speed_gain),
                pure_pursuit_steer_control(s, c.reference, c.station(), lookahead),
            )
        });
        let optimised = self.mpc.optimize(&problem, state, ctx);

        let penalty = self.config.feedback_penalty;
        let candidates = [
            (DrivingMode::Mpc, problem.cost(&optimised), &optimised),
            (DrivingMode::Stanley, penalty * problem.cost(&stanley), &stanley),
            (DrivingMode::PurePursuit, penalty * problem.cost(&pursuit), &pursuit),
        ];
        let mut best = 0;
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.1 < candidates[best].1 {
                best = i;
            }
        }
        trace!(
            "mode costs mpc={:.3} stanley={:.3} pursuit={:.3}, chose {:?}",
            candidates[0].1, candidates[1].1, candidates[2].1, candidates[best].0
        );
        (candidates[best].0, first_command(candidates[best].2))
    }
}

impl ControlLaw for HybridMiController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        self.select_mode(state, ctx).1
    }
}

impl ControllerPolicy for HybridMiController {
    fn name(&self) -> &str {
        "hybrid_mi"
    }

    fn goal_tolerance(&self) -> f64 {
        self.config.mpc.tracking.goal_tolerance
    }

    fn follow_trajectory(&self, start: Pose2D, reference: &[Pose2D], goal: Point2D) -> TrackingOutcome {
        run_tracking_loop(self, &self.config.mpc.tracking, self.mpc.map(), start, reference, goal, self.name())
    }
}
