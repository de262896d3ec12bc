// Model Predictive Control (MPC) for path tracking
//
// Note: no QP solver. The horizon is rolled out through the nonlinear
// bicycle model and the control sequence is improved by projected gradient
// descent, with gradients from the linearised model (adjoint pass) and a
// backtracking step size. The sequence is warm-started from a pure pursuit
// rollout so the optimiser only refines a feasible guess.

use nalgebra::{Matrix4, Matrix4x2, Vector2, Vector4};

use crate::common::{normalize_angle, ControllerPolicy, MapProvider, Point2D, Pose2D, SharedMap, TrackingOutcome};
use crate::path_tracking::pure_pursuit::pure_pursuit_steer_control;
use crate::path_tracking::tracking::{
    proportional_control, run_tracking_loop, ControlCommand, ControlLaw, TrackingConfig,
    TrackingContext, VehicleState,
};

/// Extra per-state cost and its gradient with respect to the state
pub(crate) type StateCost<'a> = &'a dyn Fn(&Vector4<f64>) -> (f64, Vector4<f64>);

#[derive(Debug, Clone)]
pub struct MpcConfig {
    pub tracking: TrackingConfig,
    /// Prediction horizon [steps]
    pub horizon: usize,
    /// State cost [x, y, v, yaw]
    pub q: [f64; 4],
    /// Control cost [accel, steer]
    pub r: [f64; 2],
    /// Control rate cost [accel, steer]
    pub rd: [f64; 2],
    /// Max steering rate [rad/s]
    pub max_dsteer: f64,
    /// Gradient iterations per control step
    pub iterations: usize,
    /// Initial step length in control space
    pub step_size: f64,
    /// Lookahead of the pure pursuit warm start [m]
    pub warm_start_lookahead: f64,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            horizon: 10,
            q: [1.0, 1.0, 0.5, 0.5],
            r: [0.01, 0.01],
            rd: [0.01, 1.0],
            max_dsteer: 30.0_f64.to_radians(),
            iterations: 10,
            step_size: 0.5,
            warm_start_lookahead: 3.0,
        }
    }
}

/// Get linearized state-space matrices at operating point, state [x, y, v, yaw]
pub fn get_linear_model_matrix(v: f64, phi: f64, delta: f64, dt: f64, wb: f64) -> (Matrix4<f64>, Matrix4x2<f64>) {
    let a = Matrix4::new(
        1.0, 0.0, dt * phi.cos(), -dt * v * phi.sin(),
        0.0, 1.0, dt * phi.sin(), dt * v * phi.cos(),
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, dt * delta.tan() / wb, 1.0,
    );

    let b = Matrix4x2::new(
        0.0, 0.0,
        0.0, 0.0,
        dt, 0.0,
        0.0, dt * v / (wb * delta.cos().powi(2)),
    );

    (a, b)
}

/// Nonlinear rollout, `x0` followed by one state per control
pub fn predict_motion(x0: &Vector4<f64>, u: &[Vector2<f64>], dt: f64, wb: f64) -> Vec<Vector4<f64>> {
    let mut xs = Vec::with_capacity(u.len() + 1);
    xs.push(*x0);
    for ui in u {
        let x = xs[xs.len() - 1];
        xs.push(Vector4::new(
            x[0] + x[2] * x[3].cos() * dt,
            x[1] + x[2] * x[3].sin() * dt,
            x[2] + ui[0] * dt,
            x[3] + x[2] / wb * ui[1].tan() * dt,
        ));
    }
    xs
}

fn state_vector(state: &VehicleState) -> Vector4<f64> {
    Vector4::new(state.x, state.y, state.v, state.yaw)
}

/// Reference states over the horizon. The station advances with a speed
/// profile that ramps from the current speed to `v_ref` at the acceleration
/// limit, so a vehicle at standstill is not asked to jump ahead.
pub(crate) fn calc_ref_trajectory(
    state: &VehicleState,
    ctx: &TrackingContext<'_>,
    horizon: usize,
    v_ref: f64,
) -> Vec<Vector4<f64>> {
    let dt = ctx.config.dt;
    let mut xref = Vec::with_capacity(horizon + 1);
    let mut s = ctx.station();
    let mut v = state.v;
    let p = ctx.reference.sample(s);
    xref.push(Vector4::new(p.x, p.y, v, p.yaw));
    for _ in 0..horizon {
        v = if v < v_ref {
            (v + ctx.config.max_accel * dt).min(v_ref)
        } else {
            (v - ctx.config.max_accel * dt).max(v_ref)
        };
        s += v * dt;
        let p = ctx.reference.sample(s);
        xref.push(Vector4::new(p.x, p.y, v, p.yaw));
    }
    xref
}

/// Roll a feedback law forward through the model, returning its commands
pub(crate) fn rollout_commands<F>(
    state: &VehicleState,
    ctx: &TrackingContext<'_>,
    horizon: usize,
    mut law: F,
) -> Vec<Vector2<f64>>
where
    F: FnMut(&VehicleState, &TrackingContext<'_>) -> ControlCommand,
{
    let config = ctx.config;
    let window = config.search_window();
    let mut sim = *state;
    let mut nearest = ctx.nearest_index;
    let mut commands = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let (index, error) = ctx.reference.nearest_index(sim.position(), nearest, window);
        nearest = index;
        let step_ctx = TrackingContext {
            reference: ctx.reference,
            goal: ctx.goal,
            map: ctx.map,
            config,
            nearest_index: index,
            tracking_error: error,
        };
        let command = law(&sim, &step_ctx);
        let accel = command.accel.clamp(-config.max_accel, config.max_accel);
        let steer = command.steer.clamp(-config.max_steer, config.max_steer);
        commands.push(Vector2::new(accel, steer));
        sim.update(accel, steer, config.dt);
        sim.v = sim.v.max(0.0);
    }
    commands
}

/// One finite-horizon tracking problem
pub(crate) struct MpcProblem<'a> {
    x0: Vector4<f64>,
    xref: Vec<Vector4<f64>>,
    q: Vector4<f64>,
    r: Vector2<f64>,
    rd: Vector2<f64>,
    dt: f64,
    wb: f64,
    max_accel: f64,
    max_steer: f64,
    max_dsteer: f64,
    state_cost: Option<StateCost<'a>>,
}

impl<'a> MpcProblem<'a> {
    fn state_error(&self, x: &Vector4<f64>, k: usize) -> Vector4<f64> {
        let mut e = x - self.xref[k];
        e[3] = normalize_angle(x[3] - self.xref[k][3]);
        e
    }

    pub(crate) fn horizon(&self) -> usize {
        self.xref.len() - 1
    }

    pub(crate) fn cost(&self, u: &[Vector2<f64>]) -> f64 {
        let xs = predict_motion(&self.x0, u, self.dt, self.wb);
        let mut cost = 0.0;
        for k in 1..xs.len() {
            let e = self.state_error(&xs[k], k);
            cost += e.component_mul(&self.q).dot(&e);
            if let Some(extra) = self.state_cost {
                cost += extra(&xs[k]).0;
            }
        }
        for (k, uk) in u.iter().enumerate() {
            cost += uk.component_mul(&self.r).dot(uk);
            if k > 0 {
                let du = uk - u[k - 1];
                cost += du.component_mul(&self.rd).dot(&du);
            }
        }
        cost
    }

    /// Gradient of `cost` by a backward (adjoint) pass over the linearised model
    fn gradient(&self, u: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
        let n = u.len();
        let xs = predict_motion(&self.x0, u, self.dt, self.wb);
        let mut grad = vec![Vector2::zeros(); n];
        let mut lambda = self.stage_gradient(&xs[n], n);
        for k in (0..n).rev() {
            let (a, b) = get_linear_model_matrix(xs[k][2], xs[k][3], u[k][1], self.dt, self.wb);
            let mut g = b.transpose() * lambda + 2.0 * u[k].component_mul(&self.r);
            if k > 0 {
                g += 2.0 * (u[k] - u[k - 1]).component_mul(&self.rd);
            }
            if k + 1 < n {
                g -= 2.0 * (u[k + 1] - u[k]).component_mul(&self.rd);
            }
            grad[k] = g;
            if k > 0 {
                lambda = self.stage_gradient(&xs[k], k) + a.transpose() * lambda;
            }
        }
        grad
    }

    fn stage_gradient(&self, x: &Vector4<f64>, k: usize) -> Vector4<f64> {
        let mut g = 2.0 * self.state_error(x, k).component_mul(&self.q);
        if let Some(extra) = self.state_cost {
            g += extra(x).1;
        }
        g
    }

    /// Clamp to the actuator limits and the steering rate limit
    pub(crate) fn project(&self, u: &mut [Vector2<f64>]) {
        let max_step = self.max_dsteer * self.dt;
        for i in 0..u.len() {
            u[i][0] = u[i][0].clamp(-self.max_accel, self.max_accel);
            u[i][1] = u[i][1].clamp(-self.max_steer, self.max_steer);
            if i > 0 {
                let d_steer = u[i][1] - u[i - 1][1];
                if d_steer.abs() > max_step {
                    u[i][1] = u[i - 1][1] + max_step * d_steer.signum();
                }
            }
        }
    }

    /// Projected gradient descent from `u`. The returned sequence never
    /// costs more than the projected warm start.
    pub(crate) fn solve(&self, mut u: Vec<Vector2<f64>>, iterations: usize, step_size: f64) -> Vec<Vector2<f64>> {
        self.project(&mut u);
        let mut cost = self.cost(&u);
        let mut step = step_size;
        for _ in 0..iterations {
            let grad = self.gradient(&u);
            let norm = grad.iter().map(|g| g.norm_squared()).sum::<f64>().sqrt();
            if !norm.is_finite() || norm < 1e-9 {
                break;
            }
            let mut accepted = false;
            for _ in 0..6 {
                let mut candidate: Vec<Vector2<f64>> = u
                    .iter()
                    .zip(grad.iter())
                    .map(|(ui, gi)| ui - gi * (step / norm))
                    .collect();
                self.project(&mut candidate);
                let candidate_cost = self.cost(&candidate);
                if candidate_cost < cost {
                    u = candidate;
                    cost = candidate_cost;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }
            if !accepted {
                break;
            }
        }
        u
    }
}

pub struct MpcController {
    config: MpcConfig,
    map: SharedMap,
}

impl MpcController {
    pub fn new(config: MpcConfig, map: SharedMap) -> Self {
        MpcController { config, map }
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    pub(crate) fn map(&self) -> &dyn MapProvider {
        self.map.as_ref()
    }

    pub(crate) fn problem<'a>(
        &self,
        state: &VehicleState,
        ctx: &TrackingContext<'_>,
        v_ref: f64,
        q: Vector4<f64>,
        state_cost: Option<StateCost<'a>>,
    ) -> MpcProblem<'a> {
        let tracking = &self.config.tracking;
        MpcProblem {
            x0: state_vector(state),
            xref: calc_ref_trajectory(state, ctx, self.config.horizon.max(1), v_ref),
            q,
            r: Vector2::new(self.config.r[0], self.config.r[1]),
            rd: Vector2::new(self.config.rd[0], self.config.rd[1]),
            dt: tracking.dt,
            wb: tracking.wheelbase,
            max_accel: tracking.max_accel,
            max_steer: tracking.max_steer,
            max_dsteer: self.config.max_dsteer,
            state_cost,
        }
    }

    pub(crate) fn base_weights(&self) -> Vector4<f64> {
        Vector4::new(self.config.q[0], self.config.q[1], self.config.q[2], self.config.q[3])
    }

    pub(crate) fn warm_start(&self, state: &VehicleState, ctx: &TrackingContext<'_>, horizon: usize) -> Vec<Vector2<f64>> {
        let lookahead = self.config.warm_start_lookahead;
        rollout_commands(state, ctx, horizon, |s, c| {
            ControlCommand::new(
                proportional_control(c.desired_speed(s), s.v, c.config.speed_gain),
                pure_pursuit_steer_control(s, c.reference, c.station(), lookahead),
            )
        })
    }

    /// Optimised control sequence for `problem`
    pub(crate) fn optimize(&self, problem: &MpcProblem<'_>, state: &VehicleState, ctx: &TrackingContext<'_>) -> Vec<Vector2<f64>> {
        let warm = self.warm_start(state, ctx, problem.horizon());
        problem.solve(warm, self.config.iterations, self.config.step_size)
    }
}

pub(crate) fn first_command(u: &[Vector2<f64>]) -> ControlCommand {
    match u.first() {
        Some(u0) => ControlCommand::new(u0[0], u0[1]),
        None => ControlCommand::new(0.0, 0.0),
    }
}

impl ControlLaw for MpcController {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand {
        let problem = self.problem(state, ctx, ctx.desired_speed(state), self.base_weights(), None);
        first_command(&self.optimize(&problem, state, ctx))
    }
}

impl ControllerPolicy for MpcController {
    fn name(&self) -> &str {
        "mpc_basic"
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

    fn straight(n: usize) -> Vec<Pose2D> {
        let xs: Vec<f64> = (0..n).map(|x| x as f64).collect();
        transform_trajectory_with_angles(&transform_trajectory(&xs, &vec![5.0; n]))
    }

    fn context<'a>(map: &'a ObstacleGridMap, config: &'a TrackingConfig, reference: &'a ReferencePath) -> TrackingContext<'a> {
        TrackingContext {
            reference,
            goal: Point2D::new(19.0, 5.0),
            map,
            config,
            nearest_index: 0,
            tracking_error: 0.5,
        }
    }

    #[test]
    fn test_linear_model_matches_finite_difference() {
        let (dt, wb) = (0.1, 2.5);
        let x = Vector4::new(1.0, 2.0, 1.5, 0.3);
        let u = Vector2::new(0.2, 0.1);
        let (a, b) = get_linear_model_matrix(x[2], x[3], u[1], dt, wb);
        let f = |x: Vector4<f64>, u: Vector2<f64>| predict_motion(&x, &[u], dt, wb)[1];
        let h = 1e-6;
        for j in 0..4 {
            let mut dx = Vector4::zeros();
            dx[j] = h;
            let col = (f(x + dx, u) - f(x - dx, u)) / (2.0 * h);
            assert!((col - a.column(j)).norm() < 1e-6);
        }
        for j in 0..2 {
            let mut du = Vector2::zeros();
            du[j] = h;
            let col = (f(x, u + du) - f(x, u - du)) / (2.0 * h);
            assert!((col - b.column(j)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let map = ObstacleGridMap::empty(20, 10).unwrap();
        let config = TrackingConfig::default();
        let reference = ReferencePath::new(&straight(20));
        let ctx = context(&map, &config, &reference);
        let controller = MpcController::new(MpcConfig::default(), Arc::new(ObstacleGridMap::empty(20, 10).unwrap()));
        let state = VehicleState::new(0.0, 4.5, 0.1, 1.0, 2.5);
        let problem = controller.problem(&state, &ctx, 2.0, controller.base_weights(), None);

        let u: Vec<Vector2<f64>> = (0..problem.horizon()).map(|k| Vector2::new(0.3, 0.05 * k as f64)).collect();
        let grad = problem.gradient(&u);
        let h = 1e-6;
        for k in [0usize, 4, 9].iter() {
            for j in 0..2 {
                let mut up = u.clone();
                let mut dn = u.clone();
                up[*k][j] += h;
                dn[*k][j] -= h;
                let numeric = (problem.cost(&up) - problem.cost(&dn)) / (2.0 * h);
                assert!((numeric - grad[*k][j]).abs() < 1e-4, "k={} j={}", k, j);
            }
        }
    }

    #[test]
    fn test_solve_respects_limits_and_improves() {
        let map = ObstacleGridMap::empty(20, 10).unwrap();
        let config = TrackingConfig::default();
        let reference = ReferencePath::new(&straight(20));
        let ctx = context(&map, &config, &reference);
        let controller = MpcController::new(MpcConfig::default(), Arc::new(ObstacleGridMap::empty(20, 10).unwrap()));
        let state = VehicleState::new(0.0, 4.0, 0.2, 0.5, 2.5);
        let problem = controller.problem(&state, &ctx, 2.0, controller.base_weights(), None);

        let mut warm = controller.warm_start(&state, &ctx, problem.horizon());
        problem.project(&mut warm);
        let warm_cost = problem.cost(&warm);
        let u = problem.solve(warm, 10, 0.5);
        assert!(problem.cost(&u) <= warm_cost);

        let max_step = MpcConfig::default().max_dsteer * config.dt + 1e-12;
        for (k, uk) in u.iter().enumerate() {
            assert!(uk[0].abs() <= config.max_accel + 1e-12);
            assert!(uk[1].abs() <= config.max_steer + 1e-12);
            if k > 0 {
                assert!((uk[1] - u[k - 1][1]).abs() <= max_step);
            }
        }
    }

    #[test]
    fn test_tracks_straight_line() {
        let map: SharedMap = Arc::new(ObstacleGridMap::empty(25, 10).unwrap());
        let controller = MpcController::new(MpcConfig::default(), map);
        let goal = Point2D::new(19.0, 5.0);
        let outcome = controller.follow_trajectory(Pose2D::new(0.0, 4.0, 0.0), &straight(20), goal);
        assert!(outcome.reached);
        assert!(outcome.trajectory.last().unwrap().distance(&goal) <= controller.goal_tolerance());
        assert_eq!(controller.name(), "mpc_basic");
    }
}
