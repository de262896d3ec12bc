//! Shared closed-loop simulation for every tracking policy
//!
//! A policy only supplies a [`ControlLaw`] mapping the current vehicle state
//! and the reference path to an acceleration/steering command. Stepping the
//! bicycle model, goal detection and every failure mode (timeout,
//! divergence, collision) live here, so all policies terminate the same way.

use log::debug;

use crate::common::{MapProvider, Path2D, Point2D, Pose2D, TrackingOutcome};
use crate::utils::ReferencePath;

/// Vehicle state on the rear axle, kinematic bicycle model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub v: f64,
    pub wheelbase: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, yaw: f64, v: f64, wheelbase: f64) -> Self {
        VehicleState { x, y, yaw, v, wheelbase }
    }

    /// Update vehicle state using bicycle model kinematics
    pub fn update(&mut self, a: f64, delta: f64, dt: f64) {
        self.x += self.v * self.yaw.cos() * dt;
        self.y += self.v * self.yaw.sin() * dt;
        self.yaw += self.v / self.wheelbase * delta.tan() * dt;
        self.v += a * dt;
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn front_axle(&self) -> Point2D {
        Point2D::new(
            self.x + self.wheelbase * self.yaw.cos(),
            self.y + self.wheelbase * self.yaw.sin(),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite() && self.v.is_finite()
    }
}

/// Acceleration and steering angle applied for one time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    pub accel: f64,
    pub steer: f64,
}

impl ControlCommand {
    pub fn new(accel: f64, steer: f64) -> Self {
        ControlCommand { accel, steer }
    }
}

/// Configuration shared by every tracking policy
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Simulation time step [s]
    pub dt: f64,
    /// Vehicle wheelbase [m]
    pub wheelbase: f64,
    /// Cruise speed [m/s]
    pub target_speed: f64,
    /// Arrival radius around the goal [m]
    pub goal_tolerance: f64,
    /// Simulated time budget [s]
    pub max_time: f64,
    /// Maximum steering angle [rad]
    pub max_steer: f64,
    /// Maximum acceleration magnitude [m/s^2]
    pub max_accel: f64,
    /// Speed proportional gain
    pub speed_gain: f64,
    /// Distance from the reference beyond which the run has diverged [m]
    pub max_deviation: f64,
    /// Fail the run when the vehicle crosses an obstacle or leaves the map
    pub check_collisions: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            wheelbase: 2.5,
            target_speed: 10.0 / 3.6,
            goal_tolerance: 1.0,
            max_time: 100.0,
            max_steer: 45.0_f64.to_radians(),
            max_accel: 1.0,
            speed_gain: 1.0,
            max_deviation: 4.0,
            check_collisions: true,
        }
    }
}

impl TrackingConfig {
    pub fn max_steps(&self) -> usize {
        if self.dt > 0.0 && self.max_time.is_finite() {
            (self.max_time / self.dt).ceil() as usize
        } else {
            0
        }
    }

    /// Arc length searched ahead of the last nearest index; the vehicle
    /// covers far less than this between two steps.
    pub fn search_window(&self) -> f64 {
        4.0 * self.target_speed.max(1.0) * self.dt + self.max_deviation
    }
}

/// Everything a control law may read during one step
pub struct TrackingContext<'a> {
    pub reference: &'a ReferencePath,
    pub goal: Point2D,
    pub map: &'a dyn MapProvider,
    pub config: &'a TrackingConfig,
    /// Index of the reference point nearest to the vehicle
    pub nearest_index: usize,
    /// Distance from the vehicle to that point [m]
    pub tracking_error: f64,
}

impl<'a> TrackingContext<'a> {
    /// Cruise speed, reduced linearly inside the last few metres so the
    /// vehicle does not overshoot the goal radius.
    pub fn desired_speed(&self, state: &VehicleState) -> f64 {
        let remaining = state.position().distance(&self.goal);
        let slow_down = 2.0 * self.config.goal_tolerance + self.config.target_speed;
        if remaining >= slow_down {
            self.config.target_speed
        } else {
            (self.config.target_speed * remaining / slow_down).max(0.3 * self.config.target_speed)
        }
    }

    /// Arc length of the nearest reference point
    pub fn station(&self) -> f64 {
        self.reference.station(self.nearest_index)
    }
}

pub fn proportional_control(target: f64, current: f64, kp: f64) -> f64 {
    kp * (target - current)
}

/// Maps (state, reference) to a command. Implementations must not keep
/// state between calls that would leak across runs.
pub trait ControlLaw {
    fn control(&self, state: &VehicleState, ctx: &TrackingContext<'_>) -> ControlCommand;
}

/// Simulate `law` from `start` until arrival or failure.
///
/// The realized trajectory starts with the start position and gains one
/// point per step; `reached` is only true when its last point lies within
/// the goal tolerance.
pub fn run_tracking_loop(
    law: &dyn ControlLaw,
    config: &TrackingConfig,
    map: &dyn MapProvider,
    start: Pose2D,
    reference: &[Pose2D],
    goal: Point2D,
    name: &str,
) -> TrackingOutcome {
    let mut state = VehicleState::new(start.x, start.y, start.yaw, 0.0, config.wheelbase);
    let mut trajectory = Path2D::from_points(vec![state.position()]);

    if reference.is_empty() || !state.is_finite() || !goal.is_finite() {
        debug!("{}: empty reference or non-finite start/goal", name);
        return TrackingOutcome::new(false, trajectory);
    }
    if state.position().distance(&goal) <= config.goal_tolerance {
        return TrackingOutcome::new(true, trajectory);
    }

    let path = ReferencePath::new(reference);
    let search_window = config.search_window();
    let mut progress = 0;

    for step in 0..config.max_steps() {
        let (nearest_index, tracking_error) =
            path.nearest_index(state.position(), progress, search_window);
        progress = nearest_index;
        if tracking_error > config.max_deviation {
            debug!("{}: diverged {:.2} m from the reference at step {}", name, tracking_error, step);
            return TrackingOutcome::new(false, trajectory);
        }

        let ctx = TrackingContext {
            reference: &path,
            goal,
            map,
            config,
            nearest_index,
            tracking_error,
        };
        let command = law.control(&state, &ctx);
        let accel = command.accel.max(-config.max_accel).min(config.max_accel);
        let steer = command.steer.max(-config.max_steer).min(config.max_steer);

        let previous = state.position();
        state.update(accel, steer, config.dt);
        state.v = state.v.max(0.0);
        if !state.is_finite() {
            debug!("{}: non-finite state at step {}", name, step);
            return TrackingOutcome::new(false, trajectory);
        }
        trajectory.push(state.position());

        if config.check_collisions && !map.is_segment_free(previous, state.position()) {
            debug!("{}: collision at ({:.2}, {:.2})", name, state.x, state.y);
            return TrackingOutcome::new(false, trajectory);
        }
        if state.position().distance(&goal) <= config.goal_tolerance {
            debug!("{}: goal reached after {} steps", name, step + 1);
            return TrackingOutcome::new(true, trajectory);
        }
    }

    debug!("{}: time budget of {:.1} s exhausted", name, config.max_time);
    TrackingOutcome::new(false, trajectory)
}
