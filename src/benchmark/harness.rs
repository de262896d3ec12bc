//! Repeated planner + controller trials and per-policy aggregates
//!
//! All routes are planned up front, then every policy runs trial `i` against
//! route `i`. Only the controller call is timed. A failed trial is counted and
//! the batch carries on; means are taken over the successful trials.

use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::common::{MapProvider, NamedController, PlanOutcome, Pose2D, RoboticsError, RoboticsResult, RoutePlanner};
use crate::utils::transform_trajectory_with_angles;

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub trials_per_policy: usize,
    pub start: Pose2D,
    pub goal: Pose2D,
    /// Planning attempts per trial before the run is abandoned
    pub max_plan_attempts: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            trials_per_policy: 5,
            start: Pose2D::new(3.0, 5.0, 0.0),
            goal: Pose2D::new(15.0, 15.0, 0.0),
            max_plan_attempts: 3,
        }
    }
}

/// Aggregates of one policy over all its trials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyStats {
    pub name: String,
    pub trials: usize,
    pub fail_count: usize,
    /// Mean controller time over successful trials [s]
    pub mean_time: Option<f64>,
    /// Mean distance traveled over successful trials [m]
    pub mean_distance: Option<f64>,
    #[serde(skip)]
    total_time: Duration,
    #[serde(skip)]
    total_distance: f64,
}

impl PolicyStats {
    pub fn new(name: &str) -> Self {
        PolicyStats {
            name: name.to_string(),
            trials: 0,
            fail_count: 0,
            mean_time: None,
            mean_distance: None,
            total_time: Duration::from_secs(0),
            total_distance: 0.0,
        }
    }

    pub fn record(&mut self, reached: bool, elapsed: Duration, distance: f64) {
        self.trials += 1;
        if !reached {
            self.fail_count += 1;
            return;
        }
        self.total_time += elapsed;
        self.total_distance += distance;
        let successes = self.successes() as f64;
        self.mean_time = Some(self.total_time.as_secs_f64() / successes);
        self.mean_distance = Some(self.total_distance / successes);
    }

    pub fn successes(&self) -> usize {
        self.trials - self.fail_count
    }
}

/// Per-policy results in the order the policies were given
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchmarkReport {
    policies: Vec<PolicyStats>,
}

impl BenchmarkReport {
    pub fn from_stats(policies: Vec<PolicyStats>) -> Self {
        BenchmarkReport { policies }
    }

    pub fn policies(&self) -> &[PolicyStats] {
        &self.policies
    }

    pub fn get(&self, name: &str) -> Option<&PolicyStats> {
        self.policies.iter().find(|s| s.name == name)
    }

    pub fn fail_counts(&self) -> Vec<(&str, usize)> {
        self.policies.iter().map(|s| (s.name.as_str(), s.fail_count)).collect()
    }

    /// Ascending mean time; policies without a success come last
    pub fn ranking_by_time(&self) -> Vec<&PolicyStats> {
        Self::rank(&self.policies, |s| s.mean_time)
    }

    /// Ascending mean distance; policies without a success come last
    pub fn ranking_by_distance(&self) -> Vec<&PolicyStats> {
        Self::rank(&self.policies, |s| s.mean_distance)
    }

    fn rank<F>(policies: &[PolicyStats], key: F) -> Vec<&PolicyStats>
    where
        F: Fn(&PolicyStats) -> Option<f64>,
    {
        policies
            .iter()
            .sorted_by_key(|s| {
                let k = key(s);
                (k.is_none(), k.map(OrderedFloat))
            })
            .collect()
    }
}

fn plan_trial(
    map: &dyn MapProvider,
    planner: &dyn RoutePlanner,
    config: &BenchmarkConfig,
    trial: usize,
) -> RoboticsResult<PlanOutcome> {
    for attempt in 0..config.max_plan_attempts.max(1) {
        let plan = planner.search_route(config.start, config.goal, map)?;
        if plan.reached {
            return Ok(plan);
        }
        warn!("trial {}: planning attempt {} found no route", trial, attempt + 1);
    }
    Err(RoboticsError::PlanningError(format!(
        "no route from ({:.1}, {:.1}) to ({:.1}, {:.1}) after {} attempts",
        config.start.x, config.start.y, config.goal.x, config.goal.y, config.max_plan_attempts.max(1)
    )))
}

/// Run every policy `trials_per_policy` times and aggregate the results.
/// Statistics are filed under the name each policy is paired with.
pub fn run_benchmark(
    map: &dyn MapProvider,
    planner: &dyn RoutePlanner,
    controllers: &[NamedController],
    config: &BenchmarkConfig,
) -> RoboticsResult<BenchmarkReport> {
    let plans = (0..config.trials_per_policy)
        .map(|trial| plan_trial(map, planner, config, trial))
        .collect::<RoboticsResult<Vec<_>>>()?;
    let references: Vec<_> = plans
        .iter()
        .map(|plan| transform_trajectory_with_angles(&plan.trajectory))
        .collect();
    let goal = config.goal.position();

    let mut policies = Vec::with_capacity(controllers.len());
    for (name, controller) in controllers {
        let mut stats = PolicyStats::new(name);
        for (trial, reference) in references.iter().enumerate() {
            let started = Instant::now();
            let outcome = controller.follow_trajectory(config.start, reference, goal);
            let elapsed = started.elapsed();
            debug!(
                "{} trial {}: reached={} distance={:.3} time={:.4}s",
                name, trial, outcome.reached, outcome.distance_traveled, elapsed.as_secs_f64()
            );
            stats.record(outcome.reached, elapsed, outcome.distance_traveled);
        }
        info!(
            "{}: {} of {} trials failed, mean time {:?}, mean distance {:?}",
            stats.name, stats.fail_count, stats.trials, stats.mean_time, stats.mean_distance
        );
        policies.push(stats);
    }

    Ok(BenchmarkReport::from_stats(policies))
}
