//! A* grid route planner
//!
//! Searches the 8-connected grid of a [`MapProvider`] with a Euclidean
//! heuristic. Moves are accepted only when the straight segment between the
//! two cells crosses no obstacle, so diagonal corner cuts are rejected.
//!
//! The open and closed sets are hash maps keyed by grid index; a binary heap
//! orders the open set. Heap entries that no longer match the open set (the
//! cell was relaxed to a cheaper cost or already closed) are skipped on pop.
//! Ties on `f` are broken by lower `cost`, then lower grid index, which makes
//! the expansion order independent of hash-map iteration order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use log::{debug, info, warn};
use ordered_float::OrderedFloat;

use crate::common::{
    MapProvider, Node, Path2D, PlanOutcome, Pose2D, RoboticsError, RoboticsResult, RoutePlanner,
};
use crate::utils::transform_trajectory;

/// Configuration for A* planner
#[derive(Debug, Clone)]
pub struct AStarConfig {
    /// Heuristic weight (1.0 = optimal, >1.0 = faster but suboptimal)
    pub heuristic_weight: f64,
    /// Expansion cap; `None` uses eight times the number of map cells
    pub max_iterations: Option<usize>,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: 1.0,
            max_iterations: None,
        }
    }
}

/// Read-only view of the search sets handed to observers
pub struct SearchSnapshot<'a> {
    pub open_set: &'a HashMap<usize, Node>,
    pub closed_set: &'a HashMap<usize, Node>,
}

/// Hook invoked for every node selected from the open set.
///
/// The planner never depends on what an observer does.
pub trait SearchObserver {
    fn on_node_expanded(&mut self, node: &Node, snapshot: &SearchSnapshot<'_>);
}

impl SearchObserver for () {
    fn on_node_expanded(&mut self, _node: &Node, _snapshot: &SearchSnapshot<'_>) {}
}

/// Collects expanded cells, e.g. for plotting the search front
#[derive(Debug, Default)]
pub struct ExpansionRecorder {
    pub expanded: Vec<(i32, i32)>,
}

impl SearchObserver for ExpansionRecorder {
    fn on_node_expanded(&mut self, node: &Node, _snapshot: &SearchSnapshot<'_>) {
        self.expanded.push((node.x, node.y));
    }
}

#[derive(Debug)]
struct PriorityNode {
    priority: OrderedFloat<f64>,
    cost: OrderedFloat<f64>,
    index: usize,
}

impl PriorityNode {
    fn key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>, usize) {
        (self.priority, self.cost, self.index)
    }
}

impl Eq for PriorityNode {}

impl PartialEq for PriorityNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Ord for PriorityNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for PriorityNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct AStarPlanner {
    config: AStarConfig,
    motion: Vec<(i32, i32, f64)>,
}

impl AStarPlanner {
    pub fn new(config: AStarConfig) -> Self {
        AStarPlanner { config, motion: Self::get_motion_model() }
    }

    /// Run the search, reporting every expansion to `observer`.
    pub fn search_route_observed(
        &self,
        start: Pose2D,
        goal: Pose2D,
        map: &dyn MapProvider,
        observer: &mut dyn SearchObserver,
    ) -> RoboticsResult<PlanOutcome> {
        let (start_x, start_y) = Self::pose_to_cell(&start, map)?;
        let (goal_x, goal_y) = Self::pose_to_cell(&goal, map)?;
        let max_iterations = self
            .config
            .max_iterations
            .unwrap_or_else(|| map.width() * map.height() * 8);

        let mut open_set: HashMap<usize, Node> = HashMap::new();
        let mut closed_set: HashMap<usize, Node> = HashMap::new();
        let mut queue = BinaryHeap::new();

        let start_index = map.get_grid_index(start_x, start_y)?;
        open_set.insert(start_index, Node::new(start_x, start_y, 0.0, None));
        queue.push(PriorityNode {
            priority: OrderedFloat(self.calc_heuristic(start_x, start_y, goal_x, goal_y)),
            cost: OrderedFloat(0.0),
            index: start_index,
        });

        let mut iteration = 0;
        while let Some(item) = queue.pop() {
            let current = match open_set.get(&item.index) {
                Some(node) if node.cost == item.cost.0 => node.clone(),
                _ => continue,
            };

            iteration += 1;
            if iteration > max_iterations {
                warn!("A* stopped after {} expansions without reaching the goal", max_iterations);
                return Ok(PlanOutcome::not_found());
            }

            observer.on_node_expanded(&current, &SearchSnapshot {
                open_set: &open_set,
                closed_set: &closed_set,
            });

            if current.x == goal_x && current.y == goal_y {
                info!("Find goal after {} expansions, cost {:.3}", iteration, current.cost);
                let trajectory = self.build_path(&current, &closed_set)?;
                return Ok(PlanOutcome::found(trajectory));
            }

            open_set.remove(&item.index);
            closed_set.insert(item.index, current.clone());

            for &(dx, dy, step_cost) in &self.motion {
                let new_x = current.x + dx;
                let new_y = current.y + dy;
                if !map.in_bounds(new_x, new_y) {
                    continue;
                }
                let new_index = map.get_grid_index(new_x, new_y)?;

                if closed_set.contains_key(&new_index) {
                    continue;
                }
                if !map.is_not_crossed_obstacle((current.x, current.y), (new_x, new_y))? {
                    continue;
                }

                let new_node = Node::new(new_x, new_y, current.cost + step_cost, Some(item.index));
                let improves = match open_set.get(&new_index) {
                    Some(existing) => existing.cost > new_node.cost,
                    None => true,
                };
                if improves {
                    queue.push(PriorityNode {
                        priority: OrderedFloat(
                            new_node.cost + self.calc_heuristic(new_x, new_y, goal_x, goal_y),
                        ),
                        cost: OrderedFloat(new_node.cost),
                        index: new_index,
                    });
                    open_set.insert(new_index, new_node);
                }
            }
        }

        info!("Cannot find route after {} expansions", iteration);
        Ok(PlanOutcome::not_found())
    }

    fn pose_to_cell(pose: &Pose2D, map: &dyn MapProvider) -> RoboticsResult<(i32, i32)> {
        if !pose.x.is_finite() || !pose.y.is_finite() {
            return Err(RoboticsError::InvalidParameter(format!("non-finite pose {:?}", pose)));
        }
        let (x, y) = pose.grid_cell();
        if x < 0 || y < 0 || x >= map.width() as i64 || y >= map.height() as i64 {
            return Err(RoboticsError::OutOfRange {
                x,
                y,
                width: map.width(),
                height: map.height(),
            });
        }
        Ok((x as i32, y as i32))
    }

    /// Follow parent links from the goal node back to the root
    fn build_path(
        &self,
        goal_node: &Node,
        closed_set: &HashMap<usize, Node>,
    ) -> RoboticsResult<Path2D> {
        let mut rx = vec![goal_node.x as f64];
        let mut ry = vec![goal_node.y as f64];
        let mut parent = goal_node.parent_index;
        while let Some(index) = parent {
            let node = closed_set.get(&index).ok_or_else(|| {
                RoboticsError::PlanningError(format!("parent {} missing from closed set", index))
            })?;
            rx.push(node.x as f64);
            ry.push(node.y as f64);
            parent = node.parent_index;
        }
        rx.reverse();
        ry.reverse();
        debug!("route has {} cells", rx.len());
        Ok(transform_trajectory(&rx, &ry))
    }

    fn calc_heuristic(&self, x: i32, y: i32, goal_x: i32, goal_y: i32) -> f64 {
        let dx = (x - goal_x) as f64;
        let dy = (y - goal_y) as f64;
        self.config.heuristic_weight * (dx * dx + dy * dy).sqrt()
    }

    fn get_motion_model() -> Vec<(i32, i32, f64)> {
        // dx, dy, cost
        vec![
            (1, 0, 1.0),
            (0, 1, 1.0),
            (-1, 0, 1.0),
            (0, -1, 1.0),
            (-1, -1, std::f64::consts::SQRT_2),
            (-1, 1, std::f64::consts::SQRT_2),
            (1, -1, std::f64::consts::SQRT_2),
            (1, 1, std::f64::consts::SQRT_2),
        ]
    }
}

impl Default for AStarPlanner {
    fn default() -> Self {
        Self::new(AStarConfig::default())
    }
}

impl RoutePlanner for AStarPlanner {
    fn search_route(
        &self,
        start: Pose2D,
        goal: Pose2D,
        map: &dyn MapProvider,
    ) -> RoboticsResult<PlanOutcome> {
        self.search_route_observed(start, goal, map, &mut ())
    }
}
