//! route_bench - grid route planning and trajectory tracking benchmarks
//!
//! An A* planner searches an obstacle map for a route, the route is turned
//! into a reference trajectory, and a set of tracking controllers are run
//! against it repeatedly to compare success rate, time and distance.

// Core modules
pub mod common;
pub mod utils;
pub mod config;

// Algorithm modules
pub mod mapping;
pub mod path_planning;
pub mod path_tracking;
pub mod benchmark;

// Re-export common types for convenience
pub use common::{Point2D, Pose2D, Path2D, Node};
pub use common::{MapProvider, SharedMap, RoutePlanner, ControllerPolicy, NamedController, PlanOutcome, TrackingOutcome};
pub use common::{RoboticsError, RoboticsResult};
