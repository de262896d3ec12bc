//! Utility modules for route_bench

pub mod trajectory;
pub mod visualization;

pub use trajectory::*;
pub use visualization::{Visualizer, PathStyle, PointStyle, colors};
