//! Error types for route_bench

use thiserror::Error;

/// Main error type for planning, tracking and benchmarking
#[derive(Debug, Error)]
pub enum RoboticsError {
    /// A grid coordinate lies outside the map
    #[error("Out of range: ({x}, {y}) is outside the {width}x{height} map")]
    OutOfRange {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    /// Zero-area, non-finite or out-of-map obstacle definition
    #[error("Degenerate obstacle: {0}")]
    DegenerateObstacle(String),
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// No reference route could be obtained at all
    #[error("Planning error: {0}")]
    PlanningError(String),
    /// Controller name missing from the registry
    #[error("Unknown controller: {0}")]
    UnknownController(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration document
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    /// Visualization error
    #[error("Visualization error: {0}")]
    VisualizationError(String),
}

/// Result type alias for robotics operations
pub type RoboticsResult<T> = Result<T, RoboticsError>;
