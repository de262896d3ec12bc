// Path Tracking algorithms module

pub mod tracking;
pub mod pure_pursuit;
pub mod stanley_controller;
pub mod mpc;
pub mod adaptive_mpc;
pub mod hybrid_mi;
pub mod multi_purpose_mpc;
pub mod registry;

pub use tracking::*;
pub use pure_pursuit::{PurePursuitConfig, PurePursuitController};
pub use stanley_controller::{StanleyConfig, StanleyController};
pub use mpc::{get_linear_model_matrix, predict_motion, MpcConfig, MpcController};
pub use adaptive_mpc::{AdaptiveMpcConfig, AdaptiveMpcController};
pub use hybrid_mi::{DrivingMode, HybridMiConfig, HybridMiController};
pub use multi_purpose_mpc::{obstacle_cost, MultiPurposeMpcConfig, MultiPurposeMpcController};
pub use registry::{ControllerFactory, ControllerParams, ControllerRegistry};
