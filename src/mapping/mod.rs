// Grid/obstacle maps module

pub mod obstacle;
pub mod grid_map;
pub mod fixed_grid_map;
pub mod random_grid_map;
pub mod parking_lot;
pub mod image_based_grid_map;

pub use obstacle::*;
pub use grid_map::*;
pub use fixed_grid_map::*;
pub use random_grid_map::*;
pub use parking_lot::*;
pub use image_based_grid_map::*;
