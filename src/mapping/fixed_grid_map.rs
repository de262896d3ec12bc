// Fixed grid map: explicit obstacle list or a built-in wall layout.

use std::ops::Deref;

use crate::common::{MapProvider, RoboticsResult};
use crate::mapping::{Obstacle, ObstacleGridMap};

/// Side length of the map the default layout is drawn for
const DEFAULT_SIZE: f64 = 50.0;

pub struct FixedGridMap {
    grid: ObstacleGridMap,
}

impl FixedGridMap {
    /// Build from `obstacles`, or from the default layout scaled to
    /// `width` x `height` when `None`.
    pub fn new(width: usize, height: usize, obstacles: Option<Vec<Obstacle>>) -> RoboticsResult<Self> {
        let obstacles = match obstacles {
            Some(list) => list,
            None => Self::default_obstacles(width, height),
        };
        Ok(Self { grid: ObstacleGridMap::new(width, height, obstacles)? })
    }

    /// The default 50x50 layout
    pub fn with_default_layout() -> RoboticsResult<Self> {
        Self::new(DEFAULT_SIZE as usize, DEFAULT_SIZE as usize, None)
    }

    /// Three staggered walls and a round pillar, leaving a corridor between
    /// every pair of walls.
    pub fn default_obstacles(width: usize, height: usize) -> Vec<Obstacle> {
        let sx = width as f64 / DEFAULT_SIZE;
        let sy = height as f64 / DEFAULT_SIZE;
        vec![
            Obstacle::rectangle(10.0 * sx, 0.0, 12.0 * sx, 30.0 * sy),
            Obstacle::rectangle(20.0 * sx, 20.0 * sy, 22.0 * sx, 50.0 * sy),
            Obstacle::rectangle(30.0 * sx, 0.0, 32.0 * sx, 30.0 * sy),
            Obstacle::rectangle(24.0 * sx, 6.0 * sy, 27.0 * sx, 10.0 * sy),
            Obstacle::circle(40.0 * sx, 35.0 * sy, 4.0 * sx.min(sy)),
        ]
    }

    pub fn into_inner(self) -> ObstacleGridMap {
        self.grid
    }
}

impl Deref for FixedGridMap {
    type Target = ObstacleGridMap;

    fn deref(&self) -> &Self::Target {
        &self.grid
    }
}

impl MapProvider for FixedGridMap {
    fn width(&self) -> usize {
        self.grid.width()
    }

    fn height(&self) -> usize {
        self.grid.height()
    }

    fn obstacles(&self) -> &[Obstacle] {
        self.grid.obstacles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Point2D;

    #[test]
    fn test_default_layout_is_valid() {
        let map = FixedGridMap::with_default_layout().unwrap();
        assert_eq!(map.dimensions(), (50, 50));
        assert_eq!(map.obstacles().len(), 5);
        assert!(map.is_free_point(Point2D::new(3.0, 5.0)));
        assert!(map.is_free_point(Point2D::new(15.0, 15.0)));
        assert!(map.is_free_point(Point2D::new(45.0, 45.0)));
        assert!(!map.is_free_point(Point2D::new(11.0, 10.0)));
    }

    #[test]
    fn test_default_layout_scales() {
        let map = FixedGridMap::new(100, 100, None).unwrap();
        assert!(!map.is_free_point(Point2D::new(22.0, 20.0)));
    }

    #[test]
    fn test_explicit_obstacles() {
        let map = FixedGridMap::new(10, 10, Some(vec![])).unwrap();
        assert!(map.obstacles().is_empty());
    }
}
