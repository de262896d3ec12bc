// Grid/obstacle map shared by the planner and every controller.
//
// Obstacle variants only differ in how the obstacle list is populated; they
// all wrap an `ObstacleGridMap` and expose it through `Deref`.

use log::debug;

use crate::common::{MapProvider, RoboticsError, RoboticsResult};
use crate::mapping::Obstacle;

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleGridMap {
    width: usize,
    height: usize,
    obstacles: Vec<Obstacle>,
}

impl ObstacleGridMap {
    /// Validate every obstacle up front so planning never sees a malformed
    /// shape. Exact duplicates are dropped, keeping the first occurrence.
    pub fn new(width: usize, height: usize, obstacles: Vec<Obstacle>) -> RoboticsResult<Self> {
        if width == 0 || height == 0 {
            return Err(RoboticsError::InvalidParameter(format!(
                "map dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let mut unique: Vec<Obstacle> = Vec::with_capacity(obstacles.len());
        for obstacle in obstacles {
            obstacle.validate(width, height)?;
            if unique.contains(&obstacle) {
                debug!("dropping duplicate obstacle {:?}", obstacle);
                continue;
            }
            unique.push(obstacle);
        }

        Ok(ObstacleGridMap { width, height, obstacles: unique })
    }

    /// Map without obstacles
    pub fn empty(width: usize, height: usize) -> RoboticsResult<Self> {
        Self::new(width, height, Vec::new())
    }
}

impl MapProvider for ObstacleGridMap {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_grid_index_is_injective() {
        let map = ObstacleGridMap::empty(7, 5).unwrap();
        let mut seen = HashSet::new();
        for y in 0..5 {
            for x in 0..7 {
                assert!(seen.insert(map.get_grid_index(x, y).unwrap()));
            }
        }
        assert_eq!(seen.len(), 35);
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let map = ObstacleGridMap::empty(10, 10).unwrap();
        assert!(matches!(
            map.is_not_crossed_obstacle((9, 9), (10, 10)),
            Err(RoboticsError::OutOfRange { x: 10, y: 10, .. })
        ));
        assert!(map.get_grid_index(-1, 3).is_err());
    }

    #[test]
    fn test_corner_cut_rejected() {
        let map = ObstacleGridMap::new(10, 10, vec![Obstacle::rectangle(5.0, 5.0, 6.0, 6.0)]).unwrap();
        assert!(!map.is_not_crossed_obstacle((4, 4), (6, 6)).unwrap());
        assert!(map.is_not_crossed_obstacle((4, 4), (4, 5)).unwrap());
    }

    #[test]
    fn test_degenerate_obstacle_rejected_at_construction() {
        let result = ObstacleGridMap::new(10, 10, vec![Obstacle::rectangle(2.0, 2.0, 2.0, 2.0)]);
        assert!(matches!(result, Err(RoboticsError::DegenerateObstacle(_))));
        assert!(ObstacleGridMap::new(0, 10, vec![]).is_err());
    }

    #[test]
    fn test_duplicates_dropped() {
        let rect = Obstacle::rectangle(1.0, 1.0, 2.0, 2.0);
        let map = ObstacleGridMap::new(10, 10, vec![rect, rect, Obstacle::circle(5.0, 5.0, 1.0)]).unwrap();
        assert_eq!(map.obstacles().len(), 2);
    }
}
