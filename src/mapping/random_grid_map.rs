// Randomly generated obstacle map with seeded, reproducible layouts.

use std::ops::Deref;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::{MapProvider, Point2D, Pose2D, RoboticsError, RoboticsResult};
use crate::mapping::{Obstacle, ObstacleGridMap};

/// Rejection-sampling attempts before giving up on a free cell
const MAX_SAMPLE_TRIES: usize = 1000;
/// Minimum clearance of a sampled start/goal cell [cells]
const MIN_CLEARANCE: f64 = 1.0;

pub struct RandomGridMap {
    grid: ObstacleGridMap,
    rng: StdRng,
}

impl RandomGridMap {
    pub fn new(width: usize, height: usize, obstacle_count: usize, seed: u64) -> RoboticsResult<Self> {
        if width < 4 || height < 4 {
            return Err(RoboticsError::InvalidParameter(format!(
                "random map needs at least 4x4 cells, got {}x{}",
                width, height
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let (w, h) = (width as f64, height as f64);
        let max_side = (width.min(height) / 10).max(2);
        let max_radius = (w.min(h) / 20.0).max(1.5);

        let mut obstacles = Vec::with_capacity(obstacle_count);
        for _ in 0..obstacle_count {
            if rng.gen_bool(0.7) {
                let side_x = rng.gen_range(1..=max_side);
                let side_y = rng.gen_range(1..=max_side);
                let x = rng.gen_range(0..=width - side_x) as f64;
                let y = rng.gen_range(0..=height - side_y) as f64;
                obstacles.push(Obstacle::rectangle(x, y, x + side_x as f64, y + side_y as f64));
            } else {
                let radius = rng.gen_range(1.0..=max_radius);
                let cx = rng.gen_range(radius..=w - radius);
                let cy = rng.gen_range(radius..=h - radius);
                obstacles.push(Obstacle::circle(cx, cy, radius));
            }
        }
        debug!("generated {} random obstacles (seed {})", obstacles.len(), seed);

        Ok(Self { grid: ObstacleGridMap::new(width, height, obstacles)?, rng })
    }

    /// Random obstacle-free cell in the left third of the map
    pub fn random_valid_start_position(&mut self) -> RoboticsResult<Pose2D> {
        let x_max = (self.grid.width() / 3).max(1);
        self.sample_free_cell(0, x_max)
    }

    /// Random obstacle-free cell in the right third of the map
    pub fn random_valid_goal_position(&mut self) -> RoboticsResult<Pose2D> {
        let width = self.grid.width();
        let x_min = (width - width / 3).min(width - 1);
        self.sample_free_cell(x_min, width)
    }

    fn sample_free_cell(&mut self, x_min: usize, x_max: usize) -> RoboticsResult<Pose2D> {
        let height = self.grid.height();
        for _ in 0..MAX_SAMPLE_TRIES {
            let x = self.rng.gen_range(x_min..x_max) as f64;
            let y = self.rng.gen_range(0..height) as f64;
            if self.grid.clearance(Point2D::new(x, y)) >= MIN_CLEARANCE {
                return Ok(Pose2D::new(x, y, 0.0));
            }
        }
        Err(RoboticsError::InvalidParameter(format!(
            "no free cell with x in [{}, {}) after {} samples",
            x_min, x_max, MAX_SAMPLE_TRIES
        )))
    }

    pub fn into_inner(self) -> ObstacleGridMap {
        self.grid
    }
}

impl Deref for RandomGridMap {
    type Target = ObstacleGridMap;

    fn deref(&self) -> &Self::Target {
        &self.grid
    }
}

impl MapProvider for RandomGridMap {
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

    #[test]
    fn test_same_seed_same_layout() {
        let a = RandomGridMap::new(50, 50, 20, 7).unwrap();
        let b = RandomGridMap::new(50, 50, 20, 7).unwrap();
        assert_eq!(a.obstacles(), b.obstacles());
        assert!(!a.obstacles().is_empty());
    }

    #[test]
    fn test_obstacles_inside_map() {
        let map = RandomGridMap::new(30, 20, 40, 3).unwrap();
        for o in map.obstacles() {
            assert!(o.validate(30, 20).is_ok());
        }
    }

    #[test]
    fn test_random_start_and_goal_are_free() {
        let mut map = RandomGridMap::new(50, 50, 15, 11).unwrap();
        let start = map.random_valid_start_position().unwrap();
        let goal = map.random_valid_goal_position().unwrap();
        assert!(start.x < 17.0);
        assert!(goal.x >= 34.0);
        assert!(map.clearance(start.position()) >= MIN_CLEARANCE);
        assert!(map.clearance(goal.position()) >= MIN_CLEARANCE);
    }

    #[test]
    fn test_too_small_map_rejected() {
        assert!(RandomGridMap::new(3, 10, 1, 0).is_err());
    }
}
