// Parking lot layout: three rows of parked cars separated by driving aisles,
// with lanes on both sides and one empty bay in the top row.

use std::ops::Deref;

use crate::common::{MapProvider, Pose2D, RoboticsResult};
use crate::mapping::{Obstacle, ObstacleGridMap};

const LOT_WIDTH: usize = 60;
const LOT_HEIGHT: usize = 40;
/// Width of a parked car footprint and the bay pitch [cells]
const CAR_WIDTH: f64 = 3.0;
const BAY_PITCH: f64 = 4.0;
const BAYS_PER_ROW: usize = 13;
/// Bay index left empty in the top row (x in 48..=51)
const FREE_BAY: usize = 11;

pub struct ParkingLot {
    grid: ObstacleGridMap,
}

impl ParkingLot {
    pub fn new() -> RoboticsResult<Self> {
        let mut obstacles = Vec::new();
        // (y_min, y_max, skipped bay)
        let rows: [(f64, f64, Option<usize>); 3] = [
            (8.0, 13.0, None),
            (20.0, 25.0, None),
            (34.0, 39.0, Some(FREE_BAY)),
        ];
        for &(y_min, y_max, skip) in rows.iter() {
            for bay in 0..BAYS_PER_ROW {
                if skip == Some(bay) {
                    continue;
                }
                let x_min = 4.0 + BAY_PITCH * bay as f64;
                obstacles.push(Obstacle::rectangle(x_min, y_min, x_min + CAR_WIDTH, y_max));
            }
        }
        // pillars in the aisles
        obstacles.push(Obstacle::circle(30.0, 17.0, 1.0));
        obstacles.push(Obstacle::circle(20.0, 29.5, 1.0));
        obstacles.push(Obstacle::circle(40.0, 29.5, 1.0));

        Ok(Self { grid: ObstacleGridMap::new(LOT_WIDTH, LOT_HEIGHT, obstacles)? })
    }

    /// Entrance pose below the first row
    pub fn default_start() -> Pose2D {
        Pose2D::new(14.0, 4.0, 0.0)
    }

    /// Pose inside the empty bay, facing up
    pub fn default_goal() -> Pose2D {
        Pose2D::new(50.0, 38.0, std::f64::consts::FRAC_PI_2)
    }

    pub fn into_inner(self) -> ObstacleGridMap {
        self.grid
    }
}

impl Deref for ParkingLot {
    type Target = ObstacleGridMap;

    fn deref(&self) -> &Self::Target {
        &self.grid
    }
}

impl MapProvider for ParkingLot {
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
    fn test_layout() {
        let lot = ParkingLot::new().unwrap();
        assert_eq!(lot.dimensions(), (60, 40));
        assert_eq!(lot.obstacles().len(), 3 * BAYS_PER_ROW - 1 + 3);
    }

    #[test]
    fn test_default_poses_are_free() {
        let lot = ParkingLot::new().unwrap();
        assert!(lot.is_free_point(ParkingLot::default_start().position()));
        assert!(lot.is_free_point(ParkingLot::default_goal().position()));
    }

    #[test]
    fn test_rows_block_vertical_moves() {
        let lot = ParkingLot::new().unwrap();
        assert!(!lot.is_not_crossed_obstacle((14, 7), (14, 14)).unwrap());
        // side lane stays open
        assert!(lot.is_not_crossed_obstacle((2, 7), (2, 14)).unwrap());
    }
}
