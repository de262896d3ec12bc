//! JSON scenario configuration
//!
//! Every field is optional; missing fields take the defaults below. A
//! minimal document such as `{"map": "parking_lot"}` is a complete scenario.

use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkConfig;
use crate::common::{MapProvider, Pose2D, RoboticsResult, SharedMap};
use crate::mapping::{BoundingBox, FixedGridMap, ImageBasedGridMap, Obstacle, ParkingLot, RandomGridMap};
use crate::path_tracking::ControllerParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    FixedGrid,
    RandomGrid,
    ParkingLot,
    ImageBased,
}

impl Default for MapKind {
    fn default() -> Self {
        MapKind::FixedGrid
    }
}

/// Obstacle as written in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObstacleSpec {
    /// `[x_min, y_min, x_max, y_max]`
    Rectangle { coordinates: [f64; 4] },
    Circle { center: [f64; 2], radius: f64 },
}

impl ObstacleSpec {
    pub fn to_obstacle(&self) -> Obstacle {
        match *self {
            ObstacleSpec::Rectangle { coordinates: [x_min, y_min, x_max, y_max] } => {
                Obstacle::rectangle(x_min, y_min, x_max, y_max)
            }
            ObstacleSpec::Circle { center: [x, y], radius } => Obstacle::circle(x, y, radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub map: MapKind,
    pub width: usize,
    pub height: usize,
    /// `[x, y, yaw]`; per-map default when absent
    pub start_pose: Option<[f64; 3]>,
    pub goal_pose: Option<[f64; 3]>,
    /// Replaces the built-in layout of a fixed grid, or adds to an image-based map
    pub obstacles: Option<Vec<ObstacleSpec>>,
    /// Contour boxes `[x, y, w, h]` of an image-based map
    pub bounding_boxes: Vec<[u32; 4]>,
    pub seed: u64,
    pub random_obstacles: usize,
    pub controller: ControllerParams,
    pub trials: usize,
    pub plot_output: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            map: MapKind::FixedGrid,
            width: 50,
            height: 50,
            start_pose: None,
            goal_pose: None,
            obstacles: None,
            bounding_boxes: Vec::new(),
            seed: 0,
            random_obstacles: 20,
            controller: ControllerParams::default(),
            trials: 5,
            plot_output: None,
        }
    }
}

/// A constructed map with the start and goal resolved for it
pub struct BuiltMap {
    pub map: SharedMap,
    pub start: Pose2D,
    pub goal: Pose2D,
}

fn pose(p: [f64; 3]) -> Pose2D {
    Pose2D::new(p[0], p[1], p[2])
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> RoboticsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> RoboticsResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        info!("loaded scenario from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    fn obstacle_list(&self) -> Option<Vec<Obstacle>> {
        self.obstacles
            .as_ref()
            .map(|specs| specs.iter().map(ObstacleSpec::to_obstacle).collect())
    }

    /// Default start (2, 2) and goal (width - 5, height - 5) on open maps
    fn corner_poses(&self) -> (Pose2D, Pose2D) {
        let goal_x = self.width.saturating_sub(5) as f64;
        let goal_y = self.height.saturating_sub(5) as f64;
        (Pose2D::new(2.0, 2.0, 0.0), Pose2D::new(goal_x, goal_y, 0.0))
    }

    pub fn build_map(&self) -> RoboticsResult<BuiltMap> {
        let (map, start, goal): (SharedMap, Pose2D, Pose2D) = match self.map {
            MapKind::FixedGrid => {
                let (start, goal) = self.corner_poses();
                (Arc::new(FixedGridMap::new(self.width, self.height, self.obstacle_list())?), start, goal)
            }
            MapKind::RandomGrid => {
                let mut random = RandomGridMap::new(self.width, self.height, self.random_obstacles, self.seed)?;
                let start = random.random_valid_start_position()?;
                let goal = random.random_valid_goal_position()?;
                (Arc::new(random), start, goal)
            }
            MapKind::ParkingLot => {
                (Arc::new(ParkingLot::new()?), ParkingLot::default_start(), ParkingLot::default_goal())
            }
            MapKind::ImageBased => {
                let (start, goal) = self.corner_poses();
                let boxes: Vec<BoundingBox> = self
                    .bounding_boxes
                    .iter()
                    .map(|b| BoundingBox::new(b[0], b[1], b[2], b[3]))
                    .collect();
                let extra = self.obstacle_list().unwrap_or_default();
                let image = ImageBasedGridMap::from_bounding_boxes(self.width, self.height, &boxes, extra)?;
                (Arc::new(image), start, goal)
            }
        };

        let start = self.start_pose.map(pose).unwrap_or(start);
        let goal = self.goal_pose.map(pose).unwrap_or(goal);
        info!(
            "{:?} map {}x{} with {} obstacles, start ({:.1}, {:.1}), goal ({:.1}, {:.1})",
            self.map, map.width(), map.height(), map.obstacles().len(), start.x, start.y, goal.x, goal.y
        );
        Ok(BuiltMap { map, start, goal })
    }

    pub fn benchmark_config(&self, built: &BuiltMap) -> BenchmarkConfig {
        BenchmarkConfig {
            trials_per_policy: self.trials,
            start: built.start,
            goal: built.goal,
            ..Default::default()
        }
    }
}
