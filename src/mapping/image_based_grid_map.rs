// Image-derived grid map.
//
// Edge detection and contour extraction happen outside this crate; what
// arrives here is either a list of contour bounding boxes or a binary
// occupancy matrix already reduced to grid resolution.

use std::ops::Deref;

use log::debug;
extern crate nalgebra as na;

use crate::common::{MapProvider, RoboticsError, RoboticsResult};
use crate::mapping::{Obstacle, ObstacleGridMap};

/// Contours whose box exceeds this on both sides are the map frame, not obstacles
const MAX_CONTOUR_SIDE: u32 = 15;

/// Axis-aligned bounding box of an extracted contour, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        BoundingBox { x, y, w, h }
    }
}

pub struct ImageBasedGridMap {
    grid: ObstacleGridMap,
}

impl ImageBasedGridMap {
    /// `extra` obstacles come first, followed by one rectangle per kept box.
    pub fn from_bounding_boxes(
        width: usize,
        height: usize,
        boxes: &[BoundingBox],
        extra: Vec<Obstacle>,
    ) -> RoboticsResult<Self> {
        let mut obstacles = extra;
        for b in boxes {
            if b.w > MAX_CONTOUR_SIDE && b.h > MAX_CONTOUR_SIDE {
                continue;
            }
            if b.w == 0 || b.h == 0 {
                debug!("skipping zero-area contour {:?}", b);
                continue;
            }
            obstacles.push(Obstacle::rectangle(
                b.x as f64,
                b.y as f64,
                (b.x + b.w) as f64,
                (b.y + b.h) as f64,
            ));
        }
        Ok(Self { grid: ObstacleGridMap::new(width, height, obstacles)? })
    }

    /// Nonzero entries are occupied; row index is y and column index is x.
    /// Each row run of occupied cells becomes one rectangle covering exactly
    /// those cells. `scale` repeats every entry into a `scale` x `scale` block.
    pub fn from_occupancy(matrix: &na::DMatrix<u8>, scale: usize) -> RoboticsResult<Self> {
        if scale < 1 {
            return Err(RoboticsError::InvalidParameter("scale must be >= 1".to_string()));
        }
        let grid = matrix.kronecker(&na::DMatrix::<u8>::repeat(scale, scale, 1));
        let (height, width) = grid.shape();
        let (w, h) = (width as f64, height as f64);

        let mut obstacles = Vec::new();
        for row in 0..height {
            let mut col = 0;
            while col < width {
                if grid[(row, col)] == 0 {
                    col += 1;
                    continue;
                }
                let run_start = col;
                while col < width && grid[(row, col)] != 0 {
                    col += 1;
                }
                let y = row as f64;
                obstacles.push(Obstacle::rectangle(
                    (run_start as f64 - 0.5).max(0.0),
                    (y - 0.5).max(0.0),
                    (col as f64 - 0.5).min(w),
                    (y + 0.5).min(h),
                ));
            }
        }
        debug!("occupancy {}x{} produced {} run obstacles", width, height, obstacles.len());

        Ok(Self { grid: ObstacleGridMap::new(width, height, obstacles)? })
    }

    pub fn into_inner(self) -> ObstacleGridMap {
        self.grid
    }
}

impl Deref for ImageBasedGridMap {
    type Target = ObstacleGridMap;

    fn deref(&self) -> &Self::Target {
        &self.grid
    }
}

impl MapProvider for ImageBasedGridMap {
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
