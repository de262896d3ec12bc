//! Obstacle shapes and their exact segment intersection tests.
//!
//! Rectangles are axis-aligned and closed: a segment that only touches the
//! boundary counts as crossing. Circles are closed discs.

use crate::common::{Point2D, RoboticsError, RoboticsResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Obstacle {
    Rectangle {
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    },
    Circle {
        center_x: f64,
        center_y: f64,
        radius: f64,
    },
}

impl Obstacle {
    pub fn rectangle(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Obstacle::Rectangle { x_min, y_min, x_max, y_max }
    }

    pub fn circle(center_x: f64, center_y: f64, radius: f64) -> Self {
        Obstacle::Circle { center_x, center_y, radius }
    }

    /// Reject malformed shapes and shapes leaving `[0, width] x [0, height]`.
    ///
    /// The bound is closed: a shape may end exactly on the far edge
    /// (`x_max == width`), unlike grid queries, which are limited to
    /// `[0, width) x [0, height)`.
    pub fn validate(&self, width: usize, height: usize) -> RoboticsResult<()> {
        let (w, h) = (width as f64, height as f64);
        match *self {
            Obstacle::Rectangle { x_min, y_min, x_max, y_max } => {
                if ![x_min, y_min, x_max, y_max].iter().all(|v| v.is_finite()) {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "non-finite rectangle {:?}", self
                    )));
                }
                if x_max <= x_min || y_max <= y_min {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "zero-area rectangle [{}, {}, {}, {}]",
                        x_min, y_min, x_max, y_max
                    )));
                }
                if x_min < 0.0 || y_min < 0.0 || x_max > w || y_max > h {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "rectangle [{}, {}, {}, {}] is outside the {}x{} map",
                        x_min, y_min, x_max, y_max, width, height
                    )));
                }
            }
            Obstacle::Circle { center_x, center_y, radius } => {
                if ![center_x, center_y, radius].iter().all(|v| v.is_finite()) {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "non-finite circle {:?}", self
                    )));
                }
                if radius <= 0.0 {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "circle at ({}, {}) has radius {}",
                        center_x, center_y, radius
                    )));
                }
                if center_x - radius < 0.0
                    || center_y - radius < 0.0
                    || center_x + radius > w
                    || center_y + radius > h
                {
                    return Err(RoboticsError::DegenerateObstacle(format!(
                        "circle at ({}, {}) r={} is outside the {}x{} map",
                        center_x, center_y, radius, width, height
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn contains_point(&self, p: Point2D) -> bool {
        self.distance_to_point(p) <= 0.0
    }

    /// Closest point of the (closed) shape to `p`; `p` itself when inside.
    pub fn closest_point(&self, p: Point2D) -> Point2D {
        match *self {
            Obstacle::Rectangle { x_min, y_min, x_max, y_max } => {
                Point2D::new(p.x.max(x_min).min(x_max), p.y.max(y_min).min(y_max))
            }
            Obstacle::Circle { center_x, center_y, radius } => {
                let center = Point2D::new(center_x, center_y);
                let d = center.distance(&p);
                if d <= radius {
                    p
                } else {
                    Point2D::new(
                        center_x + (p.x - center_x) * radius / d,
                        center_y + (p.y - center_y) * radius / d,
                    )
                }
            }
        }
    }

    /// Euclidean clearance from `p` to the shape, 0 inside it.
    pub fn distance_to_point(&self, p: Point2D) -> f64 {
        match *self {
            Obstacle::Rectangle { .. } => self.closest_point(p).distance(&p),
            Obstacle::Circle { center_x, center_y, radius } => {
                (Point2D::new(center_x, center_y).distance(&p) - radius).max(0.0)
            }
        }
    }

    /// True if the closed segment `a`-`b` touches the shape.
    pub fn intersects_segment(&self, a: Point2D, b: Point2D) -> bool {
        match *self {
            Obstacle::Rectangle { x_min, y_min, x_max, y_max } => {
                segment_intersects_box(a, b, (x_min, y_min), (x_max, y_max))
            }
            Obstacle::Circle { center_x, center_y, radius } => {
                let center = Point2D::new(center_x, center_y);
                closest_point_on_segment(a, b, center).distance(&center) <= radius
            }
        }
    }
}

/// Liang-Barsky clipping of the parametric segment against a closed box.
fn segment_intersects_box(a: Point2D, b: Point2D, min: (f64, f64), max: (f64, f64)) -> bool {
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    for &(start, delta, lo, hi) in &[
        (a.x, b.x - a.x, min.0, max.0),
        (a.y, b.y - a.y, min.1, max.1),
    ] {
        if delta == 0.0 {
            if start < lo || start > hi {
                return false;
            }
            continue;
        }
        let t1 = (lo - start) / delta;
        let t2 = (hi - start) / delta;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        t_enter = t_enter.max(near);
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return false;
        }
    }
    true
}

pub(crate) fn closest_point_on_segment(a: Point2D, b: Point2D, p: Point2D) -> Point2D {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).max(0.0).min(1.0);
    Point2D::new(a.x + t * dx, a.y + t * dy)
}
