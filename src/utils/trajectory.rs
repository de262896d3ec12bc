//! Path-to-trajectory transforms and distance metrics

use crate::common::{normalize_angle, Path2D, Point2D, Pose2D};

/// Zip grid coordinates into a trajectory in path order.
///
/// Extra entries of the longer slice are ignored.
pub fn transform_trajectory(path_x: &[f64], path_y: &[f64]) -> Path2D {
    Path2D::from_points(
        path_x.iter().zip(path_y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect(),
    )
}

/// Attach a heading to every point, taken from the direction towards the
/// next point. The last point repeats the previous heading.
pub fn transform_trajectory_with_angles(path: &Path2D) -> Vec<Pose2D> {
    let points = &path.points;
    let mut poses = Vec::with_capacity(points.len());
    let mut yaw = 0.0;
    for (i, p) in points.iter().enumerate() {
        if let Some(next) = points.get(i + 1) {
            yaw = (next.y - p.y).atan2(next.x - p.x);
        }
        poses.push(Pose2D::new(p.x, p.y, yaw));
    }
    poses
}

/// Sum of Euclidean distances between consecutive points
pub fn calculate_trajectory_distance(path: &Path2D) -> f64 {
    path.total_length()
}

/// Arc-length parameterised view of a reference trajectory used by the
/// tracking controllers. Never modifies the poses it was built from.
#[derive(Debug, Clone)]
pub struct ReferencePath {
    poses: Vec<Pose2D>,
    s: Vec<f64>,
}

impl ReferencePath {
    pub fn new(reference: &[Pose2D]) -> Self {
        let mut s = Vec::with_capacity(reference.len());
        let mut acc = 0.0;
        for (i, p) in reference.iter().enumerate() {
            if i > 0 {
                acc += p.position().distance(&reference[i - 1].position());
            }
            s.push(acc);
        }
        ReferencePath { poses: reference.to_vec(), s }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn pose(&self, index: usize) -> Pose2D {
        self.poses[index.min(self.poses.len() - 1)]
    }

    pub fn last(&self) -> Option<&Pose2D> {
        self.poses.last()
    }

    /// Arc length at `index`
    pub fn station(&self, index: usize) -> f64 {
        self.s[index.min(self.s.len() - 1)]
    }

    pub fn total_length(&self) -> f64 {
        self.s.last().copied().unwrap_or(0.0)
    }

    /// Nearest point to `p` among the indices from `from` up to `window`
    /// metres of arc length further, returning its index and distance.
    /// Searching forward only keeps the vehicle from snapping back onto an
    /// earlier part of the path.
    pub fn nearest_index(&self, p: Point2D, from: usize, window: f64) -> (usize, f64) {
        let from = from.min(self.poses.len().saturating_sub(1));
        let s_limit = self.s[from] + window;
        let mut best = (from, f64::INFINITY);
        for (i, pose) in self.poses.iter().enumerate().skip(from) {
            if self.s[i] > s_limit {
                break;
            }
            let d = pose.position().distance(&p);
            if d < best.1 {
                best = (i, d);
            }
        }
        best
    }

    /// Pose interpolated at arc length `s`, clamped to the path ends. The
    /// heading is that of the segment containing `s`.
    pub fn sample(&self, s: f64) -> Pose2D {
        if self.poses.len() < 2 || s <= 0.0 {
            return self.poses[0];
        }
        if s >= self.total_length() {
            return self.poses[self.poses.len() - 1];
        }
        let i = match self.s.iter().position(|&si| si > s) {
            Some(i) => i - 1,
            None => self.poses.len() - 2,
        };
        let seg = self.s[i + 1] - self.s[i];
        let t = if seg > 0.0 { (s - self.s[i]) / seg } else { 0.0 };
        let a = self.poses[i];
        let b = self.poses[i + 1];
        Pose2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y), a.yaw)
    }

    /// Mean absolute heading change per metre over `[s, s + window]`
    pub fn curvature_ahead(&self, s: f64, window: f64) -> f64 {
        if window <= 0.0 {
            return 0.0;
        }
        let steps = 4;
        let mut total = 0.0;
        let mut prev = self.sample(s).yaw;
        for k in 1..=steps {
            let yaw = self.sample(s + window * k as f64 / steps as f64).yaw;
            total += normalize_angle(yaw - prev).abs();
            prev = yaw;
        }
        total / window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_transform_keeps_order() {
        let path = transform_trajectory(&[0.0, 1.0, 2.0], &[0.0, 1.0, 1.0]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.points[1], Point2D::new(1.0, 1.0));
    }

    #[test]
    fn test_headings_from_deltas() {
        let path = transform_trajectory(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]);
        let poses = transform_trajectory_with_angles(&path);
        assert!((poses[0].yaw - FRAC_PI_4).abs() < 1e-12);
        assert!((poses[1].yaw - FRAC_PI_2).abs() < 1e-12);
        assert!((poses[2].yaw - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_trajectory_distance() {
        let path = transform_trajectory(&[0.0, 3.0, 3.0], &[0.0, 4.0, 5.0]);
        assert!((calculate_trajectory_distance(&path) - 6.0).abs() < 1e-12);
        assert_eq!(calculate_trajectory_distance(&transform_trajectory(&[1.0], &[1.0])), 0.0);
        assert_eq!(calculate_trajectory_distance(&Path2D::new()), 0.0);
    }

    #[test]
    fn test_reference_sample_and_nearest() {
        let path = transform_trajectory(&[0.0, 1.0, 2.0, 2.0], &[0.0, 0.0, 0.0, 1.0]);
        let reference = ReferencePath::new(&transform_trajectory_with_angles(&path));
        assert!((reference.total_length() - 3.0).abs() < 1e-12);

        let mid = reference.sample(1.5);
        assert!((mid.x - 1.5).abs() < 1e-12 && mid.y.abs() < 1e-12);
        let end = reference.sample(10.0);
        assert_eq!(end.position(), Point2D::new(2.0, 1.0));

        let (idx, d) = reference.nearest_index(Point2D::new(1.9, 0.2), 0, f64::INFINITY);
        assert_eq!(idx, 2);
        assert!(d < 0.3);
        let (idx, _) = reference.nearest_index(Point2D::new(0.0, 0.0), 2, f64::INFINITY);
        assert_eq!(idx, 2);
        // the end of the path is outside a 1 m window
        let (idx, _) = reference.nearest_index(Point2D::new(2.0, 1.0), 0, 1.0);
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_curvature_ahead() {
        let straight = transform_trajectory(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0.0; 5]);
        let reference = ReferencePath::new(&transform_trajectory_with_angles(&straight));
        assert!(reference.curvature_ahead(0.0, 2.0).abs() < 1e-12);

        let corner = transform_trajectory(&[0.0, 1.0, 2.0, 2.0, 2.0], &[0.0, 0.0, 0.0, 1.0, 2.0]);
        let reference = ReferencePath::new(&transform_trajectory_with_angles(&corner));
        assert!(reference.curvature_ahead(1.0, 2.0) > 0.5);
    }
}
