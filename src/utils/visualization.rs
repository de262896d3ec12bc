//! Visualization utilities for route_bench
//!
//! Plot calls only record layers; everything is drawn onto a single gnuplot
//! axes when the figure is saved or shown.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{MapProvider, Path2D, Point2D, RoboticsError, RoboticsResult};
use crate::mapping::Obstacle;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const PURPLE: &str = "#800080";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const BOUNDARY: &str = GRAY;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const EXPANDED: &str = "#A0A0A0";

    /// Cycled through for per-controller trajectories
    pub const SERIES: [&str; 6] = [RED, BLUE, ORANGE, PURPLE, GREEN, "#35C788"];
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Path")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

enum Layer {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Closed outline of an obstacle; circles are approximated with `segments` chords.
pub fn obstacle_outline(obstacle: &Obstacle, segments: usize) -> (Vec<f64>, Vec<f64>) {
    match *obstacle {
        Obstacle::Rectangle { x_min, y_min, x_max, y_max } => (
            vec![x_min, x_max, x_max, x_min, x_min],
            vec![y_min, y_min, y_max, y_max, y_min],
        ),
        Obstacle::Circle { center_x, center_y, radius } => {
            let n = segments.max(3);
            (0..=n)
                .map(|i| {
                    let t = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                    (center_x + radius * t.cos(), center_y + radius * t.sin())
                })
                .unzip()
        }
    }
}

pub struct Visualizer {
    figure: Figure,
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            layers: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.layers.push(Layer::Lines { x: path.x_coords(), y: path.y_coords(), style: style.clone() });
        self
    }

    /// Obstacle outlines; only the first one carries the caption
    pub fn plot_obstacles(&mut self, obstacles: &[Obstacle]) -> &mut Self {
        for (i, obstacle) in obstacles.iter().enumerate() {
            let (x, y) = obstacle_outline(obstacle, 24);
            let caption = if i == 0 { "Obstacles" } else { "" };
            self.layers.push(Layer::Lines {
                x,
                y,
                style: PathStyle::new(colors::OBSTACLE, caption).with_line_width(1.5),
            });
        }
        self
    }

    /// Map boundary, obstacles and axis ranges
    pub fn plot_map(&mut self, map: &dyn MapProvider) -> &mut Self {
        let (w, h) = (map.width() as f64 - 0.5, map.height() as f64 - 0.5);
        self.layers.push(Layer::Lines {
            x: vec![-0.5, w, w, -0.5, -0.5],
            y: vec![-0.5, -0.5, h, h, -0.5],
            style: PathStyle::new(colors::BOUNDARY, "").with_line_width(1.0),
        });
        self.set_x_range(-1.0, w + 0.5);
        self.set_y_range(-1.0, h + 0.5);
        self.plot_obstacles(map.obstacles())
    }

    /// Cells expanded by a search, in expansion order
    pub fn plot_expansions(&mut self, cells: &[(i32, i32)]) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = cells.iter().map(|&(cx, cy)| (cx as f64, cy as f64)).unzip();
        self.layers.push(Layer::Points {
            x,
            y,
            style: PointStyle::new(colors::EXPANDED, "Expanded").with_symbol('x').with_size(0.5),
        });
        self
    }

    pub fn plot_point(&mut self, point: Point2D, style: &PointStyle) -> &mut Self {
        self.layers.push(Layer::Points { x: vec![point.x], y: vec![point.y], style: style.clone() });
        self
    }

    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    pub fn show(&mut self) -> RoboticsResult<()> {
        self.render();
        self.figure
            .show()
            .map(|_| ())
            .map_err(|e| RoboticsError::VisualizationError(e.to_string()))
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> RoboticsResult<()> {
        self.render();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| RoboticsError::VisualizationError(e.to_string()))
    }

    pub fn save_svg(&mut self, path: &str) -> RoboticsResult<()> {
        self.render();
        self.figure
            .save_to_svg(path, 800, 600)
            .map_err(|e| RoboticsError::VisualizationError(e.to_string()))
    }

    fn render(&mut self) {
        self.figure.clear_axes();
        let axes = self.figure.axes2d();
        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, style } => {
                    axes.lines(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        LineWidth(style.line_width),
                    ]);
                }
                Layer::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
