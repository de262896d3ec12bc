// Runs every registered tracking policy over A* routes and prints the
// failure counts and rankings.
//
// usage: controller_benchmark [scenario.json]

use std::process;

use log::{error, info};

use route_bench::benchmark::{run_benchmark, BenchmarkReport};
use route_bench::config::{BuiltMap, ScenarioConfig};
use route_bench::path_planning::AStarPlanner;
use route_bench::path_tracking::ControllerRegistry;
use route_bench::utils::{colors, transform_trajectory_with_angles, PathStyle, Visualizer};
use route_bench::{NamedController, RoboticsResult, RoutePlanner};

fn print_report(report: &BenchmarkReport) {
    println!("{:<20} {:>6} {:>6} {:>12} {:>12}", "policy", "trials", "fails", "time [ms]", "distance [m]");
    for stats in report.policies() {
        let time = stats.mean_time.map_or("-".to_string(), |t| format!("{:.3}", t * 1e3));
        let distance = stats.mean_distance.map_or("-".to_string(), |d| format!("{:.2}", d));
        println!("{:<20} {:>6} {:>6} {:>12} {:>12}", stats.name, stats.trials, stats.fail_count, time, distance);
    }

    let by_time: Vec<&str> = report.ranking_by_time().iter().map(|s| s.name.as_str()).collect();
    let by_distance: Vec<&str> = report.ranking_by_distance().iter().map(|s| s.name.as_str()).collect();
    println!("ranking by time:     {}", by_time.join(" < "));
    println!("ranking by distance: {}", by_distance.join(" < "));
}

/// One run of every policy on a single route, drawn on one figure
fn plot_trajectories(
    built: &BuiltMap,
    planner: &AStarPlanner,
    controllers: &[NamedController],
    output: &str,
) -> RoboticsResult<()> {
    let plan = planner.search_route(built.start, built.goal, built.map.as_ref())?;
    let reference = transform_trajectory_with_angles(&plan.trajectory);
    let goal = built.goal.position();

    let mut vis = Visualizer::new();
    vis.set_title("Tracked trajectories")
        .plot_map(built.map.as_ref())
        .plot_path(&plan.trajectory, &PathStyle::new(colors::GRAY, "A* route").with_line_width(1.0));
    for (i, (name, controller)) in controllers.iter().enumerate() {
        let outcome = controller.follow_trajectory(built.start, &reference, goal);
        let color = colors::SERIES[i % colors::SERIES.len()];
        vis.plot_path(&outcome.trajectory, &PathStyle::new(color, name));
    }
    vis.plot_start(built.start.position()).plot_goal(goal);
    vis.save_png(output, 900, 900)?;
    info!("plot saved to {}", output);
    Ok(())
}

fn run() -> RoboticsResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    let built = config.build_map()?;
    let planner = AStarPlanner::default();
    let controllers = ControllerRegistry::with_defaults().build_all(&config.controller, built.map.clone());

    let report = run_benchmark(built.map.as_ref(), &planner, &controllers, &config.benchmark_config(&built))?;
    print_report(&report);

    if let Some(output) = &config.plot_output {
        plot_trajectories(&built, &planner, &controllers, output)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
