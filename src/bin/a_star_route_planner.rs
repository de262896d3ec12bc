// A* route planning on a scenario map.
//
// usage: a_star_route_planner [scenario.json]

use std::process;

use log::{error, info, warn};

use route_bench::config::ScenarioConfig;
use route_bench::path_planning::{AStarPlanner, ExpansionRecorder};
use route_bench::utils::{PathStyle, Visualizer};
use route_bench::RoboticsResult;

fn run() -> RoboticsResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    let built = config.build_map()?;

    let planner = AStarPlanner::default();
    let mut recorder = ExpansionRecorder::default();
    let plan = planner.search_route_observed(built.start, built.goal, built.map.as_ref(), &mut recorder)?;

    if plan.reached {
        info!(
            "route with {} points, length {:.2} m, {} cells expanded",
            plan.trajectory.len(), plan.total_distance, recorder.expanded.len()
        );
    } else {
        warn!("cannot find route, {} cells expanded", recorder.expanded.len());
    }

    if let Some(output) = &config.plot_output {
        let mut vis = Visualizer::new();
        vis.set_title("A* route")
            .plot_map(built.map.as_ref())
            .plot_expansions(&recorder.expanded)
            .plot_path(&plan.trajectory, &PathStyle::default())
            .plot_start(built.start.position())
            .plot_goal(built.goal.position());
        vis.save_png(output, 800, 800)?;
        info!("plot saved to {}", output);
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
