use std::sync::Arc;

use rstest::rstest;

use route_bench::benchmark::{run_benchmark, BenchmarkConfig};
use route_bench::config::ScenarioConfig;
use route_bench::mapping::ObstacleGridMap;
use route_bench::path_planning::AStarPlanner;
use route_bench::path_tracking::{ControllerParams, ControllerRegistry, StanleyConfig, StanleyController};
use route_bench::{Pose2D, RoutePlanner, SharedMap};

#[test]
fn open_ten_by_ten_is_all_diagonal() {
    let map = ObstacleGridMap::empty(10, 10).unwrap();
    let plan = AStarPlanner::default()
        .search_route(Pose2D::new(0.0, 0.0, 0.0), Pose2D::new(9.0, 9.0, 0.0), &map)
        .unwrap();
    assert!(plan.reached);
    assert!((plan.total_distance - 9.0 * 2f64.sqrt()).abs() < 1e-9);
    assert_eq!(plan.trajectory.len(), 10);
    for (i, p) in plan.trajectory.points.iter().enumerate() {
        assert_eq!((p.x, p.y), (i as f64, i as f64));
    }
}

#[test]
fn every_policy_benchmarked_on_open_map() {
    let map: SharedMap = Arc::new(ObstacleGridMap::empty(30, 30).unwrap());
    let registry = ControllerRegistry::with_defaults();
    let controllers = registry.build_all(&ControllerParams::default(), map.clone());
    let config = BenchmarkConfig { trials_per_policy: 2, ..Default::default() };

    let report = run_benchmark(map.as_ref(), &AStarPlanner::default(), &controllers, &config).unwrap();

    let names: Vec<&str> = report.policies().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, registry.names());
    for stats in report.policies() {
        assert_eq!(stats.trials, 2);
        assert_eq!(stats.fail_count, 0, "{} failed", stats.name);
        // the route itself is about 16.1 m long
        assert!(stats.mean_distance.unwrap() > 10.0);
    }
    assert_eq!(report.ranking_by_time().len(), 6);
    assert_eq!(report.ranking_by_distance().len(), 6);
}

#[test]
fn report_keys_follow_registry_names() {
    let map: SharedMap = Arc::new(ObstacleGridMap::empty(30, 30).unwrap());
    let mut registry = ControllerRegistry::new();
    registry.register("stanley", |p, map| {
        Box::new(StanleyController::new(StanleyConfig { tracking: p.tracking_config(), ..Default::default() }, map))
    });
    registry.register("stanley_k2", |p, map| {
        let config = StanleyConfig { tracking: p.tracking_config(), k: 2.0, ..Default::default() };
        Box::new(StanleyController::new(config, map))
    });
    let controllers = registry.build_all(&ControllerParams::default(), map.clone());
    let config = BenchmarkConfig { trials_per_policy: 1, ..Default::default() };

    let report = run_benchmark(map.as_ref(), &AStarPlanner::default(), &controllers, &config).unwrap();

    let names: Vec<&str> = report.policies().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["stanley", "stanley_k2"]);
    assert_eq!(report.get("stanley_k2").unwrap().trials, 1);
}

#[rstest]
#[case(r#"{"map": "fixed_grid", "trials": 1}"#)]
#[case(r#"{"map": "parking_lot", "trials": 1}"#)]
#[case(r#"{"map": "random_grid", "seed": 3, "width": 30, "height": 30, "random_obstacles": 8, "trials": 1}"#)]
#[case(r#"{"map": "image_based", "width": 40, "height": 40, "bounding_boxes": [[0, 0, 40, 40], [15, 15, 6, 6]], "trials": 1}"#)]
fn scenario_runs_through_harness(#[case] json: &str) {
    let config = ScenarioConfig::from_json_str(json).unwrap();
    let built = config.build_map().unwrap();
    let controllers = ControllerRegistry::with_defaults().build_all(&config.controller, built.map.clone());

    let report = run_benchmark(
        built.map.as_ref(),
        &AStarPlanner::default(),
        &controllers,
        &config.benchmark_config(&built),
    )
    .unwrap();

    assert_eq!(report.policies().len(), 6);
    for stats in report.policies() {
        assert_eq!(stats.trials, 1);
        assert_eq!(stats.mean_distance.is_some(), stats.fail_count == 0);
    }
}

#[test]
fn report_serializes_to_json() {
    let map: SharedMap = Arc::new(ObstacleGridMap::empty(30, 30).unwrap());
    let controllers = ControllerRegistry::with_defaults().build_all(&ControllerParams::default(), map.clone());
    let config = BenchmarkConfig { trials_per_policy: 1, ..Default::default() };
    let report = run_benchmark(map.as_ref(), &AStarPlanner::default(), &controllers[..1], &config).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["policies"][0];
    assert_eq!(first["name"], "pure_pursuit");
    assert_eq!(first["fail_count"], 0);
    assert!(first.get("total_time").is_none());
}
