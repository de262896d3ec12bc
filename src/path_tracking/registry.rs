//! Name → constructor registry for tracking policies

use serde::{Deserialize, Serialize};

use crate::common::{ControllerPolicy, NamedController, RoboticsError, RoboticsResult, SharedMap};
use crate::path_tracking::{
    AdaptiveMpcConfig, AdaptiveMpcController, HybridMiConfig, HybridMiController, MpcConfig,
    MpcController, MultiPurposeMpcConfig, MultiPurposeMpcController, PurePursuitConfig,
    PurePursuitController, StanleyConfig, StanleyController, TrackingConfig,
};

/// Parameters shared by every policy built from the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParams {
    /// MPC prediction horizon [steps]
    pub horizon: usize,
    pub dt: f64,
    pub wheelbase: f64,
    /// Pure pursuit lookahead [m]
    pub lookahead_distance: f64,
    /// Stanley cross-track gain
    pub stanley_gain: f64,
    pub target_speed: f64,
    pub goal_tolerance: f64,
    pub max_time: f64,
    pub check_collisions: bool,
}

impl Default for ControllerParams {
    fn default() -> Self {
        let tracking = TrackingConfig::default();
        Self {
            horizon: 10,
            dt: tracking.dt,
            wheelbase: tracking.wheelbase,
            lookahead_distance: 5.0,
            stanley_gain: 0.1,
            target_speed: tracking.target_speed,
            goal_tolerance: tracking.goal_tolerance,
            max_time: tracking.max_time,
            check_collisions: tracking.check_collisions,
        }
    }
}

impl ControllerParams {
    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            dt: self.dt,
            wheelbase: self.wheelbase,
            target_speed: self.target_speed,
            goal_tolerance: self.goal_tolerance,
            max_time: self.max_time,
            check_collisions: self.check_collisions,
            ..Default::default()
        }
    }

    pub fn mpc_config(&self) -> MpcConfig {
        MpcConfig {
            tracking: self.tracking_config(),
            horizon: self.horizon,
            ..Default::default()
        }
    }
}

pub type ControllerFactory = Box<dyn Fn(&ControllerParams, SharedMap) -> Box<dyn ControllerPolicy>>;

/// Policies in registration order
pub struct ControllerRegistry {
    factories: Vec<(String, ControllerFactory)>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        ControllerRegistry { factories: Vec::new() }
    }

    /// All six built-in policies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("pure_pursuit", |p, map| {
            let config = PurePursuitConfig {
                tracking: p.tracking_config(),
                lookahead_distance: p.lookahead_distance,
                ..Default::default()
            };
            Box::new(PurePursuitController::new(config, map))
        });
        registry.register("mpc_basic", |p, map| {
            Box::new(MpcController::new(p.mpc_config(), map))
        });
        registry.register("adaptive_mpc", |p, map| {
            let config = AdaptiveMpcConfig { mpc: p.mpc_config(), ..Default::default() };
            Box::new(AdaptiveMpcController::new(config, map))
        });
        registry.register("hybrid_mi", |p, map| {
            let config = HybridMiConfig {
                mpc: p.mpc_config(),
                stanley_gain: p.stanley_gain,
                ..Default::default()
            };
            Box::new(HybridMiController::new(config, map))
        });
        registry.register("multi_purpose_mpc", |p, map| {
            let config = MultiPurposeMpcConfig { mpc: p.mpc_config(), ..Default::default() };
            Box::new(MultiPurposeMpcController::new(config, map))
        });
        registry.register("stanley", |p, map| {
            let config = StanleyConfig {
                tracking: p.tracking_config(),
                k: p.stanley_gain,
                ..Default::default()
            };
            Box::new(StanleyController::new(config, map))
        });
        registry
    }

    /// Register `factory` under `name`; an existing entry keeps its position.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ControllerParams, SharedMap) -> Box<dyn ControllerPolicy> + 'static,
    {
        let factory: ControllerFactory = Box::new(factory);
        match self.factories.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((name.to_string(), factory)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(n, _)| n == name)
    }

    pub fn build(&self, name: &str, params: &ControllerParams, map: SharedMap) -> RoboticsResult<Box<dyn ControllerPolicy>> {
        self.factories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory(params, map))
            .ok_or_else(|| RoboticsError::UnknownController(name.to_string()))
    }

    /// Every policy, paired with its registry name, in registration order
    pub fn build_all(&self, params: &ControllerParams, map: SharedMap) -> Vec<NamedController> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory(params, map.clone())))
            .collect()
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ObstacleGridMap;
    use std::sync::Arc;

    fn map() -> SharedMap {
        Arc::new(ObstacleGridMap::empty(10, 10).unwrap())
    }

    #[test]
    fn test_defaults_in_order() {
        let registry = ControllerRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["pure_pursuit", "mpc_basic", "adaptive_mpc", "hybrid_mi", "multi_purpose_mpc", "stanley"]
        );
        let built = registry.build_all(&ControllerParams::default(), map());
        let keys: Vec<&str> = built.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(keys, registry.names());
        let kinds: Vec<&str> = built.iter().map(|(_, c)| c.name()).collect();
        assert_eq!(kinds, registry.names());
    }

    #[test]
    fn test_unknown_controller() {
        let registry = ControllerRegistry::with_defaults();
        match registry.build("lqr", &ControllerParams::default(), map()) {
            Err(RoboticsError::UnknownController(name)) => assert_eq!(name, "lqr"),
            _ => panic!("expected UnknownController"),
        }
    }

    #[test]
    fn test_params_flow_into_policies() {
        let params = ControllerParams { goal_tolerance: 0.25, ..Default::default() };
        let registry = ControllerRegistry::with_defaults();
        for name in registry.names() {
            let controller = registry.build(name, &params, map()).unwrap();
            assert_eq!(controller.goal_tolerance(), 0.25);
        }
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = ControllerRegistry::with_defaults();
        registry.register("mpc_basic", |p, map| {
            Box::new(StanleyController::new(StanleyConfig { tracking: p.tracking_config(), ..Default::default() }, map))
        });
        assert_eq!(registry.names()[1], "mpc_basic");
        assert_eq!(registry.names().len(), 6);
        let controller = registry.build("mpc_basic", &ControllerParams::default(), map()).unwrap();
        assert_eq!(controller.name(), "stanley");

        // the replaced entry is still listed under its registry key
        let built = registry.build_all(&ControllerParams::default(), map());
        assert_eq!(built[1].0, "mpc_basic");
    }

    #[test]
    fn test_same_kind_under_two_names() {
        let mut registry = ControllerRegistry::with_defaults();
        registry.register("stanley_k2", |p, map| {
            let config = StanleyConfig { tracking: p.tracking_config(), k: 2.0, ..Default::default() };
            Box::new(StanleyController::new(config, map))
        });
        let built = registry.build_all(&ControllerParams::default(), map());
        let keys: Vec<&str> = built.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(&keys[5..], &["stanley", "stanley_k2"]);
        assert_eq!(built[6].1.name(), "stanley");
    }

    #[test]
    fn test_params_from_json() {
        let params: ControllerParams = serde_json::from_str(r#"{"horizon": 5, "stanley_gain": 0.3}"#).unwrap();
        assert_eq!(params.horizon, 5);
        assert_eq!(params.stanley_gain, 0.3);
        assert_eq!(params.wheelbase, 2.5);
    }
}
