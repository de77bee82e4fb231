//! Data source implementations

pub mod polling_tentacle_deployment_targets;

pub use polling_tentacle_deployment_targets::PollingTentacleDeploymentTargetsDataSource;
