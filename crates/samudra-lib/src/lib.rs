//! Samudra route pipeline library entry points.
//!
//! This crate sequences the external pathfinding and optimizer engines over a
//! shared file workspace, smooths the primary routes they produce, and
//! publishes the results to a destination area consumed by presentation
//! tooling. Higher-level consumers (CLI, HTTP service) should only depend on
//! the items exported here instead of reimplementing behavior.
//!

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod request;
pub mod results;
pub mod smoothing;
pub mod stages;
pub mod staging;

pub use config::PipelineConfig;
pub use engine::CommandEngine;
pub use error::{Error, ErrorKind, Result};
pub use geo::{Route, RouteObjective, Waypoint};
pub use pipeline::{
    Acknowledgement, PipelineObserver, PipelineOrchestrator, PipelineState, PrimaryRoutes,
    RouteComputation,
};
pub use request::{
    OptimizerParams, PathfinderParams, RepositionParameters, RepositionRequest, RouteParameters,
    RouteRequest, VesselParams,
};
pub use results::{ResultRecord, ResultsTable};
pub use smoothing::{smooth_route, smooth_route_file, SmoothingParams};
pub use stages::{
    EngineError, OptimizerEngine, OptimizerManifest, PathfinderOutput, PathfindingEngine, Stage,
    StageError, StageRunner,
};
pub use staging::{Artifact, OutputStaging, PublishManifest, PublishReport};
