//! Error types for the planner.

use thiserror::Error;

/// Planner error type.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No waypoint near the vehicle pose")]
    NoWaypointNearPose,

    #[error("Planned path is empty")]
    EmptyPath,
}

pub type Result<T> = std::result::Result<T, PlannerError>;
