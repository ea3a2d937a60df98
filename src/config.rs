//! Planner configuration, loaded from JSON.

use crate::cost::CostParams;
use crate::error::{PlannerError, Result};
use crate::follower::ControllerParams;
use crate::rollout::RollOutParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weights of the path smoothing relaxation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Pull towards the original point.
    pub data_weight: f64,
    /// Pull towards the neighbouring points.
    pub smooth_weight: f64,
    /// Smoothing stops once a sweep moves the points less than this in total.
    pub tolerance: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            data_weight: 0.45,
            smooth_weight: 0.4,
            tolerance: 0.1,
        }
    }
}

/// Parameters of the lane graph searches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Budget of the goal search, in m of accumulated expansions.
    pub distance_limit: f64,
    /// The furthest the vehicle may be from the lane graph, in m.
    pub max_start_distance: f64,
    /// The length of the local reference path cut from the global path, in m.
    pub local_path_length: f64,
    /// The spacing of the local reference path, in m.
    pub local_path_density: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            distance_limit: 10_000.0,
            max_start_distance: 5.0,
            local_path_length: 80.0,
            local_path_density: 0.5,
        }
    }
}

/// All the parameters of the planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerParams {
    pub rollout: RollOutParams,
    pub smoothing: SmoothingParams,
    pub search: SearchParams,
    pub cost: CostParams,
    pub controller: ControllerParams,
    /// Upper bound of the speed profile, in m/s.
    pub max_speed: f64,
    /// Scale applied to the speed tiers of the speed profile.
    pub speed_profile_factor: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            rollout: Default::default(),
            smoothing: Default::default(),
            search: Default::default(),
            cost: Default::default(),
            controller: Default::default(),
            max_speed: 15.0,
            speed_profile_factor: 1.0,
        }
    }
}

impl PlannerParams {
    /// Parses and validates parameters from a JSON document.
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Loads and validates parameters from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(PlannerError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )))
            }
        }

        fn smoothing(name: &str, params: &SmoothingParams) -> Result<()> {
            positive(&format!("{}.tolerance", name), params.tolerance)?;
            let weights = [params.data_weight, params.smooth_weight];
            if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} weights must lie in [0, 1], got {:?}",
                    name, weights
                )));
            }
            Ok(())
        }

        positive("max_speed", self.max_speed)?;
        positive("speed_profile_factor", self.speed_profile_factor)?;
        positive("rollout.path_density", self.rollout.path_density)?;
        positive("rollout.max_roll_distance", self.rollout.max_roll_distance)?;
        positive("search.distance_limit", self.search.distance_limit)?;
        positive("search.local_path_length", self.search.local_path_length)?;
        positive("search.local_path_density", self.search.local_path_density)?;
        positive("controller.pursuit_distance", self.controller.pursuit_distance)?;
        positive("controller.max_steer_angle", self.controller.max_steer_angle)?;
        positive("controller.wheel_base", self.controller.wheel_base)?;
        positive("cost.horizon", self.cost.horizon)?;
        smoothing("smoothing", &self.smoothing)?;
        smoothing("rollout.smoothing", &self.rollout.smoothing)?;
        if self.rollout.roll_out_density < 0.0 {
            return Err(PlannerError::InvalidParameter(format!(
                "rollout.roll_out_density must not be negative, got {}",
                self.rollout.roll_out_density
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PlannerParams::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params = PlannerParams::from_json(
            r#"{ "max_speed": 8.0, "rollout": { "roll_out_number": 4 }, "smoothing": { "tolerance": 0.01 } }"#,
        )
        .unwrap();
        assert_eq!(params.max_speed, 8.0);
        assert_eq!(params.rollout.roll_out_number, 4);
        assert_eq!(params.rollout.path_density, RollOutParams::default().path_density);
        assert_eq!(params.smoothing.tolerance, 0.01);
        assert_eq!(params.smoothing.data_weight, 0.45);
        assert_eq!(params.speed_profile_factor, 1.0);
    }

    #[test]
    fn rejects_bad_values() {
        let err = PlannerParams::from_json(r#"{ "rollout": { "path_density": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter(_)));

        let err = PlannerParams::from_json(r#"{ "smoothing": { "smooth_weight": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter(_)));

        let err = PlannerParams::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn missing_file() {
        let err = PlannerParams::from_file("/nonexistent/planner.json").unwrap_err();
        assert!(matches!(err, PlannerError::Io(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let params = PlannerParams::default();
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(PlannerParams::from_json(&json).unwrap(), params);
    }
}
