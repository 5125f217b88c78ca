//! Request parameters for the pipeline operations and the typed parameter
//! records handed to each engine.
//!
//! Incoming parameters are deserialized with every field optional so that
//! validation can report all missing names at once, not just the first.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geo::Waypoint;

/// Raw parameters for a full route computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteParameters {
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub goal_lat: Option<f64>,
    pub goal_lon: Option<f64>,
    pub ship_speed: Option<f64>,
    pub ship_height: Option<f64>,
    pub ship_dis: Option<f64>,
    pub area_front: Option<f64>,
    pub ship_reso: Option<f64>,
    pub hull_eff: Option<f64>,
    pub prop_eff: Option<f64>,
    pub engine_eff: Option<f64>,
    pub c_sfoc: Option<f64>,
    pub shipw: Option<Vec<f64>>,
}

impl RouteParameters {
    /// Names of required parameters that are absent, in declaration order.
    pub fn missing(&self) -> Vec<&'static str> {
        let present = [
            ("start_lat", self.start_lat.is_some()),
            ("start_lon", self.start_lon.is_some()),
            ("goal_lat", self.goal_lat.is_some()),
            ("goal_lon", self.goal_lon.is_some()),
            ("ship_speed", self.ship_speed.is_some()),
            ("ship_height", self.ship_height.is_some()),
            ("ship_dis", self.ship_dis.is_some()),
            ("area_front", self.area_front.is_some()),
            ("ship_reso", self.ship_reso.is_some()),
            ("hull_eff", self.hull_eff.is_some()),
            ("prop_eff", self.prop_eff.is_some()),
            ("engine_eff", self.engine_eff.is_some()),
            ("c_sfoc", self.c_sfoc.is_some()),
            ("shipw", self.shipw.is_some()),
        ];
        missing_names(&present)
    }

    /// Validate and convert into a typed [`RouteRequest`].
    pub fn to_request(&self) -> Result<RouteRequest> {
        let (
            Some(start_lat),
            Some(start_lon),
            Some(goal_lat),
            Some(goal_lon),
            Some(ship_speed),
            Some(ship_height),
            Some(ship_dis),
            Some(area_front),
            Some(ship_reso),
            Some(hull_eff),
            Some(prop_eff),
            Some(engine_eff),
            Some(c_sfoc),
            Some(shipw),
        ) = (
            self.start_lat,
            self.start_lon,
            self.goal_lat,
            self.goal_lon,
            self.ship_speed,
            self.ship_height,
            self.ship_dis,
            self.area_front,
            self.ship_reso,
            self.hull_eff,
            self.prop_eff,
            self.engine_eff,
            self.c_sfoc,
            self.shipw.as_ref(),
        )
        else {
            return Err(missing_error(self.missing()));
        };

        let start = coordinate("start", start_lat, start_lon)?;
        let goal = coordinate("goal", goal_lat, goal_lon)?;
        validate_weights(shipw)?;

        Ok(RouteRequest {
            start,
            goal,
            vessel: VesselParams {
                ship_speed,
                ship_dis,
                area_front,
                ship_height,
                ship_reso,
                hull_eff,
                prop_eff,
                engine_eff,
                c_sfoc,
            },
            shipw: shipw.clone(),
        })
    }
}

/// Raw parameters for the reposition operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositionParameters {
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub goal_lat: Option<f64>,
    pub goal_lon: Option<f64>,
    pub shipw: Option<Vec<f64>>,
    /// Opaque repositioning mode selector forwarded to the optimizer.
    pub flag: Option<Value>,
}

impl RepositionParameters {
    /// Names of required parameters that are absent, in declaration order.
    pub fn missing(&self) -> Vec<&'static str> {
        let present = [
            ("start_lat", self.start_lat.is_some()),
            ("start_lon", self.start_lon.is_some()),
            ("goal_lat", self.goal_lat.is_some()),
            ("goal_lon", self.goal_lon.is_some()),
            ("shipw", self.shipw.is_some()),
            ("flag", self.flag.is_some()),
        ];
        missing_names(&present)
    }

    /// Validate and convert into a typed [`RepositionRequest`].
    pub fn to_request(&self) -> Result<RepositionRequest> {
        let (
            Some(start_lat),
            Some(start_lon),
            Some(goal_lat),
            Some(goal_lon),
            Some(shipw),
            Some(flag),
        ) = (
            self.start_lat,
            self.start_lon,
            self.goal_lat,
            self.goal_lon,
            self.shipw.as_ref(),
            self.flag.as_ref(),
        ) else {
            return Err(missing_error(self.missing()));
        };

        let start = coordinate("start", start_lat, start_lon)?;
        let goal = coordinate("goal", goal_lat, goal_lon)?;
        validate_weights(shipw)?;

        Ok(RepositionRequest {
            start,
            goal,
            shipw: shipw.clone(),
            flag: flag.clone(),
        })
    }
}

/// Vessel and physical parameters consumed by the pathfinding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselParams {
    pub ship_speed: f64,
    pub ship_dis: f64,
    pub area_front: f64,
    pub ship_height: f64,
    pub ship_reso: f64,
    pub hull_eff: f64,
    pub prop_eff: f64,
    pub engine_eff: f64,
    pub c_sfoc: f64,
}

/// Validated full route computation request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub start: Waypoint,
    pub goal: Waypoint,
    pub vessel: VesselParams,
    pub shipw: Vec<f64>,
}

impl RouteRequest {
    pub fn pathfinder_params(&self) -> PathfinderParams {
        PathfinderParams {
            start_lat: self.start.lat,
            start_lon: self.start.lon,
            goal_lat: self.goal.lat,
            goal_lon: self.goal.lon,
            vessel: self.vessel.clone(),
        }
    }

    pub fn optimizer_params(&self) -> OptimizerParams {
        OptimizerParams {
            start_lat: self.start.lat,
            start_lon: self.start.lon,
            goal_lat: self.goal.lat,
            goal_lon: self.goal.lon,
            shipw: self.shipw.clone(),
            flag: None,
        }
    }
}

/// Validated reposition request.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositionRequest {
    pub start: Waypoint,
    pub goal: Waypoint,
    pub shipw: Vec<f64>,
    pub flag: Value,
}

impl RepositionRequest {
    pub fn optimizer_params(&self) -> OptimizerParams {
        OptimizerParams {
            start_lat: self.start.lat,
            start_lon: self.start.lon,
            goal_lat: self.goal.lat,
            goal_lon: self.goal.lon,
            shipw: self.shipw.clone(),
            flag: Some(self.flag.clone()),
        }
    }
}

/// Parameters passed to the pathfinding engine, using its external names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathfinderParams {
    pub start_lat: f64,
    pub start_lon: f64,
    pub goal_lat: f64,
    pub goal_lon: f64,
    #[serde(flatten)]
    pub vessel: VesselParams,
}

/// Parameters passed to the optimizer engine, using its external names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerParams {
    pub start_lat: f64,
    pub start_lon: f64,
    pub goal_lat: f64,
    pub goal_lon: f64,
    pub shipw: Vec<f64>,
    /// Present only in repositioning mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<Value>,
}

fn missing_names(present: &[(&'static str, bool)]) -> Vec<&'static str> {
    present
        .iter()
        .filter(|(_, is_present)| !is_present)
        .map(|(name, _)| *name)
        .collect()
}

fn missing_error(missing: Vec<&'static str>) -> Error {
    Error::MissingParameters {
        missing: missing.into_iter().map(String::from).collect(),
    }
}

fn coordinate(prefix: &str, lat: f64, lon: f64) -> Result<Waypoint> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::InvalidParameter {
            name: format!("{prefix}_lat"),
            reason: format!("latitude must be within [-90, 90], got {lat}"),
        });
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidParameter {
            name: format!("{prefix}_lon"),
            reason: format!("longitude must be within [-180, 180], got {lon}"),
        });
    }
    Ok(Waypoint::new(lat, lon))
}

fn validate_weights(shipw: &[f64]) -> Result<()> {
    if shipw.is_empty() {
        return Err(Error::InvalidParameter {
            name: "shipw".to_string(),
            reason: "at least one weight is required".to_string(),
        });
    }
    if shipw.iter().any(|w| !w.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "shipw".to_string(),
            reason: "weights must be finite numbers".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete() -> RouteParameters {
        serde_json::from_value(json!({
            "start_lat": 10.0, "start_lon": 70.0, "goal_lat": 15.0, "goal_lon": 75.0,
            "ship_speed": 12, "ship_height": 8, "ship_dis": 200, "area_front": 500,
            "ship_reso": 1, "hull_eff": 0.9, "prop_eff": 0.7, "engine_eff": 0.4,
            "c_sfoc": 180, "shipw": [0.3, 0.3, 0.4]
        }))
        .unwrap()
    }

    #[test]
    fn complete_parameters_convert() {
        let request = complete().to_request().unwrap();
        assert_eq!(request.start, Waypoint::new(10.0, 70.0));
        assert_eq!(request.goal, Waypoint::new(15.0, 75.0));
        assert_eq!(request.vessel.c_sfoc, 180.0);
        assert_eq!(request.shipw, vec![0.3, 0.3, 0.4]);
    }

    #[test]
    fn missing_goal_lat_is_reported_alone() {
        let mut params = complete();
        params.goal_lat = None;
        match params.to_request().unwrap_err() {
            Error::MissingParameters { missing } => assert_eq!(missing, vec!["goal_lat"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn every_missing_parameter_is_reported() {
        let err = RouteParameters::default().to_request().unwrap_err();
        match err {
            Error::MissingParameters { missing } => {
                assert_eq!(missing.len(), 14);
                assert_eq!(missing[0], "start_lat");
                assert_eq!(missing[13], "shipw");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_null_counts_as_missing() {
        let params: RouteParameters =
            serde_json::from_value(json!({"start_lat": null, "start_lon": 70.0})).unwrap();
        assert!(params.missing().contains(&"start_lat"));
        assert!(!params.missing().contains(&"start_lon"));
    }

    #[test]
    fn out_of_range_latitude_is_invalid() {
        let mut params = complete();
        params.start_lat = Some(91.0);
        let err = params.to_request().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "start_lat"));
    }

    #[test]
    fn empty_weights_are_invalid() {
        let mut params = complete();
        params.shipw = Some(Vec::new());
        assert!(matches!(
            params.to_request(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn pathfinder_params_use_external_names() {
        let value = serde_json::to_value(complete().to_request().unwrap().pathfinder_params())
            .unwrap();
        for key in [
            "start_lat", "start_lon", "goal_lat", "goal_lon", "ship_speed", "ship_dis",
            "area_front", "ship_height", "ship_reso", "hull_eff", "prop_eff", "engine_eff",
            "c_sfoc",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("vessel").is_none());
    }

    #[test]
    fn optimizer_params_omit_flag_outside_reposition() {
        let value = serde_json::to_value(complete().to_request().unwrap().optimizer_params())
            .unwrap();
        assert!(value.get("flag").is_none());
        assert_eq!(value["shipw"], json!([0.3, 0.3, 0.4]));
    }

    #[test]
    fn reposition_requires_flag() {
        let params: RepositionParameters = serde_json::from_value(json!({
            "start_lat": 10.0, "start_lon": 70.0, "goal_lat": 15.0, "goal_lon": 75.0,
            "shipw": [1.0]
        }))
        .unwrap();
        match params.to_request().unwrap_err() {
            Error::MissingParameters { missing } => assert_eq!(missing, vec!["flag"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reposition_forwards_flag() {
        let params: RepositionParameters = serde_json::from_value(json!({
            "start_lat": 10.0, "start_lon": 70.0, "goal_lat": 15.0, "goal_lon": 75.0,
            "shipw": [1.0], "flag": 1
        }))
        .unwrap();
        let optimizer = params.to_request().unwrap().optimizer_params();
        assert_eq!(optimizer.flag, Some(json!(1)));
    }
}
