//! Resolution of map taps into typed popover content.
//!
//! Layers are queried in a fixed priority order and the first feature whose
//! properties decode wins. A feature that fails to decode counts as no match
//! so that lower priority layers still get a chance.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Mmsi, SourceType};

/// Layer identifiers used by the live map style
pub mod layers {
    pub const BOAT_ICON: &str = "boat-icon";
    pub const VEHICLE_ICON: &str = "vehicle-icon";
    pub const AIS_VESSEL: &str = "ais-vessel";
    pub const AIS_TRAIL: &str = "ais-trail";
    pub const TROPHY_ICON: &str = "trophy-icon";
    pub const MARKS: &str = "marks";
    pub const TRACK_TRAIL: &str = "track-trail";
    pub const FAIRWAY_AREAS: &str = "fairway-areas";
    pub const LIMIT_AREAS: &str = "limit-areas";
    pub const SPEED_LIMITS: &str = "speed-limits";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rendered feature returned by the map engine
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub layer_id: String,
    pub properties: Map<String, Value>,
}

/// Query interface to the map renderer
pub trait FeatureSource {
    /// Features rendered at `point` in any of `layer_ids`, topmost first
    fn features_at(&self, point: ScreenPoint, layer_ids: &[String]) -> Vec<Feature>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatTap {
    pub track_name: String,
    pub boat_name: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselTap {
    pub mmsi: Mmsi,
    pub name: String,
    pub sog: f64,
    pub cog: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub draft: Option<f64>,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrophyTap {
    pub track_name: String,
    pub top_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkTap {
    /// Symbol code of the navigational mark, e.g. `lateral-red`
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailTap {
    pub track_name: String,
    pub avg_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairwayTap {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_depth: Option<f64>,
    #[serde(default)]
    pub max_depth: Option<f64>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitTap {
    /// Comma separated limit types as published by the fairway authority
    pub types: String,
    /// Speed limit in km/h
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub fairway_name: Option<String>,
}

/// Content to show for a tap
#[derive(Debug, Clone, PartialEq)]
pub enum TapResult {
    Boat(BoatTap),
    Vessel(VesselTap),
    Trophy(TrophyTap),
    Mark(MarkTap),
    Trail(TrailTap),
    Fairway(FairwayTap),
    Limit(LimitTap),
}

pub type Decoder = fn(&Feature) -> Result<TapResult, serde_json::Error>;

/// One priority level: the layers to query and how to decode their features
#[derive(Debug, Clone)]
pub struct TapLayerSet {
    pub layer_ids: Vec<String>,
    pub decode: Decoder,
}

impl TapLayerSet {
    pub fn new(layer_ids: &[&str], decode: Decoder) -> Self {
        Self {
            layer_ids: layer_ids.iter().map(|s| s.to_string()).collect(),
            decode,
        }
    }
}

fn properties<T: DeserializeOwned>(feature: &Feature) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(feature.properties.clone()))
}

fn decode_boat(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Boat)
}

fn decode_vessel(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Vessel)
}

fn decode_trophy(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Trophy)
}

fn decode_mark(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Mark)
}

fn decode_trail(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Trail)
}

fn decode_fairway(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Fairway)
}

fn decode_limit(f: &Feature) -> Result<TapResult, serde_json::Error> {
    properties(f).map(TapResult::Limit)
}

#[derive(Debug, Clone)]
pub struct TapResolver {
    levels: Vec<TapLayerSet>,
}

impl Default for TapResolver {
    fn default() -> Self {
        use layers::*;

        Self::new(vec![
            TapLayerSet::new(&[BOAT_ICON, VEHICLE_ICON], decode_boat),
            TapLayerSet::new(&[AIS_VESSEL, AIS_TRAIL], decode_vessel),
            TapLayerSet::new(&[TROPHY_ICON], decode_trophy),
            TapLayerSet::new(&[MARKS], decode_mark),
            TapLayerSet::new(&[TRACK_TRAIL], decode_trail),
            TapLayerSet::new(&[FAIRWAY_AREAS], decode_fairway),
            TapLayerSet::new(&[LIMIT_AREAS, SPEED_LIMITS], decode_limit),
        ])
    }
}

impl TapResolver {
    /// Resolver over custom levels, highest priority first
    pub fn new(levels: Vec<TapLayerSet>) -> Self {
        Self { levels }
    }

    pub fn on_tap(&self, source: &impl FeatureSource, point: ScreenPoint) -> Option<TapResult> {
        self.levels.iter().find_map(|level| {
            source
                .features_at(point, &level.layer_ids)
                .iter()
                .find_map(|feature| match (level.decode)(feature) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        debug!("Skipping feature in {}: {}", feature.layer_id, e);
                        None
                    }
                })
        })
    }
}
