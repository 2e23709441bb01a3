//! Data models.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::errors::BoatTrackerError;

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = BoatTrackerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 999_999_999 {
            return Err(BoatTrackerError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = BoatTrackerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| BoatTrackerError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl From<Mmsi> for u32 {
    fn from(mmsi: Mmsi) -> Self {
        mmsi.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// What kind of thing recorded a track. Vehicle icons are drawn rotated
/// relative to boat icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Boat,
    Vehicle,
    #[serde(other)]
    Other,
}

/// One GPS/sensor sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordBody {
    pub coord: Coord,
    /// Timestamp reported by the boat's own clock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boat_time: Option<DateTime<Utc>>,
    /// Speed in knots
    pub speed: f64,
    /// Depth in meters
    pub depth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outside_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Wall-clock time the sample was received by the server
    pub time: DateTime<Utc>,
}

/// A recorded trip, with aggregate statistics
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    /// Unique id of the track
    pub track_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_title: Option<String>,
    pub boat_name: String,
    pub username: String,
    #[serde(default)]
    pub source_type: SourceType,
    pub distance_meters: f64,
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_water_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_outside_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_point: Option<CoordBody>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A batch of samples for one track, as delivered by one socket message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordsData {
    pub coords: Vec<CoordBody>,
    pub from: TrackRef,
}

/// AIS contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    pub mmsi: Mmsi,
    pub name: String,
    /// True heading in degrees, if the transponder reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Course over ground in degrees
    pub cog: f64,
    /// Speed over ground in knots
    pub sog: f64,
    /// Draft in meters
    pub draft: f64,
    pub coord: Coord,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Vessel {
    /// Heading for the vessel icon, falling back to course over ground
    pub fn bearing(&self) -> f64 {
        self.heading.unwrap_or(self.cog)
    }
}

/// Body of a `vessels` socket event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselsData {
    pub vessels: Vec<Vessel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatInfo {
    pub boat_name: String,
    #[serde(default)]
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub language: String,
    #[serde(default)]
    pub boats: Vec<BoatInfo>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub track_count: u32,
    pub distance_meters: f64,
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed: Option<f64>,
    #[serde(default)]
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestRouteRequest {
    pub from: Coord,
    pub to: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestRoute {
    pub from: Coord,
    pub to: Coord,
    pub coords: Vec<Coord>,
    /// Route length in meters
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatRename {
    #[serde(rename = "boatName")]
    pub boat_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageChange {
    pub language: String,
}

/// Platform tag for push token registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "ios-activity-start")]
    IosActivityStart,
    #[serde(rename = "ios-activity-update")]
    IosActivityUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRegistration {
    pub token: String,
    pub device: DeviceType,
}

/// One machine-readable error returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub key: String,
    pub message: String,
}

impl ApiError {
    pub const TOKEN_EXPIRED: &'static str = "token_expired";
}

/// Error body of a non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrors {
    pub errors: Vec<ApiError>,
}
