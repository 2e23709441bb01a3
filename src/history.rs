//! In-memory history buffers for live tracks and AIS vessels.
//!
//! Both buffers only live as long as one socket connection; they are emptied
//! whenever the connection or the followed track changes.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::geo::{icon_bearing, Bounds};
use crate::models::{Coord, CoordBody, CoordsData, Mmsi, SourceType, TrackRef, Vessel};

/// Default number of samples kept per AIS vessel
pub const DEFAULT_VESSEL_HISTORY_LEN: usize = 200;

/// Edge of a track trail, colored by the average of its endpoint speeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: Coord,
    pub to: Coord,
    pub avg_speed: f64,
}

/// Position icon placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconPosition {
    pub coord: Coord,
    /// Icon rotation, present once two points are known
    pub bearing: Option<f64>,
}

/// Everything needed to redraw one track after a batch of samples arrived
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    pub track_name: String,
    pub source_type: SourceType,
    /// True when this batch created the track's history
    pub is_first_batch: bool,
    /// Number of samples accumulated for the track so far
    pub point_count: usize,
    pub trail: Vec<TrailSegment>,
    pub position: Option<IconPosition>,
    /// Top speed marker
    pub trophy: Option<Coord>,
}

#[derive(Debug, Clone)]
struct TrackState {
    track: TrackRef,
    coords: Vec<CoordBody>,
}

/// Chronological samples per track, keyed by track name
#[derive(Debug, Default)]
pub struct TrackHistory {
    tracks: HashMap<String, TrackState>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch to its track and compute the resulting render update
    pub fn add_coords(&mut self, data: CoordsData) -> RenderUpdate {
        let CoordsData { coords, from } = data;
        let track_name = from.track_name.clone();
        let is_first_batch = !self.tracks.contains_key(&track_name);

        let state = self
            .tracks
            .entry(track_name.clone())
            .or_insert_with(|| TrackState {
                track: from.clone(),
                coords: Vec::new(),
            });
        // Track metadata such as the top point may change between batches
        state.track = from;
        state.coords.extend(coords);

        debug!(
            "Track {} now has {} points (first batch: {})",
            track_name,
            state.coords.len(),
            is_first_batch
        );

        let source_type = state.track.source_type;
        RenderUpdate {
            trail: trail_segments(&state.coords),
            position: latest_position(&state.coords, source_type),
            trophy: state.track.top_point.as_ref().map(|p| p.coord),
            point_count: state.coords.len(),
            track_name,
            source_type,
            is_first_batch,
        }
    }

    /// Samples of a track in arrival order
    pub fn coords(&self, track_name: &str) -> &[CoordBody] {
        self.tracks
            .get(track_name)
            .map(|s| s.coords.as_slice())
            .unwrap_or(&[])
    }

    pub fn track(&self, track_name: &str) -> Option<&TrackRef> {
        self.tracks.get(track_name).map(|s| &s.track)
    }

    /// Latest sample across all tracks
    pub fn latest(&self) -> Option<&CoordBody> {
        self.tracks
            .values()
            .filter_map(|s| s.coords.last())
            .max_by_key(|c| c.time)
    }

    /// Icon position of the track with the newest sample
    pub fn latest_position(&self) -> Option<IconPosition> {
        self.tracks
            .values()
            .filter(|s| !s.coords.is_empty())
            .max_by_key(|s| s.coords.last().map(|c| c.time))
            .and_then(|s| latest_position(&s.coords, s.track.source_type))
    }

    /// Bounds of every accumulated sample
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(
            self.tracks
                .values()
                .flat_map(|s| s.coords.iter().map(|c| &c.coord)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

fn trail_segments(coords: &[CoordBody]) -> Vec<TrailSegment> {
    coords
        .windows(2)
        .map(|w| TrailSegment {
            from: w[0].coord,
            to: w[1].coord,
            avg_speed: (w[0].speed + w[1].speed) / 2.0,
        })
        .collect()
}

fn latest_position(coords: &[CoordBody], source_type: SourceType) -> Option<IconPosition> {
    let last = coords.last()?;
    let bearing = match coords {
        [.., prev, last] => Some(icon_bearing(prev.coord, last.coord, source_type)),
        _ => None,
    };
    Some(IconPosition {
        coord: last.coord,
        bearing,
    })
}

/// Bounded AIS position history per vessel, most recent sample first
#[derive(Debug)]
pub struct VesselHistory {
    max_len: usize,
    vessels: HashMap<Mmsi, VecDeque<Vessel>>,
}

impl Default for VesselHistory {
    fn default() -> Self {
        Self::new(DEFAULT_VESSEL_HISTORY_LEN)
    }
}

impl VesselHistory {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
            vessels: HashMap::new(),
        }
    }

    /// Prepend each vessel to its history, dropping the oldest samples
    /// beyond the maximum length. Returns the MMSIs touched, in input order.
    pub fn update(&mut self, vessels: Vec<Vessel>) -> Vec<Mmsi> {
        let mut updated = Vec::with_capacity(vessels.len());
        let mut seen = HashSet::with_capacity(vessels.len());
        for vessel in vessels {
            let mmsi = vessel.mmsi;
            let history = self.vessels.entry(mmsi).or_default();
            history.push_front(vessel);
            history.truncate(self.max_len);
            if seen.insert(mmsi) {
                updated.push(mmsi);
            }
        }
        updated
    }

    /// Most recent sample for a vessel
    pub fn info(&self, mmsi: Mmsi) -> Option<&Vessel> {
        self.vessels.get(&mmsi).and_then(|h| h.front())
    }

    /// All samples of a vessel, most recent first
    pub fn history(&self, mmsi: Mmsi) -> impl Iterator<Item = &Vessel> {
        self.vessels.get(&mmsi).into_iter().flatten()
    }

    /// Trail coordinates, most recent first
    pub fn trail(&self, mmsi: Mmsi) -> Vec<Coord> {
        self.history(mmsi).map(|v| v.coord).collect()
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    pub fn clear(&mut self) {
        self.vessels.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    pub(crate) fn time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_717_243_200 + secs, 0).unwrap()
    }

    pub(crate) fn track_ref(name: &str, source_type: SourceType) -> TrackRef {
        TrackRef {
            track_name: name.to_string(),
            track_title: None,
            boat_name: "Amina".to_string(),
            username: "mle".to_string(),
            source_type,
            distance_meters: 0.0,
            duration: Duration::from_secs(0),
            avg_speed: None,
            top_speed: None,
            avg_water_temp: None,
            avg_outside_temp: None,
            top_point: None,
            start: time(0),
            end: time(0),
        }
    }

    pub(crate) fn point(lat: f64, lng: f64, speed: f64, secs: i64) -> CoordBody {
        CoordBody {
            coord: Coord::new(lat, lng),
            boat_time: None,
            speed,
            depth: 5.0,
            water_temp: None,
            outside_temp: None,
            altitude: None,
            time: time(secs),
        }
    }

    pub(crate) fn vessel(mmsi: u32, lat: f64, secs: i64) -> Vessel {
        Vessel {
            mmsi: Mmsi::try_from(mmsi).unwrap(),
            name: format!("VESSEL {}", mmsi),
            heading: None,
            cog: 90.0,
            sog: 8.0,
            draft: 4.5,
            coord: Coord::new(lat, 25.0),
            timestamp: time(secs),
            destination: None,
        }
    }

    #[test]
    fn first_batch_initializes_track() {
        let mut history = TrackHistory::new();
        let update = history.add_coords(CoordsData {
            coords: vec![point(60.0, 25.0, 4.0, 0)],
            from: track_ref("t1", SourceType::Boat),
        });

        assert!(update.is_first_batch);
        assert_eq!(update.point_count, 1);
        assert!(update.trail.is_empty());
        let position = update.position.unwrap();
        assert_eq!(position.coord, Coord::new(60.0, 25.0));
        assert_eq!(position.bearing, None);
        assert_eq!(update.trophy, None);
    }

    #[test]
    fn batches_append_and_average_speeds() {
        let mut history = TrackHistory::new();
        history.add_coords(CoordsData {
            coords: vec![point(60.0, 25.0, 4.0, 0), point(60.001, 25.0, 6.0, 10)],
            from: track_ref("t1", SourceType::Boat),
        });
        let mut track = track_ref("t1", SourceType::Boat);
        track.top_point = Some(point(60.002, 25.0, 9.0, 20));
        let update = history.add_coords(CoordsData {
            coords: vec![point(60.002, 25.0, 9.0, 20)],
            from: track,
        });

        assert!(!update.is_first_batch);
        assert_eq!(update.point_count, 3);
        assert_eq!(update.trail.len(), 2);
        assert_eq!(update.trail[0].avg_speed, 5.0);
        assert_eq!(update.trail[1].avg_speed, 7.5);
        assert_eq!(update.trophy, Some(Coord::new(60.002, 25.0)));

        // Heading north flips to 360
        let bearing = update.position.unwrap().bearing.unwrap();
        assert!((bearing - 360.0).abs() < 1e-6);
        assert_eq!(history.coords("t1").len(), 3);
        assert_eq!(history.latest().unwrap().speed, 9.0);
    }

    #[test]
    fn vehicle_tracks_rotate_icon() {
        let mut history = TrackHistory::new();
        let update = history.add_coords(CoordsData {
            coords: vec![point(0.0, 25.0, 4.0, 0), point(0.0, 25.001, 4.0, 10)],
            from: track_ref("car", SourceType::Vehicle),
        });
        // East is 90, flipped to 270, rotated to 0
        let bearing = update.position.unwrap().bearing.unwrap();
        assert!(bearing.min(360.0 - bearing) < 1e-6);
    }

    #[test]
    fn track_history_clear() {
        let mut history = TrackHistory::new();
        history.add_coords(CoordsData {
            coords: vec![point(60.0, 25.0, 4.0, 0)],
            from: track_ref("t1", SourceType::Boat),
        });
        history.clear();

        assert!(history.is_empty());
        assert!(history.coords("t1").is_empty());
        assert!(history.track("t1").is_none());
        assert!(history.latest().is_none());
        assert!(history.bounds().is_none());
    }

    #[test]
    fn vessel_history_bounded_most_recent_first() {
        let mut history = VesselHistory::default();
        let mmsis = [230_000_001u32, 230_000_002, 230_000_003];

        for n in 0..250i64 {
            let batch = mmsis
                .iter()
                .map(|m| vessel(*m, 60.0 + n as f64 * 0.001, n))
                .collect();
            history.update(batch);

            for m in mmsis {
                let mmsi = Mmsi::try_from(m).unwrap();
                let samples: Vec<_> = history.history(mmsi).collect();
                assert_eq!(samples.len(), ((n + 1) as usize).min(200));
                assert!(samples.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
            }
        }

        let mmsi = Mmsi::try_from(mmsis[0]).unwrap();
        assert_eq!(history.info(mmsi).unwrap().timestamp, time(249));
        assert_eq!(history.trail(mmsi).last().unwrap().lat, 60.0 + 50.0 * 0.001);
    }

    #[test]
    fn vessel_history_unknown_and_clear() {
        let mut history = VesselHistory::new(3);
        let updated = history.update(vec![vessel(230_000_001, 60.0, 0)]);
        assert_eq!(updated, vec![Mmsi::try_from(230_000_001).unwrap()]);
        assert!(history.info(Mmsi::try_from(1).unwrap()).is_none());

        history.clear();
        assert!(history.is_empty());
        assert!(history.info(Mmsi::try_from(230_000_001).unwrap()).is_none());
        assert!(history.trail(Mmsi::try_from(230_000_001).unwrap()).is_empty());
    }

    #[test]
    fn vessel_history_repeated_mmsi_in_one_batch() {
        let mut history = VesselHistory::default();
        let updated = history.update(vec![
            vessel(230_000_002, 60.0, 0),
            vessel(230_000_001, 60.0, 0),
            vessel(230_000_002, 60.1, 5),
            vessel(230_000_001, 60.1, 5),
            vessel(230_000_002, 60.2, 10),
        ]);

        let first = Mmsi::try_from(230_000_001).unwrap();
        let second = Mmsi::try_from(230_000_002).unwrap();
        assert_eq!(updated, vec![second, first]);
        assert_eq!(history.len(), 2);

        let lats: Vec<f64> = history.trail(second).iter().map(|c| c.lat).collect();
        assert_eq!(lats, vec![60.2, 60.1, 60.0]);
        assert_eq!(history.info(first).unwrap().timestamp, time(5));
    }
}
