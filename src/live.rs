//! Live track and vessel state driven by socket messages.
//!
//! A [`LiveTracker`] is owned by the task that renders the map. It is plain
//! `&mut self` state with no locking; feed it messages in arrival order and
//! apply the returned updates to the map.

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::camera::{CameraCommand, MapCamera, MapMode};
use crate::config::TrackerConfig;
use crate::history::{RenderUpdate, TrackHistory, VesselHistory};
use crate::models::{Coord, Mmsi, Vessel};
use crate::socket::{SocketEvent, SocketMessage};

/// Data state of the followed track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Connecting,
    Loading,
    Live,
    NoData,
}

/// Icon and trail of one AIS vessel
#[derive(Debug, Clone, PartialEq)]
pub struct VesselRender {
    pub mmsi: Mmsi,
    pub name: String,
    pub coord: Coord,
    pub bearing: f64,
    /// Most recent first
    pub trail: Vec<Coord>,
}

/// Render command for the map view
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    Track {
        render: RenderUpdate,
        camera: CameraCommand,
    },
    Vessels(Vec<VesselRender>),
    Status(FeedStatus),
    /// Remove every live trail and icon
    Cleared,
}

#[derive(Debug)]
pub struct LiveTracker {
    tracks: TrackHistory,
    vessels: VesselHistory,
    camera: MapCamera,
    status: FeedStatus,
}

impl LiveTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracks: TrackHistory::new(),
            vessels: VesselHistory::new(config.vessel_history_len),
            camera: MapCamera::new(config.fit_padding, config.initial_pitch),
            status: FeedStatus::Connecting,
        }
    }

    pub fn handle(&mut self, message: SocketMessage) -> Vec<LiveUpdate> {
        match message {
            SocketMessage::Connected => {
                info!("Socket connected, starting from empty state");
                self.clear();
                self.camera.reset();
                vec![LiveUpdate::Cleared, self.set_status(FeedStatus::Loading)]
            }
            SocketMessage::Disconnected => {
                info!("Socket disconnected, dropping live state");
                self.clear();
                self.camera.reset();
                vec![LiveUpdate::Cleared, self.set_status(FeedStatus::Connecting)]
            }
            SocketMessage::Event(event) => self.handle_event(event),
        }
    }

    fn handle_event(&mut self, event: SocketEvent) -> Vec<LiveUpdate> {
        match event {
            SocketEvent::Ping => {
                trace!("ping");
                Vec::new()
            }
            SocketEvent::Loading => vec![self.set_status(FeedStatus::Loading)],
            SocketEvent::NoData => vec![self.set_status(FeedStatus::NoData)],
            SocketEvent::Coords(data) => {
                let mut updates = Vec::with_capacity(2);
                if self.status != FeedStatus::Live {
                    updates.push(self.set_status(FeedStatus::Live));
                }
                let render = self.tracks.add_coords(data);
                let camera = self.camera.on_update(&render, self.tracks.bounds());
                updates.push(LiveUpdate::Track { render, camera });
                updates
            }
            SocketEvent::Vessels(data) => {
                let updated = self.vessels.update(data.vessels);
                debug!("Updated {} vessels", updated.len());
                let renders = updated
                    .into_iter()
                    .filter_map(|mmsi| {
                        let latest = self.vessels.info(mmsi)?;
                        Some(VesselRender {
                            mmsi,
                            name: latest.name.clone(),
                            coord: latest.coord,
                            bearing: latest.bearing(),
                            trail: self.vessels.trail(mmsi),
                        })
                    })
                    .collect();
                vec![LiveUpdate::Vessels(renders)]
            }
        }
    }

    fn set_status(&mut self, status: FeedStatus) -> LiveUpdate {
        self.status = status;
        LiveUpdate::Status(status)
    }

    fn clear(&mut self) {
        self.tracks.clear();
        self.vessels.clear();
    }

    /// Messages were lost between the socket and this tracker. What is held
    /// no longer matches the server, so start over from the next batch.
    pub fn resync(&mut self) -> Vec<LiveUpdate> {
        self.clear();
        self.camera.reset();
        vec![LiveUpdate::Cleared, self.set_status(FeedStatus::Loading)]
    }

    /// The user picked another track; the caller reconnects the socket
    pub fn switch_track(&mut self) -> LiveUpdate {
        self.clear();
        self.camera.reset();
        self.status = FeedStatus::Connecting;
        LiveUpdate::Cleared
    }

    /// The app went to the background and the socket is closed
    pub fn background(&mut self) -> LiveUpdate {
        self.clear();
        self.status = FeedStatus::Connecting;
        LiveUpdate::Cleared
    }

    /// User toggled the follow button
    pub fn toggle_follow(&mut self) -> CameraCommand {
        let latest = self.tracks.latest_position();
        self.camera
            .toggle_follow(latest.map(|p| p.coord), latest.and_then(|p| p.bearing))
    }

    pub fn user_panned(&mut self) {
        self.camera.user_panned();
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.camera.set_pitch(pitch);
    }

    pub fn vessel_info(&self, mmsi: Mmsi) -> Option<&Vessel> {
        self.vessels.info(mmsi)
    }

    pub fn tracks(&self) -> &TrackHistory {
        &self.tracks
    }

    pub fn vessels(&self) -> &VesselHistory {
        &self.vessels
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn camera_mode(&self) -> MapMode {
        self.camera.mode()
    }
}

/// Feed socket messages to `tracker` until the channel closes, handing every
/// resulting update to `on_update`. Returns the tracker in its final state.
pub async fn run<F>(
    mut rx: broadcast::Receiver<SocketMessage>,
    mut tracker: LiveTracker,
    mut on_update: F,
) -> LiveTracker
where
    F: FnMut(&LiveUpdate),
{
    loop {
        let updates = match rx.recv().await {
            Ok(message) => tracker.handle(message),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Live tracker lagged, skipped {} messages, resyncing", skipped);
                tracker.resync()
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        for update in &updates {
            on_update(update);
        }
    }
    tracker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::{point, track_ref, vessel};
    use crate::models::{CoordsData, SourceType, VesselsData};

    fn coords(points: Vec<crate::models::CoordBody>) -> SocketMessage {
        SocketMessage::Event(SocketEvent::Coords(CoordsData {
            coords: points,
            from: track_ref("t1", SourceType::Boat),
        }))
    }

    #[test]
    fn coords_drive_camera_and_status() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(SocketMessage::Connected);
        assert_eq!(tracker.status(), FeedStatus::Loading);

        let updates = tracker.handle(coords(vec![
            point(60.0, 25.0, 4.0, 0),
            point(60.001, 25.0, 4.0, 10),
        ]));
        assert_eq!(updates[0], LiveUpdate::Status(FeedStatus::Live));
        assert!(matches!(
            updates[1],
            LiveUpdate::Track { camera: CameraCommand::FitBounds { .. }, .. }
        ));
        assert_eq!(tracker.camera_mode(), MapMode::Fit);

        let updates = tracker.handle(coords(vec![point(60.002, 25.0, 4.0, 20)]));
        assert_eq!(updates.len(), 1);
        assert!(matches!(
            updates[0],
            LiveUpdate::Track { camera: CameraCommand::FlyTo { .. }, .. }
        ));
        assert_eq!(tracker.camera_mode(), MapMode::Follow);
    }

    #[test]
    fn vessels_render_with_trails() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(SocketMessage::Event(SocketEvent::Vessels(VesselsData {
            vessels: vec![vessel(230_000_001, 60.0, 0)],
        })));
        let updates = tracker.handle(SocketMessage::Event(SocketEvent::Vessels(VesselsData {
            vessels: vec![vessel(230_000_001, 60.1, 10)],
        })));

        match &updates[0] {
            LiveUpdate::Vessels(renders) => {
                assert_eq!(renders.len(), 1);
                assert_eq!(renders[0].coord.lat, 60.1);
                assert_eq!(renders[0].bearing, 90.0);
                assert_eq!(renders[0].trail.len(), 2);
                assert_eq!(renders[0].trail[0].lat, 60.1);
            }
            other => panic!("expected vessels, got {:?}", other),
        }
    }

    #[test]
    fn disconnect_clears_state() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(coords(vec![point(60.0, 25.0, 4.0, 0)]));
        tracker.handle(SocketMessage::Event(SocketEvent::Vessels(VesselsData {
            vessels: vec![vessel(230_000_001, 60.0, 0)],
        })));

        let updates = tracker.handle(SocketMessage::Disconnected);
        assert_eq!(updates[0], LiveUpdate::Cleared);
        assert!(tracker.tracks().is_empty());
        assert!(tracker.vessels().is_empty());
        assert!(tracker
            .vessel_info(Mmsi::try_from(230_000_001).unwrap())
            .is_none());
        assert_eq!(tracker.status(), FeedStatus::Connecting);
    }

    #[test]
    fn switch_track_resets_camera() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(coords(vec![point(60.0, 25.0, 4.0, 0), point(60.001, 25.0, 4.0, 5)]));
        tracker.handle(coords(vec![point(60.002, 25.0, 4.0, 10)]));
        assert_eq!(tracker.camera_mode(), MapMode::Follow);

        assert_eq!(tracker.switch_track(), LiveUpdate::Cleared);
        assert_eq!(tracker.camera_mode(), MapMode::Fit);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn toggle_follow_flies_to_latest() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(coords(vec![point(60.0, 25.0, 4.0, 0), point(60.001, 25.0, 4.0, 5)]));

        assert_eq!(tracker.toggle_follow(), CameraCommand::None);
        assert_eq!(tracker.camera_mode(), MapMode::Stay);

        match tracker.toggle_follow() {
            CameraCommand::FlyTo { center, .. } => assert_eq!(center, Coord::new(60.001, 25.0)),
            other => panic!("expected fly to, got {:?}", other),
        }
        assert_eq!(tracker.camera_mode(), MapMode::Follow);
    }

    #[test]
    fn noise_events_change_status_only() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        assert!(tracker
            .handle(SocketMessage::Event(SocketEvent::Ping))
            .is_empty());
        assert_eq!(
            tracker.handle(SocketMessage::Event(SocketEvent::NoData)),
            vec![LiveUpdate::Status(FeedStatus::NoData)]
        );
    }

    #[test]
    fn reconnect_resets_camera() {
        let mut tracker = LiveTracker::new(&TrackerConfig::default());
        tracker.handle(SocketMessage::Connected);
        tracker.handle(coords(vec![point(60.0, 25.0, 4.0, 0), point(60.001, 25.0, 4.0, 5)]));
        tracker.handle(coords(vec![point(60.002, 25.0, 4.0, 10)]));
        assert_eq!(tracker.camera_mode(), MapMode::Follow);

        tracker.handle(SocketMessage::Disconnected);
        assert_eq!(tracker.camera_mode(), MapMode::Fit);

        tracker.user_panned();
        tracker.handle(SocketMessage::Connected);
        assert_eq!(tracker.camera_mode(), MapMode::Fit);

        let updates = tracker.handle(coords(vec![
            point(60.0, 25.0, 4.0, 20),
            point(60.001, 25.0, 4.0, 25),
        ]));
        match updates.last() {
            Some(LiveUpdate::Track { render, camera }) => {
                assert!(render.is_first_batch);
                assert!(matches!(camera, CameraCommand::FitBounds { .. }));
            }
            other => panic!("expected track update, got {:?}", other),
        }
        assert_eq!(tracker.camera_mode(), MapMode::Fit);
    }

    #[tokio::test]
    async fn lagged_receiver_resyncs() {
        let (tx, rx) = broadcast::channel(2);
        tx.send(SocketMessage::Connected).unwrap();
        for n in 0..5i64 {
            tx.send(coords(vec![point(60.0 + n as f64 * 0.001, 25.0, 4.0, n * 10)]))
                .unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        let tracker = run(rx, LiveTracker::new(&TrackerConfig::default()), |update| {
            seen.push(update.clone())
        })
        .await;

        assert_eq!(seen[0], LiveUpdate::Cleared);
        assert_eq!(seen[1], LiveUpdate::Status(FeedStatus::Loading));
        assert_eq!(seen[2], LiveUpdate::Status(FeedStatus::Live));
        match &seen[3] {
            LiveUpdate::Track { render, camera } => {
                assert!(render.is_first_batch);
                assert_eq!(render.point_count, 1);
                assert!(matches!(camera, CameraCommand::FitBounds { .. }));
            }
            other => panic!("expected track update, got {:?}", other),
        }
        assert_eq!(seen.len(), 5);

        let kept: Vec<f64> = tracker.tracks().coords("t1").iter().map(|c| c.coord.lat).collect();
        assert_eq!(kept, vec![60.0 + 3.0 * 0.001, 60.0 + 4.0 * 0.001]);
        assert_eq!(tracker.status(), FeedStatus::Live);
    }
}
