//! Camera follow policy for the live map.

use tracing::debug;

use crate::geo::Bounds;
use crate::history::RenderUpdate;
use crate::models::Coord;

/// How the camera reacts to new coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Frame every accumulated point
    #[default]
    Fit,
    /// Center on the latest point, rotated to its bearing
    Follow,
    /// Leave the camera where the user put it
    Stay,
}

/// Instruction for the map view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    None,
    FitBounds { bounds: Bounds, padding: f64 },
    /// Animate to a point, rotating and tilting the map
    FlyTo {
        center: Coord,
        bearing: f64,
        pitch: f64,
    },
    /// Move to a point keeping bearing and pitch
    CenterOn { center: Coord },
}

#[derive(Debug, Clone)]
pub struct MapCamera {
    mode: MapMode,
    fit_padding: f64,
    initial_pitch: f64,
    /// Pitch reported by the map, unset until the camera has tilted once
    pitch: Option<f64>,
}

impl MapCamera {
    pub fn new(fit_padding: f64, initial_pitch: f64) -> Self {
        Self {
            mode: MapMode::Fit,
            fit_padding,
            initial_pitch,
            pitch: None,
        }
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Record the pitch the map currently shows
    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = Some(pitch);
    }

    /// Decide the camera move for a track update. `bounds` frames every point
    /// accumulated so far.
    pub fn on_update(&mut self, update: &RenderUpdate, bounds: Option<Bounds>) -> CameraCommand {
        if self.mode == MapMode::Fit && update.point_count > 1 && !update.is_first_batch {
            debug!("Switching camera from fit to follow on {}", update.track_name);
            self.mode = MapMode::Follow;
        }

        match self.mode {
            MapMode::Fit => match bounds {
                Some(bounds) => CameraCommand::FitBounds {
                    bounds,
                    padding: self.fit_padding,
                },
                None => CameraCommand::None,
            },
            MapMode::Follow => match update.position {
                Some(position) => match position.bearing {
                    Some(bearing) => self.fly_to(position.coord, bearing),
                    None => CameraCommand::CenterOn {
                        center: position.coord,
                    },
                },
                None => CameraCommand::None,
            },
            MapMode::Stay => CameraCommand::None,
        }
    }

    /// User toggled the follow button
    pub fn toggle_follow(&mut self, latest: Option<Coord>, bearing: Option<f64>) -> CameraCommand {
        match self.mode {
            MapMode::Stay => {
                self.mode = MapMode::Follow;
                match latest {
                    Some(center) => match bearing {
                        Some(bearing) => self.fly_to(center, bearing),
                        None => CameraCommand::CenterOn { center },
                    },
                    None => CameraCommand::None,
                }
            }
            MapMode::Follow | MapMode::Fit => {
                self.mode = MapMode::Stay;
                CameraCommand::None
            }
        }
    }

    /// User moved the map by hand
    pub fn user_panned(&mut self) {
        self.mode = MapMode::Stay;
    }

    /// Back to framing everything, e.g. after switching track
    pub fn reset(&mut self) {
        self.mode = MapMode::Fit;
        self.pitch = None;
    }

    fn fly_to(&mut self, center: Coord, bearing: f64) -> CameraCommand {
        let pitch = *self.pitch.get_or_insert(self.initial_pitch);
        CameraCommand::FlyTo {
            center,
            bearing,
            pitch,
        }
    }
}

impl Default for MapCamera {
    fn default() -> Self {
        Self::new(60.0, 60.0)
    }
}
