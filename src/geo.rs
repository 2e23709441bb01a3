//! Geodesy helpers for map icons and camera framing.

use crate::models::{Coord, SourceType};

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Initial great-circle bearing from `from` to `to` in compass degrees (0-360).
pub fn initial_bearing(from: Coord, to: Coord) -> f64 {
    let lat1 = from.lat * DEG_TO_RAD;
    let lat2 = to.lat * DEG_TO_RAD;
    let delta_lng = (to.lng - from.lng) * DEG_TO_RAD;

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x) * RAD_TO_DEG + 360.0) % 360.0
}

/// Bearing in the map's icon rotation convention.
///
/// Icons rotate counter-clockwise, so the compass bearing is flipped. Vehicle
/// artwork points east instead of north and is rotated a further 90 degrees.
pub fn icon_bearing(from: Coord, to: Coord, source: SourceType) -> f64 {
    let flipped = 360.0 - initial_bearing(from, to);
    match source {
        SourceType::Vehicle => (flipped + 90.0) % 360.0,
        _ => flipped,
    }
}

/// Axis-aligned bounding box of a set of coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: Coord,
    pub north_east: Coord,
}

impl Bounds {
    pub fn of<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        coords.into_iter().fold(None, |acc, c| {
            Some(match acc {
                None => Bounds {
                    south_west: *c,
                    north_east: *c,
                },
                Some(b) => b.extend(*c),
            })
        })
    }

    pub fn extend(self, c: Coord) -> Self {
        Bounds {
            south_west: Coord::new(self.south_west.lat.min(c.lat), self.south_west.lng.min(c.lng)),
            north_east: Coord::new(self.north_east.lat.max(c.lat), self.north_east.lng.max(c.lng)),
        }
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.lat >= self.south_west.lat
            && c.lat <= self.north_east.lat
            && c.lng >= self.south_west.lng
            && c.lng <= self.north_east.lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Coord::new(0.0, 0.0);
        assert!(close(initial_bearing(origin, Coord::new(1.0, 0.0)), 0.0));
        assert!(close(initial_bearing(origin, Coord::new(0.0, 1.0)), 90.0));
        assert!(close(initial_bearing(origin, Coord::new(-1.0, 0.0)), 180.0));
        assert!(close(initial_bearing(origin, Coord::new(0.0, -1.0)), 270.0));
    }

    #[test]
    fn icon_bearing_is_flipped() {
        let from = Coord::new(0.0, 0.0);
        let to = Coord::new(0.0, 1.0);
        assert!(close(icon_bearing(from, to, SourceType::Boat), 270.0));
    }

    #[test]
    fn vehicle_bearing_is_rotated() {
        let pairs = [
            (Coord::new(60.0, 24.0), Coord::new(60.1, 24.2)),
            (Coord::new(60.0, 24.0), Coord::new(59.9, 23.9)),
            (Coord::new(-33.8, 151.2), Coord::new(-33.7, 151.1)),
            (Coord::new(0.0, 0.0), Coord::new(1.0, 0.0)),
        ];
        for (from, to) in pairs {
            let boat = icon_bearing(from, to, SourceType::Boat);
            let vehicle = icon_bearing(from, to, SourceType::Vehicle);
            assert!(close(vehicle, (boat + 90.0) % 360.0));
        }
    }

    #[test]
    fn bearing_invariant_under_eastward_translation() {
        let from = Coord::new(60.15, 24.90);
        let to = Coord::new(60.17, 24.95);
        let base = initial_bearing(from, to);
        for delta in [0.5, 10.0, 45.0, 120.0] {
            let shifted = initial_bearing(
                Coord::new(from.lat, from.lng + delta),
                Coord::new(to.lat, to.lng + delta),
            );
            assert!(close(base, shifted));
        }
    }

    #[test]
    fn bounds_of_points() {
        let coords = [
            Coord::new(60.0, 25.0),
            Coord::new(60.2, 24.8),
            Coord::new(59.9, 25.1),
        ];
        let bounds = Bounds::of(&coords).unwrap();
        assert_eq!(bounds.south_west, Coord::new(59.9, 24.8));
        assert_eq!(bounds.north_east, Coord::new(60.2, 25.1));
        assert!(bounds.contains(Coord::new(60.0, 25.0)));
        assert!(Bounds::of(&[]).is_none());
    }
}
