use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

pub type TrackId = u32;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tentative,
    Confirmed,
}

/// Vertical heading of a track in image space.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// moving down the frame
    Approaching,
    /// moving up the frame
    Receding,
    Stationary,
}

impl Direction {
    pub fn from_velocity(vy: f32, epsilon: f32) -> Self {
        if vy > epsilon {
            Direction::Approaching
        } else if vy < -epsilon {
            Direction::Receding
        } else {
            Direction::Stationary
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Car,
    Motorcycle,
    Bus,
    Truck,
    Other(i32),
}

impl VehicleKind {
    /// Maps COCO class ids.
    pub fn from_class(class: i32) -> Self {
        match class {
            2 => VehicleKind::Car,
            3 => VehicleKind::Motorcycle,
            5 => VehicleKind::Bus,
            7 => VehicleKind::Truck,
            other => VehicleKind::Other(other),
        }
    }
}

/// Read-only view of a confirmed track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: TrackId,
    pub bbox: BBox<Ltrb>,
    /// most voted detector class
    pub class: i32,
    /// mean score of matched detections
    pub confidence: f32,
    pub hits: u32,
    pub age: u32,
    pub time_since_update: u32,

    // in px per frame
    pub velocity: (f32, f32),
    pub direction: Direction,

    // IoU between the two latest observed boxes
    pub iou_slip: f32,
}

impl Track {
    #[inline]
    pub fn kind(&self) -> VehicleKind {
        VehicleKind::from_class(self.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_vertical_speed() {
        assert_eq!(Direction::from_velocity(2.0, 0.5), Direction::Approaching);
        assert_eq!(Direction::from_velocity(-2.0, 0.5), Direction::Receding);
        assert_eq!(Direction::from_velocity(0.3, 0.5), Direction::Stationary);
    }

    #[test]
    fn vehicle_kind_from_coco() {
        assert_eq!(VehicleKind::from_class(2), VehicleKind::Car);
        assert_eq!(VehicleKind::from_class(7), VehicleKind::Truck);
        assert_eq!(VehicleKind::from_class(72), VehicleKind::Other(72));
    }
}
