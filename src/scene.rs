use std::collections::BTreeMap;

use log::warn;

use crate::bbox::{BBox, Ltrb};
use crate::config::SceneConfig;
use crate::error::Error;
use crate::frame::Frame;
use crate::plate::{PlateAssociator, PlateEvent, PlateRecord};
use crate::track::{Track, TrackId};
use crate::tracker::Tracker;

/// What one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub timestamp: f64,
    /// confirmed tracks, ascending by id
    pub tracks: Vec<(TrackId, BBox<Ltrb>)>,
    pub plate_events: Vec<PlateEvent>,
}

impl FrameReport {
    /// Plate events worth persisting or displaying.
    pub fn notable(&self) -> impl Iterator<Item = &PlateEvent> {
        self.plate_events.iter().filter(|e| e.is_notable())
    }
}

/// Tracking and plate state of a single video source.
#[derive(Debug, Clone)]
pub struct Scene {
    tracker: Tracker,
    plates: PlateAssociator,
    last_timestamp: Option<f64>,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Result<Self, Error> {
        Ok(Self {
            tracker: Tracker::new(config.tracker)?,
            plates: PlateAssociator::new(config.plates)?,
            last_timestamp: None,
        })
    }

    /// Tracks the frame's vehicles, then attaches its plates to the
    /// confirmed tracks.
    pub fn process(&mut self, frame: &Frame) -> FrameReport {
        if let Some(last) = self.last_timestamp {
            if frame.timestamp < last {
                warn!(
                    "frame timestamp went back from {} to {}",
                    last,
                    frame.timestamp
                );
            }
        }

        let tracks = self.tracker.update(&frame.vehicles);
        let plate_events = self.plates.update(frame.timestamp, &tracks, &frame.plates);
        if frame.timestamp.is_finite() {
            self.last_timestamp = Some(frame.timestamp);
        }

        FrameReport {
            timestamp: frame.timestamp,
            tracks,
            plate_events,
        }
    }

    #[inline]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    #[inline]
    pub fn tracks(&self) -> Vec<Track> {
        self.tracker.tracks()
    }

    #[inline]
    pub fn plate_records(&self) -> &BTreeMap<TrackId, PlateRecord> {
        self.plates.plate_records()
    }

    #[inline]
    pub fn best_plate(&self) -> Option<(TrackId, &PlateRecord)> {
        self.plates.best()
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.plates.clear();
        self.last_timestamp = None;
    }
}
