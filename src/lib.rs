pub mod assignment;
pub mod bbox;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod math;
pub mod plate;
pub mod plate_text;
pub mod scene;
pub mod track;
pub mod tracker;

mod circular_queue;
mod predictor;
mod track_table;

pub use config::{MotionConfig, PlateConfig, SceneConfig, TrackerConfig};
pub use detection::{Detection, PlateReading};
pub use frame::Frame;
pub use plate::{PlateAssociator, PlateEvent, PlateEventKind, PlateRecord};
pub use scene::{FrameReport, Scene};
pub use track::{Direction, Track, TrackId, VehicleKind};
pub use tracker::Tracker;

use error::Error;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Per-source tracking front end. Each source name owns its own state.
pub trait Tracking {
    fn update(&mut self, frame: &Frame, src: &str) -> Result<FrameReport, Error>;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
    fn plate_records(&self, src: &str) -> BTreeMap<TrackId, PlateRecord>;
}

pub struct MultiSourceTracker {
    config: SceneConfig,
    scenes: HashMap<String, Scene>,
}

impl MultiSourceTracker {
    pub fn new(config: SceneConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            scenes: HashMap::new(),
        })
    }

    #[inline]
    pub fn scene(&self, src: &str) -> Option<&Scene> {
        self.scenes.get(src)
    }

    /// Forgets a source and everything tracked on it.
    pub fn remove(&mut self, src: &str) -> Option<Scene> {
        self.scenes.remove(src)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }
}

impl crate::Tracking for MultiSourceTracker {
    fn update(&mut self, frame: &Frame, src: &str) -> Result<FrameReport, Error> {
        let scene = if let Some(scene) = self.scenes.get_mut(src) {
            scene
        } else {
            let scene = Scene::new(self.config.clone())?;

            self.scenes.entry(src.to_string()).or_insert(scene)
        };

        Ok(scene.process(frame))
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(scene) = self.scenes.get(src) {
            return scene.tracks().into_boxed_slice().into();
        }

        Rc::new([])
    }

    fn plate_records(&self, src: &str) -> BTreeMap<TrackId, PlateRecord> {
        self.scenes
            .get(src)
            .map(|s| s.plate_records().clone())
            .unwrap_or_default()
    }
}
