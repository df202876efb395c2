use serde_derive::{Deserialize, Serialize};

use crate::detection::{Detection, PlateReading};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub timestamp: f64, // in seconds
    pub vehicles: Vec<Detection>,
    pub plates: Vec<PlateReading>,
}

impl Frame {
    #[inline]
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_vehicles(mut self, vehicles: Vec<Detection>) -> Self {
        self.vehicles = vehicles;
        self
    }

    #[inline]
    pub fn with_plates(mut self, plates: Vec<PlateReading>) -> Self {
        self.plates = plates;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
