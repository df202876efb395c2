use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::config::PlateConfig;
use crate::detection::PlateReading;
use crate::error::Error;
use crate::math;
use crate::plate_text;
use crate::track::TrackId;

/// Latest admissible plate reading attached to a track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlateRecord {
    pub plate_text: String,
    pub plate_score: f32,
    /// seconds, as supplied with the frame
    pub last_seen: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateEventKind {
    /// first record for the track
    New,
    /// better score or different text replaced the record
    Changed,
    /// same reading seen again, only `last_seen` moved
    Refreshed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlateEvent {
    pub track_id: TrackId,
    pub kind: PlateEventKind,
    pub record: PlateRecord,
}

impl PlateEvent {
    /// Whether consumers should persist or display this reading.
    #[inline]
    pub fn is_notable(&self) -> bool {
        self.kind != PlateEventKind::Refreshed
    }
}

/// Attaches OCR'd plates to tracked vehicles and keeps one record per track.
#[derive(Debug, Clone)]
pub struct PlateAssociator {
    config: PlateConfig,
    records: BTreeMap<TrackId, PlateRecord>,
}

struct Candidate {
    track_id: TrackId,
    reading: usize,
    distance: f32,
    score: f32,
}

impl Candidate {
    // closest first, then the more confident reading, then lower ids
    fn order(&self, other: &Candidate) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(
                other
                    .score
                    .partial_cmp(&self.score)
                    .unwrap_or(Ordering::Equal),
            )
            .then(self.track_id.cmp(&other.track_id))
            .then(self.reading.cmp(&other.reading))
    }
}

impl PlateAssociator {
    pub fn new(config: PlateConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            records: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &PlateConfig {
        &self.config
    }

    #[inline]
    pub fn plate_records(&self) -> &BTreeMap<TrackId, PlateRecord> {
        &self.records
    }

    #[inline]
    pub fn record(&self, track_id: TrackId) -> Option<&PlateRecord> {
        self.records.get(&track_id)
    }

    /// Highest scoring active record, lowest track id on ties.
    pub fn best(&self) -> Option<(TrackId, &PlateRecord)> {
        self.records
            .iter()
            .max_by(|a, b| {
                a.1.plate_score
                    .partial_cmp(&b.1.plate_score)
                    .unwrap_or(Ordering::Equal)
                    .then(b.0.cmp(a.0))
            })
            .map(|(&id, rec)| (id, rec))
    }

    // plate boxes covering much of the vehicle are detector noise
    #[inline]
    fn fits(&self, plate_area: f32, vehicle_area: f32) -> bool {
        vehicle_area > 0.0 && math::ratio(plate_area, vehicle_area) <= self.config.max_area_ratio
    }

    fn admissible(&self, reading: &PlateReading) -> bool {
        let text = match reading.text() {
            Some(text) => text,
            None => return false,
        };

        reading.ocr_score.is_finite()
            && reading.ocr_score > self.config.min_ocr_score
            && reading.bbox().is_valid()
            && (!self.config.require_valid_format || plate_text::complies_format(text))
    }

    /// Associates this frame's readings with `tracks` and sweeps stale
    /// records. `now` is the frame timestamp in seconds.
    pub fn update(
        &mut self,
        now: f64,
        tracks: &[(TrackId, BBox<Ltrb>)],
        readings: &[PlateReading],
    ) -> Vec<PlateEvent> {
        if !now.is_finite() {
            warn!("plate association skipped: frame time {} is not finite", now);
            return Vec::new();
        }

        let mut consumed: Vec<bool> = readings.iter().map(|r| !self.admissible(r)).collect();
        let mut tracks: Vec<(TrackId, BBox<Ltrb>)> = tracks.to_vec();
        tracks.sort_by_key(|&(id, _)| id);

        let mut updated = vec![false; tracks.len()];
        let mut events = Vec::new();

        // tracks that already own a plate look for it fully inside their box
        for (ti, (id, vehicle)) in tracks.iter().enumerate() {
            if !self.records.contains_key(id) {
                continue;
            }

            let vehicle_area = vehicle.area();
            let found = readings
                .iter()
                .enumerate()
                .filter(|(ri, r)| {
                    !consumed[*ri]
                        && vehicle.contains(r.bbox())
                        && self.fits(r.bbox().area(), vehicle_area)
                })
                .map(|(ri, r)| Candidate {
                    track_id: *id,
                    reading: ri,
                    distance: vehicle.center_distance(r.bbox()),
                    score: r.ocr_score,
                })
                .min_by(Candidate::order);

            if let Some(c) = found {
                consumed[c.reading] = true;
                updated[ti] = true;
                events.push(self.write(now, *id, &readings[c.reading]));
            }
        }

        // the rest are paired by plate center containment, closest first
        let mut candidates = Vec::new();
        for (ti, (id, vehicle)) in tracks.iter().enumerate() {
            if updated[ti] {
                continue;
            }

            let vehicle_area = vehicle.area();
            if vehicle_area <= 0.0 {
                continue;
            }

            for (ri, reading) in readings.iter().enumerate() {
                if consumed[ri] {
                    continue;
                }

                let plate = reading.bbox();
                if !vehicle.contains_point(plate.center())
                    || !self.fits(plate.area(), vehicle_area)
                {
                    continue;
                }

                candidates.push(Candidate {
                    track_id: *id,
                    reading: ri,
                    distance: vehicle.center_distance(plate),
                    score: reading.ocr_score,
                });
            }
        }

        candidates.sort_by(Candidate::order);

        let mut taken: Vec<TrackId> = Vec::new();
        for c in candidates {
            if consumed[c.reading] || taken.contains(&c.track_id) {
                continue;
            }

            consumed[c.reading] = true;
            taken.push(c.track_id);
            events.push(self.write(now, c.track_id, &readings[c.reading]));
        }

        self.evict(now);

        events
    }

    fn write(&mut self, now: f64, track_id: TrackId, reading: &PlateReading) -> PlateEvent {
        let text = reading.text().unwrap_or_default();
        let score = reading.ocr_score;

        let kind = match self.records.get_mut(&track_id) {
            None => {
                self.records.insert(
                    track_id,
                    PlateRecord {
                        plate_text: text.to_string(),
                        plate_score: score,
                        last_seen: now,
                    },
                );
                PlateEventKind::New
            }
            Some(rec) if score > rec.plate_score || text != rec.plate_text => {
                rec.plate_text = text.to_string();
                rec.plate_score = score;
                rec.last_seen = now;
                PlateEventKind::Changed
            }
            Some(rec) => {
                rec.last_seen = now;
                PlateEventKind::Refreshed
            }
        };

        let record = self.records[&track_id].clone();
        if kind != PlateEventKind::Refreshed {
            debug!(
                "track {}: plate {} ({:.2}) {:?}",
                track_id, record.plate_text, record.plate_score, kind
            );
        }

        PlateEvent {
            track_id,
            kind,
            record,
        }
    }

    /// Drops records not seen for longer than the staleness window, whether
    /// or not their track is still alive.
    pub fn evict(&mut self, now: f64) {
        if !now.is_finite() {
            return;
        }

        let window = self.config.staleness_secs;

        self.records.retain(|id, rec| {
            let keep = now - rec.last_seen <= window;
            if !keep {
                debug!("track {}: plate {} expired", id, rec.plate_text);
            }
            keep
        });
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
