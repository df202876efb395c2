use std::collections::BTreeMap;

use log::{debug, warn};

use crate::bbox::{BBox, Ltrb};
use crate::circular_queue::CircularQueue;
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::predictor::Predictor;
use crate::track::{Direction, Track, TrackId, TrackState};

const HISTORY_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct TrackEntry {
    pub id: TrackId,
    pub state: TrackState,
    pub bbox: BBox<Ltrb>,
    pub predictor: Predictor,
    /// total matched detections, the seeding one included
    pub hits: u32,
    /// consecutive matched frames
    pub hit_streak: u32,
    pub time_since_update: u32,
    pub age: u32,
    pub score_sum: f32,
    pub class_votes: BTreeMap<i32, u32>,
    pub history: CircularQueue<BBox<Ltrb>>,
}

impl TrackEntry {
    fn new(id: TrackId, det: &Detection, config: &TrackerConfig) -> Self {
        let mut history = CircularQueue::with_capacity(HISTORY_LEN);
        history.push(det.bbox);

        let mut class_votes = BTreeMap::new();
        class_votes.insert(det.class, 1);

        Self {
            id,
            state: TrackState::Tentative,
            bbox: det.bbox,
            predictor: Predictor::new(&det.bbox, &config.motion),
            hits: 1,
            hit_streak: 1,
            time_since_update: 0,
            age: 0,
            score_sum: det.confidence,
            class_votes,
            history,
        }
    }

    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    fn promote(&mut self, min_hits: u32) {
        if self.state == TrackState::Tentative && self.hit_streak >= min_hits {
            self.state = TrackState::Confirmed;
            debug!("track {} confirmed after {} hits", self.id, self.hits);
        }
    }

    pub fn class(&self) -> i32 {
        // ties go to the lowest class id
        self.class_votes
            .iter()
            .fold(None, |best: Option<(i32, u32)>, (&class, &votes)| match best {
                Some((_, v)) if v >= votes => best,
                _ => Some((class, votes)),
            })
            .map(|(class, _)| class)
            .unwrap_or(-1)
    }

    pub fn iou_slip(&self) -> f32 {
        let mut boxes = self.history.iter();

        match (boxes.next(), boxes.next()) {
            (Some(last), Some(prev)) => last.iou(prev),
            _ => 0.0,
        }
    }

    pub fn snapshot(&self, config: &TrackerConfig) -> Track {
        let velocity = self.predictor.velocity();

        Track {
            track_id: self.id,
            bbox: self.bbox,
            class: self.class(),
            confidence: self.score_sum / self.hits.max(1) as f32,
            hits: self.hits,
            age: self.age,
            time_since_update: self.time_since_update,
            velocity,
            direction: Direction::from_velocity(velocity.1, config.motion.direction_epsilon),
            iou_slip: self.iou_slip(),
        }
    }
}

/// Live tracks keyed by id. Ids are handed out in increasing order and never
/// reused.
#[derive(Debug, Clone)]
pub struct TrackTable {
    config: TrackerConfig,
    tracks: BTreeMap<TrackId, TrackEntry>,
    next_id: TrackId,
}

impl TrackTable {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[cfg(test)]
    pub fn get(&self, id: TrackId) -> Option<&TrackEntry> {
        self.tracks.get(&id)
    }

    /// Current boxes of all live tracks in ascending id order.
    pub fn boxes(&self) -> Vec<(TrackId, BBox<Ltrb>)> {
        self.tracks.values().map(|t| (t.id, t.bbox)).collect()
    }

    /// Advances every predictor by one frame. Tracks whose estimate blew up
    /// are dropped on the spot.
    pub fn predict_all(&mut self) {
        self.tracks.retain(|id, t| {
            t.bbox = t.predictor.predict();
            t.age += 1;

            let ok = t.predictor.is_finite() && t.bbox.is_finite();
            if !ok {
                warn!("track {} dropped: prediction is not finite", id);
            }
            ok
        });
    }

    /// Starts a tentative track at the detection's box. Returns `None` when
    /// the table is full of confirmed tracks.
    pub fn create(&mut self, det: &Detection) -> Option<TrackId> {
        if self.tracks.len() >= self.config.max_tracks {
            let victim = self
                .tracks
                .values()
                .find(|t| !t.is_confirmed())
                .map(|t| t.id)?;

            self.tracks.remove(&victim);
            debug!("track {} evicted: table is at capacity", victim);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut entry = TrackEntry::new(id, det, &self.config);
        entry.promote(self.config.min_hits);
        self.tracks.insert(id, entry);

        debug!("track {} created at {:?}", id, det.bbox.as_slice());

        Some(id)
    }

    pub fn mark_matched(&mut self, id: TrackId, det: &Detection) {
        let config = &self.config;
        let track = match self.tracks.get_mut(&id) {
            Some(t) => t,
            None => return,
        };

        if let Err(err) = track.predictor.correct(&det.bbox) {
            warn!("track {}: {}, reseeding from observation", id, err);
            track.predictor.reset(&det.bbox, &config.motion);
        }

        track.bbox = det.bbox;
        track.hits += 1;
        track.hit_streak += 1;
        track.time_since_update = 0;
        track.score_sum += det.confidence;
        *track.class_votes.entry(det.class).or_insert(0) += 1;
        track.history.push(det.bbox);
        track.promote(config.min_hits);
    }

    /// Leaves the box at its predicted value.
    pub fn mark_missed(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.time_since_update += 1;
            track.hit_streak = 0;
        }
    }

    /// Removes confirmed tracks unmatched for more than `max_age` frames and
    /// tentative ones unmatched for more than `tentative_max_age`.
    pub fn prune(&mut self) -> Vec<TrackId> {
        let max_age = self.config.max_age;
        let tentative_max_age = self.config.tentative_max_age;
        let mut removed = Vec::new();

        self.tracks.retain(|&id, t| {
            let limit = if t.is_confirmed() {
                max_age
            } else {
                tentative_max_age
            };

            if t.time_since_update > limit {
                removed.push(id);
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            debug!("pruned tracks {:?}", removed);
        }

        removed
    }

    /// Confirmed tracks that existed before this frame, ascending by id.
    pub fn confirmed(&self) -> impl Iterator<Item = &TrackEntry> {
        let min_hits = self.config.min_hits;

        self.tracks
            .values()
            .filter(move |t| t.is_confirmed() && t.hits >= min_hits && t.age > 0)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
