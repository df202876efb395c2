use log::{debug, trace};

use crate::assignment;
use crate::bbox::{BBox, Ltrb};
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::Error;
use crate::track::{Track, TrackId};
use crate::track_table::TrackTable;

/// Online tracking-by-detection over a single video source.
///
/// `update` must be called once per frame, in frame order. Everything it
/// does happens inside that call, so a reader holding `&Tracker` never sees a
/// half-processed frame.
#[derive(Debug, Clone)]
pub struct Tracker {
    table: TrackTable,
    frame_count: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            table: TrackTable::new(config),
            frame_count: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        self.table.config()
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Live tracks, tentative ones included.
    #[inline]
    pub fn num_tracks(&self) -> usize {
        self.table.len()
    }

    fn accepts(&self, det: &Detection) -> bool {
        let config = self.config();

        if !det.is_valid() {
            debug!("skipping malformed detection {:?}", det);
            return false;
        }

        config.accepts_class(det.class) && det.confidence >= config.min_detection_score
    }

    /// Runs one frame: predict, associate, update, prune, create. Returns the
    /// confirmed tracks as `(id, box)` in ascending id order.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<(TrackId, BBox<Ltrb>)> {
        self.frame_count += 1;

        let dets: Vec<&Detection> = detections.iter().filter(|d| self.accepts(d)).collect();

        self.table.predict_all();

        let (ids, track_boxes): (Vec<TrackId>, Vec<BBox<Ltrb>>) =
            self.table.boxes().into_iter().unzip();
        let det_boxes: Vec<BBox<Ltrb>> = dets.iter().map(|d| d.bbox).collect();

        let result = assignment::solve(&track_boxes, &det_boxes, self.config().iou_threshold);

        for &(r, c, _) in &result.matches {
            self.table.mark_matched(ids[r], dets[c]);
        }

        for &r in &result.unmatched_tracks {
            self.table.mark_missed(ids[r]);
        }

        self.table.prune();

        for &c in &result.unmatched_detections {
            if self.table.create(dets[c]).is_none() {
                debug!("track table full, detection {} dropped", c);
            }
        }

        let output: Vec<_> = self.table.confirmed().map(|t| (t.id, t.bbox)).collect();

        trace!(
            "frame {}: {} detections, {} live tracks, {} reported",
            self.frame_count,
            dets.len(),
            self.table.len(),
            output.len()
        );

        output
    }

    /// Snapshots of the tracks `update` last reported.
    pub fn tracks(&self) -> Vec<Track> {
        self.table
            .confirmed()
            .map(|t| t.snapshot(self.config()))
            .collect()
    }

    pub fn track(&self, id: TrackId) -> Option<Track> {
        self.table
            .confirmed()
            .find(|t| t.id == id)
            .map(|t| t.snapshot(self.config()))
    }

    /// Drops every track. Ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.table.clear();
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Direction;

    fn tracker() -> Tracker {
        Tracker::new(TrackerConfig::default()).unwrap()
    }

    fn car(x: f32, y: f32) -> Detection {
        Detection::ltrb(x, y, x + 40.0, y + 40.0, 0.9, 2)
    }

    #[test]
    fn empty_frames_are_fine() {
        let mut t = tracker();
        assert!(t.update(&[]).is_empty());
        assert!(t.update(&[]).is_empty());
        assert_eq!(t.frame_count(), 2);
    }

    #[test]
    fn malformed_and_foreign_detections_are_ignored() {
        let mut t = tracker();

        t.update(&[
            Detection::ltrb(f32::NAN, 0.0, 10.0, 10.0, 0.9, 2),
            Detection::ltrb(50.0, 50.0, 10.0, 10.0, 0.9, 2),
            Detection::ltrb(0.0, 0.0, 0.0, 0.0, 0.9, 2),
            // person
            Detection::ltrb(0.0, 0.0, 10.0, 10.0, 0.9, 0),
        ]);

        assert_eq!(t.num_tracks(), 0);
    }

    #[test]
    fn overflowing_box_does_not_block_other_vehicles() {
        let mut t = tracker();

        let mut outs = Vec::new();
        for _ in 0..3 {
            outs.push(t.update(&[
                Detection::ltrb(0.0, 0.0, 1e20, 1e20, 0.9, 2),
                car(10.0, 10.0),
            ]));
        }

        assert!(outs[0].is_empty());
        assert!(outs[1].is_empty());
        assert_eq!(outs[2].len(), 1);
        assert_eq!(outs[2][0].0, 1);
        assert_eq!(t.num_tracks(), 1);
    }

    #[test]
    fn low_score_detections_are_ignored() {
        let mut t = Tracker::new(TrackerConfig {
            min_detection_score: 0.5,
            ..Default::default()
        })
        .unwrap();

        t.update(&[Detection::ltrb(0.0, 0.0, 40.0, 40.0, 0.3, 2)]);
        assert_eq!(t.num_tracks(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Tracker::new(TrackerConfig {
            max_tracks: 0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn reports_velocity_and_direction() {
        let mut t = tracker();

        let mut out = Vec::new();
        for i in 0..10 {
            out = t.update(&[car(100.0, 100.0 + 4.0 * i as f32)]);
        }

        assert_eq!(out.len(), 1);
        let track = t.track(out[0].0).unwrap();
        assert_eq!(track.direction, Direction::Approaching);
        assert!(track.velocity.1 > 2.0);
        assert_eq!(track.hits, 10);
    }

    #[test]
    fn two_vehicles_keep_their_ids() {
        let mut t = tracker();

        let mut out = Vec::new();
        for i in 0..5 {
            let d = 3.0 * i as f32;
            out = t.update(&[car(200.0 - d, 50.0), car(10.0 + d, 50.0)]);
        }

        // ids follow creation order, which is detection order in frame 1
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, 1);
        assert_eq!(out[1].0, 2);
        assert!(out[0].1.left() > out[1].1.left());
    }
}
