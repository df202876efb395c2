use log::{trace, warn};
use munkres::{solve_assignment, WeightMatrix};

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;

/// Larger problems are handed to the greedy solver.
pub const MAX_OPTIMAL_DIM: usize = 256;

const DUMMY_COST: f64 = 1.0;

// keeps equal-cost choices of a track on the lowest detection index
const INDEX_BIAS: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// `(track index, detection index, iou)`
    pub matches: Vec<(usize, usize, f32)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Pairwise IoU, rows are tracks and columns are detections.
pub fn iou_matrix(tracks: &[BBox<Ltrb>], detections: &[BBox<Ltrb>]) -> Vec<Vec<f32>> {
    tracks
        .iter()
        .map(|t| detections.iter().map(|d| t.iou(d)).collect())
        .collect()
}

/// One-to-one association of tracks and detections minimising `1 - IoU`.
/// Pairs under `iou_threshold` are reported as unmatched.
pub fn solve(tracks: &[BBox<Ltrb>], detections: &[BBox<Ltrb>], iou_threshold: f32) -> Assignment {
    let (rows, cols) = (tracks.len(), detections.len());

    if rows == 0 || cols == 0 {
        return Assignment {
            matches: Vec::new(),
            unmatched_tracks: (0..rows).collect(),
            unmatched_detections: (0..cols).collect(),
        };
    }

    let ious = iou_matrix(tracks, detections);

    let pairs = if rows.max(cols) > MAX_OPTIMAL_DIM {
        greedy(&ious, iou_threshold)
    } else {
        match optimal(&ious, rows, cols) {
            Ok(pairs) => pairs,
            Err(err) => {
                warn!("{}, falling back to greedy assignment", err);
                greedy(&ious, iou_threshold)
            }
        }
    };

    let mut track_used = vec![false; rows];
    let mut det_used = vec![false; cols];
    let mut matches = Vec::with_capacity(pairs.len());

    for (r, c) in pairs {
        let iou = ious[r][c];

        if iou >= iou_threshold && iou > 0.0 {
            track_used[r] = true;
            det_used[c] = true;
            matches.push((r, c, iou));
        }
    }

    matches.sort_by_key(|&(r, c, _)| (r, c));

    let assignment = Assignment {
        matches,
        unmatched_tracks: (0..rows).filter(|&r| !track_used[r]).collect(),
        unmatched_detections: (0..cols).filter(|&c| !det_used[c]).collect(),
    };

    trace!(
        "assignment {}x{}: {} matched, {} tracks missed, {} new detections",
        rows,
        cols,
        assignment.matches.len(),
        assignment.unmatched_tracks.len(),
        assignment.unmatched_detections.len()
    );

    assignment
}

fn optimal(ious: &[Vec<f32>], rows: usize, cols: usize) -> Result<Vec<(usize, usize)>, Error> {
    let n = rows.max(cols);

    let mut mat = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols && ious[r][c].is_finite() {
            1.0 - ious[r][c] as f64 + c as f64 * INDEX_BIAS
        } else {
            DUMMY_COST
        }
    });

    let positions =
        solve_assignment(&mut mat).map_err(|e| Error::Assignment(format!("{:?}", e)))?;

    Ok(positions
        .into_iter()
        .filter(|p| p.row < rows && p.column < cols)
        .map(|p| (p.row, p.column))
        .collect())
}

/// Highest IoU first, then lowest track index, then lowest detection index.
fn greedy(ious: &[Vec<f32>], iou_threshold: f32) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(usize, usize, f32)> = ious
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &iou)| iou >= iou_threshold && iou > 0.0)
                .map(move |(c, &iou)| (r, c, iou))
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let cols = ious.first().map(|r| r.len()).unwrap_or(0);
    let mut track_used = vec![false; ious.len()];
    let mut det_used = vec![false; cols];
    let mut pairs = Vec::new();

    for (r, c, _) in candidates {
        if !track_used[r] && !det_used[c] {
            track_used[r] = true;
            det_used[c] = true;
            pairs.push((r, c));
        }
    }

    pairs
}
