use nalgebra as na;

use crate::bbox::{BBox, Ltrb};
use crate::config::MotionConfig;
use crate::error::Error;

type StateVector = na::SVector<f32, 8>;
type StateMatrix = na::SMatrix<f32, 8, 8>;
type MeasVector = na::SVector<f32, 4>;
type MeasMatrix = na::SMatrix<f32, 4, 4>;
type ObsMatrix = na::SMatrix<f32, 4, 8>;

/// Constant-velocity box predictor.
///
/// State is `[cx, cy, w, h, vx, vy, vw, vh]`, velocities are in pixels per
/// frame. Each `predict` advances one frame; `correct` blends in an observed
/// box weighted by the current covariance.
#[derive(Debug, Clone)]
pub struct Predictor {
    x: StateVector,
    p: StateMatrix,
    f: StateMatrix,
    h: ObsMatrix,
    r: MeasMatrix,
    q: StateMatrix,
}

impl Predictor {
    pub fn new(bbox: &BBox<Ltrb>, config: &MotionConfig) -> Self {
        let mut f = StateMatrix::identity();
        for i in 0..4 {
            f[(i, i + 4)] = 1.0;
        }

        let mut h = ObsMatrix::zeros();
        for i in 0..4 {
            h[(i, i)] = 1.0;
        }

        let x = Self::seed(bbox);

        Self {
            x,
            p: StateMatrix::from_diagonal(&StateVector::from_column_slice(
                &config.initial_variance,
            )),
            f,
            h,
            r: MeasMatrix::from_diagonal(&MeasVector::from_column_slice(
                &config.measurement_noise,
            )),
            q: StateMatrix::from_diagonal(&StateVector::from_column_slice(&config.process_noise)),
        }
    }

    fn seed(bbox: &BBox<Ltrb>) -> StateVector {
        let z = Self::measurement(bbox);
        StateVector::from_column_slice(&[z[0], z[1], z[2], z[3], 0.0, 0.0, 0.0, 0.0])
    }

    fn measurement(bbox: &BBox<Ltrb>) -> MeasVector {
        let b = bbox.as_xywh();
        MeasVector::new(b.cx(), b.cy(), b.width(), b.height())
    }

    /// Restarts the estimate at `bbox` with zero velocity and the initial
    /// covariance.
    pub fn reset(&mut self, bbox: &BBox<Ltrb>, config: &MotionConfig) {
        *self = Self::new(bbox, config);
    }

    /// Extrapolates one frame ahead and returns the predicted box.
    pub fn predict(&mut self) -> BBox<Ltrb> {
        // a shrinking box must not collapse through zero
        for i in 2..4 {
            if self.x[i] + self.x[i + 4] <= 0.0 {
                self.x[i + 4] = 0.0;
            }
        }

        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;

        self.bbox()
    }

    /// Blends the observed box into the estimate.
    pub fn correct(&mut self, bbox: &BBox<Ltrb>) -> Result<(), Error> {
        let z = Self::measurement(bbox);

        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let s_inv = s.try_inverse().ok_or(Error::SingularInnovation)?;
        let k = self.p * self.h.transpose() * s_inv;

        self.x += k * y;
        self.p = (StateMatrix::identity() - k * self.h) * self.p;

        Ok(())
    }

    pub fn bbox(&self) -> BBox<Ltrb> {
        BBox::xywh(
            self.x[0],
            self.x[1],
            self.x[2].max(0.0),
            self.x[3].max(0.0),
        )
        .as_ltrb()
    }

    /// Center velocity in pixels per frame.
    #[inline]
    pub fn velocity(&self) -> (f32, f32) {
        (self.x[4], self.x[5])
    }

    /// Positional uncertainty, grows while no observation arrives.
    #[cfg(test)]
    pub fn position_variance(&self) -> f32 {
        self.p[(0, 0)] + self.p[(1, 1)]
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn predictor(bbox: &BBox<Ltrb>) -> Predictor {
        Predictor::new(bbox, &MotionConfig::default())
    }

    #[test]
    fn stationary_box_stays_put() {
        let bbox = BBox::ltrb(10.0, 10.0, 50.0, 50.0);
        let mut p = predictor(&bbox);

        let pred = p.predict();
        for (a, b) in pred.as_slice().iter().zip(bbox.as_slice()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn learns_constant_velocity() {
        let mut p = predictor(&BBox::ltrb(0.0, 0.0, 40.0, 40.0));

        for i in 1..=20 {
            p.predict();
            let d = 3.0 * i as f32;
            p.correct(&BBox::ltrb(d, 0.0, 40.0 + d, 40.0)).unwrap();
        }

        let (vx, vy) = p.velocity();
        assert_abs_diff_eq!(vx, 3.0, epsilon = 0.3);
        assert_abs_diff_eq!(vy, 0.0, epsilon = 0.3);

        let pred = p.predict();
        assert_abs_diff_eq!(pred.center().0, 20.0 + 63.0, epsilon = 2.0);
    }

    #[test]
    fn correction_lands_between_prediction_and_observation() {
        let mut p = predictor(&BBox::ltrb(0.0, 0.0, 10.0, 10.0));
        let pred = p.predict();
        p.correct(&BBox::ltrb(4.0, 0.0, 14.0, 10.0)).unwrap();

        let cx = p.bbox().center().0;
        assert!(cx > pred.center().0 && cx <= 9.0);
    }

    #[test]
    fn uncertainty_grows_without_observations() {
        let mut p = predictor(&BBox::ltrb(0.0, 0.0, 10.0, 10.0));

        let mut last = p.position_variance();
        for _ in 0..5 {
            p.predict();
            let var = p.position_variance();
            assert!(var > last);
            last = var;
        }
    }

    #[test]
    fn shrinking_box_never_goes_negative() {
        let mut p = predictor(&BBox::ltrb(0.0, 0.0, 10.0, 10.0));

        p.predict();
        p.correct(&BBox::ltrb(0.0, 0.0, 2.0, 2.0)).unwrap();

        for _ in 0..50 {
            let b = p.predict();
            assert!(b.width() >= 0.0 && b.height() >= 0.0);
        }
    }
}
