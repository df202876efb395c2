use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::math;

pub trait BBoxFormat: std::fmt::Debug + Copy + PartialEq {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(bound = "")]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.right() - self.left()
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }

    /// Finite coordinates with strictly positive width and height, and an
    /// area that fits in `f32`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        let (w, h) = (self.width(), self.height());

        self.is_finite() && w > 0.0 && h > 0.0 && (w * h).is_finite()
    }

    /// Zero for degenerate or inverted boxes.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_valid() {
            self.width() * self.height()
        } else {
            0.0
        }
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (
            self.left() + self.width() / 2.0,
            self.top() + self.height() / 2.0,
        )
    }

    /// Intersection-over-union in `[0, 1]`; zero when either box is degenerate.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let a_area = self.area();
        let b_area = other.area();

        if a_area <= 0.0 || b_area <= 0.0 {
            return 0.0;
        }

        let i_w = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let i_h = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let i_area = i_w * i_h;
        let union = a_area + b_area - i_area;

        if union <= 0.0 {
            return 0.0;
        }

        let iou = i_area / union;
        if iou.is_finite() {
            iou.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// All four edges of `inner` lie within `self`.
    #[inline]
    pub fn contains(&self, inner: &BBox<Ltrb>) -> bool {
        inner.left() >= self.left()
            && inner.top() >= self.top()
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    #[inline]
    pub fn contains_point(&self, (x, y): (f32, f32)) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }

    #[inline]
    pub fn center_distance(&self, other: &BBox<Ltrb>) -> f32 {
        math::distance(self.center(), other.center())
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [
                v.0[0] + (v.0[2] - v.0[0]) / 2.0,
                v.0[1] + (v.0[3] - v.0[1]) / 2.0,
                v.0[2] - v.0[0],
                v.0[3] - v.0[1],
            ],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        Self(
            [
                v.0[0] - v.0[2] / 2.0,
                v.0[1] - v.0[3] / 2.0,
                v.0[0] + v.0[2] / 2.0,
                v.0[1] + v.0[3] / 2.0,
            ],
            Default::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BBox::ltrb(10.0, 10.0, 50.0, 50.0);
        assert_abs_diff_eq!(a.iou(&a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn iou_of_shifted_box() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);

        // 50 / (100 + 100 - 50)
        assert_abs_diff_eq!(a.iou(&b), 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.iou(&b), b.iou(&a), epsilon = 1e-6);
    }

    #[test]
    fn disjoint_and_degenerate_boxes_have_zero_iou() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let far = BBox::ltrb(20.0, 20.0, 30.0, 30.0);
        let flat = BBox::ltrb(0.0, 5.0, 10.0, 5.0);
        let inverted = BBox::ltrb(10.0, 10.0, 0.0, 0.0);

        assert_eq!(a.iou(&far), 0.0);
        assert_eq!(a.iou(&flat), 0.0);
        assert_eq!(flat.iou(&flat), 0.0);
        assert_eq!(a.iou(&inverted), 0.0);
        assert_eq!(inverted.area(), 0.0);
    }

    #[test]
    fn nan_box_is_invalid() {
        let b = BBox::ltrb(f32::NAN, 0.0, 10.0, 10.0);
        assert!(!b.is_valid());
        assert_eq!(b.area(), 0.0);
        assert_eq!(b.iou(&BBox::ltrb(0.0, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn overflowing_box_is_invalid() {
        let huge = BBox::ltrb(0.0, 0.0, 1e20, 1e20);
        let wide = BBox::ltrb(-f32::MAX, 0.0, f32::MAX, 10.0);
        let car = BBox::ltrb(10.0, 10.0, 50.0, 50.0);

        assert!(!huge.is_valid());
        assert!(!wide.is_valid());
        assert_eq!(huge.area(), 0.0);
        assert_eq!(huge.iou(&car), 0.0);
        assert_eq!(car.iou(&huge), 0.0);
    }

    #[test]
    fn containment() {
        let car = BBox::ltrb(0.0, 0.0, 100.0, 60.0);
        let plate = BBox::ltrb(20.0, 40.0, 60.0, 55.0);
        let sticking_out = BBox::ltrb(80.0, 40.0, 120.0, 55.0);

        assert!(car.contains(&plate));
        assert!(!car.contains(&sticking_out));
        assert!(car.contains_point(sticking_out.center()));
        assert!(!plate.contains(&car));
    }

    #[test]
    fn center_and_area() {
        let b = BBox::ltrb(10.0, 20.0, 30.0, 60.0);
        assert_eq!(b.center(), (20.0, 40.0));
        assert_eq!(b.area(), 800.0);
    }

    #[test]
    fn xywh_conversion() {
        let b = BBox::ltrb(10.0, 20.0, 30.0, 60.0);
        let c = b.as_xywh();

        assert_eq!(c.as_slice(), &[20.0, 40.0, 20.0, 40.0]);
        assert_eq!(c.as_ltrb(), b);
    }
}
