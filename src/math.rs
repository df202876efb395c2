use num_traits::Float;

/// Euclidean distance between two points.
#[inline]
pub fn distance<F: Float>(a: (F, F), b: (F, F)) -> F {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;

    (dx * dx + dy * dy).sqrt()
}

/// `num / den`, or zero when the denominator is not a positive finite number.
#[inline]
pub fn ratio<F: Float>(num: F, den: F) -> F {
    if den.is_finite() && den > F::zero() {
        num / den
    } else {
        F::zero()
    }
}
