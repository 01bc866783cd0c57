//! Pure geometry utilities over landmark positions.
//!
//! All functions operate in the normalized 2D image plane (the plane the
//! landmark provider reports in) and return `None` when the input is
//! degenerate rather than producing NaN, so callers can skip a measurement
//! instead of propagating garbage downstream.

use crate::types::{Axis, Landmark};

/// Minimum squared segment length considered non-degenerate.
const MIN_SEGMENT_LEN_SQ: f32 = 1e-10;

/// Interior angle at vertex `b` of the triangle `a-b-c`, in degrees.
///
/// This is the joint angle of a three-landmark chain (e.g. hip-knee-ankle
/// gives the knee flexion angle). Returns `None` when either limb collapses
/// to a point.
#[must_use]
pub fn joint_angle_degrees(a: &Landmark, b: &Landmark, c: &Landmark) -> Option<f32> {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    let len_ba_sq = bax * bax + bay * bay;
    let len_bc_sq = bcx * bcx + bcy * bcy;
    if len_ba_sq < MIN_SEGMENT_LEN_SQ || len_bc_sq < MIN_SEGMENT_LEN_SQ {
        return None;
    }

    let dot = bax * bcx + bay * bcy;
    let cos = (dot / (len_ba_sq.sqrt() * len_bc_sq.sqrt())).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Perpendicular distance from point `p` to the infinite line through
/// `l1` and `l2`, in normalized image units.
///
/// Returns `None` when `l1` and `l2` coincide.
#[must_use]
pub fn point_line_deviation(p: &Landmark, l1: &Landmark, l2: &Landmark) -> Option<f32> {
    let (dx, dy) = (l2.x - l1.x, l2.y - l1.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq < MIN_SEGMENT_LEN_SQ {
        return None;
    }

    // Cross product magnitude / segment length
    let cross = (p.x - l1.x) * dy - (p.y - l1.y) * dx;
    Some(cross.abs() / len_sq.sqrt())
}

/// Deviation of point `p` from the vertical line through `anchor`.
#[must_use]
pub fn vertical_deviation(p: &Landmark, anchor: &Landmark) -> f32 {
    (p.x - anchor.x).abs()
}

/// Deviation of point `p` from the horizontal line through `anchor`.
#[must_use]
pub fn horizontal_deviation(p: &Landmark, anchor: &Landmark) -> f32 {
    (p.y - anchor.y).abs()
}

/// Absolute left/right coordinate difference along `axis`.
///
/// Used by symmetry rules: a level pair of shoulders has a Y-axis symmetry
/// deviation near zero regardless of where the body sits in the image.
#[must_use]
pub fn symmetry_deviation(left: &Landmark, right: &Landmark, axis: Axis) -> f32 {
    (left.axis_value(axis) - right.axis_value(axis)).abs()
}

/// Displacement rate between two observations of the same point, in
/// normalized image units per second.
///
/// Returns `None` when the observations are not strictly ordered in time.
#[must_use]
pub fn rate_of_change(
    prev: (f32, f32),
    prev_ms: f64,
    current: (f32, f32),
    current_ms: f64,
) -> Option<f32> {
    let dt_s = (current_ms - prev_ms) / 1000.0;
    if dt_s <= 0.0 {
        return None;
    }

    let dx = current.0 - prev.0;
    let dy = current.1 - prev.1;
    let displacement = (dx * dx + dy * dy).sqrt();
    Some(displacement / dt_s as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, LandmarkType};

    fn lm(x: f32, y: f32) -> Landmark {
        Landmark::new(LandmarkType::Nose, x, y, Confidence::MAX)
    }

    #[test]
    fn right_angle_is_90_degrees() {
        let a = lm(0.0, 1.0);
        let b = lm(0.0, 0.0);
        let c = lm(1.0, 0.0);
        let angle = joint_angle_degrees(&a, &b, &c).unwrap();
        assert!((angle - 90.0).abs() < 0.01);
    }

    #[test]
    fn straight_chain_is_180_degrees() {
        let a = lm(0.0, 0.0);
        let b = lm(0.5, 0.0);
        let c = lm(1.0, 0.0);
        let angle = joint_angle_degrees(&a, &b, &c).unwrap();
        assert!((angle - 180.0).abs() < 0.01);
    }

    #[test]
    fn folded_chain_is_0_degrees() {
        let a = lm(1.0, 0.0);
        let b = lm(0.0, 0.0);
        let c = lm(1.0, 0.0);
        let angle = joint_angle_degrees(&a, &b, &c).unwrap();
        assert!(angle.abs() < 0.01);
    }

    #[test]
    fn degenerate_limb_returns_none() {
        let a = lm(0.0, 0.0);
        let b = lm(0.0, 0.0);
        let c = lm(1.0, 0.0);
        assert!(joint_angle_degrees(&a, &b, &c).is_none());
    }

    #[test]
    fn point_line_deviation_perpendicular() {
        let l1 = lm(0.0, 0.0);
        let l2 = lm(1.0, 0.0);
        let p = lm(0.5, 0.25);
        let dev = point_line_deviation(&p, &l1, &l2).unwrap();
        assert!((dev - 0.25).abs() < 0.001);
    }

    #[test]
    fn point_on_line_has_zero_deviation() {
        let l1 = lm(0.0, 0.0);
        let l2 = lm(1.0, 1.0);
        let p = lm(0.5, 0.5);
        let dev = point_line_deviation(&p, &l1, &l2).unwrap();
        assert!(dev.abs() < 0.001);
    }

    #[test]
    fn coincident_line_returns_none() {
        let l1 = lm(0.3, 0.3);
        let l2 = lm(0.3, 0.3);
        let p = lm(0.5, 0.5);
        assert!(point_line_deviation(&p, &l1, &l2).is_none());
    }

    #[test]
    fn vertical_and_horizontal_deviation() {
        let anchor = lm(0.5, 0.5);
        let p = lm(0.6, 0.3);
        assert!((vertical_deviation(&p, &anchor) - 0.1).abs() < 0.001);
        assert!((horizontal_deviation(&p, &anchor) - 0.2).abs() < 0.001);
    }

    #[test]
    fn symmetry_deviation_level_pair() {
        let left = lm(0.4, 0.5);
        let right = lm(0.6, 0.5);
        assert!(symmetry_deviation(&left, &right, Axis::Y).abs() < 0.001);
        assert!((symmetry_deviation(&left, &right, Axis::X) - 0.2).abs() < 0.001);
    }

    #[test]
    fn rate_of_change_basic() {
        // 0.3 units over 100 ms = 3.0 units/s
        let rate = rate_of_change((0.0, 0.0), 0.0, (0.0, 0.3), 100.0).unwrap();
        assert!((rate - 3.0).abs() < 0.001);
    }

    #[test]
    fn rate_of_change_requires_time_ordering() {
        assert!(rate_of_change((0.0, 0.0), 100.0, (0.1, 0.1), 100.0).is_none());
        assert!(rate_of_change((0.0, 0.0), 200.0, (0.1, 0.1), 100.0).is_none());
    }
}
