//! Navigation geometry
//!
//! Pure trigonometry used for live path control. Angles are in radians
//! unless a name says otherwise. Theta is measured counter-clockwise from
//! the +x axis in [0, 2pi). Headings are marine style: degrees, 0 pointing
//! along +y, measured clockwise.
//!
//! None of these functions fail: out-of-range angles are normalised into
//! [0, 2pi) before use, and degenerate lines fall back to point values.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::maths::{clamp, rem_euclid};
use comms_if::eqpt::skate::RcCommand;

// Re-exports
pub use comms_if::eqpt::skate::RC_CHANNEL_LIMIT;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const TAU: f64 = std::f64::consts::TAU;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Rotational direction around a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotDir {
    /// Clockwise
    Cw,
    /// Counter-clockwise
    Ccw,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Perpendicular distance from point `p` to the infinite line through `a`
/// and `b`.
///
/// The sign of the cross product is discarded, the result is always a
/// non-negative magnitude. A degenerate line (`a == b`) gives the distance
/// from `p` to `a`.
pub fn distance_point_from_line(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> f64 {
    let len = (b - a).norm();
    if len == 0.0 {
        return (p - a).norm();
    }

    let cross = (b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y);
    cross.abs() / len
}

/// True iff `p` projects onto the direction of segment `ab` beyond `b`.
///
/// The projection scalar is `(b - a) . (p - a) / |b - a|^2`, and "past" means
/// strictly greater than 1. A degenerate segment is never passed.
pub fn is_point_past_line(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> bool {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return false;
    }

    ab.dot(&(p - a)) / len_sq > 1.0
}

/// Dead reckoning: the position reached from `origin` travelling `distance`
/// along compass heading `heading_deg`.
pub fn reckon_line(origin: &Vector2<f64>, heading_deg: f64, distance: f64) -> Vector2<f64> {
    let theta = theta_from_heading(heading_deg);
    origin + Vector2::new(distance * theta.cos(), distance * theta.sin())
}

/// Angular sweep in [0, 2pi) from `theta_1` to `theta_2` going in `dir`.
///
/// Both angles are normalised into [0, 2pi) first, so callers may pass the
/// raw output of earlier reckoning. Equal angles sweep nothing in either
/// direction.
pub fn length_of_arc_theta(theta_1: f64, theta_2: f64, dir: RotDir) -> f64 {
    let t1 = rem_euclid(theta_1, TAU);
    let t2 = rem_euclid(theta_2, TAU);

    match dir {
        RotDir::Cw => rem_euclid(t1 - t2, TAU),
        RotDir::Ccw => rem_euclid(t2 - t1, TAU),
    }
}

/// Arc length along a circle of radius `radius` from `theta_1` to `theta_2`
/// going in `dir`.
pub fn length_of_arc(theta_1: f64, theta_2: f64, dir: RotDir, radius: f64) -> f64 {
    length_of_arc_theta(theta_1, theta_2, dir) * radius
}

/// Convert a compass heading (degrees, 0 north, clockwise) into a theta.
pub fn theta_from_heading(heading_deg: f64) -> f64 {
    rem_euclid(90.0 - heading_deg, 360.0).to_radians()
}

/// Convert a theta into a compass heading (degrees, 0 north, clockwise).
pub fn heading_from_theta(theta: f64) -> f64 {
    rem_euclid(90.0 - theta.to_degrees(), 360.0)
}

/// Compass heading of the line from `a` to `b`.
///
/// A degenerate line points north.
pub fn heading_of_line(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let d = b - a;
    if d.norm() == 0.0 {
        return 0.0;
    }

    heading_from_theta(d.y.atan2(d.x))
}

/// Theta and radius of `pt` relative to `center`.
pub fn theta_from_point(pt: &Vector2<f64>, center: &Vector2<f64>) -> (f64, f64) {
    let d = pt - center;
    (rem_euclid(d.y.atan2(d.x), TAU), d.norm())
}

/// Position on the circle around `center` at `theta`, radius `radius`.
pub fn point_from_theta(center: &Vector2<f64>, theta: f64, radius: f64) -> Vector2<f64> {
    center + Vector2::new(radius * theta.cos(), radius * theta.sin())
}

/// Fold a heading difference into [-180, +180] degrees.
pub fn fold_heading_err(err_deg: f64) -> f64 {
    rem_euclid(err_deg + 180.0, 360.0) - 180.0
}

/// Build an RC command from a target vector relative to the vehicle and a
/// heading error.
///
/// The channels mirror the relative target: roll and pitch carry the lateral
/// and longitudinal offsets, throttle the distance to run, and yaw the
/// heading correction. All channels are clamped to the RC limit.
pub fn rc_from_target(target_rel: &Vector2<f64>, hdg_err_deg: f64) -> RcCommand {
    let lim = RC_CHANNEL_LIMIT;

    RcCommand {
        roll: clamp(&target_rel.x, &-lim, &lim),
        pitch: clamp(&target_rel.y, &-lim, &lim),
        yaw: clamp(&fold_heading_err(hdg_err_deg), &-lim, &lim),
        throttle: clamp(&target_rel.norm(), &0.0, &lim),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_distance_point_from_line() {
        let a = Vector2::new(100.0, 100.0);
        let b = Vector2::new(200.0, 200.0);

        // Points on the segment are on the line
        for t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            let p = a + (b - a) * *t;
            assert!(distance_point_from_line(&a, &b, &p).abs() < EPS);
        }

        // Known perpendicular distances either side of the line
        let d = distance_point_from_line(&a, &b, &Vector2::new(150.0, 160.0));
        assert!((d - 10.0 / 2f64.sqrt()).abs() < EPS);
        let d = distance_point_from_line(&a, &b, &Vector2::new(160.0, 150.0));
        assert!((d - 10.0 / 2f64.sqrt()).abs() < EPS);

        // Degenerate line falls back to point distance
        let d = distance_point_from_line(&a, &a, &Vector2::new(103.0, 104.0));
        assert!((d - 5.0).abs() < EPS);
    }

    #[test]
    fn test_is_point_past_line() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 0.0);

        assert!(is_point_past_line(&a, &b, &Vector2::new(11.0, 5.0)));
        assert!(!is_point_past_line(&a, &b, &Vector2::new(9.0, 5.0)));

        // The endpoint itself is not past
        assert!(!is_point_past_line(&a, &b, &b));

        // Degenerate segment is never passed
        assert!(!is_point_past_line(&a, &a, &b));
    }

    #[test]
    fn test_reckon_line() {
        let origin = Vector2::new(100.0, 100.0);

        // Zero distance reckons to the origin for any heading
        for h in &[0.0, 45.0, 90.0, 180.0, 270.0, 359.0, 450.0, -90.0] {
            let p = reckon_line(&origin, *h, 0.0);
            assert!((p - origin).norm() < EPS);
        }

        // North is +y, east is +x
        let p = reckon_line(&origin, 0.0, 10.0);
        assert!((p - Vector2::new(100.0, 110.0)).norm() < EPS);
        let p = reckon_line(&origin, 90.0, 10.0);
        assert!((p - Vector2::new(110.0, 100.0)).norm() < EPS);

        // 45 degrees splits evenly
        let p = reckon_line(&origin, 45.0, 100.0);
        let leg = 100.0 / 2f64.sqrt();
        assert!((p - Vector2::new(100.0 + leg, 100.0 + leg)).norm() < EPS);
    }

    #[test]
    fn test_length_of_arc_theta() {
        const TAU: f64 = std::f64::consts::TAU;

        // Equal angles sweep nothing either way
        for t in &[0.0, 0.2, 3.0, TAU - 0.1] {
            assert_eq!(length_of_arc_theta(*t, *t, RotDir::Cw), 0.0);
            assert_eq!(length_of_arc_theta(*t, *t, RotDir::Ccw), 0.0);
        }

        // The two directions are complementary around the full circle
        let cw = length_of_arc_theta(0.2, 4.1, RotDir::Cw);
        let ccw = length_of_arc_theta(0.2, 4.1, RotDir::Ccw);
        assert!((ccw - 3.9).abs() < EPS);
        assert!((cw + ccw - TAU).abs() < EPS);

        // Clockwise from just past zero wraps through zero
        let cw = length_of_arc_theta(0.1, TAU - 0.1, RotDir::Cw);
        assert!((cw - 0.2).abs() < EPS);

        // Out of range inputs are normalised, not rejected
        let wrapped = length_of_arc_theta(0.2 + TAU, 4.1 - TAU, RotDir::Cw);
        assert!((wrapped - length_of_arc_theta(0.2, 4.1, RotDir::Cw)).abs() < EPS);
    }

    #[test]
    fn test_length_of_arc() {
        let theta = length_of_arc_theta(0.2, 4.1, RotDir::Ccw);
        let len = length_of_arc(0.2, 4.1, RotDir::Ccw, 10.0);
        assert!((len - theta * 10.0).abs() < EPS);
    }

    #[test]
    fn test_heading_theta_roundtrip() {
        for h in &[0.0, 10.0, 90.0, 179.0, 270.0, 359.0] {
            let theta = theta_from_heading(*h);
            assert!((heading_from_theta(theta) - h).abs() < EPS);
        }
    }

    #[test]
    fn test_heading_of_line() {
        let a = Vector2::new(0.0, 0.0);

        assert!((heading_of_line(&a, &Vector2::new(0.0, 10.0)) - 0.0).abs() < EPS);
        assert!((heading_of_line(&a, &Vector2::new(10.0, 0.0)) - 90.0).abs() < EPS);
        assert!((heading_of_line(&a, &Vector2::new(0.0, -10.0)) - 180.0).abs() < EPS);
        assert!((heading_of_line(&a, &Vector2::new(-10.0, 0.0)) - 270.0).abs() < EPS);
    }

    #[test]
    fn test_rc_from_target() {
        // Sitting on the target with no heading error demands nothing
        let rc = rc_from_target(&Vector2::new(0.0, 0.0), 0.0);
        assert_eq!(rc, RcCommand::default());

        // Channels are clamped to the RC limit
        let rc = rc_from_target(&Vector2::new(500.0, -500.0), 720.0 + 90.0);
        assert_eq!(rc.roll, RC_CHANNEL_LIMIT);
        assert_eq!(rc.pitch, -RC_CHANNEL_LIMIT);
        assert_eq!(rc.throttle, RC_CHANNEL_LIMIT);
        assert_eq!(rc.yaw, 90.0);

        // Heading error is folded into [-180, 180] before clamping
        let rc = rc_from_target(&Vector2::new(0.0, 0.0), 350.0);
        assert_eq!(rc.yaw, -10.0);
    }
}
