//! Planar geometry shared by the detector, the table refresh and the interlock.
//!
//! World frame: x to the right of the start pose, y forward, angles counter-clockwise from +x.

#[allow(unused_imports)]
use num_traits::Float;
use uom::si::{
    angle::{degree, radian},
    f64::{Angle, Length},
    length::meter,
};

/// Residue below which an angle is snapped onto 0 deg instead of 360 deg.
const WRAP_EPSILON: f64 = 1e-9;

/// Wraps `angle` into `[0, 360)` degrees.
pub fn normalize(angle: Angle) -> Angle {
    let mut deg = angle.get::<degree>() % 360.0;
    if deg < 0.0 {
        deg += 360.0;
    }
    if deg >= 360.0 - WRAP_EPSILON || deg.abs() < WRAP_EPSILON {
        deg = 0.0;
    }
    Angle::new::<degree>(deg)
}

/// Unsigned angular separation of `a` and `b`, in `[0, 180]` degrees.
pub fn separation(a: Angle, b: Angle) -> Angle {
    let diff = normalize(a - b).get::<degree>();
    Angle::new::<degree>(if diff > 180.0 { 360.0 - diff } else { diff })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bearing {
    Resolved(Angle),
    /// The target lies straight above or below the origin (`dx == 0`); the angle was fixed to
    /// 90 or 270 deg from the sign of `dy`.
    Degenerate(Angle),
}

impl Bearing {
    pub fn angle(&self) -> Angle {
        match *self {
            Bearing::Resolved(angle) | Bearing::Degenerate(angle) => angle,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Bearing::Degenerate(_))
    }
}

/// Absolute bearing of the offset `(dx, dy)`.
pub fn bearing(dx: Length, dy: Length) -> Bearing {
    if dx.value == 0.0 {
        let deg = if dy.value < 0.0 { 270.0 } else { 90.0 };
        return Bearing::Degenerate(Angle::new::<degree>(deg));
    }
    Bearing::Resolved(normalize(Angle::new::<radian>(dy.value.atan2(dx.value))))
}

/// Straight-line distance of the offset `(dx, dy)`.
pub fn distance(dx: Length, dy: Length) -> Length {
    Length::new::<meter>(dx.value.hypot(dy.value))
}

/// The point `distance` away from `(x, y)` along `bearing`. A negative distance points backwards.
pub fn project(x: Length, y: Length, distance: Length, bearing: Angle) -> (Length, Length) {
    (
        x + distance * bearing.value.cos(),
        y + distance * bearing.value.sin(),
    )
}

/// Width of an object of angular size `angular_width` seen from `distance`.
pub fn chord_width(distance: Length, angular_width: Angle) -> Length {
    2.0 * distance * (angular_width.value / 2.0).tan()
}
