//! Collision shapes for gear bodies.

use gearsim_kernel::gear::FACE_WIDTH;
use gearsim_kernel::{Gear, GearKind};
use nalgebra::Vector3;
use parry3d::shape::SharedShape;

/// Collision shape for a gear, in its native (Y-up) orientation.
///
/// Spur gears are cylinders and Bevel gears cones, both `FACE_WIDTH` thick;
/// Worm gears are cylinders as long as the worm. Teeth are not modelled.
pub fn gear_shape(gear: &Gear) -> SharedShape {
    let radius = gear.radius() as f32;
    let half_width = (FACE_WIDTH / 2.0) as f32;
    match gear.kind() {
        GearKind::Spur => SharedShape::cylinder(half_width, radius),
        GearKind::Bevel => SharedShape::cone(half_width, radius),
        GearKind::Worm => {
            let half_length = gear.length().unwrap_or(FACE_WIDTH) as f32 / 2.0;
            SharedShape::cylinder(half_length, radius)
        }
    }
}

/// Axis-angle rotation taking the shape's Y axis onto the gear's active axis.
///
/// Face axis (Spur/Bevel) is local Z: +90° about X. Length axis (Worm) is
/// local X: -90° about Z.
pub fn shape_rotation(kind: GearKind) -> Vector3<f32> {
    match kind {
        GearKind::Spur | GearKind::Bevel => Vector3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
        GearKind::Worm => Vector3::new(0.0, 0.0, -std::f32::consts::FRAC_PI_2),
    }
}
