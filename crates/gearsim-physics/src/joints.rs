//! Joints holding gear bodies in place.

use gearsim_kernel::Axis;
use nalgebra::{Point3, UnitVector3};
use rapier3d::dynamics::{
    GenericJoint, GenericJointBuilder, JointAxesMask, RopeJointBuilder,
};

/// Revolute joint between a fixed anchor and a gear body, free only about
/// the gear's active axis. Both anchors sit at the body origin.
pub fn axle_joint(axis: Axis) -> GenericJoint {
    let axis = UnitVector3::new_normalize(axis.unit().cast::<f32>());
    GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
        .local_anchor1(Point3::origin())
        .local_anchor2(Point3::origin())
        .local_axis1(axis)
        .local_axis2(axis)
        .build()
}

/// Rope joint keeping two meshing gears' centres at most `distance` apart.
pub fn mesh_constraint(distance: f32) -> GenericJoint {
    RopeJointBuilder::new(distance)
        .local_anchor1(Point3::origin())
        .local_anchor2(Point3::origin())
        .build()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axle_leaves_one_rotation_free() {
        let joint = axle_joint(Axis::Z);
        assert_eq!(joint.locked_axes, JointAxesMask::LOCKED_REVOLUTE_AXES);
        assert!(joint.local_axis1().z > 0.99);
        assert!(!joint.locked_axes.contains(JointAxesMask::ANG_X));
    }

    #[test]
    fn rope_is_anchored_at_body_centres() {
        let joint = mesh_constraint(12.5);
        assert_eq!(joint.local_anchor1(), Point3::origin());
        assert_eq!(joint.local_anchor2(), Point3::origin());
    }
}
