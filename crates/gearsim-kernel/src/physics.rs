//! Collaborator interfaces: physics stepping and rendering.
//!
//! The kernel never talks to a physics engine or a renderer directly. A
//! [`Simulation`](crate::Simulation) drives whatever implements these traits;
//! `gearsim-physics` provides a Rapier-backed [`PhysicsStepper`], and
//! [`KinematicStepper`] here integrates orientation from angular velocity
//! alone, which is enough for headless runs and tests.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::gear::Gear;
use crate::graph::ConnectionId;
use crate::store::GearId;

/// Rigid-body physics as seen by the kernel.
///
/// The kernel only reads and writes angular velocities; contact handling is
/// entirely the implementor's business.
pub trait PhysicsStepper {
    /// Create a body for a gear from its kind and dimensions.
    fn create_body(&mut self, id: GearId, gear: &Gear);

    /// Destroy a gear's body. Unknown ids are ignored.
    fn remove_body(&mut self, id: GearId);

    /// Regenerate a gear's body after a structural edit.
    ///
    /// Must be idempotent. Callers re-add constraints afterwards.
    fn rebuild_body(&mut self, id: GearId, gear: &Gear) {
        self.remove_body(id);
        self.create_body(id, gear);
    }

    /// Overwrite a body's angular velocity (rad/s, world frame).
    fn set_angular_velocity(&mut self, id: GearId, angular_velocity: &Vector3<f64>);

    /// Current angular velocity, or `None` for an unknown id.
    fn angular_velocity(&self, id: GearId) -> Option<Vector3<f64>>;

    /// Current body pose, or `None` for an unknown id.
    fn pose(&self, id: GearId) -> Option<Isometry3<f64>>;

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);

    /// Add the positional constraint belonging to a connection.
    fn add_constraint(&mut self, connection: ConnectionId, a: GearId, b: GearId);

    /// Release a connection's constraint. Unknown ids are ignored.
    fn remove_constraint(&mut self, connection: ConnectionId);
}

/// Visual side of the simulation.
pub trait Renderer {
    /// Create the visual mesh for a gear (also called after rebuilds).
    fn build_mesh(&mut self, id: GearId, gear: &Gear);

    /// Drop a gear's mesh.
    fn drop_mesh(&mut self, id: GearId);

    /// Copy a body transform onto the gear's visual.
    fn sync_transform(&mut self, id: GearId, pose: &Isometry3<f64>);
}

/// A renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn build_mesh(&mut self, _id: GearId, _gear: &Gear) {}
    fn drop_mesh(&mut self, _id: GearId) {}
    fn sync_transform(&mut self, _id: GearId, _pose: &Isometry3<f64>) {}
}

#[derive(Debug, Clone)]
struct KinematicBody {
    pose: Isometry3<f64>,
    angular_velocity: Vector3<f64>,
}

/// Dynamics-free stepper: bodies spin in place at their angular velocity.
#[derive(Debug, Clone, Default)]
pub struct KinematicStepper {
    bodies: HashMap<GearId, KinematicBody>,
    constraints: BTreeMap<ConnectionId, (GearId, GearId)>,
    steps: u64,
}

impl KinematicStepper {
    /// Create an empty stepper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a body exists for `id`.
    pub fn has_body(&self, id: GearId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// The gears a live constraint joins.
    pub fn constraint(&self, connection: ConnectionId) -> Option<(GearId, GearId)> {
        self.constraints.get(&connection).copied()
    }

    /// Number of live constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of [`step`](PhysicsStepper::step) calls so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl PhysicsStepper for KinematicStepper {
    fn create_body(&mut self, id: GearId, gear: &Gear) {
        let pose = Isometry3::from_parts(
            Translation3::from(gear.position()),
            UnitQuaternion::identity(),
        );
        self.bodies.insert(
            id,
            KinematicBody {
                pose,
                angular_velocity: gear.angular_velocity(),
            },
        );
    }

    fn remove_body(&mut self, id: GearId) {
        self.bodies.remove(&id);
        self.constraints.retain(|_, (a, b)| *a != id && *b != id);
    }

    fn set_angular_velocity(&mut self, id: GearId, angular_velocity: &Vector3<f64>) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.angular_velocity = *angular_velocity;
        }
    }

    fn angular_velocity(&self, id: GearId) -> Option<Vector3<f64>> {
        self.bodies.get(&id).map(|b| b.angular_velocity)
    }

    fn pose(&self, id: GearId) -> Option<Isometry3<f64>> {
        self.bodies.get(&id).map(|b| b.pose)
    }

    fn step(&mut self, dt: f64) {
        for body in self.bodies.values_mut() {
            let delta = UnitQuaternion::from_scaled_axis(body.angular_velocity * dt);
            body.pose.rotation = delta * body.pose.rotation;
        }
        self.steps += 1;
    }

    fn add_constraint(&mut self, connection: ConnectionId, a: GearId, b: GearId) {
        self.constraints.insert(connection, (a, b));
    }

    fn remove_constraint(&mut self, connection: ConnectionId) {
        self.constraints.remove(&connection);
    }
}
