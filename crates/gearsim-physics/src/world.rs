//! Physics world management using Rapier3d.

use std::collections::HashMap;

use gearsim_kernel::{ConnectionId, Gear, GearId, PhysicsStepper, SimConfig};
use log::debug;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointHandle, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, ColliderBuilder, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};

use crate::colliders::{gear_shape, shape_rotation};
use crate::joints::{axle_joint, mesh_constraint};

/// Rapier handles belonging to one gear.
#[derive(Debug, Clone, Copy)]
struct GearBody {
    body: RigidBodyHandle,
    anchor: RigidBodyHandle,
}

/// Rapier-backed [`PhysicsStepper`].
pub struct RapierStepper {
    // Rapier components
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    density: f32,

    // Mapping from gearsim to Rapier
    gear_to_body: HashMap<GearId, GearBody>,
    connection_to_joint: HashMap<ConnectionId, ImpulseJointHandle>,
}

impl Default for RapierStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierStepper {
    /// Create an empty world with zero gravity and density 1000 kg/m^3.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::zeros(),
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            density: 1000.0,
            gear_to_body: HashMap::new(),
            connection_to_joint: HashMap::new(),
        }
    }

    /// Create an empty world using the gravity and density of `config`.
    pub fn from_config(config: &SimConfig) -> Self {
        let mut world = Self::new();
        let [x, y, z] = config.gravity;
        world.set_gravity(x as f32, y as f32, z as f32);
        world.density = config.density as f32;
        world
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vector3::new(x, y, z);
    }

    /// Whether a body exists for `id`.
    pub fn has_body(&self, id: GearId) -> bool {
        self.gear_to_body.contains_key(&id)
    }

    /// Number of gear bodies.
    pub fn body_count(&self) -> usize {
        self.gear_to_body.len()
    }

    /// Whether a connection's constraint is live.
    pub fn has_constraint(&self, connection: ConnectionId) -> bool {
        self.connection_to_joint
            .get(&connection)
            .is_some_and(|&h| self.impulse_joints.get(h).is_some())
    }

    /// Number of live connection constraints.
    pub fn constraint_count(&self) -> usize {
        self.connection_to_joint
            .values()
            .filter(|&&h| self.impulse_joints.get(h).is_some())
            .count()
    }

    fn remove_handles(&mut self, handles: GearBody) {
        for handle in [handles.body, handles.anchor] {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }
}

impl PhysicsStepper for RapierStepper {
    fn create_body(&mut self, id: GearId, gear: &Gear) {
        if let Some(old) = self.gear_to_body.remove(&id) {
            self.remove_handles(old);
        }

        let translation = gear.position().cast::<f32>();
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(translation)
            .angvel(gear.angular_velocity().cast::<f32>())
            .build();
        let body = self.bodies.insert(rigid_body);

        let collider = ColliderBuilder::new(gear_shape(gear))
            .rotation(shape_rotation(gear.kind()))
            .density(self.density)
            .friction(0.5)
            .restitution(0.1)
            .build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        // Axle: pin the gear to a fixed anchor at its centre
        let anchor = self
            .bodies
            .insert(RigidBodyBuilder::fixed().translation(translation).build());
        self.impulse_joints
            .insert(anchor, body, axle_joint(gear.active_axis()), true);

        self.gear_to_body.insert(id, GearBody { body, anchor });
        debug!("created {} body for {id:?}", gear.kind());
    }

    fn remove_body(&mut self, id: GearId) {
        if let Some(handles) = self.gear_to_body.remove(&id) {
            // Removing a body also removes the joints attached to it
            self.remove_handles(handles);
            debug!("removed body for {id:?}");
        }
    }

    fn set_angular_velocity(&mut self, id: GearId, angular_velocity: &Vector3<f64>) {
        if let Some(handles) = self.gear_to_body.get(&id) {
            if let Some(body) = self.bodies.get_mut(handles.body) {
                body.set_angvel(angular_velocity.cast::<f32>(), true);
            }
        }
    }

    fn angular_velocity(&self, id: GearId) -> Option<Vector3<f64>> {
        let handles = self.gear_to_body.get(&id)?;
        let body = self.bodies.get(handles.body)?;
        Some(body.angvel().cast::<f64>())
    }

    fn pose(&self, id: GearId) -> Option<Isometry3<f64>> {
        let handles = self.gear_to_body.get(&id)?;
        let pos = self.bodies.get(handles.body)?.position();
        let translation = Translation3::new(
            pos.translation.x as f64,
            pos.translation.y as f64,
            pos.translation.z as f64,
        );
        let rotation = UnitQuaternion::new_normalize(Quaternion::new(
            pos.rotation.w as f64,
            pos.rotation.i as f64,
            pos.rotation.j as f64,
            pos.rotation.k as f64,
        ));
        Some(Isometry3::from_parts(translation, rotation))
    }

    fn step(&mut self, dt: f64) {
        self.integration_params.dt = dt as f32;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn add_constraint(&mut self, connection: ConnectionId, a: GearId, b: GearId) {
        self.remove_constraint(connection);
        let (Some(&body_a), Some(&body_b)) = (self.gear_to_body.get(&a), self.gear_to_body.get(&b))
        else {
            return;
        };
        let (Some(pa), Some(pb)) = (self.bodies.get(body_a.body), self.bodies.get(body_b.body))
        else {
            return;
        };
        let distance = (pa.translation() - pb.translation()).norm();
        let handle = self.impulse_joints.insert(
            body_a.body,
            body_b.body,
            mesh_constraint(distance),
            true,
        );
        self.connection_to_joint.insert(connection, handle);
    }

    fn remove_constraint(&mut self, connection: ConnectionId) {
        if let Some(handle) = self.connection_to_joint.remove(&connection) {
            self.impulse_joints.remove(handle, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gearsim_kernel::{GearKind, GearParams, GearTrain, NullRenderer, Simulation};

    fn train_with_pair() -> (GearTrain, GearId, GearId) {
        let mut train = GearTrain::new();
        let a = train
            .add_gear(
                GearKind::Spur,
                GearParams::default()
                    .with_teeth(12)
                    .with_speed(2.0)
                    .driver()
                    .at(Vector3::new(-10.0, 0.0, 0.0)),
            )
            .unwrap();
        let b = train
            .add_gear(
                GearKind::Spur,
                GearParams::default()
                    .with_teeth(24)
                    .at(Vector3::new(10.0, 0.0, 0.0)),
            )
            .unwrap();
        (train, a, b)
    }

    #[test]
    fn spinning_body_keeps_its_rate_about_the_axle() {
        let (train, a, _) = train_with_pair();
        let mut world = RapierStepper::new();
        world.create_body(a, train.gear(a).unwrap());
        world.set_angular_velocity(a, &Vector3::new(0.0, 0.0, 1.5));

        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }

        let w = world.angular_velocity(a).unwrap();
        assert_relative_eq!(w.z, 1.5, epsilon = 1e-2);
        let pose = world.pose(a).unwrap();
        assert_relative_eq!(pose.translation.vector.x, -10.0, epsilon = 1e-3);
        assert!(pose.rotation.angle() > 0.5);
    }

    #[test]
    fn constraints_follow_connections() {
        let (mut train, a, b) = train_with_pair();
        let conn = train.connect(a, b).unwrap();
        let mut world = RapierStepper::new();
        world.create_body(a, train.gear(a).unwrap());
        world.create_body(b, train.gear(b).unwrap());

        world.add_constraint(conn, a, b);
        assert!(world.has_constraint(conn));
        assert_eq!(world.constraint_count(), 1);

        world.remove_constraint(conn);
        assert!(!world.has_constraint(conn));
        world.remove_constraint(conn);
    }

    #[test]
    fn rebuild_is_idempotent_and_drops_attached_joints() {
        let (mut train, a, b) = train_with_pair();
        let conn = train.connect(a, b).unwrap();
        let mut world = RapierStepper::new();
        world.create_body(a, train.gear(a).unwrap());
        world.create_body(b, train.gear(b).unwrap());
        world.add_constraint(conn, a, b);

        world.rebuild_body(a, train.gear(a).unwrap());
        world.rebuild_body(a, train.gear(a).unwrap());

        assert_eq!(world.body_count(), 2);
        assert!(!world.has_constraint(conn));

        world.remove_body(a);
        assert!(!world.has_body(a));
        assert_eq!(world.angular_velocity(a), None);
    }

    #[test]
    fn simulation_drives_follower_through_rapier() {
        let config = SimConfig::default();
        let mut sim =
            Simulation::new(config.clone(), RapierStepper::from_config(&config), NullRenderer)
                .unwrap();
        let a = sim
            .add_gear(
                GearKind::Spur,
                GearParams::default()
                    .with_teeth(12)
                    .with_speed(2.0)
                    .driver()
                    .at(Vector3::new(-10.0, 0.0, 0.0)),
            )
            .unwrap();
        let b = sim
            .add_gear(
                GearKind::Spur,
                GearParams::default()
                    .with_teeth(24)
                    .at(Vector3::new(10.0, 0.0, 0.0)),
            )
            .unwrap();
        sim.connect(a, b).unwrap();

        for _ in 0..10 {
            sim.frame();
        }

        assert_relative_eq!(sim.train().gear(b).unwrap().active_rate(), -1.0, epsilon = 1e-2);
        assert_relative_eq!(
            sim.physics().angular_velocity(b).unwrap().z,
            -1.0,
            epsilon = 1e-2
        );
        assert!(sim.physics().has_constraint(
            sim.train().connections_of(a).unwrap().next().unwrap().id
        ));
    }
}
