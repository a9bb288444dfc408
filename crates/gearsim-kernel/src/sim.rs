//! Per-frame simulation loop tying the gear train to its collaborators.

use std::collections::VecDeque;

use gearsim_ir::{GearKind, Scene};
use log::{info, warn};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::config::{ConfigError, SimConfig};
use crate::error::{GearError, Result};
use crate::gear::{Direction, GearParams};
use crate::graph::ConnectionId;
use crate::physics::{NullRenderer, PhysicsStepper, Renderer};
use crate::propagate::{apply_driver_commands, propagate, PropagationReport};
use crate::store::GearId;
use crate::train::{params_from_def, GearTrain, RemovedGear};

/// A user edit queued for the start of the next frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Add a gear; randomly placed in the plane if no position is given.
    AddGear {
        /// Gear kind.
        kind: GearKind,
        /// Creation parameters.
        params: GearParams,
    },
    /// Remove a gear and all its connections.
    RemoveGear(GearId),
    /// Connect two gears.
    Connect(GearId, GearId),
    /// Disconnect two gears.
    Disconnect(GearId, GearId),
    /// Set or clear the driver flag.
    SetDriver(GearId, bool),
    /// Set the commanded speed magnitude.
    SetSpeed(GearId, f64),
    /// Set the rotation sense.
    SetDirection(GearId, Direction),
    /// Set the tooth count (Spur/Bevel).
    SetTeeth(GearId, u32),
    /// Set the pitch radius.
    SetRadius(GearId, f64),
    /// Set the length (Worm).
    SetLength(GearId, f64),
    /// Move a gear.
    SetPosition(GearId, Vector3<f64>),
}

/// What happened during one [`Simulation::frame`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Zero-based frame index.
    pub frame: u64,
    /// Gears created by queued edits this frame.
    pub added: Vec<GearId>,
    /// Queued edits that failed, with the reason. Failures never abort the frame.
    pub rejected: Vec<(Edit, GearError)>,
    /// Propagation outcome.
    pub propagation: PropagationReport,
}

/// A gear train wired to a physics stepper and a renderer.
///
/// Each [`frame`](Self::frame) runs, in order: queued edits, driver commands
/// and physics integration, propagation from post-integration driver
/// velocities, and transform sync to the renderer. The immediate methods
/// (`add_gear`, `connect`, ...) keep bodies, constraints and meshes in step
/// with the train on every call.
pub struct Simulation<P, R = NullRenderer> {
    train: GearTrain,
    physics: P,
    renderer: R,
    config: SimConfig,
    rng: Pcg64,
    pending: VecDeque<Edit>,
    frame: u64,
}

impl<P: PhysicsStepper, R: Renderer> Simulation<P, R> {
    /// Create an empty simulation.
    pub fn new(config: SimConfig, physics: P, renderer: R) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            train: GearTrain::new(),
            physics,
            renderer,
            rng: Pcg64::seed_from_u64(config.seed),
            config,
            pending: VecDeque::new(),
            frame: 0,
        })
    }

    /// Add every gear and connection of a scene.
    ///
    /// The scene is validated in full before anything is added, so on error
    /// the simulation is unchanged. Returns the new ids in scene order.
    pub fn load_scene(&mut self, scene: &Scene) -> Result<Vec<GearId>> {
        GearTrain::from_scene(scene)?;
        if let Some(clash) = scene
            .gears
            .iter()
            .find(|def| self.train.id_by_name(&def.name).is_some())
        {
            return Err(GearError::DuplicateName(clash.name.clone()));
        }

        let mut ids = Vec::with_capacity(scene.gears.len());
        for def in &scene.gears {
            ids.push(self.add_gear(def.kind, params_from_def(def)?)?);
        }
        for conn in &scene.connections {
            let a = self.lookup(&conn.a)?;
            let b = self.lookup(&conn.b)?;
            self.connect(a, b)?;
        }
        info!(
            "loaded scene: {} gear(s), {} connection(s)",
            scene.gears.len(),
            scene.connections.len()
        );
        Ok(ids)
    }

    fn lookup(&self, name: &str) -> Result<GearId> {
        self.train
            .id_by_name(name)
            .ok_or_else(|| GearError::UnknownName(name.to_owned()))
    }

    /// Add a gear, its body and its mesh.
    pub fn add_gear(&mut self, kind: GearKind, mut params: GearParams) -> Result<GearId> {
        if params.position.is_none() {
            let e = self.config.placement_extent;
            params.position = Some(Vector3::new(
                self.rng.gen_range(-e..=e),
                self.rng.gen_range(-e..=e),
                0.0,
            ));
        }
        let id = self.train.add_gear(kind, params)?;
        let gear = self.train.gear(id)?;
        self.physics.create_body(id, gear);
        self.renderer.build_mesh(id, gear);
        Ok(id)
    }

    /// Remove a gear, releasing its constraints, body and mesh.
    pub fn remove_gear(&mut self, id: GearId) -> Result<RemovedGear> {
        let removed = self.train.remove_gear(id)?;
        for &conn in &removed.connections {
            self.physics.remove_constraint(conn);
        }
        self.physics.remove_body(id);
        self.renderer.drop_mesh(id);
        Ok(removed)
    }

    /// Connect two gears and add their physics constraint.
    pub fn connect(&mut self, a: GearId, b: GearId) -> Result<ConnectionId> {
        let conn = self.train.connect(a, b)?;
        self.physics.add_constraint(conn, a, b);
        Ok(conn)
    }

    /// Disconnect two gears and release their physics constraint.
    pub fn disconnect(&mut self, a: GearId, b: GearId) -> Result<ConnectionId> {
        let conn = self.train.disconnect(a, b)?;
        self.physics.remove_constraint(conn);
        Ok(conn)
    }

    /// Set or clear the driver flag.
    pub fn set_driver(&mut self, id: GearId, driver: bool) -> Result<()> {
        self.train.set_driver(id, driver)
    }

    /// Set the commanded speed magnitude.
    pub fn set_speed(&mut self, id: GearId, speed: f64) -> Result<()> {
        self.train.set_speed(id, speed)
    }

    /// Set the rotation sense.
    pub fn set_direction(&mut self, id: GearId, direction: Direction) -> Result<()> {
        self.train.set_direction(id, direction)
    }

    /// Set the tooth count and rebuild the gear.
    pub fn set_teeth(&mut self, id: GearId, teeth: u32) -> Result<()> {
        self.train.set_teeth(id, teeth)?;
        self.rebuild(id)
    }

    /// Set the pitch radius and rebuild the gear.
    pub fn set_radius(&mut self, id: GearId, radius: f64) -> Result<()> {
        self.train.set_radius(id, radius)?;
        self.rebuild(id)
    }

    /// Set the worm length and rebuild the gear.
    pub fn set_length(&mut self, id: GearId, length: f64) -> Result<()> {
        self.train.set_length(id, length)?;
        self.rebuild(id)
    }

    /// Move a gear and rebuild it.
    pub fn set_position(&mut self, id: GearId, position: Vector3<f64>) -> Result<()> {
        self.train.set_position(id, position)?;
        self.rebuild(id)
    }

    /// Regenerate a gear's body, constraints and mesh from its current
    /// attributes. Idempotent.
    pub fn rebuild(&mut self, id: GearId) -> Result<()> {
        let gear = self.train.gear(id)?;
        let edges: Vec<ConnectionId> = self.train.connections_of(id)?.map(|e| e.id).collect();

        for &conn in &edges {
            self.physics.remove_constraint(conn);
        }
        self.physics.rebuild_body(id, gear);
        for &conn in &edges {
            let (a, b) = self.train.graph().endpoints(conn)?;
            self.physics.add_constraint(conn, a, b);
        }
        self.renderer.drop_mesh(id);
        self.renderer.build_mesh(id, gear);
        Ok(())
    }

    /// Queue an edit for the start of the next frame.
    pub fn submit(&mut self, edit: Edit) {
        self.pending.push_back(edit);
    }

    /// Number of queued edits.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Apply an edit immediately. Returns the new id for [`Edit::AddGear`].
    pub fn apply(&mut self, edit: Edit) -> Result<Option<GearId>> {
        match edit {
            Edit::AddGear { kind, params } => return self.add_gear(kind, params).map(Some),
            Edit::RemoveGear(id) => self.remove_gear(id).map(drop)?,
            Edit::Connect(a, b) => self.connect(a, b).map(drop)?,
            Edit::Disconnect(a, b) => self.disconnect(a, b).map(drop)?,
            Edit::SetDriver(id, driver) => self.set_driver(id, driver)?,
            Edit::SetSpeed(id, speed) => self.set_speed(id, speed)?,
            Edit::SetDirection(id, direction) => self.set_direction(id, direction)?,
            Edit::SetTeeth(id, teeth) => self.set_teeth(id, teeth)?,
            Edit::SetRadius(id, radius) => self.set_radius(id, radius)?,
            Edit::SetLength(id, length) => self.set_length(id, length)?,
            Edit::SetPosition(id, position) => self.set_position(id, position)?,
        }
        Ok(None)
    }

    /// Run one frame.
    pub fn frame(&mut self) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        while let Some(edit) = self.pending.pop_front() {
            match self.apply(edit.clone()) {
                Ok(Some(id)) => report.added.push(id),
                Ok(None) => {}
                Err(err) => {
                    warn!("frame {}: rejected {edit:?}: {err}", self.frame);
                    report.rejected.push((edit, err));
                }
            }
        }

        apply_driver_commands(&mut self.train);
        for (id, gear) in self.train.gears() {
            if gear.is_driver() {
                self.physics.set_angular_velocity(id, &gear.angular_velocity());
            }
        }
        for _ in 0..self.config.substeps {
            self.physics.step(self.config.dt);
        }

        let ids = self.train.ids().to_vec();
        for &id in &ids {
            if let (Some(w), Ok(gear)) = (self.physics.angular_velocity(id), self.train.gear_mut(id)) {
                gear.set_angular_velocity(w);
            }
        }
        report.propagation = propagate(&mut self.train);
        for &id in &report.propagation.updated {
            if let Ok(gear) = self.train.gear(id) {
                self.physics.set_angular_velocity(id, &gear.angular_velocity());
            }
        }

        for &id in &ids {
            if let Some(pose) = self.physics.pose(id) {
                self.renderer.sync_transform(id, &pose);
            }
        }

        self.frame += 1;
        report
    }

    /// The gear train.
    pub fn train(&self) -> &GearTrain {
        &self.train
    }

    /// The physics stepper.
    pub fn physics(&self) -> &P {
        &self.physics
    }

    /// Mutable access to the physics stepper.
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicStepper;
    use approx::assert_relative_eq;

    fn sim() -> Simulation<KinematicStepper> {
        Simulation::new(SimConfig::default(), KinematicStepper::new(), NullRenderer).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            dt: -1.0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(config, KinematicStepper::new(), NullRenderer).is_err());
    }

    #[test]
    fn random_placement_is_seeded_and_planar() {
        let mut first = sim();
        let mut second = sim();
        let a = first.add_gear(GearKind::Spur, GearParams::default()).unwrap();
        let b = second.add_gear(GearKind::Spur, GearParams::default()).unwrap();

        let pa = first.train().gear(a).unwrap().position();
        let pb = second.train().gear(b).unwrap().position();
        assert_eq!(pa, pb);
        assert_eq!(pa.z, 0.0);
        assert!(pa.x.abs() <= 20.0 && pa.y.abs() <= 20.0);
    }

    #[test]
    fn widest_placement_extent_places_without_panicking() {
        let config = SimConfig {
            placement_extent: crate::config::MAX_PLACEMENT_EXTENT,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config, KinematicStepper::new(), NullRenderer).unwrap();
        let id = sim.add_gear(GearKind::Spur, GearParams::default()).unwrap();
        let p = sim.train().gear(id).unwrap().position();
        assert!(p.x.abs() <= 1.0e6 && p.y.abs() <= 1.0e6);
    }

    #[test]
    fn queued_edits_apply_in_order_and_failures_do_not_abort() {
        let mut sim = sim();
        let a = sim
            .add_gear(GearKind::Spur, GearParams::default().with_teeth(12).driver())
            .unwrap();
        let b = sim
            .add_gear(GearKind::Spur, GearParams::default().with_teeth(24))
            .unwrap();

        sim.submit(Edit::Connect(a, b));
        sim.submit(Edit::Connect(b, a));
        sim.submit(Edit::SetSpeed(a, 2.0));
        assert_eq!(sim.pending(), 3);

        let report = sim.frame();
        assert_eq!(sim.pending(), 0);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].1, GearError::DuplicateConnection(b, a));
        assert_eq!(report.propagation.updated, vec![b]);
        assert_relative_eq!(sim.train().gear(b).unwrap().active_rate(), -1.0);
        assert_relative_eq!(sim.physics().angular_velocity(b).unwrap().z, -1.0);
        assert_eq!(sim.frame_count(), 1);
    }

    #[test]
    fn load_scene_is_all_or_nothing() {
        let mut sim = sim();
        let scene = Scene::from_json(
            r#"{ "version": "0.1",
                 "gears": [ { "name": "a", "kind": "Spur" }, { "name": "b", "kind": "Bevel" } ],
                 "connections": [ { "a": "a", "b": "missing" } ] }"#,
        )
        .unwrap();
        assert!(sim.load_scene(&scene).is_err());
        assert!(sim.train().is_empty());
        assert_eq!(sim.physics().body_count(), 0);

        let scene = Scene::from_json(
            r#"{ "version": "0.1",
                 "gears": [ { "name": "a", "kind": "Spur" }, { "name": "b", "kind": "Bevel" } ],
                 "connections": [ { "a": "a", "b": "b" } ] }"#,
        )
        .unwrap();
        let ids = sim.load_scene(&scene).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(sim.physics().constraint_count(), 1);
        assert_eq!(
            sim.load_scene(&scene).unwrap_err(),
            GearError::DuplicateName("a".into())
        );
    }

    #[test]
    fn rebuild_keeps_constraints() {
        let mut sim = sim();
        let a = sim.add_gear(GearKind::Spur, GearParams::default()).unwrap();
        let b = sim.add_gear(GearKind::Spur, GearParams::default()).unwrap();
        let conn = sim.connect(a, b).unwrap();

        sim.set_teeth(a, 30).unwrap();
        sim.rebuild(a).unwrap();

        assert!(sim.physics().has_body(a));
        assert_eq!(sim.physics().constraint(conn), Some((a, b)));
        assert_eq!(sim.train().graph().ratio(a, b), Some(30.0 / 12.0));
    }
}
