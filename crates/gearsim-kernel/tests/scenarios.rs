//! End-to-end gear train scenarios against stub collaborators.

use std::collections::HashMap;

use approx::assert_relative_eq;
use gearsim_kernel::{
    Edit, Gear, GearError, GearId, GearKind, GearParams, GearTrain, KinematicStepper, Missing,
    Renderer, SimConfig, Simulation,
};
use nalgebra::{Isometry3, Vector3};

/// Renderer that remembers which meshes exist and how often each was synced.
#[derive(Default)]
struct RecordingRenderer {
    meshes: HashMap<GearId, u32>,
    syncs: HashMap<GearId, u32>,
}

impl Renderer for RecordingRenderer {
    fn build_mesh(&mut self, id: GearId, gear: &Gear) {
        self.meshes.insert(id, gear.teeth().unwrap_or(0));
    }

    fn drop_mesh(&mut self, id: GearId) {
        self.meshes.remove(&id);
    }

    fn sync_transform(&mut self, id: GearId, _pose: &Isometry3<f64>) {
        *self.syncs.entry(id).or_default() += 1;
    }
}

fn simulation() -> Simulation<KinematicStepper, RecordingRenderer> {
    Simulation::new(
        SimConfig::default(),
        KinematicStepper::new(),
        RecordingRenderer::default(),
    )
    .unwrap()
}

#[test]
fn connect_is_mirrored_and_disconnect_clears_both_sides() {
    let mut train = GearTrain::new();
    let g = train.add_gear(GearKind::Spur, GearParams::default()).unwrap();
    let h = train.add_gear(GearKind::Worm, GearParams::default()).unwrap();

    train.connect(g, h).unwrap();
    assert!(train.connections_of(g).unwrap().any(|e| e.neighbor == h));
    assert!(train.connections_of(h).unwrap().any(|e| e.neighbor == g));

    train.disconnect(g, h).unwrap();
    assert!(train.connections_of(g).unwrap().all(|e| e.neighbor != h));
    assert!(train.connections_of(h).unwrap().all(|e| e.neighbor != g));
}

#[test]
fn duplicate_connect_leaves_graph_unchanged() {
    let mut train = GearTrain::new();
    let g = train.add_gear(GearKind::Spur, GearParams::default()).unwrap();
    let h = train.add_gear(GearKind::Spur, GearParams::default()).unwrap();
    let first = train.connect(g, h).unwrap();

    assert_eq!(train.connect(g, h), Err(GearError::DuplicateConnection(g, h)));
    let edges: Vec<_> = train.connections_of(g).unwrap().map(|e| e.id).collect();
    assert_eq!(edges, vec![first]);
    assert_eq!(train.connections_of(h).unwrap().len(), 1);
    train.graph().assert_mirrored();
}

#[test]
fn twelve_tooth_driver_turns_twenty_four_tooth_gear_at_half_speed() {
    let mut train = GearTrain::new();
    let a = train
        .add_gear(
            GearKind::Spur,
            GearParams::default()
                .with_teeth(12)
                .with_speed(1.0)
                .driver(),
        )
        .unwrap();
    let b = train
        .add_gear(GearKind::Spur, GearParams::default().with_teeth(24))
        .unwrap();
    train.connect(a, b).unwrap();
    assert_eq!(train.graph().ratio(a, b), Some(0.5));

    train
        .set_angular_velocity(a, Vector3::new(0.0, 0.0, 2.0))
        .unwrap();
    gearsim_kernel::propagate(&mut train);

    assert_relative_eq!(train.gear(b).unwrap().angular_velocity().z, -1.0);
}

#[test]
fn deleting_a_gear_releases_edges_and_constraints() {
    let mut sim = simulation();
    let hub = sim
        .add_gear(GearKind::Spur, GearParams::default().driver())
        .unwrap();
    let left = sim.add_gear(GearKind::Spur, GearParams::default()).unwrap();
    let right = sim.add_gear(GearKind::Worm, GearParams::default()).unwrap();
    let c1 = sim.connect(hub, left).unwrap();
    let c2 = sim.connect(right, hub).unwrap();
    assert_eq!(sim.physics().constraint_count(), 2);

    let removed = sim.remove_gear(hub).unwrap();

    assert_eq!(removed.connections, vec![c1, c2]);
    assert_eq!(sim.train().connections_of(left).unwrap().len(), 0);
    assert_eq!(sim.train().connections_of(right).unwrap().len(), 0);
    assert_eq!(sim.physics().constraint(c1), None);
    assert_eq!(sim.physics().constraint(c2), None);
    assert!(!sim.physics().has_body(hub));
    assert!(!sim.renderer().meshes.contains_key(&hub));
    assert_eq!(
        sim.connect(hub, left),
        Err(GearError::NotFound(Missing::Gear(hub)))
    );
}

#[test]
fn frames_hold_a_steady_ratio_across_mixed_axes() {
    let mut sim = simulation();
    let worm = sim
        .add_gear(GearKind::Worm, GearParams::default().with_speed(3.0).driver())
        .unwrap();
    let wheel = sim
        .add_gear(GearKind::Spur, GearParams::default().with_teeth(30))
        .unwrap();
    sim.connect(worm, wheel).unwrap();

    for _ in 0..5 {
        sim.frame();
        assert_relative_eq!(sim.train().gear(wheel).unwrap().angular_velocity().z, -3.0);
        assert_relative_eq!(sim.train().gear(worm).unwrap().angular_velocity().x, 3.0);
    }
    assert_eq!(sim.renderer().syncs[&wheel], 5);
    assert_eq!(sim.physics().steps(), 5);
}

#[test]
fn queued_teeth_edit_rebuilds_mesh_and_rescales_follower() {
    let mut sim = simulation();
    let driver = sim
        .add_gear(
            GearKind::Spur,
            GearParams::default().with_teeth(12).with_speed(2.0).driver(),
        )
        .unwrap();
    let follower = sim
        .add_gear(GearKind::Bevel, GearParams::default().with_teeth(24))
        .unwrap();
    sim.connect(driver, follower).unwrap();
    sim.frame();
    assert_relative_eq!(sim.train().gear(follower).unwrap().active_rate(), -1.0);

    sim.submit(Edit::SetTeeth(follower, 48));
    sim.submit(Edit::SetTeeth(driver, 2));
    let report = sim.frame();

    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(report.rejected[0].1, GearError::OutOfRange { .. }));
    assert_eq!(sim.renderer().meshes[&follower], 48);
    assert_relative_eq!(sim.train().gear(follower).unwrap().active_rate(), -0.5);
}

#[test]
fn clearing_the_driver_flag_stops_propagation() {
    let mut sim = simulation();
    let a = sim
        .add_gear(GearKind::Spur, GearParams::default().driver())
        .unwrap();
    let b = sim.add_gear(GearKind::Spur, GearParams::default()).unwrap();
    sim.connect(a, b).unwrap();
    sim.frame();

    sim.submit(Edit::SetDriver(a, false));
    let report = sim.frame();

    assert!(report.propagation.updated.is_empty());
    assert!(sim.train().drivers().is_empty());
}

#[test]
fn added_gears_are_reported_and_meshed() {
    let mut sim = simulation();
    sim.submit(Edit::AddGear {
        kind: GearKind::Spur,
        params: GearParams::default().with_teeth(16),
    });
    sim.submit(Edit::AddGear {
        kind: GearKind::Worm,
        params: GearParams::default().with_teeth(16),
    });

    let report = sim.frame();

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(sim.renderer().meshes[&report.added[0]], 16);
    assert_eq!(sim.physics().body_count(), 1);
}
