//! Kinematic propagation: derive non-driver angular velocities from drivers.
//!
//! This is a single one-hop pass per tick, not a fixed-point solve. A
//! non-driver gear only reacts to neighbours that are themselves drivers,
//! and when several drivers mesh with the same gear the one evaluated last
//! (in the gear's connection insertion order) wins.

use log::debug;

use crate::graph::Coupling;
use crate::store::GearId;
use crate::train::GearTrain;

/// Outcome of one [`propagate`] pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Non-driver gears whose angular velocity was written, in creation order.
    pub updated: Vec<GearId>,
    /// Number of times a driver contribution replaced an earlier one on the
    /// same gear during this pass.
    pub overwrites: usize,
}

/// Set every driver's angular velocity to `speed * direction` on its active
/// axis, zeroing the other axes.
pub fn apply_driver_commands(train: &mut GearTrain) {
    for id in train.drivers() {
        let gear = train
            .gear_mut(id)
            .unwrap_or_else(|_| panic!("driver {id:?} vanished from the store"));
        let rate = gear.commanded_rate();
        gear.set_active_rate(rate);
    }
}

/// Rate a driven gear receives from one meshing driver.
///
/// `driver_rate` is the driver's angular velocity on its own active axis and
/// `ratio` the transmission ratio stored on the driver's half-edge toward
/// the driven gear. Meshing teeth turn in opposite senses, hence the sign.
pub fn driven_rate(driver_rate: f64, ratio: f64) -> f64 {
    -driver_rate * ratio
}

/// Run one propagation pass over the train.
///
/// For each non-driver gear, each driver neighbour in insertion order writes
/// `-(driver rate on its active axis) * ratio(driver -> gear)` onto the gear's
/// own active axis. For same-axis pairs both active axes are the face axis;
/// for cross-axis pairs the Worm's length axis pairs with the other gear's
/// face axis. Gears without a driver neighbour are left untouched.
///
/// Reads only driver velocities and writes only non-driver velocities, so
/// the result does not depend on evaluation order across gears and running
/// the pass twice gives the same state as running it once.
pub fn propagate(train: &mut GearTrain) -> PropagationReport {
    #[cfg(debug_assertions)]
    train.graph().assert_mirrored();

    let mut writes: Vec<(GearId, f64)> = Vec::new();
    let mut report = PropagationReport::default();

    for (id, gear) in train.gears() {
        if gear.is_driver() {
            continue;
        }
        let mut derived: Option<f64> = None;
        let edges = train
            .connections_of(id)
            .unwrap_or_else(|_| panic!("gear {id:?} missing from connection graph"));
        for edge in edges {
            let neighbor = train
                .gear(edge.neighbor)
                .unwrap_or_else(|_| panic!("dangling connection {:?} -> {:?}", id, edge.neighbor));
            if !neighbor.is_driver() {
                continue;
            }
            let ratio = train
                .graph()
                .ratio(edge.neighbor, id)
                .unwrap_or_else(|| panic!("one-sided connection {:?} -> {:?}", id, edge.neighbor));
            let rate = driven_rate(neighbor.active_rate(), ratio);
            if let Some(previous) = derived.replace(rate) {
                report.overwrites += 1;
                debug!(
                    "gear {id:?}: driver {:?} overrides earlier contribution {previous} with {rate}",
                    edge.neighbor
                );
            }
            if edge.coupling == Coupling::CrossAxis {
                debug!("gear {id:?}: cross-axis drive from {:?}", edge.neighbor);
            }
        }
        if let Some(rate) = derived {
            writes.push((id, rate));
        }
    }

    for (id, rate) in writes {
        train
            .gear_mut(id)
            .unwrap_or_else(|_| panic!("gear {id:?} vanished during propagation"))
            .set_active_rate(rate);
        report.updated.push(id);
    }
    report
}
