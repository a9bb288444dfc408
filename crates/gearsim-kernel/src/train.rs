//! The gear train: gear store plus connection graph behind one API.
//!
//! All mutation goes through [`GearTrain`] so that removing a gear always
//! cascades to its connections and tooth-count edits always refresh the
//! ratios stored on its edges.

use std::collections::HashSet;

use gearsim_ir::{ConnectionDef, GearDef, GearKind, Scene, Vec3};
use log::info;
use nalgebra::Vector3;

use crate::error::{GearError, Result};
use crate::gear::{Direction, Gear, GearParams};
use crate::graph::{ConnectionGraph, ConnectionId, Connections};
use crate::store::{GearId, GearStore};

/// What [`GearTrain::remove_gear`] took out of the train.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedGear {
    /// The removed gear.
    pub gear: Gear,
    /// Connections severed by the cascade, in the gear's insertion order.
    pub connections: Vec<ConnectionId>,
}

/// A set of gears and the meshing connections between them.
#[derive(Debug, Clone, Default)]
pub struct GearTrain {
    store: GearStore,
    graph: ConnectionGraph,
}

impl GearTrain {
    /// Create an empty train.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a train from a declarative scene.
    ///
    /// Gear names must be unique and every connection must name declared
    /// gears. Gears without a position are placed at the origin.
    pub fn from_scene(scene: &Scene) -> Result<Self> {
        let mut train = Self::new();
        for def in &scene.gears {
            train.add_gear(def.kind, params_from_def(def)?)?;
        }
        for conn in &scene.connections {
            let a = train.resolve(&conn.a)?;
            let b = train.resolve(&conn.b)?;
            train.connect(a, b)?;
        }
        Ok(train)
    }

    /// Snapshot the train as a scene.
    ///
    /// Unnamed gears are written as `gear-<n>`, starting from their creation
    /// index and skipping names already in use.
    /// Each connection is written once, from the endpoint created first.
    pub fn to_scene(&self) -> Scene {
        let mut taken: HashSet<String> = self
            .store
            .iter()
            .filter_map(|(_, gear)| gear.name().map(str::to_owned))
            .collect();
        let mut names: Vec<(GearId, String)> = Vec::with_capacity(self.store.len());
        for (i, (id, gear)) in self.store.iter().enumerate() {
            let name = match gear.name() {
                Some(name) => name.to_owned(),
                None => {
                    let mut n = i;
                    while taken.contains(&format!("gear-{n}")) {
                        n += 1;
                    }
                    let fallback = format!("gear-{n}");
                    taken.insert(fallback.clone());
                    fallback
                }
            };
            names.push((id, name));
        }
        let name_of = |id: GearId| -> String {
            names
                .iter()
                .find(|(g, _)| *g == id)
                .map(|(_, n)| n.clone())
                .unwrap_or_default()
        };

        let gears = self
            .store
            .iter()
            .map(|(id, gear)| {
                let p = gear.position();
                GearDef {
                    name: name_of(id),
                    kind: gear.kind(),
                    teeth: gear.teeth(),
                    radius: Some(gear.radius()),
                    length: gear.length(),
                    speed: Some(gear.speed()),
                    direction: gear.direction().into(),
                    driver: gear.is_driver(),
                    position: Some(Vec3::new(p.x, p.y, p.z)),
                }
            })
            .collect();

        let mut written = HashSet::new();
        let mut connections = Vec::new();
        for &id in self.store.ids() {
            for edge in self.graph.connections_of(id).into_iter().flatten() {
                if written.insert(edge.id) {
                    connections.push(ConnectionDef::new(name_of(id), name_of(edge.neighbor)));
                }
            }
        }

        Scene {
            gears,
            connections,
            ..Scene::default()
        }
    }

    fn resolve(&self, name: &str) -> Result<GearId> {
        self.store
            .find_by_name(name)
            .ok_or_else(|| GearError::UnknownName(name.to_owned()))
    }

    /// Add a gear and return its id.
    pub fn add_gear(&mut self, kind: GearKind, params: GearParams) -> Result<GearId> {
        if let Some(name) = &params.name {
            if self.store.find_by_name(name).is_some() {
                return Err(GearError::DuplicateName(name.clone()));
            }
        }
        let gear = Gear::new(kind, params)?;
        let id = self.store.insert(gear);
        self.graph.add_node(id);
        info!("added {kind} gear {id:?}");
        Ok(id)
    }

    /// Remove a gear after severing all of its connections.
    pub fn remove_gear(&mut self, id: GearId) -> Result<RemovedGear> {
        self.store.get(id)?;
        let connections = self.graph.remove_node(id);
        let gear = self.store.remove(id)?;
        info!(
            "removed gear {id:?} and {} connection(s)",
            connections.len()
        );
        Ok(RemovedGear { gear, connections })
    }

    /// Connect two gears. See [`ConnectionGraph`] for the failure cases.
    pub fn connect(&mut self, a: GearId, b: GearId) -> Result<ConnectionId> {
        self.graph.connect(&self.store, a, b)
    }

    /// Remove the connection between two gears.
    pub fn disconnect(&mut self, a: GearId, b: GearId) -> Result<ConnectionId> {
        self.store.get(a)?;
        self.store.get(b)?;
        self.graph.disconnect(a, b)
    }

    /// Mark or unmark a gear as a driver.
    pub fn set_driver(&mut self, id: GearId, driver: bool) -> Result<()> {
        self.store.get_mut(id)?.set_driver(driver);
        Ok(())
    }

    /// Set the commanded speed magnitude.
    pub fn set_speed(&mut self, id: GearId, speed: f64) -> Result<()> {
        self.store.get_mut(id)?.set_speed(speed)
    }

    /// Set the rotation sense.
    pub fn set_direction(&mut self, id: GearId, direction: Direction) -> Result<()> {
        self.store.get_mut(id)?.set_direction(direction);
        Ok(())
    }

    /// Set the tooth count of a Spur/Bevel gear and refresh its edge ratios.
    pub fn set_teeth(&mut self, id: GearId, teeth: u32) -> Result<()> {
        self.store.get_mut(id)?.set_teeth(teeth)?;
        self.graph.recompute_ratios(&self.store, id)
    }

    /// Set the pitch radius.
    pub fn set_radius(&mut self, id: GearId, radius: f64) -> Result<()> {
        self.store.get_mut(id)?.set_radius(radius)
    }

    /// Set the length of a Worm gear.
    pub fn set_length(&mut self, id: GearId, length: f64) -> Result<()> {
        self.store.get_mut(id)?.set_length(length)
    }

    /// Move a gear.
    pub fn set_position(&mut self, id: GearId, position: Vector3<f64>) -> Result<()> {
        self.store.get_mut(id)?.set_position(position)
    }

    /// Change or clear a gear's display name.
    pub fn rename(&mut self, id: GearId, name: Option<String>) -> Result<()> {
        self.store.get(id)?;
        if let Some(name) = &name {
            if matches!(self.store.find_by_name(name), Some(other) if other != id) {
                return Err(GearError::DuplicateName(name.clone()));
            }
        }
        self.store.get_mut(id)?.set_name(name);
        Ok(())
    }

    /// Overwrite a gear's angular velocity, e.g. from a physics read-back.
    pub fn set_angular_velocity(&mut self, id: GearId, angular_velocity: Vector3<f64>) -> Result<()> {
        self.store.get_mut(id)?.set_angular_velocity(angular_velocity);
        Ok(())
    }

    /// Look up a gear.
    pub fn gear(&self, id: GearId) -> Result<&Gear> {
        self.store.get(id)
    }

    pub(crate) fn gear_mut(&mut self, id: GearId) -> Result<&mut Gear> {
        self.store.get_mut(id)
    }

    /// Find a gear by display name.
    pub fn id_by_name(&self, name: &str) -> Option<GearId> {
        self.store.find_by_name(name)
    }

    /// Gears in creation order.
    pub fn gears(&self) -> impl Iterator<Item = (GearId, &Gear)> + '_ {
        self.store.iter()
    }

    /// Gear ids in creation order.
    pub fn ids(&self) -> &[GearId] {
        self.store.ids()
    }

    /// Ids of every driver gear, in creation order.
    pub fn drivers(&self) -> Vec<GearId> {
        self.store
            .iter()
            .filter(|(_, g)| g.is_driver())
            .map(|(id, _)| id)
            .collect()
    }

    /// The current edges of a gear, in insertion order.
    pub fn connections_of(&self, id: GearId) -> Result<Connections<'_>> {
        self.graph.connections_of(id)
    }

    /// The gear store.
    pub fn store(&self) -> &GearStore {
        &self.store
    }

    /// The connection graph.
    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    /// Number of gears.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the train holds no gears.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

pub(crate) fn params_from_def(def: &GearDef) -> Result<GearParams> {
    Ok(GearParams {
        name: Some(def.name.clone()),
        teeth: def.teeth,
        radius: def.radius,
        length: def.length,
        speed: def.speed.unwrap_or(crate::gear::DEFAULT_SPEED),
        direction: Direction::try_from(def.direction)?,
        driver: def.driver,
        position: def.position.map(|p| Vector3::new(p.x, p.y, p.z)),
    })
}
