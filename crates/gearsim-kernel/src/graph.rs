//! Connection graph between gears.
//!
//! Every connection is stored as a pair of mirrored half-edges, one in each
//! endpoint's adjacency list. Every mutation here validates first and then
//! writes both halves, so a failing call never leaves a one-sided edge.

use gearsim_ir::GearKind;
use log::debug;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::error::{GearError, Missing, Result};
use crate::gear::Gear;
use crate::store::{GearId, GearStore};

new_key_type! {
    /// Identity of a connection, shared by both of its half-edges.
    pub struct ConnectionId;
}

/// How the rotation axes of two meshing gears relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    /// Both gears rotate about their face axes (Spur/Bevel pairs).
    SameAxis,
    /// One side is a Worm: its length axis pairs with the other's face axis.
    CrossAxis,
}

impl Coupling {
    /// Coupling mode implied by the two endpoint kinds.
    pub fn between(a: GearKind, b: GearKind) -> Self {
        if a == GearKind::Worm || b == GearKind::Worm {
            Coupling::CrossAxis
        } else {
            Coupling::SameAxis
        }
    }
}

/// Transmission ratio from `from` to `to`: `teeth(from) / teeth(to)` when
/// both are toothed, otherwise 1.
pub fn mesh_ratio(from: &Gear, to: &Gear) -> f64 {
    match (from.teeth(), to.teeth()) {
        (Some(a), Some(b)) => f64::from(a) / f64::from(b),
        _ => 1.0,
    }
}

/// One side of a connection, stored on the gear it starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfEdge {
    /// Connection identity, equal on both halves.
    pub id: ConnectionId,
    /// The gear at the other end.
    pub neighbor: GearId,
    /// `teeth(self) / teeth(neighbor)`, or 1 if either side is untoothed.
    pub ratio: f64,
    /// Axis coupling mode.
    pub coupling: Coupling,
}

/// A gear's current edges in insertion order.
///
/// Cloning the iterator restarts the enumeration from the clone point.
#[derive(Debug, Clone)]
pub struct Connections<'a> {
    inner: std::slice::Iter<'a, HalfEdge>,
}

impl<'a> Iterator for Connections<'a> {
    type Item = &'a HalfEdge;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Connections<'_> {}

/// Undirected adjacency between gears, stored as mirrored half-edges.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    adjacency: SecondaryMap<GearId, Vec<HalfEdge>>,
    endpoints: SlotMap<ConnectionId, (GearId, GearId)>,
}

impl ConnectionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, id: GearId) {
        self.adjacency.insert(id, Vec::new());
    }

    /// Sever every connection touching `id` and forget the node.
    ///
    /// Returns the removed connection ids in the node's insertion order.
    pub(crate) fn remove_node(&mut self, id: GearId) -> Vec<ConnectionId> {
        let edges = self.adjacency.remove(id).unwrap_or_default();
        let mut removed = Vec::with_capacity(edges.len());
        for edge in edges {
            let mirror = self
                .adjacency
                .get_mut(edge.neighbor)
                .unwrap_or_else(|| panic!("dangling neighbour {:?} of {:?}", edge.neighbor, id));
            let before = mirror.len();
            mirror.retain(|e| e.id != edge.id);
            assert_eq!(before, mirror.len() + 1, "one-sided connection {:?}", edge.id);
            self.endpoints.remove(edge.id);
            debug!("removed connection {:?} ({:?} <-> {:?})", edge.id, id, edge.neighbor);
            removed.push(edge.id);
        }
        removed
    }

    /// Connect two distinct gears, inserting both half-edges or neither.
    pub(crate) fn connect(&mut self, store: &GearStore, a: GearId, b: GearId) -> Result<ConnectionId> {
        if a == b {
            return Err(GearError::SelfConnection(a));
        }
        let gear_a = store.get(a)?;
        let gear_b = store.get(b)?;
        debug_assert!(self.adjacency.contains_key(a) && self.adjacency.contains_key(b));
        if self.edge(a, b).is_some() {
            return Err(GearError::DuplicateConnection(a, b));
        }

        let coupling = Coupling::between(gear_a.kind(), gear_b.kind());
        let forward = mesh_ratio(gear_a, gear_b);
        let backward = mesh_ratio(gear_b, gear_a);

        let id = self.endpoints.insert((a, b));
        self.adjacency[a].push(HalfEdge {
            id,
            neighbor: b,
            ratio: forward,
            coupling,
        });
        self.adjacency[b].push(HalfEdge {
            id,
            neighbor: a,
            ratio: backward,
            coupling,
        });
        debug!("connected {a:?} <-> {b:?} as {id:?} (ratio {forward}, {coupling:?})");
        Ok(id)
    }

    /// Remove the edge between `a` and `b` from both endpoints.
    pub(crate) fn disconnect(&mut self, a: GearId, b: GearId) -> Result<ConnectionId> {
        let index_a = self
            .adjacency
            .get(a)
            .and_then(|edges| edges.iter().position(|e| e.neighbor == b))
            .ok_or(GearError::NotFound(Missing::Edge(a, b)))?;
        let index_b = self
            .adjacency
            .get(b)
            .and_then(|edges| edges.iter().position(|e| e.neighbor == a))
            .unwrap_or_else(|| panic!("one-sided connection {a:?} -> {b:?}"));

        let id = self.adjacency[a].remove(index_a).id;
        let mirror = self.adjacency[b].remove(index_b).id;
        assert_eq!(id, mirror, "mirrored half-edges disagree on identity");
        self.endpoints.remove(id);
        debug!("disconnected {a:?} <-> {b:?} ({id:?})");
        Ok(id)
    }

    /// Re-derive ratio and coupling on every edge incident to `id`, keeping
    /// connection identities and order.
    pub(crate) fn recompute_ratios(&mut self, store: &GearStore, id: GearId) -> Result<()> {
        let gear = store.get(id)?;
        let edges = self
            .adjacency
            .get_mut(id)
            .ok_or(GearError::NotFound(Missing::Gear(id)))?;

        let mut mirrored = Vec::with_capacity(edges.len());
        for edge in edges.iter_mut() {
            let neighbor = store.get(edge.neighbor)?;
            edge.ratio = mesh_ratio(gear, neighbor);
            edge.coupling = Coupling::between(gear.kind(), neighbor.kind());
            mirrored.push((edge.neighbor, edge.id, mesh_ratio(neighbor, gear), edge.coupling));
        }

        for (neighbor, conn, ratio, coupling) in mirrored {
            let half = self.adjacency[neighbor]
                .iter_mut()
                .find(|e| e.id == conn)
                .unwrap_or_else(|| panic!("one-sided connection {conn:?}"));
            half.ratio = ratio;
            half.coupling = coupling;
        }
        Ok(())
    }

    /// The current edges of `id`, in insertion order.
    pub fn connections_of(&self, id: GearId) -> Result<Connections<'_>> {
        let edges = self
            .adjacency
            .get(id)
            .ok_or(GearError::NotFound(Missing::Gear(id)))?;
        Ok(Connections { inner: edges.iter() })
    }

    /// The half-edge stored on `from` pointing at `to`.
    pub fn edge(&self, from: GearId, to: GearId) -> Option<&HalfEdge> {
        self.adjacency.get(from)?.iter().find(|e| e.neighbor == to)
    }

    /// Ratio stored on the half-edge `from -> to`.
    pub fn ratio(&self, from: GearId, to: GearId) -> Option<f64> {
        self.edge(from, to).map(|e| e.ratio)
    }

    /// The two gears a connection joins, in the order they were connected.
    pub fn endpoints(&self, id: ConnectionId) -> Result<(GearId, GearId)> {
        self.endpoints
            .get(id)
            .copied()
            .ok_or(GearError::NotFound(Missing::Connection(id)))
    }

    /// Number of connections (each mirrored pair counts once).
    pub fn connection_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Panic unless every half-edge has exactly one mirror with the same
    /// identity and no unordered pair is connected twice.
    pub fn assert_mirrored(&self) {
        let mut half_edges = 0;
        for (gear, edges) in &self.adjacency {
            for (i, edge) in edges.iter().enumerate() {
                half_edges += 1;
                assert!(
                    self.endpoints.contains_key(edge.id),
                    "half-edge {:?} on {gear:?} has no connection record",
                    edge.id
                );
                assert!(
                    edges[..i].iter().all(|e| e.neighbor != edge.neighbor),
                    "{gear:?} lists {:?} twice",
                    edge.neighbor
                );
                let mirrors = self
                    .adjacency
                    .get(edge.neighbor)
                    .map(|back| {
                        back.iter()
                            .filter(|e| e.id == edge.id && e.neighbor == gear)
                            .count()
                    })
                    .unwrap_or(0);
                assert_eq!(mirrors, 1, "{gear:?} -> {:?} is not mirrored", edge.neighbor);
            }
        }
        assert_eq!(half_edges, 2 * self.endpoints.len(), "orphaned connection records");
    }
}
