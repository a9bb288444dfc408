//! Gear entity store.

use slotmap::{new_key_type, SlotMap};

use crate::error::{GearError, Missing, Result};
use crate::gear::Gear;

new_key_type! {
    /// Stable identity of a gear. Stale ids are never reused for another gear.
    pub struct GearId;
}

/// Owns every gear, keyed by [`GearId`], and remembers creation order.
#[derive(Debug, Clone, Default)]
pub struct GearStore {
    gears: SlotMap<GearId, Gear>,
    order: Vec<GearId>,
}

impl GearStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, gear: Gear) -> GearId {
        let id = self.gears.insert(gear);
        self.order.push(id);
        id
    }

    pub(crate) fn remove(&mut self, id: GearId) -> Result<Gear> {
        let gear = self
            .gears
            .remove(id)
            .ok_or(GearError::NotFound(Missing::Gear(id)))?;
        self.order.retain(|&g| g != id);
        Ok(gear)
    }

    /// Look up a gear.
    pub fn get(&self, id: GearId) -> Result<&Gear> {
        self.gears.get(id).ok_or(GearError::NotFound(Missing::Gear(id)))
    }

    pub(crate) fn get_mut(&mut self, id: GearId) -> Result<&mut Gear> {
        self.gears
            .get_mut(id)
            .ok_or(GearError::NotFound(Missing::Gear(id)))
    }

    /// Whether `id` names a live gear.
    pub fn contains(&self, id: GearId) -> bool {
        self.gears.contains_key(id)
    }

    /// Gear ids in creation order.
    pub fn ids(&self) -> &[GearId] {
        &self.order
    }

    /// Gears in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (GearId, &Gear)> + '_ {
        self.order.iter().map(move |&id| (id, &self.gears[id]))
    }

    /// Find a gear by display name.
    pub fn find_by_name(&self, name: &str) -> Option<GearId> {
        self.iter()
            .find(|(_, g)| g.name() == Some(name))
            .map(|(id, _)| id)
    }

    /// Number of gears.
    pub fn len(&self) -> usize {
        self.gears.len()
    }

    /// Whether the store holds no gears.
    pub fn is_empty(&self) -> bool {
        self.gears.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::GearParams;
    use gearsim_ir::GearKind;

    fn spur(name: &str) -> Gear {
        Gear::new(GearKind::Spur, GearParams::default().named(name)).unwrap()
    }

    #[test]
    fn keeps_creation_order_across_removal() {
        let mut store = GearStore::new();
        let a = store.insert(spur("a"));
        let b = store.insert(spur("b"));
        let c = store.insert(spur("c"));

        store.remove(b).unwrap();
        let d = store.insert(spur("d"));

        assert_eq!(store.ids(), &[a, c, d]);
        assert_eq!(store.find_by_name("d"), Some(d));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn stale_id_is_not_found() {
        let mut store = GearStore::new();
        let a = store.insert(spur("a"));
        store.remove(a).unwrap();
        let b = store.insert(spur("b"));

        assert_ne!(a, b);
        assert!(!store.contains(a));
        assert_eq!(
            store.get(a).unwrap_err(),
            GearError::NotFound(Missing::Gear(a))
        );
        assert!(store.remove(a).is_err());
    }
}
