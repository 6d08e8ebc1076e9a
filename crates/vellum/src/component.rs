//! # Component — The Hook Protocol
//!
//! A component is any value that implements [`Component`]. Every hook is
//! optional: the trait supplies a no-op default for each, and a component only
//! overrides the ones it cares about. An [`Entity`] is itself a component,
//! which is how the scene tree is built: an entity's component list owns its
//! child entities.
//!
//! ```text
//!   attach ──► init ──► attached ──► (start, if the owner is live)
//!                                        │
//!   every frame:  update ─► draw ─► post_draw (reverse order)
//!                                        │
//!   remove ──► destroy ──────────────────┘
//! ```
//!
//! Hooks receive the owning entity's [`Node`] (geometry, flags, deferred
//! structural requests) rather than the whole entity, because the component
//! itself is taken out of the owner's list for the duration of the call.
//!
//! ## Slots and Tombstones
//!
//! [`ComponentList`] keeps components in attachment order. Removing one marks
//! its slot removed instead of shifting the list, so indices captured at the
//! start of a pass stay valid; removed slots are compacted out only at the end
//! of an update or draw pass.

use std::fmt;

use crate::collision::{CollisionEvent, Registry};
use crate::entity::{Entity, EntityId, Node};
use crate::render::Renderer;

/// Per-frame data handed to `update`, `draw` and `post_draw`.
///
/// The owning entity stamps `entity` before every hook call, so the value seen
/// by a hook is always its own owner; it changes across a traversal.
pub struct FrameData<'a> {
    /// Time step for this frame, in frames (1.0 at the nominal rate).
    pub speed: f32,
    /// Frames stepped so far by the scheduler.
    pub frame: u64,
    pub entity: Option<EntityId>,
    /// Name/family lookup for collision queries, if the scheduler offers one.
    pub registry: Option<&'a dyn Registry>,
}

impl<'a> FrameData<'a> {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            frame: 0,
            entity: None,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a dyn Registry) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl fmt::Debug for FrameData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameData")
            .field("speed", &self.speed)
            .field("frame", &self.frame)
            .field("entity", &self.entity)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

/// A behaviour unit attached to an entity.
#[allow(unused_variables)]
pub trait Component: 'static {
    /// Name used by [`Entity::find`].
    fn name(&self) -> Option<&str> {
        None
    }

    /// Called once when attached, before `attached`.
    fn init(&mut self, owner: &mut Node) {}

    fn attached(&mut self, owner: &mut Node) {}

    /// Called exactly once, when the owner (or an ancestor) becomes live.
    fn start(&mut self, owner: &mut Node) {}

    fn update(&mut self, owner: &mut Node, data: &mut FrameData<'_>) {}

    /// Called in attachment order, inside the owner's transform.
    fn draw(&mut self, owner: &mut Node, renderer: &mut dyn Renderer, data: &mut FrameData<'_>) {}

    /// Called in reverse attachment order after every `draw`.
    fn post_draw(
        &mut self,
        owner: &mut Node,
        renderer: &mut dyn Renderer,
        data: &mut FrameData<'_>,
    ) {
    }

    fn destroy(&mut self, owner: &mut Node) {}

    /// The owner was attached into another entity.
    fn on_parent_attached(&mut self, owner: &mut Node) {}

    /// The owner was told it collided with something.
    fn on_parent_collided(&mut self, owner: &mut Node, event: &CollisionEvent) {}

    fn as_entity(&self) -> Option<&Entity> {
        None
    }

    fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        None
    }
}

/// Stable key of a component within its owner. Keys are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(pub(crate) u64);

/// A component handed back by a refused `attach`.
pub struct Rejected<C>(pub C);

impl<C> Rejected<C> {
    pub fn into_inner(self) -> C {
        self.0
    }
}

impl<C> fmt::Debug for Rejected<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rejected(..)")
    }
}

impl<C> fmt::Display for Rejected<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("refused: already has a parent or is live")
    }
}

impl<C> std::error::Error for Rejected<C> {}

struct Slot {
    key: ComponentKey,
    /// `None` while the component is out for a hook call, or once removed.
    component: Option<Box<dyn Component>>,
    removed: bool,
}

/// Ordered component slots with tombstones.
#[derive(Default)]
pub struct ComponentList {
    slots: Vec<Slot>,
}

impl ComponentList {
    /// Number of slots, removed ones included. Passes iterate `0..slot_count()`
    /// as captured at their start.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of components not removed.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.removed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(&mut self, key: ComponentKey, component: Box<dyn Component>) {
        self.slots.push(Slot {
            key,
            component: Some(component),
            removed: false,
        });
    }

    /// Move the component at `index` out for a hook call.
    pub(crate) fn take(&mut self, index: usize) -> Option<Box<dyn Component>> {
        let slot = self.slots.get_mut(index)?;
        if slot.removed {
            return None;
        }
        slot.component.take()
    }

    pub(crate) fn put_back(&mut self, index: usize, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.get_mut(index) {
            if !slot.removed {
                slot.component = Some(component);
            }
        }
    }

    /// Index of the live slot holding `key`.
    pub(crate) fn position(&self, key: ComponentKey) -> Option<usize> {
        self.slots.iter().position(|s| s.key == key && !s.removed)
    }

    pub(crate) fn tombstone(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.removed = true;
            slot.component = None;
        }
    }

    pub(crate) fn compact(&mut self) {
        self.slots.retain(|s| !s.removed);
    }

    pub fn keys(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.slots.iter().filter(|s| !s.removed).map(|s| s.key)
    }

    pub fn get(&self, key: ComponentKey) -> Option<&dyn Component> {
        let index = self.position(key)?;
        self.slots[index].component.as_deref()
    }

    pub fn get_mut(&mut self, key: ComponentKey) -> Option<&mut dyn Component> {
        let index = self.position(key)?;
        match &mut self.slots[index].component {
            Some(c) => Some(c.as_mut()),
            None => None,
        }
    }

    /// First live component whose `name()` is `name`.
    pub fn find(&self, name: &str) -> Option<ComponentKey> {
        self.slots
            .iter()
            .filter(|s| !s.removed)
            .find(|s| s.component.as_ref().and_then(|c| c.name()) == Some(name))
            .map(|s| s.key)
    }
}

impl fmt::Debug for ComponentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().filter(|s| !s.removed).map(|s| {
                (s.key, s.component.as_ref().and_then(|c| c.name()).unwrap_or("?"))
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Component for Named {
        fn name(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    fn list(names: &[&'static str]) -> ComponentList {
        let mut list = ComponentList::default();
        for (i, name) in names.iter().enumerate() {
            list.push(ComponentKey(i as u64), Box::new(Named(name)));
        }
        list
    }

    #[test]
    fn tombstones_keep_indices_until_compaction() {
        let mut list = list(&["a", "b", "c"]);
        list.tombstone(1);
        assert_eq!(list.len(), 2);
        assert_eq!(list.slot_count(), 3);
        assert!(list.take(1).is_none());
        assert_eq!(list.position(ComponentKey(2)), Some(2));

        list.compact();
        assert_eq!(list.slot_count(), 2);
        assert_eq!(list.position(ComponentKey(2)), Some(1));
        assert_eq!(list.keys().collect::<Vec<_>>(), vec![ComponentKey(0), ComponentKey(2)]);
    }

    #[test]
    fn find_skips_removed_slots() {
        let mut list = list(&["x", "y", "x"]);
        assert_eq!(list.find("x"), Some(ComponentKey(0)));
        list.tombstone(0);
        assert_eq!(list.find("x"), Some(ComponentKey(2)));
        assert_eq!(list.find("z"), None);
    }

    #[test]
    fn put_back_into_removed_slot_drops_the_component() {
        let mut list = list(&["a"]);
        let taken = list.take(0).unwrap();
        list.tombstone(0);
        list.put_back(0, taken);
        assert!(list.get(ComponentKey(0)).is_none());
        assert!(list.is_empty());
    }
}
