//! # Entity — Geometry, Components and the Tree Protocol
//!
//! An [`Entity`] is a [`Node`] (identity, geometry, tree and visual state)
//! plus an ordered [`ComponentList`]. Entities are components themselves, so
//! attaching one entity to another builds the scene tree:
//!
//! ```text
//!   Entity "hud"                       parent: None (root)
//!   ├── Fill                           drawn 1st, post_draw 3rd
//!   ├── Entity "score"                 drawn 2nd, post_draw 2nd
//!   │   └── Sprite
//!   └── Modal                          drawn 3rd, post_draw 1st
//! ```
//!
//! The parent link is a plain [`EntityId`]: ownership flows strictly from the
//! parent's list to the child.
//!
//! ## Passes
//!
//! `update`, `draw`/`post_draw`, `start` and `collided` all walk the list the
//! same way: the slot count is captured when the pass begins, each component
//! is moved out of its slot for the hook call (so the hook can take
//! `&mut Node` of the owner) and moved back afterwards.
//!
//! ## Structural Changes During a Pass
//!
//! Hooks cannot touch the list they are being called from. They queue requests
//! with [`Node::defer_attach`] and [`Node::defer_remove`], which the owner
//! applies as soon as the requesting hook returns:
//!
//! - a removal tombstones the slot immediately; the removed component is never
//!   visited again, not even later in the same pass;
//! - an attachment is appended after the bound captured at the start of the
//!   pass, so it is first visited on the next pass (its `init`, `attached`
//!   and, on a live owner, `start` run right away).
//!
//! A draw pass is the one exception: every component that got `draw` also
//! gets `post_draw`, so a removal aimed at a slot that has drawn but not yet
//! run `post_draw` is held. The slot stays in place for its `post_draw`, and
//! is destroyed and tombstoned once the reverse pass is over. A slot that has
//! not drawn yet is still removed at once and gets neither hook.
//!
//! Tombstoned slots are compacted out at the end of `update` and `draw`.
//!
//! ## Bounding Box
//!
//! Without an explicit box the bounds are derived from geometry:
//!
//! ```text
//!   corner_a = position - origin * scale
//!   corner_b = corner_a + dimension * scale      (min/max swapped per axis
//!                                                 when scale is negative)
//! ```
//!
//! An explicit box is relative to the position: its x, y, width and height are
//! scaled by `abs(scale)` and translated by `position`. Bounds are recomputed
//! on every call unless `static_bounds` is set.

use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::collision::CollisionEvent;
use crate::component::{Component, ComponentKey, ComponentList, FrameData, Rejected};
use crate::math::{Affine2, Rect, Size, Vec2};
use crate::render::Renderer;
use crate::transform;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique entity id, assigned at construction, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Construction parameters for an entity. Every field has a default, so it
/// deserializes from partial JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub name: Option<String>,
    pub families: Vec<String>,
    pub position: Vec2,
    pub origin: Vec2,
    pub dimension: Size,
    pub scale: Vec2,
    pub rotation: f32,
    /// Explicit bounding box relative to the position.
    pub bounds: Option<Rect>,
    pub alpha: f32,
    pub visible: bool,
    pub update_when_paused: u32,
    pub static_bounds: bool,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            name: None,
            families: Vec::new(),
            position: Vec2::ZERO,
            origin: Vec2::ZERO,
            dimension: Size::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            bounds: None,
            alpha: 1.0,
            visible: true,
            update_when_paused: 0,
            static_bounds: false,
        }
    }
}

pub(crate) enum Deferred {
    Attach {
        key: ComponentKey,
        component: Box<dyn Component>,
    },
    Remove(ComponentKey),
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Attach { key, .. } => write!(f, "Attach({key:?})"),
            Deferred::Remove(key) => write!(f, "Remove({key:?})"),
        }
    }
}

/// Everything an entity is except its component list. Component hooks
/// receive their owner's `Node`.
#[derive(Debug)]
pub struct Node {
    id: EntityId,
    pub name: Option<String>,
    pub families: Vec<String>,

    pub position: Vec2,
    /// Anchor point in local content units; lands at `position`.
    pub origin: Vec2,
    pub dimension: Size,
    /// May be negative to mirror.
    pub scale: Vec2,
    /// Radians.
    pub rotation: f32,
    /// Explicit bounding box, relative to the position.
    pub bounds: Option<Rect>,

    pub alpha: f32,
    pub visible: bool,
    /// Highest pause level at which this entity still updates.
    pub update_when_paused: u32,
    /// Cache the bounding box until [`Node::invalidate_bounds`].
    pub static_bounds: bool,

    parent: Option<EntityId>,
    /// Live in the scheduler.
    added: bool,
    /// `start` has run.
    live: bool,
    timer: f32,
    pub(crate) parent_world: Affine2,
    cached_bounds: Cell<Option<Rect>>,

    next_key: u64,
    pub(crate) deferred: Vec<Deferred>,
}

impl Node {
    pub fn new(config: EntityConfig) -> Self {
        Self {
            id: EntityId::next(),
            name: config.name,
            families: config.families,
            position: config.position,
            origin: config.origin,
            dimension: config.dimension,
            scale: config.scale,
            rotation: config.rotation,
            bounds: config.bounds,
            alpha: config.alpha,
            visible: config.visible,
            update_when_paused: config.update_when_paused,
            static_bounds: config.static_bounds,
            parent: None,
            added: false,
            live: false,
            timer: 0.0,
            parent_world: Affine2::IDENTITY,
            cached_bounds: Cell::new(None),
            next_key: 0,
            deferred: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Accumulated `speed` over every update pass.
    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn in_family(&self, family: &str) -> bool {
        self.families.iter().any(|f| f == family)
    }

    pub fn bounding_box(&self) -> Rect {
        if self.static_bounds {
            if let Some(cached) = self.cached_bounds.get() {
                return cached;
            }
        }
        let bounds = match self.bounds {
            None => {
                let a = self.position - self.origin * self.scale;
                let b = a + self.dimension.as_vec2() * self.scale;
                Rect::from_corners(a, b)
            }
            Some(explicit) => {
                let s = self.scale.abs();
                Rect::new(
                    explicit.x * s.x + self.position.x,
                    explicit.y * s.y + self.position.y,
                    explicit.width * s.x,
                    explicit.height * s.y,
                )
            }
        };
        if self.static_bounds {
            self.cached_bounds.set(Some(bounds));
        }
        bounds
    }

    /// Drop the cached bounding box of a `static_bounds` entity.
    pub fn invalidate_bounds(&self) {
        self.cached_bounds.set(None);
    }

    /// `origin = relative * dimension`. Depends on the dimension, so sizing
    /// components must run first.
    pub fn set_origin_relative(&mut self, relative: Vec2) {
        self.origin = relative * self.dimension.as_vec2();
    }

    pub fn should_update(&self, pause_level: u32) -> bool {
        self.update_when_paused >= pause_level
    }

    fn next_key(&mut self) -> ComponentKey {
        let key = ComponentKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Ask the owner to attach `component` once the current hook returns.
    /// Refused (and logged) like [`Entity::attach`].
    pub fn defer_attach<C: Component>(
        &mut self,
        component: C,
        force: bool,
    ) -> Result<ComponentKey, Rejected<C>> {
        if !force && refuses(&component) {
            log::warn!(
                "Entity {}: cannot attach a child that already has a parent or is live; use force",
                self.id
            );
            return Err(Rejected(component));
        }
        let key = self.next_key();
        self.deferred.push(Deferred::Attach {
            key,
            component: Box::new(component),
        });
        Ok(key)
    }

    /// Ask the owner to remove `key` once the current hook returns.
    pub fn defer_remove(&mut self, key: ComponentKey) {
        self.deferred.push(Deferred::Remove(key));
    }
}

fn refuses(component: &dyn Component) -> bool {
    component
        .as_entity()
        .is_some_and(|e| e.node.parent.is_some() || e.node.added)
}

/// A node of the scene tree.
pub struct Entity {
    node: Node,
    components: ComponentList,
}

impl Deref for Entity {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl DerefMut for Entity {
    fn deref_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.node.id)
            .field("name", &self.node.name)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(EntityConfig::default())
    }
}

impl Entity {
    pub fn new(config: EntityConfig) -> Self {
        Self {
            node: Node::new(config),
            components: ComponentList::default(),
        }
    }

    /// Attach at construction. A refused component is logged and dropped; use
    /// [`attach`](Self::attach) to get it back.
    pub fn with<C: Component>(mut self, component: C) -> Self {
        let _ = self.attach(component, false);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.components.keys()
    }

    pub fn find(&self, name: &str) -> Option<ComponentKey> {
        self.components.find(name)
    }

    pub fn component(&self, key: ComponentKey) -> Option<&dyn Component> {
        self.components.get(key)
    }

    pub fn component_mut(&mut self, key: ComponentKey) -> Option<&mut dyn Component> {
        self.components.get_mut(key)
    }

    pub fn child_entity(&self, key: ComponentKey) -> Option<&Entity> {
        self.components.get(key)?.as_entity()
    }

    pub fn child_entity_mut(&mut self, key: ComponentKey) -> Option<&mut Entity> {
        self.components.get_mut(key)?.as_entity_mut()
    }

    pub(crate) fn set_added(&mut self, added: bool) {
        self.node.added = added;
    }

    /// Attach `child` at the end of the list.
    ///
    /// An entity that already has a parent, or is live in the scheduler, is
    /// refused unless `force` is set: the refusal is logged and the child is
    /// handed back untouched.
    pub fn attach<C: Component>(
        &mut self,
        child: C,
        force: bool,
    ) -> Result<ComponentKey, Rejected<C>> {
        if !force && refuses(&child) {
            log::warn!(
                "Entity {}: cannot attach a child that already has a parent or is live; use force",
                self.node.id
            );
            return Err(Rejected(child));
        }
        let key = self.node.next_key();
        self.insert(key, Box::new(child));
        self.apply_deferred();
        Ok(key)
    }

    fn insert(&mut self, key: ComponentKey, mut child: Box<dyn Component>) {
        let world = self.node.world_matrix();
        if let Some(entity) = child.as_entity_mut() {
            entity.node.parent = Some(self.node.id);
            entity.node.parent_world = world;
        }
        child.init(&mut self.node);
        child.attached(&mut self.node);
        if self.node.added || self.node.live {
            child.start(&mut self.node);
        }
        self.components.push(key, child);
    }

    /// Destroy and drop the component under `key`. Absent keys are ignored.
    pub fn remove(&mut self, key: ComponentKey) -> &mut Self {
        let Some(index) = self.components.position(key) else {
            return self;
        };
        if let Some(mut child) = self.components.take(index) {
            child.destroy(&mut self.node);
            if let Some(entity) = child.as_entity_mut() {
                entity.node.parent = None;
            }
        }
        self.components.tombstone(index);
        self.apply_deferred();
        self
    }

    /// Detach the component under `key` without destroying it. A child entity
    /// keeps its parent link, so re-attaching it elsewhere needs `force`.
    pub fn take(&mut self, key: ComponentKey) -> Option<Box<dyn Component>> {
        let index = self.components.position(key)?;
        let child = self.components.take(index);
        self.components.tombstone(index);
        child
    }

    fn apply_deferred(&mut self) {
        self.apply_deferred_holding(&mut Vec::new(), |_| false);
    }

    /// Apply deferred requests, except removals of slots for which `hold`
    /// is true: their keys go to `held` instead.
    fn apply_deferred_holding(
        &mut self,
        held: &mut Vec<ComponentKey>,
        hold: impl Fn(usize) -> bool,
    ) {
        while !self.node.deferred.is_empty() {
            for op in std::mem::take(&mut self.node.deferred) {
                match op {
                    Deferred::Attach { key, component } => self.insert(key, component),
                    Deferred::Remove(key) => match self.components.position(key) {
                        Some(index) if hold(index) => {
                            if !held.contains(&key) {
                                held.push(key);
                            }
                        }
                        _ => {
                            self.remove(key);
                        }
                    },
                }
            }
        }
    }

    /// Run `hook` on each slot below the bound captured now, applying
    /// deferred structural requests after every call.
    fn each_component(
        &mut self,
        indices: impl Iterator<Item = usize>,
        hook: impl FnMut(&mut dyn Component, &mut Node),
    ) {
        self.each_component_holding(indices, &mut Vec::new(), |_, _| false, hook);
    }

    /// [`each_component`](Self::each_component), but a removal of slot
    /// `target` requested while visiting `current` is held in `held` when
    /// `hold(current, target)` is true.
    fn each_component_holding(
        &mut self,
        indices: impl Iterator<Item = usize>,
        held: &mut Vec<ComponentKey>,
        hold: impl Fn(usize, usize) -> bool,
        mut hook: impl FnMut(&mut dyn Component, &mut Node),
    ) {
        for index in indices {
            let Some(mut component) = self.components.take(index) else {
                continue;
            };
            if let Some(entity) = component.as_entity_mut() {
                entity.node.parent_world = self.node.world_matrix();
            }
            hook(component.as_mut(), &mut self.node);
            self.components.put_back(index, component);
            self.apply_deferred_holding(held, |target| hold(index, target));
        }
    }

    /// Mark live and start every component. Runs once.
    pub fn start(&mut self) {
        if self.node.live {
            return;
        }
        self.node.live = true;
        let bound = self.components.slot_count();
        self.each_component(0..bound, |c, owner| c.start(owner));
    }

    pub fn update(&mut self, data: &mut FrameData<'_>) {
        let id = self.node.id;
        let bound = self.components.slot_count();
        self.each_component(0..bound, |c, owner| {
            data.entity = Some(id);
            c.update(owner, data);
        });
        self.node.timer += data.speed;
        self.components.compact();
    }

    /// Draw inside this entity's transform: `draw` forward, then `post_draw`
    /// over the same slots in reverse. Invisible entities draw nothing.
    ///
    /// Removals of slots that have drawn wait until their `post_draw` has run.
    pub fn draw(&mut self, renderer: &mut dyn Renderer, data: &mut FrameData<'_>) {
        if !self.node.visible {
            return;
        }
        let id = self.node.id;
        let bound = self.components.slot_count();
        let mut held = Vec::new();
        transform::push(&self.node, renderer);
        self.each_component_holding(
            0..bound,
            &mut held,
            |current, target| target <= current,
            |c, owner| {
                data.entity = Some(id);
                c.draw(owner, renderer, data);
            },
        );
        self.each_component_holding(
            (0..bound).rev(),
            &mut held,
            |current, target| target < current,
            |c, owner| {
                data.entity = Some(id);
                c.post_draw(owner, renderer, data);
            },
        );
        transform::pop(renderer);
        for key in held {
            self.remove(key);
        }
        self.components.compact();
    }

    /// Destroy every component, child entities included.
    pub fn destroy(&mut self) {
        let bound = self.components.slot_count();
        self.each_component(0..bound, |c, owner| c.destroy(owner));
        self.node.live = false;
    }

    /// Tell every component its owner collided.
    pub fn collided(&mut self, event: &CollisionEvent) {
        let bound = self.components.slot_count();
        self.each_component(0..bound, |c, owner| c.on_parent_collided(owner, event));
    }

    /// Push this entity's world matrix down to every descendant.
    pub fn propagate_transforms(&mut self) {
        let world = self.node.world_matrix();
        for index in 0..self.components.slot_count() {
            let Some(mut component) = self.components.take(index) else {
                continue;
            };
            if let Some(entity) = component.as_entity_mut() {
                entity.node.parent_world = world;
                entity.propagate_transforms();
            }
            self.components.put_back(index, component);
        }
    }
}

impl Component for Entity {
    fn name(&self) -> Option<&str> {
        self.node.name.as_deref()
    }

    fn attached(&mut self, _owner: &mut Node) {
        let bound = self.components.slot_count();
        self.each_component(0..bound, |c, owner| c.on_parent_attached(owner));
    }

    fn start(&mut self, _owner: &mut Node) {
        Entity::start(self);
    }

    fn update(&mut self, _owner: &mut Node, data: &mut FrameData<'_>) {
        Entity::update(self, data);
    }

    fn draw(&mut self, _owner: &mut Node, renderer: &mut dyn Renderer, data: &mut FrameData<'_>) {
        Entity::draw(self, renderer, data);
    }

    fn destroy(&mut self, _owner: &mut Node) {
        Entity::destroy(self);
    }

    fn as_entity(&self) -> Option<&Entity> {
        Some(self)
    }

    fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        Some(self)
    }
}
