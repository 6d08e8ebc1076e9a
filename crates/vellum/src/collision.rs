//! # Collision — AABB Queries
//!
//! A query names a candidate set, and [`Node::collides_with`] scans it
//! linearly against the querying entity's bounding box:
//!
//! ```text
//!   candidates ─► skip own id ─► own_box.intersects(candidate_box)?
//!                                    │ yes
//!                                    ├─► on_hit(hit)
//!                                    └─► first-only: return it / all: collect
//! ```
//!
//! Candidates come from explicit entities or from a [`Registry`] lookup by name
//! or family. Intersection is half-open, so boxes that only touch do not
//! collide. There is no broad phase.
//!
//! ## Return Shape
//!
//! | mode        | empty candidate set | candidates, no hit   | hits                |
//! |-------------|---------------------|----------------------|---------------------|
//! | first-only  | `None`              | `None`               | `Some(First(hit))`  |
//! | all         | `None`              | `Some(All(vec![]))`  | `Some(All(hits))`   |

use crate::entity::{Entity, EntityId, Node};
use crate::math::{Rect, Vec2};

/// Anything with an identity and a bounding box.
pub trait Collidable {
    fn id(&self) -> EntityId;
    fn bounding_box(&self) -> Rect;
}

impl Collidable for Node {
    fn id(&self) -> EntityId {
        Node::id(self)
    }

    fn bounding_box(&self) -> Rect {
        Node::bounding_box(self)
    }
}

impl Collidable for Entity {
    fn id(&self) -> EntityId {
        self.node().id()
    }

    fn bounding_box(&self) -> Rect {
        self.node().bounding_box()
    }
}

/// A registry's view of one entity, taken when the registry was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Hitbox {
    pub id: EntityId,
    pub name: Option<String>,
    pub families: Vec<String>,
    pub bounds: Rect,
}

impl Hitbox {
    pub fn of(node: &Node) -> Self {
        Self {
            id: node.id(),
            name: node.name.clone(),
            families: node.families.clone(),
            bounds: node.bounding_box(),
        }
    }
}

impl Collidable for Hitbox {
    fn id(&self) -> EntityId {
        self.id
    }

    fn bounding_box(&self) -> Rect {
        self.bounds
    }
}

/// Name and family lookup offered by the scheduler.
pub trait Registry {
    fn by_name(&self, name: &str) -> Vec<Hitbox>;
    fn by_family(&self, family: &str) -> Vec<Hitbox>;
}

/// One candidate that intersected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub id: EntityId,
    pub bounding_box: Rect,
}

impl Hit {
    fn of(candidate: &dyn Collidable) -> Self {
        Self {
            id: candidate.id(),
            bounding_box: candidate.bounding_box(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Collision {
    First(Hit),
    All(Vec<Hit>),
}

impl Collision {
    pub fn hits(&self) -> &[Hit] {
        match self {
            Collision::First(hit) => std::slice::from_ref(hit),
            Collision::All(hits) => hits,
        }
    }
}

/// What an entity is told by [`Entity::collided`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub other: EntityId,
    pub other_bounds: Rect,
}

impl CollisionEvent {
    pub fn new(other: &dyn Collidable) -> Self {
        Self {
            other: other.id(),
            other_bounds: other.bounding_box(),
        }
    }
}

impl From<Hit> for CollisionEvent {
    fn from(hit: Hit) -> Self {
        Self {
            other: hit.id,
            other_bounds: hit.bounding_box,
        }
    }
}

enum Target<'q> {
    Entity(&'q dyn Collidable),
    Entities(&'q [&'q dyn Collidable]),
    Name(String),
    Family(String),
}

/// Builder for [`Node::collides_with`]. First-only by default.
pub struct CollisionQuery<'q> {
    target: Target<'q>,
    offset: Vec2,
    first_only: bool,
    on_hit: Option<&'q mut dyn FnMut(&Hit)>,
}

impl<'q> CollisionQuery<'q> {
    fn new(target: Target<'q>) -> Self {
        Self {
            target,
            offset: Vec2::ZERO,
            first_only: true,
            on_hit: None,
        }
    }

    pub fn entity(entity: &'q dyn Collidable) -> Self {
        Self::new(Target::Entity(entity))
    }

    pub fn entities(entities: &'q [&'q dyn Collidable]) -> Self {
        Self::new(Target::Entities(entities))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::new(Target::Name(name.into()))
    }

    pub fn family(family: impl Into<String>) -> Self {
        Self::new(Target::Family(family.into()))
    }

    /// Test the querying box moved by `offset` (e.g. the next step's motion).
    pub fn offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Collect every hit instead of stopping at the first.
    pub fn all(mut self) -> Self {
        self.first_only = false;
        self
    }

    pub fn on_hit(mut self, callback: &'q mut dyn FnMut(&Hit)) -> Self {
        self.on_hit = Some(callback);
        self
    }
}

impl Node {
    /// Run `query` against this entity's bounding box. Name and family
    /// queries need `registry`; without one the query is refused and logged.
    pub fn collides_with(
        &self,
        query: CollisionQuery<'_>,
        registry: Option<&dyn Registry>,
    ) -> Option<Collision> {
        let CollisionQuery {
            target,
            offset,
            first_only,
            mut on_hit,
        } = query;

        let candidates: Vec<Hit> = match target {
            Target::Entity(entity) => vec![Hit::of(entity)],
            Target::Entities(entities) => entities.iter().map(|e| Hit::of(*e)).collect(),
            Target::Name(name) => {
                let Some(registry) = registry else {
                    log::warn!("Entity {}: name query '{name}' without a registry, ignored", self.id());
                    return None;
                };
                registry.by_name(&name).iter().map(|h| Hit::of(h)).collect()
            }
            Target::Family(family) => {
                let Some(registry) = registry else {
                    log::warn!("Entity {}: family query '{family}' without a registry, ignored", self.id());
                    return None;
                };
                registry.by_family(&family).iter().map(|h| Hit::of(h)).collect()
            }
        };

        if candidates.is_empty() {
            return None;
        }

        let own = Node::bounding_box(self).translate(offset);
        let mut hits = Vec::new();
        for candidate in candidates {
            if candidate.id == self.id() || !own.intersects(&candidate.bounding_box) {
                continue;
            }
            if let Some(callback) = on_hit.as_mut() {
                callback(&candidate);
            }
            if first_only {
                return Some(Collision::First(candidate));
            }
            hits.push(candidate);
        }

        if first_only {
            None
        } else {
            Some(Collision::All(hits))
        }
    }

    /// First-hit check against an explicit group.
    pub fn collides_with_group(&self, group: &[&dyn Collidable]) -> Option<Hit> {
        let own = Node::bounding_box(self);
        group
            .iter()
            .map(|c| Hit::of(*c))
            .find(|hit| hit.id != self.id() && own.intersects(&hit.bounding_box))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityConfig;
    use crate::math::Size;
    use crate::test_log;

    fn square(x: f32, y: f32) -> Entity {
        Entity::new(EntityConfig {
            position: Vec2::new(x, y),
            dimension: Size::new(10.0, 10.0),
            ..Default::default()
        })
    }

    struct Names(Vec<Hitbox>);

    impl Registry for Names {
        fn by_name(&self, name: &str) -> Vec<Hitbox> {
            self.0.iter().filter(|h| h.name.as_deref() == Some(name)).cloned().collect()
        }

        fn by_family(&self, family: &str) -> Vec<Hitbox> {
            self.0.iter().filter(|h| h.families.iter().any(|f| f == family)).cloned().collect()
        }
    }

    #[test]
    fn overlapping_squares_collide_and_touching_ones_do_not() {
        let a = square(0.0, 0.0);
        let mut b = square(5.0, 5.0);
        let hit = a.collides_with(CollisionQuery::entity(&b), None);
        assert_eq!(hit, Some(Collision::First(Hit::of(&b))));

        b.position = Vec2::new(10.0, 10.0);
        assert_eq!(a.collides_with(CollisionQuery::entity(&b), None), None);
    }

    #[test]
    fn empty_set_and_no_hits_are_distinguishable() {
        let a = square(0.0, 0.0);
        let far = square(100.0, 100.0);

        let none: [&dyn Collidable; 0] = [];
        assert_eq!(a.collides_with(CollisionQuery::entities(&none).all(), None), None);

        let group: [&dyn Collidable; 1] = [&far];
        assert_eq!(
            a.collides_with(CollisionQuery::entities(&group).all(), None),
            Some(Collision::All(vec![]))
        );
    }

    #[test]
    fn self_is_excluded_by_id() {
        let a = square(0.0, 0.0);
        let b = square(2.0, 2.0);
        let group: [&dyn Collidable; 2] = [&a, &b];
        let result = a.collides_with(CollisionQuery::entities(&group).all(), None).unwrap();
        assert_eq!(result.hits().iter().map(|h| h.id).collect::<Vec<_>>(), vec![b.id()]);
    }

    #[test]
    fn all_mode_keeps_candidate_order_and_calls_back_per_hit() {
        let a = square(0.0, 0.0);
        let b = square(5.0, 0.0);
        let miss = square(50.0, 0.0);
        let c = square(-5.0, -5.0);
        let group: [&dyn Collidable; 3] = [&b, &miss, &c];

        let mut seen = Vec::new();
        let mut record = |hit: &Hit| seen.push(hit.id);
        let result = a
            .collides_with(CollisionQuery::entities(&group).all().on_hit(&mut record), None)
            .unwrap();
        assert_eq!(result.hits().len(), 2);
        assert_eq!(seen, vec![b.id(), c.id()]);
    }

    #[test]
    fn offset_moves_the_querying_box() {
        let a = square(0.0, 0.0);
        let b = square(15.0, 0.0);
        assert!(a.collides_with(CollisionQuery::entity(&b), None).is_none());
        let moved = a.collides_with(CollisionQuery::entity(&b).offset(Vec2::new(6.0, 0.0)), None);
        assert!(moved.is_some());
    }

    #[test]
    fn registry_lookups_by_name_and_family() {
        let a = square(0.0, 0.0);
        let mut wall = square(4.0, 4.0);
        wall.name = Some("wall".into());
        wall.families = vec!["solid".into()];
        let names = Names(vec![Hitbox::of(&a), Hitbox::of(&wall)]);
        let registry: &dyn Registry = &names;

        let by_name = a.collides_with(CollisionQuery::name("wall"), Some(registry));
        assert_eq!(by_name.unwrap().hits()[0].id, wall.id());

        let by_family = a.collides_with(CollisionQuery::family("solid").all(), Some(registry));
        assert_eq!(by_family.unwrap().hits().len(), 1);

        assert_eq!(a.collides_with(CollisionQuery::name("ghost").all(), Some(registry)), None);
    }

    #[test]
    fn registry_query_without_registry_is_logged_noop() {
        test_log::capture();
        let a = square(0.0, 0.0);
        assert_eq!(a.collides_with(CollisionQuery::family("solid"), None), None);
        assert!(test_log::logged(log::Level::Warn, "without a registry"));
    }

    #[test]
    fn group_variant_returns_first_hit() {
        let a = square(0.0, 0.0);
        let b = square(20.0, 0.0);
        let c = square(9.0, 9.0);
        let d = square(1.0, 1.0);
        let group: [&dyn Collidable; 4] = [&a, &b, &c, &d];
        assert_eq!(a.collides_with_group(&group).map(|h| h.id), Some(c.id()));
        let lone: [&dyn Collidable; 1] = [&b];
        assert_eq!(a.collides_with_group(&lone), None);
    }
}
